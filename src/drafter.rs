//! Post drafting: one chat-completion call for the text, one optional
//! image-generation call, and a deterministic keyword-template fallback
//! when no backend is configured or the text call fails.

use std::collections::HashSet;
use std::path::PathBuf;

use reqwest::Client;
use serde_json::json;

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const IMAGE_GENERATIONS_URL: &str = "https://api.openai.com/v1/images/generations";
const CHAT_MODEL: &str = "gpt-3.5-turbo";
const IMAGE_MODEL: &str = "dall-e-3";

/// Transcripts at or below this length never get an illustration.
const IMAGE_MIN_TRANSCRIPT_CHARS: usize = 200;

/// Topic keyword sets for the fallback template, matched in this order.
const TOPIC_KEYWORDS: [(&str, &[&str]); 5] = [
    ("business", &["business", "company", "revenue", "profit", "strategy", "market"]),
    ("technology", &["tech", "software", "app", "digital", "system", "platform"]),
    ("lifestyle", &["life", "tips", "hack", "easy", "simple", "quick"]),
    ("education", &["learn", "teaching", "education", "training", "skill"]),
    ("health", &["health", "fitness", "wellness", "exercise", "body"]),
];

const TOPIC_HASHTAGS: [(&str, &str); 5] = [
    ("business", "#Business #Entrepreneurship #Strategy #Leadership"),
    ("technology", "#Technology #Innovation #DigitalTransformation #Tech"),
    ("lifestyle", "#Lifestyle #Tips #LifeHacks #Productivity"),
    ("education", "#Learning #Education #Skills #Development"),
    ("health", "#Health #Wellness #Fitness #Lifestyle"),
];

const DEFAULT_HASHTAGS: [&str; 4] = ["#Insights", "#Professional", "#Learning", "#Growth"];

const MAX_TOPICS: usize = 2;
const MAX_HASHTAGS: usize = 6;

/// Machine-produced candidate post, pending human review.
#[derive(Debug, Clone)]
pub struct Draft {
    pub post_text: String,
    pub image_path: Option<PathBuf>,
}

pub struct Drafter {
    api_key: Option<String>,
    images_dir: PathBuf,
    http: Client,
}

impl Drafter {
    pub fn new(api_key: Option<String>, images_dir: PathBuf) -> Self {
        Self {
            api_key,
            images_dir,
            http: Client::new(),
        }
    }

    /// Draft a post from a transcript. Never fails: any backend trouble
    /// drops to the keyword template, and any image trouble drops the image.
    pub async fn draft(&self, transcript: &str, title: Option<&str>) -> Draft {
        let Some(api_key) = &self.api_key else {
            return fallback_draft(transcript, title);
        };

        let post_text = match self.generate_text(api_key, transcript, title).await {
            Ok(text) => text,
            Err(e) => {
                eprintln!("Content generation failed, using fallback: {}", e);
                return fallback_draft(transcript, title);
            }
        };

        let image_path = if should_illustrate(transcript) {
            match self.generate_image(api_key, transcript, title).await {
                Ok(path) => Some(path),
                Err(e) => {
                    eprintln!("Image generation failed, posting text only: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Draft { post_text, image_path }
    }

    async fn generate_text(
        &self,
        api_key: &str,
        transcript: &str,
        title: Option<&str>,
    ) -> Result<String, String> {
        let sample: String = transcript.chars().take(3000).collect();
        let prompt = format!(
            "Analyze this video transcript and create a professional social media post:\n\n\
             VIDEO TITLE: {}\n\
             TRANSCRIPT: {}\n\n\
             Create a natural post that:\n\
             - Starts with an engaging hook related to the actual video content\n\
             - Summarizes key insights from the transcript (not generic content)\n\
             - Uses 3-4 bullet points for main takeaways\n\
             - Includes 5-7 relevant hashtags based on the actual content\n\
             - Ends with an engaging question\n\
             - Sounds natural and human-written\n\
             - NEVER mentions AI, automation, or generated content\n\n\
             Write as if you watched the video and are sharing genuine insights with your professional network.",
            title.unwrap_or("Video Content"),
            sample,
        );

        let body = json!({
            "model": CHAT_MODEL,
            "messages": [
                {
                    "role": "system",
                    "content": "You are a professional creating social media content. Write natural, engaging posts based on video content. Never mention AI or automation. Focus on genuine insights from the transcript."
                },
                { "role": "user", "content": prompt }
            ],
            "max_tokens": 500,
            "temperature": 0.7
        });

        let resp = self
            .http
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !resp.status().is_success() {
            return Err(format!("chat completion returned {}", resp.status()));
        }

        let body: serde_json::Value = resp.json().await.map_err(|e| e.to_string())?;
        completion_text(&body).ok_or_else(|| format!("no content in completion response: {}", body))
    }

    /// Generate an illustration, download it, and persist it under the
    /// images directory with a timestamp-qualified name.
    async fn generate_image(
        &self,
        api_key: &str,
        transcript: &str,
        title: Option<&str>,
    ) -> Result<PathBuf, String> {
        let sample: String = transcript.chars().take(300).collect();
        let prompt = format!(
            "Professional business illustration about: {}\n\n\
             Based on this content: {}\n\n\
             Style: Clean, modern, professional business illustration\n\
             Colors: Professional blue, white, light gray gradient\n\
             Elements: Abstract geometric shapes, business icons related to the topic\n\
             No text, words, or logos in the image - visual elements only\n\
             Corporate aesthetic, engaging but professional",
            title.unwrap_or("Video Content"),
            sample,
        );

        let body = json!({
            "model": IMAGE_MODEL,
            "prompt": prompt,
            "size": "1024x1024",
            "quality": "standard",
            "n": 1
        });

        let resp = self
            .http
            .post(IMAGE_GENERATIONS_URL)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !resp.status().is_success() {
            return Err(format!("image generation returned {}", resp.status()));
        }

        let body: serde_json::Value = resp.json().await.map_err(|e| e.to_string())?;
        let image_url = generated_image_url(&body)
            .ok_or_else(|| "no image URL in generation response".to_string())?;

        let download = self
            .http
            .get(image_url)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !download.status().is_success() {
            return Err(format!("image download returned {}", download.status()));
        }
        let data = download.bytes().await.map_err(|e| e.to_string())?;
        if data.is_empty() {
            return Err("downloaded image is empty".to_string());
        }

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let path = self.images_dir.join(format!("post_{}.png", timestamp));
        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| format!("failed to save image: {}", e))?;

        Ok(path)
    }
}

/// Drafted text from a chat-completion response body.
fn completion_text(body: &serde_json::Value) -> Option<String> {
    let content = body
        .get("choices")?
        .as_array()?
        .first()?
        .get("message")?
        .get("content")?
        .as_str()?;
    Some(content.trim().to_string())
}

/// Image URL from an image-generation response body.
fn generated_image_url(body: &serde_json::Value) -> Option<&str> {
    body.get("data")?.as_array()?.first()?.get("url")?.as_str()
}

/// Only substantial transcripts get an illustration.
pub fn should_illustrate(transcript: &str) -> bool {
    transcript.chars().count() > IMAGE_MIN_TRANSCRIPT_CHARS
}

/// Deterministic template used when no generation backend is reachable.
/// Never produces an image.
pub fn fallback_draft(transcript: &str, title: Option<&str>) -> Draft {
    let lowered = transcript.to_lowercase();
    let words: HashSet<&str> = lowered.split_whitespace().collect();

    let detected: Vec<&str> = TOPIC_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| words.contains(k)))
        .map(|(topic, _)| *topic)
        .take(MAX_TOPICS)
        .collect();

    let mut hashtags: Vec<&str> = detected
        .iter()
        .flat_map(|topic| {
            TOPIC_HASHTAGS
                .iter()
                .find(|(t, _)| t == topic)
                .map(|(_, tags)| tags.split_whitespace())
                .into_iter()
                .flatten()
        })
        .collect();

    if hashtags.is_empty() {
        hashtags = DEFAULT_HASHTAGS.to_vec();
    }
    hashtags.truncate(MAX_HASHTAGS);

    let excerpt: String = transcript.chars().take(100).collect();
    let post_text = format!(
        "Interesting insights from: \"{}\"\n\n\
         Key takeaways that caught my attention:\n\
         \u{2022} {}...\n\
         \u{2022} Practical applications worth considering\n\
         \u{2022} Valuable perspective on the topic\n\n\
         The discussion brings up important points that many professionals can relate to.\n\n\
         What's your experience with this topic?\n\n\
         {}",
        title.unwrap_or("Recent Analysis"),
        excerpt.trim(),
        hashtags.join(" "),
    );

    Draft {
        post_text,
        image_path: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hashtags_in(text: &str) -> Vec<&str> {
        text.split_whitespace().filter(|w| w.starts_with('#')).collect()
    }

    #[test]
    fn business_transcript_gets_business_hashtags() {
        let transcript = "Our Q3 revenue grew 40% due to new market strategy and careful planning";
        let draft = fallback_draft(transcript, Some("Q3 Results"));
        assert!(draft.post_text.contains("#Business"));
        assert!(draft.post_text.contains("Q3 Results"));
        assert!(draft.image_path.is_none());
    }

    #[test]
    fn hashtag_count_is_bounded_between_4_and_6() {
        // Two matched topic groups would give 8 tags; must truncate to 6.
        let two_topics = fallback_draft("the business strategy behind this software platform", None);
        let tags = hashtags_in(&two_topics.post_text);
        assert_eq!(tags.len(), 6);

        let one_topic = fallback_draft("daily fitness and wellness routines for everyone", None);
        let tags = hashtags_in(&one_topic.post_text);
        assert_eq!(tags.len(), 4);
    }

    #[test]
    fn no_matched_topic_yields_exactly_the_default_set() {
        let draft = fallback_draft("completely unrelated ramblings about weather and birds", None);
        let tags = hashtags_in(&draft.post_text);
        assert_eq!(tags, vec!["#Insights", "#Professional", "#Learning", "#Growth"]);
    }

    #[test]
    fn topics_are_matched_on_whole_words_only() {
        // "applesauce" contains "app" but is not the keyword "app".
        let draft = fallback_draft("grandma made applesauce again", None);
        let tags = hashtags_in(&draft.post_text);
        assert_eq!(tags, vec!["#Insights", "#Professional", "#Learning", "#Growth"]);
    }

    #[test]
    fn at_most_two_topic_groups_in_encounter_order() {
        let transcript = "business software tips for teaching healthy exercise";
        // Matches all five groups; only business + technology survive.
        let text = fallback_draft(transcript, None).post_text;
        assert!(text.contains("#Business"));
        assert!(text.contains("#Technology"));
        assert!(!text.contains("#LifeHacks"));
        assert!(!text.contains("#Wellness"));
    }

    #[test]
    fn fallback_embeds_first_100_chars_of_transcript() {
        let transcript = "a".repeat(300);
        let draft = fallback_draft(&transcript, None);
        assert!(draft.post_text.contains(&format!("\u{2022} {}...", "a".repeat(100))));
    }

    #[test]
    fn short_transcripts_never_request_an_image() {
        assert!(!should_illustrate(&"x".repeat(200)));
        assert!(should_illustrate(&"x".repeat(201)));
    }

    #[test]
    fn completion_response_content_is_extracted_and_trimmed() {
        let body = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "  A great post  " } }]
        });
        assert_eq!(completion_text(&body).as_deref(), Some("A great post"));

        assert!(completion_text(&serde_json::json!({ "choices": [] })).is_none());
        assert!(completion_text(&serde_json::json!({ "error": "rate limited" })).is_none());
    }

    #[test]
    fn image_generation_url_is_extracted() {
        let body = serde_json::json!({
            "data": [{ "url": "https://img.example/generated.png" }]
        });
        assert_eq!(generated_image_url(&body), Some("https://img.example/generated.png"));

        assert!(generated_image_url(&serde_json::json!({ "data": [] })).is_none());
        assert!(generated_image_url(&serde_json::json!({ "data": "nope" })).is_none());
    }
}
