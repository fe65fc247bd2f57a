pub mod cookies;
pub mod publisher;
pub mod session;
