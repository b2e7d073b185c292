//! Shared HTTP client for third-party services (LRCLIB, Last.fm).
//! The Subsonic client builds its own with server-specific headers.

use once_cell::sync::Lazy;
use std::time::Duration;

pub const USER_AGENT: &str = concat!("mice/", env!("CARGO_PKG_VERSION"));

pub static HTTP: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_default()
});
