//! Client identities used for page fetches
//!
//! Each profile is a complete header set. Pages behind basic bot filters often
//! answer one browser family with a stub and another with the real document,
//! so the fetcher walks these in order.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::warn;

/// One set of request headers
#[derive(Debug, Clone)]
pub struct ClientProfile {
    pub name: &'static str,
    pub user_agent: &'static str,
    pub accept: &'static str,
    pub accept_language: &'static str,
    pub extra: Vec<(&'static str, &'static str)>,
}

impl ClientProfile {
    /// Build the header map sent with this profile
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(reqwest::header::USER_AGENT, HeaderValue::from_static(self.user_agent));
        headers.insert(reqwest::header::ACCEPT, HeaderValue::from_static(self.accept));
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            HeaderValue::from_static(self.accept_language),
        );

        for &(name, value) in &self.extra {
            match HeaderName::from_bytes(name.as_bytes()) {
                Ok(header) => {
                    headers.insert(header, HeaderValue::from_static(value));
                }
                Err(e) => warn!("Skipping invalid header {} in profile {}: {}", name, self.name, e),
            }
        }

        headers
    }
}

/// Default profiles, most browser-like first
pub fn default_profiles() -> Vec<ClientProfile> {
    vec![
        ClientProfile {
            name: "chrome-windows",
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            accept_language: "en-US,en;q=0.9",
            extra: vec![
                ("connection", "keep-alive"),
                ("upgrade-insecure-requests", "1"),
                ("sec-fetch-dest", "document"),
                ("sec-fetch-mode", "navigate"),
            ],
        },
        ClientProfile {
            name: "firefox-macos",
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:121.0) Gecko/20100101 Firefox/121.0",
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            accept_language: "en-US,en;q=0.5",
            extra: vec![("dnt", "1")],
        },
        ClientProfile {
            name: "safari-iphone",
            user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 17_2 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Mobile/15E148 Safari/604.1",
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            accept_language: "en-US,en;q=0.9",
            extra: vec![],
        },
    ]
}
