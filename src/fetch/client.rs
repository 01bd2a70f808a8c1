//! HTTP fetcher for the API and the scraped page
//!
//! Every request carries its own timeout. Page fetches walk the client
//! profiles once, in order, with a fixed delay between attempts; there is no
//! backoff and no second pass.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::SourceConfig;
use crate::error::{Error, Result};
use crate::fetch::api;
use crate::fetch::profiles::{default_profiles, ClientProfile};
use crate::fetch::{DocumentSource, FetchTarget, RawDocument};

pub struct HttpFetcher {
    client: Client,
    config: SourceConfig,
    profiles: Vec<ClientProfile>,
}

impl HttpFetcher {
    pub fn new(config: SourceConfig) -> Result<Self> {
        Self::with_profiles(config, default_profiles())
    }

    pub fn with_profiles(config: SourceConfig, profiles: Vec<ClientProfile>) -> Result<Self> {
        if profiles.is_empty() {
            return Err(Error::Config("at least one client profile is required".to_string()));
        }
        let client = Client::builder()
            .build()
            .map_err(|e| Error::Internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            config,
            profiles,
        })
    }

    /// Fetch the HTML page, trying each client profile once
    pub async fn fetch_page(&self) -> Result<RawDocument> {
        let url = &self.config.page_url;
        let timeout = Duration::from_secs(self.config.page_timeout_secs);
        let delay = Duration::from_millis(self.config.attempt_delay_ms);

        for (attempt, profile) in self.profiles.iter().enumerate() {
            if attempt > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            debug!("Page attempt {} with profile {}", attempt + 1, profile.name);

            let response = match self
                .client
                .get(url)
                .headers(profile.headers())
                .timeout(timeout)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    warn!("Profile {} request failed: {}", profile.name, e);
                    continue;
                }
            };

            let status = response.status();
            if !status.is_success() {
                warn!("Profile {} got HTTP {}", profile.name, status);
                continue;
            }

            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    warn!("Profile {} failed reading body: {}", profile.name, e);
                    continue;
                }
            };

            if body.len() <= self.config.min_content_bytes {
                warn!(
                    "Profile {} returned {} bytes (need more than {}), likely a block page",
                    profile.name,
                    body.len(),
                    self.config.min_content_bytes
                );
                continue;
            }

            info!("Fetched {} bytes from {} as {}", body.len(), url, profile.name);
            let mut document = RawDocument::html(body, url.as_str());
            document.profile = Some(profile.name.to_string());
            return Ok(document);
        }

        Err(Error::FetchExhausted {
            attempts: self.profiles.len(),
        })
    }

    /// Fetch the latest API reading
    pub async fn fetch_api(&self) -> Result<RawDocument> {
        self.fetch_json(&self.config.api_url).await
    }

    /// Fetch the last `limit` API readings
    pub async fn fetch_history(&self, limit: u32) -> Result<RawDocument> {
        let mut url = url::Url::parse(&self.config.api_url)
            .map_err(|e| Error::Config(format!("invalid api_url: {}", e)))?;
        url.query_pairs_mut().append_pair("limit", &limit.to_string());
        self.fetch_json(url.as_str()).await
    }

    async fn fetch_json(&self, url: &str) -> Result<RawDocument> {
        debug!("Requesting {}", url);
        let response = self
            .client
            .get(url)
            .timeout(Duration::from_secs(self.config.api_timeout_secs))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::BadResponse(format!("HTTP {} from {}", status, url)));
        }

        let body = response.text().await?;
        let document = RawDocument::json(body, url);

        // Shape check up front so callers never see a half-valid document
        api::parse_response(&document)?;
        Ok(document)
    }
}

#[async_trait]
impl DocumentSource for HttpFetcher {
    async fn fetch(&self, target: FetchTarget) -> Result<RawDocument> {
        match target {
            FetchTarget::Api => self.fetch_api().await,
            FetchTarget::History(limit) => self.fetch_history(limit).await,
            FetchTarget::Page => self.fetch_page().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{spawn_stalling_stub, spawn_stub};
    use std::time::Instant;

    fn test_config(base: &str) -> SourceConfig {
        SourceConfig {
            api_url: format!("{}/fng/", base),
            page_url: format!("{}/markets/fear-and-greed", base),
            api_timeout_secs: 5,
            page_timeout_secs: 5,
            min_content_bytes: 100,
            attempt_delay_ms: 0,
            ..SourceConfig::default()
        }
    }

    #[tokio::test]
    async fn test_page_falls_back_to_next_profile() {
        let base = spawn_stub(|request| {
            if request.contains("Firefox") {
                (200, format!("<html>{}</html>", "fear and greed ".repeat(20)))
            } else {
                (200, "<html>blocked</html>".to_string())
            }
        })
        .await;

        let fetcher = HttpFetcher::new(test_config(&base)).unwrap();
        let document = fetcher.fetch_page().await.unwrap();
        assert_eq!(document.profile.as_deref(), Some("firefox-macos"));
        assert!(document.len() > 100);
    }

    #[tokio::test]
    async fn test_timed_out_attempt_moves_to_next_profile() {
        let base = spawn_stalling_stub(
            |request| request.contains("Chrome/").then(|| Duration::from_secs(30)),
            |_| (200, format!("<html>{}</html>", "fear and greed ".repeat(20))),
        )
        .await;

        let config = SourceConfig {
            page_timeout_secs: 1,
            attempt_delay_ms: 100,
            ..test_config(&base)
        };
        let fetcher = HttpFetcher::new(config).unwrap();

        let started = Instant::now();
        let document = fetcher.fetch_page().await.unwrap();
        let elapsed = started.elapsed();

        assert_eq!(document.profile.as_deref(), Some("firefox-macos"));
        // One full timeout plus the delay, far short of the stall
        assert!(elapsed >= Duration::from_millis(1100), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(10), "elapsed {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_fixed_delay_between_attempts() {
        let base = spawn_stub(|_| (503, "busy".to_string())).await;
        let config = SourceConfig {
            attempt_delay_ms: 150,
            ..test_config(&base)
        };
        let fetcher = HttpFetcher::new(config).unwrap();

        let started = Instant::now();
        assert!(fetcher.fetch_page().await.is_err());
        let gaps = default_profiles().len() as u32 - 1;
        assert!(started.elapsed() >= Duration::from_millis(150) * gaps);
    }

    #[tokio::test]
    async fn test_page_exhausts_all_profiles() {
        let base = spawn_stub(|_| (403, "denied".to_string())).await;

        let fetcher = HttpFetcher::new(test_config(&base)).unwrap();
        match fetcher.fetch_page().await {
            Err(Error::FetchExhausted { attempts }) => assert_eq!(attempts, default_profiles().len()),
            other => panic!("expected FetchExhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_api_success() {
        let base = spawn_stub(|_| {
            (
                200,
                r#"{"data":[{"value":"72","value_classification":"Greed","timestamp":"1"}]}"#.to_string(),
            )
        })
        .await;

        let fetcher = HttpFetcher::new(test_config(&base)).unwrap();
        let document = fetcher.fetch(FetchTarget::Api).await.unwrap();
        assert_eq!(api::parse_latest(&document).unwrap().value, 72);
    }

    #[tokio::test]
    async fn test_api_non_success_is_bad_response() {
        let base = spawn_stub(|_| (500, "oops".to_string())).await;

        let fetcher = HttpFetcher::new(test_config(&base)).unwrap();
        assert!(matches!(fetcher.fetch_api().await, Err(Error::BadResponse(_))));
    }

    #[tokio::test]
    async fn test_api_malformed_is_bad_response() {
        let base = spawn_stub(|_| (200, "<html>not json</html>".to_string())).await;

        let fetcher = HttpFetcher::new(test_config(&base)).unwrap();
        assert!(matches!(fetcher.fetch_api().await, Err(Error::BadResponse(_))));
    }

    #[tokio::test]
    async fn test_history_sends_limit() {
        let base = spawn_stub(|request| {
            if request.starts_with("GET /fng/?limit=7 ") {
                (
                    200,
                    r#"{"data":[{"value":"50","value_classification":"Neutral","timestamp":"2"},{"value":"40","value_classification":"Fear","timestamp":"1"}]}"#
                        .to_string(),
                )
            } else {
                (404, "missing".to_string())
            }
        })
        .await;

        let fetcher = HttpFetcher::new(test_config(&base)).unwrap();
        let document = fetcher.fetch(FetchTarget::History(7)).await.unwrap();
        assert_eq!(api::parse_history(&document).unwrap(), vec![50, 40]);
    }

    #[test]
    fn test_empty_profiles_rejected() {
        assert!(HttpFetcher::with_profiles(SourceConfig::default(), vec![]).is_err());
    }
}
