//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::error::Error;

/// Plain environment variable holding the bot credential
pub const TOKEN_ENV: &str = "TELEGRAM_TOKEN";
/// Plain environment variable holding the destination chat
pub const CHAT_ID_ENV: &str = "TELEGRAM_CHAT_ID";

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    /// Bot credential (secret)
    #[serde(default)]
    pub bot_token: String,
    /// Destination chat identifier (secret)
    #[serde(default)]
    pub chat_id: String,
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
    #[serde(default = "default_telegram_timeout_secs")]
    pub timeout_secs: u64,
    /// Messages longer than this are split into labelled parts
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,
    #[serde(default = "default_parse_mode")]
    pub parse_mode: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            api_base: default_telegram_api_base(),
            timeout_secs: default_telegram_timeout_secs(),
            max_message_chars: default_max_message_chars(),
            parse_mode: default_parse_mode(),
        }
    }
}

/// Where the index comes from
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Plain JSON API, no extraction needed
    Api,
    /// HTML page run through the extraction pipeline
    Scrape,
}

impl std::str::FromStr for SourceMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "api" => Ok(SourceMode::Api),
            "scrape" | "html" => Ok(SourceMode::Scrape),
            other => Err(format!("unknown source mode '{}', expected api or scrape", other)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_source_mode")]
    pub mode: SourceMode,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_page_url")]
    pub page_url: String,
    #[serde(default = "default_api_timeout_secs")]
    pub api_timeout_secs: u64,
    /// Timeout applied to each page attempt independently
    #[serde(default = "default_page_timeout_secs")]
    pub page_timeout_secs: u64,
    /// Shorter bodies are treated as block pages
    #[serde(default = "default_min_content_bytes")]
    pub min_content_bytes: usize,
    #[serde(default = "default_attempt_delay_ms")]
    pub attempt_delay_ms: u64,
    /// Days of API history used for the trend section (0 disables it)
    #[serde(default = "default_history_days")]
    pub history_days: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            mode: default_source_mode(),
            api_url: default_api_url(),
            page_url: default_page_url(),
            api_timeout_secs: default_api_timeout_secs(),
            page_timeout_secs: default_page_timeout_secs(),
            min_content_bytes: default_min_content_bytes(),
            attempt_delay_ms: default_attempt_delay_ms(),
            history_days: default_history_days(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    /// Global floor every accepted candidate must clear
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    /// Gate for heuristic strategies
    #[serde(default = "default_medium_confidence")]
    pub medium_confidence: f64,
    /// Gate for pattern strategies
    #[serde(default = "default_high_confidence")]
    pub high_confidence: f64,
    /// Loose last-resort patterns have a high false-positive rate
    #[serde(default = "default_true")]
    pub backup_patterns_enabled: bool,
    /// Class of the element known to hold the score
    #[serde(default = "default_exact_class")]
    pub exact_class: String,
    /// Fragments tried when the exact class has drifted
    #[serde(default = "default_class_fragments")]
    pub class_fragments: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            medium_confidence: default_medium_confidence(),
            high_confidence: default_high_confidence(),
            backup_patterns_enabled: true,
            exact_class: default_exact_class(),
            class_fragments: default_class_fragments(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarConfig {
    /// Include MLK, Presidents', Memorial, Labor Day and Thanksgiving
    #[serde(default = "default_true")]
    pub floating_holidays: bool,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            floating_holidays: true,
        }
    }
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_telegram_timeout_secs() -> u64 {
    15
}

fn default_max_message_chars() -> usize {
    4000
}

fn default_parse_mode() -> String {
    "HTML".to_string()
}

fn default_source_mode() -> SourceMode {
    SourceMode::Api
}

fn default_api_url() -> String {
    "https://api.alternative.me/fng/".to_string()
}

fn default_page_url() -> String {
    "https://edition.cnn.com/markets/fear-and-greed".to_string()
}

fn default_api_timeout_secs() -> u64 {
    15
}

fn default_page_timeout_secs() -> u64 {
    20
}

fn default_min_content_bytes() -> usize {
    50_000
}

fn default_attempt_delay_ms() -> u64 {
    1000
}

fn default_history_days() -> u32 {
    7
}

fn default_min_confidence() -> f64 {
    0.3
}

fn default_medium_confidence() -> f64 {
    0.4
}

fn default_high_confidence() -> f64 {
    0.7
}

fn default_exact_class() -> String {
    "market-fng-gauge__dial-number-value".to_string()
}

fn default_class_fragments() -> Vec<String> {
    [
        "dial-number-value",
        "fng-gauge",
        "gauge__dial",
        "fear-and-greed",
        "fear-greed",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            // Start with defaults
            .set_default("telegram.api_base", default_telegram_api_base())?
            .set_default("source.api_url", default_api_url())?
            .set_default("source.page_url", default_page_url())?
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix FNG__)
            .add_source(
                config::Environment::with_prefix("FNG")
                    .separator("__")
                    .try_parsing(true),
            )
            // The plain secret names used by the scheduler win over everything
            .set_override_option("telegram.bot_token", std::env::var(TOKEN_ENV).ok())?
            .set_override_option("telegram.chat_id", std::env::var(CHAT_ID_ENV).ok())?
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        // Secrets are checked by the commands that need them
        config.validate_settings()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(Error::MissingEnvVar(TOKEN_ENV.to_string()));
        }
        if self.telegram.chat_id.trim().is_empty() {
            return Err(Error::MissingEnvVar(CHAT_ID_ENV.to_string()));
        }

        self.validate_settings()
    }

    /// Validate everything except the secrets
    ///
    /// Offline commands (`calendar`, `extract`) run without credentials.
    pub fn validate_settings(&self) -> crate::error::Result<()> {
        for (name, value) in [
            ("telegram.api_base", &self.telegram.api_base),
            ("source.api_url", &self.source.api_url),
            ("source.page_url", &self.source.page_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| Error::Config(format!("{} is not a valid URL ({}): {}", name, e, value)))?;
        }

        if self.telegram.timeout_secs == 0
            || self.source.api_timeout_secs == 0
            || self.source.page_timeout_secs == 0
        {
            return Err(Error::Config("timeouts must be positive".to_string()));
        }

        if self.telegram.max_message_chars == 0 {
            return Err(Error::Config("max_message_chars must be positive".to_string()));
        }

        let ex = &self.extraction;
        let ordered = 0.0 <= ex.min_confidence
            && ex.min_confidence <= ex.medium_confidence
            && ex.medium_confidence <= ex.high_confidence
            && ex.high_confidence <= 1.0;
        if !ordered {
            return Err(Error::Config(format!(
                "confidence thresholds must satisfy 0 <= min ({}) <= medium ({}) <= high ({}) <= 1",
                ex.min_confidence, ex.medium_confidence, ex.high_confidence
            )));
        }

        if ex.exact_class.trim().is_empty() {
            return Err(Error::Config("extraction.exact_class must not be empty".to_string()));
        }

        Ok(())
    }

    /// Get masked configuration for display (hide secrets)
    pub fn masked_display(&self) -> String {
        format!(
            r#"Configuration:
  Telegram:
    api_base: {}
    bot_token: {}
    chat_id: {}
    timeout: {}s
    max_message_chars: {}
  Source:
    mode: {:?}
    api_url: {}
    page_url: {}
    timeouts: api {}s, page {}s per attempt
    min_content_bytes: {}
    history_days: {}
  Extraction:
    thresholds: min {}, medium {}, high {}
    backup_patterns: {}
    exact_class: {}
  Calendar:
    floating_holidays: {}
"#,
            self.telegram.api_base,
            mask_secret(&self.telegram.bot_token),
            mask_secret(&self.telegram.chat_id),
            self.telegram.timeout_secs,
            self.telegram.max_message_chars,
            self.source.mode,
            mask_url(&self.source.api_url),
            mask_url(&self.source.page_url),
            self.source.api_timeout_secs,
            self.source.page_timeout_secs,
            self.source.min_content_bytes,
            self.source.history_days,
            self.extraction.min_confidence,
            self.extraction.medium_confidence,
            self.extraction.high_confidence,
            self.extraction.backup_patterns_enabled,
            self.extraction.exact_class,
            self.calendar.floating_holidays,
        )
    }
}

/// Mask URL for display (hide API keys in query params)
fn mask_url(url: &str) -> String {
    if let Some(idx) = url.find('?') {
        format!("{}?***", &url[..idx])
    } else {
        url.to_string()
    }
}

fn mask_secret(secret: &str) -> &'static str {
    if secret.is_empty() {
        "(not set)"
    } else {
        "***"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            telegram: TelegramConfig::default(),
            source: SourceConfig::default(),
            extraction: ExtractionConfig::default(),
            calendar: CalendarConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn with_secrets() -> Config {
        let mut config = Config::default();
        config.telegram.bot_token = "123:abc".to_string();
        config.telegram.chat_id = "-100200".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.source.mode, SourceMode::Api);
        assert_eq!(config.telegram.max_message_chars, 4000);
        assert_eq!(config.extraction.min_confidence, 0.3);
        assert_eq!(config.extraction.medium_confidence, 0.4);
        assert_eq!(config.extraction.high_confidence, 0.7);
        assert!(config.extraction.backup_patterns_enabled);
        assert!(config.calendar.floating_holidays);
    }

    #[test]
    fn test_missing_token_is_fatal() {
        let config = Config::default();
        let err = config.validate().unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains(TOKEN_ENV));
    }

    #[test]
    fn test_missing_chat_id_is_fatal() {
        let mut config = with_secrets();
        config.telegram.chat_id = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains(CHAT_ID_ENV));
    }

    #[test]
    fn test_threshold_ordering_enforced() {
        let mut config = with_secrets();
        assert!(config.validate().is_ok());

        config.extraction.medium_confidence = 0.9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_url_rejected() {
        let mut config = with_secrets();
        config.source.page_url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_source_mode_parse() {
        assert_eq!("api".parse::<SourceMode>().unwrap(), SourceMode::Api);
        assert_eq!("SCRAPE".parse::<SourceMode>().unwrap(), SourceMode::Scrape);
        assert!("rss".parse::<SourceMode>().is_err());
    }

    #[test]
    fn test_source_mode_deserialize() {
        let mode: SourceMode = serde_json::from_str(r#""scrape""#).unwrap();
        assert_eq!(mode, SourceMode::Scrape);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[telegram]
bot_token = "file-token"
chat_id = "42"

[source]
mode = "scrape"
min_content_bytes = 1000

[extraction]
backup_patterns_enabled = false
"#
        )
        .unwrap();

        // Plain secret variables would override the file
        if std::env::var(TOKEN_ENV).is_ok() || std::env::var(CHAT_ID_ENV).is_ok() {
            return;
        }

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.telegram.bot_token, "file-token");
        assert_eq!(config.source.mode, SourceMode::Scrape);
        assert_eq!(config.source.min_content_bytes, 1000);
        assert!(!config.extraction.backup_patterns_enabled);
        assert_eq!(config.source.api_timeout_secs, 15);
    }

    #[test]
    fn test_masked_display_hides_token() {
        let config = with_secrets();
        let shown = config.masked_display();
        assert!(!shown.contains("123:abc"));
        assert!(shown.contains("***"));
    }

    #[test]
    fn test_mask_url() {
        assert_eq!(
            mask_url("https://api.example.com?key=secret"),
            "https://api.example.com?***"
        );
        assert_eq!(mask_url("https://api.example.com"), "https://api.example.com");
    }
}
