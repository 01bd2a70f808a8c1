//! Error types for the notifier

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the notifier
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    // Fetch errors
    #[error("All {attempts} client profiles failed to return usable content")]
    FetchExhausted { attempts: usize },

    #[error("Bad response from data source: {0}")]
    BadResponse(String),

    #[error("HTTP error: {0}")]
    Http(String),

    // Extraction errors
    #[error("Could not determine the index: {strategies} strategies tried, none validated")]
    ExtractionExhausted { strategies: usize },

    // Notification errors
    #[error("Notification delivery failed: {0}")]
    Delivery(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Check if this error is transient (worth another scheduled run)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::FetchExhausted { .. }
                | Error::BadResponse(_)
                | Error::Http(_)
                | Error::Delivery(_)
        )
    }

    /// Check if this error means the process is misconfigured
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Config(_) | Error::MissingEnvVar(_))
    }
}

// Conversion from reqwest errors
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Http(format!("request timed out: {}", e))
        } else {
            Error::Http(e.to_string())
        }
    }
}

// Conversion from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

// Conversion from I/O errors
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(Error::FetchExhausted { attempts: 3 }.is_retryable());
        assert!(Error::Delivery("503".into()).is_retryable());
        assert!(!Error::ExtractionExhausted { strategies: 8 }.is_retryable());
        assert!(!Error::Config("missing token".into()).is_retryable());
    }

    #[test]
    fn test_fatal_classification() {
        assert!(Error::Config("x".into()).is_fatal());
        assert!(Error::MissingEnvVar("TELEGRAM_TOKEN".into()).is_fatal());
        assert!(!Error::BadResponse("x".into()).is_fatal());
    }

    #[test]
    fn test_extraction_message_mentions_index() {
        let msg = Error::ExtractionExhausted { strategies: 8 }.to_string();
        assert!(msg.contains("Could not determine the index"));
    }
}
