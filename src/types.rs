//! Shared types passed between the fetch, extraction and report stages

use serde::Serialize;
use std::fmt;

use crate::classify::SentimentBand;
use crate::extract::ExtractionMethod;

/// Where an accepted reading came from
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReadingSource {
    /// Structured JSON API
    Api,
    /// Extracted from an HTML page
    Scraped {
        method: ExtractionMethod,
        confidence: f64,
    },
}

impl fmt::Display for ReadingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadingSource::Api => write!(f, "api"),
            ReadingSource::Scraped { method, confidence } => {
                write!(f, "scraped via {} (confidence {:.2})", method, confidence)
            }
        }
    }
}

/// The accepted index value plus provenance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexReading {
    /// Score in [0, 100]
    pub value: u8,
    /// Classification text supplied by the source, if any
    pub classification: Option<String>,
    /// Source timestamp (unix seconds as text for the API)
    pub timestamp: Option<String>,
    pub time_until_update: Option<String>,
    pub source: ReadingSource,
}

impl IndexReading {
    pub fn band(&self) -> SentimentBand {
        SentimentBand::classify(self.value)
    }
}

/// Day-over-day and moving-average context for a reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Trend {
    /// Change versus the previous day, if at least two days are known
    pub change: Option<i16>,
    /// Mean of the available history window
    pub average: f64,
    /// Number of days in the window
    pub days: usize,
}

impl Trend {
    /// Build from newest-first values (the API order)
    pub fn from_values(values: &[u8]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let change = match values {
            [current, previous, ..] => Some(*current as i16 - *previous as i16),
            _ => None,
        };
        let average = values.iter().map(|v| *v as f64).sum::<f64>() / values.len() as f64;
        Some(Self {
            change,
            average,
            days: values.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trend_from_values() {
        let trend = Trend::from_values(&[60, 55, 50, 45, 40, 35, 30]).unwrap();
        assert_eq!(trend.change, Some(5));
        assert!((trend.average - 45.0).abs() < 1e-9);
        assert_eq!(trend.days, 7);
    }

    #[test]
    fn test_trend_single_value() {
        let trend = Trend::from_values(&[42]).unwrap();
        assert_eq!(trend.change, None);
        assert_eq!(trend.average, 42.0);
        assert!(Trend::from_values(&[]).is_none());
    }

    #[test]
    fn test_reading_band() {
        let reading = IndexReading {
            value: 72,
            classification: Some("Greed".into()),
            timestamp: None,
            time_until_update: None,
            source: ReadingSource::Api,
        };
        assert_eq!(reading.band(), SentimentBand::Greed);
    }
}
