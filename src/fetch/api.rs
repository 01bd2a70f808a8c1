// Alternative.me Fear & Greed API payloads
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::fetch::RawDocument;
use crate::types::{IndexReading, ReadingSource};

#[derive(Debug, Clone, Deserialize)]
pub struct FngEntry {
    /// Integer score sent as a string
    pub value: String,
    pub value_classification: String,
    pub timestamp: String,
    pub time_until_update: Option<String>,
}

impl FngEntry {
    /// Parse the score, rejecting anything outside [0, 100]
    pub fn score(&self) -> Result<u8> {
        let value: u8 = self
            .value
            .trim()
            .parse()
            .map_err(|_| Error::BadResponse(format!("non-numeric value '{}'", self.value)))?;
        if value > 100 {
            return Err(Error::BadResponse(format!("value {} outside 0-100", value)));
        }
        Ok(value)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FngResponse {
    pub data: Vec<FngEntry>,
}

/// Decode an API body, failing on malformed JSON or an empty data array
pub fn parse_response(document: &RawDocument) -> Result<FngResponse> {
    let response: FngResponse = serde_json::from_str(&document.body)
        .map_err(|e| Error::BadResponse(format!("malformed body from {}: {}", document.source_url, e)))?;
    if response.data.is_empty() {
        return Err(Error::BadResponse(format!(
            "empty data array from {}",
            document.source_url
        )));
    }
    Ok(response)
}

/// Latest reading from an API document
pub fn parse_latest(document: &RawDocument) -> Result<IndexReading> {
    let response = parse_response(document)?;
    let entry = &response.data[0];

    Ok(IndexReading {
        value: entry.score()?,
        classification: Some(entry.value_classification.clone()),
        timestamp: Some(entry.timestamp.clone()),
        time_until_update: entry.time_until_update.clone(),
        source: ReadingSource::Api,
    })
}

/// Newest-first scores from a history document; unparseable entries are skipped
pub fn parse_history(document: &RawDocument) -> Result<Vec<u8>> {
    let response = parse_response(document)?;
    Ok(response
        .data
        .iter()
        .filter_map(|entry| entry.score().ok())
        .collect())
}
