//! Document retrieval
//!
//! The fetcher returns raw documents only; turning them into a score is the
//! job of `fetch::api` (JSON) or the extraction pipeline (HTML).

use async_trait::async_trait;

use crate::error::Result;

pub mod api;
pub mod client;
pub mod profiles;

pub use client::HttpFetcher;
pub use profiles::ClientProfile;

/// Kind of content held by a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Html,
    Json,
}

/// Fetched content, never mutated after retrieval
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub body: String,
    pub source_url: String,
    pub kind: DocumentKind,
    /// Client profile that produced the body (page fetches only)
    pub profile: Option<String>,
}

impl RawDocument {
    pub fn html(body: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            source_url: source_url.into(),
            kind: DocumentKind::Html,
            profile: None,
        }
    }

    pub fn json(body: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            source_url: source_url.into(),
            kind: DocumentKind::Json,
            profile: None,
        }
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// What to retrieve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchTarget {
    /// Latest API reading
    Api,
    /// Last `n` API readings, newest first
    History(u32),
    /// HTML page, tried with every client profile
    Page,
}

/// Anything that can produce raw documents
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch(&self, target: FetchTarget) -> Result<RawDocument>;
}
