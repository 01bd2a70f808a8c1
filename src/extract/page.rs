//! Per-run view of a document shared by every strategy

use scraper::Html;
use std::cell::OnceCell;

use crate::fetch::RawDocument;

/// A document plus its DOM, parsed on first use
pub struct Page<'a> {
    document: &'a RawDocument,
    dom: OnceCell<Html>,
}

impl<'a> Page<'a> {
    pub fn new(document: &'a RawDocument) -> Self {
        Self {
            document,
            dom: OnceCell::new(),
        }
    }

    pub fn document(&self) -> &'a RawDocument {
        self.document
    }

    pub fn body(&self) -> &str {
        &self.document.body
    }

    /// Parsed DOM; the body is parsed at most once per page
    pub fn dom(&self) -> &Html {
        self.dom.get_or_init(|| Html::parse_document(&self.document.body))
    }

    pub fn is_parsed(&self) -> bool {
        self.dom.get().is_some()
    }
}
