//! Score extraction from scraped pages
//!
//! Strategies run in a fixed priority order, precise first and speculative
//! last. The first candidate that clears both the global floor and its
//! strategy gate wins; later strategies are never consulted and results are
//! never merged.

use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

use crate::config::ExtractionConfig;
use crate::error::{Error, Result};
use crate::fetch::RawDocument;

pub mod confidence;
pub mod html;
pub mod page;
pub mod strategies;

pub use confidence::{ConfidenceScorer, Gate, Thresholds};
pub use page::Page;

/// Longest audit snippet kept on a candidate
pub const MAX_CONTEXT_CHARS: usize = 120;

/// Which strategy produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    ExactSelector,
    RelaxedSelector,
    ScriptObjectScan,
    RegexPatterns,
    DomNeighborhood,
    Metadata,
    ContextualWindow,
    BackupLoose,
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExtractionMethod::ExactSelector => "exact_selector",
            ExtractionMethod::RelaxedSelector => "relaxed_selector",
            ExtractionMethod::ScriptObjectScan => "script_object_scan",
            ExtractionMethod::RegexPatterns => "regex_patterns",
            ExtractionMethod::DomNeighborhood => "dom_neighborhood",
            ExtractionMethod::Metadata => "metadata",
            ExtractionMethod::ContextualWindow => "contextual_window",
            ExtractionMethod::BackupLoose => "backup_loose",
        };
        f.write_str(name)
    }
}

/// A candidate score; immutable once produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreCandidate {
    pub value: u8,
    pub confidence: f64,
    pub method: ExtractionMethod,
    /// Short audit snippet
    pub context: String,
}

impl ScoreCandidate {
    pub fn new(value: u8, confidence: f64, method: ExtractionMethod, context: &str) -> Self {
        Self {
            value,
            confidence: confidence.clamp(0.0, 1.0),
            method,
            context: clip(context, MAX_CONTEXT_CHARS),
        }
    }
}

impl fmt::Display for ScoreCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} via {} (conf: {:.2}) - {}",
            self.value, self.method, self.confidence, self.context
        )
    }
}

/// One independent way of deriving a score from a document
pub trait ExtractionStrategy: Send + Sync {
    fn method(&self) -> ExtractionMethod;

    /// Acceptance class applied on top of the global floor
    fn gate(&self) -> Gate;

    /// Zero or one candidate; failures are silent
    fn attempt(&self, page: &Page<'_>, scorer: &ConfidenceScorer) -> Option<ScoreCandidate>;
}

/// What one strategy did during a traced run
#[derive(Debug, Clone, Serialize)]
pub struct StrategyOutcome {
    pub method: ExtractionMethod,
    pub gate: Gate,
    pub candidate: Option<ScoreCandidate>,
    pub accepted: bool,
}

/// Ordered strategy list plus the scorer
pub struct ExtractionPipeline {
    scorer: ConfidenceScorer,
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl ExtractionPipeline {
    /// Standard ordering, precise to speculative
    pub fn new(config: &ExtractionConfig) -> Self {
        let scorer = ConfidenceScorer::new(Thresholds::from_config(config));
        Self::with_strategies(scorer, strategies::standard(config))
    }

    pub fn with_strategies(
        scorer: ConfidenceScorer,
        strategies: Vec<Box<dyn ExtractionStrategy>>,
    ) -> Self {
        Self { scorer, strategies }
    }

    pub fn methods(&self) -> Vec<ExtractionMethod> {
        self.strategies.iter().map(|s| s.method()).collect()
    }

    pub fn scorer(&self) -> &ConfidenceScorer {
        &self.scorer
    }

    /// Return the first candidate that validates
    ///
    /// Pages that never mention fear or greed only get the structural
    /// strategies; everything heuristic would be guessing.
    pub fn extract(&self, document: &RawDocument) -> Result<ScoreCandidate> {
        self.extract_page(&Page::new(document))
    }

    /// `extract` on a page whose DOM may already be parsed
    pub fn extract_page(&self, page: &Page<'_>) -> Result<ScoreCandidate> {
        let document = page.document();
        let relevant = mentions_index(&document.body);
        if !relevant {
            warn!(
                "Document from {} never mentions fear or greed ({} bytes), structural strategies only",
                document.source_url,
                document.len()
            );
        }

        for strategy in &self.strategies {
            let method = strategy.method();
            if !relevant && strategy.gate() != Gate::Fixed {
                debug!("{} skipped", method);
                continue;
            }

            match strategy.attempt(page, &self.scorer) {
                Some(candidate) if self.scorer.accepts(&candidate, strategy.gate()) => {
                    info!(
                        method = %method,
                        value = candidate.value,
                        confidence = candidate.confidence,
                        context = %candidate.context,
                        "Accepted index candidate"
                    );
                    return Ok(candidate);
                }
                Some(candidate) => {
                    debug!(
                        "{} candidate {} below gate {:.2}",
                        method,
                        candidate,
                        self.scorer.thresholds().for_gate(strategy.gate())
                    );
                }
                None => debug!("{} found nothing", method),
            }
        }

        warn!("All {} strategies failed", self.strategies.len());
        Err(Error::ExtractionExhausted {
            strategies: self.strategies.len(),
        })
    }

    /// Run every strategy and report each outcome, for diagnostics
    pub fn trace(&self, document: &RawDocument) -> Vec<StrategyOutcome> {
        let relevant = mentions_index(&document.body);
        let page = Page::new(document);
        let mut first_accepted = false;
        self.strategies
            .iter()
            .map(|strategy| {
                let candidate = if relevant || strategy.gate() == Gate::Fixed {
                    strategy.attempt(&page, &self.scorer)
                } else {
                    None
                };
                let passes = candidate
                    .as_ref()
                    .map(|c| self.scorer.accepts(c, strategy.gate()))
                    .unwrap_or(false);
                let accepted = passes && !first_accepted;
                first_accepted |= passes;
                StrategyOutcome {
                    method: strategy.method(),
                    gate: strategy.gate(),
                    candidate,
                    accepted,
                }
            })
            .collect()
    }
}

/// Whether the text mentions fear or greed at all (case-insensitive)
pub fn mentions_index(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("fear") || lower.contains("greed")
}

/// Collapse whitespace and cut to `max_chars` characters
pub fn clip(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let mut out: String = collapsed.chars().take(max_chars).collect();
        out.push('…');
        out
    }
}

/// Slice `radius` bytes either side of `start..end`, widened to char boundaries
pub fn window(text: &str, start: usize, end: usize, radius: usize) -> &str {
    let mut lo = start.saturating_sub(radius);
    while lo > 0 && !text.is_char_boundary(lo) {
        lo -= 1;
    }
    let mut hi = (end + radius).min(text.len());
    while hi < text.len() && !text.is_char_boundary(hi) {
        hi += 1;
    }
    &text[lo..hi]
}
