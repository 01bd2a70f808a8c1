//! Structural neighbourhood and metadata scans

use scraper::ElementRef;
use std::collections::HashSet;

use crate::extract::html::{is_hidden, small_numbers, visible_text};
use crate::extract::{ConfidenceScorer, ExtractionMethod, ExtractionStrategy, Gate, Page, ScoreCandidate};

/// Ancestors climbed from each matching text node
const MAX_ANCESTORS: usize = 3;
/// Containers with more text than this are page sections, not widgets
const MAX_CONTAINER_CHARS: usize = 600;

const META_TOPIC_WORDS: [&str; 4] = ["fear", "greed", "market", "sentiment"];

fn mentions_terms(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("fear") || lower.contains("greed")
}

/// Best-scoring small number in `text`; ties go to the first
fn best_number(
    text: &str,
    scorer: &ConfidenceScorer,
    method: ExtractionMethod,
    label: &str,
) -> Option<ScoreCandidate> {
    let mut best: Option<ScoreCandidate> = None;
    for value in small_numbers(text) {
        let confidence = scorer.confidence(text, value);
        if best.as_ref().map_or(true, |b| confidence > b.confidence) {
            best = Some(ScoreCandidate::new(
                value,
                confidence,
                method,
                &format!("{}: {}", label, text),
            ));
        }
    }
    best
}

/// Numbers in the containers around visible fear/greed text
pub struct DomNeighborhood;

impl DomNeighborhood {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DomNeighborhood {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionStrategy for DomNeighborhood {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::DomNeighborhood
    }

    fn gate(&self) -> Gate {
        Gate::Medium
    }

    fn attempt(&self, page: &Page<'_>, scorer: &ConfidenceScorer) -> Option<ScoreCandidate> {
        let mut visited = HashSet::new();
        let mut best: Option<ScoreCandidate> = None;

        for node in page.dom().root_element().descendants() {
            let Some(text) = node.value().as_text() else {
                continue;
            };
            if !mentions_terms(text) {
                continue;
            }

            let ancestors: Vec<ElementRef> = node.ancestors().filter_map(ElementRef::wrap).collect();
            if ancestors.iter().any(is_hidden) {
                continue;
            }

            let containers = ancestors
                .into_iter()
                .take_while(|el| !matches!(el.value().name(), "body" | "html"))
                .take(MAX_ANCESTORS);

            for container in containers {
                if !visited.insert(container.id()) {
                    continue;
                }
                let content = visible_text(container)
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ");
                if content.chars().count() > MAX_CONTAINER_CHARS {
                    break;
                }
                let label = format!("<{}>", container.value().name());
                if let Some(candidate) = best_number(&content, scorer, self.method(), &label) {
                    if best.as_ref().map_or(true, |b| candidate.confidence > b.confidence) {
                        best = Some(candidate);
                    }
                }
            }
        }

        best
    }
}

/// `<meta>` tags whose name and content talk about the market mood
pub struct MetadataScan;

impl MetadataScan {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MetadataScan {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionStrategy for MetadataScan {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::Metadata
    }

    fn gate(&self) -> Gate {
        Gate::Medium
    }

    fn attempt(&self, page: &Page<'_>, scorer: &ConfidenceScorer) -> Option<ScoreCandidate> {
        let mut best: Option<ScoreCandidate> = None;

        let metas = page
            .dom()
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|el| el.value().name() == "meta");

        for meta in metas {
            let element = meta.value();
            let Some(content) = element.attr("content") else {
                continue;
            };
            let key = ["name", "property", "itemprop"]
                .iter()
                .filter_map(|attr| element.attr(attr))
                .collect::<Vec<_>>()
                .join(" ");

            let combined = format!("{} {}", key, content).to_lowercase();
            if !META_TOPIC_WORDS.iter().any(|word| combined.contains(word)) {
                continue;
            }

            let label = format!("meta[{}]", key);
            if let Some(candidate) = best_number(content, scorer, self.method(), &label) {
                if best.as_ref().map_or(true, |b| candidate.confidence > b.confidence) {
                    best = Some(candidate);
                }
            }
        }

        best
    }
}
