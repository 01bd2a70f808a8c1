//! Class-based lookups for the gauge element

use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::OnceLock;

use crate::extract::html::{bare_score, own_text, visible_text};
use crate::extract::{ConfidenceScorer, ExtractionMethod, ExtractionStrategy, Gate, Page, ScoreCandidate};

const EXACT_CONFIDENCE: f64 = 1.0;
const RELAXED_CONFIDENCE: f64 = 0.9;

static LEADING_NUMBER: OnceLock<Regex> = OnceLock::new();

fn leading_number() -> &'static Regex {
    LEADING_NUMBER.get_or_init(|| Regex::new(r"\b(\d{1,3})\b").expect("Invalid leading number regex"))
}

fn first_score(text: &str) -> Option<u8> {
    leading_number()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| m.as_str().parse::<u8>().ok())
        .find(|v| *v <= 100)
}

fn elements(html: &Html) -> impl Iterator<Item = ElementRef<'_>> {
    html.root_element().descendants().filter_map(ElementRef::wrap)
}

/// The gauge's known class name
pub struct ExactSelector {
    class: String,
}

impl ExactSelector {
    pub fn new(class: &str) -> Self {
        Self {
            class: class.to_string(),
        }
    }
}

impl ExtractionStrategy for ExactSelector {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::ExactSelector
    }

    fn gate(&self) -> Gate {
        Gate::Fixed
    }

    fn attempt(&self, page: &Page<'_>, _scorer: &ConfidenceScorer) -> Option<ScoreCandidate> {
        let element = elements(page.dom()).find(|el| el.value().classes().any(|c| c == self.class))?;
        let text = visible_text(element);
        let value = first_score(&text)?;

        Some(ScoreCandidate::new(
            value,
            EXACT_CONFIDENCE,
            self.method(),
            &format!(".{} => {}", self.class, text),
        ))
    }
}

/// Any element whose class attribute contains one of the fragments and whose
/// text is nothing but a score; survives renamed or suffixed classes
pub struct RelaxedSelector {
    fragments: Vec<String>,
}

impl RelaxedSelector {
    pub fn new(fragments: Vec<String>) -> Self {
        Self { fragments }
    }
}

impl ExtractionStrategy for RelaxedSelector {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::RelaxedSelector
    }

    fn gate(&self) -> Gate {
        Gate::Fixed
    }

    fn attempt(&self, page: &Page<'_>, _scorer: &ConfidenceScorer) -> Option<ScoreCandidate> {
        if self.fragments.is_empty() {
            return None;
        }

        for element in elements(page.dom()) {
            let Some(class) = element.value().attr("class") else {
                continue;
            };
            let Some(fragment) = self.fragments.iter().find(|f| class.contains(f.as_str())) else {
                continue;
            };
            let value = bare_score(&own_text(element)).or_else(|| bare_score(&visible_text(element)));
            if let Some(value) = value {
                return Some(ScoreCandidate::new(
                    value,
                    RELAXED_CONFIDENCE,
                    self.method(),
                    &format!("class~{} ({}) => {}", fragment, class, value),
                ));
            }
        }

        None
    }
}
