//! Line windows around fear/greed mentions
//!
//! Works on the raw source so it still finds something when the markup is
//! too broken for the DOM strategies. Minified pages come as a handful of
//! enormous lines; those are cut down to a fixed span around the keyword.

use regex::Regex;
use std::sync::OnceLock;

use crate::extract::html::{small_numbers, strip_tags};
use crate::extract::{window, ConfidenceScorer, ExtractionMethod, ExtractionStrategy, Gate, Page, ScoreCandidate};

/// Lines either side of a keyword line
const LINE_RADIUS: usize = 2;
const MAX_LINE_CHARS: usize = 500;
/// Span kept around a keyword inside an overlong line
const LONG_LINE_RADIUS: usize = 200;
const MAX_SPANS_PER_LINE: usize = 20;
/// Ranking bonus when the keyword line itself names both terms
const BOTH_TERMS_BONUS: f64 = 0.2;

static KEYWORD: OnceLock<Regex> = OnceLock::new();

fn keyword() -> &'static Regex {
    KEYWORD.get_or_init(|| Regex::new(r"(?i)fear|greed").expect("Invalid keyword regex"))
}

/// A stripped text window plus the line it was centred on
struct Snippet {
    text: String,
    focus: String,
}

pub struct ContextualWindow;

impl ContextualWindow {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ContextualWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionStrategy for ContextualWindow {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::ContextualWindow
    }

    fn gate(&self) -> Gate {
        Gate::Medium
    }

    fn attempt(&self, page: &Page<'_>, scorer: &ConfidenceScorer) -> Option<ScoreCandidate> {
        // (rank, candidate); rank only orders, the candidate keeps plain confidence
        let mut best: Option<(f64, ScoreCandidate)> = None;

        for snippet in snippets(page.body()) {
            let focus_lower = snippet.focus.to_lowercase();
            let both_terms = focus_lower.contains("fear") && focus_lower.contains("greed");

            for value in small_numbers(&snippet.text) {
                let confidence = scorer.confidence(&snippet.text, value);
                let rank = if both_terms {
                    confidence + BOTH_TERMS_BONUS
                } else {
                    confidence
                };

                if best.as_ref().map_or(true, |(best_rank, _)| rank > *best_rank) {
                    let candidate = ScoreCandidate::new(value, confidence, self.method(), &snippet.text);
                    best = Some((rank, candidate));
                }
            }
        }

        best.map(|(_, candidate)| candidate)
    }
}

fn snippets(body: &str) -> Vec<Snippet> {
    let lines: Vec<&str> = body.lines().collect();
    let mut out = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        if !keyword().is_match(line) {
            continue;
        }

        if line.len() > MAX_LINE_CHARS {
            for m in keyword().find_iter(line).take(MAX_SPANS_PER_LINE) {
                let text = collapse(&strip_tags(window(line, m.start(), m.end(), LONG_LINE_RADIUS)));
                out.push(Snippet {
                    focus: text.clone(),
                    text,
                });
            }
            continue;
        }

        let lo = idx.saturating_sub(LINE_RADIUS);
        let hi = (idx + LINE_RADIUS).min(lines.len() - 1);
        let joined = lines[lo..=hi]
            .iter()
            .filter(|l| l.len() <= MAX_LINE_CHARS)
            .copied()
            .collect::<Vec<_>>()
            .join("\n");

        out.push(Snippet {
            text: collapse(&strip_tags(&joined)),
            focus: collapse(&strip_tags(line)),
        });
    }

    out
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
