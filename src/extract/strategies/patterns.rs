//! Text patterns over the raw page

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::extract::{window, ConfidenceScorer, ExtractionMethod, ExtractionStrategy, Gate, Page, ScoreCandidate};

/// Characters of context either side of a pattern match
const PATTERN_CONTEXT: usize = 100;
/// Characters either side of a loose match that must mention the topic
const BACKUP_CONTEXT: usize = 50;
const BACKUP_RANGE: (u8, u8) = (20, 90);
const BACKUP_TOPIC_WORDS: [&str; 4] = ["fear", "greed", "market", "emotion"];

/// Most specific first; ties in confidence go to the earlier pattern
const PATTERN_SOURCES: [&str; 5] = [
    r"(?i)fear\s*(?:&amp;|&|and)\s*greed\s*(?:index)?[^0-9]{0,40}?\b(\d{1,2})\b",
    r"(?i)\bgreed\s*(?:index)?\W{0,10}(\d{1,2})\b",
    r"(?i)\bfear\s*(?:index)?\W{0,10}(\d{1,2})\b",
    r"(?i)\b(\d{1,2})\s*[-:(]?\s*(?:extreme\s+)?(?:fear|greed)\b",
    r"(?i)\b(?:score|index)\W{0,5}(\d{1,2})\b",
];

static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
static LOOSE: OnceLock<Regex> = OnceLock::new();

fn patterns() -> &'static [Regex] {
    PATTERNS.get_or_init(|| {
        PATTERN_SOURCES
            .iter()
            .map(|source| Regex::new(source).expect("Invalid index pattern regex"))
            .collect()
    })
}

fn loose() -> &'static Regex {
    LOOSE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:current|market|index)\b[^0-9]{0,20}\b(\d{2})\b").expect("Invalid loose regex")
    })
}

/// Prioritised fear/greed patterns, best confidence wins
pub struct RegexPatterns;

impl RegexPatterns {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RegexPatterns {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionStrategy for RegexPatterns {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::RegexPatterns
    }

    fn gate(&self) -> Gate {
        Gate::High
    }

    fn attempt(&self, page: &Page<'_>, scorer: &ConfidenceScorer) -> Option<ScoreCandidate> {
        let body = page.body();
        let mut best: Option<ScoreCandidate> = None;

        for pattern in patterns() {
            for caps in pattern.captures_iter(body) {
                let (Some(whole), Some(number)) = (caps.get(0), caps.get(1)) else {
                    continue;
                };
                let Ok(value) = number.as_str().parse::<u8>() else {
                    continue;
                };
                let context = window(body, whole.start(), whole.end(), PATTERN_CONTEXT);
                let confidence = scorer.confidence(context, value);

                if best.as_ref().map_or(true, |b| confidence > b.confidence) {
                    best = Some(ScoreCandidate::new(value, confidence, self.method(), context));
                }
            }
        }

        best
    }
}

/// Loose two-digit numbers after market words, most frequent value wins
///
/// Last resort, disabled with `extraction.backup_patterns_enabled = false`.
pub struct BackupLoose;

impl BackupLoose {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BackupLoose {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionStrategy for BackupLoose {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::BackupLoose
    }

    fn gate(&self) -> Gate {
        Gate::Floor
    }

    fn attempt(&self, page: &Page<'_>, scorer: &ConfidenceScorer) -> Option<ScoreCandidate> {
        let body = page.body();
        // value -> (count, first context)
        let mut seen: HashMap<u8, (usize, &str)> = HashMap::new();
        let mut order: Vec<u8> = Vec::new();

        for caps in loose().captures_iter(body) {
            let Some(number) = caps.get(1) else {
                continue;
            };
            let Ok(value) = number.as_str().parse::<u8>() else {
                continue;
            };
            if !(BACKUP_RANGE.0..=BACKUP_RANGE.1).contains(&value) {
                continue;
            }

            let context = window(body, number.start(), number.end(), BACKUP_CONTEXT);
            let lower = context.to_lowercase();
            if !BACKUP_TOPIC_WORDS.iter().any(|word| lower.contains(word)) {
                continue;
            }

            seen.entry(value)
                .and_modify(|(count, _)| *count += 1)
                .or_insert_with(|| {
                    order.push(value);
                    (1, context)
                });
        }

        // Stable on first appearance when counts tie
        let mut winner: Option<(u8, usize, &str)> = None;
        for value in order {
            let (count, context) = seen[&value];
            if winner.map_or(true, |(_, best, _)| count > best) {
                winner = Some((value, count, context));
            }
        }

        winner.map(|(value, count, context)| {
            let confidence = scorer.confidence(context, value);
            ScoreCandidate::new(value, confidence, self.method(), &format!("x{} {}", count, context))
        })
    }
}
