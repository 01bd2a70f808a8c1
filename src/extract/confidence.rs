//! Plausibility scoring for candidate scores
//!
//! Confidence is additive over independent context signals and clamped to
//! 1.0. Two threshold layers apply: a global floor every candidate must clear,
//! and a per-strategy gate resolved from [`Gate`].

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use crate::config::ExtractionConfig;
use crate::extract::ScoreCandidate;

/// Domain words worth +0.1 each
const DOMAIN_KEYWORDS: [&str; 6] = ["index", "market", "sentiment", "emotion", "score", "current"];
const DOMAIN_KEYWORD_WEIGHT: f64 = 0.1;
const DOMAIN_KEYWORD_CAP: f64 = 0.3;

const BOTH_TERMS_WEIGHT: f64 = 0.4;
const ONE_TERM_WEIGHT: f64 = 0.2;

const PLAUSIBLE_RANGE: (u8, u8) = (20, 80);
const PLAUSIBLE_WEIGHT: f64 = 0.2;
const WIDE_RANGE: (u8, u8) = (10, 90);
const WIDE_WEIGHT: f64 = 0.1;

const KEYWORD_BEFORE_WEIGHT: f64 = 0.2;
const KEYWORD_AFTER_WEIGHT: f64 = 0.1;

static KEYWORD_THEN_NUMBER: OnceLock<Regex> = OnceLock::new();
static NUMBER_THEN_KEYWORD: OnceLock<Regex> = OnceLock::new();

fn keyword_then_number() -> &'static Regex {
    KEYWORD_THEN_NUMBER.get_or_init(|| {
        Regex::new(r"(?i)\b(?:score|index|value)\b\W{0,3}(\d{1,3})\b")
            .expect("Invalid keyword-then-number regex")
    })
}

fn number_then_keyword() -> &'static Regex {
    NUMBER_THEN_KEYWORD.get_or_init(|| {
        Regex::new(r"(?i)\b(\d{1,3})\W{0,3}(?:score|index|value)\b")
            .expect("Invalid number-then-keyword regex")
    })
}

/// Per-strategy acceptance class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    /// Structural matches with built-in trust; only the floor applies
    Fixed,
    /// Must reach the high-confidence threshold
    High,
    /// Must reach the medium-confidence threshold
    Medium,
    /// Only the global floor applies
    Floor,
}

/// Configurable threshold set
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    pub min: f64,
    pub medium: f64,
    pub high: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min: 0.3,
            medium: 0.4,
            high: 0.7,
        }
    }
}

impl Thresholds {
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            min: config.min_confidence,
            medium: config.medium_confidence,
            high: config.high_confidence,
        }
    }

    /// Confidence a candidate needs under `gate`
    pub fn for_gate(&self, gate: Gate) -> f64 {
        match gate {
            Gate::Fixed | Gate::Floor => self.min,
            Gate::Medium => self.medium.max(self.min),
            Gate::High => self.high.max(self.min),
        }
    }
}

/// Scores candidate plausibility and validates candidates
#[derive(Debug, Clone, Default)]
pub struct ConfidenceScorer {
    thresholds: Thresholds,
}

impl ConfidenceScorer {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Plausibility of `value` given the surrounding text, in [0, 1]
    pub fn confidence(&self, context: &str, value: u8) -> f64 {
        let lower = context.to_lowercase();
        let mut score = 0.0;

        let has_fear = lower.contains("fear");
        let has_greed = lower.contains("greed");
        if has_fear && has_greed {
            score += BOTH_TERMS_WEIGHT;
        } else if has_fear || has_greed {
            score += ONE_TERM_WEIGHT;
        }

        let keyword_hits = DOMAIN_KEYWORDS
            .iter()
            .filter(|keyword| lower.contains(*keyword))
            .count();
        score += (keyword_hits as f64 * DOMAIN_KEYWORD_WEIGHT).min(DOMAIN_KEYWORD_CAP);

        if (PLAUSIBLE_RANGE.0..=PLAUSIBLE_RANGE.1).contains(&value) {
            score += PLAUSIBLE_WEIGHT;
        } else if (WIDE_RANGE.0..=WIDE_RANGE.1).contains(&value) {
            score += WIDE_WEIGHT;
        }

        if adjacent(keyword_then_number(), &lower, value) {
            score += KEYWORD_BEFORE_WEIGHT;
        } else if adjacent(number_then_keyword(), &lower, value) {
            score += KEYWORD_AFTER_WEIGHT;
        }

        score.min(1.0)
    }

    /// Global validation: value in range and confidence above the floor
    pub fn validate(&self, candidate: &ScoreCandidate) -> bool {
        candidate.value <= 100 && candidate.confidence >= self.thresholds.min
    }

    /// Validation plus the strategy gate
    pub fn accepts(&self, candidate: &ScoreCandidate, gate: Gate) -> bool {
        self.validate(candidate) && candidate.confidence >= self.thresholds.for_gate(gate)
    }
}

fn adjacent(pattern: &Regex, text: &str, value: u8) -> bool {
    pattern
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .any(|m| m.as_str().parse::<u8>().ok() == Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractionMethod;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_monotonic_in_keyword_density() {
        let scorer = ConfidenceScorer::default();
        let rich = scorer.confidence("Fear & Greed index shows market sentiment at 50", 50);
        let bare = scorer.confidence("the number 50 appeared", 50);
        assert!(rich > bare, "rich {} should beat bare {}", rich, bare);
    }

    #[test]
    fn test_signal_weights() {
        let scorer = ConfidenceScorer::default();

        // Only the plausible-range bonus
        assert!(approx(scorer.confidence("nothing here", 50), 0.2));
        // Wide range only
        assert!(approx(scorer.confidence("nothing here", 85), 0.1));
        // Out of both ranges
        assert!(approx(scorer.confidence("nothing here", 5), 0.0));
        // One term
        assert!(approx(scorer.confidence("fear", 5), 0.2));
        // Both terms
        assert!(approx(scorer.confidence("fear greed", 5), 0.4));
    }

    #[test]
    fn test_domain_keywords_capped() {
        let scorer = ConfidenceScorer::default();
        let text = "index market sentiment emotion current";
        // Five keywords but the contribution is capped at 0.3
        assert!(approx(scorer.confidence(text, 5), 0.3));
    }

    #[test]
    fn test_adjacency_bonus() {
        let scorer = ConfidenceScorer::default();
        // "index" keyword + range + keyword-before-number
        let before = scorer.confidence("index: 63", 63);
        assert!(approx(before, 0.1 + 0.2 + 0.2));
        // number-before-keyword earns the smaller bonus
        let after = scorer.confidence("63 score", 63);
        assert!(approx(after, 0.1 + 0.2 + 0.1));
        // adjacency to a different number does not count
        let other = scorer.confidence("index: 12", 63);
        assert!(approx(other, 0.1 + 0.2));
    }

    #[test]
    fn test_clamped_to_one() {
        let scorer = ConfidenceScorer::default();
        let c = scorer.confidence(
            "Fear and Greed Index: 55 current market sentiment emotion score",
            55,
        );
        assert!(approx(c, 1.0));
    }

    #[test]
    fn test_validate_and_gates() {
        let scorer = ConfidenceScorer::default();
        let candidate = |confidence| ScoreCandidate::new(50, confidence, ExtractionMethod::RegexPatterns, "");

        assert!(!scorer.validate(&candidate(0.29)));
        assert!(scorer.validate(&candidate(0.3)));

        assert!(scorer.accepts(&candidate(0.35), Gate::Floor));
        assert!(!scorer.accepts(&candidate(0.35), Gate::Medium));
        assert!(scorer.accepts(&candidate(0.5), Gate::Medium));
        assert!(!scorer.accepts(&candidate(0.6), Gate::High));
        assert!(scorer.accepts(&candidate(0.7), Gate::High));
    }

    #[test]
    fn test_out_of_range_value_rejected() {
        let scorer = ConfidenceScorer::default();
        let candidate = ScoreCandidate::new(101, 1.0, ExtractionMethod::ExactSelector, "");
        assert!(!scorer.validate(&candidate));
    }

    #[test]
    fn test_thresholds_from_config() {
        let mut config = ExtractionConfig::default();
        config.high_confidence = 0.8;
        let thresholds = Thresholds::from_config(&config);
        assert_eq!(thresholds.for_gate(Gate::High), 0.8);
        assert_eq!(thresholds.for_gate(Gate::Fixed), 0.3);
    }
}
