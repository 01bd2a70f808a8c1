//! Score fields inside embedded script objects
//!
//! Pages often ship their chart state as a JS object literal. Objects that
//! enclose a fear/greed mention are cut out, repaired into JSON where that is
//! cheap (quoted keys, double quotes, no trailing commas) and searched for
//! score-like numeric fields. Anything that still fails to parse is skipped.

use regex::Regex;
use scraper::ElementRef;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::trace;

use crate::extract::{clip, ConfidenceScorer, ExtractionMethod, ExtractionStrategy, Gate, Page, ScoreCandidate};

/// Field names that carry the score itself
const SCORE_KEYS: [&str; 5] = ["score", "value", "index", "now", "current"];

/// How far back to look for the opening brace
const MAX_LOOKBACK: usize = 4_000;
/// Largest object we bother parsing
const MAX_OBJECT_BYTES: usize = 64 * 1024;
const MAX_DEPTH: usize = 8;

static SINGLE_QUOTED: OnceLock<Regex> = OnceLock::new();
static BARE_KEY: OnceLock<Regex> = OnceLock::new();
static TRAILING_COMMA: OnceLock<Regex> = OnceLock::new();

fn single_quoted() -> &'static Regex {
    SINGLE_QUOTED.get_or_init(|| Regex::new(r"'([^'\\]*)'").expect("Invalid single quote regex"))
}

fn bare_key() -> &'static Regex {
    BARE_KEY.get_or_init(|| {
        Regex::new(r"([{,]\s*)([A-Za-z_$][\w$]*)\s*:").expect("Invalid bare key regex")
    })
}

fn trailing_comma() -> &'static Regex {
    TRAILING_COMMA.get_or_init(|| Regex::new(r",\s*([}\]])").expect("Invalid trailing comma regex"))
}

/// A numeric field found while walking an object
#[derive(Debug, Clone, PartialEq)]
struct Field {
    path: String,
    value: u8,
}

pub struct ScriptObjectScan;

impl ScriptObjectScan {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ScriptObjectScan {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionStrategy for ScriptObjectScan {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::ScriptObjectScan
    }

    fn gate(&self) -> Gate {
        Gate::Medium
    }

    fn attempt(&self, page: &Page<'_>, scorer: &ConfidenceScorer) -> Option<ScoreCandidate> {
        let mut best: Option<(bool, ScoreCandidate)> = None;

        let scripts = page
            .dom()
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|el| el.value().name() == "script");

        for script in scripts {
            let source: String = script.text().collect();
            for object in enclosing_objects(&source) {
                let Some(parsed) = parse_lenient(object) else {
                    trace!("Skipping unparseable script object ({} bytes)", object.len());
                    continue;
                };

                let mut fields = Vec::new();
                walk(&parsed, "", 0, &mut fields);

                for field in fields {
                    let on_topic = mentions_terms(&field.path);
                    let context = format!("{} = {} | {}", field.path, field.value, clip(object, 80));
                    let confidence = scorer.confidence(&context, field.value);
                    let candidate = ScoreCandidate::new(field.value, confidence, self.method(), &context);

                    let better = match &best {
                        None => true,
                        Some((best_on_topic, current)) => {
                            (on_topic, candidate.confidence) > (*best_on_topic, current.confidence)
                        }
                    };
                    if better {
                        best = Some((on_topic, candidate));
                    }
                }
            }
        }

        best.map(|(_, candidate)| candidate)
    }
}

fn mentions_terms(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    lower.contains("fear") || lower.contains("greed")
}

/// Object literals enclosing each fear/greed mention, deduplicated
fn enclosing_objects(source: &str) -> Vec<&str> {
    let lower = source.to_ascii_lowercase();
    let bytes = source.as_bytes();
    let mut seen = HashSet::new();
    let mut objects = Vec::new();

    let mentions = lower
        .match_indices("fear")
        .chain(lower.match_indices("greed"))
        .map(|(pos, _)| pos);

    for pos in mentions {
        let Some(start) = opening_brace(bytes, pos) else {
            continue;
        };
        if !seen.insert(start) {
            continue;
        }
        if let Some(end) = closing_brace(bytes, start) {
            objects.push(&source[start..=end]);
        }
    }

    objects
}

fn opening_brace(bytes: &[u8], from: usize) -> Option<usize> {
    let floor = from.saturating_sub(MAX_LOOKBACK);
    let mut depth = 0usize;
    for i in (floor..from).rev() {
        match bytes[i] {
            b'}' => depth += 1,
            b'{' if depth == 0 => return Some(i),
            b'{' => depth -= 1,
            _ => {}
        }
    }
    None
}

fn closing_brace(bytes: &[u8], start: usize) -> Option<usize> {
    let limit = (start + MAX_OBJECT_BYTES).min(bytes.len());
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().take(limit).skip(start) {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'"' | b'\'' => quote = Some(b),
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse as JSON, falling back to a repaired copy
fn parse_lenient(object: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str(object) {
        return Some(value);
    }
    let repaired = single_quoted().replace_all(object, "\"$1\"");
    let repaired = bare_key().replace_all(&repaired, "$1\"$2\":");
    let repaired = trailing_comma().replace_all(&repaired, "$1");
    serde_json::from_str(&repaired).ok()
}

fn as_score(value: &Value) -> Option<u8> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !(0.0..=100.0).contains(&number) {
        return None;
    }
    Some(number.round() as u8)
}

fn walk(value: &Value, path: &str, depth: usize, out: &mut Vec<Field>) {
    if depth > MAX_DEPTH {
        return;
    }
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                let key_lower = key.to_ascii_lowercase();
                if SCORE_KEYS.contains(&key_lower.as_str()) || mentions_terms(key) {
                    if let Some(score) = as_score(child) {
                        out.push(Field {
                            path: child_path.clone(),
                            value: score,
                        });
                    }
                }
                walk(child, &child_path, depth + 1, out);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                walk(child, &format!("{}[{}]", path, i), depth + 1, out);
            }
        }
        _ => {}
    }
}
