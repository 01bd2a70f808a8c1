//! Page structure report for when extraction stops working
//!
//! Summarises what a fetched page looks like around the index so the
//! strategies can be retuned without saving and hand-reading the HTML.

use regex::Regex;
use scraper::{ElementRef, Html};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::OnceLock;

use crate::extract::html::small_numbers;
use crate::extract::{clip, window, Page};
use crate::report::escape_html;

/// Keyword occurrences whose surroundings are mined for numbers
const NEARBY_MATCHES: usize = 5;
const NEARBY_RADIUS: usize = 100;
const MAX_CLASSES: usize = 10;
const SAMPLE_MATCHES: usize = 2;
const SAMPLE_RADIUS: usize = 200;
const SAMPLE_CHARS: usize = 300;
const PROBE_EXAMPLES: usize = 3;

const CLASS_KEYWORDS: [&str; 8] = ["fear", "greed", "gauge", "dial", "score", "value", "market", "index"];

/// (name, pattern, show examples)
const PROBES: [(&str, &str, bool); 4] = [
    ("market-fng-gauge__dial-number-value", r"market-fng-gauge__dial-number-value", true),
    ("dial-number-value", r"dial-number-value", true),
    ("fear..greed..number", r"(?is)fear.{0,200}?greed.{0,200}?\b(\d{1,2})\b", false),
    ("data-* attribute with number", r#"(?i)data-[\w-]*=["'][^"']*?\b(\d{1,2})\b[^"']*["']"#, true),
];

static KEYWORD: OnceLock<Regex> = OnceLock::new();
static PROBE_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

fn keyword() -> &'static Regex {
    KEYWORD.get_or_init(|| Regex::new(r"(?i)fear|greed").expect("Invalid keyword regex"))
}

fn probe_patterns() -> &'static [Regex] {
    PROBE_PATTERNS.get_or_init(|| {
        PROBES
            .iter()
            .map(|(_, pattern, _)| Regex::new(pattern).expect("Invalid probe regex"))
            .collect()
    })
}

/// Match count for one probe pattern
#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub name: &'static str,
    pub matches: usize,
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageReport {
    pub source_url: String,
    pub bytes: usize,
    pub fear_count: usize,
    pub greed_count: usize,
    /// Distinct 1-2 digit numbers anywhere on the page
    pub distinct_numbers: usize,
    /// Distinct 1-2 digit numbers near the first few keyword mentions
    pub nearby_numbers: Vec<u8>,
    pub classes: Vec<String>,
    pub probes: Vec<ProbeResult>,
    pub samples: Vec<String>,
}

impl PageReport {
    pub fn analyze(page: &Page<'_>) -> Self {
        let document = page.document();
        let body = &document.body;
        let lower = body.to_lowercase();
        let fear_count = lower.matches("fear").count();
        let greed_count = lower.matches("greed").count();

        let mut report = Self {
            source_url: document.source_url.clone(),
            bytes: body.len(),
            fear_count,
            greed_count,
            distinct_numbers: 0,
            nearby_numbers: Vec::new(),
            classes: Vec::new(),
            probes: Vec::new(),
            samples: Vec::new(),
        };
        if fear_count == 0 && greed_count == 0 {
            return report;
        }

        report.distinct_numbers = small_numbers(body).into_iter().collect::<BTreeSet<_>>().len();

        let mentions: Vec<_> = keyword().find_iter(body).collect();
        report.nearby_numbers = mentions
            .iter()
            .take(NEARBY_MATCHES)
            .flat_map(|m| small_numbers(window(body, m.start(), m.end(), NEARBY_RADIUS)))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        report.classes = relevant_classes(page.dom());

        report.probes = PROBES
            .iter()
            .zip(probe_patterns())
            .map(|(&(name, _, show), pattern)| {
                let found: Vec<_> = pattern.find_iter(body).collect();
                let examples = if show {
                    found
                        .iter()
                        .take(PROBE_EXAMPLES)
                        .map(|m| clip(m.as_str(), 80))
                        .collect()
                } else {
                    Vec::new()
                };
                ProbeResult {
                    name,
                    matches: found.len(),
                    examples,
                }
            })
            .collect();

        report.samples = mentions
            .iter()
            .take(SAMPLE_MATCHES)
            .map(|m| clip(window(body, m.start(), m.end(), SAMPLE_RADIUS), SAMPLE_CHARS))
            .collect();

        report
    }

    pub fn has_keywords(&self) -> bool {
        self.fear_count > 0 || self.greed_count > 0
    }

    /// Plain-text rendering, safe for Telegram HTML mode
    pub fn render(&self) -> String {
        let mut lines = vec![
            format!("🔍 Page analysis: {}", escape_html(&self.source_url)),
            "=".repeat(40),
            format!("Size: {} bytes", self.bytes),
            "📊 Keyword counts:".to_string(),
            format!("  - 'fear': {}", self.fear_count),
            format!("  - 'greed': {}", self.greed_count),
        ];

        if !self.has_keywords() {
            lines.push("❌ No fear/greed keywords, probably the wrong page".to_string());
            return lines.join("\n");
        }

        let nearby = if self.nearby_numbers.is_empty() {
            "none".to_string()
        } else {
            self.nearby_numbers
                .iter()
                .map(|n| n.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        lines.push(format!("\n🔢 Distinct numbers on page: {}", self.distinct_numbers));
        lines.push(format!("🎯 Numbers near fear/greed: {}", nearby));

        lines.push(format!("\n🏷️ Relevant classes ({}):", self.classes.len()));
        lines.extend(self.classes.iter().map(|class| format!("  - {}", escape_html(class))));

        lines.push("\n🔍 Probe patterns:".to_string());
        for probe in &self.probes {
            lines.push(format!("  - {}: {} matches", probe.name, probe.matches));
            lines.extend(probe.examples.iter().map(|example| format!("    → {}", escape_html(example))));
        }

        lines.push("\n📄 Samples:".to_string());
        lines.extend(
            self.samples
                .iter()
                .enumerate()
                .map(|(i, sample)| format!("  {}: {}", i + 1, escape_html(sample))),
        );

        lines.join("\n")
    }
}

/// Report sent when the page could not be fetched at all
pub fn fetch_failure_report(url: &str, reason: &str) -> String {
    format!(
        "🔍 Page analysis: {}\n{}\n❌ Fetch failed: {}",
        escape_html(url),
        "=".repeat(40),
        escape_html(reason)
    )
}

/// Class names mentioning gauge-related words, sorted, capped
fn relevant_classes(html: &Html) -> Vec<String> {
    html.root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .flat_map(|el| el.value().classes().map(str::to_string).collect::<Vec<_>>())
        .filter(|class| {
            let lower = class.to_lowercase();
            CLASS_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .take(MAX_CLASSES)
        .collect()
}
