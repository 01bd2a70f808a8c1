//! Small helpers over parsed HTML and raw text

use regex::Regex;
use scraper::{ElementRef, Node};
use std::sync::OnceLock;

/// Elements whose text never reaches the reader
const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

static SMALL_NUMBER: OnceLock<Regex> = OnceLock::new();
static TAG: OnceLock<Regex> = OnceLock::new();

fn small_number() -> &'static Regex {
    SMALL_NUMBER.get_or_init(|| Regex::new(r"\b(\d{1,2})\b").expect("Invalid small number regex"))
}

fn tag() -> &'static Regex {
    TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("Invalid tag regex"))
}

pub fn is_hidden(element: &ElementRef) -> bool {
    HIDDEN_ELEMENTS.contains(&element.value().name())
}

/// Text content of `element`, skipping scripts and styles
pub fn visible_text(element: ElementRef) -> String {
    let mut out = String::new();
    collect_visible(element, &mut out);
    out
}

fn collect_visible(element: ElementRef, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
                out.push(' ');
            }
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    if !is_hidden(&child_element) {
                        collect_visible(child_element, out);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Text directly owned by `element` (no descendants)
pub fn own_text(element: ElementRef) -> String {
    element
        .children()
        .filter_map(|child| child.value().as_text().map(|t| t.to_string()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Every standalone 1-2 digit number, in order
pub fn small_numbers(text: &str) -> Vec<u8> {
    small_number()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

/// Whole-string integer in [0, 100], tolerating surrounding whitespace
pub fn bare_score(text: &str) -> Option<u8> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.len() > 3 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    trimmed.parse::<u8>().ok().filter(|v| *v <= 100)
}

/// Replace markup with spaces
pub fn strip_tags(text: &str) -> String {
    tag().replace_all(text, " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    #[test]
    fn test_visible_text_skips_scripts() {
        let html = Html::parse_fragment(
            "<div id='x'>Fear <script>var greed = 99;</script><b>Greed</b> 45</div>",
        );
        let selector = Selector::parse("#x").unwrap();
        let div = html.select(&selector).next().unwrap();
        let text = visible_text(div);
        assert!(text.contains("Fear"));
        assert!(text.contains("45"));
        assert!(!text.contains("99"));
    }

    #[test]
    fn test_own_text() {
        let html = Html::parse_fragment("<span id='s'>63<i>12</i></span>");
        let selector = Selector::parse("#s").unwrap();
        let span = html.select(&selector).next().unwrap();
        assert_eq!(own_text(span).trim(), "63");
    }

    #[test]
    fn test_numbers() {
        assert_eq!(small_numbers("index 45, prev 120, week 7"), vec![45, 7]);
        assert_eq!(bare_score(" 63 "), Some(63));
        assert_eq!(bare_score("100"), Some(100));
        assert_eq!(bare_score("101"), None);
        assert_eq!(bare_score("63%"), None);
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("<b>Fear</b> 20").trim(), "Fear  20");
    }
}
