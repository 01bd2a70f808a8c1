//! The extraction strategies, in priority order

use crate::config::ExtractionConfig;
use crate::extract::ExtractionStrategy;

pub mod dom;
pub mod patterns;
pub mod script;
pub mod selector;
pub mod window;

pub use dom::{DomNeighborhood, MetadataScan};
pub use patterns::{BackupLoose, RegexPatterns};
pub use script::ScriptObjectScan;
pub use selector::{ExactSelector, RelaxedSelector};
pub use window::ContextualWindow;

/// Standard ordering, precise to speculative
pub fn standard(config: &ExtractionConfig) -> Vec<Box<dyn ExtractionStrategy>> {
    let mut strategies: Vec<Box<dyn ExtractionStrategy>> = vec![
        Box::new(ExactSelector::new(&config.exact_class)),
        Box::new(RelaxedSelector::new(config.class_fragments.clone())),
        Box::new(ScriptObjectScan::new()),
        Box::new(RegexPatterns::new()),
        Box::new(DomNeighborhood::new()),
        Box::new(MetadataScan::new()),
        Box::new(ContextualWindow::new()),
    ];

    if config.backup_patterns_enabled {
        strategies.push(Box::new(BackupLoose::new()));
    }

    strategies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{ExtractionMethod, ExtractionPipeline};
    use crate::fetch::RawDocument;

    const EXACT_CLASS: &str = "market-fng-gauge__dial-number-value";

    fn pipeline() -> ExtractionPipeline {
        ExtractionPipeline::new(&ExtractionConfig::default())
    }

    #[test]
    fn test_standard_order() {
        assert_eq!(
            pipeline().methods(),
            vec![
                ExtractionMethod::ExactSelector,
                ExtractionMethod::RelaxedSelector,
                ExtractionMethod::ScriptObjectScan,
                ExtractionMethod::RegexPatterns,
                ExtractionMethod::DomNeighborhood,
                ExtractionMethod::Metadata,
                ExtractionMethod::ContextualWindow,
                ExtractionMethod::BackupLoose,
            ]
        );
    }

    #[test]
    fn test_backup_can_be_disabled() {
        let config = ExtractionConfig {
            backup_patterns_enabled: false,
            ..ExtractionConfig::default()
        };
        let methods = ExtractionPipeline::new(&config).methods();
        assert_eq!(methods.len(), 7);
        assert!(!methods.contains(&ExtractionMethod::BackupLoose));
    }

    #[test]
    fn test_exact_selector_round_trip() {
        let body = format!("<span class=\"{}\">63</span>", EXACT_CLASS);
        let candidate = pipeline().extract(&RawDocument::html(body, "test")).unwrap();
        assert_eq!(candidate.value, 63);
        assert_eq!(candidate.confidence, 1.0);
        assert_eq!(candidate.method, ExtractionMethod::ExactSelector);
    }

    #[test]
    fn test_priority_beats_planted_backup() {
        let body = format!(
            r#"<html><body>
            <h1>Fear &amp; Greed Index</h1>
            <span class="{}">40</span>
            <p>Current market fear greed index 60. Current market emotion 60. Market index 60 greed.</p>
            </body></html>"#,
            EXACT_CLASS
        );
        let candidate = pipeline().extract(&RawDocument::html(body, "test")).unwrap();
        assert_eq!(candidate.value, 40);
        assert_eq!(candidate.method, ExtractionMethod::ExactSelector);
    }

    #[test]
    fn test_document_without_terms_yields_nothing() {
        let body = r#"<html><head><meta name="description" content="Current market index 55"></head>
            <body><h1>Weather report</h1><p>Current temperature 21, market day 3, index 45.</p>
            <script>var data = {score: 50, value: 40};</script></body></html>"#;
        let document = RawDocument::html(body, "test");
        let p = pipeline();

        for outcome in p.trace(&document) {
            assert!(
                outcome.candidate.as_ref().map(|c| !p.scorer().accepts(c, outcome.gate)).unwrap_or(true),
                "{} produced an acceptable candidate",
                outcome.method
            );
        }
        assert!(p.extract(&document).is_err());
    }

    #[test]
    fn test_drifted_class_uses_relaxed_selector() {
        let body = r#"<html><body><h1>Fear &amp; Greed</h1>
            <div class="fng-gauge__dial-number-value--v2">58</div></body></html>"#;
        let candidate = pipeline().extract(&RawDocument::html(body, "test")).unwrap();
        assert_eq!(candidate.value, 58);
        assert_eq!(candidate.method, ExtractionMethod::RelaxedSelector);
    }

    #[test]
    fn test_text_only_page_uses_patterns() {
        let body = "<html><body><p>The CNN Fear &amp; Greed Index: 27 today, signalling fear.</p></body></html>";
        let candidate = pipeline().extract(&RawDocument::html(body, "test")).unwrap();
        assert_eq!(candidate.value, 27);
        assert_eq!(candidate.method, ExtractionMethod::RegexPatterns);
    }
}
