//! CLI command implementations

use anyhow::{bail, Context, Result};
use chrono::{Datelike, Local, NaiveDate};
use serde::Serialize;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::calendar::MarketCalendar;
use crate::cli::OutputFormat;
use crate::config::{Config, SourceMode};
use crate::diagnose::{fetch_failure_report, PageReport};
use crate::extract::{ExtractionPipeline, Page};
use crate::fetch::{HttpFetcher, RawDocument};
use crate::notify::{deliver, Notifier, StdoutNotifier, TelegramNotifier};
use crate::runner::{RunOutcome, Runner};

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Telegram in normal runs, stdout for dry runs. Dry runs skip the secret check.
fn notifier(config: &Config, dry_run: bool) -> Result<Arc<dyn Notifier>> {
    if dry_run {
        config.validate_settings()?;
        warn!("Dry run: messages are printed, not sent");
        Ok(Arc::new(StdoutNotifier))
    } else {
        config.validate()?;
        Ok(Arc::new(TelegramNotifier::new(config.telegram.clone())))
    }
}

/// Daily run: gate on the calendar, fetch, extract, send
pub async fn run(
    config: &Config,
    date: Option<NaiveDate>,
    source: Option<SourceMode>,
    dry_run: bool,
    format: OutputFormat,
) -> Result<()> {
    let notifier = notifier(config, dry_run)?;
    let fetcher = Arc::new(HttpFetcher::new(config.source.clone())?);

    let mut runner = Runner::new(config, fetcher, notifier);
    if let Some(mode) = source {
        runner = runner.with_mode(mode);
    }

    let date = date.unwrap_or_else(today);
    let outcome = runner.run(date).await?;
    if format == OutputFormat::Json {
        return print_json(&outcome);
    }

    match outcome {
        RunOutcome::Skipped(decision) => {
            println!("{}: nothing sent", decision);
        }
        RunOutcome::Delivered { reading, parts, .. } => {
            println!(
                "{}: sent {}/100 ({}) in {} part(s), {}",
                date,
                reading.value,
                reading.band(),
                parts,
                reading.source
            );
        }
    }
    Ok(())
}

/// Show the calendar decision and the holiday list
pub fn calendar(config: &Config, date: Option<NaiveDate>, year: Option<i32>, format: OutputFormat) -> Result<()> {
    let calendar = MarketCalendar::new(&config.calendar);
    let date = date.unwrap_or_else(today);
    let year = year.unwrap_or_else(|| date.year());
    let decision = calendar.is_market_open(date);
    let holidays = calendar.holidays(year);

    if format == OutputFormat::Json {
        let listed: Vec<_> = holidays
            .iter()
            .map(|(day, holiday)| {
                json!({
                    "date": day,
                    "holiday": holiday,
                    "name": holiday.name(),
                    "floating": holiday.is_floating(),
                })
            })
            .collect();
        return print_json(&json!({ "decision": decision, "year": year, "holidays": listed }));
    }

    println!("\n=== MARKET CALENDAR ===\n");
    println!("{}", decision);

    println!("\nHolidays in {}:", year);
    for (day, holiday) in &holidays {
        let kind = if holiday.is_floating() { "floating" } else { "fixed" };
        println!("  {} {:<10} {:<8} {}", day, day.format("%A").to_string(), kind, holiday);
    }
    if !config.calendar.floating_holidays {
        println!("  (floating holidays disabled)");
    }
    Ok(())
}

/// Run the extraction pipeline against a saved page
pub fn extract(config: &Config, path: &Path, format: OutputFormat) -> Result<()> {
    let body = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let document = RawDocument::html(body, path.display().to_string());
    let pipeline = ExtractionPipeline::new(&config.extraction);
    let thresholds = pipeline.scorer().thresholds();
    let outcomes = pipeline.trace(&document);
    let result = pipeline.extract(&document);

    if format == OutputFormat::Json {
        print_json(&json!({
            "file": path.display().to_string(),
            "bytes": document.len(),
            "thresholds": thresholds,
            "trace": outcomes,
            "result": result.as_ref().ok(),
        }))?;
    } else {
        println!("\n=== EXTRACTION TRACE ({} bytes) ===\n", document.len());
        for outcome in &outcomes {
            let marker = if outcome.accepted { "=>" } else { "  " };
            match &outcome.candidate {
                Some(candidate) => println!(
                    "{} {:<20} {:>3} conf {:.2} (gate {:.2})  {}",
                    marker,
                    outcome.method.to_string(),
                    candidate.value,
                    candidate.confidence,
                    thresholds.for_gate(outcome.gate),
                    candidate.context
                ),
                None => println!("{} {:<20}   -", marker, outcome.method.to_string()),
            }
        }
    }

    match result {
        Ok(candidate) => {
            if format == OutputFormat::Text {
                println!("\nResult: {}", candidate);
            }
            Ok(())
        }
        Err(e) => bail!("{}", e),
    }
}

/// Fetch the page and report its structure, optionally sending the report
///
/// A failed fetch still produces a short report (sent with `--send`) before
/// the command fails.
pub async fn diagnose(config: &Config, send: bool, format: OutputFormat) -> Result<()> {
    config.validate_settings()?;
    let notifier = if send {
        config.validate()?;
        Some(TelegramNotifier::new(config.telegram.clone()))
    } else {
        None
    };
    let fetcher = HttpFetcher::new(config.source.clone())?;

    info!("Fetching {} for diagnostics", config.source.page_url);
    let (text, fetched) = match fetcher.fetch_page().await {
        Ok(document) => {
            let page = Page::new(&document);
            let report = PageReport::analyze(&page);
            let extraction = ExtractionPipeline::new(&config.extraction).extract_page(&page);
            let text = report.render();

            if format == OutputFormat::Json {
                print_json(&json!({
                    "report": report,
                    "extraction": extraction.as_ref().ok(),
                    "error": extraction.as_ref().err().map(|e| e.to_string()),
                }))?;
            } else {
                println!("{}", text);
                match &extraction {
                    Ok(candidate) => println!("\nExtraction: {}", candidate),
                    Err(e) => println!("\nExtraction: {}", e),
                }
            }
            (text, Ok(()))
        }
        Err(e) => {
            let text = fetch_failure_report(&config.source.page_url, &e.to_string());
            if format == OutputFormat::Json {
                print_json(&json!({ "url": config.source.page_url, "error": e.to_string() }))?;
            } else {
                println!("{}", text);
            }
            (text, Err(e))
        }
    };

    if let Some(notifier) = notifier {
        let parts = deliver(&notifier, &text, config.telegram.max_message_chars).await?;
        info!("Diagnostics sent in {} part(s)", parts);
    }

    fetched.context("Page fetch failed")
}

/// Show current configuration (secrets masked)
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.masked_display());
    match config.validate() {
        Ok(()) => println!("\nConfiguration OK"),
        Err(e) => println!("\nConfiguration problem: {}", e),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_stub;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const GAUGE_PAGE: &str =
        r#"<html><body><span class="market-fng-gauge__dial-number-value">63</span></body></html>"#;

    fn saved_page(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", body).unwrap();
        file
    }

    fn stub_config(base: &str) -> Config {
        let mut config = Config::default();
        config.source.page_url = format!("{}/markets/fear-and-greed", base);
        config.source.attempt_delay_ms = 0;
        config.telegram.api_base = base.to_string();
        config
    }

    #[test]
    fn test_extract_from_file() {
        let file = saved_page(GAUGE_PAGE);
        assert!(extract(&Config::default(), file.path(), OutputFormat::Text).is_ok());
        assert!(extract(&Config::default(), file.path(), OutputFormat::Json).is_ok());
    }

    #[test]
    fn test_extract_reports_failure() {
        let file = saved_page("<html><body>weather</body></html>");
        assert!(extract(&Config::default(), file.path(), OutputFormat::Text).is_err());
        assert!(extract(&Config::default(), file.path(), OutputFormat::Json).is_err());
    }

    #[test]
    fn test_extract_missing_file() {
        let missing = Path::new("/nonexistent/page.html");
        assert!(extract(&Config::default(), missing, OutputFormat::Text).is_err());
    }

    #[test]
    fn test_calendar_command() {
        let date = NaiveDate::from_ymd_opt(2024, 11, 28);
        assert!(calendar(&Config::default(), date, None, OutputFormat::Text).is_ok());
        assert!(calendar(&Config::default(), date, Some(2025), OutputFormat::Json).is_ok());
    }

    #[test]
    fn test_run_requires_secrets() {
        assert!(notifier(&Config::default(), false).is_err());
        assert!(notifier(&Config::default(), true).is_ok());
    }

    #[tokio::test]
    async fn test_diagnose_send_checks_secrets_before_fetching() {
        let requests = Arc::new(AtomicUsize::new(0));
        let counter = requests.clone();
        let base = spawn_stub(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            (200, GAUGE_PAGE.to_string())
        })
        .await;

        let config = stub_config(&base);
        assert!(diagnose(&config, true, OutputFormat::Text).await.is_err());
        assert_eq!(requests.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_diagnose_sends_report_when_fetch_fails() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let recorded = sent.clone();
        let base = spawn_stub(move |request| {
            if request.starts_with("POST ") {
                recorded.lock().unwrap().push(request.to_string());
                (200, r#"{"ok":true,"result":{}}"#.to_string())
            } else {
                (403, "denied".to_string())
            }
        })
        .await;

        let mut config = stub_config(&base);
        config.telegram.bot_token = "123:SECRET".to_string();
        config.telegram.chat_id = "42".to_string();

        assert!(diagnose(&config, true, OutputFormat::Text).await.is_err());

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("Fetch+failed"));
    }
}
