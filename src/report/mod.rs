//! Telegram message rendering
//!
//! Output is Telegram HTML: only `<b>` and `<i>` are emitted and any text
//! coming from a source is escaped.

use chrono::NaiveDate;

use crate::types::{IndexReading, ReadingSource, Trend};

const BAR_CELLS: u8 = 10;
const FILLED_CELL: &str = "🟩";
const EMPTY_CELL: &str = "⬜";

/// Points either side of the average still called "in line"
pub const AVERAGE_NEUTRAL_ZONE: f64 = 5.0;

/// Ten-cell bar with `value / 10` cells filled
pub fn progress_bar(value: u8) -> String {
    let filled = (value / 10).min(BAR_CELLS);
    let mut bar = FILLED_CELL.repeat(filled as usize);
    bar.push_str(&EMPTY_CELL.repeat((BAR_CELLS - filled) as usize));
    bar
}

/// Day-over-day line
pub fn change_line(trend: Option<&Trend>) -> String {
    match trend.and_then(|t| t.change) {
        Some(change) if change > 0 => format!("📈 Up {} points from yesterday", change),
        Some(change) if change < 0 => format!("📉 Down {} points from yesterday", -change),
        Some(_) => "➡️ Unchanged from yesterday".to_string(),
        None => "➡️ No previous day to compare".to_string(),
    }
}

/// Comparison against the window average
pub fn average_line(value: u8, trend: Option<&Trend>) -> String {
    let Some(trend) = trend else {
        return "📊 No average available".to_string();
    };
    let diff = value as f64 - trend.average;
    if diff > AVERAGE_NEUTRAL_ZONE {
        format!("📊 Above the {}-day average ({:.1}) by {:+.1}", trend.days, trend.average, diff)
    } else if diff < -AVERAGE_NEUTRAL_ZONE {
        format!("📊 Below the {}-day average ({:.1}) by {:.1}", trend.days, trend.average, diff)
    } else {
        format!("📊 In line with the {}-day average ({:.1})", trend.days, trend.average)
    }
}

fn source_line(source: &ReadingSource) -> String {
    match source {
        ReadingSource::Api => "Source: alternative.me API".to_string(),
        ReadingSource::Scraped { method, confidence } => {
            format!("Source: CNN page via {} (confidence {:.2})", method, confidence)
        }
    }
}

/// Escape text for Telegram's HTML parse mode
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Everything that goes into one day's message
#[derive(Debug, Clone)]
pub struct DailyReport<'a> {
    pub date: NaiveDate,
    pub reading: &'a IndexReading,
    pub trend: Option<&'a Trend>,
}

impl<'a> DailyReport<'a> {
    pub fn new(date: NaiveDate, reading: &'a IndexReading, trend: Option<&'a Trend>) -> Self {
        Self { date, reading, trend }
    }

    pub fn render(&self) -> String {
        let band = self.reading.band();
        let advice = band.advice();
        let value = self.reading.value;
        let classification = self
            .reading
            .classification
            .as_deref()
            .map(escape_html)
            .unwrap_or_else(|| band.to_string());

        format!(
            r#"🌅 <b>Fear &amp; Greed Index</b> {emoji}
📅 {date} (US market open)

📊 <b>Current index: {value}/100</b>
{bar}
{label}

📈 <b>Market read</b>
• {change}
• {average}
• Status: {classification}

💡 <b>Guidance</b>
{guidance}

🎯 <b>Strategy</b>
{strategy}

<i>{source}</i>"#,
            emoji = band.emoji(),
            date = self.date.format("%Y-%m-%d %A"),
            value = value,
            bar = progress_bar(value),
            label = advice.label,
            change = change_line(self.trend),
            average = average_line(value, self.trend),
            classification = classification,
            guidance = advice.guidance,
            strategy = advice.strategy_hint,
            source = escape_html(&source_line(&self.reading.source)),
        )
    }
}

/// Sent instead of a report when no score could be determined
pub fn failure_notice(date: NaiveDate, reason: &str) -> String {
    format!(
        "❌ <b>Fear &amp; Greed Index unavailable</b>\n📅 {}\n\nCould not determine today's index. Please check again later.\n<i>{}</i>",
        date.format("%Y-%m-%d"),
        escape_html(reason)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractionMethod;

    fn reading(value: u8) -> IndexReading {
        IndexReading {
            value,
            classification: Some("Greed".to_string()),
            timestamp: None,
            time_until_update: None,
            source: ReadingSource::Api,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 11, 26).unwrap()
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0), "⬜".repeat(10));
        assert_eq!(progress_bar(72), format!("{}{}", "🟩".repeat(7), "⬜".repeat(3)));
        assert_eq!(progress_bar(100), "🟩".repeat(10));
    }

    #[test]
    fn test_change_line() {
        let up = Trend::from_values(&[60, 55]).unwrap();
        assert!(change_line(Some(&up)).contains("Up 5"));
        let down = Trend::from_values(&[50, 55]).unwrap();
        assert!(change_line(Some(&down)).contains("Down 5"));
        let flat = Trend::from_values(&[50, 50]).unwrap();
        assert!(change_line(Some(&flat)).contains("Unchanged"));
        assert!(change_line(None).contains("No previous"));
    }

    #[test]
    fn test_average_neutral_zone() {
        let trend = Trend::from_values(&[50, 50, 50]).unwrap();
        assert!(average_line(56, Some(&trend)).contains("Above"));
        assert!(average_line(55, Some(&trend)).contains("In line"));
        assert!(average_line(45, Some(&trend)).contains("In line"));
        assert!(average_line(44, Some(&trend)).contains("Below"));
    }

    #[test]
    fn test_render_contains_score_and_advice() {
        let r = reading(72);
        let trend = Trend::from_values(&[72, 70, 65]).unwrap();
        let message = DailyReport::new(date(), &r, Some(&trend)).render();

        assert!(message.contains("<b>Current index: 72/100</b>"));
        assert!(message.contains("🟢 Greed"));
        assert!(message.contains("Proceed with caution"));
        assert!(message.contains("Up 2 points"));
        assert!(message.contains("2024-11-26 Tuesday"));
        assert!(message.contains("alternative.me"));
    }

    #[test]
    fn test_render_scraped_source_escaped() {
        let r = IndexReading {
            classification: Some("<script>".to_string()),
            source: ReadingSource::Scraped {
                method: ExtractionMethod::RegexPatterns,
                confidence: 0.9,
            },
            ..reading(40)
        };
        let message = DailyReport::new(date(), &r, None).render();
        assert!(message.contains("&lt;script&gt;"));
        assert!(message.contains("regex_patterns"));
        assert!(message.contains("No average available"));
    }

    #[test]
    fn test_failure_notice() {
        let notice = failure_notice(date(), "all <8> strategies failed");
        assert!(notice.contains("unavailable"));
        assert!(notice.contains("&lt;8&gt;"));
    }
}
