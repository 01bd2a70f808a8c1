//! One daily run: calendar gate, fetch, extract, report, deliver

use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::calendar::{CalendarDecision, MarketCalendar};
use crate::config::{Config, SourceMode};
use crate::error::{Error, Result};
use crate::extract::ExtractionPipeline;
use crate::fetch::{api, DocumentSource, FetchTarget};
use crate::notify::{deliver, Notifier};
use crate::report::{failure_notice, DailyReport};
use crate::types::{IndexReading, ReadingSource, Trend};

/// What a run did
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Market closed; nothing fetched or sent
    Skipped(CalendarDecision),
    Delivered {
        reading: IndexReading,
        trend: Option<Trend>,
        parts: usize,
    },
}

pub struct Runner {
    calendar: MarketCalendar,
    source: Arc<dyn DocumentSource>,
    pipeline: ExtractionPipeline,
    notifier: Arc<dyn Notifier>,
    mode: SourceMode,
    history_days: u32,
    max_message_chars: usize,
}

impl Runner {
    pub fn new(config: &Config, source: Arc<dyn DocumentSource>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            calendar: MarketCalendar::new(&config.calendar),
            source,
            pipeline: ExtractionPipeline::new(&config.extraction),
            notifier,
            mode: config.source.mode,
            history_days: config.source.history_days,
            max_message_chars: config.telegram.max_message_chars,
        }
    }

    pub fn with_mode(mut self, mode: SourceMode) -> Self {
        self.mode = mode;
        self
    }

    /// Run for `date`; closed days are a successful no-op
    pub async fn run(&self, date: NaiveDate) -> Result<RunOutcome> {
        let decision = self.calendar.is_market_open(date);
        if !decision.is_open {
            info!("{}, skipping notification", decision);
            return Ok(RunOutcome::Skipped(decision));
        }
        info!("{}, fetching the index ({:?} source)", decision, self.mode);

        let reading = match self.reading().await {
            Ok(reading) => reading,
            Err(e) => {
                error!("No index for {}: {}", date, e);
                if !e.is_fatal() {
                    self.send_failure_notice(date, &e).await;
                }
                return Err(e);
            }
        };

        let trend = self.trend().await;
        let message = DailyReport::new(date, &reading, trend.as_ref()).render();
        let parts = deliver(self.notifier.as_ref(), &message, self.max_message_chars).await?;

        info!(
            value = reading.value,
            band = %reading.band(),
            source = %reading.source,
            parts,
            "Daily report delivered"
        );
        Ok(RunOutcome::Delivered { reading, trend, parts })
    }

    /// Fetch and interpret the current index for the configured mode
    pub async fn reading(&self) -> Result<IndexReading> {
        match self.mode {
            SourceMode::Api => {
                let document = self.source.fetch(FetchTarget::Api).await?;
                api::parse_latest(&document)
            }
            SourceMode::Scrape => {
                let document = self.source.fetch(FetchTarget::Page).await?;
                let candidate = self.pipeline.extract(&document)?;
                Ok(IndexReading {
                    value: candidate.value,
                    classification: None,
                    timestamp: None,
                    time_until_update: None,
                    source: ReadingSource::Scraped {
                        method: candidate.method,
                        confidence: candidate.confidence,
                    },
                })
            }
        }
    }

    /// History only exists for the API series; failures just drop the trend
    async fn trend(&self) -> Option<Trend> {
        if self.mode != SourceMode::Api || self.history_days < 2 {
            return None;
        }
        let values = match self.source.fetch(FetchTarget::History(self.history_days)).await {
            Ok(document) => api::parse_history(&document),
            Err(e) => Err(e),
        };
        match values {
            Ok(values) => Trend::from_values(&values),
            Err(e) => {
                warn!("Trend unavailable: {}", e);
                None
            }
        }
    }

    async fn send_failure_notice(&self, date: NaiveDate, cause: &Error) {
        let notice = failure_notice(date, &cause.to_string());
        if let Err(e) = deliver(self.notifier.as_ref(), &notice, self.max_message_chars).await {
            warn!("Failure notice not delivered: {}", e);
        }
    }
}
