//! Fear & Greed Index notifier library
//!
//! Daily market-sentiment report: gate on the US market calendar, fetch the
//! index from the JSON API or scrape it from a page, classify it and send
//! the report to Telegram.

pub mod calendar;
pub mod classify;
pub mod cli;
pub mod config;
pub mod diagnose;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod notify;
pub mod report;
pub mod runner;
pub mod types;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use runner::{RunOutcome, Runner};
