//! Message delivery
//!
//! Telegram caps message length, so long texts are split on line boundaries
//! and each part is prefixed with an `[i/n]` label. The bot token is part of
//! the request URL and is stripped from every error and log line.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::TelegramConfig;
use crate::error::{Error, Result};

/// Room left on each part for the `[i/n]` label
const LABEL_RESERVE: usize = 12;

/// Anything that can deliver a text message
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
}

/// Split `text` into parts of at most `max_chars` characters, label included
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let budget = max_chars.saturating_sub(LABEL_RESERVE).max(1);
    let mut parts: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for line in text.lines() {
        for piece in chunk_chars(line, budget) {
            let piece_len = piece.chars().count();
            let needed = if current.is_empty() { piece_len } else { current_len + 1 + piece_len };
            if needed > budget && !current.is_empty() {
                parts.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if !current.is_empty() {
                current.push('\n');
                current_len += 1;
            }
            current.push_str(&piece);
            current_len += piece_len;
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }

    let total = parts.len();
    parts
        .into_iter()
        .enumerate()
        .map(|(i, part)| format!("[{}/{}]\n{}", i + 1, total, part))
        .collect()
}

/// Hard-split a single line that is longer than the budget
fn chunk_chars(line: &str, budget: usize) -> Vec<String> {
    if line.chars().count() <= budget {
        return vec![line.to_string()];
    }
    let chars: Vec<char> = line.chars().collect();
    chars.chunks(budget).map(|c| c.iter().collect()).collect()
}

/// Send `text`, split as needed, stopping at the first failed part
pub async fn deliver(notifier: &dyn Notifier, text: &str, max_chars: usize) -> Result<usize> {
    let parts = split_message(text, max_chars);
    let total = parts.len();
    for (i, part) in parts.iter().enumerate() {
        debug!("Sending part {}/{} ({} chars)", i + 1, total, part.chars().count());
        notifier.send(part).await?;
    }
    Ok(total)
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    description: Option<String>,
}

/// Telegram Bot API client
pub struct TelegramNotifier {
    client: Client,
    config: TelegramConfig,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.config.api_base.trim_end_matches('/'),
            self.config.bot_token
        )
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        let request = SendMessageRequest {
            chat_id: &self.config.chat_id,
            text,
            parse_mode: &self.config.parse_mode,
            disable_web_page_preview: true,
        };

        let response = self
            .client
            .post(self.endpoint())
            .form(&request)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .send()
            .await
            .map_err(|e| Error::Delivery(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Delivery(e.without_url().to_string()))?;

        if !status.is_success() {
            let reason = serde_json::from_str::<TelegramResponse>(&body)
                .ok()
                .and_then(|r| r.description)
                .unwrap_or_else(|| body.chars().take(200).collect());
            return Err(Error::Delivery(format!("HTTP {}: {}", status, reason)));
        }

        match serde_json::from_str::<TelegramResponse>(&body) {
            Ok(parsed) if parsed.ok => {
                info!("Delivered message ({} chars)", text.chars().count());
                Ok(())
            }
            Ok(parsed) => Err(Error::Delivery(
                parsed.description.unwrap_or_else(|| "ok=false without description".to_string()),
            )),
            Err(e) => Err(Error::Delivery(format!("unreadable Telegram response: {}", e))),
        }
    }
}

/// Prints messages instead of sending them (dry runs)
#[derive(Debug, Default)]
pub struct StdoutNotifier;

#[async_trait]
impl Notifier for StdoutNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        println!("{}", text);
        println!("{}", "-".repeat(40));
        Ok(())
    }
}
