use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("HTTP error talking to alert sink: {0}")]
    Http(String),
}

/// Dispatches operator-facing notifications. `urgent` distinguishes the
/// kill-switch/safety-veto alerts spec.md §7 calls out from routine
/// SUCCESS/FAILED notices.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, message: &str, urgent: bool) -> Result<(), AlertError>;
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: String,
}

/// Telegram Bot API sink, over the same `reqwest::Client` pattern the
/// teacher uses in `chain/cex_client.rs` for its Coinbase fetch.
pub struct TelegramAlertSink {
    client: reqwest::Client,
    bot_token: String,
    chat_id: String,
}

impl TelegramAlertSink {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        TelegramAlertSink {
            client: reqwest::Client::new(),
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
        }
    }
}

#[async_trait]
impl AlertSink for TelegramAlertSink {
    async fn send(&self, message: &str, urgent: bool) -> Result<(), AlertError> {
        let text = if urgent { format!("URGENT: {message}") } else { message.to_string() };
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        self.client
            .post(&url)
            .json(&SendMessageRequest { chat_id: &self.chat_id, text })
            .send()
            .await
            .map_err(|e| AlertError::Http(e.to_string()))?;
        Ok(())
    }
}

/// Discards every alert. Used when no Telegram credentials are configured
/// and by tests that exercise the orchestrator without a live sink.
#[derive(Debug, Default)]
pub struct NoopAlertSink;

#[async_trait]
impl AlertSink for NoopAlertSink {
    async fn send(&self, _message: &str, _urgent: bool) -> Result<(), AlertError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_sink_always_succeeds() {
        let sink = NoopAlertSink;
        assert!(sink.send("test", false).await.is_ok());
        assert!(sink.send("test", true).await.is_ok());
    }
}
