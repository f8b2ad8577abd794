//! Telegram operator alerts.

use async_trait::async_trait;
use emberline_config::AlertsConfig;
use emberline_core::Alerter;
use serde_json::json;
use tracing::{error, warn};

#[derive(Clone)]
pub struct TelegramAlerter {
    client: reqwest::Client,
    bot_token: String,
    chat_id: String,
}

impl std::fmt::Debug for TelegramAlerter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramAlerter")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

impl TelegramAlerter {
    pub fn new(config: &AlertsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            bot_token: config.telegram_bot_token.clone(),
            chat_id: config.telegram_chat_id.clone(),
        }
    }

    fn configured(&self) -> bool {
        !self.bot_token.is_empty() && !self.chat_id.is_empty()
    }
}

#[async_trait]
impl Alerter for TelegramAlerter {
    async fn alert(&self, message: &str) {
        if !self.configured() {
            // Alerts must still surface somewhere.
            warn!(alert = message, "Telegram not configured, logging alert instead");
            return;
        }

        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let result = self
            .client
            .post(&url)
            .json(&json!({ "chat_id": self.chat_id, "text": message }))
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                error!(status = %response.status(), "Telegram alert rejected");
            }
            Err(err) => {
                error!(error = %err, "Telegram alert failed to send");
            }
        }
    }
}
