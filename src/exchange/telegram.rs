// src/exchange/telegram.rs
use crate::domain::errors::{NotifyError, NotifyResult};
use crate::exchange::client::Notifier;
use async_trait::async_trait;
use std::time::Duration;

const SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Telegram `sendMessage` transport.
///
/// With no bot token or chat id configured, messages are logged instead so
/// the bot stays usable without a Telegram setup.
pub struct TelegramNotifier {
    http: reqwest::Client,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, chat_id: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
        }
    }

    fn is_configured(&self) -> bool {
        !self.bot_token.is_empty() && !self.chat_id.is_empty()
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, text: &str) -> NotifyResult<()> {
        if !self.is_configured() {
            log::info!("TG: {}", text.replace('\n', " | "));
            return Ok(());
        }

        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let response = self
            .http
            .post(&url)
            .form(&[("chat_id", self.chat_id.as_str()), ("text", text)])
            .timeout(SEND_TIMEOUT)
            .send()
            .await
            .map_err(|e| NotifyError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError::Api(format!(
                "sendMessage status {}",
                response.status()
            )));
        }
        Ok(())
    }
}
