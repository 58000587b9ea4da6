use error_stack::{Report, ResultExt};
use futures::future::BoxFuture;
use serde::Serialize;

use crate::error::NotifyError;
use crate::notifier::Notifier;

pub const TELEGRAM_BASE_URL: &str = "https://api.telegram.org";
const CHANNEL: &str = "telegram";

/// Telegram Bot API `sendMessage`.
pub struct TelegramNotifier {
    client: reqwest::Client,
    base_url: String,
    token: String,
    chat_id: String,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

impl TelegramNotifier {
    pub fn new(client: reqwest::Client, base_url: &str, token: &str, chat_id: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            token: token.to_owned(),
            chat_id: chat_id.to_owned(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.base_url, self.token)
    }
}

impl Notifier for TelegramNotifier {
    fn channel(&self) -> &str {
        CHANNEL
    }

    fn send<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<(), Report<NotifyError>>> {
        Box::pin(async move {
            let payload = SendMessage {
                chat_id: &self.chat_id,
                text,
            };

            // The bot token is part of the URL; keep it out of error output.
            let response = self
                .client
                .post(self.endpoint())
                .json(&payload)
                .send()
                .await
                .map_err(|e| e.without_url())
                .change_context(NotifyError::Transport {
                    channel: CHANNEL.into(),
                })?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(Report::new(NotifyError::Rejected {
                    channel: CHANNEL.into(),
                })
                .attach(format!("HTTP status: {status}"))
                .attach(format!("response body: {body}")));
            }

            Ok(())
        })
    }
}
