//! Telegram Bot API transport — `sendMessage` to the destination's chat.

use async_trait::async_trait;
use tracing::info;

use vigil_core::error::{Result, VigilError};
use vigil_report::Report;

use crate::render::{render_body, render_title};
use crate::Notifier;

pub struct TelegramNotifier {
    bot_token: String,
    client: reqwest::Client,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str) -> Self {
        Self {
            bot_token: bot_token.to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    /// The destination id is used directly as the Telegram chat id.
    async fn send(&self, destination_id: &str, report: &Report) -> Result<()> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let text = format!(
            "⚠️ *{}*\n\n{}",
            escape_markdown(&render_title(report)),
            escape_markdown(&render_body(report))
        );

        let resp = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "chat_id": destination_id,
                "text": text,
                "parse_mode": "Markdown"
            }))
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| VigilError::Dispatch(format!("Telegram send failed: {e}")))?;

        if resp.status().is_success() {
            info!("✅ Telegram notification sent to chat {destination_id}");
            Ok(())
        } else {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            Err(VigilError::Dispatch(format!(
                "Telegram API error {status}: {body}"
            )))
        }
    }
}

/// Escape Telegram MarkdownV1 special characters.
fn escape_markdown(s: &str) -> String {
    s.replace('_', "\\_")
        .replace('*', "\\*")
        .replace('[', "\\[")
        .replace('`', "\\`")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("a_b*c[d`e"), "a\\_b\\*c\\[d\\`e");
        assert_eq!(escape_markdown("plain"), "plain");
    }
}
