//! # Vigil Channels
//!
//! Outbound notification transports. The scheduler hands over a
//! destination id and a [`Report`] value; everything about rendering and
//! transport addressing lives here. Binding a destination id to a concrete
//! address is this layer's job: Telegram treats the id as the chat id,
//! webhooks carry it in the payload.

pub mod render;
pub mod telegram;
pub mod webhook;

use async_trait::async_trait;
use tracing::info;

use vigil_core::config::NotifyConfig;
use vigil_core::error::Result;
use vigil_report::Report;

pub use telegram::TelegramNotifier;
pub use webhook::WebhookNotifier;

/// Delivers a report to a destination. Failures surface as
/// [`vigil_core::VigilError::Dispatch`]; the scheduler treats them as a
/// skipped cycle and retries next period.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;
    async fn send(&self, destination_id: &str, report: &Report) -> Result<()>;
}

/// Fan-out over every configured transport. Succeeds if at least one
/// transport accepted the message; the dedup marker must not advance when
/// nothing was actually delivered.
pub struct NotifierSet {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierSet {
    /// Build the set from config. Disabled transports are skipped.
    pub fn from_config(config: &NotifyConfig) -> Self {
        let mut notifiers: Vec<Box<dyn Notifier>> = Vec::new();
        if let Some(tg) = &config.telegram {
            if tg.enabled && !tg.bot_token.is_empty() {
                notifiers.push(Box::new(TelegramNotifier::new(&tg.bot_token)));
            }
        }
        if let Some(wh) = &config.webhook {
            if wh.enabled && !wh.url.is_empty() {
                notifiers.push(Box::new(WebhookNotifier::new(&wh.url, wh.headers.clone())));
            }
        }
        info!("📡 {} notification transport(s) configured", notifiers.len());
        Self { notifiers }
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    pub fn transport_names(&self) -> Vec<&str> {
        self.notifiers.iter().map(|n| n.name()).collect()
    }
}

#[async_trait]
impl Notifier for NotifierSet {
    fn name(&self) -> &str {
        "all"
    }

    async fn send(&self, destination_id: &str, report: &Report) -> Result<()> {
        let mut last_err = None;
        let mut delivered = 0usize;
        for notifier in &self.notifiers {
            match notifier.send(destination_id, report).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!("⚠️ {} dispatch to '{destination_id}': {e}", notifier.name());
                    last_err = Some(e);
                }
            }
        }
        match (delivered, last_err) {
            (0, Some(e)) => Err(e),
            (0, None) => Err(vigil_core::VigilError::Dispatch(
                "no notification transport configured".into(),
            )),
            _ => Ok(()),
        }
    }
}
