//! Generic HTTP webhook transport — POST the report as JSON.

use async_trait::async_trait;
use tracing::info;

use vigil_core::error::{Result, VigilError};
use vigil_report::Report;

use crate::render::render_body;
use crate::Notifier;

pub struct WebhookNotifier {
    url: String,
    headers: Vec<(String, String)>,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: &str, headers: Vec<(String, String)>) -> Self {
        Self {
            url: url.to_string(),
            headers,
            client: reqwest::Client::new(),
        }
    }

    /// The JSON body: destination identity, aggregate counts, and every
    /// failure record in source order, plus a pre-rendered text form.
    fn payload(destination_id: &str, report: &Report) -> serde_json::Value {
        serde_json::json!({
            "destination": destination_id,
            "generated_at": report.generated_at.map(|t| t.to_rfc3339()),
            "total": report.total,
            "success": report.success_count,
            "failure_count": report.failure_count(),
            "failures": report.failures,
            "text": render_body(report),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send(&self, destination_id: &str, report: &Report) -> Result<()> {
        let mut req = self
            .client
            .post(&self.url)
            .json(&Self::payload(destination_id, report))
            .timeout(std::time::Duration::from_secs(10));

        for (key, value) in &self.headers {
            req = req.header(key.as_str(), value.as_str());
        }

        let resp = req
            .send()
            .await
            .map_err(|e| VigilError::Dispatch(format!("Webhook send failed: {e}")))?;

        if resp.status().is_success() {
            info!("✅ Webhook notification sent to {}", self.url);
            Ok(())
        } else {
            Err(VigilError::Dispatch(format!(
                "Webhook error {}",
                resp.status()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_report::FailureRecord;

    #[test]
    fn test_payload_shape() {
        let report = Report {
            generated_at: None,
            total: 10,
            success_count: 8,
            failures: vec![
                FailureRecord {
                    subject_id: "S1".into(),
                    duration: "2s".into(),
                    detail: "timeout".into(),
                },
                FailureRecord {
                    subject_id: "S2".into(),
                    duration: "1s".into(),
                    detail: "auth error".into(),
                },
            ],
        };
        let p = WebhookNotifier::payload("grp1", &report);
        assert_eq!(p["destination"], "grp1");
        assert_eq!(p["total"], 10);
        assert_eq!(p["success"], 8);
        assert_eq!(p["failure_count"], 2);
        assert_eq!(p["failures"][0]["subject_id"], "S1");
        assert_eq!(p["failures"][1]["subject_id"], "S2");
        assert!(p["generated_at"].is_null());
    }
}
