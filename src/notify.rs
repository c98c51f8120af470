//! Outbound notifications for new lead intake.
//!
//! Delivery is fire-and-forget: the intake request never waits on, or
//! fails because of, the notification channel. Failures are logged
//! and dropped.

use crate::model::Lead;
use std::sync::Arc;
use tracing::{debug, warn};

/// Notification channel for newly captured leads.
pub trait Notifier: Send + Sync {
    /// Announce a new lead. Must not block the caller.
    fn lead_created(&self, lead: &Lead);
}

/// Shared notifier handle.
pub type SharedNotifier = Arc<dyn Notifier>;

/// Posts a JSON summary of the lead to a webhook URL.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    #[must_use]
    pub fn new(url: String) -> Self {
        Self { client: reqwest::Client::new(), url }
    }
}

impl Notifier for WebhookNotifier {
    fn lead_created(&self, lead: &Lead) {
        let body = serde_json::json!({
            "event": "lead.created",
            "leadId": lead.id,
            "name": lead.name,
            "email": lead.email,
            "company": lead.company,
            "source": lead.source,
            "message": lead.message,
        });
        let request = self.client.post(&self.url).json(&body);
        let lead_id = lead.id;

        // Outside a runtime (sync tests) there is nothing to spawn on;
        // skip delivery rather than panic.
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!(lead_id, "no async runtime, skipping lead notification");
            return;
        };
        handle.spawn(async move {
            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(lead_id, "lead notification delivered");
                }
                Ok(response) => {
                    warn!(lead_id, status = %response.status(), "lead notification rejected");
                }
                Err(err) => {
                    warn!(lead_id, error = %err, "lead notification failed");
                }
            }
        });
    }
}

/// Discards notifications. Used when no webhook is configured.
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn lead_created(&self, lead: &Lead) {
        debug!(lead_id = lead.id, "lead notification skipped (no channel configured)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LeadStage, Priority};

    fn sample_lead() -> Lead {
        Lead {
            id: 1,
            name: "Test".into(),
            email: "t@example.com".into(),
            phone: None,
            company: None,
            budget_range: None,
            project_type: None,
            message: "hello there".into(),
            source: "web".into(),
            stage: LeadStage::New,
            priority: Priority::Medium,
            assigned_to: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_noop_never_panics() {
        NoopNotifier.lead_created(&sample_lead());
    }

    #[test]
    fn test_webhook_outside_runtime_never_panics() {
        WebhookNotifier::new("http://localhost:1/hook".into()).lead_created(&sample_lead());
    }
}
