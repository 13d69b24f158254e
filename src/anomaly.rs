//! Sliding-window anomaly detection.
//!
//! After every appended event the engine looks up the rule for that event
//! kind, counts the subject's recent events, and raises a HIGH-severity
//! alert when the count reaches the rule's threshold. Counting is
//! best-effort and eventually consistent: under a concurrent burst the
//! count read here may trail appends from other writers, so duplicate or
//! missed crossings at the boundary are accepted. Every triggering event at
//! or above the threshold re-raises an alert; suppression is left to
//! consumers.

use crate::alerts::AlertSink;
use crate::clock::SharedClock;
use crate::store::EventStore;
use crate::types::alert::{AlertRule, SecurityAlert, Severity};
use crate::types::event::{details_from, kinds};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// The fixed rule table evaluated by the engine.
///
/// A continuous "suspicious pattern score" threshold also exists in the
/// configuration but has no producer and therefore no rule here.
pub fn default_rules() -> Vec<AlertRule> {
    vec![
        AlertRule {
            event_type: kinds::FAILED_LOGIN,
            title: "Multiple failed login attempts",
            window: Duration::from_secs(300),
            threshold: 5,
            severity: Severity::High,
        },
        AlertRule {
            event_type: kinds::API_REQUEST,
            title: "Rapid API requests detected",
            window: Duration::from_secs(60),
            threshold: 100,
            severity: Severity::High,
        },
        AlertRule {
            event_type: kinds::LARGE_TRANSACTION_COUNT,
            title: "Excessive large transactions",
            window: Duration::from_secs(3600),
            threshold: 50,
            severity: Severity::High,
        },
    ]
}

/// Evaluates the rule table against windowed event counts and forwards
/// triggered alerts to the sink.
pub struct AnomalyEngine {
    rules: HashMap<&'static str, AlertRule>,
    store: Arc<EventStore>,
    sink: Arc<AlertSink>,
    clock: SharedClock,
}

impl AnomalyEngine {
    pub fn new(
        rules: Vec<AlertRule>,
        store: Arc<EventStore>,
        sink: Arc<AlertSink>,
        clock: SharedClock,
    ) -> Self {
        Self {
            rules: rules.into_iter().map(|r| (r.event_type, r)).collect(),
            store,
            sink,
            clock,
        }
    }

    /// Evaluate the rule (if any) for an event that was just appended.
    /// Returns whether an alert was raised. Never fails the surrounding
    /// request: count and sink errors are logged and dropped.
    pub async fn on_event(&self, event_type: &str, subject: &str) -> bool {
        let Some(rule) = self.rules.get(event_type) else {
            return false;
        };

        let count = match self
            .store
            .count_since(subject, event_type, rule.window)
            .await
        {
            Ok(count) => count,
            Err(err) => {
                warn!(
                    subject = %subject,
                    event_type = %event_type,
                    error = %err,
                    "anomaly count unavailable, skipping evaluation"
                );
                return false;
            }
        };

        if count < rule.threshold {
            return false;
        }

        let alert = SecurityAlert::new(
            self.clock.now(),
            rule.title,
            subject,
            details_from([
                ("count", json!(count)),
                ("threshold", json!(rule.threshold)),
            ]),
            rule.severity,
        );

        if let Err(err) = self.sink.record(&alert).await {
            warn!(
                alert_id = %alert.alert_id,
                error = %err,
                "failed to record alert, dropping"
            );
        }

        true
    }
}
