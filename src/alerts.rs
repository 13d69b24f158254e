//! Durable record of raised security alerts.

use crate::store::{ListStore, StoreError};
use crate::types::alert::SecurityAlert;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// List key holding recorded alerts, newest first.
pub const ALERTS_KEY: &str = "security_alerts";

/// Appends raised alerts to a retained list and emits a structured log line
/// for each. No read-back API; retrieval is an external concern.
pub struct AlertSink {
    store: Arc<dyn ListStore>,
    retention: Duration,
}

impl AlertSink {
    pub fn new(store: Arc<dyn ListStore>, retention: Duration) -> Self {
        Self { store, retention }
    }

    /// Record one alert. In production wiring the caller treats failures as
    /// log-and-drop; recording an alert must never fail the request that
    /// triggered it.
    pub async fn record(&self, alert: &SecurityAlert) -> Result<(), StoreError> {
        let payload = serde_json::to_string(alert)
            .map_err(|err| StoreError::Unavailable(format!("alert encode: {err}")))?;

        self.store
            .push(ALERTS_KEY, payload, self.retention)
            .await?;

        warn!(
            alert_id = %alert.alert_id,
            alert_type = %alert.alert_type,
            subject = %alert.subject,
            severity = ?alert.severity,
            "security alert raised"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::store::MemoryStore;
    use crate::types::alert::Severity;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_recorded_alert_round_trips() {
        let clock = ManualClock::starting_at(Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap());
        let store = Arc::new(MemoryStore::new(clock.clone()));
        let sink = AlertSink::new(store.clone(), Duration::from_secs(86400));

        let alert = SecurityAlert::new(
            clock.now(),
            "Multiple failed login attempts",
            "alice",
            HashMap::new(),
            Severity::High,
        );
        sink.record(&alert).await.unwrap();

        let entries = store.entries(ALERTS_KEY).await.unwrap();
        assert_eq!(entries.len(), 1);
        let stored: SecurityAlert = serde_json::from_str(&entries[0]).unwrap();
        assert_eq!(stored.alert_id, alert.alert_id);
        assert_eq!(stored.severity, Severity::High);
    }
}
