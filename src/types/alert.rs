//! Security alert data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// Alert severity classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// A rule the anomaly engine evaluates after each appended event.
///
/// A rule fires when the count of `event_type` events for one subject within
/// the sliding `window` reaches `threshold`.
#[derive(Debug, Clone)]
pub struct AlertRule {
    /// Event kind this rule watches
    pub event_type: &'static str,
    /// Human-readable alert title raised on a crossing
    pub title: &'static str,
    /// Sliding window length
    pub window: Duration,
    /// Count at which the rule fires
    pub threshold: usize,
    /// Severity attached to raised alerts
    pub severity: Severity,
}

/// Alert raised when a rule's threshold is crossed. Immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityAlert {
    /// Unique alert identifier
    pub alert_id: String,

    /// Alert generation timestamp
    pub timestamp: DateTime<Utc>,

    /// Human-readable alert type
    pub alert_type: String,

    /// Identity the alert is attributed to
    pub subject: String,

    /// Context mapping (observed count, threshold, ...)
    pub details: HashMap<String, Value>,

    /// Severity classification
    pub severity: Severity,
}

impl SecurityAlert {
    /// Create a new alert with a fresh identifier
    pub fn new(
        timestamp: DateTime<Utc>,
        alert_type: &str,
        subject: &str,
        details: HashMap<String, Value>,
        severity: Severity,
    ) -> Self {
        Self {
            alert_id: uuid::Uuid::new_v4().to_string(),
            timestamp,
            alert_type: alert_type.to_string(),
            subject: subject.to_string(),
            details,
            severity,
        }
    }
}
