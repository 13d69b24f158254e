//! Security event data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Well-known event kind tags.
///
/// The anomaly rule table keys on these strings; kinds without a rule are
/// recorded but never evaluated.
pub mod kinds {
    pub const FAILED_LOGIN: &str = "failed_login";
    pub const SUCCESSFUL_LOGIN: &str = "successful_login";
    pub const API_REQUEST: &str = "api_request";
    pub const FILE_UPLOAD: &str = "file_upload";
    pub const FRAUD_DETECTION: &str = "fraud_detection";
    pub const LARGE_TRANSACTION_COUNT: &str = "large_transaction_count";
    pub const TRANSACTION_ACTION: &str = "transaction_action";
    pub const REPORT_GENERATED: &str = "report_generated";
    pub const ERROR: &str = "error";
}

/// A single security event, immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityEvent {
    /// Time the event was appended
    pub timestamp: DateTime<Utc>,

    /// Event kind tag (see [`kinds`])
    pub event_type: String,

    /// Identity the event is attributed to
    pub subject: String,

    /// Free-form detail mapping
    pub details: HashMap<String, Value>,
}

impl SecurityEvent {
    pub fn new(
        timestamp: DateTime<Utc>,
        event_type: &str,
        subject: &str,
        details: HashMap<String, Value>,
    ) -> Self {
        Self {
            timestamp,
            event_type: event_type.to_string(),
            subject: subject.to_string(),
            details,
        }
    }
}

/// Composite key addressing the append-ordered sequence of events for one
/// (subject, event kind) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventKey {
    pub subject: String,
    pub event_type: String,
}

impl EventKey {
    pub fn new(subject: &str, event_type: &str) -> Self {
        Self {
            subject: subject.to_string(),
            event_type: event_type.to_string(),
        }
    }

    /// Backend storage key under the configured namespace prefix,
    /// e.g. `security_events:alice:failed_login`.
    pub fn storage_key(&self, prefix: &str) -> String {
        format!("{}:{}:{}", prefix, self.subject, self.event_type)
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.subject, self.event_type)
    }
}

/// Convenience for building detail mappings from string pairs.
pub fn details_from<const N: usize>(pairs: [(&str, Value); N]) -> HashMap<String, Value> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_serialization() {
        let event = SecurityEvent::new(
            Utc::now(),
            kinds::FAILED_LOGIN,
            "alice",
            details_from([("ip", json!("10.0.0.1"))]),
        );

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: SecurityEvent = serde_json::from_str(&json).unwrap();

        assert_eq!(event.event_type, deserialized.event_type);
        assert_eq!(event.subject, deserialized.subject);
        assert_eq!(deserialized.details["ip"], json!("10.0.0.1"));
    }

    #[test]
    fn test_storage_key_namespace() {
        let key = EventKey::new("alice", kinds::API_REQUEST);
        assert_eq!(
            key.storage_key("security_events"),
            "security_events:alice:api_request"
        );
    }
}
