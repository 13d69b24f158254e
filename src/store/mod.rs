//! Append-only security event storage over a pluggable keyed-list backend.
//!
//! Both backends expose the same contract: push-to-head with a key expiry
//! refresh, and a head-first read of the surviving entries. Windowed counting
//! happens at read time in [`EventStore`], so the two backends produce
//! identical counts for the same sequence of appends.

pub mod memory;
pub mod redis;

use crate::clock::SharedClock;
use crate::config::{DetectionConfig, RedisConfig};
use crate::types::event::{EventKey, SecurityEvent};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

pub use memory::MemoryStore;
pub use redis::RedisBackend;

/// Storage failure. Recovered locally by callers; never surfaced to the
/// original request.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// A keyed list store: values are inserted at the head of a per-key
/// sequence and the whole key expires `ttl` after the most recent push.
#[async_trait]
pub trait ListStore: Send + Sync {
    async fn push(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError>;

    /// All surviving entries for `key`, most recent first.
    async fn entries(&self, key: &str) -> Result<Vec<String>, StoreError>;
}

/// Which backend was selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Redis,
    Memory,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Redis => write!(f, "redis"),
            BackendKind::Memory => write!(f, "memory"),
        }
    }
}

/// Append-only, per-(subject, event kind) event log with sliding-window
/// counting.
pub struct EventStore {
    backend: Arc<dyn ListStore>,
    kind: BackendKind,
    prefix: String,
    event_ttl: Duration,
    clock: SharedClock,
}

impl EventStore {
    /// Select a backend once at startup: try the configured redis server
    /// and, if it is unreachable, fall back to the in-process store with a
    /// single warning. The fallback is a degraded mode: process-local,
    /// non-durable, single-instance only.
    pub async fn connect(
        redis: &RedisConfig,
        detection: &DetectionConfig,
        clock: SharedClock,
    ) -> Self {
        let event_ttl = Duration::from_secs(detection.event_ttl_secs);
        match RedisBackend::connect(redis).await {
            Ok(backend) => {
                info!(url = %redis.url, "event store connected to redis backend");
                Self::with_backend(
                    Arc::new(backend),
                    BackendKind::Redis,
                    &redis.key_prefix,
                    event_ttl,
                    clock,
                )
            }
            Err(err) => {
                warn!(
                    error = %err,
                    "redis not available, using in-process event store \
                     (non-durable, single instance only)"
                );
                Self::with_backend(
                    Arc::new(MemoryStore::new(clock.clone())),
                    BackendKind::Memory,
                    &redis.key_prefix,
                    event_ttl,
                    clock,
                )
            }
        }
    }

    /// Build an event store over an explicit backend.
    pub fn with_backend(
        backend: Arc<dyn ListStore>,
        kind: BackendKind,
        prefix: &str,
        event_ttl: Duration,
        clock: SharedClock,
    ) -> Self {
        Self {
            backend,
            kind,
            prefix: prefix.to_string(),
            event_ttl,
            clock,
        }
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.kind
    }

    /// Shared handle to the underlying list store, for collaborators that
    /// keep their own keys (the alert sink).
    pub fn list_store(&self) -> Arc<dyn ListStore> {
        self.backend.clone()
    }

    /// Append one event for `(subject, event_type)` at the head of its
    /// sequence and refresh the sequence expiry.
    pub async fn append(
        &self,
        subject: &str,
        event_type: &str,
        details: HashMap<String, Value>,
    ) -> Result<SecurityEvent, StoreError> {
        let event = SecurityEvent::new(self.clock.now(), event_type, subject, details);
        let key = EventKey::new(subject, event_type).storage_key(&self.prefix);
        let payload = serde_json::to_string(&event)
            .map_err(|err| StoreError::Unavailable(format!("event encode: {err}")))?;

        self.backend.push(&key, payload, self.event_ttl).await?;
        Ok(event)
    }

    /// Count events for `(subject, event_type)` whose timestamp falls
    /// within the trailing `window` ending now. Entries that fail to decode
    /// are skipped rather than failing the count.
    pub async fn count_since(
        &self,
        subject: &str,
        event_type: &str,
        window: Duration,
    ) -> Result<usize, StoreError> {
        let key = EventKey::new(subject, event_type).storage_key(&self.prefix);
        let entries = self.backend.entries(&key).await?;

        let cutoff = self.clock.now() - chrono::Duration::seconds(window.as_secs() as i64);
        let count = entries
            .iter()
            .filter_map(|raw| serde_json::from_str::<SecurityEvent>(raw).ok())
            .filter(|event| event.timestamp >= cutoff)
            .count();

        Ok(count)
    }
}
