//! In-process fallback list store.
//!
//! Used when redis is unreachable at startup. One coarse lock guards every
//! read-modify-append sequence; that lock is the correctness boundary for
//! the whole fallback path. State is process-local: it does not survive a
//! restart and is not shared across instances.

use super::{ListStore, StoreError};
use crate::clock::SharedClock;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

struct ExpiringList {
    expires_at: DateTime<Utc>,
    values: Vec<String>,
}

/// Process-local keyed-list store with the same expiry semantics as the
/// redis backend: pushing refreshes the whole key's TTL, expired keys read
/// as empty. Physical removal is lazy.
pub struct MemoryStore {
    clock: SharedClock,
    lists: Mutex<HashMap<String, ExpiringList>>,
}

impl MemoryStore {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            lists: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl ListStore for MemoryStore {
    async fn push(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError> {
        let now = self.clock.now();
        let mut lists = self.lists.lock().unwrap_or_else(|e| e.into_inner());

        let list = lists.entry(key.to_string()).or_insert(ExpiringList {
            expires_at: now,
            values: Vec::new(),
        });
        if now >= list.expires_at {
            list.values.clear();
        }

        list.values.insert(0, value);
        list.expires_at = now + chrono::Duration::seconds(ttl.as_secs() as i64);
        Ok(())
    }

    async fn entries(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let now = self.clock.now();
        let lists = self.lists.lock().unwrap_or_else(|e| e.into_inner());

        Ok(match lists.get(key) {
            Some(list) if now < list.expires_at => list.values.clone(),
            _ => Vec::new(),
        })
    }
}
