//! Short-lived conversation state keyed by user or session identifier.
//!
//! Slack flows span several interactions (a button, then a dialog, then a
//! confirmation). The cache keeps the partial answers in between. Entries expire after
//! a fixed TTL and the map holds at most `max_entries` keys; when full, expired
//! entries are purged first, then the entry closest to expiry is evicted.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::{Map, Value};

use crate::config::CacheConfig;

#[derive(Clone, Debug)]
struct CacheEntry {
    value: Map<String, Value>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// Cloneable handle; clones share the same underlying map.
#[derive(Clone, Debug)]
pub struct ConversationCache {
    entries: Arc<DashMap<String, CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
}

impl ConversationCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self { entries: Arc::new(DashMap::new()), ttl, max_entries: max_entries.max(1) }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(Duration::from_secs(config.ttl_secs), config.max_entries)
    }

    /// Merges `field = value` into the object stored under `key`, refreshing its expiry.
    pub fn save(&self, key: &str, field: &str, value: impl Into<Value>) -> bool {
        let now = Instant::now();
        let mut object = match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => entry.value.clone(),
            _ => Map::new(),
        };
        object.insert(field.to_string(), value.into());
        self.insert(key, object, now);
        true
    }

    /// Replaces the object under `key`. Non-object values are stored under `"value"`.
    pub fn save_object(&self, key: &str, value: Value) -> bool {
        let object = match value {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        self.insert(key, object, Instant::now());
        true
    }

    pub fn fetch(&self, key: &str) -> Option<Map<String, Value>> {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        }
        None
    }

    pub fn fetch_field(&self, key: &str, field: &str) -> Option<Value> {
        self.fetch(key).and_then(|mut object| object.remove(field))
    }

    pub fn delete(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn flush(&self) {
        self.entries.clear();
    }

    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&self, key: &str, value: Map<String, Value>, now: Instant) {
        if !self.entries.contains_key(key) && self.entries.len() >= self.max_entries {
            self.purge_expired();
            if self.entries.len() >= self.max_entries {
                self.evict_soonest_expiring();
            }
        }
        self.entries.insert(key.to_string(), CacheEntry { value, expires_at: now + self.ttl });
    }

    fn evict_soonest_expiring(&self) {
        let victim = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().expires_at)
            .map(|entry| entry.key().clone());
        if let Some(key) = victim {
            self.entries.remove(&key);
        }
    }
}

/// Key under which a user's Slack profile is cached.
pub fn slack_user_key(slack_id: &str) -> String {
    format!("USER_SLACK_INFO_{slack_id}")
}

/// Key under which an in-progress trip booking is cached.
pub fn trip_booking_key(slack_id: &str) -> String {
    format!("TRIP_REQUEST_{slack_id}")
}
