//! In-process cache store.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::Instant;
use warden_core::cache::CacheStore;
use warden_core::error::{WardenError, WardenResult};

#[derive(Debug, Clone)]
enum Value {
    Text(String),
    Set(BTreeSet<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Cache store held in process memory, with Redis-like semantics.
///
/// Clones share the same keyspace. Time follows `tokio::time`, so tests
/// running with a paused clock can advance past TTLs.
#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn live(&self, key: &str) -> Option<Entry> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if !entry.is_expired(now) => return Some(entry.clone()),
                None => return None,
                Some(_) => {}
            }
        }
        // Re-check under the write lock: the key may have been re-set.
        let mut entries = self.entries.write();
        if entries
            .get(key)
            .is_some_and(|entry| entry.is_expired(Instant::now()))
        {
            entries.remove(key);
            return None;
        }
        entries.get(key).cloned()
    }
}

fn wrong_type(key: &str) -> WardenError {
    WardenError::Internal(format!("cache key {key} holds the wrong kind of value"))
}

impl CacheStore for MemoryCache {
    async fn set_members(&self, key: &str) -> WardenResult<Vec<String>> {
        match self.live(key) {
            None => Ok(Vec::new()),
            Some(Entry {
                value: Value::Set(members),
                ..
            }) => Ok(members.into_iter().collect()),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn set_add(&self, key: &str, members: &[String], ttl: Duration) -> WardenResult<()> {
        if members.is_empty() {
            return Ok(());
        }
        let now = Instant::now();
        let mut entries = self.entries.write();
        let entry = entries
            .entry(key.to_string())
            .and_modify(|entry| {
                if entry.is_expired(now) {
                    entry.value = Value::Set(BTreeSet::new());
                }
            })
            .or_insert_with(|| Entry {
                value: Value::Set(BTreeSet::new()),
                expires_at: None,
            });
        let Value::Set(set) = &mut entry.value else {
            return Err(wrong_type(key));
        };
        set.extend(members.iter().cloned());
        entry.expires_at = Some(now + ttl);
        Ok(())
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> WardenResult<()> {
        let entry = Entry {
            value: Value::Text(value.to_string()),
            expires_at: Some(Instant::now() + ttl),
        };
        self.entries.write().insert(key.to_string(), entry);
        Ok(())
    }

    async fn get(&self, key: &str) -> WardenResult<Option<String>> {
        match self.live(key) {
            None => Ok(None),
            Some(Entry {
                value: Value::Text(text),
                ..
            }) => Ok(Some(text)),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn take(&self, key: &str) -> WardenResult<Option<String>> {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let Some(entry) = entries.remove(key) else {
            return Ok(None);
        };
        if entry.is_expired(now) {
            return Ok(None);
        }
        match entry.value {
            Value::Text(text) => Ok(Some(text)),
            set @ Value::Set(_) => {
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: set,
                        expires_at: entry.expires_at,
                    },
                );
                Err(wrong_type(key))
            }
        }
    }

    async fn exists(&self, key: &str) -> WardenResult<bool> {
        Ok(self.live(key).is_some())
    }

    async fn ttl(&self, key: &str) -> WardenResult<Option<Duration>> {
        let now = Instant::now();
        Ok(self
            .live(key)
            .and_then(|entry| entry.expires_at)
            .map(|at| at.saturating_duration_since(now)))
    }

    async fn delete(&self, key: &str) -> WardenResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}
