//! Tagged Cache
//!
//! In-memory cache with tag-based invalidation. The GUI caches expensive
//! catalog lookups (user lists, role trees) and the deletion engine
//! invalidates the `users` and `roles` tags after each committed deletion
//! so stale entries never survive a drop.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct CacheEntry {
    value: serde_json::Value,
    expires_at: Option<Instant>,
    tags: Vec<String>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    // tag -> keys carrying it
    tag_index: HashMap<String, HashSet<String>>,
}

/// Cache with per-entry TTL and tag-based invalidation
#[derive(Default)]
pub struct TagCache {
    state: Mutex<CacheState>,
}

impl TagCache {
    /// Empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, tagged and optionally expiring
    pub fn put(
        &self,
        key: impl Into<String>,
        value: serde_json::Value,
        ttl: Option<Duration>,
        tags: &[&str],
    ) {
        let key = key.into();
        let mut state = self.lock();

        for tag in tags {
            state.tag_index.entry((*tag).to_string()).or_default().insert(key.clone());
        }

        state.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
                tags: tags.iter().map(|t| (*t).to_string()).collect(),
            },
        );
    }

    /// Fetch `key`, treating expired entries as absent
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        let mut state = self.lock();

        let expired = match state.entries.get(key) {
            Some(entry) if entry.is_expired(Instant::now()) => true,
            Some(entry) => return Some(entry.value.clone()),
            None => return None,
        };

        if expired {
            Self::remove_key(&mut state, key);
        }
        None
    }

    /// Drop every entry carrying `tag`, returning how many were removed
    pub fn invalidate_tag(&self, tag: &str) -> usize {
        let mut state = self.lock();

        let Some(keys) = state.tag_index.remove(tag) else {
            return 0;
        };

        let mut removed = 0;
        for key in keys {
            if state.entries.remove(&key).is_some() {
                removed += 1;
            }
            // Drop the key from the other tags it carried
            for index in state.tag_index.values_mut() {
                index.remove(&key);
            }
        }

        tracing::debug!(tag, removed, "cache tag invalidated");
        removed
    }

    /// Drop one entry by key
    pub fn invalidate_key(&self, key: &str) -> bool {
        let mut state = self.lock();
        Self::remove_key(&mut state, key)
    }

    /// Drop everything
    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.tag_index.clear();
    }

    /// Live entry count (expired entries still pending eviction included)
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove_key(state: &mut CacheState, key: &str) -> bool {
        let Some(entry) = state.entries.remove(key) else {
            return false;
        };
        for tag in &entry.tags {
            if let Some(index) = state.tag_index.get_mut(tag) {
                index.remove(key);
            }
        }
        true
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
