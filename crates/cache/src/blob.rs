//! Byte-budgeted blob cache with strict FIFO eviction.
//!
//! Eviction order is insertion order; reads do not refresh an entry.
//! Replacing a key counts as a new insertion.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use tracing::debug;

struct BlobEntry {
    data: Bytes,
    inserted_at: DateTime<Utc>,
}

/// Blob cache counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BlobCacheStats {
    pub entries: usize,
    pub bytes_used: usize,
    pub budget_bytes: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Puts refused because the payload alone exceeds the budget
    pub rejected: u64,
}

/// FIFO blob cache
pub struct BlobCache {
    budget: usize,
    entries: HashMap<String, BlobEntry>,
    /// Keys, oldest first
    order: VecDeque<String>,
    used: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
    rejected: u64,
}

impl fmt::Debug for BlobCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobCache")
            .field("len", &self.entries.len())
            .field("used", &self.used)
            .field("budget", &self.budget)
            .finish()
    }
}

impl BlobCache {
    pub fn new(budget_bytes: usize) -> Self {
        Self {
            budget: budget_bytes,
            entries: HashMap::new(),
            order: VecDeque::new(),
            used: 0,
            hits: 0,
            misses: 0,
            evictions: 0,
            rejected: 0,
        }
    }

    /// Insert a blob, evicting the oldest entries until it fits
    ///
    /// Returns `false` without touching the cache if `data` is larger than
    /// the whole budget.
    pub fn put(&mut self, key: impl Into<String>, data: Bytes) -> bool {
        let key = key.into();
        let size = data.len();
        if size > self.budget {
            self.rejected += 1;
            debug!(key = %key, size, budget = self.budget, "blob exceeds cache budget");
            return false;
        }

        if let Some(old) = self.entries.remove(&key) {
            self.used -= old.data.len();
            self.order.retain(|k| k != &key);
        }

        while self.used + size > self.budget {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if let Some(evicted) = self.entries.remove(&oldest) {
                self.used -= evicted.data.len();
                self.evictions += 1;
                debug!(key = %oldest, size = evicted.data.len(), "evicted blob");
            }
        }

        self.used += size;
        self.order.push_back(key.clone());
        self.entries.insert(
            key,
            BlobEntry {
                data,
                inserted_at: Utc::now(),
            },
        );
        true
    }

    /// Look up a blob, counting the hit or miss
    pub fn get(&mut self, key: &str) -> Option<Bytes> {
        match self.entries.get(key) {
            Some(entry) => {
                self.hits += 1;
                Some(entry.data.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// When `key` was stored, without counting a hit
    pub fn inserted_at(&self, key: &str) -> Option<DateTime<Utc>> {
        self.entries.get(key).map(|e| e.inserted_at)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn bytes_used(&self) -> usize {
        self.used
    }

    pub fn stats(&self) -> BlobCacheStats {
        BlobCacheStats {
            entries: self.entries.len(),
            bytes_used: self.used,
            budget_bytes: self.budget,
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            rejected: self.rejected,
        }
    }
}
