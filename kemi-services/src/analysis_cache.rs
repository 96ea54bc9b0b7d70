//! In-memory TTL cache for analysis reports

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info};

struct CacheEntry<T> {
    data: T,
    inserted_at: Instant,
}

impl<T> CacheEntry<T> {
    fn new(data: T) -> Self {
        Self {
            data,
            inserted_at: Instant::now(),
        }
    }

    fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.inserted_at)
    }
}

/// Snapshot of cache occupancy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    pub cache_duration_minutes: u64,
}

/// Keyed cache whose entries stop being served once older than the TTL.
///
/// Expired entries are kept until overwritten or cleared so `stats` can
/// report them.
pub struct AnalysisCache<T> {
    entries: RwLock<HashMap<String, CacheEntry<T>>>,
    ttl: Duration,
}

impl<T: Clone> AnalysisCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh entry for `key`, with its age
    pub fn get(&self, key: &str) -> Option<(T, Duration)> {
        let entries = self.entries.read();
        let entry = entries.get(key)?;
        let age = entry.age();
        if age >= self.ttl {
            debug!("Cache entry {} expired ({:?} old)", key, age);
            return None;
        }
        Some((entry.data.clone(), age))
    }

    pub fn insert(&self, key: impl Into<String>, data: T) {
        self.entries.write().insert(key.into(), CacheEntry::new(data));
    }

    /// Drop every entry, returning how many there were
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.write();
        let count = entries.len();
        entries.clear();
        info!("Cleared {} cached analyses", count);
        count
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.read();
        let valid = entries.values().filter(|e| e.age() < self.ttl).count();
        CacheStats {
            total_entries: entries.len(),
            valid_entries: valid,
            expired_entries: entries.len() - valid,
            cache_duration_minutes: self.ttl.as_secs() / 60,
        }
    }
}
