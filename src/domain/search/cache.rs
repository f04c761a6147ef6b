//! Fingerprint-keyed result cache with a bounded time to live.
//!
//! Entries are immutable once written, so concurrent access only races on
//! insert-if-absent, which is resolved by keeping whichever writer landed
//! first. A stale entry is replaced on the next insert and never returned
//! from a read.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use super::offer::Offer;

#[derive(Debug, Clone)]
struct CacheEntry {
    offers: Vec<Offer>,
    inserted_at: Instant,
}

/// Shared cache of processed search results, keyed by the deterministic
/// fingerprint of (query parameters, continuation token).
#[derive(Debug, Clone)]
pub struct SearchCache {
    ttl: Duration,
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl SearchCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Returns the cached offers for a key, unless absent or expired.
    pub async fn get(&self, key: &str) -> Option<Vec<Offer>> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if entry.inserted_at.elapsed() >= self.ttl {
            return None;
        }
        Some(entry.offers.clone())
    }

    /// Stores offers for a key.
    ///
    /// A live entry already present wins the race; an expired one is
    /// replaced.
    pub async fn insert(&self, key: String, offers: Vec<Offer>) {
        let mut entries = self.entries.write().await;
        match entries.get(&key) {
            Some(existing) if existing.inserted_at.elapsed() < self.ttl => {}
            _ => {
                entries.insert(
                    key,
                    CacheEntry {
                        offers,
                        inserted_at: Instant::now(),
                    },
                );
            }
        }
    }

    /// Number of stored entries, live or stale.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Drops every entry.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}
