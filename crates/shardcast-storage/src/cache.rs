// Shardcast - Peer-to-Peer File Distribution
// Copyright (C) 2025 Shardcast Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.

//! Priority-based in-memory cache of decoded chunk bodies
//!
//! Thread-safe, async-compatible cache with:
//! - Size-based eviction (configurable max bytes)
//! - Pluggable eviction policies (LRU / LFU / FIFO / hybrid)
//! - Oversize rejection: entries above a tenth of the cache never enter
//! - Concurrent access via tokio RwLock
//!
//! Lower priority evicts first; ties break on lexicographic hash order.
//!
//! # Examples
//!
//! ```
//! use shardcast_storage::cache::{ChunkCache, EvictionPolicy};
//!
//! #[tokio::main]
//! async fn main() {
//!     let cache = ChunkCache::new(1024 * 1024, EvictionPolicy::Lru);
//!
//!     cache.put("abc123", vec![1, 2, 3]).await;
//!     assert_eq!(cache.get("abc123").await, Some(vec![1, 2, 3]));
//! }
//! ```

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Eviction policy selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Evict by last-access timestamp (oldest first)
    Lru,
    /// Evict by access count (fewest first)
    Lfu,
    /// Evict by creation timestamp (oldest first)
    Fifo,
    /// Default: blend of recency and frequency
    #[default]
    Hybrid,
}

impl FromStr for EvictionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lru" => Ok(EvictionPolicy::Lru),
            "lfu" => Ok(EvictionPolicy::Lfu),
            "fifo" => Ok(EvictionPolicy::Fifo),
            "hybrid" => Ok(EvictionPolicy::Hybrid),
            other => Err(format!("unknown eviction policy: {}", other)),
        }
    }
}

/// Entry in the chunk cache with access metadata
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Decoded chunk bytes
    data: Vec<u8>,
    /// Size in bytes
    size: u64,
    /// Creation timestamp
    created_at: DateTime<Utc>,
    /// Last access timestamp
    last_accessed_at: DateTime<Utc>,
    /// Access counter
    access_count: u64,
}

impl CacheEntry {
    /// Eviction score under the given policy; lower evicts first
    fn priority(&self, policy: EvictionPolicy) -> f64 {
        match policy {
            EvictionPolicy::Lru => self.last_accessed_at.timestamp() as f64,
            EvictionPolicy::Lfu => self.access_count as f64,
            EvictionPolicy::Fifo => self.created_at.timestamp() as f64,
            EvictionPolicy::Hybrid => {
                self.last_accessed_at.timestamp() as f64 / 100_000.0 + self.access_count as f64
            }
        }
    }
}

/// Bounded cache of decoded chunk bodies with pluggable eviction
#[derive(Debug, Clone)]
pub struct ChunkCache {
    inner: Arc<RwLock<CacheInner>>,
}

#[derive(Debug)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    current_size: u64,
    max_size: u64,
    policy: EvictionPolicy,
}

impl ChunkCache {
    /// Create a new cache bounded at `max_size` bytes
    pub fn new(max_size: u64, policy: EvictionPolicy) -> Self {
        Self {
            inner: Arc::new(RwLock::new(CacheInner {
                entries: HashMap::new(),
                current_size: 0,
                max_size,
                policy,
            })),
        }
    }

    /// Get a cached chunk body, updating access stats on hit
    pub async fn get(&self, hash: &str) -> Option<Vec<u8>> {
        let mut inner = self.inner.write().await;
        let entry = inner.entries.get_mut(hash)?;
        entry.access_count += 1;
        entry.last_accessed_at = Utc::now();
        Some(entry.data.clone())
    }

    /// Admit a chunk body, evicting lower-priority entries to make room
    ///
    /// Entries larger than a tenth of the cache are rejected outright.
    /// Returns whether the entry was admitted.
    pub async fn put(&self, hash: impl Into<String>, data: Vec<u8>) -> bool {
        let hash = hash.into();
        let size = data.len() as u64;

        let mut inner = self.inner.write().await;

        if inner.max_size == 0 || size > inner.max_size / 10 {
            debug!(hash = %hash, size, "entry too large for cache, skipping");
            return false;
        }

        // Replace any previous entry for this hash
        if let Some(old) = inner.entries.remove(&hash) {
            inner.current_size -= old.size;
        }

        while inner.current_size + size > inner.max_size {
            let Some(victim) = inner.lowest_priority_key() else {
                break;
            };
            if let Some(evicted) = inner.entries.remove(&victim) {
                inner.current_size -= evicted.size;
                debug!(hash = %victim, size = evicted.size, "evicted cache entry");
            }
        }

        let now = Utc::now();
        inner.entries.insert(
            hash,
            CacheEntry {
                data,
                size,
                created_at: now,
                last_accessed_at: now,
                access_count: 0,
            },
        );
        inner.current_size += size;
        true
    }

    /// Remove one entry
    pub async fn remove(&self, hash: &str) -> Option<Vec<u8>> {
        let mut inner = self.inner.write().await;
        let entry = inner.entries.remove(hash)?;
        inner.current_size -= entry.size;
        Some(entry.data)
    }

    /// Drop entries last accessed before `cutoff` with fewer than
    /// `min_access` accesses; returns the number dropped
    pub async fn sweep_stale(&self, cutoff: DateTime<Utc>, min_access: u64) -> usize {
        let mut inner = self.inner.write().await;
        let stale: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, e)| e.last_accessed_at < cutoff && e.access_count < min_access)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &stale {
            if let Some(entry) = inner.entries.remove(key) {
                inner.current_size -= entry.size;
            }
        }
        stale.len()
    }

    /// Clear all entries
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.entries.clear();
        inner.current_size = 0;
    }

    /// Current cache statistics
    pub async fn stats(&self) -> CacheStats {
        let inner = self.inner.read().await;
        CacheStats {
            entry_count: inner.entries.len(),
            total_size: inner.current_size,
            max_size: inner.max_size,
        }
    }
}

impl CacheInner {
    /// Key of the lowest-priority entry, ties broken by hash order
    fn lowest_priority_key(&self) -> Option<String> {
        self.entries
            .iter()
            .min_by(|(ka, ea), (kb, eb)| {
                let pa = ea.priority(self.policy);
                let pb = eb.priority(self.policy);
                pa.partial_cmp(&pb)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| ka.cmp(kb))
            })
            .map(|(k, _)| k.clone())
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy)]
pub struct CacheStats {
    /// Current number of entries
    pub entry_count: usize,
    /// Current total size in bytes
    pub total_size: u64,
    /// Maximum size in bytes
    pub max_size: u64,
}
