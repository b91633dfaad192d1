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

//! Store-internal records: per-blob bookkeeping, the deduplication index
//! and the running analytics snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Bookkeeping for one unique stored blob
///
/// Created on first successful `put`, mutated by subsequent puts of equal
/// content (refcount) and by reads (access stats), destroyed by the GC sweep
/// when the refcount has fallen to zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkInfo {
    /// Content address of the stored blob (hex SHA-256 of the input bytes)
    pub hash: String,

    /// Logical size: length of the bytes handed to `put`
    pub size: u64,

    /// Stored size on disk (equals `size` when stored raw)
    pub compressed_size: u64,

    /// Whether the on-disk representation is LZ4-framed
    pub is_compressed: bool,

    /// `size / compressed_size` (1.0 when stored raw)
    pub compression_ratio: f64,

    /// Number of logical chunks pointing at this blob
    pub reference_count: u64,

    /// Creation time of the blob
    pub created_at: DateTime<Utc>,

    /// Last read or dedup-hit time
    pub last_accessed_at: DateTime<Utc>,

    /// Number of reads and dedup hits
    pub access_count: u64,

    /// Filesystem path of the blob
    pub storage_path: String,

    /// Rolling content hash used by the dedup index
    pub deduplication_key: String,
}

impl ChunkInfo {
    /// Record an access: bumps the counter and the last-access timestamp
    pub fn touch(&mut self) {
        self.access_count += 1;
        self.last_accessed_at = Utc::now();
    }
}

/// One deduplication index entry, keyed by rolling content hash
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupEntry {
    /// Logical size of the deduplicated content
    pub size: u64,

    /// How many puts have matched this entry
    pub count: u64,

    /// First time this content was seen
    pub first_seen: DateTime<Utc>,

    /// Most recent time this content was seen
    pub last_seen: DateTime<Utc>,

    /// Content addresses sharing this rolling hash
    pub chunk_hashes: Vec<String>,
}

/// One hour of put/get activity, keyed by unix-hour in [`StorageAnalytics`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HourlyBucket {
    /// Puts observed during this hour
    pub puts: u64,
    /// Gets observed during this hour
    pub gets: u64,
    /// Logical bytes written during this hour
    pub bytes_in: u64,
    /// Logical bytes read during this hour
    pub bytes_out: u64,
}

/// Running analytics for the chunk store
///
/// Counters are updated inline on every put/get; the aggregate fields
/// (averages, totals recomputed from the index) are refreshed by the
/// optimization engine's rollup pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageAnalytics {
    /// Total put operations
    pub total_puts: u64,
    /// Total get operations
    pub total_gets: u64,
    /// Unique blobs currently indexed
    pub unique_chunks: u64,
    /// Puts that were satisfied by an existing blob
    pub duplicate_chunks: u64,
    /// Sum of logical sizes over unique blobs
    pub bytes_stored: u64,
    /// Sum of on-disk sizes over unique blobs
    pub bytes_on_disk: u64,
    /// Bytes saved by compression (logical − on-disk)
    pub compression_saved_bytes: u64,
    /// Bytes saved by deduplication (logical size of every duplicate put)
    pub dedup_saved_bytes: u64,
    /// Cache hits
    pub cache_hits: u64,
    /// Cache misses
    pub cache_misses: u64,
    /// Mean logical chunk size over unique blobs
    pub avg_chunk_size: f64,
    /// Mean compression ratio over unique blobs
    pub avg_compression_ratio: f64,
    /// Activity buckets keyed by unix-hour, pruned by retention
    #[serde(default)]
    pub hourly: HashMap<i64, HourlyBucket>,
}

impl StorageAnalytics {
    /// Record a put of `size` logical bytes; `duplicate` marks a dedup hit
    pub fn record_put(&mut self, size: u64, duplicate: bool) {
        self.total_puts += 1;
        if duplicate {
            self.duplicate_chunks += 1;
            self.dedup_saved_bytes += size;
        }
        let bucket = self.hourly.entry(current_hour()).or_default();
        bucket.puts += 1;
        bucket.bytes_in += size;
    }

    /// Record a get of `size` logical bytes
    pub fn record_get(&mut self, size: u64, cache_hit: bool) {
        self.total_gets += 1;
        if cache_hit {
            self.cache_hits += 1;
        } else {
            self.cache_misses += 1;
        }
        let bucket = self.hourly.entry(current_hour()).or_default();
        bucket.gets += 1;
        bucket.bytes_out += size;
    }

    /// Fraction of gets satisfied from cache, 0.0 when no gets yet
    pub fn cache_hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }

    /// Drop hourly buckets older than `retention_secs`
    pub fn prune_hourly(&mut self, retention_secs: i64) {
        let cutoff = current_hour() - retention_secs / 3600;
        self.hourly.retain(|hour, _| *hour >= cutoff);
    }
}

fn current_hour() -> i64 {
    Utc::now().timestamp() / 3600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touch_updates_access_stats() {
        let mut info = ChunkInfo {
            hash: "ab".into(),
            size: 10,
            compressed_size: 10,
            is_compressed: false,
            compression_ratio: 1.0,
            reference_count: 1,
            created_at: Utc::now(),
            last_accessed_at: Utc::now(),
            access_count: 0,
            storage_path: "/tmp/ab".into(),
            deduplication_key: "ab".into(),
        };
        info.touch();
        info.touch();
        assert_eq!(info.access_count, 2);
    }

    #[test]
    fn test_hit_rate() {
        let mut a = StorageAnalytics::default();
        assert_eq!(a.cache_hit_rate(), 0.0);
        a.record_get(10, true);
        a.record_get(10, true);
        a.record_get(10, false);
        assert!((a.cache_hit_rate() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_dedup_accounting() {
        let mut a = StorageAnalytics::default();
        a.record_put(100, false);
        a.record_put(100, true);
        assert_eq!(a.total_puts, 2);
        assert_eq!(a.duplicate_chunks, 1);
        assert_eq!(a.dedup_saved_bytes, 100);
    }

    #[test]
    fn test_prune_hourly_keeps_recent() {
        let mut a = StorageAnalytics::default();
        a.record_put(1, false);
        let old_hour = current_hour() - 24 * 8;
        a.hourly.insert(old_hour, HourlyBucket::default());
        a.prune_hourly(7 * 24 * 3600);
        assert!(!a.hourly.contains_key(&old_hour));
        assert_eq!(a.hourly.len(), 1);
    }
}
