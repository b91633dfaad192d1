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

//! Content-addressed chunk repository on the local filesystem
//!
//! Every unique blob lives at `base_path/<hex-sha256>`, written once via a
//! temp file and atomic rename. Two lock-protected indices sit on top:
//!
//! - the **chunk index** maps content address → [`ChunkInfo`] (refcount,
//!   sizes, access stats),
//! - the **dedup index** maps rolling content hash → [`DedupEntry`].
//!
//! Blobs are opportunistically LZ4-compressed when they reach the configured
//! threshold and beat the minimum ratio. Decoded bodies are admitted to the
//! priority cache on both writes and reads. Both indices persist as JSON
//! (`chunk_index.json`, `dedup_index.json`) in `base_path`; absent files are
//! treated as empty on startup.

use crate::cache::{ChunkCache, EvictionPolicy};
use crate::chunk_info::{ChunkInfo, DedupEntry, StorageAnalytics};
use crate::error::{StorageError, StorageResult};
use chrono::Utc;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

const CHUNK_INDEX_FILE: &str = "chunk_index.json";
const DEDUP_INDEX_FILE: &str = "dedup_index.json";

/// Window size for the rolling content hash
const ROLLING_WINDOW: usize = 1024;

/// Chunk store configuration
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Directory holding blobs and index files
    pub base_path: PathBuf,
    /// Probe the dedup index on put
    pub enable_deduplication: bool,
    /// Try LZ4 compression on put
    pub enable_compression: bool,
    /// Admit decoded bodies to the in-memory cache
    pub enable_cache: bool,
    /// Cache bound in bytes
    pub max_cache_size: u64,
    /// Cache eviction policy
    pub eviction_policy: EvictionPolicy,
    /// Minimum blob size for the compression attempt
    pub compression_threshold: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from(".shardcast/chunks"),
            enable_deduplication: true,
            enable_compression: true,
            enable_cache: true,
            max_cache_size: 1024 * 1024 * 1024,
            eviction_policy: EvictionPolicy::Hybrid,
            compression_threshold: 1024,
        }
    }
}

/// Content-addressed chunk store
///
/// Concurrent puts of identical content converge on one on-disk object whose
/// `reference_count` equals the number of calls. All shared state lives
/// behind its own `RwLock`; writer locks are held only around mutation.
#[derive(Debug)]
pub struct ChunkStore {
    options: StoreOptions,
    chunk_index: RwLock<HashMap<String, ChunkInfo>>,
    dedup_index: RwLock<HashMap<String, DedupEntry>>,
    cache: ChunkCache,
    analytics: RwLock<StorageAnalytics>,
}

/// Hex SHA-256 of a byte slice: the content address
pub fn content_address(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Rolling content hash: SHA-256 over fixed 1 KiB windows
///
/// Value-identical to the whole-buffer hash today; the windowed construction
/// is the seam where a similarity hash can replace it without touching
/// callers. `put` and the dedup probe must keep using the same function.
pub fn rolling_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    for window in data.chunks(ROLLING_WINDOW) {
        hasher.update(window);
    }
    hex::encode(hasher.finalize())
}

impl ChunkStore {
    /// Open (or create) a chunk store at `options.base_path`
    ///
    /// Loads both persisted indices; absent index files mean an empty store.
    pub async fn open(options: StoreOptions) -> StorageResult<Self> {
        tokio::fs::create_dir_all(&options.base_path).await?;

        let chunk_index = load_index::<ChunkInfo>(&options.base_path.join(CHUNK_INDEX_FILE)).await?;
        let dedup_index = load_index::<DedupEntry>(&options.base_path.join(DEDUP_INDEX_FILE)).await?;

        info!(
            base_path = %options.base_path.display(),
            chunks = chunk_index.len(),
            dedup_entries = dedup_index.len(),
            "chunk store opened"
        );

        let cache = ChunkCache::new(options.max_cache_size, options.eviction_policy);

        Ok(Self {
            options,
            chunk_index: RwLock::new(chunk_index),
            dedup_index: RwLock::new(dedup_index),
            cache,
            analytics: RwLock::new(StorageAnalytics::default()),
        })
    }

    /// Store options in effect
    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    fn blob_path(&self, hash: &str) -> PathBuf {
        self.options.base_path.join(hash)
    }

    /// Store a blob, returning its content address and bookkeeping record
    ///
    /// Identical content deduplicates: the existing record's refcount is
    /// incremented and no bytes are rewritten.
    pub async fn put(&self, data: &[u8]) -> StorageResult<(String, ChunkInfo)> {
        let hash = content_address(data);

        // Fast path: the exact content address is already indexed.
        if let Some(info) = self.bump_existing(&hash).await {
            self.record_put(data.len() as u64, true).await;
            debug!(hash = %hash, refcount = info.reference_count, "duplicate put");
            return Ok((hash, info));
        }

        let dedup_key = rolling_hash(data);

        if self.options.enable_deduplication {
            if let Some(info) = self.probe_dedup(&dedup_key).await {
                self.record_put(data.len() as u64, true).await;
                debug!(hash = %info.hash, "dedup index hit");
                return Ok((info.hash.clone(), info));
            }
        }

        // Choose the stored representation.
        let (stored, is_compressed) = if self.options.enable_compression
            && data.len() >= self.options.compression_threshold
        {
            match shardcast_codec::compress_if_worthwhile(data)? {
                Some(compressed) => (compressed, true),
                None => (data.to_vec(), false),
            }
        } else {
            (data.to_vec(), false)
        };

        let path = self.blob_path(&hash);
        write_blob_once(&path, &stored).await?;

        let now = Utc::now();
        let new_info = ChunkInfo {
            hash: hash.clone(),
            size: data.len() as u64,
            compressed_size: stored.len() as u64,
            is_compressed,
            compression_ratio: if is_compressed {
                data.len() as f64 / stored.len() as f64
            } else {
                1.0
            },
            reference_count: 1,
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
            storage_path: path.to_string_lossy().into_owned(),
            deduplication_key: dedup_key.clone(),
        };

        // Insert, or bump the record a racing put inserted first. The blob
        // write above is idempotent for identical content, so either way
        // exactly one on-disk object exists.
        let (info, duplicate) = {
            let mut index = self.chunk_index.write().await;
            match index.entry(hash.clone()) {
                std::collections::hash_map::Entry::Occupied(mut entry) => {
                    let existing = entry.get_mut();
                    existing.reference_count += 1;
                    existing.touch();
                    (existing.clone(), true)
                }
                std::collections::hash_map::Entry::Vacant(slot) => {
                    slot.insert(new_info.clone());
                    (new_info, false)
                }
            }
        };

        if self.options.enable_deduplication {
            self.index_dedup(&dedup_key, &hash, data.len() as u64).await;
        }

        if self.options.enable_cache {
            self.cache.put(&hash, data.to_vec()).await;
        }

        self.record_put(data.len() as u64, duplicate).await;
        debug!(
            hash = %hash,
            size = data.len(),
            stored = info.compressed_size,
            compressed = info.is_compressed,
            "chunk stored"
        );

        Ok((hash, info))
    }

    /// Load a blob's decoded bytes and its bookkeeping record
    ///
    /// Cache hits return the cached body verbatim. Disk reads reverse the
    /// stored representation (`CorruptError` on a broken LZ4 frame) and
    /// admit the body to the cache.
    pub async fn get(&self, hash: &str) -> StorageResult<(Vec<u8>, ChunkInfo)> {
        let Some(info) = self.chunk_index.read().await.get(hash).cloned() else {
            return Err(StorageError::not_found(hash));
        };

        if self.options.enable_cache {
            if let Some(data) = self.cache.get(hash).await {
                let info = self.touch_entry(hash).await.unwrap_or(info);
                self.analytics
                    .write()
                    .await
                    .record_get(data.len() as u64, true);
                return Ok((data, info));
            }
        }

        let stored = match tokio::fs::read(&info.storage_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::not_found(hash));
            }
            Err(e) => return Err(e.into()),
        };

        let data = if info.is_compressed {
            shardcast_codec::decompress(&stored)?
        } else {
            stored
        };

        let info = self.touch_entry(hash).await.unwrap_or(info);

        if self.options.enable_cache {
            self.cache.put(hash, data.clone()).await;
        }

        self.analytics
            .write()
            .await
            .record_get(data.len() as u64, false);

        Ok((data, info))
    }

    /// Filesystem path of a stored blob
    pub async fn path(&self, hash: &str) -> StorageResult<String> {
        self.chunk_index
            .read()
            .await
            .get(hash)
            .map(|info| info.storage_path.clone())
            .ok_or_else(|| StorageError::not_found(hash))
    }

    /// Whether a blob with this content address is indexed
    pub async fn contains(&self, hash: &str) -> bool {
        self.chunk_index.read().await.contains_key(hash)
    }

    /// Drop one logical reference to a blob
    ///
    /// Returns the remaining refcount. A record at zero stays indexed until
    /// the optimizer's orphan sweep removes blob and entry together.
    pub async fn release(&self, hash: &str) -> StorageResult<u64> {
        let mut index = self.chunk_index.write().await;
        let info = index
            .get_mut(hash)
            .ok_or_else(|| StorageError::not_found(hash))?;
        info.reference_count = info.reference_count.saturating_sub(1);
        Ok(info.reference_count)
    }

    /// Current analytics snapshot
    pub async fn analytics(&self) -> StorageAnalytics {
        self.analytics.read().await.clone()
    }

    /// Stats report grouped into storage / cache / dedup / performance
    pub async fn report(&self) -> HashMap<String, serde_json::Value> {
        let analytics = self.analytics.read().await.clone();
        let cache_stats = self.cache.stats().await;
        let dedup_entries = self.dedup_index.read().await.len();

        let mut report = HashMap::new();
        report.insert(
            "storage".to_string(),
            json!({
                "unique_chunks": analytics.unique_chunks,
                "bytes_stored": analytics.bytes_stored,
                "bytes_on_disk": analytics.bytes_on_disk,
                "compression_saved_bytes": analytics.compression_saved_bytes,
                "avg_chunk_size": analytics.avg_chunk_size,
                "avg_compression_ratio": analytics.avg_compression_ratio,
            }),
        );
        report.insert(
            "cache".to_string(),
            json!({
                "entries": cache_stats.entry_count,
                "size_bytes": cache_stats.total_size,
                "max_size_bytes": cache_stats.max_size,
                "hit_rate": analytics.cache_hit_rate(),
            }),
        );
        report.insert(
            "dedup".to_string(),
            json!({
                "index_entries": dedup_entries,
                "duplicate_chunks": analytics.duplicate_chunks,
                "saved_bytes": analytics.dedup_saved_bytes,
            }),
        );
        report.insert(
            "performance".to_string(),
            json!({
                "total_puts": analytics.total_puts,
                "total_gets": analytics.total_gets,
                "cache_hits": analytics.cache_hits,
                "cache_misses": analytics.cache_misses,
            }),
        );
        report
    }

    /// Serialize both indices to `base_path`
    ///
    /// Marshalling happens under the read lock; the file write happens
    /// outside it.
    pub async fn persist_indices(&self) -> StorageResult<()> {
        let chunk_json = {
            let index = self.chunk_index.read().await;
            serde_json::to_string_pretty(&*index)
                .map_err(|e| StorageError::Serialization(e.to_string()))?
        };
        let dedup_json = {
            let index = self.dedup_index.read().await;
            serde_json::to_string_pretty(&*index)
                .map_err(|e| StorageError::Serialization(e.to_string()))?
        };

        write_atomic(
            &self.options.base_path.join(CHUNK_INDEX_FILE),
            chunk_json.as_bytes(),
        )
        .await?;
        write_atomic(
            &self.options.base_path.join(DEDUP_INDEX_FILE),
            dedup_json.as_bytes(),
        )
        .await?;

        debug!("indices persisted");
        Ok(())
    }

    /// Remove blobs whose refcount has reached zero
    ///
    /// Deletes the on-disk object, its index entry and its dedup reference
    /// together; returns the number of blobs collected.
    pub async fn collect_orphans(&self) -> StorageResult<usize> {
        let orphans: Vec<(String, String, String)> = {
            let index = self.chunk_index.read().await;
            index
                .values()
                .filter(|info| info.reference_count == 0)
                .map(|info| {
                    (
                        info.hash.clone(),
                        info.storage_path.clone(),
                        info.deduplication_key.clone(),
                    )
                })
                .collect()
        };

        for (hash, path, dedup_key) in &orphans {
            match tokio::fs::remove_file(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(hash = %hash, error = %e, "failed to remove orphaned blob");
                    continue;
                }
            }

            self.chunk_index.write().await.remove(hash);
            self.cache.remove(hash).await;

            let mut dedup = self.dedup_index.write().await;
            if let Some(entry) = dedup.get_mut(dedup_key) {
                entry.chunk_hashes.retain(|h| h != hash);
                if entry.chunk_hashes.is_empty() {
                    dedup.remove(dedup_key);
                }
            }
        }

        if !orphans.is_empty() {
            info!(collected = orphans.len(), "orphaned chunks collected");
        }
        Ok(orphans.len())
    }

    /// Drop cache entries stale for `stale_secs` with under `min_access` hits
    pub async fn sweep_cache(&self, stale_secs: i64, min_access: u64) -> usize {
        let cutoff = Utc::now() - chrono::Duration::seconds(stale_secs);
        self.cache.sweep_stale(cutoff, min_access).await
    }

    /// Recompute the aggregate analytics fields from the chunk index
    pub async fn rollup_analytics(&self) {
        let (count, bytes_stored, bytes_on_disk, ratio_sum) = {
            let index = self.chunk_index.read().await;
            let count = index.len() as u64;
            let bytes_stored: u64 = index.values().map(|i| i.size).sum();
            let bytes_on_disk: u64 = index.values().map(|i| i.compressed_size).sum();
            let ratio_sum: f64 = index.values().map(|i| i.compression_ratio).sum();
            (count, bytes_stored, bytes_on_disk, ratio_sum)
        };

        let mut analytics = self.analytics.write().await;
        analytics.unique_chunks = count;
        analytics.bytes_stored = bytes_stored;
        analytics.bytes_on_disk = bytes_on_disk;
        analytics.compression_saved_bytes = bytes_stored.saturating_sub(bytes_on_disk);
        analytics.avg_chunk_size = if count == 0 {
            0.0
        } else {
            bytes_stored as f64 / count as f64
        };
        analytics.avg_compression_ratio = if count == 0 { 1.0 } else { ratio_sum / count as f64 };
    }

    /// Drop hourly analytics buckets older than the retention window
    pub async fn decay_analytics(&self, retention_secs: i64) {
        self.analytics.write().await.prune_hourly(retention_secs);
    }

    // Increment refcount and access stats for an already-indexed address.
    async fn bump_existing(&self, hash: &str) -> Option<ChunkInfo> {
        let mut index = self.chunk_index.write().await;
        let info = index.get_mut(hash)?;
        info.reference_count += 1;
        info.touch();
        Some(info.clone())
    }

    // Dedup probe: find an indexed blob sharing the rolling hash, bump it.
    async fn probe_dedup(&self, dedup_key: &str) -> Option<ChunkInfo> {
        let candidate = {
            let dedup = self.dedup_index.read().await;
            let entry = dedup.get(dedup_key)?;
            entry.chunk_hashes.first().cloned()?
        };

        let info = self.bump_existing(&candidate).await?;

        let mut dedup = self.dedup_index.write().await;
        if let Some(entry) = dedup.get_mut(dedup_key) {
            entry.count += 1;
            entry.last_seen = Utc::now();
        }
        Some(info)
    }

    // Insert or refresh the dedup entry for a newly stored blob.
    async fn index_dedup(&self, dedup_key: &str, hash: &str, size: u64) {
        let mut dedup = self.dedup_index.write().await;
        let now = Utc::now();
        let entry = dedup
            .entry(dedup_key.to_string())
            .or_insert_with(|| DedupEntry {
                size,
                count: 0,
                first_seen: now,
                last_seen: now,
                chunk_hashes: Vec::new(),
            });
        entry.count += 1;
        entry.last_seen = now;
        if !entry.chunk_hashes.iter().any(|h| h == hash) {
            entry.chunk_hashes.push(hash.to_string());
        }
    }

    async fn touch_entry(&self, hash: &str) -> Option<ChunkInfo> {
        let mut index = self.chunk_index.write().await;
        let info = index.get_mut(hash)?;
        info.touch();
        Some(info.clone())
    }

    async fn record_put(&self, size: u64, duplicate: bool) {
        self.analytics.write().await.record_put(size, duplicate);
    }
}

async fn load_index<T: serde::de::DeserializeOwned>(
    path: &Path,
) -> StorageResult<HashMap<String, T>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
        Err(e) => Err(e.into()),
    }
}

// Write-once: identical puts never rewrite the object.
async fn write_blob_once(path: &Path, data: &[u8]) -> StorageResult<()> {
    if tokio::fs::try_exists(path).await? {
        return Ok(());
    }
    write_atomic(path, data).await
}

// Temp file + atomic rename so no partial write is ever visible.
async fn write_atomic(path: &Path, data: &[u8]) -> StorageResult<()> {
    let temp_path = path.with_extension("tmp");
    let _ = tokio::fs::remove_file(&temp_path).await;

    let mut file = tokio::fs::File::create(&temp_path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&temp_path, path).await?;
    Ok(())
}
