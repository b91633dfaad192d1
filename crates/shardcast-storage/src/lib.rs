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

//! Content-addressed chunk storage for Shardcast
//!
//! This crate provides the local half of the distribution layer: a
//! filesystem-backed, content-addressed chunk repository with two-level
//! deduplication, opportunistic LZ4 compression, a bounded priority cache of
//! decoded chunk bodies, and a background optimization engine that keeps the
//! store tidy (stale-cache sweep, orphan GC, analytics decay, index
//! persistence).
//!
//! # Core Concepts
//!
//! - **Content address**: the hex SHA-256 of a blob's bytes, used as its
//!   storage key and on-disk filename
//! - **Refcount**: number of logical chunks pointing at one stored blob;
//!   zero-refcount blobs are garbage collected
//! - **Dedup index**: rolling-content-hash → blob mapping probed before any
//!   new blob is written
//!
//! # Examples
//!
//! ```no_run
//! use shardcast_storage::{ChunkStore, StoreOptions, StorageResult};
//!
//! #[tokio::main]
//! async fn main() -> StorageResult<()> {
//!     let store = ChunkStore::open(StoreOptions::default()).await?;
//!
//!     let (hash, info) = store.put(b"chunk bytes").await?;
//!     println!("stored {} ({} bytes on disk)", hash, info.compressed_size);
//!
//!     let (data, _) = store.get(&hash).await?;
//!     assert_eq!(data, b"chunk bytes");
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod chunk_info;
pub mod error;
pub mod optimizer;
pub mod store;

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;

pub use cache::{CacheStats, ChunkCache, EvictionPolicy};
pub use chunk_info::{ChunkInfo, DedupEntry, HourlyBucket, StorageAnalytics};
pub use error::{StorageError, StorageResult};
pub use optimizer::{EngineState, OptimizationEngine, OptimizerOptions};
pub use store::{content_address, rolling_hash, ChunkStore, StoreOptions};

/// Minimal storage interface consumed by the chunker and reassembler
///
/// Implementations must be `Send + Sync` for concurrent use from the
/// chunker's worker pool.
#[async_trait]
pub trait ChunkStorage: Send + Sync + Debug {
    /// Store a blob, returning its content-address key
    async fn put(&self, data: &[u8]) -> StorageResult<String>;

    /// Load a blob's decoded bytes by key
    async fn get(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Filesystem path of a stored blob
    async fn path(&self, key: &str) -> StorageResult<String>;
}

/// Extended interface consumed by the distribution layer
///
/// Adds per-blob bookkeeping to the basic operations plus access to the
/// analytics snapshot and the grouped stats report.
#[async_trait]
pub trait OptimizedStorage: ChunkStorage {
    /// Store a blob, returning its key and bookkeeping record
    async fn optimized_put(&self, data: &[u8]) -> StorageResult<(String, ChunkInfo)>;

    /// Load a blob with its bookkeeping record
    async fn optimized_get(&self, key: &str) -> StorageResult<(Vec<u8>, ChunkInfo)>;

    /// Current analytics snapshot
    async fn analytics(&self) -> StorageAnalytics;

    /// Stats report grouped into storage / cache / dedup / performance
    async fn report(&self) -> HashMap<String, serde_json::Value>;
}

#[async_trait]
impl ChunkStorage for ChunkStore {
    async fn put(&self, data: &[u8]) -> StorageResult<String> {
        let (key, _) = ChunkStore::put(self, data).await?;
        Ok(key)
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        let (data, _) = ChunkStore::get(self, key).await?;
        Ok(data)
    }

    async fn path(&self, key: &str) -> StorageResult<String> {
        ChunkStore::path(self, key).await
    }
}

#[async_trait]
impl OptimizedStorage for ChunkStore {
    async fn optimized_put(&self, data: &[u8]) -> StorageResult<(String, ChunkInfo)> {
        ChunkStore::put(self, data).await
    }

    async fn optimized_get(&self, key: &str) -> StorageResult<(Vec<u8>, ChunkInfo)> {
        ChunkStore::get(self, key).await
    }

    async fn analytics(&self) -> StorageAnalytics {
        ChunkStore::analytics(self).await
    }

    async fn report(&self) -> HashMap<String, serde_json::Value> {
        ChunkStore::report(self).await
    }
}
