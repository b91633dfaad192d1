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

//! Configuration schema
//!
//! Every recognized option, its default and its effect on the distribution
//! core. Durations are expressed in seconds; sizes in bytes.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the distribution core
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Directory for stored chunks and the persisted indices
    pub base_path: String,

    /// Directory for the metadata store
    pub metadata_path: String,

    /// Probe the dedup index before writing a new blob
    pub enable_deduplication: bool,

    /// Attempt LZ4 compression on ingest and in the store
    pub enable_compression: bool,

    /// Admit decoded chunk bodies to the in-memory cache
    pub enable_intelligent_cache: bool,

    /// Cache bound in bytes
    pub max_cache_size: u64,

    /// Cache eviction policy: `lru`, `lfu`, `fifo` or `hybrid`
    pub cache_eviction_policy: String,

    /// Minimum chunk size in bytes before compression is attempted
    pub compression_threshold: u64,

    /// Dedup observation window in seconds (informational, analytics only)
    pub deduplication_window_secs: u64,

    /// Background optimization period in seconds; 0 disables the task
    pub optimization_interval_secs: u64,

    /// Hourly analytics retention in seconds
    pub analytics_retention_secs: u64,

    /// Worker divisor: workers = cpu_count / ratio, floor 1
    pub parallelism_ratio: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_path: ".shardcast/chunks".to_string(),
            metadata_path: ".shardcast/metadata".to_string(),
            enable_deduplication: true,
            enable_compression: true,
            enable_intelligent_cache: true,
            max_cache_size: 1024 * 1024 * 1024,
            cache_eviction_policy: "hybrid".to_string(),
            compression_threshold: 1024,
            deduplication_window_secs: 24 * 3600,
            optimization_interval_secs: 30 * 60,
            analytics_retention_secs: 7 * 24 * 3600,
            parallelism_ratio: 2,
        }
    }
}
