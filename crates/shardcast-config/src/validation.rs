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

//! Configuration validation

use crate::error::{ConfigError, ConfigResult};
use crate::schema::Config;

const KNOWN_POLICIES: &[&str] = &["lru", "lfu", "fifo", "hybrid"];

/// Check every recognized option for a usable value
pub fn validate(config: &Config) -> ConfigResult<()> {
    if config.parallelism_ratio < 1 {
        return Err(ConfigError::invalid(
            "parallelism_ratio must be at least 1",
        ));
    }

    let policy = config.cache_eviction_policy.to_ascii_lowercase();
    if !KNOWN_POLICIES.contains(&policy.as_str()) {
        return Err(ConfigError::invalid(format!(
            "unknown cache_eviction_policy '{}' (expected one of: {})",
            config.cache_eviction_policy,
            KNOWN_POLICIES.join(", ")
        )));
    }

    if config.enable_intelligent_cache && config.max_cache_size == 0 {
        return Err(ConfigError::invalid(
            "max_cache_size must be non-zero when the cache is enabled",
        ));
    }

    if config.base_path.is_empty() || config.metadata_path.is_empty() {
        return Err(ConfigError::invalid(
            "base_path and metadata_path must be non-empty",
        ));
    }

    Ok(())
}
