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

//! Configuration file loading and saving

use crate::error::{ConfigError, ConfigResult};
use crate::schema::Config;
use crate::validation::validate;
use std::path::Path;
use tracing::{debug, info};

/// Load a configuration file, falling back to defaults when absent
///
/// The loaded (or default) configuration is validated before it is returned.
pub async fn load_or_default(path: impl AsRef<Path>) -> ConfigResult<Config> {
    let path = path.as_ref();

    let config = if path.exists() {
        load_file(path).await?
    } else {
        debug!(path = %path.display(), "no config file, using defaults");
        Config::default()
    };

    validate(&config)?;
    Ok(config)
}

/// Load and parse a TOML configuration file
pub async fn load_file(path: impl AsRef<Path>) -> ConfigResult<Config> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path).await?;
    let config: Config =
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?;

    info!(path = %path.display(), "configuration loaded");
    Ok(config)
}

/// Save a configuration as pretty-printed TOML
pub async fn save_file(config: &Config, path: impl AsRef<Path>) -> ConfigResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let contents =
        toml::to_string_pretty(config).map_err(|e| ConfigError::Parse(e.to_string()))?;
    tokio::fs::write(path, contents).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_absent_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_or_default(dir.path().join("missing.toml"))
            .await
            .unwrap();
        assert_eq!(config, Config::default());
    }

    #[tokio::test]
    async fn test_save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config {
            max_cache_size: 42 * 1024,
            cache_eviction_policy: "lru".to_string(),
            ..Config::default()
        };

        save_file(&config, &path).await.unwrap();
        let loaded = load_or_default(&path).await.unwrap();
        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn test_malformed_toml_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        tokio::fs::write(&path, "max_cache_size = [not valid")
            .await
            .unwrap();

        let err = load_or_default(&path).await.unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[tokio::test]
    async fn test_invalid_values_rejected_on_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        tokio::fs::write(&path, "parallelism_ratio = 0").await.unwrap();

        let err = load_or_default(&path).await.unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
