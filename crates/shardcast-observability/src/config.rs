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

//! Logging configuration types

use thiserror::Error;

/// Errors that can occur during logging configuration
#[derive(Error, Debug)]
pub enum LogError {
    /// Format string did not name a known output format
    #[error("invalid log format: {0}")]
    InvalidFormat(String),

    /// Filter directive could not be parsed
    #[error("configuration error: {0}")]
    Config(String),
}

/// Output format for logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output with colors
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
    /// JSON format for machine-readable logs
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(LogError::InvalidFormat(format!(
                "{} (expected pretty, compact or json)",
                other
            ))),
        }
    }
}

/// Configuration for logging
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Output format
    pub format: LogFormat,
    /// Level filter; `None` defers to the `RUST_LOG` environment variable
    pub level: Option<String>,
}

impl LogConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output format
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    /// Effective filter directive: config, then `RUST_LOG`, then `info`
    pub fn effective_level(&self) -> String {
        self.level
            .clone()
            .or_else(|| std::env::var("RUST_LOG").ok())
            .unwrap_or_else(|| "info".to_string())
    }
}
