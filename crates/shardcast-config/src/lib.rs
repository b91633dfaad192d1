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

//! Configuration management for the Shardcast distribution core
//!
//! A TOML-backed schema covering every recognized option: dedup/compression/
//! cache toggles, cache sizing and eviction policy, compression threshold,
//! optimization cadence, analytics retention and worker parallelism. Absent
//! files yield defaults; loaded values are validated before use.
//!
//! # Examples
//!
//! ```no_run
//! use shardcast_config::{load_or_default, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), shardcast_config::ConfigError> {
//!     let config: Config = load_or_default(".shardcast/config.toml").await?;
//!     println!("workers divisor: {}", config.parallelism_ratio);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_file, load_or_default, save_file};
pub use schema::Config;
pub use validation::validate;
