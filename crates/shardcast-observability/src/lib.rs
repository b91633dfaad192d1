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

//! Structured logging for Shardcast
//!
//! Initializes the `tracing` subscriber with environment-based filtering
//! (`RUST_LOG`) and a choice of pretty, compact or JSON output.
//!
//! # Example
//!
//! ```ignore
//! use shardcast_observability::{init_tracing, LogFormat};
//!
//! #[tokio::main]
//! async fn main() {
//!     init_tracing(LogFormat::Pretty, None).unwrap();
//!     tracing::info!("engine starting");
//! }
//! ```

pub mod config;
pub mod initialization;

pub use config::{LogConfig, LogError, LogFormat};
pub use initialization::{init_tracing, init_tracing_with_config};

/// Tracing re-exports for convenience
pub use tracing::{debug, error, info, span, trace, warn, Level};
