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

//! Shardcast distribution core
//!
//! Transforms arbitrary files into ordered, content-addressed, compressed,
//! encrypted chunks and reassembles them on demand with integrity checks at
//! every chunk boundary:
//!
//! - **Chunker**: fixed-stride windows, parallel codec workers over a
//!   bounded channel, first-error cancellation, doubly-indexed chunk chain
//! - **Reassembler**: chain validation, per-chunk hash verification,
//!   whole-file hash verification
//! - **Metadata store**: durable name/id → file metadata and id → chunk
//!   list mappings
//! - **Engine**: single owner wiring the store, metadata, codec settings
//!   and the background optimizer
//!
//! # Examples
//!
//! ```no_run
//! use shardcast_core::Engine;
//! use shardcast_config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = Engine::open(Config::default()).await?;
//!
//!     let report = engine.ingest_file("video.mkv", "secret").await?;
//!     println!("{} chunks under id {}", report.total_chunks, report.file_id);
//!
//!     engine.reassemble_file(&report.file_id, "restored.mkv", "secret").await?;
//!     engine.shutdown().await?;
//!     Ok(())
//! }
//! ```

pub mod chunker;
pub mod engine;
pub mod error;
pub mod hash;
pub mod metadata;
pub mod reassembler;

pub use chunker::{chunk_size_for, Chunker, ChunkerOptions, IngestReport};
pub use engine::Engine;
pub use error::{CoreError, CoreResult};
pub use hash::ContentHash;
pub use metadata::{
    validate_chunk_chain, ChunkMetadata, FileMetadata, MetadataStore, LINK_NONE,
};
pub use reassembler::Reassembler;
