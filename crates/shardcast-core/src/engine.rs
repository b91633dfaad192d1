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

//! Engine facade: one owner for the whole pipeline
//!
//! The engine wires the chunk store, the metadata store, the chunker, the
//! reassembler and the background optimizer together from a single
//! [`Config`]. The process-wide mutable maps (chunk index, dedup index,
//! cache, analytics) all live inside the store behind their own locks; the
//! engine is the only owner handed across the codebase.

use crate::chunker::{Chunker, ChunkerOptions, IngestReport};
use crate::error::{CoreError, CoreResult};
use crate::hash::ContentHash;
use crate::metadata::{FileMetadata, MetadataStore};
use crate::reassembler::Reassembler;
use shardcast_config::Config;
use shardcast_storage::{
    ChunkStore, EvictionPolicy, OptimizationEngine, OptimizerOptions, StorageAnalytics,
    StoreOptions,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// The distribution core behind one owner
pub struct Engine {
    store: Arc<ChunkStore>,
    metadata: Arc<MetadataStore>,
    optimizer: Arc<OptimizationEngine>,
    chunker: Chunker,
    reassembler: Reassembler,
}

impl Engine {
    /// Open the engine from a validated configuration
    ///
    /// Starts the background optimizer unless `optimization_interval_secs`
    /// is zero.
    pub async fn open(config: Config) -> CoreResult<Self> {
        shardcast_config::validate(&config)?;

        let eviction_policy: EvictionPolicy = config
            .cache_eviction_policy
            .parse()
            .map_err(shardcast_config::ConfigError::invalid)?;

        let store = Arc::new(
            ChunkStore::open(StoreOptions {
                base_path: config.base_path.clone().into(),
                enable_deduplication: config.enable_deduplication,
                enable_compression: config.enable_compression,
                enable_cache: config.enable_intelligent_cache,
                max_cache_size: config.max_cache_size,
                eviction_policy,
                compression_threshold: config.compression_threshold as usize,
            })
            .await?,
        );

        let metadata = Arc::new(MetadataStore::open(&config.metadata_path).await?);

        let optimizer = Arc::new(OptimizationEngine::new(
            Arc::clone(&store),
            OptimizerOptions {
                interval: Duration::from_secs(config.optimization_interval_secs),
                analytics_retention: Duration::from_secs(config.analytics_retention_secs),
                ..OptimizerOptions::default()
            },
        ));
        optimizer.start().await;

        let chunker = Chunker::new(
            Arc::clone(&store) as Arc<dyn shardcast_storage::ChunkStorage>,
            Arc::clone(&metadata),
            ChunkerOptions {
                parallelism_ratio: config.parallelism_ratio,
                enable_compression: config.enable_compression,
                compression_threshold: config.compression_threshold as usize,
            },
        );
        let reassembler = Reassembler::new(
            Arc::clone(&store) as Arc<dyn shardcast_storage::ChunkStorage>,
            Arc::clone(&metadata),
        );

        info!("engine opened");

        Ok(Self {
            store,
            metadata,
            optimizer,
            chunker,
            reassembler,
        })
    }

    /// Ingest a file into the store under the given password
    pub async fn ingest_file(
        &self,
        path: impl AsRef<Path>,
        password: &str,
    ) -> CoreResult<IngestReport> {
        self.chunker.ingest_file(path, password).await
    }

    /// Reassemble a file to `output_path`
    pub async fn reassemble_file(
        &self,
        file_id: &ContentHash,
        output_path: impl AsRef<Path>,
        password: &str,
    ) -> CoreResult<()> {
        self.reassembler
            .reassemble(file_id, output_path, password)
            .await
    }

    /// Delete a file: drop its metadata and release its chunk references
    ///
    /// Each released blob whose refcount reaches zero becomes a GC
    /// candidate for the optimizer's next orphan sweep.
    pub async fn delete_file(&self, file_id: &ContentHash) -> CoreResult<FileMetadata> {
        let chunks = self.metadata.get_chunks_by_file_id(file_id).await;
        let removed = self
            .metadata
            .remove_file(file_id)
            .await?
            .ok_or_else(|| CoreError::FileNotFound(file_id.to_hex()))?;

        for chunk in &chunks {
            if let Err(e) = self.store.release(&chunk.path).await {
                warn!(key = %chunk.path, error = %e, "release failed during delete");
            }
        }

        info!(file_id = %file_id, name = %removed.name, chunks = chunks.len(), "file deleted");
        Ok(removed)
    }

    /// File metadata by name
    pub async fn file_by_name(&self, name: &str) -> Option<FileMetadata> {
        self.metadata.get_file_metadata(name).await
    }

    /// File metadata by id
    pub async fn file_by_id(&self, file_id: &ContentHash) -> Option<FileMetadata> {
        self.metadata.get_file_metadata_by_id(file_id).await
    }

    /// All recorded files
    pub async fn list_files(&self) -> Vec<FileMetadata> {
        self.metadata.list_files().await
    }

    /// Storage analytics snapshot
    pub async fn analytics(&self) -> StorageAnalytics {
        self.store.analytics().await
    }

    /// Grouped stats report from the store
    pub async fn report(&self) -> HashMap<String, serde_json::Value> {
        self.store.report().await
    }

    /// Run one optimization cycle immediately
    pub async fn optimize_now(&self) {
        self.optimizer.run_cycle().await;
    }

    /// Stop the optimizer and flush the store indices
    pub async fn shutdown(&self) -> CoreResult<()> {
        self.optimizer.stop().await;
        self.store.persist_indices().await?;
        info!("engine shut down");
        Ok(())
    }

    /// The underlying chunk store
    pub fn store(&self) -> &Arc<ChunkStore> {
        &self.store
    }

    /// The underlying metadata store
    pub fn metadata(&self) -> &Arc<MetadataStore> {
        &self.metadata
    }
}
