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

//! Background optimization engine
//!
//! Runs a periodic maintenance cycle over the chunk store:
//!
//! 1. **Cache sweep** — drop entries stale for 24 h with under 2 accesses
//! 2. **Orphan GC** — remove zero-refcount blobs and their index entries
//! 3. **Analytics decay** — drop hourly buckets past the retention window
//! 4. **Aggregate rollup** — recompute totals from the chunk index
//! 5. **Index persistence** — write `chunk_index.json` / `dedup_index.json`
//!
//! The engine moves `Stopped → Running → Stopping → Stopped`. `start` is
//! idempotent per instance; `stop` flushes the indices before transitioning.
//! No cycle is dispatched after the stop signal is observed.

use crate::store::ChunkStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Engine lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Not running; safe to start
    Stopped,
    /// Periodic cycle active
    Running,
    /// Stop observed; flushing before the final transition
    Stopping,
}

/// Optimization engine tuning
#[derive(Debug, Clone)]
pub struct OptimizerOptions {
    /// Cycle period; zero disables the background task entirely
    pub interval: Duration,
    /// Cache entries idle for this long become sweep candidates
    pub cache_stale_after: Duration,
    /// Sweep candidates below this access count are dropped
    pub cache_min_access: u64,
    /// Hourly analytics buckets older than this are discarded
    pub analytics_retention: Duration,
}

impl Default for OptimizerOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30 * 60),
            cache_stale_after: Duration::from_secs(24 * 3600),
            cache_min_access: 2,
            analytics_retention: Duration::from_secs(7 * 24 * 3600),
        }
    }
}

/// Periodic maintenance task over a [`ChunkStore`]
pub struct OptimizationEngine {
    store: Arc<ChunkStore>,
    options: OptimizerOptions,
    state: RwLock<EngineState>,
    stop_tx: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl OptimizationEngine {
    /// Create an engine in the `Stopped` state
    pub fn new(store: Arc<ChunkStore>, options: OptimizerOptions) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            store,
            options,
            state: RwLock::new(EngineState::Stopped),
            stop_tx,
            handle: Mutex::new(None),
        }
    }

    /// Current lifecycle state
    pub async fn state(&self) -> EngineState {
        *self.state.read().await
    }

    /// Start the periodic cycle
    ///
    /// Idempotent: starting a running engine does nothing. A zero interval
    /// disables the background task; the engine stays `Stopped` and
    /// [`run_cycle`](Self::run_cycle) remains available for manual runs.
    pub async fn start(self: &Arc<Self>) {
        if self.options.interval.is_zero() {
            debug!("optimization interval is zero, background task disabled");
            return;
        }

        {
            let mut state = self.state.write().await;
            if *state != EngineState::Stopped {
                return;
            }
            *state = EngineState::Running;
        }

        let _ = self.stop_tx.send(false);
        let mut stop_rx = self.stop_tx.subscribe();
        let engine = Arc::clone(self);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(engine.options.interval);
            // The first tick fires immediately; skip it so the first cycle
            // runs one full interval after start.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        engine.run_cycle().await;
                    }
                    _ = stop_rx.changed() => {
                        if *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        *self.handle.lock().await = Some(handle);
        info!(interval_secs = self.options.interval.as_secs(), "optimization engine started");
    }

    /// Stop the engine, flushing indices before the final transition
    pub async fn stop(&self) {
        {
            let mut state = self.state.write().await;
            if *state != EngineState::Running {
                return;
            }
            *state = EngineState::Stopping;
        }

        let _ = self.stop_tx.send(true);
        if let Some(handle) = self.handle.lock().await.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "optimizer task join failed");
            }
        }

        if let Err(e) = self.store.persist_indices().await {
            warn!(error = %e, "index flush on stop failed");
        }

        *self.state.write().await = EngineState::Stopped;
        info!("optimization engine stopped");
    }

    /// Run one maintenance cycle immediately
    pub async fn run_cycle(&self) {
        let swept = self
            .store
            .sweep_cache(
                self.options.cache_stale_after.as_secs() as i64,
                self.options.cache_min_access,
            )
            .await;

        let collected = match self.store.collect_orphans().await {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "orphan collection failed");
                0
            }
        };

        self.store
            .decay_analytics(self.options.analytics_retention.as_secs() as i64)
            .await;
        self.store.rollup_analytics().await;

        if let Err(e) = self.store.persist_indices().await {
            warn!(error = %e, "periodic index persistence failed");
        }

        debug!(swept, collected, "optimization cycle complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreOptions;
    use tempfile::TempDir;

    async fn engine_with_interval(dir: &TempDir, interval: Duration) -> Arc<OptimizationEngine> {
        let store = Arc::new(
            ChunkStore::open(StoreOptions {
                base_path: dir.path().to_path_buf(),
                ..StoreOptions::default()
            })
            .await
            .unwrap(),
        );
        Arc::new(OptimizationEngine::new(
            store,
            OptimizerOptions {
                interval,
                ..OptimizerOptions::default()
            },
        ))
    }

    #[tokio::test]
    async fn test_start_stop_transitions() {
        let dir = TempDir::new().unwrap();
        let engine = engine_with_interval(&dir, Duration::from_secs(3600)).await;

        assert_eq!(engine.state().await, EngineState::Stopped);
        engine.start().await;
        assert_eq!(engine.state().await, EngineState::Running);
        engine.stop().await;
        assert_eq!(engine.state().await, EngineState::Stopped);
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let engine = engine_with_interval(&dir, Duration::from_secs(3600)).await;

        engine.start().await;
        engine.start().await;
        assert_eq!(engine.state().await, EngineState::Running);
        engine.stop().await;
    }

    #[tokio::test]
    async fn test_zero_interval_disables_task() {
        let dir = TempDir::new().unwrap();
        let engine = engine_with_interval(&dir, Duration::ZERO).await;

        engine.start().await;
        assert_eq!(engine.state().await, EngineState::Stopped);
    }

    #[tokio::test]
    async fn test_stop_flushes_indices() {
        let dir = TempDir::new().unwrap();
        let engine = engine_with_interval(&dir, Duration::from_secs(3600)).await;

        engine.store.put(&b"flushed".repeat(100)).await.unwrap();
        engine.start().await;
        engine.stop().await;

        assert!(dir.path().join("chunk_index.json").exists());
        assert!(dir.path().join("dedup_index.json").exists());
    }

    #[tokio::test]
    async fn test_cycle_collects_orphans() {
        let dir = TempDir::new().unwrap();
        let engine = engine_with_interval(&dir, Duration::from_secs(3600)).await;

        let (hash, _) = engine.store.put(&b"orphan".repeat(100)).await.unwrap();
        engine.store.release(&hash).await.unwrap();

        engine.run_cycle().await;
        assert!(!engine.store.contains(&hash).await);
    }

    #[tokio::test]
    async fn test_periodic_cycle_fires() {
        let dir = TempDir::new().unwrap();
        let engine = engine_with_interval(&dir, Duration::from_millis(50)).await;

        let (hash, _) = engine.store.put(&b"timed orphan".repeat(100)).await.unwrap();
        engine.store.release(&hash).await.unwrap();

        engine.start().await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        engine.stop().await;

        assert!(!engine.store.contains(&hash).await);
    }
}
