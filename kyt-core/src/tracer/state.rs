//! Per-analysis working set (spec.md §3 TraceState).
//!
//! Single-owner per `analyze()` call, but mutated from concurrently spawned
//! node tasks during the drain, so the fields live behind one mutex — the
//! "one struct, one mutex" idiom spec.md §9 calls out, mirrored here from
//! [`crate::provider::CircuitBreaker`]'s own state guard.

use crate::model::{AddressMetadata, FlaggedEntity};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;

/// A unit of work on the frontier. `path` carries the lowercased address
/// ancestry from the root so expansion can detect a cycle reintroducing an
/// address already on the current walk (spec.md §4.3 Cycle detection).
#[derive(Debug, Clone)]
pub struct TraceNode {
    pub tx_id: String,
    pub address: String,
    pub depth: u32,
    pub parent_tx: Option<String>,
    pub priority: i64,
    pub path: Vec<String>,
}

/// The plain data spec.md §3 describes, handed to the Scorer and Report
/// Builder once the drain completes.
#[derive(Debug, Clone, Default)]
pub struct TraceData {
    pub visited_addr: HashSet<String>,
    pub visited_tx: HashSet<String>,
    pub flagged: Vec<FlaggedEntity>,
    pub addr_meta: HashMap<String, AddressMetadata>,
    pub adjacency: HashMap<String, HashSet<String>>,
    pub tx_timestamps: HashMap<String, DateTime<Utc>>,
    pub circular_paths: Vec<Vec<String>>,
    pub api_calls: u64,
}

#[derive(Default)]
pub struct TraceState {
    inner: Mutex<TraceData>,
}

impl TraceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `address` was newly marked visited (i.e. this caller
    /// won the race to process it).
    pub async fn mark_addr_visited(&self, address: &str) -> bool {
        self.inner
            .lock()
            .await
            .visited_addr
            .insert(address.to_lowercase())
    }

    pub async fn is_addr_visited(&self, address: &str) -> bool {
        self.inner
            .lock()
            .await
            .visited_addr
            .contains(&address.to_lowercase())
    }

    pub async fn mark_tx_visited(&self, tx_id: &str) -> bool {
        self.inner
            .lock()
            .await
            .visited_tx
            .insert(tx_id.to_lowercase())
    }

    pub async fn is_tx_visited(&self, tx_id: &str) -> bool {
        self.inner
            .lock()
            .await
            .visited_tx
            .contains(&tx_id.to_lowercase())
    }

    pub async fn record_timestamp(&self, tx_id: &str, at: DateTime<Utc>) {
        self.inner
            .lock()
            .await
            .tx_timestamps
            .insert(tx_id.to_lowercase(), at);
    }

    pub async fn record_edge(&self, from: &str, to: &str) {
        self.inner
            .lock()
            .await
            .adjacency
            .entry(from.to_lowercase())
            .or_default()
            .insert(to.to_lowercase());
    }

    pub async fn record_circular_path(&self, path: Vec<String>) {
        self.inner.lock().await.circular_paths.push(path);
    }

    pub async fn cache_metadata(&self, address: &str, meta: AddressMetadata) {
        self.inner
            .lock()
            .await
            .addr_meta
            .insert(address.to_lowercase(), meta);
    }

    pub async fn metadata(&self, address: &str) -> Option<AddressMetadata> {
        self.inner
            .lock()
            .await
            .addr_meta
            .get(&address.to_lowercase())
            .cloned()
    }

    pub async fn push_flagged(&self, entity: FlaggedEntity) {
        self.inner.lock().await.flagged.push(entity);
    }

    pub async fn increment_api_calls(&self) {
        self.inner.lock().await.api_calls += 1;
    }

    /// Consumes the state, returning the plain [`TraceData`] snapshot. Only
    /// valid once every task holding a clone of the surrounding `Arc` has
    /// finished — the drain loop enforces this by joining all tasks first.
    pub fn into_data(self) -> TraceData {
        self.inner.into_inner()
    }
}
