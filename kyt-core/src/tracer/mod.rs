//! Concurrent, bounded, priority-ordered backward walk over the provenance
//! graph (spec.md §4.3 — the core algorithm).
//!
//! Grounded in `da-indexer-logic/src/indexer.rs`'s stream-driven processing
//! loop for the overall shape (bounded work loop consulting a provider and a
//! cache, settling a batch before advancing) and in
//! `eth-bytecode-db/src/bin/database_populate.rs`'s `Arc<Semaphore>` fan-out
//! idiom for bounding per-layer concurrency.

mod frontier;
mod state;

pub use state::{TraceData, TraceNode};

use crate::cache::{make_key, Cache, KeyFamily};
use crate::chain::ChainRegistry;
use crate::error::{CoreError, ProviderError};
use crate::model::{AddressMetadata, ChainKind, Transaction};
use crate::provider::BlockchainProvider;
use crate::scorer::{entity_contribution, ScorerConfig};
use frontier::Frontier;
use state::TraceState;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct TracerConfig {
    /// `tracer.concurrency`
    pub concurrency: usize,
    /// `tracer.batch-cap`
    pub batch_cap: usize,
    /// `tracer.max-addresses`
    pub max_addresses: usize,
    /// `tracer.max-depth`
    pub max_depth: u32,
    pub cache_ttl: Duration,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            batch_cap: 20,
            max_addresses: 1_000,
            max_depth: 10,
            cache_ttl: crate::cache::DEFAULT_TTL,
        }
    }
}

pub struct Tracer {
    provider: Arc<dyn BlockchainProvider>,
    cache: Arc<dyn Cache>,
    config: TracerConfig,
    scorer_config: ScorerConfig,
}

/// Context shared read-only across every concurrently spawned node task for
/// one `trace()` call.
struct TracerCtx {
    provider: Arc<dyn BlockchainProvider>,
    cache: Arc<dyn Cache>,
    state: Arc<TraceState>,
    chain: String,
    chain_kind: ChainKind,
    supports_internal: bool,
    config: TracerConfig,
    scorer_config: ScorerConfig,
    semaphore: Semaphore,
}

impl Tracer {
    pub fn new(
        provider: Arc<dyn BlockchainProvider>,
        cache: Arc<dyn Cache>,
        config: TracerConfig,
    ) -> Self {
        Self {
            provider,
            cache,
            config,
            scorer_config: ScorerConfig::default(),
        }
    }

    pub fn with_scorer_config(mut self, scorer_config: ScorerConfig) -> Self {
        self.scorer_config = scorer_config;
        self
    }

    /// Runs the full backward walk for `(chain, root_tx_id)` up to
    /// `requested_depth`, returning the root transaction (for the Report
    /// Builder) and the drained [`TraceData`].
    #[tracing::instrument(skip_all, fields(chain, root_tx_id, requested_depth))]
    pub async fn trace(
        &self,
        chain: &str,
        root_tx_id: &str,
        requested_depth: u32,
        cancel: Option<CancellationToken>,
    ) -> Result<(Transaction, TraceData), CoreError> {
        let chain_config = ChainRegistry::get(chain)
            .ok_or_else(|| CoreError::UnsupportedChain(chain.to_string()))?;
        let max_depth = requested_depth.min(self.config.max_depth);

        let state = Arc::new(TraceState::new());
        let root_tx = self.fetch_root(&state, chain, root_tx_id).await?;
        state.mark_tx_visited(root_tx_id).await;

        let mut frontier = Frontier::new();
        match chain_config.kind {
            ChainKind::Utxo => {
                // Each input already names the tx that funded it; seed the
                // frontier there directly so the first expansion looks at
                // that tx's own inputs instead of root's again.
                for input in &root_tx.inputs {
                    let tx_id = input
                        .prev_tx_id
                        .clone()
                        .unwrap_or_else(|| root_tx_id.to_string());
                    let path = vec![input.address.to_lowercase()];
                    frontier.push(TraceNode {
                        tx_id,
                        address: input.address.clone(),
                        depth: 0,
                        parent_tx: None,
                        priority: 0,
                        path,
                    });
                }
            }
            ChainKind::Account => {
                for source in root_tx.source_addresses() {
                    let path = vec![source.to_lowercase()];
                    frontier.push(TraceNode {
                        tx_id: root_tx_id.to_string(),
                        address: source,
                        depth: 0,
                        parent_tx: None,
                        priority: 0,
                        path,
                    });
                }
            }
        }

        let ctx = Arc::new(TracerCtx {
            provider: self.provider.clone(),
            cache: self.cache.clone(),
            state: state.clone(),
            chain: chain.to_string(),
            chain_kind: chain_config.kind,
            supports_internal: chain_config.has_internal_txs,
            config: self.config.clone(),
            scorer_config: self.scorer_config.clone(),
            semaphore: Semaphore::new(self.config.concurrency.max(1)),
        });

        let mut processed = 0usize;
        loop {
            if let Some(token) = &cancel {
                if token.is_cancelled() {
                    return Err(CoreError::Cancelled);
                }
            }
            if processed >= self.config.max_addresses {
                tracing::warn!(
                    chain,
                    root_tx_id,
                    processed,
                    cap = self.config.max_addresses,
                    "max-addresses cap reached; stopping trace"
                );
                break;
            }
            if frontier.is_empty() {
                break;
            }

            let raw_batch = frontier.pop_layer(self.config.batch_cap);
            let mut batch = Vec::with_capacity(raw_batch.len());
            for node in raw_batch {
                if node.depth > max_depth {
                    continue;
                }
                if processed >= self.config.max_addresses {
                    break;
                }
                if state.mark_addr_visited(&node.address).await {
                    batch.push(node);
                    processed += 1;
                }
            }
            if batch.is_empty() {
                continue;
            }
            tracing::debug!(chain, root_tx_id, batch_size = batch.len(), processed, "starting batch");

            let tasks = batch.into_iter().map(|node| {
                let ctx = ctx.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move { process_node(ctx, node, cancel).await })
            });
            let results = futures::future::join_all(tasks).await;
            for children in results.into_iter().flatten() {
                for child in children {
                    if child.depth <= max_depth {
                        frontier.push(child);
                    }
                }
            }
        }

        drop(ctx);
        let state = Arc::try_unwrap(state)
            .unwrap_or_else(|_| panic!("outstanding TraceState references after drain"));
        Ok((root_tx, state.into_data()))
    }

    async fn fetch_root(
        &self,
        state: &TraceState,
        chain: &str,
        tx_id: &str,
    ) -> Result<Transaction, CoreError> {
        let key = make_key(KeyFamily::Tx, chain, tx_id, None);
        if let Ok(Some(bytes)) = self.cache.get(&key).await {
            if let Ok(tx) = serde_json::from_slice::<Transaction>(&bytes) {
                tracing::debug!(chain, tx_id, "root tx cache hit");
                return Ok(tx);
            }
        }
        tracing::debug!(chain, tx_id, "root tx cache miss");
        state.increment_api_calls().await;
        match self.provider.get_tx(chain, tx_id).await {
            Ok(tx) => {
                if let Ok(bytes) = serde_json::to_vec(&tx) {
                    let _ = self.cache.set(&key, bytes, self.config.cache_ttl).await;
                }
                Ok(tx)
            }
            Err(ProviderError::TxNotFound) => Err(CoreError::TxNotFound {
                chain: chain.to_string(),
                tx_id: tx_id.to_string(),
            }),
            Err(_) => Err(CoreError::InvalidTransaction {
                chain: chain.to_string(),
                tx_id: tx_id.to_string(),
            }),
        }
    }
}

/// Per-node processing (spec.md §4.3.4), holding one concurrency permit for
/// its lifetime.
async fn process_node(
    ctx: Arc<TracerCtx>,
    node: TraceNode,
    cancel: Option<CancellationToken>,
) -> Vec<TraceNode> {
    let _permit = ctx
        .semaphore
        .acquire()
        .await
        .expect("semaphore never closed");
    if let Some(token) = &cancel {
        if token.is_cancelled() {
            return Vec::new();
        }
    }

    let meta = resolve_metadata(&ctx, &node.address).await;
    if !meta.tags.is_empty() {
        let contribution = entity_contribution(&meta.tags, node.depth, &ctx.scorer_config);
        ctx.state
            .push_flagged(crate::model::FlaggedEntity {
                address: node.address.clone(),
                chain: ctx.chain.clone(),
                tags: meta.tags.clone(),
                distance: node.depth,
                via_tx: node.tx_id.clone(),
                contribution,
            })
            .await;
        if meta.tags.iter().any(|t| t.is_definitive()) {
            return Vec::new();
        }
    }

    if node.depth >= ctx.config.max_depth {
        return Vec::new();
    }

    match ctx.chain_kind {
        ChainKind::Utxo => expand_utxo(&ctx, &node).await,
        ChainKind::Account => expand_account(&ctx, &node).await,
    }
}

/// Cache-through address metadata resolution (spec.md §4.3.7): in-run
/// hot cache → persistent Cache → Provider. Provider errors degrade to an
/// empty-tag record rather than failing the walk.
async fn resolve_metadata(ctx: &TracerCtx, address: &str) -> AddressMetadata {
    if let Some(meta) = ctx.state.metadata(address).await {
        return meta;
    }
    let key = make_key(KeyFamily::AddrMeta, &ctx.chain, address, None);
    if let Ok(Some(bytes)) = ctx.cache.get(&key).await {
        if let Ok(meta) = serde_json::from_slice::<AddressMetadata>(&bytes) {
            ctx.state.cache_metadata(address, meta.clone()).await;
            return meta;
        }
    }
    ctx.state.increment_api_calls().await;
    let meta = match ctx.provider.get_address_metadata(&ctx.chain, address).await {
        Ok(meta) => meta,
        Err(err) => {
            tracing::debug!(address, chain = %ctx.chain, %err, "address metadata resolution failed; degrading to empty tags");
            AddressMetadata {
                address: address.to_string(),
                chain: ctx.chain.clone(),
                ..Default::default()
            }
        }
    };
    if let Ok(bytes) = serde_json::to_vec(&meta) {
        let _ = ctx.cache.set(&key, bytes, ctx.config.cache_ttl).await;
    }
    ctx.state.cache_metadata(address, meta.clone()).await;
    meta
}

/// Cache-through transaction resolution used by Account expansion to look up
/// the transaction a node's tx-id names (spec.md §4.3.6, §4.3.7).
async fn fetch_tx_cached(ctx: &TracerCtx, tx_id: &str) -> Result<Transaction, ProviderError> {
    let key = make_key(KeyFamily::Tx, &ctx.chain, tx_id, None);
    if let Ok(Some(bytes)) = ctx.cache.get(&key).await {
        if let Ok(tx) = serde_json::from_slice::<Transaction>(&bytes) {
            return Ok(tx);
        }
    }
    ctx.state.increment_api_calls().await;
    let tx = ctx.provider.get_tx(&ctx.chain, tx_id).await?;
    if let Ok(bytes) = serde_json::to_vec(&tx) {
        let _ = ctx.cache.set(&key, bytes, ctx.config.cache_ttl).await;
    }
    Ok(tx)
}

fn extend_path(node: &TraceNode, address: &str) -> Vec<String> {
    let mut path = node.path.clone();
    path.push(address.to_lowercase());
    path
}

fn on_path(node: &TraceNode, address: &str) -> bool {
    let lowered = address.to_lowercase();
    node.path.iter().any(|a| a == &lowered)
}

/// UTXO expansion (spec.md §4.3.5).
async fn expand_utxo(ctx: &TracerCtx, node: &TraceNode) -> Vec<TraceNode> {
    ctx.state.mark_tx_visited(&node.tx_id).await;
    let pairs = match ctx.provider.get_tx_inputs(&ctx.chain, &node.tx_id).await {
        Ok(pairs) => {
            ctx.state.increment_api_calls().await;
            pairs
        }
        Err(err) => {
            ctx.state.increment_api_calls().await;
            tracing::debug!(tx_id = %node.tx_id, %err, "tx-inputs lookup failed; dropping node");
            return Vec::new();
        }
    };

    let mut children = Vec::new();
    for (predecessor_address, prev_tx_id) in pairs {
        if ctx.state.is_tx_visited(&prev_tx_id).await {
            continue;
        }
        ctx.state.mark_tx_visited(&prev_tx_id).await;
        ctx.state
            .record_edge(&node.address, &predecessor_address)
            .await;

        if on_path(node, &predecessor_address) {
            let mut cycle = node.path.clone();
            cycle.push(predecessor_address.to_lowercase());
            ctx.state.record_circular_path(cycle).await;
            continue;
        }

        let existing_meta = ctx.state.metadata(&predecessor_address).await;
        let priority = existing_meta
            .as_ref()
            .map(|m| 10 * m.tags.len() as i64)
            .unwrap_or(0);

        children.push(TraceNode {
            path: extend_path(node, &predecessor_address),
            tx_id: prev_tx_id,
            address: predecessor_address,
            depth: node.depth + 1,
            parent_tx: Some(node.tx_id.clone()),
            priority,
        });
    }
    children
}

/// Account expansion (spec.md §4.3.6). Children reuse `node.tx_id` — a
/// single account-model transaction only reveals its own immediate
/// counterparties; deeper ancestry requires further transactions named by
/// upstream nodes.
async fn expand_account(ctx: &TracerCtx, node: &TraceNode) -> Vec<TraceNode> {
    let tx = match fetch_tx_cached(ctx, &node.tx_id).await {
        Ok(tx) => tx,
        Err(err) => {
            tracing::debug!(tx_id = %node.tx_id, %err, "account tx lookup failed; dropping node");
            return Vec::new();
        }
    };
    if let Some(block_time) = tx.block_time {
        ctx.state.record_timestamp(&node.tx_id, block_time).await;
    }

    let mut children = Vec::new();

    if let Some(sender) = &tx.sender {
        if !sender.eq_ignore_ascii_case(&node.address) && !ctx.state.is_addr_visited(sender).await {
            ctx.state.record_edge(&node.address, sender).await;
            if on_path(node, sender) {
                let mut cycle = node.path.clone();
                cycle.push(sender.to_lowercase());
                ctx.state.record_circular_path(cycle).await;
            } else {
                children.push(TraceNode {
                    path: extend_path(node, sender),
                    tx_id: node.tx_id.clone(),
                    address: sender.clone(),
                    depth: node.depth + 1,
                    parent_tx: Some(node.tx_id.clone()),
                    priority: 0,
                });
            }
        }
    }

    if tx.is_contract_call && ctx.supports_internal {
        let mut seen_from = HashSet::new();
        for itx in &tx.internals {
            if itx.from_address.eq_ignore_ascii_case(&node.address) {
                continue;
            }
            if !seen_from.insert(itx.from_address.to_lowercase()) {
                continue;
            }
            if ctx.state.is_addr_visited(&itx.from_address).await {
                continue;
            }
            ctx.state
                .record_edge(&node.address, &itx.from_address)
                .await;
            if on_path(node, &itx.from_address) {
                let mut cycle = node.path.clone();
                cycle.push(itx.from_address.to_lowercase());
                ctx.state.record_circular_path(cycle).await;
                continue;
            }
            children.push(TraceNode {
                path: extend_path(node, &itx.from_address),
                tx_id: node.tx_id.clone(),
                address: itx.from_address.clone(),
                depth: node.depth + 1,
                parent_tx: Some(node.tx_id.clone()),
                priority: 5,
            });
        }
    }

    ctx.state.mark_tx_visited(&node.tx_id).await;
    children
}
