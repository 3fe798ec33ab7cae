//! Know-Your-Transaction compliance engine core.
//!
//! Exposes a single operation, [`analyze`], tracing a transaction's
//! provenance backward up to a requested depth and scoring the evidence
//! collected along the way (spec.md §1, §6).

pub mod cache;
pub mod chain;
pub mod config;
pub mod error;
pub mod intern;
pub mod model;
pub mod provider;
pub mod report;
pub mod scorer;
pub mod tracer;

use cache::Cache;
use chain::ChainRegistry;
use error::CoreError;
use model::RiskReport;
use provider::BlockchainProvider;
use scorer::ScorerConfig;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracer::{Tracer, TracerConfig};

const MIN_TX_ID_LEN: usize = 10;
const MAX_REQUESTABLE_DEPTH: u32 = 10;

/// `analyze(chain, tx-id, depth) -> RiskReport` (spec.md §6).
///
/// On a cached report hit this makes zero provider calls
/// (`api_calls_used == 0`, spec.md §8 property 6). On miss it drains the
/// Tracer, scores the result, and writes the assembled report through the
/// Cache before returning it.
pub async fn analyze(
    provider: Arc<dyn BlockchainProvider>,
    cache: Arc<dyn Cache>,
    tracer_config: TracerConfig,
    scorer_config: ScorerConfig,
    chain: &str,
    tx_id: &str,
    depth: u32,
) -> Result<RiskReport, CoreError> {
    analyze_cancellable(
        provider,
        cache,
        tracer_config,
        scorer_config,
        chain,
        tx_id,
        depth,
        None,
    )
    .await
}

/// As [`analyze`], but aborts promptly with [`CoreError::Cancelled`] and no
/// partial report if `cancel` fires (spec.md §5 Cancellation & timeouts).
#[allow(clippy::too_many_arguments)]
#[tracing::instrument(skip_all, fields(chain, tx_id, depth))]
pub async fn analyze_cancellable(
    provider: Arc<dyn BlockchainProvider>,
    cache: Arc<dyn Cache>,
    tracer_config: TracerConfig,
    scorer_config: ScorerConfig,
    chain: &str,
    tx_id: &str,
    depth: u32,
    cancel: Option<CancellationToken>,
) -> Result<RiskReport, CoreError> {
    validate_request(chain, tx_id, depth)?;
    let trace_depth = depth
        .min(tracer_config.max_depth)
        .min(MAX_REQUESTABLE_DEPTH);

    if let Some(mut report) = report::cached_report(cache.as_ref(), chain, tx_id, trace_depth).await
    {
        tracing::info!(chain, tx_id, "report cache hit");
        // This invocation made zero provider round-trips (spec.md §8
        // property 6); the stored count reflects the run that populated it.
        report.api_calls_used = 0;
        return Ok(report);
    }
    tracing::info!(chain, tx_id, depth = trace_depth, "report cache miss; starting trace");

    let cache_ttl = tracer_config.cache_ttl;
    let tracer = Tracer::new(provider, cache.clone(), tracer_config)
        .with_scorer_config(scorer_config.clone());
    let (_, data) = tracer.trace(chain, tx_id, trace_depth, cancel).await?;

    if !data.flagged.is_empty() {
        tracing::info!(
            chain,
            tx_id,
            flagged = data.flagged.len(),
            "flagged entities found during trace"
        );
    }

    let score = scorer::score(&data, &scorer_config);
    let report =
        report::build_and_store(cache.as_ref(), chain, tx_id, trace_depth, &data, score, cache_ttl)
            .await
            .unwrap_or_else(|_| {
            // Cache write failed; the report itself was still computed and
            // is returned uncached rather than failing the whole analysis.
            build_uncached(
                chain,
                tx_id,
                trace_depth,
                &data,
                scorer::score(&data, &scorer_config),
            )
        });

    Ok(report)
}

fn build_uncached(
    chain: &str,
    tx_id: &str,
    trace_depth: u32,
    data: &tracer::TraceData,
    risk_score: model::RiskScore,
) -> RiskReport {
    let mut flagged = data.flagged.clone();
    flagged.sort_by(|a, b| {
        a.distance.cmp(&b.distance).then_with(|| {
            b.contribution
                .partial_cmp(&a.contribution)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    });
    RiskReport {
        tx_id: tx_id.to_string(),
        chain: chain.to_string(),
        analyzed_at: chrono::Utc::now(),
        trace_depth,
        total_addresses: data.visited_addr.len(),
        total_transactions: data.visited_tx.len(),
        risk_score,
        flagged,
        api_calls_used: data.api_calls,
    }
}

fn validate_request(chain: &str, tx_id: &str, depth: u32) -> Result<(), CoreError> {
    if !ChainRegistry::is_supported(chain) {
        return Err(CoreError::UnsupportedChain(chain.to_string()));
    }
    if tx_id.len() < MIN_TX_ID_LEN {
        return Err(CoreError::InvalidRequest(format!(
            "tx-id must be at least {MIN_TX_ID_LEN} characters"
        )));
    }
    if depth == 0 || depth > MAX_REQUESTABLE_DEPTH {
        return Err(CoreError::InvalidRequest(format!(
            "depth must be between 1 and {MAX_REQUESTABLE_DEPTH}"
        )));
    }
    Ok(())
}
