//! Report Builder (spec.md §4.5): assembles a [`RiskReport`] from the
//! drained [`TraceData`] and a [`RiskScore`], then writes it through the
//! Cache under the report key with the configured `cache.ttl-seconds` TTL —
//! idempotent, per spec.md §8's cache-idempotence property.

use crate::cache::{make_key, Cache, KeyFamily};
use crate::error::CacheError;
use crate::model::{FlaggedEntity, RiskReport, RiskScore};
use crate::tracer::TraceData;
use chrono::Utc;
use std::cmp::Ordering;
use std::time::Duration;

pub async fn build_and_store(
    cache: &dyn Cache,
    chain: &str,
    tx_id: &str,
    trace_depth: u32,
    data: &TraceData,
    score: RiskScore,
    ttl: Duration,
) -> Result<RiskReport, CacheError> {
    let mut flagged = data.flagged.clone();
    flagged.sort_by(sort_flagged);

    let report = RiskReport {
        tx_id: tx_id.to_string(),
        chain: chain.to_string(),
        analyzed_at: Utc::now(),
        trace_depth,
        total_addresses: data.visited_addr.len(),
        total_transactions: data.visited_tx.len(),
        risk_score: score,
        flagged,
        api_calls_used: data.api_calls,
    };

    let key = make_key(KeyFamily::RiskReport, chain, tx_id, Some(trace_depth));
    let bytes = serde_json::to_vec(&report)?;
    let _ = cache.set(&key, bytes, ttl).await;
    Ok(report)
}

/// Looks up a previously stored report for `(chain, tx_id, trace_depth)`.
pub async fn cached_report(
    cache: &dyn Cache,
    chain: &str,
    tx_id: &str,
    trace_depth: u32,
) -> Option<RiskReport> {
    let key = make_key(KeyFamily::RiskReport, chain, tx_id, Some(trace_depth));
    let bytes = cache.get(&key).await.ok().flatten()?;
    serde_json::from_slice(&bytes).ok()
}

/// `(distance ascending, contribution descending)` per spec.md §3.
fn sort_flagged(a: &FlaggedEntity, b: &FlaggedEntity) -> Ordering {
    a.distance.cmp(&b.distance).then_with(|| {
        b.contribution
            .partial_cmp(&a.contribution)
            .unwrap_or(Ordering::Equal)
    })
}
