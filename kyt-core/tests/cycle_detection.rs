//! S4 (spec.md §8): a cycle A -> B -> C -> A records one circular path and
//! contributes the flat CircularPathPenalty with no other signals.

mod helpers;

use helpers::{clean_metadata, utxo_tx};
use kyt_core::cache::MemoryCache;
use kyt_core::provider::mock::MockProvider;
use kyt_core::{analyze, scorer::ScorerConfig, tracer::TracerConfig};
use pretty_assertions::assert_eq;
use std::sync::Arc;

#[tokio::test]
async fn three_address_cycle_scores_ten() {
    let provider = Arc::new(MockProvider::new());
    provider
        .seed_tx(
            "bitcoin",
            "root-tx-001",
            utxo_tx("root-tx-001", vec![("a", Some("tx-a"))]),
        )
        .await;
    provider
        .seed_tx_inputs("bitcoin", "tx-a", vec![("b".into(), "tx-b".into())])
        .await;
    provider
        .seed_tx_inputs("bitcoin", "tx-b", vec![("c".into(), "tx-c".into())])
        .await;
    provider
        .seed_tx_inputs("bitcoin", "tx-c", vec![("a".into(), "tx-a2".into())])
        .await;
    for addr in ["a", "b", "c"] {
        provider
            .seed_address_metadata("bitcoin", addr, clean_metadata(addr))
            .await;
    }

    let report = analyze(
        provider,
        Arc::new(MemoryCache::default()),
        TracerConfig::default(),
        ScorerConfig::default(),
        "bitcoin",
        "root-tx-001",
        3,
    )
    .await
    .unwrap();

    assert_eq!(report.risk_score.score, 10);
    assert_eq!(report.total_addresses, 3);
}
