//! S6 (spec.md §8): a fan-out transaction with more inputs than
//! `max_addresses` allows still yields a complete report, capped at the
//! configured limit.

mod helpers;

use helpers::{clean_metadata, utxo_tx};
use kyt_core::cache::MemoryCache;
use kyt_core::provider::mock::MockProvider;
use kyt_core::{analyze, scorer::ScorerConfig, tracer::TracerConfig};
use pretty_assertions::assert_eq;
use std::sync::Arc;

#[tokio::test]
async fn fan_out_past_the_cap_still_returns_a_report() {
    let provider = Arc::new(MockProvider::new());
    let addresses: Vec<String> = (1..=50).map(|i| format!("a{i}")).collect();
    let inputs: Vec<(&str, Option<&str>)> = addresses.iter().map(|a| (a.as_str(), None)).collect();
    provider
        .seed_tx("bitcoin", "root-tx-001", utxo_tx("root-tx-001", inputs))
        .await;
    for addr in &addresses {
        provider
            .seed_address_metadata("bitcoin", addr, clean_metadata(addr))
            .await;
    }

    let report = analyze(
        provider,
        Arc::new(MemoryCache::default()),
        TracerConfig {
            max_addresses: 10,
            ..Default::default()
        },
        ScorerConfig::default(),
        "bitcoin",
        "root-tx-001",
        3,
    )
    .await
    .unwrap();

    assert_eq!(report.total_addresses, 10);
}
