//! S5 (spec.md §8): a provider failure partway through the walk drops that
//! one node instead of failing the whole analysis; `api_calls_used` still
//! reflects the attempt and the rest of the walk resolves normally.

mod helpers;

use async_trait::async_trait;
use helpers::{clean_metadata, utxo_tx};
use kyt_core::cache::MemoryCache;
use kyt_core::error::ProviderError;
use kyt_core::model::{AddressMetadata, InternalTx, Transaction};
use kyt_core::provider::{mock::MockProvider, BlockchainProvider, TxInputRef};
use kyt_core::{analyze, scorer::ScorerConfig, tracer::TracerConfig};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

/// Wraps a [`MockProvider`], failing every `get_tx_inputs` call for one
/// specific tx id as if its upstream rate limit retries had just exhausted.
struct FlakyProvider {
    inner: MockProvider,
    fails_tx_inputs_for: String,
}

#[async_trait]
impl BlockchainProvider for FlakyProvider {
    async fn get_tx(&self, chain: &str, tx_id: &str) -> Result<Transaction, ProviderError> {
        self.inner.get_tx(chain, tx_id).await
    }

    async fn get_tx_inputs(
        &self,
        chain: &str,
        tx_id: &str,
    ) -> Result<Vec<TxInputRef>, ProviderError> {
        if tx_id.eq_ignore_ascii_case(&self.fails_tx_inputs_for) {
            return Err(ProviderError::RateLimited {
                retry_after: Some(Duration::from_secs(1)),
            });
        }
        self.inner.get_tx_inputs(chain, tx_id).await
    }

    async fn get_internal_txs(
        &self,
        chain: &str,
        tx_id: &str,
    ) -> Result<Vec<InternalTx>, ProviderError> {
        self.inner.get_internal_txs(chain, tx_id).await
    }

    async fn get_address_metadata(
        &self,
        chain: &str,
        address: &str,
    ) -> Result<AddressMetadata, ProviderError> {
        self.inner.get_address_metadata(chain, address).await
    }

    async fn is_contract(&self, chain: &str, address: &str) -> Result<bool, ProviderError> {
        self.inner.is_contract(chain, address).await
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

#[tokio::test]
async fn exhausted_retries_drop_one_node_but_trace_still_succeeds() {
    let mock = MockProvider::new();
    mock.seed_tx(
        "bitcoin",
        "root-tx-001",
        utxo_tx(
            "root-tx-001",
            vec![("a", Some("tx-a")), ("b", Some("tx-b"))],
        ),
    )
    .await;
    mock.seed_tx_inputs("bitcoin", "tx-b", vec![("pred-b".into(), "tx-b2".into())])
        .await;
    for addr in ["a", "b", "pred-b"] {
        mock.seed_address_metadata("bitcoin", addr, clean_metadata(addr))
            .await;
    }

    let provider = Arc::new(FlakyProvider {
        inner: mock,
        fails_tx_inputs_for: "tx-a".to_string(),
    });

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

    // a's own predecessor lookup failed and was dropped; b's side resolved
    // one hop further to pred-b.
    assert_eq!(report.total_addresses, 3);
    assert!(report.api_calls_used > 0);
    assert!(report.flagged.is_empty());
}
