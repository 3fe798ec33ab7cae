//! Chain-aware data source capability set (spec.md §4.2).
//!
//! Grounded in `libs/api-client-framework` for the HTTP client shape, in
//! `libs/reqwest-rate-limiter` and `reqwest-retry` for pacing/backoff, and in
//! `original_source/app/providers/multi_provider.py` for per-chain routing
//! with fallback.

mod circuit_breaker;
mod composite;
mod http;
mod tag_extractor;

#[cfg(any(test, feature = "test-support"))]
pub mod mock;

pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use composite::CompositeProvider;
pub use http::{HttpProvider, HttpProviderConfig};
pub use tag_extractor::TagExtractor;

use crate::error::ProviderError;
use crate::model::{AddressMetadata, InternalTx, Transaction};
use async_trait::async_trait;

/// One `(predecessor-address, prev-tx-id)` pair as consumed by UTXO expansion
/// (spec.md §4.3.5).
pub type TxInputRef = (String, String);

/// `{get-tx, get-tx-inputs, get-internal-txs, get-address-metadata, is-contract,
/// close, health-check}` from spec.md §4.2.
#[async_trait]
pub trait BlockchainProvider: Send + Sync {
    async fn get_tx(&self, chain: &str, tx_id: &str) -> Result<Transaction, ProviderError>;

    /// Returns `(predecessor_address, prev_tx_id)` for every input of `tx_id`.
    async fn get_tx_inputs(
        &self,
        chain: &str,
        tx_id: &str,
    ) -> Result<Vec<TxInputRef>, ProviderError>;

    /// Internal (sub-)calls of a contract-executing transaction, for chains
    /// where `ChainConfig::has_internal_txs` is set.
    async fn get_internal_txs(
        &self,
        chain: &str,
        tx_id: &str,
    ) -> Result<Vec<InternalTx>, ProviderError>;

    async fn get_address_metadata(
        &self,
        chain: &str,
        address: &str,
    ) -> Result<AddressMetadata, ProviderError>;

    async fn is_contract(&self, chain: &str, address: &str) -> Result<bool, ProviderError>;

    async fn health_check(&self) -> Result<(), ProviderError>;

    /// Releases any held connections. A no-op for stateless clients.
    async fn close(&self) {}
}
