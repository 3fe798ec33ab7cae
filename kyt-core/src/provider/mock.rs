//! Seedable [`BlockchainProvider`] fixture for Tracer/Scorer/Composite tests.
//!
//! Grounded in `da-indexer-logic`'s hand-rolled test doubles, kept as a plain
//! struct since the provider trait here is domain-specific rather than raw
//! HTTP — there is nothing for wiremock to intercept.

use super::{BlockchainProvider, TxInputRef};
use crate::error::ProviderError;
use crate::model::{AddressMetadata, InternalTx, Transaction};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

type Key = (String, String);

#[derive(Default)]
struct MockState {
    txs: HashMap<Key, Transaction>,
    inputs: HashMap<Key, Vec<TxInputRef>>,
    internals: HashMap<Key, Vec<InternalTx>>,
    addresses: HashMap<Key, AddressMetadata>,
    calls: u64,
}

/// In-memory stand-in for a real provider. Unseeded lookups return the same
/// not-found errors a real provider would for an unknown id.
#[derive(Default)]
pub struct MockProvider {
    state: Mutex<MockState>,
}

fn key(chain: &str, id: &str) -> Key {
    (chain.to_lowercase(), id.to_lowercase())
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_tx(&self, chain: &str, tx_id: &str, tx: Transaction) {
        self.state.lock().await.txs.insert(key(chain, tx_id), tx);
    }

    pub async fn seed_tx_inputs(&self, chain: &str, tx_id: &str, inputs: Vec<TxInputRef>) {
        self.state
            .lock()
            .await
            .inputs
            .insert(key(chain, tx_id), inputs);
    }

    pub async fn seed_internal_txs(&self, chain: &str, tx_id: &str, internals: Vec<InternalTx>) {
        self.state
            .lock()
            .await
            .internals
            .insert(key(chain, tx_id), internals);
    }

    pub async fn seed_address_metadata(&self, chain: &str, address: &str, meta: AddressMetadata) {
        self.state
            .lock()
            .await
            .addresses
            .insert(key(chain, address), meta);
    }

    pub async fn call_count(&self) -> u64 {
        self.state.lock().await.calls
    }
}

#[async_trait]
impl BlockchainProvider for MockProvider {
    async fn get_tx(&self, chain: &str, tx_id: &str) -> Result<Transaction, ProviderError> {
        let mut state = self.state.lock().await;
        state.calls += 1;
        state
            .txs
            .get(&key(chain, tx_id))
            .cloned()
            .ok_or(ProviderError::TxNotFound)
    }

    async fn get_tx_inputs(
        &self,
        chain: &str,
        tx_id: &str,
    ) -> Result<Vec<TxInputRef>, ProviderError> {
        let mut state = self.state.lock().await;
        state.calls += 1;
        Ok(state
            .inputs
            .get(&key(chain, tx_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_internal_txs(
        &self,
        chain: &str,
        tx_id: &str,
    ) -> Result<Vec<InternalTx>, ProviderError> {
        let mut state = self.state.lock().await;
        state.calls += 1;
        Ok(state
            .internals
            .get(&key(chain, tx_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_address_metadata(
        &self,
        chain: &str,
        address: &str,
    ) -> Result<AddressMetadata, ProviderError> {
        let mut state = self.state.lock().await;
        state.calls += 1;
        state
            .addresses
            .get(&key(chain, address))
            .cloned()
            .ok_or(ProviderError::AddressNotFound)
    }

    async fn is_contract(&self, chain: &str, address: &str) -> Result<bool, ProviderError> {
        Ok(self.get_address_metadata(chain, address).await?.is_contract)
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}
