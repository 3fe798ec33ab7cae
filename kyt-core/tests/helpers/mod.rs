//! Shared fixtures for the end-to-end scenario tests (spec.md §8).

use kyt_core::model::{AddressMetadata, ChainKind, RiskTag, Transaction, TxInput};
use std::collections::BTreeSet;

#[allow(dead_code)]
pub fn utxo_tx(tx_id: &str, inputs: Vec<(&str, Option<&str>)>) -> Transaction {
    Transaction {
        tx_id: tx_id.into(),
        chain: "bitcoin".into(),
        kind: ChainKind::Utxo,
        block_height: None,
        block_time: None,
        fee: 0.0,
        size: None,
        inputs: inputs
            .into_iter()
            .map(|(address, prev)| TxInput {
                address: address.into(),
                value: 1.0,
                prev_tx_id: prev.map(String::from),
                prev_output_index: None,
            })
            .collect(),
        outputs: Vec::new(),
        sender: None,
        recipient: None,
        value: 1.0,
        gas_used: None,
        gas_price: None,
        nonce: None,
        is_contract_call: false,
        internals: Vec::new(),
        raw: serde_json::Value::Null,
    }
}

#[allow(dead_code)]
pub fn clean_metadata(address: &str) -> AddressMetadata {
    AddressMetadata {
        address: address.into(),
        chain: "bitcoin".into(),
        ..Default::default()
    }
}

#[allow(dead_code)]
pub fn tagged_metadata(address: &str, tags: &[RiskTag]) -> AddressMetadata {
    AddressMetadata {
        address: address.into(),
        chain: "bitcoin".into(),
        tags: tags.iter().copied().collect::<BTreeSet<_>>(),
        ..Default::default()
    }
}
