//! Data model shared across the Provider, Tracer and Risk Scorer.
//!
//! Grounded in `original_source/app/models/blockchain.py` and
//! `original_source/app/models/risk.py`, reshaped into Rust enums/structs per
//! spec.md §3.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainKind {
    Utxo,
    Account,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    pub slug: &'static str,
    pub display_name: &'static str,
    pub kind: ChainKind,
    pub symbol: &'static str,
    pub has_internal_txs: bool,
    pub native_decimals: u32,
}

/// Closed enumeration of externally-supplied categorical labels (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTag {
    Mixer,
    Darknet,
    Hack,
    Sanctioned,
    Ransomware,
    TerroristFinancing,
    Scam,
    Gambling,
    Exchange,
    Whale,
    Unknown,
}

impl RiskTag {
    /// Default weight table (spec.md §3). Overridable via `scorer.tag-weights`.
    pub fn default_weight(self) -> f64 {
        match self {
            RiskTag::Mixer => 1.0,
            RiskTag::Darknet => 1.0,
            RiskTag::Sanctioned => 1.0,
            RiskTag::Ransomware => 1.0,
            RiskTag::TerroristFinancing => 1.0,
            RiskTag::Hack => 0.9,
            RiskTag::Scam => 0.8,
            RiskTag::Gambling => 0.4,
            RiskTag::Exchange => -0.2,
            RiskTag::Whale => 0.0,
            RiskTag::Unknown => 0.0,
        }
    }

    /// A hit on any of these tags is sufficient evidence; deeper ancestry from
    /// that address is not explored (spec.md §3 DefinitiveTags).
    pub fn is_definitive(self) -> bool {
        matches!(
            self,
            RiskTag::Exchange
                | RiskTag::Whale
                | RiskTag::Hack
                | RiskTag::Mixer
                | RiskTag::Darknet
                | RiskTag::Sanctioned
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TxInput {
    pub address: String,
    pub value: f64,
    pub prev_tx_id: Option<String>,
    pub prev_output_index: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TxOutput {
    pub address: String,
    pub value: f64,
    pub output_index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallType {
    Call,
    Delegatecall,
    Staticcall,
    Create,
    Suicide,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InternalTx {
    pub from_address: String,
    pub to_address: String,
    pub value: f64,
    pub call_type: CallType,
    pub trace_index: u32,
}

/// Normalized transaction carrying both the UTXO and Account shapes
/// (spec.md §3 Transaction).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub tx_id: String,
    pub chain: String,
    pub kind: ChainKind,
    pub block_height: Option<u64>,
    pub block_time: Option<chrono::DateTime<chrono::Utc>>,
    pub fee: f64,
    pub size: Option<u64>,
    #[serde(default)]
    pub inputs: Vec<TxInput>,
    #[serde(default)]
    pub outputs: Vec<TxOutput>,
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub value: f64,
    pub gas_used: Option<u64>,
    pub gas_price: Option<f64>,
    pub nonce: Option<u64>,
    #[serde(default)]
    pub is_contract_call: bool,
    #[serde(default)]
    pub internals: Vec<InternalTx>,
    #[serde(default)]
    pub raw: serde_json::Value,
}

impl Transaction {
    /// `source-addresses()` from spec.md §3.
    pub fn source_addresses(&self) -> Vec<String> {
        match self.kind {
            ChainKind::Utxo => self.inputs.iter().map(|i| i.address.clone()).collect(),
            ChainKind::Account => {
                let mut addrs = Vec::new();
                if let Some(sender) = &self.sender {
                    addrs.push(sender.clone());
                }
                let mut seen: BTreeSet<String> = addrs.iter().map(|a| a.to_lowercase()).collect();
                for itx in &self.internals {
                    let key = itx.from_address.to_lowercase();
                    if seen.insert(key) {
                        addrs.push(itx.from_address.clone());
                    }
                }
                addrs
            }
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddressMetadata {
    pub address: String,
    pub chain: String,
    #[serde(default)]
    pub tags: BTreeSet<RiskTag>,
    #[serde(default)]
    pub labels: Vec<String>,
    pub balance: f64,
    pub tx_count: u64,
    pub first_seen: Option<chrono::DateTime<chrono::Utc>>,
    pub last_seen: Option<chrono::DateTime<chrono::Utc>>,
    pub is_contract: bool,
    #[serde(default)]
    pub context: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlaggedEntity {
    pub address: String,
    pub chain: String,
    pub tags: BTreeSet<RiskTag>,
    pub distance: u32,
    pub via_tx: String,
    pub contribution: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Thresholds from spec.md §3: `≤30 → LOW`, `≤70 → MEDIUM`, else `HIGH`.
    pub fn from_score(score: u32) -> Self {
        if score <= 30 {
            RiskLevel::Low
        } else if score <= 70 {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskScore {
    pub score: u32,
    pub level: RiskLevel,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskReport {
    pub tx_id: String,
    pub chain: String,
    pub analyzed_at: chrono::DateTime<chrono::Utc>,
    pub trace_depth: u32,
    pub total_addresses: usize,
    pub total_transactions: usize,
    pub risk_score: RiskScore,
    pub flagged: Vec<FlaggedEntity>,
    pub api_calls_used: u64,
}
