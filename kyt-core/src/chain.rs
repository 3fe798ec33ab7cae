//! Static chain table (spec.md §4.2 C4), carried over from
//! `original_source/app/constants.py::SUPPORTED_CHAINS` per SPEC_FULL.md's
//! supplemented-features note.

use crate::model::{ChainConfig, ChainKind};
use once_cell::sync::Lazy;
use std::collections::HashMap;

macro_rules! utxo {
    ($slug:literal, $name:literal, $symbol:literal) => {
        ChainConfig {
            slug: $slug,
            display_name: $name,
            kind: ChainKind::Utxo,
            symbol: $symbol,
            has_internal_txs: false,
            native_decimals: 8,
        }
    };
}

macro_rules! account {
    ($slug:literal, $name:literal, $symbol:literal, $internal:literal, $decimals:literal) => {
        ChainConfig {
            slug: $slug,
            display_name: $name,
            kind: ChainKind::Account,
            symbol: $symbol,
            has_internal_txs: $internal,
            native_decimals: $decimals,
        }
    };
}

static CHAINS: Lazy<HashMap<&'static str, ChainConfig>> = Lazy::new(|| {
    let entries = [
        // UTXO-based chains.
        utxo!("bitcoin", "Bitcoin", "BTC"),
        utxo!("bitcoin-cash", "Bitcoin Cash", "BCH"),
        utxo!("litecoin", "Litecoin", "LTC"),
        utxo!("dogecoin", "Dogecoin", "DOGE"),
        utxo!("dash", "Dash", "DASH"),
        utxo!("zcash", "Zcash", "ZEC"),
        utxo!("bitcoin-sv", "Bitcoin SV", "BSV"),
        utxo!("groestlcoin", "Groestlcoin", "GRS"),
        utxo!("ecash", "eCash", "XEC"),
        // EVM / account-based chains with internal transactions.
        account!("ethereum", "Ethereum", "ETH", true, 18),
        account!("binance-smart-chain", "BNB Smart Chain", "BNB", true, 18),
        account!("polygon", "Polygon", "MATIC", true, 18),
        account!("arbitrum", "Arbitrum", "ETH", true, 18),
        account!("optimism", "Optimism", "ETH", true, 18),
        account!("avalanche", "Avalanche", "AVAX", true, 18),
        account!("fantom", "Fantom", "FTM", true, 18),
        account!("gnosis", "Gnosis", "xDAI", true, 18),
        account!("base", "Base", "ETH", true, 18),
        account!("moonbeam", "Moonbeam", "GLMR", true, 18),
        account!("moonriver", "Moonriver", "MOVR", true, 18),
        account!("cronos", "Cronos", "CRO", true, 18),
        account!("aurora", "Aurora", "ETH", true, 18),
        account!("celo", "Celo", "CELO", true, 18),
        account!("klaytn", "Klaytn", "KLAY", true, 18),
        account!("harmony", "Harmony", "ONE", true, 18),
        account!("boba", "Boba", "ETH", true, 18),
        account!("metis", "Metis", "METIS", true, 18),
        account!("zksync", "zkSync Era", "ETH", true, 18),
        account!("scroll", "Scroll", "ETH", true, 18),
        account!("linea", "Linea", "ETH", true, 18),
        account!("mantle", "Mantle", "MNT", true, 18),
        account!("manta", "Manta Pacific", "ETH", true, 18),
        account!("blast", "Blast", "ETH", true, 18),
        // Non-EVM account-based chains with their own native decimal counts.
        account!("cardano", "Cardano", "ADA", false, 6),
        account!("solana", "Solana", "SOL", false, 9),
        account!("tron", "Tron", "TRX", false, 6),
        account!("ripple", "Ripple", "XRP", false, 6),
        account!("stellar", "Stellar", "XLM", false, 7),
        account!("tezos", "Tezos", "XTZ", false, 6),
        account!("cosmos", "Cosmos", "ATOM", false, 6),
        account!("polkadot", "Polkadot", "DOT", false, 10),
        account!("kusama", "Kusama", "KSM", false, 12),
    ];
    entries.into_iter().map(|c| (c.slug, c)).collect()
});

pub struct ChainRegistry;

impl ChainRegistry {
    pub fn get(slug: &str) -> Option<&'static ChainConfig> {
        CHAINS.get(slug.to_lowercase().as_str())
    }

    pub fn is_supported(slug: &str) -> bool {
        Self::get(slug).is_some()
    }

    /// Native unit decimal places for `slug`, e.g. 8 for bitcoin, 18 for
    /// ethereum. `Transaction`/`AddressMetadata` values arrive already
    /// normalized from the Provider (spec.md §3 C2); this is exposed for
    /// callers presenting raw on-chain amounts (e.g. a CLI `--raw` mode) and
    /// is not applied anywhere in the Tracer or Scorer.
    pub fn native_decimals(slug: &str) -> Option<u32> {
        Self::get(slug).map(|c| c.native_decimals)
    }

    pub fn keys() -> impl Iterator<Item = &'static str> {
        CHAINS.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitcoin_is_utxo() {
        let cfg = ChainRegistry::get("Bitcoin").unwrap();
        assert_eq!(cfg.kind, ChainKind::Utxo);
        assert_eq!(cfg.native_decimals, 8);
    }

    #[test]
    fn ethereum_has_internal_txs() {
        let cfg = ChainRegistry::get("ethereum").unwrap();
        assert_eq!(cfg.kind, ChainKind::Account);
        assert!(cfg.has_internal_txs);
        assert_eq!(cfg.native_decimals, 18);
    }

    #[test]
    fn unknown_chain_is_absent() {
        assert!(ChainRegistry::get("not-a-chain").is_none());
    }

    #[test]
    fn native_decimals_looks_up_by_slug() {
        assert_eq!(ChainRegistry::native_decimals("bitcoin"), Some(8));
        assert_eq!(ChainRegistry::native_decimals("ethereum"), Some(18));
        assert_eq!(ChainRegistry::native_decimals("not-a-chain"), None);
    }

    #[test]
    fn registry_has_around_forty_chains() {
        let count = ChainRegistry::keys().count();
        assert!((35..=45).contains(&count), "got {count}");
    }
}
