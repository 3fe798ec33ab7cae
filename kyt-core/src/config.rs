//! Settings loading (spec.md §6 Configuration).
//!
//! Grounded in `da-indexer-logic/src/settings.rs`'s per-field
//! `#[serde(default = "...")]` / `serde_with::DurationSeconds` shape and in
//! `proxy-verifier-server/src/config.rs`'s `config::Config::builder` +
//! `Environment` layering.

use crate::model::RiskTag;
use serde::Deserialize;
use serde_with::serde_as;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    Memory,
    Sql,
    Remote,
}

#[serde_as]
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CacheSettings {
    #[serde(default = "default_cache_backend")]
    pub backend: CacheBackend,
    #[serde(default = "default_ttl_seconds")]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub ttl_seconds: Duration,
    /// Connection string for `sql`/`remote` backends. Unused for `memory`.
    #[serde(default)]
    pub connection_string: Option<String>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: default_cache_backend(),
            ttl_seconds: default_ttl_seconds(),
            connection_string: None,
        }
    }
}

fn default_cache_backend() -> CacheBackend {
    CacheBackend::Memory
}

fn default_ttl_seconds() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

#[serde_as]
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProviderSettings {
    pub base_url: String,
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_seconds")]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub retry_delay_seconds: Duration,
    #[serde(default = "default_timeout_seconds")]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub timeout_seconds: Duration,
    #[serde(default = "default_circuit_failure_threshold")]
    pub circuit_failure_threshold: u32,
    #[serde(default = "default_circuit_recovery_seconds")]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub circuit_recovery_seconds: Duration,
}

fn default_requests_per_second() -> u32 {
    5
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_delay_seconds() -> Duration {
    Duration::from_secs(1)
}
fn default_timeout_seconds() -> Duration {
    Duration::from_secs(30)
}
fn default_circuit_failure_threshold() -> u32 {
    5
}
fn default_circuit_recovery_seconds() -> Duration {
    Duration::from_secs(30)
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TracerSettings {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_batch_cap")]
    pub batch_cap: usize,
    #[serde(default = "default_max_addresses")]
    pub max_addresses: usize,
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
}

impl Default for TracerSettings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            batch_cap: default_batch_cap(),
            max_addresses: default_max_addresses(),
            max_depth: default_max_depth(),
        }
    }
}

fn default_concurrency() -> usize {
    5
}
fn default_batch_cap() -> usize {
    20
}
fn default_max_addresses() -> usize {
    1_000
}
fn default_max_depth() -> u32 {
    10
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScorerSettings {
    #[serde(default = "default_proximity_decay")]
    pub proximity_decay: f64,
    #[serde(default)]
    pub tag_weights: HashMap<RiskTag, f64>,
}

impl Default for ScorerSettings {
    fn default() -> Self {
        Self {
            proximity_decay: default_proximity_decay(),
            tag_weights: HashMap::new(),
        }
    }
}

fn default_proximity_decay() -> f64 {
    0.5
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub cache: CacheSettings,
    pub provider: ProviderSettings,
    #[serde(default)]
    pub tracer: TracerSettings,
    #[serde(default)]
    pub scorer: ScorerSettings,
}

impl Settings {
    /// Layers an optional config file under `KYT` environment overrides
    /// (e.g. `KYT__PROVIDER__BASE_URL`), mirroring
    /// `ChainsSettings::new`'s builder shape.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("KYT")
                .separator("__")
                .try_parsing(true),
        );
        builder.build()?.try_deserialize()
    }

    /// Builds the Tracer's config from `tracer.*`, threading `cache.ttl-seconds`
    /// through as the TTL used for the Tracer's own cache-through writes
    /// (tx/metadata lookups and the final stored report).
    pub fn tracer_config(&self) -> crate::tracer::TracerConfig {
        let mut config: crate::tracer::TracerConfig = (&self.tracer).into();
        config.cache_ttl = self.cache.ttl_seconds;
        config
    }
}

impl From<&TracerSettings> for crate::tracer::TracerConfig {
    fn from(settings: &TracerSettings) -> Self {
        Self {
            concurrency: settings.concurrency,
            batch_cap: settings.batch_cap,
            max_addresses: settings.max_addresses,
            max_depth: settings.max_depth,
            cache_ttl: crate::cache::DEFAULT_TTL,
        }
    }
}

impl From<&ScorerSettings> for crate::scorer::ScorerConfig {
    fn from(settings: &ScorerSettings) -> Self {
        let mut tag_weights = HashMap::new();
        for tag in [
            RiskTag::Mixer,
            RiskTag::Darknet,
            RiskTag::Hack,
            RiskTag::Sanctioned,
            RiskTag::Ransomware,
            RiskTag::TerroristFinancing,
            RiskTag::Scam,
            RiskTag::Gambling,
            RiskTag::Exchange,
            RiskTag::Whale,
            RiskTag::Unknown,
        ] {
            let weight = settings
                .tag_weights
                .get(&tag)
                .copied()
                .unwrap_or_else(|| tag.default_weight());
            tag_weights.insert(tag, weight);
        }
        Self {
            decay: settings.proximity_decay,
            tag_weights,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_values() {
        let tracer = TracerSettings::default();
        assert_eq!(tracer.concurrency, 5);
        assert_eq!(tracer.batch_cap, 20);
        assert_eq!(tracer.max_addresses, 1_000);
        assert_eq!(tracer.max_depth, 10);

        let scorer = ScorerSettings::default();
        assert_eq!(scorer.proximity_decay, 0.5);

        let cache = CacheSettings::default();
        assert_eq!(cache.backend, CacheBackend::Memory);
        assert_eq!(cache.ttl_seconds, Duration::from_secs(86_400));
    }

    #[test]
    fn env_override_reaches_provider_base_url() {
        std::env::set_var("KYT__PROVIDER__BASE_URL", "https://example.invalid");
        std::env::set_var("KYT__PROVIDER__MAX_RETRIES", "7");
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.provider.base_url, "https://example.invalid");
        assert_eq!(settings.provider.max_retries, 7);
        std::env::remove_var("KYT__PROVIDER__BASE_URL");
        std::env::remove_var("KYT__PROVIDER__MAX_RETRIES");
    }

    #[test]
    fn tracer_config_threads_configured_cache_ttl() {
        let mut settings = Settings {
            cache: CacheSettings::default(),
            provider: ProviderSettings {
                base_url: "https://example.invalid".into(),
                requests_per_second: default_requests_per_second(),
                max_retries: default_max_retries(),
                retry_delay_seconds: default_retry_delay_seconds(),
                timeout_seconds: default_timeout_seconds(),
                circuit_failure_threshold: default_circuit_failure_threshold(),
                circuit_recovery_seconds: default_circuit_recovery_seconds(),
            },
            tracer: TracerSettings::default(),
            scorer: ScorerSettings::default(),
        };
        settings.cache.ttl_seconds = Duration::from_secs(120);

        let tracer_config = settings.tracer_config();
        assert_eq!(tracer_config.cache_ttl, Duration::from_secs(120));
    }
}
