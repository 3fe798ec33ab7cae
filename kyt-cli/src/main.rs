//! Thin binary: load settings, wire a concrete Provider/Cache pair, run one
//! `analyze()` call, print the resulting compliance report.
//!
//! Grounded in the `{{project-name}}-server` binaries' settings-load-then-run
//! shape, simplified here to a one-shot CLI since the HTTP/gRPC surface
//! itself is out of scope (spec.md §1 Out of scope).

use anyhow::Context;
use clap::Parser;
use kyt_core::cache::{Cache, MemoryCache, RemoteCache, SqlCache};
use kyt_core::config::{CacheBackend, Settings};
use kyt_core::provider::{BlockchainProvider, HttpProvider, HttpProviderConfig};
use std::path::PathBuf;
use std::sync::Arc;

/// Trace a transaction's provenance and emit a risk report.
#[derive(Debug, Parser)]
#[command(name = "kyt", version, about)]
struct Args {
    /// Chain slug, e.g. "bitcoin" or "ethereum".
    chain: String,
    /// Root transaction id to trace.
    tx_id: String,
    /// Backward trace depth (1-10).
    #[arg(default_value_t = 3)]
    depth: u32,
    /// Path to a config file layered under `KYT_*` environment overrides.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Emit the full report as JSON instead of a human summary.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let settings = Settings::load(args.config.as_deref()).context("failed to load settings")?;

    let provider: Arc<dyn BlockchainProvider> = Arc::new(
        HttpProvider::new(HttpProviderConfig {
            base_url: settings.provider.base_url.clone(),
            requests_per_second: std::num::NonZeroU32::new(settings.provider.requests_per_second)
                .context("provider.requests-per-second must be nonzero")?,
            max_retries: settings.provider.max_retries,
            timeout: settings.provider.timeout_seconds,
            circuit_failure_threshold: settings.provider.circuit_failure_threshold,
            circuit_recovery_timeout: settings.provider.circuit_recovery_seconds,
        })
        .context("failed to build HTTP provider")?,
    );

    let cache: Arc<dyn Cache> = match settings.cache.backend {
        CacheBackend::Memory => Arc::new(MemoryCache::default()),
        CacheBackend::Sql => {
            let url = settings
                .cache
                .connection_string
                .as_deref()
                .context("cache.connection-string required for the sql backend")?;
            Arc::new(
                SqlCache::connect(url)
                    .await
                    .context("failed to connect sql cache")?,
            )
        }
        CacheBackend::Remote => {
            let url = settings
                .cache
                .connection_string
                .as_deref()
                .context("cache.connection-string required for the remote backend")?;
            Arc::new(
                RemoteCache::connect(url)
                    .await
                    .context("failed to connect remote cache")?,
            )
        }
    };

    let report = kyt_core::analyze(
        provider,
        cache,
        settings.tracer_config(),
        (&settings.scorer).into(),
        &args.chain,
        &args.tx_id,
        args.depth,
    )
    .await
    .context("analysis failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    Ok(())
}

fn print_summary(report: &kyt_core::model::RiskReport) {
    println!(
        "KYT report for {} on {} (depth {})",
        report.tx_id, report.chain, report.trace_depth
    );
    println!(
        "  risk score: {} ({:?})",
        report.risk_score.score, report.risk_score.level
    );
    println!(
        "  addresses visited: {}  transactions visited: {}  provider calls: {}",
        report.total_addresses, report.total_transactions, report.api_calls_used
    );
    if report.flagged.is_empty() {
        println!("  flagged entities: none");
    } else {
        println!("  flagged entities:");
        for entity in &report.flagged {
            println!(
                "    {} (distance {}, tags {:?}, contribution {:+.1})",
                entity.address, entity.distance, entity.tags, entity.contribution
            );
        }
    }
    for reason in &report.risk_score.reasons {
        println!("  reason: {reason}");
    }
}
