use std::time::Duration;

/// Errors surfaced to callers of [`crate::analyze`].
///
/// Mirrors spec.md §7: only a failure to resolve the root transaction, an
/// unsupported chain, or external cancellation ever reach here. Everything
/// else (a single address failing to resolve, a cache backend going away,
/// one expansion node exhausting its retries) is absorbed inside the Tracer.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("transaction not found: {chain}:{tx_id}")]
    TxNotFound { chain: String, tx_id: String },

    #[error("invalid transaction {tx_id} on chain {chain}")]
    InvalidTransaction { chain: String, tx_id: String },

    #[error("unsupported chain: {0}")]
    UnsupportedChain(String),

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("analysis cancelled")]
    Cancelled,

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Errors a [`crate::provider::BlockchainProvider`] can produce.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("transaction not found")]
    TxNotFound,
    #[error("address not found")]
    AddressNotFound,
    #[error("unsupported chain: {0}")]
    UnsupportedChain(String),
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
}

impl ProviderError {
    /// Transient failures are retried locally by the HTTP client (spec.md §4.2);
    /// terminal failures are surfaced to the caller of the provider method.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::Timeout
                | ProviderError::Transport(_)
                | ProviderError::RateLimited { .. }
        )
    }
}

/// Errors a [`crate::cache::Cache`] backend can produce. Per spec.md §4.1 these
/// are never fatal to the Tracer: a `CacheError` on `get`/`set` degrades to a
/// miss, logged, and the walk continues.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend unreachable: {0}")]
    Unavailable(String),
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("mutex poisoned")]
    Poisoned,
}
