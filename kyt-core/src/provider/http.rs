//! Rate-limited, retrying HTTP `BlockchainProvider`.
//!
//! Grounded in `libs/api-client-framework/src/async_client.rs` (typed client +
//! status-code classification), `libs/reqwest-rate-limiter` (governor-backed
//! per-host pacing middleware) and `reqwest-retry`'s `ExponentialBackoff` for
//! the bounded retry budget spec.md §4.2 requires.

use super::circuit_breaker::CircuitBreaker;
use super::tag_extractor::TagExtractor;
use super::BlockchainProvider;
use crate::error::ProviderError;
use crate::model::{AddressMetadata, InternalTx, Transaction};
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::{Request, Response, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, Middleware, Next};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Deserialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

type DirectRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

struct PacingMiddleware {
    limiter: Arc<DirectRateLimiter>,
}

#[async_trait]
impl Middleware for PacingMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut http::Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        self.limiter.until_ready().await;
        next.run(req, extensions).await
    }
}

#[derive(Debug, Clone)]
pub struct HttpProviderConfig {
    pub base_url: String,
    pub requests_per_second: NonZeroU32,
    pub max_retries: u32,
    pub timeout: Duration,
    pub circuit_failure_threshold: u32,
    pub circuit_recovery_timeout: Duration,
}

impl Default for HttpProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.example-kyt-provider.invalid".to_string(),
            requests_per_second: NonZeroU32::new(5).unwrap(),
            max_retries: 3,
            timeout: Duration::from_secs(30),
            circuit_failure_threshold: 5,
            circuit_recovery_timeout: Duration::from_secs(30),
        }
    }
}

pub struct HttpProvider {
    client: ClientWithMiddleware,
    base_url: String,
    circuit: CircuitBreaker,
}

impl HttpProvider {
    pub fn new(config: HttpProviderConfig) -> Result<Self, ProviderError> {
        let reqwest_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let limiter = Arc::new(RateLimiter::direct(Quota::per_second(
            config.requests_per_second,
        )));

        let client = ClientBuilder::new(reqwest_client)
            .with(PacingMiddleware { limiter })
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            base_url: config.base_url,
            circuit: CircuitBreaker::new(
                config.circuit_failure_threshold,
                config.circuit_recovery_timeout,
            ),
        })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, ProviderError> {
        self.circuit
            .call(|| async {
                let url = format!("{}{}", self.base_url, path);
                let response = self
                    .client
                    .get(&url)
                    .send()
                    .await
                    .map_err(classify_middleware_error)?;
                process_response(response).await
            })
            .await
    }
}

fn classify_middleware_error(err: reqwest_middleware::Error) -> ProviderError {
    match err {
        reqwest_middleware::Error::Reqwest(e) if e.is_timeout() => ProviderError::Timeout,
        reqwest_middleware::Error::Reqwest(e) => ProviderError::Transport(e.to_string()),
        reqwest_middleware::Error::Middleware(e) => ProviderError::Transport(e.to_string()),
    }
}

async fn process_response<T: for<'de> Deserialize<'de>>(
    response: Response,
) -> Result<T, ProviderError> {
    match response.status() {
        status if status.is_success() => response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string())),
        StatusCode::NOT_FOUND => Err(ProviderError::TxNotFound),
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            Err(ProviderError::RateLimited { retry_after })
        }
        status if status.is_server_error() => {
            Err(ProviderError::Transport(format!("server error: {status}")))
        }
        status => Err(ProviderError::Transport(format!(
            "unexpected status: {status}"
        ))),
    }
}

#[derive(Deserialize)]
struct AddressMetadataWire {
    address: String,
    chain: String,
    balance: f64,
    tx_count: u64,
    first_seen: Option<chrono::DateTime<chrono::Utc>>,
    last_seen: Option<chrono::DateTime<chrono::Utc>>,
    is_contract: bool,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    context: serde_json::Value,
}

#[derive(Deserialize)]
struct TxInputWire {
    address: String,
    prev_tx_id: String,
}

#[async_trait]
impl BlockchainProvider for HttpProvider {
    async fn get_tx(&self, chain: &str, tx_id: &str) -> Result<Transaction, ProviderError> {
        self.get_json(&format!("/tx/{chain}/{tx_id}")).await
    }

    async fn get_tx_inputs(
        &self,
        chain: &str,
        tx_id: &str,
    ) -> Result<Vec<super::TxInputRef>, ProviderError> {
        let wire: Vec<TxInputWire> = self
            .get_json(&format!("/tx/{chain}/{tx_id}/inputs"))
            .await?;
        Ok(wire
            .into_iter()
            .map(|w| (w.address, w.prev_tx_id))
            .collect())
    }

    async fn get_internal_txs(
        &self,
        chain: &str,
        tx_id: &str,
    ) -> Result<Vec<InternalTx>, ProviderError> {
        self.get_json(&format!("/tx/{chain}/{tx_id}/internal"))
            .await
    }

    async fn get_address_metadata(
        &self,
        chain: &str,
        address: &str,
    ) -> Result<AddressMetadata, ProviderError> {
        let wire: AddressMetadataWire = self
            .get_json(&format!("/address/{chain}/{address}"))
            .await?;
        let mut fields: Vec<&str> = wire.labels.iter().map(|s| s.as_str()).collect();
        let context_str = wire.context.to_string();
        fields.push(&context_str);
        let tags = TagExtractor::extract(fields);
        Ok(AddressMetadata {
            address: wire.address,
            chain: wire.chain,
            tags,
            labels: wire.labels,
            balance: wire.balance,
            tx_count: wire.tx_count,
            first_seen: wire.first_seen,
            last_seen: wire.last_seen,
            is_contract: wire.is_contract,
            context: wire.context,
        })
    }

    async fn is_contract(&self, chain: &str, address: &str) -> Result<bool, ProviderError> {
        Ok(self.get_address_metadata(chain, address).await?.is_contract)
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        self.get_json::<serde_json::Value>("/health").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::CircuitState;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> HttpProvider {
        HttpProvider::new(HttpProviderConfig {
            base_url: server.uri(),
            requests_per_second: NonZeroU32::new(1000).unwrap(),
            max_retries: 0,
            ..HttpProviderConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn successful_metadata_response_extracts_tags_from_labels() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/address/bitcoin/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "address": "abc",
                "chain": "bitcoin",
                "balance": 1.0,
                "tx_count": 2,
                "first_seen": null,
                "last_seen": null,
                "is_contract": false,
                "labels": ["known mixer"],
                "context": {}
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let metadata = provider
            .get_address_metadata("bitcoin", "abc")
            .await
            .unwrap();
        assert!(metadata.tags.contains(&crate::model::RiskTag::Mixer));
    }

    #[tokio::test]
    async fn not_found_status_maps_to_tx_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tx/bitcoin/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let err = provider.get_tx("bitcoin", "missing").await.unwrap_err();
        assert!(matches!(err, ProviderError::TxNotFound));
    }

    #[tokio::test]
    async fn too_many_requests_maps_to_rate_limited_with_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tx/bitcoin/busy"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let err = provider.get_tx("bitcoin", "busy").await.unwrap_err();
        match err {
            ProviderError::RateLimited { retry_after } => {
                assert_eq!(retry_after, Some(Duration::from_secs(7)));
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_error_surfaces_as_transport_and_trips_the_circuit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mut config = HttpProviderConfig {
            base_url: server.uri(),
            requests_per_second: NonZeroU32::new(1000).unwrap(),
            max_retries: 0,
            circuit_failure_threshold: 2,
            ..HttpProviderConfig::default()
        };
        config.circuit_recovery_timeout = Duration::from_secs(60);
        let provider = HttpProvider::new(config).unwrap();

        assert!(provider.health_check().await.is_err());
        assert!(provider.health_check().await.is_err());
        // third call finds the breaker open and short-circuits before the request.
        let err = provider.health_check().await.unwrap_err();
        assert!(matches!(err, ProviderError::Transport(_)));
        assert!(matches!(
            provider.circuit.state(),
            CircuitState::Open { .. }
        ));
    }
}
