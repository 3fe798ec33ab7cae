//! Three-state circuit breaker wrapping provider calls (spec.md §4.2, §9).
//!
//! spec.md §9 calls for "a tagged-variant concrete backend... Circuit-breaker
//! state is a tagged variant `{Closed(n), Open(until), HalfOpen}` rather than
//! a string" — implemented here as `CircuitState` guarded by a single mutex,
//! the same "one struct, one mutex" idiom used for `TraceState`.

use crate::error::ProviderError;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed { consecutive_failures: u32 },
    Open { until: Instant },
    HalfOpen,
}

pub struct CircuitBreaker {
    state: Mutex<CircuitState>,
    failure_threshold: u32,
    recovery_timeout: Duration,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(CircuitState::Closed {
                consecutive_failures: 0,
            }),
            failure_threshold,
            recovery_timeout,
        }
    }

    pub fn state(&self) -> CircuitState {
        *self.state.lock().expect("circuit breaker mutex poisoned")
    }

    /// Runs `call` if the breaker allows it, recording the outcome. Short-circuits
    /// with [`ProviderError::Transport`] while `Open` and the recovery timeout
    /// has not elapsed.
    pub async fn call<F, Fut, T>(&self, call: F) -> Result<T, ProviderError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, ProviderError>>,
    {
        if !self.allow() {
            return Err(ProviderError::Transport("circuit breaker open".to_string()));
        }
        match call().await {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(err) => {
                self.on_failure();
                Err(err)
            }
        }
    }

    fn allow(&self) -> bool {
        let mut state = self.state.lock().expect("circuit breaker mutex poisoned");
        match *state {
            CircuitState::Closed { .. } => true,
            CircuitState::HalfOpen => true,
            CircuitState::Open { until } => {
                if Instant::now() >= until {
                    *state = CircuitState::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    fn on_success(&self) {
        let mut state = self.state.lock().expect("circuit breaker mutex poisoned");
        *state = CircuitState::Closed {
            consecutive_failures: 0,
        };
    }

    fn on_failure(&self) {
        let mut state = self.state.lock().expect("circuit breaker mutex poisoned");
        *state = match *state {
            CircuitState::Closed {
                consecutive_failures,
            } => {
                let failures = consecutive_failures + 1;
                if failures >= self.failure_threshold {
                    CircuitState::Open {
                        until: Instant::now() + self.recovery_timeout,
                    }
                } else {
                    CircuitState::Closed {
                        consecutive_failures: failures,
                    }
                }
            }
            CircuitState::HalfOpen => CircuitState::Open {
                until: Instant::now() + self.recovery_timeout,
            },
            CircuitState::Open { until } => CircuitState::Open { until },
        };
    }
}
