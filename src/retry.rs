//! 401-aware retry engine.
//!
//! Threads the current access token into a caller-supplied attempt closure.
//! When an attempt is classified as unauthorized the token store refreshes
//! (or observes a refresh another caller already committed) and the attempt
//! is re-run with the new token, at most `max_refreshes` times. All other
//! failures are returned unchanged; nothing here retries 5xx or network
//! errors.

use std::future::Future;
use std::sync::Arc;

use metrics::counter;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::ApiCallError;
use crate::config::MAX_401_RETRIES;
use crate::error::{ErrorKind, Operation, ProviderError};
use crate::token_refresh::{RefreshOutcome, TokenError, TokenStore};

/// Why a wrapped call did not produce a value.
#[derive(Debug, Error)]
pub enum RetryError {
    /// Non-401 failure of an attempt, surfaced unchanged.
    #[error("{0}")]
    Api(ApiCallError),
    #[error("token refresh failed: {source}")]
    RefreshFailed {
        #[source]
        source: TokenError,
    },
    #[error("still unauthorized after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: ApiCallError },
    #[error("operation cancelled")]
    Cancelled,
}

impl RetryError {
    /// The failed attempt, when the failure came from the API.
    pub fn api_error(&self) -> Option<&ApiCallError> {
        match self {
            RetryError::Api(err) => Some(err),
            _ => None,
        }
    }

    /// True when the API answered 412 (object absent).
    pub fn is_not_found(&self) -> bool {
        self.api_error().is_some_and(ApiCallError::is_not_found)
    }

    /// Map onto the surfaced error taxonomy.
    pub fn into_provider_error(self, family: &str, operation: Operation, summary: &str) -> ProviderError {
        let kind = match self {
            RetryError::RefreshFailed { .. } => ErrorKind::AuthRefreshFailed,
            RetryError::Exhausted { .. } => ErrorKind::AuthExhausted,
            RetryError::Api(_) | RetryError::Cancelled => operation.failure_kind(),
        };
        ProviderError::new(family, operation, kind, summary, self.to_string())
    }
}

/// Shared retry engine bound to the process token store.
#[derive(Debug, Clone)]
pub struct RetryEngine {
    tokens: Arc<TokenStore>,
    max_refreshes: u32,
}

impl RetryEngine {
    pub fn new(tokens: Arc<TokenStore>) -> Self {
        Self::with_max_refreshes(tokens, MAX_401_RETRIES)
    }

    pub fn with_max_refreshes(tokens: Arc<TokenStore>, max_refreshes: u32) -> Self {
        Self {
            tokens,
            max_refreshes,
        }
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    pub fn max_refreshes(&self) -> u32 {
        self.max_refreshes
    }

    /// Run `attempt` with the current token, refreshing and retrying on 401.
    ///
    /// `attempt` receives the token by value and must not keep token state
    /// between invocations. Cancellation is checked before every attempt and
    /// also aborts an attempt or refresh that is in flight.
    pub async fn call<F, Fut, T>(
        &self,
        cancel: &CancellationToken,
        label: &str,
        mut attempt: F,
    ) -> Result<T, RetryError>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T, ApiCallError>>,
    {
        let mut refreshes: u32 = 0;
        let mut attempts: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(RetryError::Cancelled);
            }

            let snapshot = self.tokens.snapshot().await;
            attempts += 1;

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                result = attempt(snapshot.token.clone()) => result,
            };

            let err = match result {
                Ok(value) => {
                    if attempts > 1 {
                        debug!(operation = label, attempts, "call succeeded after token refresh");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_unauthorized() => err,
                Err(err) => return Err(RetryError::Api(err)),
            };

            if refreshes >= self.max_refreshes {
                warn!(operation = label, attempts, error = %err, "unauthorized retries exhausted");
                return Err(RetryError::Exhausted { attempts, last: err });
            }

            counter!("iga_api_unauthorized_retry_total", "operation" => label.to_string())
                .increment(1);
            debug!(operation = label, attempt = attempts, "unauthorized, refreshing token");

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                outcome = self.tokens.refresh_after(snapshot.generation) => outcome,
            };
            refreshes += 1;

            match outcome {
                Ok(RefreshOutcome::Refreshed { generation }) => {
                    debug!(operation = label, generation, "retrying with refreshed token");
                }
                Ok(RefreshOutcome::AlreadyRefreshed { generation }) => {
                    debug!(operation = label, generation, "token already refreshed by another call");
                }
                Err(source) => return Err(RetryError::RefreshFailed { source }),
            }
        }
    }
}
