//! # Token Store
//!
//! Process-wide holder of the session's access and refresh tokens. Every API
//! call reads the access token under a shared lock; a refresh takes the lock
//! exclusively, so concurrent 401s produce one refresh at a time. Refresh is
//! purely reactive: nothing here looks at expiry times.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};
use url::Url;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::client::ApiCallError;

/// Tokens returned by a login or refresh exchange.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct IssuedTokens {
    pub access_token: String,
    /// Absent when the server keeps the previous refresh token valid.
    pub refresh_token: Option<String>,
}

impl fmt::Debug for IssuedTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedTokens")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Errors raised while obtaining tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token endpoint itself answered 401; never retried.
    #[error("token endpoint rejected the credentials: {0}")]
    Unauthorized(String),
    #[error("token request failed: {0}")]
    Transport(ApiCallError),
    #[error("token response could not be decoded: {0}")]
    MalformedResponse(String),
    #[error("token response did not include an access token")]
    MissingAccessToken,
    #[error("no refresh token is available")]
    MissingRefreshToken,
}

impl TokenError {
    /// Whether the failure means the credentials themselves are bad.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TokenError::Unauthorized(_) | TokenError::MissingRefreshToken
        )
    }
}

/// Source of tokens: the IGA login and refresh endpoints.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn login(
        &self,
        base_url: &Url,
        username: &str,
        password: &str,
    ) -> Result<IssuedTokens, TokenError>;

    async fn refresh(&self, base_url: &Url, refresh_token: &str) -> Result<IssuedTokens, TokenError>;
}

/// `{access_token, refresh_token, base_url}` plus a generation counter that
/// advances on every committed refresh.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct TokenBundle {
    access_token: String,
    refresh_token: String,
    #[zeroize(skip)]
    base_url: Url,
    #[zeroize(skip)]
    generation: u64,
}

impl TokenBundle {
    pub fn new<A: Into<String>, R: Into<String>>(access_token: A, refresh_token: R, base_url: Url) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            base_url,
            generation: 0,
        }
    }
}

impl fmt::Debug for TokenBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenBundle")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("base_url", &self.base_url.as_str())
            .field("generation", &self.generation)
            .finish()
    }
}

/// Access token as seen by one API attempt.
#[derive(Clone)]
pub struct TokenSnapshot {
    pub token: String,
    pub generation: u64,
}

impl fmt::Debug for TokenSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSnapshot")
            .field("token", &"[REDACTED]")
            .field("generation", &self.generation)
            .finish()
    }
}

/// Result of a refresh request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// This caller performed the refresh.
    Refreshed { generation: u64 },
    /// Another caller refreshed after the token this caller saw.
    AlreadyRefreshed { generation: u64 },
}

/// Shared token holder.
pub struct TokenStore {
    bundle: RwLock<TokenBundle>,
    issuer: Arc<dyn TokenIssuer>,
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStore").finish_non_exhaustive()
    }
}

impl TokenStore {
    /// Store seeded with an existing bundle.
    pub fn new(issuer: Arc<dyn TokenIssuer>, bundle: TokenBundle) -> Self {
        Self {
            bundle: RwLock::new(bundle),
            issuer,
        }
    }

    /// Log in with username and password and seed the store with the result.
    #[instrument(skip_all, fields(base_url = %base_url))]
    pub async fn bootstrap(
        issuer: Arc<dyn TokenIssuer>,
        base_url: Url,
        username: &str,
        password: &str,
    ) -> Result<Self, TokenError> {
        let issued = issuer.login(&base_url, username, password).await?;
        info!("IGA session established");
        let bundle = TokenBundle::new(
            issued.access_token.clone(),
            issued.refresh_token.clone().unwrap_or_default(),
            base_url,
        );
        Ok(Self::new(issuer, bundle))
    }

    /// Current access token.
    pub async fn current_token(&self) -> String {
        self.bundle.read().await.access_token.clone()
    }

    /// Current access token with the generation it belongs to.
    pub async fn snapshot(&self) -> TokenSnapshot {
        let bundle = self.bundle.read().await;
        TokenSnapshot {
            token: bundle.access_token.clone(),
            generation: bundle.generation,
        }
    }

    pub async fn base_url(&self) -> Url {
        self.bundle.read().await.base_url.clone()
    }

    /// Unconditionally exchange the refresh token for a new pair.
    pub async fn refresh(&self) -> Result<(), TokenError> {
        let mut bundle = self.bundle.write().await;
        self.refresh_locked(&mut bundle).await.map(|_| ())
    }

    /// Refresh unless the token has already moved past `seen_generation`.
    ///
    /// Callers that lose the race for the write lock find the generation
    /// advanced and reuse the winner's token instead of refreshing again.
    pub async fn refresh_after(&self, seen_generation: u64) -> Result<RefreshOutcome, TokenError> {
        let mut bundle = self.bundle.write().await;
        if bundle.generation != seen_generation {
            return Ok(RefreshOutcome::AlreadyRefreshed {
                generation: bundle.generation,
            });
        }
        let generation = self.refresh_locked(&mut bundle).await?;
        Ok(RefreshOutcome::Refreshed { generation })
    }

    #[instrument(skip_all, fields(generation = bundle.generation))]
    async fn refresh_locked(&self, bundle: &mut TokenBundle) -> Result<u64, TokenError> {
        counter!("iga_token_refresh_total").increment(1);

        if bundle.refresh_token.is_empty() {
            counter!("iga_token_refresh_failure_total").increment(1);
            warn!("token refresh requested without a refresh token");
            return Err(TokenError::MissingRefreshToken);
        }

        let issued = match self
            .issuer
            .refresh(&bundle.base_url, &bundle.refresh_token)
            .await
        {
            Ok(issued) => issued,
            Err(err) => {
                counter!("iga_token_refresh_failure_total").increment(1);
                warn!(error = %err, fatal = err.is_fatal(), "token refresh failed");
                return Err(err);
            }
        };

        // Both tokens advance together; nothing is written on failure.
        bundle.access_token = issued.access_token.clone();
        if let Some(ref refresh_token) = issued.refresh_token {
            bundle.refresh_token = refresh_token.clone();
        }
        bundle.generation += 1;
        info!(generation = bundle.generation, "access token refreshed");
        Ok(bundle.generation)
    }

    #[cfg(test)]
    pub(crate) async fn refresh_token(&self) -> String {
        self.bundle.read().await.refresh_token.clone()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// In-memory issuer that hands out `A1`, `A2`, ... and tracks concurrency.
    pub struct CountingIssuer {
        pub refreshes: AtomicUsize,
        pub in_flight: AtomicUsize,
        pub max_in_flight: AtomicUsize,
        pub fail_with_401: bool,
        pub delay: Duration,
        pub seen_refresh_tokens: Mutex<Vec<String>>,
    }

    impl CountingIssuer {
        pub fn new() -> Self {
            Self {
                refreshes: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                fail_with_401: false,
                delay: Duration::from_millis(5),
                seen_refresh_tokens: Mutex::new(Vec::new()),
            }
        }

        pub fn rejecting() -> Self {
            Self {
                fail_with_401: true,
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl TokenIssuer for CountingIssuer {
        async fn login(&self, _: &Url, _: &str, _: &str) -> Result<IssuedTokens, TokenError> {
            Ok(IssuedTokens {
                access_token: "A".into(),
                refresh_token: Some("R".into()),
            })
        }

        async fn refresh(&self, _: &Url, refresh_token: &str) -> Result<IssuedTokens, TokenError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.seen_refresh_tokens
                .lock()
                .unwrap()
                .push(refresh_token.to_string());
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_with_401 {
                return Err(TokenError::Unauthorized("HTTP 401".into()));
            }
            let n = self.refreshes.fetch_add(1, Ordering::SeqCst) + 2;
            Ok(IssuedTokens {
                access_token: format!("A{n}"),
                refresh_token: Some(format!("R{n}")),
            })
        }
    }

    pub fn base_url() -> Url {
        Url::parse("https://iga.example.com/").unwrap()
    }

    pub fn seeded_store(issuer: Arc<CountingIssuer>) -> TokenStore {
        TokenStore::new(issuer, TokenBundle::new("A", "R", base_url()))
    }
}
