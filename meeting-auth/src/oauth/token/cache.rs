//! Bearer token cache with per-credential refresh locking.

use std::sync::Arc;

use chrono::Duration;
use dashmap::DashMap;
use secrecy::SecretString;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{CachedToken, Clock, SystemClock, TokenExchange};
use crate::error::Error;
use crate::oauth::ClientCredentials;

/// Seconds subtracted from a token's expiry before it is considered stale.
pub const DEFAULT_SAFETY_MARGIN_SECS: i64 = 300;

/// Token cache that performs a token exchange only when no fresh token is cached.
///
/// Tokens are keyed by credential identity, so tenants with different credentials never share
/// a token. Refreshes are serialized per key: when several requests find the same slot stale,
/// the first one exchanges and the others wait for it and reuse its token instead of each
/// calling the token endpoint.
pub struct TokenCache<E: TokenExchange, C: Clock = SystemClock> {
    exchange: E,
    clock: C,
    safety_margin: Duration,
    slots: DashMap<String, CachedToken>,
    refresh_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl<E: TokenExchange> TokenCache<E, SystemClock> {
    /// Create a new token cache with the wall clock and the default safety margin.
    pub fn new(exchange: E) -> Self {
        Self::with_clock(exchange, SystemClock)
    }
}

impl<E: TokenExchange, C: Clock> TokenCache<E, C> {
    pub fn with_clock(exchange: E, clock: C) -> Self {
        Self {
            exchange,
            clock,
            safety_margin: Duration::seconds(DEFAULT_SAFETY_MARGIN_SECS),
            slots: DashMap::new(),
            refresh_locks: DashMap::new(),
        }
    }

    pub fn with_safety_margin(mut self, safety_margin: Duration) -> Self {
        self.safety_margin = safety_margin;
        self
    }

    /// Get a usable bearer token for `credentials`, exchanging for a new one if needed.
    ///
    /// This method:
    /// 1. Returns the cached token if it is still outside the safety margin
    /// 2. Otherwise takes the refresh lock for these credentials
    /// 3. Re-checks the slot (another request might have refreshed it)
    /// 4. Exchanges credentials for a new token and replaces the slot
    ///
    /// A failed exchange leaves the slot untouched.
    pub async fn get_token(&self, credentials: &ClientCredentials) -> Result<SecretString, Error> {
        credentials.validate()?;
        let key = credentials.cache_key();

        if let Some(token) = self.fresh_token(&key) {
            return Ok(token);
        }

        debug!(
            "No usable token for account {}, client {}, exchanging",
            credentials.account_id, credentials.client_id
        );

        let lock = self
            .refresh_locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let _guard = lock.lock().await;

        if let Some(token) = self.fresh_token(&key) {
            debug!("Token was refreshed by another request");
            return Ok(token);
        }

        let grant = self.exchange.exchange(credentials).await.inspect_err(|e| {
            warn!(
                "Token exchange failed for account {}, client {}: {}",
                credentials.account_id, credentials.client_id, e
            )
        })?;

        let cached = CachedToken::from_grant(grant, self.clock.now()).inspect_err(|e| {
            warn!(
                "Unusable token lifetime for account {}: {}",
                credentials.account_id, e
            )
        })?;
        let token = cached.value.clone();
        debug!(
            "Cached new token for account {}, expires at {}",
            credentials.account_id, cached.expires_at
        );
        self.slots.insert(key, cached);

        Ok(token)
    }

    /// Drop the cached token for `credentials`, e.g. after the provider rejected it.
    pub fn invalidate(&self, credentials: &ClientCredentials) {
        if self.slots.remove(&credentials.cache_key()).is_some() {
            debug!(
                "Invalidated cached token for account {}",
                credentials.account_id
            );
        }
    }

    fn fresh_token(&self, key: &str) -> Option<SecretString> {
        let now = self.clock.now();
        self.slots
            .get(key)
            .filter(|token| token.is_usable(now, self.safety_margin))
            .map(|token| token.value.clone())
    }
}
