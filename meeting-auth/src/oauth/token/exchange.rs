//! Token exchange and clock seams of the token cache.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::TokenGrant;
use crate::error::Error;
use crate::oauth::ClientCredentials;

/// Trait for obtaining a fresh bearer token from a provider.
///
/// Implementations must not cache; caching is the job of [`super::TokenCache`].
#[async_trait]
pub trait TokenExchange: Send + Sync {
    /// Exchange client credentials for a token.
    ///
    /// Errors are `ErrorKind::OAuth`: the provider could not be reached, rejected the
    /// credentials, or answered with something that is not a token.
    async fn exchange(&self, credentials: &ClientCredentials) -> Result<TokenGrant, Error>;
}

/// Source of the current time for expiry checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
