//! Bearer token types.

use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;

use crate::error::{oauth_error, Error, OAuthErrorKind};

/// Result of one successful token exchange.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access_token: SecretString,
    /// Lifetime in seconds, as reported by the provider.
    pub expires_in: i64,
}

/// A bearer token held in memory. Never persisted.
#[derive(Debug, Clone)]
pub struct CachedToken {
    pub value: SecretString,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Fails with `OAuthErrorKind::InvalidResponse` when the grant's lifetime does not fit
    /// in a timestamp.
    pub fn from_grant(grant: TokenGrant, now: DateTime<Utc>) -> Result<Self, Error> {
        let expires_at = Duration::try_seconds(grant.expires_in)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                oauth_error(
                    OAuthErrorKind::InvalidResponse,
                    &format!("expires_in of {} seconds is out of range", grant.expires_in),
                )
            })?;

        Ok(Self {
            value: grant.access_token,
            expires_at,
        })
    }

    /// True while `now` is earlier than expiry minus the safety margin.
    pub fn is_usable(&self, now: DateTime<Utc>, safety_margin: Duration) -> bool {
        self.expires_at
            .checked_sub_signed(safety_margin)
            .is_some_and(|refresh_at| now < refresh_at)
    }
}
