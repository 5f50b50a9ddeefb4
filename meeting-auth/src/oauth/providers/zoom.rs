//! Zoom server-to-server OAuth token exchange.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{oauth_error, Error, ErrorKind, OAuthErrorKind};
use crate::oauth::token::{TokenExchange, TokenGrant};
use crate::oauth::ClientCredentials;

/// Default Zoom token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://zoom.us/oauth/token";

const GRANT_TYPE: &str = "account_credentials";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Error body returned by the token endpoint, e.g.
/// `{"reason":"Invalid client_id or client_secret","error":"invalid_client"}`.
#[derive(Debug, Default, Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Zoom account-credentials token exchange.
///
/// Sends `clientId:clientSecret` as Basic auth and the account id in a form-encoded body.
pub struct Provider {
    token_url: String,
    http_client: reqwest::Client,
}

impl Provider {
    /// Create a new Zoom token exchange.
    ///
    /// # Arguments
    ///
    /// * `token_url` - Token endpoint, normally [`DEFAULT_TOKEN_URL`]
    /// * `http_client` - Client carrying timeouts; see `crate::http::ClientBuilder`
    pub fn new(token_url: &str, http_client: reqwest::Client) -> Self {
        Self {
            token_url: token_url.to_string(),
            http_client,
        }
    }
}

#[async_trait]
impl TokenExchange for Provider {
    async fn exchange(&self, credentials: &ClientCredentials) -> Result<TokenGrant, Error> {
        debug!(
            "Requesting Zoom access token for account {}",
            credentials.account_id
        );

        let response = self
            .http_client
            .post(&self.token_url)
            .basic_auth(
                &credentials.client_id,
                Some(credentials.client_secret.expose_secret()),
            )
            .form(&[
                ("grant_type", GRANT_TYPE),
                ("account_id", credentials.account_id.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                warn!("Failed to reach Zoom token endpoint: {}", e);
                Error {
                    source: Some(Box::new(e)),
                    error_kind: ErrorKind::OAuth(OAuthErrorKind::Network),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.json::<TokenErrorResponse>().await.unwrap_or_default();
            let reason = body
                .reason
                .or(body.error)
                .unwrap_or_else(|| "no reason given".to_string());
            warn!("Zoom token endpoint returned {}: {}", status, reason);
            return Err(oauth_error(
                OAuthErrorKind::TokenExchangeFailed,
                &format!("token endpoint returned {}: {}", status, reason),
            ));
        }

        let body: TokenResponse = response.json().await.map_err(|e| {
            let e = e.without_url();
            warn!("Failed to parse Zoom token response: {}", e);
            Error {
                source: Some(Box::new(e)),
                error_kind: ErrorKind::OAuth(OAuthErrorKind::InvalidResponse),
            }
        })?;

        if body.access_token.is_empty() || body.expires_in <= 0 {
            return Err(oauth_error(
                OAuthErrorKind::InvalidResponse,
                "token response missing access_token or expires_in",
            ));
        }

        Ok(TokenGrant {
            access_token: SecretString::from(body.access_token),
            expires_in: body.expires_in,
        })
    }
}
