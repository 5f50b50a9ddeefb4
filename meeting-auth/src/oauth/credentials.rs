//! Plaintext client credentials used for the account-credentials grant.

use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

use crate::error::{credential_error, CredentialErrorKind, Error};

/// Decrypted credentials for one provider account.
///
/// Only lives in memory; the secret is never logged or serialized.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub account_id: String,
    pub client_id: String,
    pub client_secret: SecretString,
}

impl ClientCredentials {
    pub fn new(account_id: &str, client_id: &str, client_secret: SecretString) -> Self {
        Self {
            account_id: account_id.to_string(),
            client_id: client_id.to_string(),
            client_secret,
        }
    }

    /// Fails with `CredentialErrorKind::Incomplete` when any field is blank.
    pub fn validate(&self) -> Result<(), Error> {
        let missing: Vec<&str> = [
            ("account_id", self.account_id.trim().is_empty()),
            ("client_id", self.client_id.trim().is_empty()),
            (
                "client_secret",
                self.client_secret.expose_secret().trim().is_empty(),
            ),
        ]
        .into_iter()
        .filter_map(|(name, blank)| blank.then_some(name))
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(credential_error(
                CredentialErrorKind::Incomplete,
                &format!("missing {}", missing.join(", ")),
            ))
        }
    }

    /// Identity of this credential set for token caching.
    ///
    /// Includes a fingerprint of the secret so a rotated secret never reuses a token minted
    /// with the previous one.
    pub fn cache_key(&self) -> String {
        let digest = Sha256::digest(self.client_secret.expose_secret().as_bytes());
        format!(
            "{}:{}:{}",
            self.account_id,
            self.client_id,
            hex::encode(&digest[..8])
        )
    }
}
