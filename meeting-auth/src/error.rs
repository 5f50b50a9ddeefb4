//! Error types for the `meeting-auth` crate.
//!
//! Follows the same pattern as domain::error with a root Error struct and error kind enums.

use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for meeting-auth crate.
/// Holds error kind and optional source for error chaining.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Major categories of errors in meeting-auth.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    Credential(CredentialErrorKind),
    Crypto(CryptoErrorKind),
    OAuth(OAuthErrorKind),
    Storage(StorageErrorKind),
    Http(HttpErrorKind),
}

/// Missing or unusable provider configuration. The tenant has to reconfigure;
/// retrying will not help.
#[derive(Debug, PartialEq)]
pub enum CredentialErrorKind {
    NotFound,
    Incomplete,
    Disabled,
}

/// Errors from encrypting or decrypting stored secrets.
#[derive(Debug, PartialEq)]
pub enum CryptoErrorKind {
    InvalidKey,
    EncryptionFailed,
    DecryptionFailed,
}

/// Errors from the provider token exchange.
#[derive(Debug, PartialEq)]
pub enum OAuthErrorKind {
    TokenExchangeFailed,
    Network,
    InvalidResponse,
}

/// Errors from credential storage operations.
#[derive(Debug, PartialEq)]
pub enum StorageErrorKind {
    /// Another writer changed the record between our read and our write.
    Conflict,
    Database,
}

/// Errors from HTTP client operations.
#[derive(Debug, PartialEq)]
pub enum HttpErrorKind {
    BuilderFailed,
    RequestFailed,
    Network,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::Credential(kind) => write!(f, "Credential error: {:?}", kind),
            ErrorKind::Crypto(kind) => write!(f, "Crypto error: {:?}", kind),
            ErrorKind::OAuth(kind) => write!(f, "OAuth error: {:?}", kind),
            ErrorKind::Storage(kind) => write!(f, "Storage error: {:?}", kind),
            ErrorKind::Http(kind) => write!(f, "HTTP error: {:?}", kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let error_kind = if err.is_builder() {
            ErrorKind::Http(HttpErrorKind::BuilderFailed)
        } else if err.is_request() {
            ErrorKind::Http(HttpErrorKind::RequestFailed)
        } else {
            ErrorKind::Http(HttpErrorKind::Network)
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

/// Helper function to create credential (configuration) errors.
pub fn credential_error(kind: CredentialErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Credential(kind),
    }
}

/// Helper function to create crypto errors.
///
/// Never pass secret material in `message`.
pub fn crypto_error(kind: CryptoErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Crypto(kind),
    }
}

/// Helper function to create OAuth errors.
pub fn oauth_error(kind: OAuthErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::OAuth(kind),
    }
}

/// Helper function to create storage errors.
pub fn storage_error(kind: StorageErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Storage(kind),
    }
}
