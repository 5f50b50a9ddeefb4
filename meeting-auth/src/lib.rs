//! # meeting-auth
//!
//! Credential and token lifecycle for the meeting provider integration:
//! - Per-tenant provider credentials, encrypted at rest with AES-256-GCM
//! - Server-to-server token exchange (Zoom account credentials)
//! - In-memory bearer token cache with single-flight refresh
//! - HTTP client building
//!
//! ## Architecture
//!
//! Persistence stays outside this crate: `credentials::CredentialStorage` is implemented by the
//! `domain` crate over the database, and by `credentials::MemoryStorage` in tests. The
//! `domain` crate composes a `credentials::Store` and a `oauth::token::TokenCache` into the
//! meeting provisioning client.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use meeting_auth::{
//!     credentials::{EncryptionKey, Store, TenantScope},
//!     http::ClientBuilder,
//!     oauth::{providers::zoom, token::TokenCache},
//! };
//!
//! let store = Store::new(storage, EncryptionKey::from_hex(&key_hex)?);
//! let tenant = store.resolve_credentials(&TenantScope::Default).await?;
//! let http = ClientBuilder::new().build()?;
//! let cache = TokenCache::new(zoom::Provider::new(zoom::DEFAULT_TOKEN_URL, http));
//! let bearer = cache.get_token(&tenant.credentials).await?;
//! ```

pub mod credentials;
pub mod error;
pub mod http;
pub mod oauth;

// Re-export commonly used types
pub use error::{Error, ErrorKind};
