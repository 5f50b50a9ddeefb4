//! OAuth 2.0 account-credentials infrastructure.
//!
//! Server-to-server token acquisition for video meeting platforms: no end user is involved,
//! an account id and client id/secret are exchanged for a short-lived bearer token.

mod credentials;

pub mod providers;
pub mod token;

pub use credentials::ClientCredentials;
