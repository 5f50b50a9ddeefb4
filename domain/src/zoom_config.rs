//! Zoom configuration boundary: read and write a tenant's provider settings.
//!
//! Everything returned from here is a masked `DisplayRecord`; the client secret never leaves
//! this module in plaintext or ciphertext.

use crate::credential_storage::DbCredentialStorage;
use crate::error::Error;
use log::*;
use meeting_auth::credentials::{CredentialStorage, EncryptionKey, Store, TenantScope};
use sea_orm::DatabaseConnection;
use secrecy::ExposeSecret;
use service::config::Config;

pub use meeting_auth::credentials::{CredentialUpdate, DisplayRecord, MASKED_SECRET};

/// The configured secret encryption key.
///
/// Fails with a config error when `ENCRYPTION_KEY` is unset and with a crypto error when it
/// is not 64 hex characters.
pub fn encryption_key(config: &Config) -> Result<EncryptionKey, Error> {
    let key_hex = config
        .encryption_key()
        .ok_or_else(|| Error::config("ENCRYPTION_KEY is not set"))?;
    Ok(EncryptionKey::from_hex(key_hex.expose_secret())?)
}

/// Build the credential store over the database using the configured encryption key.
pub fn credential_store<'db>(
    db: &'db DatabaseConnection,
    config: &Config,
) -> Result<Store<DbCredentialStorage<'db>>, Error> {
    let key = encryption_key(config)?;
    Ok(Store::new(DbCredentialStorage::new(db), key))
}

/// The masked configuration of a tenant, or of the default record when `tenant_id` is blank.
pub async fn get<S: CredentialStorage>(
    store: &Store<S>,
    tenant_id: Option<&str>,
) -> Result<DisplayRecord, Error> {
    let scope = TenantScope::from_tenant_id(tenant_id);
    Ok(store.get_display(&scope).await?)
}

/// Apply a partial update to a tenant's configuration and return the masked result.
///
/// Send [`MASKED_SECRET`] (what [`get`] shows) as the secret to keep the stored one.
pub async fn put<S: CredentialStorage>(
    store: &Store<S>,
    tenant_id: Option<&str>,
    update: CredentialUpdate,
) -> Result<DisplayRecord, Error> {
    let scope = TenantScope::from_tenant_id(tenant_id);
    let record = store.upsert_config(&scope, update).await.inspect_err(|e| {
        warn!("Failed to save Zoom config for {}: {}", scope, e);
    })?;

    Ok(store.mask_for_display(&record))
}
