//! Credential store: per-tenant provider configuration with encryption at rest.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use dashmap::DashMap;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::encryption::{self, EncryptionKey};
use super::{
    CredentialRecord, CredentialStorage, CredentialUpdate, DisplayRecord, TenantCredentials,
    TenantScope, MASKED_SECRET,
};
use crate::error::{credential_error, crypto_error, CredentialErrorKind, CryptoErrorKind, Error};
use crate::oauth::ClientCredentials;

/// Result of decrypting a stored secret.
///
/// Decryption never errors on its own; callers that need the plaintext turn
/// [`DecryptedSecret::Unreadable`] into a hard failure with [`DecryptedSecret::into_result`].
#[derive(Debug, Clone)]
pub enum DecryptedSecret {
    Plain(SecretString),
    /// Wrong key or corrupted ciphertext.
    Unreadable,
}

impl DecryptedSecret {
    pub fn is_readable(&self) -> bool {
        matches!(self, DecryptedSecret::Plain(_))
    }

    pub fn into_result(self) -> Result<SecretString, Error> {
        match self {
            DecryptedSecret::Plain(secret) => Ok(secret),
            DecryptedSecret::Unreadable => Err(crypto_error(
                CryptoErrorKind::DecryptionFailed,
                "stored client secret cannot be decrypted",
            )),
        }
    }
}

/// Credential store that encrypts secrets before they reach storage.
///
/// Read-modify-write of a record is serialized per tenant scope inside the process; across
/// processes the storage's version check rejects stale writes.
pub struct Store<S: CredentialStorage> {
    storage: S,
    key: EncryptionKey,
    write_locks: DashMap<TenantScope, Arc<Mutex<()>>>,
}

impl<S: CredentialStorage> Store<S> {
    /// Create a new store over the given storage backend.
    pub fn new(storage: S, key: EncryptionKey) -> Self {
        Self {
            storage,
            key,
            write_locks: DashMap::new(),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Look up the record for a scope. Absence is not an error.
    pub async fn get_config(&self, scope: &TenantScope) -> Result<Option<CredentialRecord>, Error> {
        self.storage.get(scope).await
    }

    /// The masked view of a scope, or the unconfigured view when no record exists.
    pub async fn get_display(&self, scope: &TenantScope) -> Result<DisplayRecord, Error> {
        Ok(match self.storage.get(scope).await? {
            Some(record) => self.mask_for_display(&record),
            None => DisplayRecord::unconfigured(scope),
        })
    }

    /// Create the record for `scope` or apply the provided fields to it.
    ///
    /// - Unset fields keep their stored value.
    /// - A secret equal to [`MASKED_SECRET`] keeps the stored secret.
    /// - An empty secret clears the stored secret.
    /// - Any other secret is encrypted before it is written, even when it already looks like
    ///   ciphertext.
    pub async fn upsert_config(
        &self,
        scope: &TenantScope,
        update: CredentialUpdate,
    ) -> Result<CredentialRecord, Error> {
        let lock = self.write_lock(scope);
        let _guard = lock.lock().await;

        let (mut record, expected_version) = match self.storage.get(scope).await? {
            Some(record) => {
                let version = record.version;
                (record, Some(version))
            }
            None => {
                debug!("Creating credential record for {}", scope);
                (CredentialRecord::new(scope.clone(), Utc::now()), None)
            }
        };

        if let Some(client_id) = update.client_id {
            record.client_id = client_id.trim().to_string();
        }
        if let Some(account_id) = update.account_id {
            record.account_id = account_id.trim().to_string();
        }
        if let Some(is_enabled) = update.is_enabled {
            record.is_enabled = is_enabled;
        }
        if let Some(secret) = update.client_secret {
            let secret = secret.expose_secret();
            if secret == MASKED_SECRET {
                debug!("Masked secret echoed back for {}, keeping stored secret", scope);
            } else if secret.is_empty() {
                record.client_secret = String::new();
            } else {
                record.client_secret = encryption::seal(secret, &self.key)?;
            }
        }

        let saved = self.persist(record, expected_version).await?;
        info!(
            "Saved credential record for {} (version {})",
            scope, saved.version
        );
        Ok(saved)
    }

    /// Encrypt a stored value with the store's key. Already encrypted values pass through.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, Error> {
        encryption::encrypt(plaintext, &self.key)
    }

    /// Decrypt a record's secret, yielding [`DecryptedSecret::Unreadable`] on failure.
    pub fn decrypt(&self, record: &CredentialRecord) -> DecryptedSecret {
        match encryption::decrypt(&record.client_secret, &self.key) {
            Ok(plaintext) => DecryptedSecret::Plain(SecretString::from(plaintext)),
            Err(e) => {
                warn!("Unable to decrypt client secret for {}: {}", record.scope, e);
                DecryptedSecret::Unreadable
            }
        }
    }

    /// Masked projection of a record for clients.
    pub fn mask_for_display(&self, record: &CredentialRecord) -> DisplayRecord {
        let has_secret = record.has_secret();
        DisplayRecord {
            tenant_id: record.scope.tenant_id().map(str::to_string),
            client_id: record.client_id.clone(),
            account_id: record.account_id.clone(),
            client_secret: if has_secret {
                MASKED_SECRET.to_string()
            } else {
                String::new()
            },
            has_secret,
            secret_readable: !has_secret || self.decrypt(record).is_readable(),
            is_enabled: record.is_enabled,
            usage_log: record.usage_log.clone(),
        }
    }

    /// Fetch and decrypt the credentials of a scope for provisioning.
    ///
    /// Fails with a credential error when nothing usable is configured and with a crypto error
    /// when the stored secret cannot be decrypted. A disabled record is rejected before its
    /// secret is touched.
    pub async fn resolve_credentials(&self, scope: &TenantScope) -> Result<TenantCredentials, Error> {
        let record = self.storage.get(scope).await?.ok_or_else(|| {
            credential_error(
                CredentialErrorKind::NotFound,
                &format!("no provider configuration for {}", scope),
            )
        })?;

        if !record.is_enabled {
            return Err(credential_error(
                CredentialErrorKind::Disabled,
                &format!("provider integration is disabled for {}", scope),
            ));
        }

        if !record.has_secret() {
            return Err(credential_error(
                CredentialErrorKind::Incomplete,
                "missing client_secret",
            ));
        }

        let client_secret = self.decrypt(&record).into_result()?;
        let credentials = ClientCredentials::new(&record.account_id, &record.client_id, client_secret);
        credentials.validate()?;

        Ok(TenantCredentials {
            scope: record.scope,
            credentials,
            is_enabled: record.is_enabled,
        })
    }

    /// Record one provisioned meeting in the scope's usage log.
    pub async fn record_usage(
        &self,
        scope: &TenantScope,
        date: NaiveDate,
        minutes: u32,
    ) -> Result<CredentialRecord, Error> {
        let lock = self.write_lock(scope);
        let _guard = lock.lock().await;

        let mut record = self.storage.get(scope).await?.ok_or_else(|| {
            credential_error(
                CredentialErrorKind::NotFound,
                &format!("no provider configuration for {}", scope),
            )
        })?;
        let expected_version = record.version;

        record.add_usage(date, minutes);

        self.persist(record, Some(expected_version)).await
    }

    /// Every write goes through here, so a legacy plaintext secret is encrypted by whichever
    /// write touches its record first.
    async fn persist(
        &self,
        mut record: CredentialRecord,
        expected_version: Option<i32>,
    ) -> Result<CredentialRecord, Error> {
        if record.has_secret() {
            record.client_secret = self.encrypt(&record.client_secret)?;
        }
        record.updated_at = Utc::now();

        self.storage.save(record, expected_version).await
    }

    fn write_lock(&self, scope: &TenantScope) -> Arc<Mutex<()>> {
        self.write_locks
            .entry(scope.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::encryption::ENCRYPTED_PREFIX;
    use crate::credentials::MemoryStorage;
    use crate::error::ErrorKind;

    const TEST_KEY: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";
    const OTHER_KEY: &str = "ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff";

    fn store() -> Store<MemoryStorage> {
        Store::new(MemoryStorage::new(), EncryptionKey::from_hex(TEST_KEY).unwrap())
    }

    fn tenant(id: &str) -> TenantScope {
        TenantScope::Tenant(id.to_string())
    }

    fn full_update() -> CredentialUpdate {
        CredentialUpdate {
            client_id: Some("a1".to_string()),
            client_secret: Some(SecretString::from("s3cr3t".to_string())),
            account_id: Some("acc1".to_string()),
            is_enabled: Some(true),
        }
    }

    fn secret_update(secret: &str) -> CredentialUpdate {
        CredentialUpdate {
            client_secret: Some(SecretString::from(secret.to_string())),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_get_config_returns_none_when_unconfigured() {
        let store = store();
        assert!(store.get_config(&tenant("A")).await.unwrap().is_none());

        let display = store.get_display(&tenant("A")).await.unwrap();
        assert_eq!(display, DisplayRecord::unconfigured(&tenant("A")));
        assert!(!display.has_secret);
    }

    #[tokio::test]
    async fn test_upsert_creates_record_with_encrypted_secret() {
        let store = store();
        let record = store.upsert_config(&tenant("A"), full_update()).await.unwrap();

        assert_eq!(record.client_id, "a1");
        assert_eq!(record.account_id, "acc1");
        assert!(record.is_enabled);
        assert_eq!(record.version, 1);
        assert!(record.client_secret.starts_with(ENCRYPTED_PREFIX));
        assert!(!record.client_secret.contains("s3cr3t"));

        let stored = store.storage().raw(&tenant("A")).await.unwrap();
        assert_eq!(stored.client_secret, record.client_secret);
    }

    #[tokio::test]
    async fn test_partial_update_keeps_unset_fields() {
        let store = store();
        let created = store.upsert_config(&tenant("A"), full_update()).await.unwrap();

        let updated = store
            .upsert_config(
                &tenant("A"),
                CredentialUpdate {
                    is_enabled: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(!updated.is_enabled);
        assert_eq!(updated.client_id, "a1");
        assert_eq!(updated.account_id, "acc1");
        assert_eq!(updated.client_secret, created.client_secret);
        assert_eq!(updated.version, 2);
    }

    #[tokio::test]
    async fn test_masked_secret_leaves_ciphertext_unchanged() {
        let store = store();
        let created = store.upsert_config(&tenant("A"), full_update()).await.unwrap();

        let updated = store
            .upsert_config(&tenant("A"), secret_update(MASKED_SECRET))
            .await
            .unwrap();

        assert_eq!(updated.client_secret, created.client_secret);
    }

    #[tokio::test]
    async fn test_new_secret_is_re_encrypted() {
        let store = store();
        let created = store.upsert_config(&tenant("A"), full_update()).await.unwrap();

        let updated = store
            .upsert_config(&tenant("A"), secret_update("rotated"))
            .await
            .unwrap();

        assert_ne!(updated.client_secret, created.client_secret);
        let secret = store.decrypt(&updated).into_result().unwrap();
        assert_eq!(secret.expose_secret(), "rotated");
    }

    #[tokio::test]
    async fn test_new_secret_with_ciphertext_prefix_is_still_encrypted() {
        let store = store();
        let record = store
            .upsert_config(
                &tenant("A"),
                CredentialUpdate {
                    client_secret: Some(SecretString::from("enc:v1:hunter2".to_string())),
                    ..full_update()
                },
            )
            .await
            .unwrap();

        assert_ne!(record.client_secret, "enc:v1:hunter2");
        let stored = store.storage().raw(&tenant("A")).await.unwrap();
        assert!(!stored.client_secret.contains("hunter2"));

        let resolved = store.resolve_credentials(&tenant("A")).await.unwrap();
        assert_eq!(
            resolved.credentials.client_secret.expose_secret(),
            "enc:v1:hunter2"
        );
    }

    #[tokio::test]
    async fn test_empty_secret_clears_stored_secret() {
        let store = store();
        store.upsert_config(&tenant("A"), full_update()).await.unwrap();

        let updated = store
            .upsert_config(&tenant("A"), secret_update(""))
            .await
            .unwrap();

        assert!(!updated.has_secret());
        assert!(!store.get_display(&tenant("A")).await.unwrap().has_secret);
    }

    #[tokio::test]
    async fn test_scopes_are_isolated() {
        let store = store();
        store.upsert_config(&tenant("A"), full_update()).await.unwrap();
        store
            .upsert_config(
                &TenantScope::Default,
                CredentialUpdate {
                    client_id: Some("platform".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let a = store.get_config(&tenant("A")).await.unwrap().unwrap();
        let default = store.get_config(&TenantScope::Default).await.unwrap().unwrap();
        assert_eq!(a.client_id, "a1");
        assert_eq!(default.client_id, "platform");
        assert!(store.get_config(&tenant("B")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mask_for_display_never_leaks_secret() {
        let store = store();
        let record = store.upsert_config(&tenant("A"), full_update()).await.unwrap();

        let display = store.mask_for_display(&record);
        let json = serde_json::to_string(&display).unwrap();

        assert!(display.has_secret);
        assert!(display.secret_readable);
        assert_eq!(display.client_secret, MASKED_SECRET);
        assert!(!json.contains("s3cr3t"));
        assert!(!json.contains(&record.client_secret));
        assert!(!json.contains(ENCRYPTED_PREFIX));
    }

    #[tokio::test]
    async fn test_legacy_plaintext_is_readable_and_encrypted_on_next_write() {
        let store = store();
        let mut legacy = CredentialRecord::new(tenant("A"), Utc::now());
        legacy.client_id = "a1".to_string();
        legacy.account_id = "acc1".to_string();
        legacy.client_secret = "legacy-secret".to_string();
        legacy.version = 1;
        store.storage().insert_raw(legacy.clone()).await;

        let secret = store.decrypt(&legacy).into_result().unwrap();
        assert_eq!(secret.expose_secret(), "legacy-secret");

        let updated = store
            .upsert_config(
                &tenant("A"),
                CredentialUpdate {
                    is_enabled: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(updated.client_secret.starts_with(ENCRYPTED_PREFIX));
        let secret = store.decrypt(&updated).into_result().unwrap();
        assert_eq!(secret.expose_secret(), "legacy-secret");
    }

    #[tokio::test]
    async fn test_wrong_key_yields_unreadable_sentinel() {
        let store = store();
        let record = store.upsert_config(&tenant("A"), full_update()).await.unwrap();

        let rekeyed = Store::new(MemoryStorage::new(), EncryptionKey::from_hex(OTHER_KEY).unwrap());
        rekeyed.storage().insert_raw(record.clone()).await;

        assert!(!rekeyed.decrypt(&record).is_readable());
        assert!(!rekeyed.mask_for_display(&record).secret_readable);

        let result = rekeyed.resolve_credentials(&tenant("A")).await;
        assert!(matches!(
            result,
            Err(Error {
                error_kind: ErrorKind::Crypto(CryptoErrorKind::DecryptionFailed),
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_resolve_credentials_decrypts_secret() {
        let store = store();
        store.upsert_config(&tenant("A"), full_update()).await.unwrap();

        let resolved = store.resolve_credentials(&tenant("A")).await.unwrap();
        assert!(resolved.is_enabled);
        assert_eq!(resolved.credentials.client_id, "a1");
        assert_eq!(resolved.credentials.account_id, "acc1");
        assert_eq!(resolved.credentials.client_secret.expose_secret(), "s3cr3t");
    }

    #[tokio::test]
    async fn test_resolve_credentials_for_unconfigured_scope_is_credential_error() {
        let result = store().resolve_credentials(&tenant("A")).await;
        assert!(matches!(
            result,
            Err(Error {
                error_kind: ErrorKind::Credential(CredentialErrorKind::NotFound),
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_resolve_credentials_without_account_id_is_incomplete() {
        let store = store();
        store
            .upsert_config(
                &tenant("A"),
                CredentialUpdate {
                    client_id: Some("a1".to_string()),
                    client_secret: Some(SecretString::from("s3cr3t".to_string())),
                    is_enabled: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let result = store.resolve_credentials(&tenant("A")).await;
        assert!(matches!(
            result,
            Err(Error {
                error_kind: ErrorKind::Credential(CredentialErrorKind::Incomplete),
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_record_usage_appends_to_log() {
        let store = store();
        store.upsert_config(&tenant("A"), full_update()).await.unwrap();
        let day = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();

        store.record_usage(&tenant("A"), day, 45).await.unwrap();
        let record = store.record_usage(&tenant("A"), day, 30).await.unwrap();

        assert_eq!(record.usage_log.len(), 1);
        assert_eq!(record.usage_log[0].meeting_count, 2);
        assert_eq!(record.usage_log[0].total_minutes, 75);
    }

    #[tokio::test]
    async fn test_record_usage_encrypts_legacy_plaintext() {
        let store = store();
        let mut legacy = CredentialRecord::new(tenant("A"), Utc::now());
        legacy.client_secret = "legacy-secret".to_string();
        legacy.version = 1;
        store.storage().insert_raw(legacy).await;

        let day = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        store.record_usage(&tenant("A"), day, 45).await.unwrap();

        let stored = store.storage().raw(&tenant("A")).await.unwrap();
        assert!(stored.client_secret.starts_with(ENCRYPTED_PREFIX));
        assert_eq!(stored.usage_log.len(), 1);
        let secret = store.decrypt(&stored).into_result().unwrap();
        assert_eq!(secret.expose_secret(), "legacy-secret");
    }

    #[tokio::test]
    async fn test_resolve_credentials_for_disabled_scope_skips_decryption() {
        let store = store();
        let record = store
            .upsert_config(
                &tenant("A"),
                CredentialUpdate {
                    is_enabled: Some(false),
                    ..full_update()
                },
            )
            .await
            .unwrap();

        let rekeyed = Store::new(MemoryStorage::new(), EncryptionKey::from_hex(OTHER_KEY).unwrap());
        rekeyed.storage().insert_raw(record).await;

        let result = rekeyed.resolve_credentials(&tenant("A")).await;
        assert!(matches!(
            result,
            Err(Error {
                error_kind: ErrorKind::Credential(CredentialErrorKind::Disabled),
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_concurrent_upserts_do_not_lose_updates() {
        let store = Arc::new(store());
        store.upsert_config(&tenant("A"), full_update()).await.unwrap();

        let client_update = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .upsert_config(
                        &tenant("A"),
                        CredentialUpdate {
                            client_id: Some("a2".to_string()),
                            ..Default::default()
                        },
                    )
                    .await
            })
        };
        let account_update = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .upsert_config(
                        &tenant("A"),
                        CredentialUpdate {
                            account_id: Some("acc2".to_string()),
                            ..Default::default()
                        },
                    )
                    .await
            })
        };

        client_update.await.unwrap().unwrap();
        account_update.await.unwrap().unwrap();

        let record = store.get_config(&tenant("A")).await.unwrap().unwrap();
        assert_eq!(record.client_id, "a2");
        assert_eq!(record.account_id, "acc2");
        assert_eq!(record.version, 3);
    }
}
