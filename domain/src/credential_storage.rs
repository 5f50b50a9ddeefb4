//! Database-backed provider credential storage.
//!
//! Implements `meeting_auth::credentials::CredentialStorage` using the `zoom_configs` table.
//! Secrets arrive here already encrypted by `meeting_auth::credentials::Store` and are written
//! as given.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::DatabaseConnection;

use entity_api::{error::EntityApiErrorKind, zoom_config};
use meeting_auth::{
    credentials::{CredentialRecord, CredentialStorage, TenantScope, UsageEntry},
    error::{storage_error, Error, StorageErrorKind},
};

use crate::{zoom_configs::Model, Id};

/// Database-backed credential storage, one `zoom_configs` row per tenant scope.
pub struct DbCredentialStorage<'db> {
    db: &'db DatabaseConnection,
}

impl<'db> DbCredentialStorage<'db> {
    pub fn new(db: &'db DatabaseConnection) -> Self {
        Self { db }
    }
}

fn storage_err(err: entity_api::error::Error) -> Error {
    let kind = match err.error_kind {
        EntityApiErrorKind::Conflict | EntityApiErrorKind::RecordNotUpdated => {
            StorageErrorKind::Conflict
        }
        _ => StorageErrorKind::Database,
    };
    storage_error(kind, &err.to_string())
}

fn to_record(model: Model) -> Result<CredentialRecord, Error> {
    let usage_log: Vec<UsageEntry> = serde_json::from_value(model.usage_log).map_err(|e| {
        storage_error(
            StorageErrorKind::Database,
            &format!("unreadable usage_log: {e}"),
        )
    })?;

    Ok(CredentialRecord {
        scope: TenantScope::from_tenant_id(model.tenant_id.as_deref()),
        client_id: model.client_id,
        account_id: model.account_id,
        client_secret: model.client_secret,
        is_enabled: model.is_enabled,
        usage_log,
        version: model.version,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

fn to_model(id: Id, record: CredentialRecord) -> Result<Model, Error> {
    let usage_log = serde_json::to_value(&record.usage_log).map_err(|e| {
        storage_error(
            StorageErrorKind::Database,
            &format!("usage_log not serializable: {e}"),
        )
    })?;

    Ok(Model {
        id,
        tenant_id: record.scope.tenant_id().map(str::to_string),
        client_id: record.client_id,
        account_id: record.account_id,
        client_secret: record.client_secret,
        is_enabled: record.is_enabled,
        usage_log,
        version: record.version,
        created_at: record.created_at.into(),
        updated_at: record.updated_at.into(),
    })
}

#[async_trait]
impl<'db> CredentialStorage for DbCredentialStorage<'db> {
    async fn get(&self, scope: &TenantScope) -> Result<Option<CredentialRecord>, Error> {
        zoom_config::find_by_tenant(self.db, scope.tenant_id())
            .await
            .map_err(storage_err)?
            .map(to_record)
            .transpose()
    }

    async fn save(
        &self,
        record: CredentialRecord,
        expected_version: Option<i32>,
    ) -> Result<CredentialRecord, Error> {
        let saved = match expected_version {
            None => {
                let model = to_model(Id::new_v4(), record)?;
                zoom_config::create(self.db, model)
                    .await
                    .map_err(storage_err)?
            }
            Some(version) => {
                let existing = zoom_config::find_by_tenant(self.db, record.scope.tenant_id())
                    .await
                    .map_err(storage_err)?
                    .ok_or_else(|| {
                        storage_error(
                            StorageErrorKind::Conflict,
                            &format!("record for {} was deleted concurrently", record.scope),
                        )
                    })?;
                let model = to_model(existing.id, record)?;
                zoom_config::update_if_version(self.db, model, version)
                    .await
                    .map_err(storage_err)?
            }
        };

        to_record(saved)
    }
}
