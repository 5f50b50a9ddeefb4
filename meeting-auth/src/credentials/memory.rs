//! In-memory credential storage, for tests and local tooling.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{CredentialRecord, CredentialStorage, TenantScope};
use crate::error::{storage_error, Error, StorageErrorKind};

#[derive(Default)]
pub struct MemoryStorage {
    records: Mutex<HashMap<TenantScope, CredentialRecord>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a record verbatim, bypassing encryption. Used to seed legacy data.
    pub async fn insert_raw(&self, record: CredentialRecord) {
        let mut records = self.records.lock().await;
        records.insert(record.scope.clone(), record);
    }

    pub async fn raw(&self, scope: &TenantScope) -> Option<CredentialRecord> {
        self.records.lock().await.get(scope).cloned()
    }
}

#[async_trait]
impl CredentialStorage for MemoryStorage {
    async fn get(&self, scope: &TenantScope) -> Result<Option<CredentialRecord>, Error> {
        Ok(self.records.lock().await.get(scope).cloned())
    }

    async fn save(
        &self,
        mut record: CredentialRecord,
        expected_version: Option<i32>,
    ) -> Result<CredentialRecord, Error> {
        let mut records = self.records.lock().await;
        let stored_version = records.get(&record.scope).map(|r| r.version);

        if stored_version != expected_version {
            return Err(storage_error(
                StorageErrorKind::Conflict,
                &format!("record for {} changed concurrently", record.scope),
            ));
        }

        record.version = expected_version.unwrap_or(0) + 1;
        records.insert(record.scope.clone(), record.clone());
        Ok(record)
    }
}
