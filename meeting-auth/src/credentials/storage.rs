//! Credential storage trait for provider configuration records.

use async_trait::async_trait;

use super::{CredentialRecord, TenantScope};
use crate::error::Error;

/// Trait for persisting credential records, one per tenant scope.
///
/// Implementations store `client_secret` exactly as given; encryption happens in
/// [`super::Store`] before a record reaches storage.
///
/// Implementations must:
/// - Keep at most one record per scope (including the default scope)
/// - Reject stale writes with `StorageErrorKind::Conflict` instead of overwriting
#[async_trait]
pub trait CredentialStorage: Send + Sync {
    /// Retrieve the record for a scope.
    ///
    /// # Returns
    ///
    /// `Some(CredentialRecord)` if found, `None` if not found.
    async fn get(&self, scope: &TenantScope) -> Result<Option<CredentialRecord>, Error>;

    /// Persist a record.
    ///
    /// # Arguments
    ///
    /// * `record` - The full record to write
    /// * `expected_version` - `None` to insert a new record, `Some(v)` to replace the stored
    ///   record only while its version is still `v` (compare-and-swap)
    ///
    /// # Returns
    ///
    /// The record as persisted, with its version bumped.
    async fn save(
        &self,
        record: CredentialRecord,
        expected_version: Option<i32>,
    ) -> Result<CredentialRecord, Error>;
}
