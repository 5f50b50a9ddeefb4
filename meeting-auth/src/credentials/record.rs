//! Credential record types and their externally visible projection.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::oauth::ClientCredentials;

/// Placeholder shown instead of a configured secret.
///
/// Also the value a client echoes back when it did not change the secret; the store treats an
/// incoming secret equal to this constant as "leave the stored secret alone".
pub const MASKED_SECRET: &str = "********";

/// Which record a configuration call addresses: one tenant's, or the platform-wide default.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TenantScope {
    Default,
    Tenant(String),
}

impl TenantScope {
    /// Blank tenant ids address the default record.
    pub fn from_tenant_id(tenant_id: Option<&str>) -> Self {
        match tenant_id.map(str::trim) {
            Some(id) if !id.is_empty() => TenantScope::Tenant(id.to_string()),
            _ => TenantScope::Default,
        }
    }

    pub fn tenant_id(&self) -> Option<&str> {
        match self {
            TenantScope::Default => None,
            TenantScope::Tenant(id) => Some(id),
        }
    }
}

impl fmt::Display for TenantScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TenantScope::Default => write!(f, "default"),
            TenantScope::Tenant(id) => write!(f, "tenant {}", id),
        }
    }
}

/// One day of meeting usage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageEntry {
    pub date: NaiveDate,
    pub meeting_count: u32,
    pub total_minutes: u32,
}

/// Persisted provider configuration for one tenant scope.
#[derive(Clone, PartialEq)]
pub struct CredentialRecord {
    pub scope: TenantScope,
    pub client_id: String,
    pub account_id: String,
    /// Ciphertext as written by `encryption::encrypt`, legacy plaintext, or empty.
    pub client_secret: String,
    pub is_enabled: bool,
    pub usage_log: Vec<UsageEntry>,
    /// Bumped by storage on every write. 0 means never persisted.
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CredentialRecord {
    /// An empty, not yet persisted record.
    pub fn new(scope: TenantScope, now: DateTime<Utc>) -> Self {
        Self {
            scope,
            client_id: String::new(),
            account_id: String::new(),
            client_secret: String::new(),
            is_enabled: false,
            usage_log: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_secret(&self) -> bool {
        !self.client_secret.is_empty()
    }

    /// Adds one meeting to the usage log.
    ///
    /// Entries stay in date order: the newest entry accumulates when it is for `date`,
    /// otherwise a new entry is appended.
    pub fn add_usage(&mut self, date: NaiveDate, minutes: u32) {
        match self.usage_log.last_mut() {
            Some(last) if last.date == date => {
                last.meeting_count += 1;
                last.total_minutes += minutes;
            }
            _ => self.usage_log.push(UsageEntry {
                date,
                meeting_count: 1,
                total_minutes: minutes,
            }),
        }
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("scope", &self.scope)
            .field("client_id", &self.client_id)
            .field("account_id", &self.account_id)
            .field("has_secret", &self.has_secret())
            .field("is_enabled", &self.is_enabled)
            .field("usage_log", &self.usage_log)
            .field("version", &self.version)
            .finish()
    }
}

/// Partial update of a record. `None` fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialUpdate {
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    pub account_id: Option<String>,
    pub is_enabled: Option<bool>,
}

/// A record as shown to clients. Never contains plaintext or ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayRecord {
    pub tenant_id: Option<String>,
    pub client_id: String,
    pub account_id: String,
    /// [`MASKED_SECRET`] when a secret is configured, empty otherwise.
    pub client_secret: String,
    pub has_secret: bool,
    /// False when the stored secret cannot be decrypted with the current key.
    pub secret_readable: bool,
    pub is_enabled: bool,
    pub usage_log: Vec<UsageEntry>,
}

impl DisplayRecord {
    /// The "not configured yet" view of a scope.
    pub fn unconfigured(scope: &TenantScope) -> Self {
        Self {
            tenant_id: scope.tenant_id().map(str::to_string),
            client_id: String::new(),
            account_id: String::new(),
            client_secret: String::new(),
            has_secret: false,
            secret_readable: true,
            is_enabled: false,
            usage_log: Vec::new(),
        }
    }
}

/// Decrypted credentials of one tenant plus its enablement gate.
#[derive(Debug, Clone)]
pub struct TenantCredentials {
    pub scope: TenantScope,
    pub credentials: ClientCredentials,
    pub is_enabled: bool,
}
