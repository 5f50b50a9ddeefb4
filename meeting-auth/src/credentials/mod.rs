//! Per-tenant provider credentials, encrypted at rest.

pub mod encryption;
mod memory;
mod record;
mod storage;
mod store;

pub use encryption::{EncryptionKey, StoredSecret, ENCRYPTED_PREFIX};
pub use memory::MemoryStorage;
pub use record::{
    CredentialRecord, CredentialUpdate, DisplayRecord, TenantCredentials, TenantScope, UsageEntry,
    MASKED_SECRET,
};
pub use storage::CredentialStorage;
pub use store::{DecryptedSecret, Store};
