//! Domain layer: connects the `meeting-auth` credential and token lifecycle to the database
//! and to the Zoom REST API.

// Re-exports from `entity` crate via `entity_api`
pub use entity_api::{zoom_configs, Id};

pub mod credential_storage;
pub mod error;
pub mod live_class;
pub mod zoom_config;

pub mod gateway;
