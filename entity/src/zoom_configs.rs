use crate::Id;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Meeting provider configuration, one row per tenant plus at most one deployment-wide
/// default row (`tenant_id` is NULL).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(schema_name = "liveclass", table_name = "zoom_configs")]
pub struct Model {
    #[serde(skip_deserializing)]
    #[sea_orm(primary_key)]
    pub id: Id,
    pub tenant_id: Option<String>,
    pub client_id: String,
    pub account_id: String,
    /// `enc:v1:` ciphertext, or plaintext in rows written before encryption was enabled.
    #[serde(skip_serializing)]
    pub client_secret: String,
    pub is_enabled: bool,
    #[sea_orm(column_type = "JsonBinary")]
    pub usage_log: Json,
    /// Bumped on every write; updates are conditional on the version they read.
    pub version: i32,
    #[serde(skip_deserializing)]
    pub created_at: DateTimeWithTimeZone,
    #[serde(skip_deserializing)]
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
