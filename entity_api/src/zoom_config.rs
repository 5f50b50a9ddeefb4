use super::error::{EntityApiErrorKind, Error};
use entity::zoom_configs::{ActiveModel, Column, Entity, Model};
use log::debug;
use sea_orm::{
    entity::prelude::*,
    ActiveValue::{NotSet, Set},
    DatabaseConnection,
};

/// Finds the configuration row for a tenant, or the default row when `tenant_id` is `None`.
pub async fn find_by_tenant(
    db: &DatabaseConnection,
    tenant_id: Option<&str>,
) -> Result<Option<Model>, Error> {
    let condition = match tenant_id {
        Some(tenant_id) => Column::TenantId.eq(tenant_id),
        None => Column::TenantId.is_null(),
    };

    Ok(Entity::find().filter(condition).one(db).await?)
}

/// Creates a new configuration row at version 1.
///
/// Fails with `EntityApiErrorKind::Conflict` when the tenant already has a row.
pub async fn create(db: &DatabaseConnection, model: Model) -> Result<Model, Error> {
    debug!(
        "Creating Zoom config for tenant_id: {:?}",
        model.tenant_id.as_deref()
    );

    let active_model = ActiveModel {
        tenant_id: Set(model.tenant_id),
        client_id: Set(model.client_id),
        account_id: Set(model.account_id),
        client_secret: Set(model.client_secret),
        is_enabled: Set(model.is_enabled),
        usage_log: Set(model.usage_log),
        version: Set(1),
        created_at: Set(model.created_at),
        updated_at: Set(model.updated_at),
        ..Default::default()
    };

    Ok(active_model.insert(db).await?)
}

/// Replaces the mutable columns of a row, but only while its stored version still equals
/// `expected_version`. The row's version becomes `expected_version + 1`.
///
/// Returns `EntityApiErrorKind::RecordNotUpdated` when no row matched, i.e. the row was
/// deleted or another writer updated it first.
pub async fn update_if_version(
    db: &DatabaseConnection,
    model: Model,
    expected_version: i32,
) -> Result<Model, Error> {
    debug!(
        "Updating Zoom config {} at version {expected_version}",
        model.id
    );

    let next_version = expected_version + 1;
    let active_model = ActiveModel {
        id: NotSet,
        tenant_id: NotSet,
        client_id: Set(model.client_id.clone()),
        account_id: Set(model.account_id.clone()),
        client_secret: Set(model.client_secret.clone()),
        is_enabled: Set(model.is_enabled),
        usage_log: Set(model.usage_log.clone()),
        version: Set(next_version),
        created_at: NotSet,
        updated_at: Set(model.updated_at),
    };

    let result = Entity::update_many()
        .set(active_model)
        .filter(Column::Id.eq(model.id))
        .filter(Column::Version.eq(expected_version))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error {
            source: None,
            error_kind: EntityApiErrorKind::RecordNotUpdated,
        });
    }

    Ok(Model {
        version: next_version,
        ..model
    })
}
