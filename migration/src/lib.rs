pub use sea_orm_migration::prelude::*;

mod m20261001_000001_create_schema_and_base_db_setup;
mod m20261001_000002_add_zoom_configs;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_create_schema_and_base_db_setup::Migration),
            Box::new(m20261001_000002_add_zoom_configs::Migration),
        ]
    }
}
