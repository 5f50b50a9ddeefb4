use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("CREATE SCHEMA IF NOT EXISTS liveclass;")
            .await?;

        manager
            .get_connection()
            .execute_unprepared("SET search_path TO liveclass, public;")
            .await?;

        // The application role owns everything in the schema
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                DO $$ BEGIN
                    GRANT ALL ON SCHEMA liveclass TO liveclass;

                    ALTER DEFAULT PRIVILEGES IN SCHEMA liveclass GRANT ALL ON TABLES TO liveclass;
                    ALTER DEFAULT PRIVILEGES IN SCHEMA liveclass GRANT ALL ON SEQUENCES TO liveclass;
                END $$;
            "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                DO $$ BEGIN
                    ALTER DEFAULT PRIVILEGES IN SCHEMA liveclass REVOKE ALL ON SEQUENCES FROM liveclass;
                    ALTER DEFAULT PRIVILEGES IN SCHEMA liveclass REVOKE ALL ON TABLES FROM liveclass;
                    REVOKE ALL ON SCHEMA liveclass FROM liveclass;
                END $$;
            "#,
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared("DROP SCHEMA IF EXISTS liveclass CASCADE;")
            .await?;

        Ok(())
    }
}
