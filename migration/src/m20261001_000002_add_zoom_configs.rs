use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One row per tenant; tenant_id NULL is the deployment-wide default.
        // client_secret holds `enc:v1:` ciphertext written by meeting_auth::credentials.
        // Rows from before encryption may still hold plaintext until their next write.
        let create_table_sql = r#"
            CREATE TABLE IF NOT EXISTS liveclass.zoom_configs (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                tenant_id VARCHAR(255),

                client_id VARCHAR(255) NOT NULL DEFAULT '',
                account_id VARCHAR(255) NOT NULL DEFAULT '',
                client_secret TEXT NOT NULL DEFAULT '',
                is_enabled BOOLEAN NOT NULL DEFAULT FALSE,
                usage_log JSONB NOT NULL DEFAULT '[]'::jsonb,
                version INTEGER NOT NULL DEFAULT 1,

                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
        "#;

        manager
            .get_connection()
            .execute_unprepared(create_table_sql)
            .await?;

        manager
            .get_connection()
            .execute_unprepared("ALTER TABLE liveclass.zoom_configs OWNER TO liveclass")
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_zoom_configs_tenant
                 ON liveclass.zoom_configs(tenant_id)
                 WHERE tenant_id IS NOT NULL",
            )
            .await?;

        // At most one default row
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_zoom_configs_default
                 ON liveclass.zoom_configs((tenant_id IS NULL))
                 WHERE tenant_id IS NULL",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS liveclass.zoom_configs")
            .await?;

        Ok(())
    }
}
