//! Central database schema, applied idempotently at startup.

use anyhow::Result;
use sqlx::PgPool;

pub struct CentralSchema;

impl CentralSchema {
    /// Create the central tables and types if they do not exist yet.
    pub async fn ensure(pool: &PgPool) -> Result<()> {
        sqlx::raw_sql(
            "DO $$ BEGIN
               IF NOT EXISTS (SELECT 1 FROM pg_type WHERE typname = 'tenant_plan') THEN
                 CREATE TYPE tenant_plan AS ENUM
                   ('free','starter','professional','enterprise');
               END IF;
             END $$",
        )
        .execute(pool)
        .await?;

        sqlx::raw_sql(
            r#"CREATE TABLE IF NOT EXISTS tenants (
                id                    UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                name                  VARCHAR(255) NOT NULL,
                email                 VARCHAR(255) NOT NULL,
                plan                  tenant_plan NOT NULL DEFAULT 'free',
                is_active             BOOLEAN NOT NULL DEFAULT TRUE,
                trial_ends_at         TIMESTAMPTZ,
                subscription_ends_at  TIMESTAMPTZ,
                max_users             BIGINT,
                max_posts             BIGINT,
                max_storage_gb        BIGINT,
                settings              JSONB NOT NULL DEFAULT '{}',
                created_at            TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at            TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#,
        )
        .execute(pool)
        .await?;

        sqlx::raw_sql(
            r#"CREATE TABLE IF NOT EXISTS domains (
                id         UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                tenant_id  UUID NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
                hostname   VARCHAR(253) UNIQUE NOT NULL,
                is_primary BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            CREATE INDEX IF NOT EXISTS domains_tenant_idx ON domains(tenant_id)"#,
        )
        .execute(pool)
        .await?;

        sqlx::raw_sql(
            r#"CREATE TABLE IF NOT EXISTS webhook_deliveries (
                id               UUID PRIMARY KEY,
                tenant_id        UUID NOT NULL,
                webhook_id       UUID NOT NULL,
                event_type       VARCHAR(64) NOT NULL,
                payload          JSONB NOT NULL,
                attempt          INTEGER NOT NULL DEFAULT 1,
                max_attempts     INTEGER NOT NULL DEFAULT 3,
                next_attempt_at  TIMESTAMPTZ NOT NULL,
                last_error       TEXT,
                created_at       TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at       TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            CREATE INDEX IF NOT EXISTS webhook_deliveries_due_idx
              ON webhook_deliveries(next_attempt_at)"#,
        )
        .execute(pool)
        .await?;

        tracing::debug!("Central schema ensured");
        Ok(())
    }
}
