//! Embedded migration set for tenant databases.
//!
//! Migrations are tracked per tenant database in `_folio_migrations` and
//! run in order; each carries reversal SQL for `rollback`. All entry points
//! take a `TenantContext`, so the central database can never be targeted.

use anyhow::anyhow;
use folio_core::AppError;
use sqlx::PgPool;

use crate::context::TenantContext;

pub struct Migration {
    pub name: &'static str,
    pub up: &'static str,
    pub down: &'static str,
}

/// The full tenant CMS schema, in application order.
pub fn migration_set() -> &'static [Migration] {
    MIGRATIONS
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        name: "0001_users",
        up: r#"
            CREATE TYPE user_role AS ENUM ('admin','editor','author');
            CREATE TABLE users (
                id            UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                name          VARCHAR(255) NOT NULL,
                email         VARCHAR(255) UNIQUE NOT NULL,
                role          user_role NOT NULL DEFAULT 'author',
                password_hash TEXT NOT NULL,
                created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at    TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
        "#,
        down: r#"
            DROP TABLE users;
            DROP TYPE user_role;
        "#,
    },
    Migration {
        name: "0002_taxonomy",
        up: r#"
            CREATE TABLE categories (
                id         UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                name       VARCHAR(255) NOT NULL,
                slug       VARCHAR(255) UNIQUE NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            CREATE TABLE tags (
                id         UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                name       VARCHAR(255) NOT NULL,
                slug       VARCHAR(255) UNIQUE NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
        "#,
        down: r#"
            DROP TABLE tags;
            DROP TABLE categories;
        "#,
    },
    Migration {
        name: "0003_posts",
        up: r#"
            CREATE TYPE post_status AS ENUM ('draft','published','scheduled');
            CREATE TABLE posts (
                id           UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                author_id    UUID NOT NULL REFERENCES users(id),
                title        VARCHAR(512) NOT NULL,
                slug         VARCHAR(512) UNIQUE NOT NULL,
                body         TEXT NOT NULL DEFAULT '',
                status       post_status NOT NULL DEFAULT 'draft',
                published_at TIMESTAMPTZ,
                created_at   TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at   TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            CREATE INDEX posts_status_idx ON posts(status);
            CREATE TABLE post_categories (
                post_id     UUID NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                category_id UUID NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
                PRIMARY KEY (post_id, category_id)
            );
            CREATE TABLE post_tags (
                post_id UUID NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                tag_id  UUID NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
                PRIMARY KEY (post_id, tag_id)
            );
        "#,
        down: r#"
            DROP TABLE post_tags;
            DROP TABLE post_categories;
            DROP TABLE posts;
            DROP TYPE post_status;
        "#,
    },
    Migration {
        name: "0004_comments",
        up: r#"
            CREATE TABLE comments (
                id           UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                post_id      UUID NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                author_name  VARCHAR(255) NOT NULL,
                author_email VARCHAR(255) NOT NULL,
                body         TEXT NOT NULL,
                approved     BOOLEAN NOT NULL DEFAULT FALSE,
                created_at   TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at   TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            CREATE INDEX comments_post_idx ON comments(post_id);
        "#,
        down: r#"
            DROP TABLE comments;
        "#,
    },
    Migration {
        name: "0005_webhooks",
        up: r#"
            CREATE TABLE webhooks (
                id                  UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                url                 VARCHAR(2048) NOT NULL,
                signing_secret      VARCHAR(256),
                headers             JSONB NOT NULL DEFAULT '{}',
                events              TEXT[] NOT NULL DEFAULT '{}',
                is_active           BOOLEAN NOT NULL DEFAULT TRUE,
                success_count       BIGINT NOT NULL DEFAULT 0,
                failure_count       BIGINT NOT NULL DEFAULT 0,
                deactivated_at      TIMESTAMPTZ,
                deactivation_reason TEXT,
                created_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at          TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            CREATE TABLE webhook_logs (
                id            UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                webhook_id    UUID NOT NULL,
                delivery_id   UUID NOT NULL,
                event_type    VARCHAR(64) NOT NULL,
                payload       JSONB NOT NULL,
                status_code   INTEGER,
                response_body TEXT,
                attempt       INTEGER NOT NULL,
                success       BOOLEAN NOT NULL,
                duration_ms   BIGINT NOT NULL,
                error_message TEXT,
                created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            CREATE INDEX webhook_logs_webhook_idx ON webhook_logs(webhook_id);
            CREATE INDEX webhook_logs_delivery_idx ON webhook_logs(delivery_id);
        "#,
        down: r#"
            DROP TABLE webhook_logs;
            DROP TABLE webhooks;
        "#,
    },
];

pub struct Migrator;

impl Migrator {
    async fn ensure_tracking_table(pool: &PgPool) -> Result<(), AppError> {
        sqlx::raw_sql(
            r#"CREATE TABLE IF NOT EXISTS _folio_migrations (
                name       TEXT PRIMARY KEY,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#,
        )
        .execute(pool)
        .await?;
        Ok(())
    }

    async fn applied(pool: &PgPool) -> Result<Vec<String>, AppError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM _folio_migrations ORDER BY name ASC")
                .fetch_all(pool)
                .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    /// Apply all pending migrations to the tenant database. Each migration
    /// runs inside its own transaction together with its tracking row, so a
    /// mid-set failure leaves a consistent prefix. Returns the number
    /// applied.
    #[tracing::instrument(skip(ctx), fields(tenant_id = %ctx.tenant_id()))]
    pub async fn migrate(ctx: &TenantContext) -> Result<usize, AppError> {
        let pool = ctx.pool();
        Self::ensure_tracking_table(pool).await?;
        let applied = Self::applied(pool).await?;

        let mut count = 0;
        for migration in MIGRATIONS {
            if applied.iter().any(|name| name.as_str() == migration.name) {
                continue;
            }

            let mut tx = pool.begin().await?;
            // Bind the concrete connection type so the future stays Send.
            let conn: &mut sqlx::PgConnection = &mut tx;
            sqlx::Executor::execute(&mut *conn, sqlx::raw_sql(migration.up))
                .await
                .map_err(|e| {
                    anyhow!(e).context(format!("Migration {} failed", migration.name))
                })?;
            sqlx::query("INSERT INTO _folio_migrations (name) VALUES ($1)")
                .bind(migration.name)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;

            tracing::info!(
                tenant_id = %ctx.tenant_id(),
                migration = migration.name,
                "Applied migration"
            );
            count += 1;
        }

        Ok(count)
    }

    /// Revert the last `steps` applied migrations, newest first.
    #[tracing::instrument(skip(ctx), fields(tenant_id = %ctx.tenant_id()))]
    pub async fn rollback(ctx: &TenantContext, steps: u32) -> Result<usize, AppError> {
        let pool = ctx.pool();
        Self::ensure_tracking_table(pool).await?;
        let applied = Self::applied(pool).await?;

        let mut count = 0;
        for name in applied.iter().rev().take(steps as usize) {
            let migration = MIGRATIONS
                .iter()
                .find(|m| m.name == name.as_str())
                .ok_or_else(|| {
                    AppError::Internal(format!("Unknown applied migration: {}", name))
                })?;

            let mut tx = pool.begin().await?;
            let conn: &mut sqlx::PgConnection = &mut tx;
            sqlx::Executor::execute(&mut *conn, sqlx::raw_sql(migration.down))
                .await
                .map_err(|e| {
                    anyhow!(e).context(format!("Rollback of {} failed", migration.name))
                })?;
            sqlx::query("DELETE FROM _folio_migrations WHERE name = $1")
                .bind(migration.name)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;

            tracing::info!(
                tenant_id = %ctx.tenant_id(),
                migration = migration.name,
                "Rolled back migration"
            );
            count += 1;
        }

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use folio_core::models::{Tenant, TenantPlan};
    use uuid::Uuid;

    fn lazy_context() -> TenantContext {
        static RT: std::sync::OnceLock<tokio::runtime::Runtime> = std::sync::OnceLock::new();
        let rt = RT.get_or_init(|| {
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("test runtime")
        });
        let _guard = rt.enter();
        let pool = PgPool::connect_lazy("postgres://folio@localhost/folio_test")
            .expect("lazy pool");
        let tenant = Tenant {
            id: Uuid::new_v4(),
            name: "Acme".to_string(),
            email: "ops@acme.test".to_string(),
            plan: TenantPlan::Starter,
            is_active: true,
            trial_ends_at: None,
            subscription_ends_at: None,
            max_users: None,
            max_posts: None,
            max_storage_gb: None,
            settings: serde_json::json!({}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        TenantContext::new(tenant, pool)
    }

    // Both entry points run inside spawned tasks (admin handlers, the
    // provisioner), so their futures must be Send.
    #[test]
    fn test_migrator_futures_are_send() {
        fn assert_send<T: Send>(_: T) {}
        let ctx = lazy_context();
        assert_send(Migrator::migrate(&ctx));
        assert_send(Migrator::rollback(&ctx, 1));
    }

    #[test]
    fn test_migration_names_are_unique_and_ordered() {
        let names: Vec<&str> = MIGRATIONS.iter().map(|m| m.name).collect();
        let mut sorted = names.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(names, sorted, "migration names must be unique and sorted");
    }

    #[test]
    fn test_every_migration_has_reversal() {
        for migration in MIGRATIONS {
            assert!(
                !migration.down.trim().is_empty(),
                "{} has no down SQL",
                migration.name
            );
        }
    }

    #[test]
    fn test_set_covers_the_cms_schema() {
        let all_up: String = MIGRATIONS.iter().map(|m| m.up).collect();
        for table in [
            "users",
            "categories",
            "tags",
            "posts",
            "post_categories",
            "post_tags",
            "comments",
            "webhooks",
            "webhook_logs",
        ] {
            assert!(
                all_up.contains(&format!("CREATE TABLE {}", table)),
                "missing table {}",
                table
            );
        }
    }
}
