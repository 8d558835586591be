use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use folio_core::models::{Tenant, TenantPlan};
use folio_core::AppError;

/// Repository for tenant identity records in the central database.
#[derive(Clone)]
pub struct TenantRepository {
    pool: PgPool,
}

impl TenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert a tenant row inside an existing transaction. Provisioning
    /// creates the tenant and its first domain atomically.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        name: &str,
        email: &str,
        plan: TenantPlan,
        trial_ends_at: Option<DateTime<Utc>>,
    ) -> Result<Tenant, AppError> {
        let tenant = sqlx::query_as::<Postgres, Tenant>(
            r#"
            INSERT INTO tenants (name, email, plan, is_active, trial_ends_at)
            VALUES ($1, $2, $3, true, $4)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(plan)
        .bind(trial_ends_at)
        .fetch_one(&mut **tx)
        .await?;

        Ok(tenant)
    }

    #[tracing::instrument(skip(self), fields(db.table = "tenants", db.operation = "select", db.record_id = %id))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Tenant>, AppError> {
        let tenant = sqlx::query_as::<Postgres, Tenant>("SELECT * FROM tenants WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(tenant)
    }

    pub async fn get_required(&self, id: Uuid) -> Result<Tenant, AppError> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| AppError::TenantNotFound(id.to_string()))
    }

    #[tracing::instrument(skip(self), fields(db.table = "tenants", db.operation = "select"))]
    pub async fn list(&self) -> Result<Vec<Tenant>, AppError> {
        let tenants =
            sqlx::query_as::<Postgres, Tenant>("SELECT * FROM tenants ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?;

        Ok(tenants)
    }

    #[tracing::instrument(skip(self), fields(db.table = "tenants", db.operation = "update", db.record_id = %id))]
    pub async fn update_plan(&self, id: Uuid, plan: TenantPlan) -> Result<Tenant, AppError> {
        let tenant = sqlx::query_as::<Postgres, Tenant>(
            r#"
            UPDATE tenants
            SET plan = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(plan)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::TenantNotFound(id.to_string()))?;

        tracing::info!(tenant_id = %id, plan = %tenant.plan, "Updated tenant plan");
        Ok(tenant)
    }

    /// Toggle the active flag (suspend / reactivate).
    #[tracing::instrument(skip(self), fields(db.table = "tenants", db.operation = "update", db.record_id = %id))]
    pub async fn set_active(&self, id: Uuid, is_active: bool) -> Result<Tenant, AppError> {
        let tenant = sqlx::query_as::<Postgres, Tenant>(
            r#"
            UPDATE tenants
            SET is_active = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::TenantNotFound(id.to_string()))?;

        tracing::info!(tenant_id = %id, is_active, "Updated tenant active flag");
        Ok(tenant)
    }

    /// Per-tenant override limits. `Some(-1)` means unlimited, `None` clears
    /// the override back to the plan default.
    #[tracing::instrument(skip(self), fields(db.table = "tenants", db.operation = "update", db.record_id = %id))]
    pub async fn set_limit_overrides(
        &self,
        id: Uuid,
        max_users: Option<i64>,
        max_posts: Option<i64>,
        max_storage_gb: Option<i64>,
    ) -> Result<Tenant, AppError> {
        let tenant = sqlx::query_as::<Postgres, Tenant>(
            r#"
            UPDATE tenants
            SET max_users = $2, max_posts = $3, max_storage_gb = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(max_users)
        .bind(max_posts)
        .bind(max_storage_gb)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::TenantNotFound(id.to_string()))?;

        Ok(tenant)
    }

    /// Delete the tenant row inside an existing transaction. Destruction
    /// removes domains and the tenant atomically before any physical drop.
    pub async fn delete_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM tenants WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Tenant counts grouped by plan, for the central report.
    #[tracing::instrument(skip(self), fields(db.table = "tenants", db.operation = "select"))]
    pub async fn count_by_plan(&self) -> Result<Vec<(TenantPlan, i64)>, AppError> {
        let rows = sqlx::query_as::<Postgres, (TenantPlan, i64)>(
            "SELECT plan, COUNT(*) FROM tenants GROUP BY plan ORDER BY plan",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
