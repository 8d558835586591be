use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use folio_core::models::Domain;
use folio_core::AppError;

/// Repository for hostname → tenant mappings.
#[derive(Clone)]
pub struct DomainRepository {
    pool: PgPool,
}

impl DomainRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a domain inside an existing transaction (provisioning path).
    pub async fn create_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant_id: Uuid,
        hostname: &str,
        is_primary: bool,
    ) -> Result<Domain, AppError> {
        let domain = sqlx::query_as::<Postgres, Domain>(
            r#"
            INSERT INTO domains (tenant_id, hostname, is_primary)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(hostname)
        .bind(is_primary)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| map_unique_violation(e, hostname))?;

        Ok(domain)
    }

    /// Add a domain to an existing tenant.
    #[tracing::instrument(skip(self), fields(db.table = "domains", db.operation = "insert"))]
    pub async fn add(&self, tenant_id: Uuid, hostname: &str) -> Result<Domain, AppError> {
        let domain = sqlx::query_as::<Postgres, Domain>(
            r#"
            INSERT INTO domains (tenant_id, hostname, is_primary)
            VALUES ($1, $2, false)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(hostname)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, hostname))?;

        Ok(domain)
    }

    #[tracing::instrument(skip(self), fields(db.table = "domains", db.operation = "select"))]
    pub async fn find_by_hostname(&self, hostname: &str) -> Result<Option<Domain>, AppError> {
        let domain =
            sqlx::query_as::<Postgres, Domain>("SELECT * FROM domains WHERE hostname = $1")
                .bind(hostname)
                .fetch_optional(&self.pool)
                .await?;

        Ok(domain)
    }

    #[tracing::instrument(skip(self), fields(db.table = "domains", db.operation = "select"))]
    pub async fn list_by_tenant(&self, tenant_id: Uuid) -> Result<Vec<Domain>, AppError> {
        let domains = sqlx::query_as::<Postgres, Domain>(
            "SELECT * FROM domains WHERE tenant_id = $1 ORDER BY is_primary DESC, created_at ASC",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(domains)
    }

    /// Delete one domain. An active tenant must retain at least one domain,
    /// so the delete runs in a transaction that counts the remainder first.
    #[tracing::instrument(skip(self), fields(db.table = "domains", db.operation = "delete", db.record_id = %id))]
    pub async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM domains WHERE tenant_id = $1 FOR UPDATE")
                .bind(tenant_id)
                .fetch_one(&mut *tx)
                .await?;

        if count <= 1 {
            tx.rollback().await.ok();
            return Err(AppError::LastDomain(tenant_id));
        }

        let result = sqlx::query("DELETE FROM domains WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await.ok();
            return Err(AppError::NotFound(format!("Domain {}", id)));
        }

        tx.commit().await.map_err(AppError::Database)?;
        Ok(())
    }

    /// Delete all domains of a tenant inside an existing transaction
    /// (destruction path; runs before the tenant row delete).
    pub async fn delete_all_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant_id: Uuid,
    ) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM domains WHERE tenant_id = $1")
            .bind(tenant_id)
            .execute(&mut **tx)
            .await?;

        Ok(result.rows_affected())
    }
}

fn map_unique_violation(err: sqlx::Error, hostname: &str) -> AppError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.code().as_deref() == Some("23505") {
            return AppError::DomainTaken(hostname.to_string());
        }
    }
    AppError::Database(err)
}
