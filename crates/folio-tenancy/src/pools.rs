//! Lazy cache of per-tenant connection pools.
//!
//! Pools are created lazily (no connection is made until first use) and
//! shared across units of work; the exclusive-ownership invariant lives in
//! the database layout, not the pool cache. Destroying a tenant evicts and
//! closes its pool before the physical drop.

use std::collections::HashMap;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use folio_core::models::Tenant;
use folio_core::{AppError, Config};

use crate::context::TenantContext;

#[derive(Clone)]
pub struct TenantPools {
    config: Config,
    pools: Arc<RwLock<HashMap<Uuid, PgPool>>>,
}

impl TenantPools {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            pools: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Pool for a tenant's isolated database, creating it lazily.
    pub async fn get(&self, tenant: &Tenant) -> Result<PgPool, AppError> {
        {
            let pools = self.pools.read().await;
            if let Some(pool) = pools.get(&tenant.id) {
                return Ok(pool.clone());
            }
        }

        let url = self.config.database_url_for(&tenant.database_name());
        let pool = PgPoolOptions::new()
            .max_connections(self.config.tenant_pool_max_connections)
            .connect_lazy(&url)
            .map_err(|e| {
                AppError::Internal(format!(
                    "Failed to build pool for tenant {}: {}",
                    tenant.id, e
                ))
            })?;

        let mut pools = self.pools.write().await;
        // Another task may have raced us; keep the first pool.
        let pool = pools.entry(tenant.id).or_insert(pool).clone();
        Ok(pool)
    }

    /// Build a `TenantContext` for a tenant.
    pub async fn context_for(&self, tenant: &Tenant) -> Result<TenantContext, AppError> {
        let pool = self.get(tenant).await?;
        Ok(TenantContext::new(tenant.clone(), pool))
    }

    /// Remove and close a tenant's pool. Called before dropping the
    /// physical database so no live connections block the drop.
    pub async fn evict(&self, tenant_id: Uuid) {
        let pool = self.pools.write().await.remove(&tenant_id);
        if let Some(pool) = pool {
            pool.close().await;
            tracing::debug!(tenant_id = %tenant_id, "Evicted tenant pool");
        }
    }
}
