//! Cross-tenant usage reporting.
//!
//! The report walks every tenant database read-only and aggregates into a
//! single snapshot. A tenant whose database cannot be reached is skipped
//! and logged rather than failing the whole report.

use chrono::{DateTime, Utc};
use folio_core::models::{Tenant, TenantPlan};
use folio_core::{AppError, Config};
use serde::Serialize;
use sqlx::PgPool;

use crate::pools::TenantPools;
use folio_db::{ContentRepository, DeliveryQueueRepository, TenantRepository, WebhookLogRepository};

#[derive(Debug, Serialize)]
pub struct TenantUsage {
    pub tenant_id: uuid::Uuid,
    pub name: String,
    pub plan: TenantPlan,
    pub is_active: bool,
    pub users: i64,
    pub posts: i64,
    pub webhook_failures: i64,
    pub pending_deliveries: i64,
}

#[derive(Debug, Serialize)]
pub struct PlatformReport {
    pub generated_at: DateTime<Utc>,
    pub total_tenants: usize,
    pub active_tenants: usize,
    pub skipped_tenants: usize,
    pub tenants_by_plan: Vec<(TenantPlan, i64)>,
    pub total_users: i64,
    pub total_posts: i64,
    pub tenants: Vec<TenantUsage>,
}

#[derive(Clone)]
pub struct ReportingService {
    tenants: TenantRepository,
    deliveries: DeliveryQueueRepository,
    pools: TenantPools,
}

impl ReportingService {
    pub fn new(central: PgPool, config: Config) -> Self {
        Self {
            tenants: TenantRepository::new(central.clone()),
            deliveries: DeliveryQueueRepository::new(central),
            pools: TenantPools::new(config),
        }
    }

    pub fn with_pools(central: PgPool, pools: TenantPools) -> Self {
        Self {
            tenants: TenantRepository::new(central.clone()),
            deliveries: DeliveryQueueRepository::new(central),
            pools,
        }
    }

    /// Build a platform-wide usage snapshot across all tenants.
    #[tracing::instrument(skip(self))]
    pub async fn platform_report(&self) -> Result<PlatformReport, AppError> {
        let all = self.tenants.list().await?;
        let tenants_by_plan = self.tenants.count_by_plan().await?;

        let mut usages = Vec::with_capacity(all.len());
        let mut skipped = 0usize;
        for tenant in &all {
            match self.tenant_usage(tenant).await {
                Ok(usage) => usages.push(usage),
                Err(e) => {
                    skipped += 1;
                    tracing::warn!(
                        tenant_id = %tenant.id,
                        error = %e,
                        "Skipping unreachable tenant in report"
                    );
                }
            }
        }

        Ok(PlatformReport {
            generated_at: Utc::now(),
            total_tenants: all.len(),
            active_tenants: all.iter().filter(|t| t.is_active).count(),
            skipped_tenants: skipped,
            tenants_by_plan,
            total_users: usages.iter().map(|u| u.users).sum(),
            total_posts: usages.iter().map(|u| u.posts).sum(),
            tenants: usages,
        })
    }

    async fn tenant_usage(&self, tenant: &Tenant) -> Result<TenantUsage, AppError> {
        let pool = self.pools.get(tenant).await?;
        let content = ContentRepository::new(pool.clone());
        let logs = WebhookLogRepository::new(pool);

        Ok(TenantUsage {
            tenant_id: tenant.id,
            name: tenant.name.clone(),
            plan: tenant.plan,
            is_active: tenant.is_active,
            users: content.count_users().await?,
            posts: content.count_posts().await?,
            webhook_failures: logs.count_failures().await?,
            pending_deliveries: self.deliveries.count_pending(tenant.id).await?,
        })
    }
}
