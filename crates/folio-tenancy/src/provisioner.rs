//! Tenant provisioning and destruction with compensating rollback.
//!
//! Provisioning is a multi-step pipeline: record the tenant and its
//! primary domain in the central database, create the isolated physical
//! database, run the schema migrations, then optionally seed. A failure
//! at any step undoes the steps already completed, so a failed provision
//! never leaves a half-registered tenant behind.
//!
//! Destruction is ordered the other way and fails closed: the central
//! rows go first, and only then is the physical database dropped. If the
//! drop itself fails the tenant is already unreachable and the orphaned
//! database name is reported for manual cleanup.

use chrono::{Duration, Utc};
use folio_core::models::{database_name_for, CreateTenantRequest, Tenant};
use folio_core::{AppError, Config, DestructionError, ProvisioningError, ProvisioningPhase};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::migrations::Migrator;
use crate::pools::TenantPools;
use crate::seed;
use folio_db::{with_transaction, DomainRepository, TenantRepository};

#[derive(Clone)]
pub struct TenantProvisioner {
    central: PgPool,
    config: Config,
    pools: TenantPools,
    tenants: TenantRepository,
    domains: DomainRepository,
}

impl TenantProvisioner {
    pub fn new(central: PgPool, config: Config, pools: TenantPools) -> Self {
        Self {
            tenants: TenantRepository::new(central.clone()),
            domains: DomainRepository::new(central.clone()),
            central,
            config,
            pools,
        }
    }

    /// Provision a new tenant: central registration, physical database,
    /// migrations, optional seed. Returns the created tenant.
    #[tracing::instrument(skip(self, request), fields(tenant_name = %request.name))]
    pub async fn provision(&self, request: &CreateTenantRequest) -> Result<Tenant, AppError> {
        request.validate()?;

        let trial_ends_at = request
            .trial
            .then(|| Utc::now() + Duration::days(self.config.trial_days));

        let tenants = self.tenants.clone();
        let domains = self.domains.clone();
        let name = request.name.clone();
        let email = request.email.clone();
        let domain = request.domain.clone();
        let plan = request.plan;
        let tenant = with_transaction(&self.central, |tx| {
            Box::pin(async move {
                let tenant = tenants
                    .create_in_tx(&mut *tx, &name, &email, plan, trial_ends_at)
                    .await?;
                domains
                    .create_in_tx(&mut *tx, tenant.id, &domain, true)
                    .await?;
                Ok::<_, AppError>(tenant)
            })
        })
        .await?;

        if let Err(e) = self.create_database(tenant.id).await {
            self.compensate(tenant.id, false).await;
            return Err(ProvisioningError::new(ProvisioningPhase::DbCreate, e).into());
        }

        let ctx = match self.pools.context_for(&tenant).await {
            Ok(ctx) => ctx,
            Err(e) => {
                self.compensate(tenant.id, true).await;
                return Err(ProvisioningError::new(ProvisioningPhase::Migrate, e).into());
            }
        };

        if let Err(e) = Migrator::migrate(&ctx).await {
            self.compensate(tenant.id, true).await;
            return Err(ProvisioningError::new(ProvisioningPhase::Migrate, e).into());
        }

        if request.seed {
            if let Err(e) = seed::run(&ctx, "default").await {
                self.compensate(tenant.id, true).await;
                return Err(ProvisioningError::new(ProvisioningPhase::Seed, e).into());
            }
        }

        tracing::info!(
            tenant_id = %tenant.id,
            database = %tenant.database_name(),
            plan = %tenant.plan,
            "Provisioned tenant"
        );
        Ok(tenant)
    }

    /// Destroy a tenant: central rows first, then the physical database.
    /// A failed central delete aborts before anything is dropped; a failed
    /// drop leaves an orphaned database, reported in the error.
    #[tracing::instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn destroy(&self, tenant_id: Uuid) -> Result<(), AppError> {
        let tenant = self.tenants.get_required(tenant_id).await?;
        let database = tenant.database_name();

        let tenants = self.tenants.clone();
        let domains = self.domains.clone();
        let result = with_transaction(&self.central, |tx| {
            Box::pin(async move {
                domains.delete_all_in_tx(&mut *tx, tenant_id).await?;
                tenants.delete_in_tx(&mut *tx, tenant_id).await?;
                Ok::<_, AppError>(())
            })
        })
        .await;
        if let Err(e) = result {
            return Err(DestructionError::central_delete(e).into());
        }

        self.pools.evict(tenant_id).await;

        if let Err(e) = self.drop_database(&database).await {
            tracing::error!(
                tenant_id = %tenant_id,
                database = %database,
                error = %e,
                "Tenant database drop failed, database is orphaned"
            );
            return Err(DestructionError::db_drop(database, e).into());
        }

        tracing::info!(tenant_id = %tenant_id, database = %database, "Destroyed tenant");
        Ok(())
    }

    async fn create_database(&self, tenant_id: Uuid) -> Result<(), AppError> {
        // Identifier is derived from the UUID, never from user input.
        let database = database_name_for(tenant_id);
        sqlx::raw_sql(&format!(r#"CREATE DATABASE "{}""#, database))
            .execute(&self.central)
            .await?;
        Ok(())
    }

    async fn drop_database(&self, database: &str) -> Result<(), AppError> {
        sqlx::raw_sql(&format!(
            r#"DROP DATABASE IF EXISTS "{}" WITH (FORCE)"#,
            database
        ))
        .execute(&self.central)
        .await?;
        Ok(())
    }

    /// Undo a partially completed provision. Best effort: failures here
    /// are logged, the original provisioning error is what surfaces.
    async fn compensate(&self, tenant_id: Uuid, drop_db: bool) {
        if drop_db {
            let database = database_name_for(tenant_id);
            if let Err(e) = self.drop_database(&database).await {
                tracing::error!(
                    tenant_id = %tenant_id,
                    database = %database,
                    error = %e,
                    "Compensation failed to drop tenant database"
                );
            }
        }

        let tenants = self.tenants.clone();
        let domains = self.domains.clone();
        let result = with_transaction(&self.central, |tx| {
            Box::pin(async move {
                domains.delete_all_in_tx(&mut *tx, tenant_id).await?;
                tenants.delete_in_tx(&mut *tx, tenant_id).await?;
                Ok::<_, AppError>(())
            })
        })
        .await;
        if let Err(e) = result {
            tracing::error!(
                tenant_id = %tenant_id,
                error = %e,
                "Compensation failed to remove central rows"
            );
        } else {
            tracing::warn!(tenant_id = %tenant_id, "Rolled back partial provision");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_provisioner() -> TenantProvisioner {
        let config = Config {
            central_database_url: "postgres://folio@localhost/folio_central".to_string(),
            db_max_connections: 5,
            tenant_pool_max_connections: 2,
            central_domains: vec!["localhost".to_string()],
            server_port: 8080,
            environment: "test".to_string(),
            trial_days: 14,
            backup_dir: "./backups".to_string(),
            webhook: folio_core::config::WebhookConfig::default(),
        };
        // connect_lazy builds a pool without touching the network.
        let central = PgPool::connect_lazy(&config.central_database_url).expect("lazy pool");
        let pools = TenantPools::new(config.clone());
        TenantProvisioner::new(central, config, pools)
    }

    #[tokio::test]
    async fn test_provision_rejects_invalid_request_before_any_write() {
        let provisioner = test_provisioner();
        let request = CreateTenantRequest {
            name: String::new(),
            email: "not-an-email".to_string(),
            domain: "acme.test".to_string(),
            plan: folio_core::models::TenantPlan::Free,
            trial: false,
            seed: false,
        };

        // Validation fails before the central pool is ever touched, so the
        // lazy pool never attempts a connection.
        match provisioner.provision(&request).await {
            Err(AppError::InvalidInput(message)) => {
                assert!(message.contains("email") || message.contains("Name"));
            }
            Err(other) => panic!("expected InvalidInput, got {other:?}"),
            Ok(_) => panic!("invalid request must not provision"),
        }
    }
}
