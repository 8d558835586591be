//! Shared application state.

use std::sync::Arc;

use folio_core::Config;
use folio_db::{DeliveryQueueRepository, DomainRepository, TenantRepository};
use folio_events::EventBus;
use folio_tenancy::{DomainResolver, LimitsEngine, ReportingService, TenantPools, TenantProvisioner};
use folio_webhook::{Dispatcher, WebhookListener};
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub pool: PgPool,
    pub tenants: TenantRepository,
    pub domains: DomainRepository,
    pub deliveries: DeliveryQueueRepository,
    pub pools: TenantPools,
    pub resolver: DomainResolver,
    pub provisioner: TenantProvisioner,
    pub limits: LimitsEngine,
    pub reporting: ReportingService,
    pub dispatcher: Dispatcher,
    pub bus: Arc<EventBus>,
}

impl AppState {
    pub fn new(config: Config, pool: PgPool) -> Self {
        let pools = TenantPools::new(config.clone());
        let dispatcher = Dispatcher::new(pool.clone(), config.webhook.clone());

        let mut bus = EventBus::new();
        bus.register(Arc::new(WebhookListener::new(dispatcher.clone())));

        Self {
            tenants: TenantRepository::new(pool.clone()),
            domains: DomainRepository::new(pool.clone()),
            deliveries: DeliveryQueueRepository::new(pool.clone()),
            resolver: DomainResolver::new(pool.clone(), config.central_domains.clone()),
            provisioner: TenantProvisioner::new(pool.clone(), config.clone(), pools.clone()),
            limits: LimitsEngine::new(),
            reporting: ReportingService::with_pools(pool.clone(), pools.clone()),
            dispatcher,
            bus: Arc::new(bus),
            pools,
            config,
            pool,
        }
    }
}
