//! Dispatch: fan a domain event out to matching subscriptions.
//!
//! Dispatch only resolves subscribers and enqueues durable delivery rows;
//! it never performs network I/O. The delivery worker picks the rows up
//! asynchronously.

use async_trait::async_trait;
use folio_core::config::WebhookConfig;
use folio_core::AppError;
use folio_db::DeliveryQueueRepository;
use folio_events::{Event, EventListener};
use folio_tenancy::TenantContext;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct Dispatcher {
    queue: DeliveryQueueRepository,
    config: WebhookConfig,
}

impl Dispatcher {
    pub fn new(central: PgPool, config: WebhookConfig) -> Self {
        Self {
            queue: DeliveryQueueRepository::new(central),
            config,
        }
    }

    /// Enqueue one delivery per matching active webhook. Returns the
    /// number of deliveries enqueued.
    #[tracing::instrument(skip(self, ctx, payload), fields(tenant_id = %ctx.tenant_id()))]
    pub async fn dispatch(
        &self,
        ctx: &TenantContext,
        event_type: &str,
        payload: &JsonValue,
    ) -> Result<usize, AppError> {
        let webhooks = ctx.webhooks().find_active_by_event(event_type).await?;
        if webhooks.is_empty() {
            tracing::debug!(event_type, "No matching webhooks");
            return Ok(0);
        }

        let mut enqueued = 0;
        for webhook in &webhooks {
            let delivery_id = Uuid::new_v4();
            self.queue
                .enqueue(
                    delivery_id,
                    ctx.tenant_id(),
                    webhook.id,
                    event_type,
                    payload,
                    self.config.max_attempts,
                )
                .await?;
            tracing::debug!(
                webhook_id = %webhook.id,
                delivery_id = %delivery_id,
                event_type,
                "Enqueued webhook delivery"
            );
            enqueued += 1;
        }

        tracing::info!(event_type, count = enqueued, "Dispatched event to webhooks");
        Ok(enqueued)
    }
}

/// Bridges the event bus to the dispatcher. Registered once at startup;
/// failures are logged by the bus and never reach the emitting code.
pub struct WebhookListener {
    dispatcher: Dispatcher,
}

impl WebhookListener {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl EventListener for WebhookListener {
    fn name(&self) -> &'static str {
        "webhook-dispatcher"
    }

    async fn handle(&self, ctx: &TenantContext, event: &Event) -> Result<(), AppError> {
        self.dispatcher
            .dispatch(ctx, event.event_type.as_str(), &event.payload)
            .await?;
        Ok(())
    }
}
