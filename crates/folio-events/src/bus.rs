//! Listener registry and fan-out.
//!
//! Emitting an event hands it to every registered listener in turn. A
//! listener failure is logged and the remaining listeners still run; the
//! business operation that raised the event never sees the error.

use std::sync::Arc;

use async_trait::async_trait;
use folio_core::AppError;
use folio_tenancy::TenantContext;

use crate::event::Event;

#[async_trait]
pub trait EventListener: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, ctx: &TenantContext, event: &Event) -> Result<(), AppError>;
}

#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Vec<Arc<dyn EventListener>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, listener: Arc<dyn EventListener>) {
        tracing::debug!(listener = listener.name(), "Registered event listener");
        self.listeners.push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Fan the event out to all listeners within the given tenant context.
    #[tracing::instrument(skip(self, ctx, event), fields(tenant_id = %ctx.tenant_id(), event_type = %event.event_type))]
    pub async fn emit(&self, ctx: &TenantContext, event: &Event) {
        for listener in &self.listeners {
            if let Err(e) = listener.handle(ctx, event).await {
                tracing::error!(
                    listener = listener.name(),
                    event_type = %event.event_type,
                    error = %e,
                    "Event listener failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventType;
    use chrono::Utc;
    use folio_core::models::{Tenant, TenantPlan};
    use sqlx::PgPool;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    fn test_context() -> TenantContext {
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
        // connect_lazy builds a pool without touching the network.
        let pool = PgPool::connect_lazy("postgres://folio@localhost/folio_test")
            .expect("lazy pool");
        TenantContext::new(tenant, pool)
    }

    struct Recording(AtomicUsize);

    #[async_trait]
    impl EventListener for Recording {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn handle(&self, _ctx: &TenantContext, _event: &Event) -> Result<(), AppError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl EventListener for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn handle(&self, _ctx: &TenantContext, _event: &Event) -> Result<(), AppError> {
            Err(AppError::Internal("listener exploded".to_string()))
        }
    }

    #[tokio::test]
    async fn test_emit_reaches_every_listener() {
        let recorder = Arc::new(Recording(AtomicUsize::new(0)));
        let mut bus = EventBus::new();
        bus.register(recorder.clone());
        bus.register(recorder.clone());

        let ctx = test_context();
        let event = Event::new(EventType::PostPublished, serde_json::json!({"post": {}}));
        bus.emit(&ctx, &event).await;

        assert_eq!(recorder.0.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_listener_failure_does_not_stop_fanout() {
        let recorder = Arc::new(Recording(AtomicUsize::new(0)));
        let mut bus = EventBus::new();
        bus.register(Arc::new(Failing));
        bus.register(recorder.clone());

        let ctx = test_context();
        let event = Event::new(EventType::UserCreated, serde_json::json!({"user": {}}));
        bus.emit(&ctx, &event).await;

        assert_eq!(recorder.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_emit_with_no_listeners_is_a_noop() {
        let bus = EventBus::new();
        let ctx = test_context();
        let event = Event::new(EventType::UserLogout, serde_json::json!({}));
        bus.emit(&ctx, &event).await;
        assert_eq!(bus.listener_count(), 0);
    }
}
