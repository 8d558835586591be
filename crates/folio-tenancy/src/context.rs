//! Tenant connection context.
//!
//! The active tenant is never process-global state: each unit of work
//! (request or job) owns a `TenantSession` and activates a context on it,
//! getting back an RAII guard. Nested activation of the same tenant is a
//! no-op; activating a different tenant while one is active is an error,
//! which turns the cross-tenant-leak failure mode into a loud bug instead
//! of silently mixed data.

use std::sync::{Arc, Mutex};

use sqlx::PgPool;
use uuid::Uuid;

use folio_core::models::Tenant;
use folio_core::AppError;
use folio_db::{ContentRepository, WebhookLogRepository, WebhookRepository};

/// Handle binding one tenant's identity to its isolated connection pool.
/// All tenant-scoped repositories are constructed from here.
#[derive(Clone)]
pub struct TenantContext {
    tenant: Tenant,
    pool: PgPool,
}

impl TenantContext {
    pub fn new(tenant: Tenant, pool: PgPool) -> Self {
        Self { tenant, pool }
    }

    pub fn tenant(&self) -> &Tenant {
        &self.tenant
    }

    pub fn tenant_id(&self) -> Uuid {
        self.tenant.id
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn webhooks(&self) -> WebhookRepository {
        WebhookRepository::new(self.pool.clone())
    }

    pub fn webhook_logs(&self) -> WebhookLogRepository {
        WebhookLogRepository::new(self.pool.clone())
    }

    pub fn content(&self) -> ContentRepository {
        ContentRepository::new(self.pool.clone())
    }
}

struct ActiveState {
    tenant_id: Uuid,
    depth: u32,
    context: TenantContext,
}

#[derive(Default)]
struct SessionState {
    active: Option<ActiveState>,
}

/// Per-unit-of-work activation tracker. Sessions are cheap to create and
/// must not be shared across concurrent units of work.
#[derive(Clone, Default)]
pub struct TenantSession {
    state: Arc<Mutex<SessionState>>,
}

impl TenantSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Activate a tenant context for the scope of the returned guard.
    ///
    /// Re-activating the currently active tenant increments a depth counter
    /// and is otherwise a no-op. Activating a different tenant fails with
    /// `TenantContextConflict`.
    pub fn activate(&self, context: TenantContext) -> Result<ActiveTenant, AppError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| AppError::Internal("Tenant session lock poisoned".to_string()))?;

        match state.active.as_mut() {
            None => {
                tracing::debug!(tenant_id = %context.tenant_id(), "Activating tenant context");
                state.active = Some(ActiveState {
                    tenant_id: context.tenant_id(),
                    depth: 1,
                    context: context.clone(),
                });
                Ok(ActiveTenant {
                    session: self.state.clone(),
                    context,
                })
            }
            Some(active) if active.tenant_id == context.tenant_id() => {
                active.depth += 1;
                let context = active.context.clone();
                Ok(ActiveTenant {
                    session: self.state.clone(),
                    context,
                })
            }
            Some(active) => Err(AppError::TenantContextConflict {
                active: active.tenant_id,
                attempted: context.tenant_id(),
            }),
        }
    }

    /// The currently active context, if any.
    pub fn current(&self) -> Option<TenantContext> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.active.as_ref().map(|a| a.context.clone()))
    }

    /// The active context, or `NoTenantContext` for operations that must
    /// only run tenant-scoped (migrate, seed, backup).
    pub fn require_active(&self) -> Result<TenantContext, AppError> {
        self.current().ok_or(AppError::NoTenantContext)
    }
}

/// RAII guard for an activated tenant context. Deactivation happens on
/// drop, on every exit path including panics and early returns.
pub struct ActiveTenant {
    session: Arc<Mutex<SessionState>>,
    context: TenantContext,
}

impl ActiveTenant {
    pub fn context(&self) -> &TenantContext {
        &self.context
    }
}

impl std::ops::Deref for ActiveTenant {
    type Target = TenantContext;

    fn deref(&self) -> &Self::Target {
        &self.context
    }
}

impl Drop for ActiveTenant {
    fn drop(&mut self) {
        if let Ok(mut state) = self.session.lock() {
            if let Some(active) = state.active.as_mut() {
                active.depth -= 1;
                if active.depth == 0 {
                    tracing::debug!(tenant_id = %active.tenant_id, "Deactivating tenant context");
                    state.active = None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use folio_core::models::TenantPlan;

    fn test_tenant(id: Uuid) -> Tenant {
        Tenant {
            id,
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
        }
    }

    fn test_context(id: Uuid) -> TenantContext {
        // connect_lazy never touches the network, but the pool spawns its
        // maintenance task and needs a live runtime to spawn it on.
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
        TenantContext::new(test_tenant(id), pool)
    }

    #[test]
    fn test_activate_and_deactivate() {
        let session = TenantSession::new();
        let id = Uuid::new_v4();
        assert!(session.current().is_none());

        {
            let active = session.activate(test_context(id)).unwrap();
            assert_eq!(active.tenant_id(), id);
            assert_eq!(session.current().unwrap().tenant_id(), id);
        }

        // Guard dropped: context restored to none.
        assert!(session.current().is_none());
        assert!(matches!(
            session.require_active(),
            Err(AppError::NoTenantContext)
        ));
    }

    #[test]
    fn test_nested_same_tenant_is_noop() {
        let session = TenantSession::new();
        let id = Uuid::new_v4();

        let outer = session.activate(test_context(id)).unwrap();
        {
            let inner = session.activate(test_context(id)).unwrap();
            assert_eq!(inner.tenant_id(), id);
        }
        // Inner guard dropped; outer activation still holds.
        assert_eq!(session.current().unwrap().tenant_id(), id);
        drop(outer);
        assert!(session.current().is_none());
    }

    #[test]
    fn test_cross_tenant_activation_is_error() {
        let session = TenantSession::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let _active = session.activate(test_context(a)).unwrap();
        let err = match session.activate(test_context(b)) {
            Ok(_) => panic!("cross-tenant activation must fail"),
            Err(e) => e,
        };
        match err {
            AppError::TenantContextConflict { active, attempted } => {
                assert_eq!(active, a);
                assert_eq!(attempted, b);
            }
            other => panic!("expected TenantContextConflict, got {other:?}"),
        }
        // The original context is untouched by the failed attempt.
        assert_eq!(session.current().unwrap().tenant_id(), a);
    }

    #[test]
    fn test_sessions_are_isolated_per_unit_of_work() {
        // Two independent sessions never observe each other's tenant.
        let session_a = TenantSession::new();
        let session_b = TenantSession::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let _ga = session_a.activate(test_context(a)).unwrap();
        let _gb = session_b.activate(test_context(b)).unwrap();

        assert_eq!(session_a.current().unwrap().tenant_id(), a);
        assert_eq!(session_b.current().unwrap().tenant_id(), b);
    }

    #[test]
    fn test_concurrent_sessions_no_cross_contamination() {
        // Stress the invariant from many threads, one session each.
        let mut handles = Vec::new();
        for _ in 0..32 {
            handles.push(std::thread::spawn(|| {
                let session = TenantSession::new();
                let id = Uuid::new_v4();
                for _ in 0..100 {
                    let active = session.activate(test_context(id)).unwrap();
                    assert_eq!(active.tenant_id(), id);
                    assert_eq!(session.current().unwrap().tenant_id(), id);
                    drop(active);
                    assert!(session.current().is_none());
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
