//! Route wiring.

use std::sync::Arc;

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{admin, health, webhooks};
use crate::middleware::resolve_host;
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    let tenant_api = Router::new()
        .route("/api/events", get(webhooks::list_event_types))
        .route(
            "/api/webhooks",
            get(webhooks::list_webhooks).post(webhooks::create_webhook),
        )
        .route(
            "/api/webhooks/{id}",
            get(webhooks::get_webhook)
                .patch(webhooks::update_webhook)
                .delete(webhooks::delete_webhook),
        )
        .route("/api/webhooks/{id}/logs", get(webhooks::list_webhook_logs))
        .route(
            "/api/deliveries/{delivery_id}",
            get(webhooks::list_delivery_attempts),
        );

    let admin_api = Router::new()
        .route(
            "/admin/tenants",
            get(admin::list_tenants).post(admin::provision_tenant),
        )
        .route(
            "/admin/tenants/{id}",
            get(admin::get_tenant).delete(admin::destroy_tenant),
        )
        .route("/admin/tenants/{id}/suspend", post(admin::suspend_tenant))
        .route("/admin/tenants/{id}/activate", post(admin::activate_tenant))
        .route("/admin/tenants/{id}/plan", put(admin::update_plan))
        .route("/admin/tenants/{id}/domains", post(admin::add_domain))
        .route(
            "/admin/tenants/{id}/domains/{domain_id}",
            delete(admin::remove_domain),
        )
        .route("/admin/tenants/{id}/migrate", post(admin::migrate_tenant))
        .route("/admin/tenants/{id}/rollback", post(admin::rollback_tenant))
        .route("/admin/tenants/{id}/seed", post(admin::seed_tenant))
        .route("/admin/tenants/{id}/backup", post(admin::backup_tenant_db))
        .route("/admin/report", get(admin::platform_report));

    Router::new()
        .merge(tenant_api)
        .merge(admin_api)
        .layer(from_fn_with_state(state.clone(), resolve_host))
        // Health probes skip host resolution: load balancers have no
        // registered hostname.
        .route("/health", get(health::health))
        .route("/live", get(health::liveness))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
