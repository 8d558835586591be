//! Host-based tenant resolution.
//!
//! Every request is classified by its Host header before routing:
//! central hostnames serve the admin surface, registered tenant domains
//! get a `TenantContext` inserted into request extensions, and unknown
//! hostnames get a 404 for API clients or a redirect to the central host
//! for browsers.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use folio_core::AppError;
use folio_tenancy::{ResolvedHost, TenantContext, TenantSession};

use crate::error::HttpAppError;
use crate::state::AppState;

/// Marker extension for requests arriving on a central domain.
#[derive(Clone, Copy, Debug)]
pub struct CentralMarker;

pub async fn resolve_host(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    match state.resolver.resolve(&host).await {
        Ok(ResolvedHost::Central) => {
            request.extensions_mut().insert(CentralMarker);
        }
        Ok(ResolvedHost::Tenant(tenant)) => match state.pools.context_for(&tenant).await {
            Ok(ctx) => {
                // The request is the unit of work: the session guard holds
                // the activation until the response is produced.
                let session = TenantSession::new();
                let active = match session.activate(ctx) {
                    Ok(active) => active,
                    Err(e) => return HttpAppError(e).into_response(),
                };
                request.extensions_mut().insert(active.context().clone());
                let response = next.run(request).await;
                drop(active);
                return response;
            }
            Err(e) => return HttpAppError(e).into_response(),
        },
        Err(AppError::TenantNotResolved(hostname)) => {
            return unresolved_response(&state, &request, hostname);
        }
        Err(e) => return HttpAppError(e).into_response(),
    }

    next.run(request).await
}

fn unresolved_response(state: &AppState, request: &Request, hostname: String) -> Response {
    let wants_html = request
        .headers()
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|accept| accept.contains("text/html"))
        .unwrap_or(false);

    if wants_html {
        if let Some(central) = state.config.central_domains.first() {
            tracing::debug!(hostname, "Redirecting unknown host to central domain");
            return Redirect::temporary(&format!("http://{}/", central)).into_response();
        }
    }

    HttpAppError(AppError::TenantNotResolved(hostname)).into_response()
}

/// Extractor for tenant-scoped handlers. Rejects requests that reached
/// the route through a central hostname.
pub struct TenantCtx(pub TenantContext);

impl<S> FromRequestParts<S> for TenantCtx
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantContext>()
            .cloned()
            .map(TenantCtx)
            .ok_or_else(|| {
                HttpAppError(AppError::TenantNotResolved(
                    "not a tenant domain".to_string(),
                ))
            })
    }
}

/// Extractor for admin handlers. The admin surface only exists on
/// central domains; anywhere else it is indistinguishable from a missing
/// route.
pub struct Central;

impl<S> FromRequestParts<S> for Central
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CentralMarker>()
            .map(|_| Central)
            .ok_or_else(|| HttpAppError(AppError::NotFound("Not found".to_string())))
    }
}
