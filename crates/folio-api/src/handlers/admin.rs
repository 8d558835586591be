//! Central control-plane handlers. Only reachable on central domains.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use folio_core::models::{CreateTenantRequest, TenantPlan, TenantResponse};
use folio_core::AppError;
use folio_tenancy::{backup_tenant, seed, Migrator};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::error::{HttpAppError, ValidatedJson};
use crate::middleware::Central;
use crate::state::AppState;

async fn tenant_response(state: &AppState, tenant: folio_core::models::Tenant) -> Result<TenantResponse, AppError> {
    let domains = state
        .domains
        .list_by_tenant(tenant.id)
        .await?
        .into_iter()
        .map(|d| d.hostname)
        .collect();
    Ok(TenantResponse::from_tenant(tenant, domains))
}

pub async fn provision_tenant(
    _: Central,
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<CreateTenantRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let tenant = state.provisioner.provision(&request).await?;
    let response = tenant_response(&state, tenant).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn list_tenants(
    _: Central,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let tenants = state.tenants.list().await?;
    let mut response = Vec::with_capacity(tenants.len());
    for tenant in tenants {
        response.push(tenant_response(&state, tenant).await?);
    }
    Ok(Json(response))
}

pub async fn get_tenant(
    _: Central,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let tenant = state.tenants.get_required(id).await?;
    Ok(Json(tenant_response(&state, tenant).await?))
}

pub async fn destroy_tenant(
    _: Central,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.provisioner.destroy(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn suspend_tenant(
    _: Central,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let tenant = state.tenants.set_active(id, false).await?;
    Ok(Json(tenant_response(&state, tenant).await?))
}

pub async fn activate_tenant(
    _: Central,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let tenant = state.tenants.set_active(id, true).await?;
    Ok(Json(tenant_response(&state, tenant).await?))
}

#[derive(Debug, Deserialize)]
pub struct UpdatePlanRequest {
    pub plan: TenantPlan,
}

pub async fn update_plan(
    _: Central,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePlanRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let tenant = state.tenants.update_plan(id, request.plan).await?;
    Ok(Json(tenant_response(&state, tenant).await?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddDomainRequest {
    #[validate(length(min = 1, max = 253, message = "Domain must be 1-253 characters"))]
    pub hostname: String,
}

pub async fn add_domain(
    _: Central,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<AddDomainRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.tenants.get_required(id).await?;
    let domain = state.domains.add(id, &request.hostname).await?;
    Ok((StatusCode::CREATED, Json(domain)))
}

pub async fn remove_domain(
    _: Central,
    State(state): State<Arc<AppState>>,
    Path((id, domain_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.domains.delete(id, domain_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn migrate_tenant(
    _: Central,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let tenant = state.tenants.get_required(id).await?;
    let ctx = state.pools.context_for(&tenant).await?;
    let applied = Migrator::migrate(&ctx).await?;
    Ok(Json(serde_json::json!({ "applied": applied })))
}

#[derive(Debug, Deserialize)]
pub struct RollbackRequest {
    pub steps: u32,
}

pub async fn rollback_tenant(
    _: Central,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<RollbackRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let tenant = state.tenants.get_required(id).await?;
    let ctx = state.pools.context_for(&tenant).await?;
    let reverted = Migrator::rollback(&ctx, request.steps).await?;
    Ok(Json(serde_json::json!({ "reverted": reverted })))
}

#[derive(Debug, Deserialize)]
pub struct SeedRequest {
    pub name: String,
}

pub async fn seed_tenant(
    _: Central,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<SeedRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let tenant = state.tenants.get_required(id).await?;
    let ctx = state.pools.context_for(&tenant).await?;
    seed::run(&ctx, &request.name).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn backup_tenant_db(
    _: Central,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let tenant = state.tenants.get_required(id).await?;
    let ctx = state.pools.context_for(&tenant).await?;
    let path = backup_tenant(&state.config, &ctx).await?;
    Ok(Json(serde_json::json!({ "path": path.display().to_string() })))
}

pub async fn platform_report(
    _: Central,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let report = state.reporting.platform_report().await?;
    Ok(Json(report))
}
