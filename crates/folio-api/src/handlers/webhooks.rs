//! Tenant-facing webhook management.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use folio_core::models::{
    CreateWebhookRequest, UpdateWebhookRequest, WebhookLogResponse, WebhookResponse,
};
use folio_core::AppError;
use folio_events::ALL_EVENT_TYPES;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{HttpAppError, ValidatedJson};
use crate::middleware::TenantCtx;
use crate::state::AppState;

/// Event-type catalog, for building subscription filters.
pub async fn list_event_types() -> impl IntoResponse {
    let names: Vec<&str> = ALL_EVENT_TYPES.iter().map(|e| e.as_str()).collect();
    Json(serde_json::json!({ "event_types": names }))
}

pub async fn list_webhooks(TenantCtx(ctx): TenantCtx) -> Result<impl IntoResponse, HttpAppError> {
    let webhooks = ctx.webhooks().list().await?;
    let response: Vec<WebhookResponse> = webhooks.into_iter().map(Into::into).collect();
    Ok(Json(response))
}

pub async fn create_webhook(
    State(state): State<Arc<AppState>>,
    TenantCtx(ctx): TenantCtx,
    ValidatedJson(request): ValidatedJson<CreateWebhookRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    if !state.limits.has_feature(ctx.tenant(), "webhooks") {
        return Err(HttpAppError(AppError::BadRequest(
            "Current plan does not include webhooks".to_string(),
        )));
    }

    validate_event_filter(&request.events)?;
    let events = if request.events.is_empty() {
        vec![folio_core::models::EVENT_WILDCARD.to_string()]
    } else {
        request.events.clone()
    };

    let webhook = ctx
        .webhooks()
        .create(
            &request.url,
            &events,
            request.signing_secret.as_deref(),
            request.headers.as_ref(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(WebhookResponse::from(webhook))))
}

pub async fn get_webhook(
    TenantCtx(ctx): TenantCtx,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let webhook = ctx
        .webhooks()
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Webhook {}", id)))?;
    Ok(Json(WebhookResponse::from(webhook)))
}

pub async fn update_webhook(
    TenantCtx(ctx): TenantCtx,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateWebhookRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    if let Some(events) = &request.events {
        validate_event_filter(events)?;
    }

    let webhook = ctx
        .webhooks()
        .update(
            id,
            request.url.as_deref(),
            request.events.as_deref(),
            request.signing_secret.as_deref(),
            request.headers.as_ref(),
            request.is_active,
        )
        .await?;
    Ok(Json(WebhookResponse::from(webhook)))
}

pub async fn delete_webhook(
    TenantCtx(ctx): TenantCtx,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    // In-flight deliveries tolerate the deletion: the worker re-fetches
    // by id and skips when the row is gone.
    let deleted = ctx.webhooks().delete(id).await?;
    if !deleted {
        return Err(HttpAppError(AppError::NotFound(format!("Webhook {}", id))));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    #[serde(default = "default_log_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_log_limit() -> i64 {
    50
}

pub async fn list_webhook_logs(
    TenantCtx(ctx): TenantCtx,
    Path(id): Path<Uuid>,
    Query(query): Query<LogQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    if ctx.webhooks().get_by_id(id).await?.is_none() {
        return Err(HttpAppError(AppError::NotFound(format!("Webhook {}", id))));
    }

    let limit = query.limit.clamp(1, 500);
    let logs = ctx
        .webhook_logs()
        .list_by_webhook(id, limit, query.offset.max(0))
        .await?;
    let response: Vec<WebhookLogResponse> = logs.into_iter().map(Into::into).collect();
    Ok(Json(response))
}

/// All attempts of one logical delivery, oldest first.
pub async fn list_delivery_attempts(
    TenantCtx(ctx): TenantCtx,
    Path(delivery_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let logs = ctx.webhook_logs().list_by_delivery(delivery_id).await?;
    let response: Vec<WebhookLogResponse> = logs.into_iter().map(Into::into).collect();
    Ok(Json(response))
}

fn validate_event_filter(events: &[String]) -> Result<(), HttpAppError> {
    for event in events {
        if event == folio_core::models::EVENT_WILDCARD {
            continue;
        }
        event
            .parse::<folio_events::EventType>()
            .map_err(HttpAppError)?;
    }
    Ok(())
}
