//! Health probes.

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::state::AppState;

/// Liveness probe: the process is running.
pub async fn liveness() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "alive" })),
    )
}

/// Readiness probe: the central database answers.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    const TIMEOUT: Duration = Duration::from_secs(5);

    let mut response = serde_json::json!({
        "status": "healthy",
        "database": "unknown",
    });
    let mut healthy = true;

    match tokio::time::timeout(TIMEOUT, sqlx::query("SELECT 1").execute(&state.pool)).await {
        Ok(Ok(_)) => response["database"] = serde_json::json!("healthy"),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Database health check failed");
            response["database"] = serde_json::json!(format!("unhealthy: {}", e));
            healthy = false;
        }
        Err(_) => {
            tracing::error!("Database health check timed out");
            response["database"] = serde_json::json!("timeout");
            healthy = false;
        }
    }

    if !healthy {
        response["status"] = serde_json::json!("unhealthy");
    }

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(response))
}
