//! HTTP error response conversion.
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`; any
//! `AppError` converts via `?` and renders with the status, code and
//! client message its metadata prescribes. Sensitive details never leave
//! the process in production.

use axum::{
    extract::rejection::JsonRejection,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use folio_core::{AppError, ErrorMetadata, LogLevel};
use serde::{de::DeserializeOwned, Serialize};
use validator::Validate;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Wrapper for AppError: orphan rules keep us from implementing
/// IntoResponse for it directly.
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::from(err))
    }
}

impl From<JsonRejection> for HttpAppError {
    fn from(rejection: JsonRejection) -> Self {
        HttpAppError(AppError::InvalidInput(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

/// JSON extractor that deserializes and runs validator rules, rendering
/// failures in the standard error shape.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(inner) = Json::<T>::from_request(req, state)
            .await
            .map_err(HttpAppError::from)?;
        inner.validate().map_err(AppError::from)?;
        Ok(ValidatedJson(inner))
    }
}

fn log_error(error: &AppError) {
    match error.log_level() {
        LogLevel::Debug => tracing::debug!(error = %error, code = error.error_code(), "Request failed"),
        LogLevel::Warn => tracing::warn!(error = %error, code = error.error_code(), "Request failed"),
        LogLevel::Error => tracing::error!(error = %error, code = error.error_code(), "Request failed"),
    }
}

fn is_production_env() -> bool {
    // Same variable Config::from_env reads for `environment`.
    std::env::var("FOLIO_ENV")
        .map(|env| {
            let env = env.to_lowercase();
            env == "production" || env == "prod"
        })
        .unwrap_or(false)
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;
        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        let details = if is_production_env() || app_error.is_sensitive() {
            None
        } else {
            Some(app_error.to_string())
        };

        let body = Json(ErrorResponse {
            error: app_error.client_message(),
            code: app_error.error_code().to_string(),
            details,
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404() {
        let err = HttpAppError(AppError::NotFound("Webhook abc".to_string()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_limit_exceeded_maps_to_402() {
        let err = HttpAppError(AppError::LimitExceeded {
            resource: "posts".to_string(),
            current: 10,
            limit: 10,
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    }

    #[test]
    fn test_database_errors_render_as_500() {
        let err = HttpAppError(AppError::Internal("pool exhausted".to_string()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    async fn response_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    // One test for both states: the variable is process-global, so the
    // two checks must not run in parallel.
    #[tokio::test]
    async fn test_production_redacts_details() {
        std::env::remove_var("FOLIO_ENV");
        let response =
            HttpAppError(AppError::InvalidInput("field x is bad".to_string())).into_response();
        let body = response_json(response).await;
        assert_eq!(body["details"], "Invalid input: field x is bad");

        std::env::set_var("FOLIO_ENV", "production");
        let response =
            HttpAppError(AppError::InvalidInput("field x is bad".to_string())).into_response();
        std::env::remove_var("FOLIO_ENV");
        let body = response_json(response).await;
        assert_eq!(body["code"], "INVALID_INPUT");
        assert!(body.get("details").is_none());
    }
}
