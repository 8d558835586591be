use serde_json::Value as JsonValue;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use folio_core::models::WebhookLog;
use folio_core::AppError;

/// Append-only audit log of delivery attempts in one tenant's database.
/// Rows are never updated after insert.
#[derive(Clone)]
pub struct WebhookLogRepository {
    pool: PgPool,
}

impl WebhookLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record one delivery attempt. The response body is expected to be
    /// already truncated by the caller.
    #[allow(clippy::too_many_arguments)]
    #[tracing::instrument(skip(self, payload, response_body), fields(db.table = "webhook_logs", db.operation = "insert"))]
    pub async fn record_attempt(
        &self,
        webhook_id: Uuid,
        delivery_id: Uuid,
        event_type: &str,
        payload: &JsonValue,
        status_code: Option<i32>,
        response_body: Option<&str>,
        attempt: i32,
        success: bool,
        duration_ms: i64,
        error_message: Option<&str>,
    ) -> Result<WebhookLog, AppError> {
        let log = sqlx::query_as::<Postgres, WebhookLog>(
            r#"
            INSERT INTO webhook_logs
            (webhook_id, delivery_id, event_type, payload, status_code, response_body,
             attempt, success, duration_ms, error_message)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(webhook_id)
        .bind(delivery_id)
        .bind(event_type)
        .bind(payload)
        .bind(status_code)
        .bind(response_body)
        .bind(attempt)
        .bind(success)
        .bind(duration_ms)
        .bind(error_message)
        .fetch_one(&self.pool)
        .await?;

        Ok(log)
    }

    #[tracing::instrument(skip(self), fields(db.table = "webhook_logs", db.operation = "select"))]
    pub async fn list_by_webhook(
        &self,
        webhook_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WebhookLog>, AppError> {
        let logs = sqlx::query_as::<Postgres, WebhookLog>(
            r#"
            SELECT * FROM webhook_logs
            WHERE webhook_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(webhook_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(logs)
    }

    /// All attempts of one logical delivery, oldest first.
    #[tracing::instrument(skip(self), fields(db.table = "webhook_logs", db.operation = "select"))]
    pub async fn list_by_delivery(&self, delivery_id: Uuid) -> Result<Vec<WebhookLog>, AppError> {
        let logs = sqlx::query_as::<Postgres, WebhookLog>(
            "SELECT * FROM webhook_logs WHERE delivery_id = $1 ORDER BY attempt ASC",
        )
        .bind(delivery_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(logs)
    }

    #[tracing::instrument(skip(self), fields(db.table = "webhook_logs", db.operation = "select"))]
    pub async fn count_failures(&self) -> Result<i64, AppError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM webhook_logs WHERE success = false")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}
