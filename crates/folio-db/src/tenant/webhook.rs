use serde_json::Value as JsonValue;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use folio_core::models::Webhook;
use folio_core::AppError;

/// Repository for webhook subscriptions in one tenant's database.
#[derive(Clone)]
pub struct WebhookRepository {
    pool: PgPool,
}

impl WebhookRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, headers), fields(db.table = "webhooks", db.operation = "insert"))]
    pub async fn create(
        &self,
        url: &str,
        events: &[String],
        signing_secret: Option<&str>,
        headers: Option<&JsonValue>,
    ) -> Result<Webhook, AppError> {
        let default_headers = serde_json::json!({});
        let webhook = sqlx::query_as::<Postgres, Webhook>(
            r#"
            INSERT INTO webhooks (url, events, signing_secret, headers, is_active)
            VALUES ($1, $2, $3, $4, true)
            RETURNING *
            "#,
        )
        .bind(url)
        .bind(events)
        .bind(signing_secret)
        .bind(headers.unwrap_or(&default_headers))
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(webhook_id = %webhook.id, url, "Created webhook");
        Ok(webhook)
    }

    #[tracing::instrument(skip(self), fields(db.table = "webhooks", db.operation = "select", db.record_id = %id))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Webhook>, AppError> {
        let webhook = sqlx::query_as::<Postgres, Webhook>("SELECT * FROM webhooks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(webhook)
    }

    #[tracing::instrument(skip(self), fields(db.table = "webhooks", db.operation = "select"))]
    pub async fn list(&self) -> Result<Vec<Webhook>, AppError> {
        let webhooks =
            sqlx::query_as::<Postgres, Webhook>("SELECT * FROM webhooks ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?;

        Ok(webhooks)
    }

    /// Active webhooks whose event filter matches, including wildcard
    /// subscriptions. Dispatch re-filters in memory as well; this keeps the
    /// query and the in-memory rule in agreement.
    #[tracing::instrument(skip(self), fields(db.table = "webhooks", db.operation = "select"))]
    pub async fn find_active_by_event(&self, event_type: &str) -> Result<Vec<Webhook>, AppError> {
        let webhooks = sqlx::query_as::<Postgres, Webhook>(
            r#"
            SELECT * FROM webhooks
            WHERE is_active = true AND ($1 = ANY(events) OR '*' = ANY(events))
            ORDER BY created_at ASC
            "#,
        )
        .bind(event_type)
        .fetch_all(&self.pool)
        .await?;

        Ok(webhooks)
    }

    #[tracing::instrument(skip(self, headers), fields(db.table = "webhooks", db.operation = "update", db.record_id = %id))]
    pub async fn update(
        &self,
        id: Uuid,
        url: Option<&str>,
        events: Option<&[String]>,
        signing_secret: Option<&str>,
        headers: Option<&JsonValue>,
        is_active: Option<bool>,
    ) -> Result<Webhook, AppError> {
        let webhook = sqlx::query_as::<Postgres, Webhook>(
            r#"
            UPDATE webhooks
            SET url = COALESCE($2, url),
                events = COALESCE($3, events),
                signing_secret = COALESCE($4, signing_secret),
                headers = COALESCE($5, headers),
                is_active = COALESCE($6, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(url)
        .bind(events)
        .bind(signing_secret)
        .bind(headers)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Webhook {}", id)))?;

        Ok(webhook)
    }

    /// Bump the running success or failure counter after an attempt.
    #[tracing::instrument(skip(self), fields(db.table = "webhooks", db.operation = "update", db.record_id = %id))]
    pub async fn record_outcome(&self, id: Uuid, success: bool) -> Result<(), AppError> {
        let column = if success {
            "success_count"
        } else {
            "failure_count"
        };
        let query = format!(
            "UPDATE webhooks SET {column} = {column} + 1, updated_at = NOW() WHERE id = $1"
        );
        sqlx::query(&query).bind(id).execute(&self.pool).await?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "webhooks", db.operation = "update", db.record_id = %id))]
    pub async fn deactivate(&self, id: Uuid, reason: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE webhooks
            SET is_active = false,
                deactivated_at = NOW(),
                deactivation_reason = $2,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(reason)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "webhooks", db.operation = "delete", db.record_id = %id))]
    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM webhooks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
