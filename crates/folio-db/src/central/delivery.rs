use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use folio_core::models::Delivery;
use folio_core::AppError;

/// Durable webhook delivery queue in the central database.
///
/// One row per logical delivery; the attempt counter travels in the row so
/// a retry chain survives process restarts. Claims use FOR UPDATE SKIP
/// LOCKED so multiple worker instances never process the same delivery.
#[derive(Clone)]
pub struct DeliveryQueueRepository {
    pool: PgPool,
}

impl DeliveryQueueRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Enqueue a fresh delivery (attempt 1, due immediately).
    #[tracing::instrument(skip(self, payload), fields(db.table = "webhook_deliveries", db.operation = "insert"))]
    pub async fn enqueue(
        &self,
        delivery_id: Uuid,
        tenant_id: Uuid,
        webhook_id: Uuid,
        event_type: &str,
        payload: &JsonValue,
        max_attempts: i32,
    ) -> Result<Delivery, AppError> {
        let delivery = sqlx::query_as::<Postgres, Delivery>(
            r#"
            INSERT INTO webhook_deliveries
            (id, tenant_id, webhook_id, event_type, payload, attempt, max_attempts, next_attempt_at)
            VALUES ($1, $2, $3, $4, $5, 1, $6, NOW())
            RETURNING *
            "#,
        )
        .bind(delivery_id)
        .bind(tenant_id)
        .bind(webhook_id)
        .bind(event_type)
        .bind(payload)
        .bind(max_attempts)
        .fetch_one(&self.pool)
        .await?;

        Ok(delivery)
    }

    /// Claim deliveries that are due. FOR UPDATE SKIP LOCKED keeps
    /// concurrent workers from claiming the same rows.
    #[tracing::instrument(skip(self), fields(db.table = "webhook_deliveries", db.operation = "select"))]
    pub async fn claim_due(&self, limit: i64) -> Result<Vec<Delivery>, AppError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query_as::<Postgres, Delivery>(
            r#"
            SELECT * FROM webhook_deliveries
            WHERE next_attempt_at <= $1
            ORDER BY next_attempt_at ASC
            LIMIT $2
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(now)
        .bind(limit)
        .fetch_all(&mut *tx)
        .await;

        match result {
            Ok(deliveries) => {
                // Push the claimed rows into the future so another poll tick
                // does not re-claim them while the attempt is in flight.
                if !deliveries.is_empty() {
                    let ids: Vec<Uuid> = deliveries.iter().map(|d| d.id).collect();
                    sqlx::query(
                        "UPDATE webhook_deliveries
                         SET next_attempt_at = NOW() + INTERVAL '10 minutes', updated_at = NOW()
                         WHERE id = ANY($1)",
                    )
                    .bind(&ids)
                    .execute(&mut *tx)
                    .await?;
                }
                tx.commit().await?;
                Ok(deliveries)
            }
            Err(e) => {
                tx.rollback().await.ok();
                Err(anyhow::anyhow!("Failed to claim due deliveries: {}", e).into())
            }
        }
    }

    /// Reschedule a failed delivery for its next attempt.
    #[tracing::instrument(skip(self), fields(db.table = "webhook_deliveries", db.operation = "update", db.record_id = %id))]
    pub async fn reschedule(
        &self,
        id: Uuid,
        attempt: i32,
        next_attempt_at: DateTime<Utc>,
        last_error: Option<&str>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE webhook_deliveries
            SET attempt = $2, next_attempt_at = $3, last_error = $4, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(attempt)
        .bind(next_attempt_at)
        .bind(last_error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Remove a delivery (after success, terminal failure, or a skip).
    #[tracing::instrument(skip(self), fields(db.table = "webhook_deliveries", db.operation = "delete", db.record_id = %id))]
    pub async fn remove(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM webhook_deliveries WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Pending deliveries per tenant, for the central report.
    #[tracing::instrument(skip(self), fields(db.table = "webhook_deliveries", db.operation = "select"))]
    pub async fn count_pending(&self, tenant_id: Uuid) -> Result<i64, AppError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM webhook_deliveries WHERE tenant_id = $1")
                .bind(tenant_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}
