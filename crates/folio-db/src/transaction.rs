//! Transaction utilities for multi-step central-database mutations.
//!
//! Provisioning and destruction wrap their central-row writes in one
//! explicit transaction; the physical database DDL happens outside it with
//! compensating actions on failure.

use sqlx::{PgPool, Postgres, Transaction};

/// Execute a closure within a transaction: commit on Ok, rollback on Err.
/// The closure's error type carries through unchanged.
pub async fn with_transaction<F, R, E>(pool: &PgPool, f: F) -> Result<R, E>
where
    F: for<'a> FnOnce(
        &'a mut Transaction<'_, Postgres>,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<R, E>> + Send + 'a>,
    >,
    E: From<sqlx::Error>,
{
    let mut tx = pool.begin().await?;

    match f(&mut tx).await {
        Ok(result) => {
            tx.commit().await?;
            Ok(result)
        }
        Err(e) => {
            tx.rollback().await.ok();
            Err(e)
        }
    }
}
