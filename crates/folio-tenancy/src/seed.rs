//! Named seed data sets for freshly provisioned tenant databases.

use folio_core::AppError;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::context::TenantContext;

/// Seeder names accepted by [`run`].
pub const SEEDERS: &[&str] = &["default", "demo"];

/// Generate a random initial password and return it with its stored hash.
fn initial_credentials() -> (String, String) {
    use rand::Rng;

    let mut rng = rand::rng();
    let random_bytes: Vec<u8> = (0..16).map(|_| rng.random()).collect();
    let password = hex::encode(random_bytes);
    let hash = hex::encode(Sha256::digest(password.as_bytes()));
    (password, hash)
}

/// Run the named seeder against the tenant database. Unknown names are
/// rejected before any writes happen.
#[tracing::instrument(skip(ctx), fields(tenant_id = %ctx.tenant_id()))]
pub async fn run(ctx: &TenantContext, name: &str) -> Result<(), AppError> {
    match name {
        "default" => seed_default(ctx).await,
        "demo" => seed_demo(ctx).await,
        other => Err(AppError::InvalidInput(format!(
            "Unknown seeder: {} (available: {})",
            other,
            SEEDERS.join(", ")
        ))),
    }
}

/// Minimal starting content: one admin user and a general category.
async fn seed_default(ctx: &TenantContext) -> Result<(), AppError> {
    let (password, hash) = initial_credentials();
    let mut tx = ctx.pool().begin().await?;

    sqlx::query(
        r#"INSERT INTO users (name, email, role, password_hash)
           VALUES ($1, $2, 'admin', $3)"#,
    )
    .bind("Administrator")
    .bind(ctx.tenant().email.as_str())
    .bind(&hash)
    .execute(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO categories (name, slug) VALUES ($1, $2)")
        .bind("General")
        .bind("general")
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(
        tenant_id = %ctx.tenant_id(),
        initial_password = %password,
        "Seeded default data"
    );
    Ok(())
}

/// Default seed plus demo content: a published welcome post with a tag
/// and one approved comment.
async fn seed_demo(ctx: &TenantContext) -> Result<(), AppError> {
    seed_default(ctx).await?;

    let mut tx = ctx.pool().begin().await?;

    let (author_id,): (Uuid,) =
        sqlx::query_as("SELECT id FROM users WHERE role = 'admin' LIMIT 1")
            .fetch_one(&mut *tx)
            .await?;
    let (category_id,): (Uuid,) =
        sqlx::query_as("SELECT id FROM categories WHERE slug = 'general'")
            .fetch_one(&mut *tx)
            .await?;

    let (tag_id,): (Uuid,) = sqlx::query_as(
        "INSERT INTO tags (name, slug) VALUES ($1, $2) RETURNING id",
    )
    .bind("Announcements")
    .bind("announcements")
    .fetch_one(&mut *tx)
    .await?;

    let (post_id,): (Uuid,) = sqlx::query_as(
        r#"INSERT INTO posts (author_id, title, slug, body, status, published_at)
           VALUES ($1, $2, $3, $4, 'published', NOW())
           RETURNING id"#,
    )
    .bind(author_id)
    .bind("Welcome to your new site")
    .bind("welcome")
    .bind("This site was just provisioned. Start writing!")
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO post_categories (post_id, category_id) VALUES ($1, $2)")
        .bind(post_id)
        .bind(category_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("INSERT INTO post_tags (post_id, tag_id) VALUES ($1, $2)")
        .bind(post_id)
        .bind(tag_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"INSERT INTO comments (post_id, author_name, author_email, body, approved)
           VALUES ($1, $2, $3, $4, TRUE)"#,
    )
    .bind(post_id)
    .bind("Demo Visitor")
    .bind("visitor@example.com")
    .bind("Looking forward to the first real post.")
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(tenant_id = %ctx.tenant_id(), "Seeded demo data");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_credentials_are_random() {
        let (p1, h1) = initial_credentials();
        let (p2, h2) = initial_credentials();
        assert_ne!(p1, p2);
        assert_ne!(h1, h2);
        assert_eq!(p1.len(), 32);
        assert_eq!(h1.len(), 64);
    }

    #[test]
    fn test_seeder_names() {
        assert!(SEEDERS.contains(&"default"));
        assert!(SEEDERS.contains(&"demo"));
    }
}
