//! Tenant database backups via `pg_dump`.

use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{anyhow, Context};
use chrono::Utc;
use folio_core::{AppError, Config};
use tokio::process::Command;

use crate::context::TenantContext;

/// Dump the tenant database to `{backup_dir}/{database}_{timestamp}.sql`.
/// Returns the path of the written dump.
#[tracing::instrument(skip(config, ctx), fields(tenant_id = %ctx.tenant_id()))]
pub async fn backup_tenant(config: &Config, ctx: &TenantContext) -> Result<PathBuf, AppError> {
    let database = ctx.tenant().database_name();
    let url = config.database_url_for(&database);

    let timestamp = Utc::now().format("%Y%m%d%H%M%S");
    let mut path = PathBuf::from(&config.backup_dir);
    tokio::fs::create_dir_all(&path)
        .await
        .context("Failed to create backup directory")?;
    path.push(format!("{}_{}.sql", database, timestamp));

    let output = Command::new("pg_dump")
        .arg("--no-owner")
        .arg("--file")
        .arg(&path)
        .arg(&url)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .context("Failed to execute pg_dump")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("pg_dump failed for {}: {}", database, stderr).into());
    }

    tracing::info!(
        tenant_id = %ctx.tenant_id(),
        path = %path.display(),
        "Backed up tenant database"
    );
    Ok(path)
}
