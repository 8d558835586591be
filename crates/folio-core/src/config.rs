//! Configuration module
//!
//! Env-driven configuration for the API server, the delivery worker and the
//! CLI. The central database URL doubles as the admin connection used for
//! CREATE/DROP DATABASE; tenant databases are derived from it by swapping
//! the database name.

use std::env;

use anyhow::{Context, Result};

const DEFAULT_DB_MAX_CONNECTIONS: u32 = 20;
const DEFAULT_TENANT_POOL_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_SERVER_PORT: u16 = 8080;
const DEFAULT_TRIAL_DAYS: i64 = 14;
const DEFAULT_WEBHOOK_TIMEOUT_SECS: u64 = 30;
const DEFAULT_WEBHOOK_MAX_ATTEMPTS: i32 = 3;
const DEFAULT_WEBHOOK_BASE_DELAY_SECS: i64 = 60;
const DEFAULT_WEBHOOK_POLL_INTERVAL_SECS: u64 = 5;
const DEFAULT_WEBHOOK_BATCH_SIZE: i64 = 100;
const DEFAULT_WEBHOOK_MAX_CONCURRENT: usize = 20;
const DEFAULT_RESPONSE_BODY_LIMIT: usize = 4096;

#[derive(Clone, Debug)]
pub struct Config {
    /// Connection URL of the central database. Also used as the admin
    /// connection for tenant database DDL.
    pub central_database_url: String,
    pub db_max_connections: u32,
    pub tenant_pool_max_connections: u32,

    /// Hostnames served by the central control plane (comma separated in
    /// FOLIO_CENTRAL_DOMAINS). Anything else is resolved as a tenant domain.
    pub central_domains: Vec<String>,

    pub server_port: u16,
    pub environment: String,

    /// Days of trial granted when a tenant registers with trial=true.
    pub trial_days: i64,

    /// Directory for `pg_dump` backups of tenant databases.
    pub backup_dir: String,

    pub webhook: WebhookConfig,
}

/// Webhook delivery settings.
#[derive(Clone, Debug)]
pub struct WebhookConfig {
    pub timeout_secs: u64,
    pub max_attempts: i32,
    /// Base for exponential backoff: delay = base * 2^(attempt-1).
    pub base_delay_secs: i64,
    /// Optional fixed per-attempt schedule (comma separated seconds in
    /// FOLIO_WEBHOOK_RETRY_SCHEDULE). Overrides the exponential backoff.
    pub retry_schedule_secs: Option<Vec<i64>>,
    pub poll_interval_secs: u64,
    pub batch_size: i64,
    pub max_concurrent_deliveries: usize,
    /// Response bodies stored in webhook logs are truncated to this length.
    pub response_body_limit: usize,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_WEBHOOK_TIMEOUT_SECS,
            max_attempts: DEFAULT_WEBHOOK_MAX_ATTEMPTS,
            base_delay_secs: DEFAULT_WEBHOOK_BASE_DELAY_SECS,
            retry_schedule_secs: None,
            poll_interval_secs: DEFAULT_WEBHOOK_POLL_INTERVAL_SECS,
            batch_size: DEFAULT_WEBHOOK_BATCH_SIZE,
            max_concurrent_deliveries: DEFAULT_WEBHOOK_MAX_CONCURRENT,
            response_body_limit: DEFAULT_RESPONSE_BODY_LIMIT,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_list(key: &str) -> Option<Vec<String>> {
    env::var(key).ok().map(|v| {
        v.split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect()
    })
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let central_database_url = env::var("DATABASE_URL")
            .context("DATABASE_URL must be set to the central database URL")?;

        let retry_schedule_secs = env_list("FOLIO_WEBHOOK_RETRY_SCHEDULE").map(|items| {
            items
                .iter()
                .filter_map(|s| s.parse::<i64>().ok())
                .collect::<Vec<_>>()
        });
        let retry_schedule_secs = match retry_schedule_secs {
            Some(v) if !v.is_empty() => Some(v),
            _ => None,
        };

        Ok(Self {
            central_database_url,
            db_max_connections: env_parse("FOLIO_DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            tenant_pool_max_connections: env_parse(
                "FOLIO_TENANT_POOL_MAX_CONNECTIONS",
                DEFAULT_TENANT_POOL_MAX_CONNECTIONS,
            ),
            central_domains: env_list("FOLIO_CENTRAL_DOMAINS")
                .unwrap_or_else(|| vec!["localhost".to_string()]),
            server_port: env_parse("FOLIO_PORT", DEFAULT_SERVER_PORT),
            environment: env::var("FOLIO_ENV").unwrap_or_else(|_| "development".to_string()),
            trial_days: env_parse("FOLIO_TRIAL_DAYS", DEFAULT_TRIAL_DAYS),
            backup_dir: env::var("FOLIO_BACKUP_DIR").unwrap_or_else(|_| "./backups".to_string()),
            webhook: WebhookConfig {
                timeout_secs: env_parse("FOLIO_WEBHOOK_TIMEOUT_SECS", DEFAULT_WEBHOOK_TIMEOUT_SECS),
                max_attempts: env_parse("FOLIO_WEBHOOK_MAX_ATTEMPTS", DEFAULT_WEBHOOK_MAX_ATTEMPTS),
                base_delay_secs: env_parse(
                    "FOLIO_WEBHOOK_BASE_DELAY_SECS",
                    DEFAULT_WEBHOOK_BASE_DELAY_SECS,
                ),
                retry_schedule_secs,
                poll_interval_secs: env_parse(
                    "FOLIO_WEBHOOK_POLL_INTERVAL_SECS",
                    DEFAULT_WEBHOOK_POLL_INTERVAL_SECS,
                ),
                batch_size: env_parse("FOLIO_WEBHOOK_BATCH_SIZE", DEFAULT_WEBHOOK_BATCH_SIZE),
                max_concurrent_deliveries: env_parse(
                    "FOLIO_WEBHOOK_MAX_CONCURRENT",
                    DEFAULT_WEBHOOK_MAX_CONCURRENT,
                ),
                response_body_limit: env_parse(
                    "FOLIO_WEBHOOK_RESPONSE_BODY_LIMIT",
                    DEFAULT_RESPONSE_BODY_LIMIT,
                ),
            },
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Rewrite the central URL to point at a different database name.
    /// The URL path component is the database name in a Postgres URL.
    pub fn database_url_for(&self, database: &str) -> String {
        match self.central_database_url.rfind('/') {
            Some(idx) => {
                // Keep any query string (e.g. ?sslmode=require).
                let (base, rest) = self.central_database_url.split_at(idx);
                let query = rest.find('?').map(|q| &rest[q..]).unwrap_or("");
                format!("{}/{}{}", base, database, query)
            }
            None => format!("{}/{}", self.central_database_url, database),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_url_for_swaps_db_name() {
        let config = Config {
            central_database_url: "postgres://folio:pw@db.internal:5432/folio_central".to_string(),
            db_max_connections: 20,
            tenant_pool_max_connections: 5,
            central_domains: vec!["folio.test".to_string()],
            server_port: 8080,
            environment: "test".to_string(),
            trial_days: 14,
            backup_dir: "./backups".to_string(),
            webhook: WebhookConfig::default(),
        };
        assert_eq!(
            config.database_url_for("folio_tenant_abc"),
            "postgres://folio:pw@db.internal:5432/folio_tenant_abc"
        );
    }

    #[test]
    fn test_database_url_for_preserves_query() {
        let config = Config {
            central_database_url: "postgres://u@host/central?sslmode=require".to_string(),
            db_max_connections: 20,
            tenant_pool_max_connections: 5,
            central_domains: vec![],
            server_port: 8080,
            environment: "test".to_string(),
            trial_days: 14,
            backup_dir: "./backups".to_string(),
            webhook: WebhookConfig::default(),
        };
        assert_eq!(
            config.database_url_for("folio_tenant_x"),
            "postgres://u@host/folio_tenant_x?sslmode=require"
        );
    }

    #[test]
    fn test_webhook_defaults() {
        let w = WebhookConfig::default();
        assert_eq!(w.timeout_secs, 30);
        assert_eq!(w.max_attempts, 3);
        assert_eq!(w.base_delay_secs, 60);
        assert!(w.retry_schedule_secs.is_none());
        assert_eq!(w.response_body_limit, 4096);
    }
}
