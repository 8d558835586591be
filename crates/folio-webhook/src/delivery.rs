//! Delivery worker.
//!
//! Polls the durable queue for due deliveries, re-enters the owning
//! tenant's context, re-fetches the webhook and executes the HTTP POST.
//! Webhook state may have changed between enqueue and execution, so a
//! missing, inactive or no-longer-matching webhook is a silent skip. One
//! log row is written per attempt no matter the outcome.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use chrono::Utc;
use folio_core::config::WebhookConfig;
use folio_core::models::{truncate_response_body, Delivery, Webhook};
use folio_core::AppError;
use folio_db::{DeliveryQueueRepository, TenantRepository};
use folio_tenancy::{TenantContext, TenantPools, TenantSession};
use reqwest::Client;
use sqlx::PgPool;
use tokio::sync::mpsc;
use tokio::time::interval;

use crate::backoff::next_delay;
use crate::signature;

pub const HEADER_EVENT: &str = "X-Folio-Event";
pub const HEADER_DELIVERY: &str = "X-Folio-Delivery";
pub const HEADER_TIMESTAMP: &str = "X-Folio-Timestamp";
pub const HEADER_SIGNATURE: &str = "X-Folio-Signature";

/// Outcome of one HTTP attempt. Always recorded, never propagated as an
/// error to the code that raised the event.
#[derive(Debug)]
struct AttemptOutcome {
    status_code: Option<i32>,
    response_body: Option<String>,
    error: Option<String>,
    duration_ms: i64,
    success: bool,
}

#[derive(Clone)]
pub struct DeliveryWorker {
    queue: DeliveryQueueRepository,
    tenants: TenantRepository,
    pools: TenantPools,
    http_client: Client,
    config: WebhookConfig,
    shutdown_tx: mpsc::Sender<()>,
}

impl DeliveryWorker {
    /// Build the worker and spawn its polling loop.
    pub fn start(
        central: PgPool,
        pools: TenantPools,
        config: WebhookConfig,
    ) -> Result<Self, AppError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .context("Failed to create HTTP client for webhook deliveries")?;

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let worker = Self {
            queue: DeliveryQueueRepository::new(central.clone()),
            tenants: TenantRepository::new(central),
            pools,
            http_client,
            config,
            shutdown_tx,
        };

        let looped = worker.clone();
        tokio::spawn(async move {
            looped.worker_loop(shutdown_rx).await;
        });

        Ok(worker)
    }

    pub async fn shutdown(&self) {
        if let Err(e) = self.shutdown_tx.send(()).await {
            tracing::warn!(error = %e, "Failed to signal delivery worker shutdown");
        }
    }

    async fn worker_loop(self, mut shutdown_rx: mpsc::Receiver<()>) {
        let mut poll = interval(Duration::from_secs(self.config.poll_interval_secs));

        tracing::info!(
            poll_interval_secs = self.config.poll_interval_secs,
            batch_size = self.config.batch_size,
            "Webhook delivery worker started"
        );

        loop {
            tokio::select! {
                _ = poll.tick() => {
                    if let Err(e) = self.process_batch().await {
                        tracing::error!(error = %e, "Error processing delivery batch");
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Webhook delivery worker shutting down");
                    break;
                }
            }
        }
    }

    /// Claim and execute one batch of due deliveries. Deliveries run
    /// concurrently up to the configured limit; retry chains stay
    /// sequential because a row is only rescheduled after its attempt
    /// finishes.
    async fn process_batch(&self) -> Result<(), AppError> {
        let due = self.queue.claim_due(self.config.batch_size).await?;
        if due.is_empty() {
            return Ok(());
        }

        tracing::info!(count = due.len(), "Processing webhook deliveries");

        let semaphore = Arc::new(tokio::sync::Semaphore::new(
            self.config.max_concurrent_deliveries,
        ));
        let mut handles = Vec::with_capacity(due.len());

        for delivery in due {
            let worker = self.clone();
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };

            handles.push(tokio::spawn(async move {
                let delivery_id = delivery.id;
                let result = worker.process_delivery(delivery).await;
                drop(permit);

                if let Err(e) = result {
                    tracing::error!(
                        delivery_id = %delivery_id,
                        error = %e,
                        "Failed to process delivery"
                    );
                }
            }));
        }

        for handle in handles {
            let _ = handle.await;
        }

        Ok(())
    }

    #[tracing::instrument(skip(self, delivery), fields(delivery_id = %delivery.id, webhook_id = %delivery.webhook_id, attempt = delivery.attempt))]
    async fn process_delivery(&self, delivery: Delivery) -> Result<(), AppError> {
        let Some(tenant) = self.tenants.get_by_id(delivery.tenant_id).await? else {
            tracing::debug!(tenant_id = %delivery.tenant_id, "Tenant gone, dropping delivery");
            return self.queue.remove(delivery.id).await;
        };
        if !tenant.is_active {
            tracing::debug!(tenant_id = %tenant.id, "Tenant suspended, dropping delivery");
            return self.queue.remove(delivery.id).await;
        }

        // Each delivery task is its own unit of work with its own session.
        let session = TenantSession::new();
        let ctx = session.activate(self.pools.context_for(&tenant).await?)?;

        let Some(webhook) = ctx.webhooks().get_by_id(delivery.webhook_id).await? else {
            tracing::debug!("Webhook deleted since enqueue, dropping delivery");
            return self.queue.remove(delivery.id).await;
        };
        if !webhook.is_active || !webhook.subscribes_to(&delivery.event_type) {
            tracing::debug!("Webhook inactive or filter changed, dropping delivery");
            return self.queue.remove(delivery.id).await;
        }

        let outcome = self.attempt(&webhook, &delivery).await;
        self.record_attempt(&ctx, &webhook, &delivery, &outcome)
            .await?;

        if outcome.success {
            tracing::info!(
                status_code = outcome.status_code,
                duration_ms = outcome.duration_ms,
                "Webhook delivered"
            );
            return self.queue.remove(delivery.id).await;
        }

        let error = outcome
            .error
            .clone()
            .or_else(|| outcome.status_code.map(|s| format!("HTTP status {}", s)))
            .unwrap_or_else(|| "Delivery failed".to_string());

        if delivery.attempt >= delivery.max_attempts {
            tracing::error!(
                max_attempts = delivery.max_attempts,
                error = %error,
                "Webhook delivery exhausted all attempts"
            );
            return self.queue.remove(delivery.id).await;
        }

        let next_attempt_at = Utc::now() + next_delay(&self.config, delivery.attempt);
        self.queue
            .reschedule(delivery.id, delivery.attempt + 1, next_attempt_at, Some(&error))
            .await?;
        tracing::warn!(
            next_attempt = %next_attempt_at,
            error = %error,
            "Webhook delivery failed, rescheduled"
        );
        Ok(())
    }

    /// Execute one HTTP POST. Network and serialization failures become
    /// part of the outcome, not errors.
    async fn attempt(&self, webhook: &Webhook, delivery: &Delivery) -> AttemptOutcome {
        let body = match serde_json::to_string(&delivery.payload) {
            Ok(body) => body,
            Err(e) => {
                return AttemptOutcome {
                    status_code: None,
                    response_body: None,
                    error: Some(format!("Payload serialization failed: {}", e)),
                    duration_ms: 0,
                    success: false,
                }
            }
        };

        let mut request = self
            .http_client
            .post(&webhook.url)
            .header("Content-Type", "application/json")
            .header("User-Agent", "Folio-Webhook/1.0")
            .header(HEADER_EVENT, delivery.event_type.as_str())
            .header(HEADER_DELIVERY, delivery.id.to_string())
            .header(HEADER_TIMESTAMP, Utc::now().timestamp().to_string());

        if let Some(headers) = webhook.headers.as_object() {
            for (name, value) in headers {
                if let Some(value) = value.as_str() {
                    request = request.header(name.as_str(), value);
                }
            }
        }

        if let Some(secret) = &webhook.signing_secret {
            match signature::sign(body.as_bytes(), secret) {
                Ok(sig) => request = request.header(HEADER_SIGNATURE, sig),
                Err(e) => {
                    return AttemptOutcome {
                        status_code: None,
                        response_body: None,
                        error: Some(format!("Signing failed: {}", e)),
                        duration_ms: 0,
                        success: false,
                    }
                }
            }
        }

        let started = Instant::now();
        match request.body(body).send().await {
            Ok(response) => {
                let status_code = response.status().as_u16() as i32;
                let response_body = response.text().await.unwrap_or_default();
                AttemptOutcome {
                    status_code: Some(status_code),
                    response_body: Some(truncate_response_body(
                        &response_body,
                        self.config.response_body_limit,
                    )),
                    error: None,
                    duration_ms: started.elapsed().as_millis() as i64,
                    success: (200..300).contains(&status_code),
                }
            }
            Err(e) => AttemptOutcome {
                status_code: None,
                response_body: None,
                error: Some(e.to_string()),
                duration_ms: started.elapsed().as_millis() as i64,
                success: false,
            },
        }
    }

    async fn record_attempt(
        &self,
        ctx: &TenantContext,
        webhook: &Webhook,
        delivery: &Delivery,
        outcome: &AttemptOutcome,
    ) -> Result<(), AppError> {
        ctx.webhook_logs()
            .record_attempt(
                webhook.id,
                delivery.id,
                &delivery.event_type,
                &delivery.payload,
                outcome.status_code,
                outcome.response_body.as_deref(),
                delivery.attempt,
                outcome.success,
                outcome.duration_ms,
                outcome.error.as_deref(),
            )
            .await?;
        ctx.webhooks()
            .record_outcome(webhook.id, outcome.success)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use folio_core::Config;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use uuid::Uuid;

    fn test_webhook(url: String, secret: Option<&str>) -> Webhook {
        Webhook {
            id: Uuid::new_v4(),
            url,
            signing_secret: secret.map(str::to_string),
            headers: json!({"X-Custom": "folio-test"}),
            events: vec!["post.published".to_string()],
            is_active: true,
            success_count: 0,
            failure_count: 0,
            deactivated_at: None,
            deactivation_reason: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn test_delivery(webhook_id: Uuid) -> Delivery {
        Delivery {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            webhook_id,
            event_type: "post.published".to_string(),
            payload: json!({"post": {"slug": "hello"}}),
            attempt: 1,
            max_attempts: 3,
            next_attempt_at: Utc::now(),
            last_error: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn test_worker() -> DeliveryWorker {
        let config = Config {
            central_database_url: "postgres://folio@localhost/folio_central".to_string(),
            db_max_connections: 5,
            tenant_pool_max_connections: 2,
            central_domains: vec!["localhost".to_string()],
            server_port: 8080,
            environment: "test".to_string(),
            trial_days: 14,
            backup_dir: "./backups".to_string(),
            webhook: folio_core::config::WebhookConfig::default(),
        };
        // connect_lazy builds a pool without touching the network.
        let central = PgPool::connect_lazy(&config.central_database_url).expect("lazy pool");
        let pools = TenantPools::new(config.clone());
        let (shutdown_tx, _shutdown_rx) = mpsc::channel(1);
        DeliveryWorker {
            queue: DeliveryQueueRepository::new(central.clone()),
            tenants: TenantRepository::new(central),
            pools,
            http_client: Client::builder()
                .timeout(Duration::from_secs(2))
                .build()
                .expect("client"),
            config: config.webhook,
            shutdown_tx,
        }
    }

    /// Serve exactly one HTTP request on a local socket, capture it, and
    /// answer with the given status line.
    async fn one_shot_server(status_line: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.expect("accept");
            let mut buf = vec![0u8; 16384];
            let n = stream.read(&mut buf).await.expect("read");
            let request = String::from_utf8_lossy(&buf[..n]).to_string();
            let response = format!("{}\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok", status_line);
            stream.write_all(response.as_bytes()).await.expect("write");
            request
        });
        (format!("http://{}", addr), handle)
    }

    #[tokio::test]
    async fn test_reschedule_call_matches_queue_signature() {
        // The failure path hands the queue the composed error text; the
        // future is built but never awaited, so no connection is attempted.
        let worker = test_worker();
        let error = "HTTP status 500".to_string();
        fn assert_send<T: Send>(_: T) {}
        assert_send(worker.queue.reschedule(
            Uuid::new_v4(),
            2,
            Utc::now() + next_delay(&worker.config, 1),
            Some(&error),
        ));
    }

    #[tokio::test]
    async fn test_attempt_succeeds_on_200_and_sends_headers() {
        let (url, server) = one_shot_server("HTTP/1.1 200 OK").await;
        let worker = test_worker();
        let webhook = test_webhook(url, Some("whsec_test_secret"));
        let delivery = test_delivery(webhook.id);

        let outcome = worker.attempt(&webhook, &delivery).await;
        assert!(outcome.success);
        assert_eq!(outcome.status_code, Some(200));
        assert_eq!(outcome.response_body.as_deref(), Some("ok"));
        assert!(outcome.error.is_none());

        let request = server.await.expect("server");
        assert!(request.contains("POST / HTTP/1.1"));
        assert!(request.to_lowercase().contains("x-folio-event: post.published"));
        assert!(request.to_lowercase().contains(&format!(
            "x-folio-delivery: {}",
            delivery.id
        )));
        assert!(request.to_lowercase().contains("x-folio-signature: v1="));
        assert!(request.to_lowercase().contains("x-custom: folio-test"));
        assert!(request.contains(r#"{"post":{"slug":"hello"}}"#));
    }

    #[tokio::test]
    async fn test_attempt_fails_on_500() {
        let (url, server) = one_shot_server("HTTP/1.1 500 Internal Server Error").await;
        let worker = test_worker();
        let webhook = test_webhook(url, None);
        let delivery = test_delivery(webhook.id);

        let outcome = worker.attempt(&webhook, &delivery).await;
        assert!(!outcome.success);
        assert_eq!(outcome.status_code, Some(500));

        let request = server.await.expect("server");
        // No secret configured, so no signature header goes out.
        assert!(!request.to_lowercase().contains("x-folio-signature"));
    }

    #[tokio::test]
    async fn test_attempt_records_connection_errors() {
        let worker = test_worker();
        // Nothing listens on this port.
        let webhook = test_webhook("http://127.0.0.1:1/hook".to_string(), None);
        let delivery = test_delivery(webhook.id);

        let outcome = worker.attempt(&webhook, &delivery).await;
        assert!(!outcome.success);
        assert!(outcome.status_code.is_none());
        assert!(outcome.error.is_some());
    }
}
