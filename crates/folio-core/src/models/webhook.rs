use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;
use validator::Validate;

/// Event filter wildcard: a webhook subscribed to `*` receives every event.
pub const EVENT_WILDCARD: &str = "*";

/// Tenant-scoped webhook subscription (lives in the tenant database).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Webhook {
    pub id: Uuid,
    pub url: String,
    pub signing_secret: Option<String>,
    /// Custom headers added to every delivery, as a string→string map.
    pub headers: JsonValue,
    /// Subscribed event-type names, or `["*"]` for all events.
    pub events: Vec<String>,
    pub is_active: bool,
    pub success_count: i64,
    pub failure_count: i64,
    pub deactivated_at: Option<DateTime<Utc>>,
    pub deactivation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Webhook {
    /// Whether this webhook's filter matches an event type.
    /// Exact match or wildcard; re-checked at delivery time because the
    /// filter may change between enqueue and execution.
    pub fn subscribes_to(&self, event_type: &str) -> bool {
        self.events
            .iter()
            .any(|e| e == EVENT_WILDCARD || e == event_type)
    }
}

/// One immutable row per delivery attempt (tenant database).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WebhookLog {
    pub id: Uuid,
    pub webhook_id: Uuid,
    pub delivery_id: Uuid,
    pub event_type: String,
    pub payload: JsonValue,
    pub status_code: Option<i32>,
    pub response_body: Option<String>,
    pub attempt: i32,
    pub success: bool,
    pub duration_ms: i64,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Durable delivery queue row (central database). One logical delivery;
/// `attempt` is carried in the row and incremented on reschedule so the
/// retry chain survives process restarts.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Delivery {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub webhook_id: Uuid,
    pub event_type: String,
    pub payload: JsonValue,
    pub attempt: i32,
    pub max_attempts: i32,
    pub next_attempt_at: DateTime<Utc>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Truncate a response body for storage in a webhook log row.
pub fn truncate_response_body(body: &str, limit: usize) -> String {
    if body.len() <= limit {
        return body.to_string();
    }
    // Cut on a char boundary; the stored body is diagnostic, not exact.
    let mut end = limit;
    while end > 0 && !body.is_char_boundary(end) {
        end -= 1;
    }
    body[..end].to_string()
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateWebhookRequest {
    #[validate(url(message = "Invalid webhook URL"))]
    #[validate(length(max = 2048, message = "URL must be at most 2048 characters"))]
    pub url: String,
    /// Event-type names or `["*"]`. Empty defaults to the wildcard.
    #[serde(default)]
    pub events: Vec<String>,
    #[validate(length(
        min = 16,
        max = 256,
        message = "Signing secret must be between 16 and 256 characters"
    ))]
    pub signing_secret: Option<String>,
    pub headers: Option<JsonValue>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateWebhookRequest {
    #[validate(url(message = "Invalid webhook URL"))]
    #[validate(length(max = 2048, message = "URL must be at most 2048 characters"))]
    pub url: Option<String>,
    pub events: Option<Vec<String>>,
    #[validate(length(
        min = 16,
        max = 256,
        message = "Signing secret must be between 16 and 256 characters"
    ))]
    pub signing_secret: Option<String>,
    pub headers: Option<JsonValue>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub id: Uuid,
    pub url: String,
    pub events: Vec<String>,
    pub has_signing_secret: bool,
    pub is_active: bool,
    pub success_count: i64,
    pub failure_count: i64,
    pub deactivated_at: Option<DateTime<Utc>>,
    pub deactivation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Webhook> for WebhookResponse {
    fn from(webhook: Webhook) -> Self {
        Self {
            id: webhook.id,
            url: webhook.url,
            events: webhook.events,
            has_signing_secret: webhook.signing_secret.is_some(),
            is_active: webhook.is_active,
            success_count: webhook.success_count,
            failure_count: webhook.failure_count,
            deactivated_at: webhook.deactivated_at,
            deactivation_reason: webhook.deactivation_reason,
            created_at: webhook.created_at,
            updated_at: webhook.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WebhookLogResponse {
    pub id: Uuid,
    pub webhook_id: Uuid,
    pub delivery_id: Uuid,
    pub event_type: String,
    pub status_code: Option<i32>,
    pub attempt: i32,
    pub success: bool,
    pub duration_ms: i64,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<WebhookLog> for WebhookLogResponse {
    fn from(log: WebhookLog) -> Self {
        Self {
            id: log.id,
            webhook_id: log.webhook_id,
            delivery_id: log.delivery_id,
            event_type: log.event_type,
            status_code: log.status_code,
            attempt: log.attempt,
            success: log.success,
            duration_ms: log.duration_ms,
            error_message: log.error_message,
            created_at: log.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn webhook_with_events(events: Vec<&str>) -> Webhook {
        Webhook {
            id: Uuid::new_v4(),
            url: "https://hooks.example.com/inbox".to_string(),
            signing_secret: None,
            headers: serde_json::json!({}),
            events: events.into_iter().map(String::from).collect(),
            is_active: true,
            success_count: 0,
            failure_count: 0,
            deactivated_at: None,
            deactivation_reason: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_subscribes_to_exact_match() {
        let webhook = webhook_with_events(vec!["post.published", "post.deleted"]);
        assert!(webhook.subscribes_to("post.published"));
        assert!(webhook.subscribes_to("post.deleted"));
        assert!(!webhook.subscribes_to("post.created"));
        assert!(!webhook.subscribes_to("comment.created"));
    }

    #[test]
    fn test_subscribes_to_wildcard() {
        let webhook = webhook_with_events(vec!["*"]);
        assert!(webhook.subscribes_to("post.published"));
        assert!(webhook.subscribes_to("user.login"));
    }

    #[test]
    fn test_subscribes_to_empty_filter_matches_nothing() {
        let webhook = webhook_with_events(vec![]);
        assert!(!webhook.subscribes_to("post.published"));
    }

    #[test]
    fn test_truncate_response_body() {
        assert_eq!(truncate_response_body("ok", 4096), "ok");
        let long = "x".repeat(5000);
        let truncated = truncate_response_body(&long, 4096);
        assert_eq!(truncated.len(), 4096);
    }

    #[test]
    fn test_truncate_response_body_char_boundary() {
        // 'é' is two bytes; a limit in the middle must not split it.
        let body = "ééééé";
        let truncated = truncate_response_body(body, 3);
        assert_eq!(truncated, "é");
    }
}
