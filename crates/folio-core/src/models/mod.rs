pub mod content;
pub mod domain;
pub mod tenant;
pub mod webhook;

pub use content::{Category, Comment, Post, PostStatus, Tag, User, UserRole};
pub use domain::Domain;
pub use tenant::{database_name_for, CreateTenantRequest, Tenant, TenantPlan, TenantResponse};
pub use webhook::{
    truncate_response_body, CreateWebhookRequest, Delivery, UpdateWebhookRequest, Webhook,
    WebhookLog, WebhookLogResponse, WebhookResponse, EVENT_WILDCARD,
};
