mod content;
mod webhook;
mod webhook_log;

pub use content::ContentRepository;
pub use webhook::WebhookRepository;
pub use webhook_log::WebhookLogRepository;
