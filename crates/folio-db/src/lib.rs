//! Database access for Folio.
//!
//! `central` holds repositories over the shared control-plane database
//! (tenants, domains, the durable webhook delivery queue). `tenant` holds
//! repositories over a single tenant's isolated database; they are handed a
//! tenant pool by the tenancy layer and never see the central connection.

pub mod central;
pub mod tenant;
pub mod transaction;

pub use central::{CentralSchema, DeliveryQueueRepository, DomainRepository, TenantRepository};
pub use tenant::{ContentRepository, WebhookLogRepository, WebhookRepository};
pub use transaction::with_transaction;
