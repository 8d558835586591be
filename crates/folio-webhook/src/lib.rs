//! Reliable webhook delivery.
//!
//! Dispatch resolves subscribers and enqueues durable delivery rows; the
//! worker polls for due rows, signs and POSTs the payloads and drives the
//! retry state machine. Delivery is at-least-once: a logical delivery is
//! retried with backoff until it succeeds or exhausts its attempts, and
//! every attempt leaves an immutable log row.

pub mod backoff;
pub mod delivery;
pub mod dispatcher;
pub mod signature;

pub use delivery::{
    DeliveryWorker, HEADER_DELIVERY, HEADER_EVENT, HEADER_SIGNATURE, HEADER_TIMESTAMP,
};
pub use dispatcher::{Dispatcher, WebhookListener};
