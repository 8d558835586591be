//! Domain events and the listener registry.
//!
//! Mutations raise typed events with denormalized payloads built at
//! emission time; listeners consume them asynchronously without ever
//! failing the originating operation.

pub mod bus;
pub mod event;
pub mod payload;

pub use bus::{EventBus, EventListener};
pub use event::{Event, EventType, ALL_EVENT_TYPES};
pub use payload::{comment_payload, post_payload, user_payload};
