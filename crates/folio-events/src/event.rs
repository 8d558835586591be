//! Domain event types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use folio_core::AppError;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Every domain event the platform emits. The dotted string form is what
/// webhook subscribers filter on and what goes out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EventType {
    PostCreated,
    PostUpdated,
    PostPublished,
    PostDeleted,
    PostScheduled,
    CommentCreated,
    CommentUpdated,
    CommentDeleted,
    CommentApproved,
    UserCreated,
    UserUpdated,
    UserDeleted,
    UserLogin,
    UserLogout,
}

pub const ALL_EVENT_TYPES: &[EventType] = &[
    EventType::PostCreated,
    EventType::PostUpdated,
    EventType::PostPublished,
    EventType::PostDeleted,
    EventType::PostScheduled,
    EventType::CommentCreated,
    EventType::CommentUpdated,
    EventType::CommentDeleted,
    EventType::CommentApproved,
    EventType::UserCreated,
    EventType::UserUpdated,
    EventType::UserDeleted,
    EventType::UserLogin,
    EventType::UserLogout,
];

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::PostCreated => "post.created",
            EventType::PostUpdated => "post.updated",
            EventType::PostPublished => "post.published",
            EventType::PostDeleted => "post.deleted",
            EventType::PostScheduled => "post.scheduled",
            EventType::CommentCreated => "comment.created",
            EventType::CommentUpdated => "comment.updated",
            EventType::CommentDeleted => "comment.deleted",
            EventType::CommentApproved => "comment.approved",
            EventType::UserCreated => "user.created",
            EventType::UserUpdated => "user.updated",
            EventType::UserDeleted => "user.deleted",
            EventType::UserLogin => "user.login",
            EventType::UserLogout => "user.logout",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_EVENT_TYPES
            .iter()
            .copied()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| AppError::InvalidInput(format!("Unknown event type: {}", s)))
    }
}

impl From<EventType> for String {
    fn from(e: EventType) -> Self {
        e.as_str().to_string()
    }
}

impl TryFrom<String> for EventType {
    type Error = AppError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// An emitted domain event. The payload is fully denormalized at emission
/// time, so consumers see the state as of the mutation, not as of
/// delivery.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub event_type: EventType,
    pub payload: JsonValue,
    pub occurred_at: DateTime<Utc>,
}

impl Event {
    pub fn new(event_type: EventType, payload: JsonValue) -> Self {
        Self {
            event_type,
            payload,
            occurred_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trips_through_string_form() {
        for event_type in ALL_EVENT_TYPES {
            let parsed: EventType = event_type.as_str().parse().unwrap();
            assert_eq!(parsed, *event_type);
        }
    }

    #[test]
    fn test_unknown_event_type_is_rejected() {
        assert!("post.viewed".parse::<EventType>().is_err());
        assert!("".parse::<EventType>().is_err());
    }

    #[test]
    fn test_string_forms_are_dotted_and_unique() {
        let mut names: Vec<&str> = ALL_EVENT_TYPES.iter().map(|e| e.as_str()).collect();
        assert!(names.iter().all(|n| n.contains('.')));
        names.sort();
        names.dedup();
        assert_eq!(names.len(), ALL_EVENT_TYPES.len());
    }
}
