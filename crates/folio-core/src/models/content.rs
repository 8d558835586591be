//! Tenant-database content entities: users, posts, categories, tags and
//! comments. These live in each tenant's isolated database and feed the
//! limits engine and the webhook payload transforms.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

/// Closed role enumeration. Permission checks go through the capability
/// table below instead of comparing role strings at call sites.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Editor,
    Author,
}

/// Capabilities a role grants inside a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ManagePosts,
    PublishPosts,
    ManageOwnPosts,
    ModerateComments,
    ManageUsers,
    ManageWebhooks,
    ManageSettings,
}

/// Static role → capabilities table, resolved once.
pub fn role_capabilities(role: UserRole) -> &'static [Capability] {
    match role {
        UserRole::Admin => &[
            Capability::ManagePosts,
            Capability::PublishPosts,
            Capability::ManageOwnPosts,
            Capability::ModerateComments,
            Capability::ManageUsers,
            Capability::ManageWebhooks,
            Capability::ManageSettings,
        ],
        UserRole::Editor => &[
            Capability::ManagePosts,
            Capability::PublishPosts,
            Capability::ManageOwnPosts,
            Capability::ModerateComments,
        ],
        UserRole::Author => &[Capability::ManageOwnPosts],
    }
}

impl UserRole {
    pub fn can(&self, capability: Capability) -> bool {
        role_capabilities(*self).contains(&capability)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "post_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Published,
    Scheduled,
}

impl Display for PostStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            PostStatus::Draft => write!(f, "draft"),
            PostStatus::Published => write!(f, "published"),
            PostStatus::Scheduled => write!(f, "scheduled"),
        }
    }
}

impl FromStr for PostStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PostStatus::Draft),
            "published" => Ok(PostStatus::Published),
            "scheduled" => Ok(PostStatus::Scheduled),
            _ => Err(anyhow::anyhow!("Invalid post status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub slug: String,
    pub body: String,
    pub status: PostStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_name: String,
    pub author_email: String,
    pub body: String,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_capability_table() {
        assert!(UserRole::Admin.can(Capability::ManageUsers));
        assert!(UserRole::Admin.can(Capability::ManageWebhooks));
        assert!(UserRole::Editor.can(Capability::PublishPosts));
        assert!(!UserRole::Editor.can(Capability::ManageUsers));
        assert!(UserRole::Author.can(Capability::ManageOwnPosts));
        assert!(!UserRole::Author.can(Capability::PublishPosts));
        assert!(!UserRole::Author.can(Capability::ModerateComments));
    }

    #[test]
    fn test_post_status_round_trip() {
        for s in ["draft", "published", "scheduled"] {
            let status: PostStatus = s.parse().unwrap();
            assert_eq!(status.to_string(), s);
        }
        assert!("archived".parse::<PostStatus>().is_err());
    }
}
