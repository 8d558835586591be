//! Webhook-ready payload transforms.
//!
//! Pure functions from domain models to denormalized JSON. They run at
//! emission time and embed related records as summaries, so subscribers
//! never have to dereference foreign keys.

use folio_core::models::{Category, Comment, Post, Tag, User};
use serde_json::{json, Value as JsonValue};

fn author_summary(author: &User) -> JsonValue {
    json!({
        "id": author.id,
        "name": author.name,
        "email": author.email,
        "role": author.role,
    })
}

fn category_summary(category: &Category) -> JsonValue {
    json!({ "id": category.id, "name": category.name, "slug": category.slug })
}

fn tag_summary(tag: &Tag) -> JsonValue {
    json!({ "id": tag.id, "name": tag.name, "slug": tag.slug })
}

pub fn post_payload(
    post: &Post,
    author: &User,
    categories: &[Category],
    tags: &[Tag],
) -> JsonValue {
    json!({
        "post": {
            "id": post.id,
            "title": post.title,
            "slug": post.slug,
            "body": post.body,
            "status": post.status,
            "published_at": post.published_at,
            "created_at": post.created_at,
            "updated_at": post.updated_at,
            "author": author_summary(author),
            "categories": categories.iter().map(category_summary).collect::<Vec<_>>(),
            "tags": tags.iter().map(tag_summary).collect::<Vec<_>>(),
        }
    })
}

pub fn comment_payload(comment: &Comment, post: &Post) -> JsonValue {
    json!({
        "comment": {
            "id": comment.id,
            "author_name": comment.author_name,
            "author_email": comment.author_email,
            "body": comment.body,
            "approved": comment.approved,
            "created_at": comment.created_at,
            "post": {
                "id": post.id,
                "title": post.title,
                "slug": post.slug,
            },
        }
    })
}

pub fn user_payload(user: &User) -> JsonValue {
    json!({ "user": author_summary(user) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use folio_core::models::{PostStatus, UserRole};
    use uuid::Uuid;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Ann Author".to_string(),
            email: "ann@acme.test".to_string(),
            role: UserRole::Author,
            password_hash: "secret-hash".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn post(author_id: Uuid) -> Post {
        Post {
            id: Uuid::new_v4(),
            author_id,
            title: "Hello".to_string(),
            slug: "hello".to_string(),
            body: "First post".to_string(),
            status: PostStatus::Published,
            published_at: Some(Utc::now()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_post_payload_embeds_author_and_taxonomy() {
        let author = user();
        let p = post(author.id);
        let category = Category {
            id: Uuid::new_v4(),
            name: "News".to_string(),
            slug: "news".to_string(),
            created_at: Utc::now(),
        };
        let payload = post_payload(&p, &author, std::slice::from_ref(&category), &[]);

        assert_eq!(payload["post"]["slug"], "hello");
        assert_eq!(payload["post"]["author"]["name"], "Ann Author");
        assert_eq!(payload["post"]["categories"][0]["slug"], "news");
        assert!(payload["post"]["tags"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_payloads_never_leak_password_hashes() {
        let author = user();
        let p = post(author.id);
        let rendered = post_payload(&p, &author, &[], &[]).to_string()
            + &user_payload(&author).to_string();
        assert!(!rendered.contains("secret-hash"));
        assert!(!rendered.contains("password"));
    }

    #[test]
    fn test_comment_payload_embeds_post_summary() {
        let author = user();
        let p = post(author.id);
        let comment = Comment {
            id: Uuid::new_v4(),
            post_id: p.id,
            author_name: "Visitor".to_string(),
            author_email: "v@example.com".to_string(),
            body: "Nice".to_string(),
            approved: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let payload = comment_payload(&comment, &p);
        assert_eq!(payload["comment"]["post"]["title"], "Hello");
        assert_eq!(payload["comment"]["approved"], true);
    }
}
