//! Post model with its embedded likes and comments

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Post entity as stored
///
/// `author_username` is copied from the author at creation time. Usernames
/// cannot change, so the copy never goes stale.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    #[serde(rename = "author")]
    pub author_id: Uuid,
    pub author_username: String,
    pub content: String,
    #[sqlx(rename = "posted_at")]
    pub timestamp: DateTime<Utc>,
    pub likes: Vec<Uuid>,
    #[sqlx(json)]
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn from_new(new_post: NewPost) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            author_id: new_post.author_id,
            author_username: new_post.author_username,
            content: new_post.content,
            timestamp: now,
            likes: Vec::new(),
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// New post creation payload
#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: Uuid,
    pub author_username: String,
    pub content: String,
}

/// Comment embedded in a post, in insertion order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub author: Uuid,
    pub author_username: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Comment {
    pub fn new(author: Uuid, author_username: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            author,
            author_username: author_username.into(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Author fields expanded into listed posts
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct AuthorSummary {
    pub id: Uuid,
    pub username: String,
    pub firstname: String,
    pub lastname: String,
}

/// Post as returned by feed listings, with the author reference expanded
///
/// `author` is `None` when the referenced user no longer resolves.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: Uuid,
    pub author: Option<AuthorSummary>,
    pub author_username: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub likes: Vec<Uuid>,
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PostView {
    pub fn new(post: Post, author: Option<AuthorSummary>) -> Self {
        Self {
            id: post.id,
            author,
            author_username: post.author_username,
            content: post.content,
            timestamp: post.timestamp,
            likes: post.likes,
            comments: post.comments,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}
