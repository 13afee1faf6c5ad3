//! Repositories for database operations
//!
//! Handlers and services reach persistence only through [`UserStore`] and
//! [`PostStore`]. Every mutation is a single conditional statement against
//! the stored document, so concurrent writers never overwrite each other's
//! fields with stale copies.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Comment, FriendSummary, NewPost, NewUser, Post, PostView, ProfileUpdate, User,
};

pub mod memory;
pub mod post;
pub mod user;

pub use memory::MemoryStore;
pub use post::PostRepository;
pub use user::UserRepository;

/// Failure of the underlying store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A write referenced a document that does not exist
    #[error("dangling reference: {0}")]
    DanglingReference(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of an author-scoped delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    NotOwner,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user unless the username is taken; `None` signals the conflict.
    async fn insert(&self, new_user: NewUser) -> StoreResult<Option<User>>;

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    async fn list(&self) -> StoreResult<Vec<User>>;

    /// Set the online flag; `None` when the user does not exist.
    async fn set_online(&self, username: &str, online: bool) -> StoreResult<Option<User>>;

    async fn update_profile(
        &self,
        username: &str,
        update: &ProfileUpdate,
    ) -> StoreResult<Option<User>>;

    /// Add `friend_id` to the user's friends unless already present.
    /// Returns `false` when the user does not exist.
    async fn add_friend(&self, username: &str, friend_id: Uuid) -> StoreResult<bool>;

    /// Friends in insertion order; `None` when the user does not exist.
    async fn list_friends(&self, username: &str) -> StoreResult<Option<Vec<FriendSummary>>>;

    /// Whether the store currently answers queries.
    async fn health_check(&self) -> bool;
}

#[async_trait]
pub trait PostStore: Send + Sync {
    /// Insert a post; the author must exist.
    async fn insert(&self, new_post: NewPost) -> StoreResult<Post>;

    /// Newest first, at most `limit`, optionally restricted to one author.
    async fn list(&self, author_username: Option<&str>, limit: usize)
    -> StoreResult<Vec<PostView>>;

    /// Delete the post only if `author_username` wrote it.
    async fn delete_owned(&self, id: Uuid, author_username: &str) -> StoreResult<DeleteOutcome>;

    /// Add a like unless `user_id` already liked the post; `None` when the post is missing.
    async fn add_like(&self, id: Uuid, user_id: Uuid) -> StoreResult<Option<Post>>;

    /// Append a comment; `None` when the post is missing.
    async fn add_comment(&self, id: Uuid, comment: Comment) -> StoreResult<Option<Post>>;
}
