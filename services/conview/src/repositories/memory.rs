//! In-process store implementing both [`UserStore`] and [`PostStore`]
//!
//! Used by the test suite and for running the service without PostgreSQL.
//! Each operation holds the lock for its whole read-modify-write, matching
//! the single-statement guarantees of the database adapters.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DeleteOutcome, PostStore, StoreError, StoreResult, UserStore};
use crate::models::{
    AuthorSummary, Comment, FriendSummary, NewPost, NewUser, Post, PostView, ProfileUpdate, User,
};

#[derive(Default)]
struct Documents {
    users: HashMap<Uuid, User>,
    usernames: HashMap<String, Uuid>,
    posts: HashMap<Uuid, Post>,
}

impl Documents {
    fn user_mut(&mut self, username: &str) -> Option<&mut User> {
        let id = self.usernames.get(username)?;
        self.users.get_mut(id)
    }
}

/// Memory-backed document store, cheap to clone
#[derive(Clone, Default)]
pub struct MemoryStore {
    documents: Arc<RwLock<Documents>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert(&self, new_user: NewUser) -> StoreResult<Option<User>> {
        let mut documents = self.documents.write().await;
        if documents.usernames.contains_key(&new_user.username) {
            return Ok(None);
        }

        let user = User::from_new(new_user);
        documents.usernames.insert(user.username.clone(), user.id);
        documents.users.insert(user.id, user.clone());
        Ok(Some(user))
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let documents = self.documents.read().await;
        Ok(documents
            .usernames
            .get(username)
            .and_then(|id| documents.users.get(id))
            .cloned())
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        let documents = self.documents.read().await;
        let mut users: Vec<User> = documents.users.values().cloned().collect();
        users.sort_by_key(|user| user.created_at);
        Ok(users)
    }

    async fn set_online(&self, username: &str, online: bool) -> StoreResult<Option<User>> {
        let mut documents = self.documents.write().await;
        Ok(documents.user_mut(username).map(|user| {
            user.online = online;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn update_profile(
        &self,
        username: &str,
        update: &ProfileUpdate,
    ) -> StoreResult<Option<User>> {
        let mut documents = self.documents.write().await;
        Ok(documents.user_mut(username).map(|user| {
            user.apply(update);
            user.clone()
        }))
    }

    async fn add_friend(&self, username: &str, friend_id: Uuid) -> StoreResult<bool> {
        let mut documents = self.documents.write().await;
        let Some(user) = documents.user_mut(username) else {
            return Ok(false);
        };

        if !user.friends.contains(&friend_id) {
            user.friends.push(friend_id);
            user.updated_at = Utc::now();
        }
        Ok(true)
    }

    async fn list_friends(&self, username: &str) -> StoreResult<Option<Vec<FriendSummary>>> {
        let documents = self.documents.read().await;
        let Some(user) = documents
            .usernames
            .get(username)
            .and_then(|id| documents.users.get(id))
        else {
            return Ok(None);
        };

        Ok(Some(
            user.friends
                .iter()
                .filter_map(|id| documents.users.get(id))
                .map(User::summary)
                .collect(),
        ))
    }

    async fn health_check(&self) -> bool {
        true
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn insert(&self, new_post: NewPost) -> StoreResult<Post> {
        let mut documents = self.documents.write().await;
        if !documents.users.contains_key(&new_post.author_id) {
            return Err(StoreError::DanglingReference(format!(
                "post author {}",
                new_post.author_id
            )));
        }

        let post = Post::from_new(new_post);
        documents.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn list(
        &self,
        author_username: Option<&str>,
        limit: usize,
    ) -> StoreResult<Vec<PostView>> {
        let documents = self.documents.read().await;
        let mut posts: Vec<&Post> = documents
            .posts
            .values()
            .filter(|post| author_username.is_none_or(|name| post.author_username == name))
            .collect();
        posts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        Ok(posts
            .into_iter()
            .take(limit)
            .map(|post| {
                let author = documents
                    .users
                    .get(&post.author_id)
                    .map(|user| AuthorSummary {
                        id: user.id,
                        username: user.username.clone(),
                        firstname: user.firstname.clone(),
                        lastname: user.lastname.clone(),
                    });
                PostView::new(post.clone(), author)
            })
            .collect())
    }

    async fn delete_owned(&self, id: Uuid, author_username: &str) -> StoreResult<DeleteOutcome> {
        let mut documents = self.documents.write().await;
        let owned = documents
            .posts
            .get(&id)
            .map(|post| post.author_username == author_username);
        let outcome = match owned {
            None => DeleteOutcome::NotFound,
            Some(false) => DeleteOutcome::NotOwner,
            Some(true) => {
                documents.posts.remove(&id);
                DeleteOutcome::Deleted
            }
        };
        Ok(outcome)
    }

    async fn add_like(&self, id: Uuid, user_id: Uuid) -> StoreResult<Option<Post>> {
        let mut documents = self.documents.write().await;
        Ok(documents.posts.get_mut(&id).map(|post| {
            if !post.likes.contains(&user_id) {
                post.likes.push(user_id);
                post.updated_at = Utc::now();
            }
            post.clone()
        }))
    }

    async fn add_comment(&self, id: Uuid, comment: Comment) -> StoreResult<Option<Post>> {
        let mut documents = self.documents.write().await;
        Ok(documents.posts.get_mut(&id).map(|post| {
            post.comments.push(comment);
            post.updated_at = Utc::now();
            post.clone()
        }))
    }
}
