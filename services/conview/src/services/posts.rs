//! Feed posts, likes and comments

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{Comment, NewPost, Post, PostView, User},
    repositories::{DeleteOutcome, PostStore, UserStore},
    validation::validate_content,
};

/// Maximum number of posts returned by a listing
pub const POST_LIST_LIMIT: usize = 100;

#[derive(Clone)]
pub struct PostService {
    users: Arc<dyn UserStore>,
    posts: Arc<dyn PostStore>,
}

impl PostService {
    pub fn new(users: Arc<dyn UserStore>, posts: Arc<dyn PostStore>) -> Self {
        Self { users, posts }
    }

    async fn author(&self, username: &str) -> ApiResult<User> {
        self.users
            .find_by_username(username)
            .await?
            .ok_or_else(ApiError::user_not_found)
    }

    pub async fn create_post(&self, username: &str, content: &str) -> ApiResult<Post> {
        let content = content.trim();
        if validate_content(content).is_err() {
            return Err(ApiError::Validation(
                "Post content is required (max 1000 characters)".to_string(),
            ));
        }

        let author = self.author(username).await?;
        let post = self
            .posts
            .insert(NewPost {
                author_id: author.id,
                author_username: author.username,
                content: content.to_string(),
            })
            .await?;

        info!("Post {} created by {}", post.id, post.author_username);
        Ok(post)
    }

    /// Newest posts first, capped at [`POST_LIST_LIMIT`]
    pub async fn list_posts(&self, author_username: Option<&str>) -> ApiResult<Vec<PostView>> {
        let author_username = author_username.filter(|name| !name.is_empty());
        Ok(self.posts.list(author_username, POST_LIST_LIMIT).await?)
    }

    /// Delete a post written by `requesting_username`
    pub async fn delete_post(&self, post_id: Uuid, requesting_username: &str) -> ApiResult<()> {
        match self.posts.delete_owned(post_id, requesting_username).await? {
            DeleteOutcome::Deleted => {
                info!("Post {} deleted by {}", post_id, requesting_username);
                Ok(())
            }
            DeleteOutcome::NotFound => Err(ApiError::post_not_found()),
            DeleteOutcome::NotOwner => Err(ApiError::Forbidden(
                "Not authorized to delete this post".to_string(),
            )),
        }
    }

    pub async fn like_post(&self, post_id: Uuid, username: &str) -> ApiResult<Post> {
        let user = self.author(username).await?;
        self.posts
            .add_like(post_id, user.id)
            .await?
            .ok_or_else(ApiError::post_not_found)
    }

    pub async fn comment_on_post(
        &self,
        post_id: Uuid,
        username: &str,
        content: &str,
    ) -> ApiResult<Post> {
        let content = content.trim();
        if validate_content(content).is_err() {
            return Err(ApiError::Validation(
                "Comment content is required (max 1000 characters)".to_string(),
            ));
        }

        let user = self.author(username).await?;
        self.posts
            .add_comment(post_id, Comment::new(user.id, user.username, content))
            .await?
            .ok_or_else(ApiError::post_not_found)
    }
}
