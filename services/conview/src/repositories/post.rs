//! Post repository backed by PostgreSQL

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow, types::Json};
use tracing::info;
use uuid::Uuid;

use super::{DeleteOutcome, PostStore, StoreError, StoreResult};
use crate::models::{AuthorSummary, Comment, NewPost, Post, PostView};

const POST_COLUMNS: &str = "id, author_id, author_username, content, posted_at, likes, comments, \
                            created_at, updated_at";

/// Post repository
#[derive(Clone)]
pub struct PostRepository {
    pool: PgPool,
}

impl PostRepository {
    /// Create a new post repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn post_view_from_row(row: &PgRow) -> Result<PostView, sqlx::Error> {
    let comments: Json<Vec<Comment>> = row.try_get("comments")?;

    let author = match row.try_get::<Option<Uuid>, _>("user_id")? {
        Some(id) => Some(AuthorSummary {
            id,
            username: row.try_get("username")?,
            firstname: row.try_get("firstname")?,
            lastname: row.try_get("lastname")?,
        }),
        None => None,
    };

    Ok(PostView {
        id: row.try_get("id")?,
        author,
        author_username: row.try_get("author_username")?,
        content: row.try_get("content")?,
        timestamp: row.try_get("posted_at")?,
        likes: row.try_get("likes")?,
        comments: comments.0,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl PostStore for PostRepository {
    async fn insert(&self, new_post: NewPost) -> StoreResult<Post> {
        info!("Creating post for user: {}", new_post.author_username);

        let post = Post::from_new(new_post);
        let result = sqlx::query_as::<_, Post>(&format!(
            r#"
            INSERT INTO posts (id, author_id, author_username, content, posted_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5, $5)
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(post.id)
        .bind(post.author_id)
        .bind(&post.author_username)
        .bind(&post.content)
        .bind(post.timestamp)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(post) => Ok(post),
            Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => Err(
                StoreError::DanglingReference(format!("post author {}", post.author_id)),
            ),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(
        &self,
        author_username: Option<&str>,
        limit: usize,
    ) -> StoreResult<Vec<PostView>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows = sqlx::query(
            r#"
            SELECT p.id, p.author_username, p.content, p.posted_at, p.likes, p.comments,
                   p.created_at, p.updated_at,
                   u.id AS user_id, u.username, u.firstname, u.lastname
            FROM posts p
            LEFT JOIN users u ON u.id = p.author_id
            WHERE $1::text IS NULL OR p.author_username = $1
            ORDER BY p.posted_at DESC
            LIMIT $2
            "#,
        )
        .bind(author_username)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let posts = rows
            .iter()
            .map(post_view_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(posts)
    }

    async fn delete_owned(&self, id: Uuid, author_username: &str) -> StoreResult<DeleteOutcome> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1 AND author_username = $2")
            .bind(id)
            .bind(author_username)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            info!("Deleted post {} by {}", id, author_username);
            return Ok(DeleteOutcome::Deleted);
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM posts WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(if exists {
            DeleteOutcome::NotOwner
        } else {
            DeleteOutcome::NotFound
        })
    }

    async fn add_like(&self, id: Uuid, user_id: Uuid) -> StoreResult<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(&format!(
            r#"
            UPDATE posts
            SET likes = CASE
                    WHEN $2 = ANY(likes) THEN likes
                    ELSE array_append(likes, $2)
                END,
                updated_at = now()
            WHERE id = $1
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(post)
    }

    async fn add_comment(&self, id: Uuid, comment: Comment) -> StoreResult<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(&format!(
            r#"
            UPDATE posts
            SET comments = comments || $2::jsonb,
                updated_at = now()
            WHERE id = $1
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(Json(vec![comment]))
        .fetch_optional(&self.pool)
        .await?;

        Ok(post)
    }
}
