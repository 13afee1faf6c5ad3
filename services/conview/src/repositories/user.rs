//! User repository backed by PostgreSQL

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::{StoreResult, UserStore};
use crate::models::{FriendSummary, NewUser, ProfileUpdate, User};

const USER_COLUMNS: &str = "id, username, password_hash, online, bio, firstname, lastname, \
                            dob, relation, statusvalue, friends, created_at, updated_at";

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn insert(&self, new_user: NewUser) -> StoreResult<Option<User>> {
        info!("Creating new user: {}", new_user.username);

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, username, password_hash)
            VALUES ($1, $2, $3)
            ON CONFLICT (username) DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(new_user.id)
        .bind(&new_user.username)
        .bind(&new_user.password_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn set_online(&self, username: &str, online: bool) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET online = $2, updated_at = now()
            WHERE username = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(username)
        .bind(online)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn update_profile(
        &self,
        username: &str,
        update: &ProfileUpdate,
    ) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET bio = COALESCE($2, bio),
                firstname = COALESCE($3, firstname),
                lastname = COALESCE($4, lastname),
                dob = COALESCE($5, dob),
                relation = COALESCE($6, relation),
                statusvalue = COALESCE($7, statusvalue),
                updated_at = now()
            WHERE username = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(username)
        .bind(&update.bio)
        .bind(&update.firstname)
        .bind(&update.lastname)
        .bind(&update.dob)
        .bind(&update.relation)
        .bind(&update.statusvalue)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn add_friend(&self, username: &str, friend_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET friends = CASE
                    WHEN $2 = ANY(friends) THEN friends
                    ELSE array_append(friends, $2)
                END,
                updated_at = now()
            WHERE username = $1
            "#,
        )
        .bind(username)
        .bind(friend_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_friends(&self, username: &str) -> StoreResult<Option<Vec<FriendSummary>>> {
        let friend_ids: Option<Vec<Uuid>> =
            sqlx::query_scalar("SELECT friends FROM users WHERE username = $1")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;

        let Some(friend_ids) = friend_ids else {
            return Ok(None);
        };

        let friends = sqlx::query_as::<_, FriendSummary>(
            r#"
            SELECT id, username, firstname, lastname, bio, online, statusvalue
            FROM users
            WHERE id = ANY($1)
            ORDER BY array_position($1, id)
            "#,
        )
        .bind(&friend_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(friends))
    }

    async fn health_check(&self) -> bool {
        common::database::health_check(&self.pool).await
    }
}
