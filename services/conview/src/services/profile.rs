//! Profile reads and updates, friend lists

use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    error::{ApiError, ApiResult},
    models::{FriendSummary, ProfileUpdate, User},
    repositories::UserStore,
    validation::validate_profile,
};

#[derive(Clone)]
pub struct ProfileService {
    users: Arc<dyn UserStore>,
}

impl ProfileService {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    pub async fn get_profile(&self, username: &str) -> ApiResult<User> {
        self.users
            .find_by_username(username)
            .await?
            .ok_or_else(ApiError::user_not_found)
    }

    pub async fn list_users(&self) -> ApiResult<Vec<User>> {
        Ok(self.users.list().await?)
    }

    /// Overwrite only the fields present in `update`
    pub async fn update_profile(&self, username: &str, update: &ProfileUpdate) -> ApiResult<User> {
        if let Err(reason) = validate_profile(update) {
            debug!("Rejected profile update for {}: {}", username, reason);
            return Err(ApiError::Validation("Invalid profile data".to_string()));
        }

        let user = self
            .users
            .update_profile(username, update)
            .await?
            .ok_or_else(ApiError::user_not_found)?;

        info!("Profile updated for user: {}", username);
        Ok(user)
    }

    /// Add `friend_username` to the user's friends
    ///
    /// The edge is one-directional: the friend's own list is left alone.
    pub async fn add_friend(&self, username: &str, friend_username: &str) -> ApiResult<()> {
        let friend = self
            .users
            .find_by_username(friend_username)
            .await?
            .ok_or_else(ApiError::user_not_found)?;

        if !self.users.add_friend(username, friend.id).await? {
            return Err(ApiError::user_not_found());
        }

        info!("{} added {} as a friend", username, friend_username);
        Ok(())
    }

    pub async fn list_friends(&self, username: &str) -> ApiResult<Vec<FriendSummary>> {
        self.users
            .list_friends(username)
            .await?
            .ok_or_else(ApiError::user_not_found)
    }
}
