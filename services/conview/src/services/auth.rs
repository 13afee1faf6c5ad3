//! Registration, login and logout

use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    error::{ApiError, ApiResult},
    models::{NewUser, User},
    password,
    repositories::UserStore,
    validation::{validate_password, validate_username},
};

const REGISTRATION_RULES: &str = "Invalid input. Username must be 3-30 alphanumeric characters, \
                                  password at least 6 characters.";
const CREDENTIALS_REQUIRED: &str = "Username and password are required";

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Create an account with a freshly hashed password
    pub async fn register(&self, username: &str, password: &str) -> ApiResult<User> {
        let username = username.trim();
        info!("Registration attempt for user: {}", username);

        if let Err(reason) = validate_username(username).and(validate_password(password)) {
            debug!("Rejected registration for {:?}: {}", username, reason);
            return Err(ApiError::Validation(REGISTRATION_RULES.to_string()));
        }

        if self.users.find_by_username(username).await?.is_some() {
            return Err(username_taken());
        }

        let password_hash = hash_blocking(password.to_string()).await?;
        let user = self
            .users
            .insert(NewUser::new(username, password_hash))
            .await?
            .ok_or_else(username_taken)?;

        info!("Registered user: {}", user.username);
        Ok(user)
    }

    /// Check credentials and mark the user online
    ///
    /// An unknown username and a wrong password fail identically.
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<User> {
        let username = username.trim();
        info!("Login attempt for user: {}", username);

        if username.is_empty() || password.is_empty() {
            return Err(ApiError::Validation(CREDENTIALS_REQUIRED.to_string()));
        }

        let user = self.users.find_by_username(username).await?;
        let password = password.to_string();

        let Some(user) = user else {
            run_blocking(move || password::verify_against_dummy(&password)).await?;
            return Err(ApiError::InvalidCredentials);
        };

        let stored_hash = user.password_hash.clone();
        let matches =
            run_blocking(move || password::verify_password(&password, &stored_hash)).await?;
        if !matches {
            return Err(ApiError::InvalidCredentials);
        }

        self.users
            .set_online(&user.username, true)
            .await?
            .ok_or(ApiError::InvalidCredentials)
    }

    /// Mark the user offline; unknown or missing usernames are ignored
    pub async fn logout(&self, username: Option<&str>) -> ApiResult<()> {
        let Some(username) = username.filter(|name| !name.is_empty()) else {
            return Ok(());
        };

        if self.users.set_online(username, false).await?.is_some() {
            info!("User logged out: {}", username);
        }
        Ok(())
    }
}

fn username_taken() -> ApiError {
    ApiError::Conflict("Username already exists".to_string())
}

async fn hash_blocking(password: String) -> ApiResult<String> {
    run_blocking(move || password::hash_password(&password))
        .await?
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {}", e)))
}

async fn run_blocking<T, F>(work: F) -> ApiResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(format!("Blocking task failed: {}", e)))
}
