//! Domain services sitting between the HTTP handlers and the stores

pub mod auth;
pub mod posts;
pub mod profile;

pub use auth::AuthService;
pub use posts::{POST_LIST_LIMIT, PostService};
pub use profile::ProfileService;
