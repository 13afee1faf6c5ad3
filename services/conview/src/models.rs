//! Domain models for users, posts and the payloads that create or change them

pub mod post;
pub mod user;

pub use post::{AuthorSummary, Comment, NewPost, Post, PostView};
pub use user::{FriendSummary, NewUser, ProfileUpdate, Relation, User};
