//! Demo accounts and posts for local development
//!
//! Seeding is idempotent: existing accounts are left untouched and posts are
//! only written for accounts created by this run.

use std::collections::HashSet;

use tracing::info;

use crate::{
    error::{ApiError, ApiResult},
    models::{NewUser, ProfileUpdate},
    password,
    state::AppState,
};

pub const DEMO_PASSWORD: &str = "password123";

struct DemoUser {
    username: &'static str,
    bio: &'static str,
    firstname: &'static str,
    lastname: &'static str,
    dob: &'static str,
    relation: &'static str,
    statusvalue: &'static str,
    online: bool,
}

const DEMO_USERS: [DemoUser; 3] = [
    DemoUser {
        username: "Alice",
        bio: "Love reading and music",
        firstname: "Alice",
        lastname: "Johnson",
        dob: "1995-03-15",
        relation: "Single",
        statusvalue: "Reading a great book!",
        online: true,
    },
    DemoUser {
        username: "Bob",
        bio: "Aspiring developer",
        firstname: "Bob",
        lastname: "Smith",
        dob: "1998-07-22",
        relation: "Single",
        statusvalue: "Coding all day",
        online: false,
    },
    DemoUser {
        username: "NotesGroup",
        bio: "Share your notes here",
        firstname: "Notes",
        lastname: "Group",
        dob: "2020-01-01",
        relation: "",
        statusvalue: "Group for sharing notes",
        online: true,
    },
];

const DEMO_POSTS: [(&str, &str); 4] = [
    ("Alice", "Just finished reading an amazing book! 📚"),
    ("Bob", "Learning Rust and PostgreSQL today. Exciting stuff!"),
    ("Alice", "Anyone have music recommendations?"),
    ("NotesGroup", "Welcome to the notes sharing group!"),
];

/// Summary of one seeding run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub users_created: usize,
    pub posts_created: usize,
}

/// Create the demo accounts, their mutual friendships and their posts
pub async fn seed_demo_data(state: &AppState) -> ApiResult<SeedReport> {
    let users = state.users.clone();
    let mut report = SeedReport::default();
    let mut created = HashSet::new();

    for demo in &DEMO_USERS {
        if users.find_by_username(demo.username).await?.is_some() {
            info!("Demo user {} already exists, skipping", demo.username);
            continue;
        }

        let password_hash = tokio::task::spawn_blocking(|| password::hash_password(DEMO_PASSWORD))
            .await
            .map_err(|e| ApiError::Internal(format!("Blocking task failed: {}", e)))?
            .map_err(|e| ApiError::Internal(format!("Failed to hash password: {}", e)))?;

        if users
            .insert(NewUser::new(demo.username, password_hash))
            .await?
            .is_none()
        {
            continue;
        }

        let profile = ProfileUpdate {
            bio: Some(demo.bio.to_string()),
            firstname: Some(demo.firstname.to_string()),
            lastname: Some(demo.lastname.to_string()),
            dob: Some(demo.dob.to_string()),
            relation: Some(demo.relation.to_string()),
            statusvalue: Some(demo.statusvalue.to_string()),
        };
        users.update_profile(demo.username, &profile).await?;
        users.set_online(demo.username, demo.online).await?;

        info!("Created demo user: {}", demo.username);
        created.insert(demo.username);
        report.users_created += 1;
    }

    let mut accounts = Vec::with_capacity(DEMO_USERS.len());
    for demo in &DEMO_USERS {
        if let Some(user) = users.find_by_username(demo.username).await? {
            accounts.push(user);
        }
    }

    for user in accounts
        .iter()
        .filter(|user| created.contains(user.username.as_str()))
    {
        for friend in accounts.iter().filter(|friend| friend.id != user.id) {
            users.add_friend(&user.username, friend.id).await?;
        }
    }

    for (username, content) in DEMO_POSTS {
        if !created.contains(username) {
            continue;
        }
        let Some(author) = accounts.iter().find(|user| user.username == username) else {
            continue;
        };

        state
            .posts
            .create_post(&author.username, content)
            .await?;
        report.posts_created += 1;
    }

    info!(
        "Seeded {} users and {} posts",
        report.users_created, report.posts_created
    );
    Ok(report)
}
