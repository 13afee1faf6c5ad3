//! User model and related functionality

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// User account with its profile fields
///
/// The password hash is loaded with the record but never serialized.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub online: bool,
    pub bio: String,
    pub firstname: String,
    pub lastname: String,
    pub dob: String,
    pub relation: String,
    pub statusvalue: String,
    /// Outgoing friend references; the other side is not updated.
    pub friends: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a freshly registered user with default profile fields
    pub fn from_new(new_user: NewUser) -> Self {
        let now = Utc::now();
        Self {
            id: new_user.id,
            username: new_user.username,
            password_hash: new_user.password_hash,
            online: false,
            bio: String::new(),
            firstname: String::new(),
            lastname: String::new(),
            dob: String::new(),
            relation: Relation::default().as_str().to_string(),
            statusvalue: "Online".to_string(),
            friends: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite the fields present in `update`, leaving the others untouched
    pub fn apply(&mut self, update: &ProfileUpdate) {
        let fields = [
            (&mut self.bio, &update.bio),
            (&mut self.firstname, &update.firstname),
            (&mut self.lastname, &update.lastname),
            (&mut self.dob, &update.dob),
            (&mut self.relation, &update.relation),
            (&mut self.statusvalue, &update.statusvalue),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                field.clone_from(value);
            }
        }
        self.updated_at = Utc::now();
    }

    pub fn summary(&self) -> FriendSummary {
        FriendSummary {
            id: self.id,
            username: self.username.clone(),
            firstname: self.firstname.clone(),
            lastname: self.lastname.clone(),
            bio: self.bio.clone(),
            online: self.online,
            statusvalue: self.statusvalue.clone(),
        }
    }
}

/// New user creation payload, password already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
}

impl NewUser {
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            password_hash: password_hash.into(),
        }
    }
}

/// Partial profile update; absent fields keep their stored value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub bio: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub dob: Option<String>,
    pub relation: Option<String>,
    pub statusvalue: Option<String>,
}

/// Subset of a user's profile shown in friend lists
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct FriendSummary {
    pub id: Uuid,
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub bio: String,
    pub online: bool,
    pub statusvalue: String,
}

/// Relationship status shown on a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Relation {
    #[default]
    Single,
    InARelationship,
    Married,
    Complicated,
    Unspecified,
}

impl Relation {
    pub const ALL: [Relation; 5] = [
        Relation::Single,
        Relation::InARelationship,
        Relation::Married,
        Relation::Complicated,
        Relation::Unspecified,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Relation::Single => "Single",
            Relation::InARelationship => "In a relationship",
            Relation::Married => "Married",
            Relation::Complicated => "Complicated",
            Relation::Unspecified => "",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|relation| relation.as_str() == value)
    }
}
