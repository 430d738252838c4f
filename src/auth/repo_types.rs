use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,                              // unique user ID
    pub username: String,                      // unique login name
    pub email: String,                         // unique, lowercased
    #[serde(skip_serializing)]
    pub password_hash: String,                 // Argon2 hash, not exposed in JSON
    pub created_at: OffsetDateTime,            // creation timestamp
    pub updated_at: OffsetDateTime,            // set at creation only
    pub last_login: Option<OffsetDateTime>,    // last successful login
}

/// Fields of a user about to be inserted.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

impl NewUser {
    /// Builds the record that will be persisted, with a fresh id and timestamps.
    pub fn into_user(self) -> User {
        let now = OffsetDateTime::now_utc();
        User {
            id: Uuid::new_v4(),
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            created_at: now,
            updated_at: now,
            last_login: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique column already holds this value.
    #[error("{field} already exists")]
    Conflict { field: &'static str },
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}
