use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, StoreError, User};

/// Persistence for user records. Handlers only see this trait, so the
/// Postgres pool and the in-memory store are interchangeable.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    /// Match `login` against the username, or against the email case-insensitively.
    /// A username match wins over an email match.
    async fn find_by_login(&self, login: &str) -> Result<Option<User>, StoreError>;
    async fn insert(&self, new_user: NewUser) -> Result<User, StoreError>;
    /// Stamp `last_login` with the current time and return it.
    async fn touch_last_login(&self, id: Uuid) -> Result<OffsetDateTime, StoreError>;
}

const USER_COLUMNS: &str = "id, username, email, password_hash, created_at, updated_at, last_login";

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn find_where(&self, clause: &str, value: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {clause}");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(value)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.find_where("username = $1", username).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.find_where("email = lower($1)", email).await
    }

    async fn find_by_login(&self, login: &str) -> Result<Option<User>, StoreError> {
        self.find_where(
            "username = $1 OR email = lower($1) ORDER BY (username = $1) DESC LIMIT 1",
            login,
        )
        .await
    }

    async fn insert(&self, new_user: NewUser) -> Result<User, StoreError> {
        let user = new_user.into_user();
        let sql = format!(
            r#"
            INSERT INTO users (id, username, email, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.created_at)
            .bind(user.updated_at)
            .fetch_one(&self.db)
            .await?;
        Ok(user)
    }

    async fn touch_last_login(&self, id: Uuid) -> Result<OffsetDateTime, StoreError> {
        let stamped = sqlx::query_scalar::<_, OffsetDateTime>(
            r#"
            UPDATE users
            SET last_login = now()
            WHERE id = $1
            RETURNING last_login
            "#,
        )
        .bind(id)
        .fetch_one(&self.db)
        .await?;
        Ok(stamped)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return StoreError::Conflict {
                    field: conflict_field(db_err.constraint()),
                };
            }
        }
        StoreError::Backend(e.into())
    }
}

/// Maps a violated unique constraint to the column it guards.
fn conflict_field(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some(c) if c.contains("email") => "email",
        _ => "username",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_field_follows_constraint_name() {
        assert_eq!(conflict_field(Some("users_email_key")), "email");
        assert_eq!(conflict_field(Some("users_username_key")), "username");
        assert_eq!(conflict_field(None), "username");
    }

    #[test]
    fn non_database_errors_are_backend_failures() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Backend(_)));
    }

    #[test]
    fn migration_names_the_constraints() {
        let sql = include_str!("../../migrations/0001_create_users.sql");
        assert!(sql.contains("CONSTRAINT users_email_key UNIQUE (email)"));
        assert!(sql.contains("CONSTRAINT users_username_key UNIQUE (username)"));
    }
}
