//! User repository for cloudshelf.

use uuid::Uuid;

use super::user::{NewUser, User, UserSummary};
use super::DbPool;
use crate::{Result, ShelfError};

/// Repository for user records.
pub struct UserRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new UserRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new user.
    ///
    /// Fails with `Conflict` when the email is already registered.
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        if self.email_exists(&new_user.email).await? {
            return Err(ShelfError::Conflict("email already registered".to_string()));
        }

        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO users (id, email, name, password_hash, image) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&new_user.email)
        .bind(&new_user.name)
        .bind(&new_user.password_hash)
        .bind(&new_user.image)
        .execute(self.pool)
        .await
        .map_err(insert_error)?;

        self.get_by_id(&id)
            .await?
            .ok_or_else(|| ShelfError::NotFound("user".to_string()))
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, name, password_hash, image, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| ShelfError::Database(e.to_string()))?;

        Ok(user)
    }

    /// Get a user by email (case-insensitive).
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, name, password_hash, image, created_at
             FROM users WHERE email = ? COLLATE NOCASE",
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| ShelfError::Database(e.to_string()))?;

        Ok(user)
    }

    /// Get the public profile of a user.
    pub async fn get_summary(&self, id: &str) -> Result<Option<UserSummary>> {
        let summary =
            sqlx::query_as::<_, UserSummary>("SELECT email, name, image FROM users WHERE id = ?")
                .bind(id)
                .fetch_optional(self.pool)
                .await
                .map_err(|e| ShelfError::Database(e.to_string()))?;

        Ok(summary)
    }

    /// List all users, oldest first.
    pub async fn list_all(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, email, name, password_hash, image, created_at
             FROM users ORDER BY created_at, id",
        )
        .fetch_all(self.pool)
        .await
        .map_err(|e| ShelfError::Database(e.to_string()))?;

        Ok(users)
    }

    /// Check whether a user exists.
    pub async fn exists(&self, id: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = ?")
            .bind(id)
            .fetch_one(self.pool)
            .await
            .map_err(|e| ShelfError::Database(e.to_string()))?;

        Ok(count > 0)
    }

    /// Check if an email is already registered (case-insensitive).
    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ? COLLATE NOCASE")
                .bind(email)
                .fetch_one(self.pool)
                .await
                .map_err(|e| ShelfError::Database(e.to_string()))?;

        Ok(count > 0)
    }
}

/// Map an insert failure, reporting a lost race on the email index as `Conflict`.
fn insert_error(e: sqlx::Error) -> ShelfError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            ShelfError::Conflict("email already registered".to_string())
        }
        _ => ShelfError::Database(e.to_string()),
    }
}
