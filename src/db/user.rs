//! User model for cloudshelf.
//!
//! Users are created by the auth layer; the store only needs their identity
//! and public profile.

use serde::Serialize;

/// User entity.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique user ID.
    pub id: String,
    /// Email address (unique, case-insensitive).
    pub email: String,
    /// Display name.
    pub name: String,
    /// Credential hash, owned by the auth layer.
    pub password_hash: Option<String>,
    /// Avatar image URL.
    pub image: Option<String>,
    /// Account creation timestamp.
    pub created_at: String,
}

impl User {
    /// Get the public profile of this user.
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            email: self.email.clone(),
            name: self.name.clone(),
            image: self.image.clone(),
        }
    }
}

/// Public profile fields shown next to items and grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct UserSummary {
    pub email: String,
    pub name: String,
    pub image: Option<String>,
}

/// Data for creating a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Email address.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Credential hash (already hashed by the auth layer).
    pub password_hash: Option<String>,
    /// Avatar image URL.
    pub image: Option<String>,
}

impl NewUser {
    /// Create a new NewUser without credentials or image.
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            password_hash: None,
            image: None,
        }
    }

    /// Set the credential hash.
    pub fn with_password_hash(mut self, hash: impl Into<String>) -> Self {
        self.password_hash = Some(hash.into());
        self
    }

    /// Set the avatar image.
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_builder() {
        let user = NewUser::new("ada@example.com", "Ada")
            .with_password_hash("$argon2id$hash")
            .with_image("https://example.com/ada.png");

        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.name, "Ada");
        assert_eq!(user.password_hash.as_deref(), Some("$argon2id$hash"));
        assert_eq!(user.image.as_deref(), Some("https://example.com/ada.png"));
    }

    #[test]
    fn test_summary_omits_credentials() {
        let user = User {
            id: "u1".to_string(),
            email: "ada@example.com".to_string(),
            name: "Ada".to_string(),
            password_hash: Some("secret".to_string()),
            image: None,
            created_at: "2024-01-01 00:00:00".to_string(),
        };

        let summary = user.summary();
        assert_eq!(summary.email, "ada@example.com");
        assert_eq!(summary.name, "Ada");
        assert!(summary.image.is_none());
    }
}
