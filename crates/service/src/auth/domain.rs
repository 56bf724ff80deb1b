use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Durable identity record as the auth flows see it.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub uid: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_active: bool,
    pub password_changed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload; the hash is computed before it reaches the store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    /// Also the initial `password_changed_at`.
    pub created_at: DateTime<Utc>,
}

/// Credential-free view of a user, cached and returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionProjection {
    pub uid: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub password_changed_at: DateTime<Utc>,
}

impl From<&User> for SessionProjection {
    fn from(u: &User) -> Self {
        Self {
            uid: u.uid,
            username: u.username.clone(),
            email: u.email.clone(),
            created_at: u.created_at,
            password_changed_at: u.password_changed_at,
        }
    }
}

/// Registration input
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Login input; `identifier` is an email or a username.
#[derive(Debug, Clone)]
pub struct LoginInput {
    pub identifier: String,
    pub password: String,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResetPasswordInput {
    pub session_id: String,
    pub new_password: String,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Result of register and login.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: SessionProjection,
    pub tokens: TokenPair,
}
