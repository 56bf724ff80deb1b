use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::domain::{NewUser, User};
use super::errors::AuthError;

/// Durable user store. Lookups only ever see active accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Match on email or username.
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, AuthError>;
    async fn find_by_id(&self, uid: Uuid) -> Result<Option<User>, AuthError>;
    /// `AuthError::Conflict` when the email or username is taken.
    async fn create(&self, new_user: NewUser) -> Result<User, AuthError>;
    /// Replace the hash and move `password_changed_at` to `changed_at`, atomically.
    async fn update_password(&self, uid: Uuid, password_hash: &str, changed_at: DateTime<Utc>) -> Result<User, AuthError>;
}

/// Simple in-memory mock repository for tests and doc examples
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::auth::errors::ConflictField;

    /// Per-method call counts.
    #[derive(Debug, Default)]
    pub struct Calls {
        pub find_by_identifier: AtomicUsize,
        pub find_by_id: AtomicUsize,
        pub create: AtomicUsize,
        pub update_password: AtomicUsize,
    }

    impl Calls {
        pub fn lookups(&self) -> usize {
            self.find_by_identifier.load(Ordering::SeqCst) + self.find_by_id.load(Ordering::SeqCst)
        }
    }

    #[derive(Default)]
    pub struct MockUserRepository {
        users: Mutex<HashMap<Uuid, User>>,
        pub calls: Calls,
    }

    impl MockUserRepository {
        pub fn deactivate(&self, uid: Uuid) {
            if let Some(u) = self.users.lock().unwrap().get_mut(&uid) {
                u.is_active = false;
            }
        }

        /// Raw record, active or not.
        pub fn get(&self, uid: Uuid) -> Option<User> {
            self.users.lock().unwrap().get(&uid).cloned()
        }
    }

    #[async_trait]
    impl UserRepository for MockUserRepository {
        async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, AuthError> {
            self.calls.find_by_identifier.fetch_add(1, Ordering::SeqCst);
            let users = self.users.lock().unwrap();
            Ok(users
                .values()
                .find(|u| u.is_active && (u.email == identifier || u.username == identifier))
                .cloned())
        }

        async fn find_by_id(&self, uid: Uuid) -> Result<Option<User>, AuthError> {
            self.calls.find_by_id.fetch_add(1, Ordering::SeqCst);
            let users = self.users.lock().unwrap();
            Ok(users.get(&uid).filter(|u| u.is_active).cloned())
        }

        async fn create(&self, new_user: NewUser) -> Result<User, AuthError> {
            self.calls.create.fetch_add(1, Ordering::SeqCst);
            let mut users = self.users.lock().unwrap();
            if users.values().any(|u| u.email == new_user.email) {
                return Err(AuthError::Conflict(ConflictField::Email));
            }
            if users.values().any(|u| u.username == new_user.username) {
                return Err(AuthError::Conflict(ConflictField::Username));
            }
            let user = User {
                uid: Uuid::new_v4(),
                username: new_user.username,
                email: new_user.email,
                password_hash: new_user.password_hash,
                is_active: true,
                password_changed_at: new_user.created_at,
                created_at: new_user.created_at,
            };
            users.insert(user.uid, user.clone());
            Ok(user)
        }

        async fn update_password(&self, uid: Uuid, password_hash: &str, changed_at: DateTime<Utc>) -> Result<User, AuthError> {
            self.calls.update_password.fetch_add(1, Ordering::SeqCst);
            let mut users = self.users.lock().unwrap();
            let user = users.get_mut(&uid).ok_or(AuthError::NotFound("User not found"))?;
            user.password_hash = password_hash.to_string();
            user.password_changed_at = changed_at;
            Ok(user.clone())
        }
    }
}
