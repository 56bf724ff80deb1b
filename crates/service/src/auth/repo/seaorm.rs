use chrono::{DateTime, Utc};
use models::errors::{ModelError, UniqueField};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::auth::domain::{NewUser, User};
use crate::auth::errors::{AuthError, ConflictField};
use crate::auth::repository::UserRepository;

pub struct SeaOrmUserRepository {
    pub db: DatabaseConnection,
}

impl SeaOrmUserRepository {
    pub fn new(db: DatabaseConnection) -> Self { Self { db } }
}

fn to_user(m: models::user::Model) -> User {
    User {
        uid: m.uid,
        username: m.username,
        email: m.email,
        password_hash: m.password_hash,
        is_active: m.is_active,
        password_changed_at: m.password_changed_at.with_timezone(&Utc),
        created_at: m.created_at.with_timezone(&Utc),
    }
}

fn map_err(e: ModelError) -> AuthError {
    match e {
        ModelError::Duplicate(UniqueField::Email) => AuthError::Conflict(ConflictField::Email),
        ModelError::Duplicate(UniqueField::Username) => AuthError::Conflict(ConflictField::Username),
        ModelError::NotFound => AuthError::NotFound("User not found"),
        other => AuthError::Repository(other.to_string()),
    }
}

#[async_trait::async_trait]
impl UserRepository for SeaOrmUserRepository {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, AuthError> {
        let found = models::user::find_active_by_identifier(&self.db, identifier).await.map_err(map_err)?;
        Ok(found.map(to_user))
    }

    async fn find_by_id(&self, uid: Uuid) -> Result<Option<User>, AuthError> {
        let found = models::user::find_active_by_id(&self.db, uid).await.map_err(map_err)?;
        Ok(found.map(to_user))
    }

    async fn create(&self, new_user: NewUser) -> Result<User, AuthError> {
        let created = models::user::create(
            &self.db,
            &new_user.username,
            &new_user.email,
            &new_user.password_hash,
            new_user.created_at,
        )
            .await
            .map_err(map_err)?;
        Ok(to_user(created))
    }

    async fn update_password(&self, uid: Uuid, password_hash: &str, changed_at: DateTime<Utc>) -> Result<User, AuthError> {
        let updated = models::user::update_password(&self.db, uid, password_hash, changed_at).await.map_err(map_err)?;
        Ok(to_user(updated))
    }
}
