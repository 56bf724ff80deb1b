use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{Condition, DatabaseConnection, Set, SqlErr};
use uuid::Uuid;

use crate::errors::{ModelError, UniqueField};

/// Durable identity record. Not `Serialize`: it carries the password hash.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub uid: Uuid,
    #[sea_orm(unique)]
    pub username: String,
    #[sea_orm(unique)]
    pub email: String,
    pub password_hash: String,
    pub is_active: bool,
    pub password_changed_at: DateTimeWithTimeZone,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

fn db_err(e: DbErr) -> ModelError {
    ModelError::Db(e.to_string())
}

/// Active account whose email or username equals `identifier`.
pub async fn find_active_by_identifier(db: &DatabaseConnection, identifier: &str) -> Result<Option<Model>, ModelError> {
    Entity::find()
        .filter(
            Condition::any()
                .add(Column::Email.eq(identifier))
                .add(Column::Username.eq(identifier)),
        )
        .filter(Column::IsActive.eq(true))
        .one(db)
        .await
        .map_err(db_err)
}

pub async fn find_active_by_id(db: &DatabaseConnection, uid: Uuid) -> Result<Option<Model>, ModelError> {
    Entity::find_by_id(uid)
        .filter(Column::IsActive.eq(true))
        .one(db)
        .await
        .map_err(db_err)
}

/// Insert a new active user stamped with `now`. Unique-constraint violations surface as [`ModelError::Duplicate`].
pub async fn create(
    db: &DatabaseConnection,
    username: &str,
    email: &str,
    password_hash: &str,
    now: DateTime<Utc>,
) -> Result<Model, ModelError> {
    if !email.contains('@') { return Err(ModelError::Validation("invalid email".into())); }
    if username.trim().is_empty() { return Err(ModelError::Validation("username required".into())); }
    if password_hash.trim().is_empty() { return Err(ModelError::Validation("password hash required".into())); }
    let now: DateTimeWithTimeZone = now.into();
    let am = ActiveModel {
        uid: Set(Uuid::new_v4()),
        username: Set(username.to_string()),
        email: Set(email.to_string()),
        password_hash: Set(password_hash.to_string()),
        is_active: Set(true),
        password_changed_at: Set(now),
        created_at: Set(now),
    };
    am.insert(db).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(msg)) if msg.contains("email") => ModelError::Duplicate(UniqueField::Email),
        Some(SqlErr::UniqueConstraintViolation(_)) => ModelError::Duplicate(UniqueField::Username),
        _ => db_err(e),
    })
}

/// Set a new hash and move `password_changed_at` to `changed_at` in one statement.
///
/// The caller passes the same clock that stamps token `iat`, never the database clock.
pub async fn update_password(
    db: &DatabaseConnection,
    uid: Uuid,
    password_hash: &str,
    changed_at: DateTime<Utc>,
) -> Result<Model, ModelError> {
    if password_hash.trim().is_empty() {
        return Err(ModelError::Validation("password hash required".into()));
    }
    let updated = Entity::update_many()
        .col_expr(Column::PasswordHash, Expr::value(password_hash.to_string()))
        .col_expr(Column::PasswordChangedAt, Expr::value(DateTimeWithTimeZone::from(changed_at)))
        .filter(Column::Uid.eq(uid))
        .exec_with_returning(db)
        .await
        .map_err(db_err)?;
    updated.into_iter().next().ok_or(ModelError::NotFound)
}

/// Flip `is_active`; inactive accounts are invisible to every lookup above.
pub async fn set_active(db: &DatabaseConnection, uid: Uuid, active: bool) -> Result<(), ModelError> {
    Entity::update_many()
        .col_expr(Column::IsActive, Expr::value(active))
        .filter(Column::Uid.eq(uid))
        .exec(db)
        .await
        .map_err(db_err)?;
    Ok(())
}

pub async fn hard_delete(db: &DatabaseConnection, uid: Uuid) -> Result<(), ModelError> {
    Entity::delete_by_id(uid).exec(db).await.map_err(db_err)?;
    Ok(())
}
