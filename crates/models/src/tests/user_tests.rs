use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use migration::MigratorTrait;
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::db::connect;
use crate::errors::{ModelError, UniqueField};
use crate::user;

/// Connect and migrate, or `None` when no database is reachable.
async fn try_db() -> Option<DatabaseConnection> {
    if std::env::var("SKIP_DB_TESTS").is_ok() || std::env::var("DATABASE_URL").is_err() {
        eprintln!("skip: database tests disabled");
        return None;
    }
    let db = match connect().await {
        Ok(db) => db,
        Err(e) => {
            eprintln!("skip: cannot connect to db: {}", e);
            return None;
        }
    };
    if let Err(e) = migration::Migrator::up(&db, None).await {
        eprintln!("skip: migrate up failed: {}", e);
        return None;
    }
    Some(db)
}

fn unique_name() -> String {
    format!("u{}", Uuid::new_v4().simple())
}

#[tokio::test]
async fn create_and_lookup_by_either_identifier() -> Result<()> {
    let Some(db) = try_db().await else { return Ok(()) };
    let name = unique_name();
    let email = format!("{name}@example.com");

    let created = user::create(&db, &name, &email, "$argon2id$stub", Utc::now()).await?;
    assert!(created.is_active);
    assert_eq!(created.password_changed_at, created.created_at);

    let by_email = user::find_active_by_identifier(&db, &email).await?.expect("by email");
    let by_name = user::find_active_by_identifier(&db, &name).await?.expect("by username");
    assert_eq!(by_email.uid, created.uid);
    assert_eq!(by_name.uid, created.uid);

    user::hard_delete(&db, created.uid).await?;
    Ok(())
}

#[tokio::test]
async fn duplicate_email_reports_email_field() -> Result<()> {
    let Some(db) = try_db().await else { return Ok(()) };
    let name = unique_name();
    let email = format!("{name}@example.com");
    let created = user::create(&db, &name, &email, "$argon2id$stub", Utc::now()).await?;

    let err = user::create(&db, &unique_name(), &email, "$argon2id$stub", Utc::now()).await.unwrap_err();
    assert!(matches!(err, ModelError::Duplicate(UniqueField::Email)), "got {err:?}");

    let err = user::create(&db, &name, &format!("{}@example.com", unique_name()), "$argon2id$stub", Utc::now()).await.unwrap_err();
    assert!(matches!(err, ModelError::Duplicate(UniqueField::Username)), "got {err:?}");

    user::hard_delete(&db, created.uid).await?;
    Ok(())
}

#[tokio::test]
async fn update_password_bumps_watermark() -> Result<()> {
    let Some(db) = try_db().await else { return Ok(()) };
    let name = unique_name();
    let created = user::create(&db, &name, &format!("{name}@example.com"), "$argon2id$old", Utc::now()).await?;
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let updated = user::update_password(&db, created.uid, "$argon2id$new", Utc::now()).await?;
    assert_eq!(updated.password_hash, "$argon2id$new");
    assert!(updated.password_changed_at > created.password_changed_at);

    let missing = user::update_password(&db, Uuid::new_v4(), "$argon2id$new", Utc::now()).await;
    assert!(matches!(missing, Err(ModelError::NotFound)));

    user::hard_delete(&db, created.uid).await?;
    Ok(())
}

#[tokio::test]
async fn watermark_is_the_caller_timestamp_not_the_database_clock() -> Result<()> {
    let Some(db) = try_db().await else { return Ok(()) };
    let name = unique_name();
    // far from the database clock in both directions
    let registered = DateTime::from_timestamp(1_000_000_000, 0).unwrap_or_default();
    let created = user::create(&db, &name, &format!("{name}@example.com"), "$argon2id$old", registered).await?;
    assert_eq!(created.password_changed_at.timestamp(), registered.timestamp());
    assert_eq!(created.created_at.timestamp(), registered.timestamp());

    let reset_at = Utc::now() + Duration::days(365);
    let updated = user::update_password(&db, created.uid, "$argon2id$new", reset_at).await?;
    assert_eq!(updated.password_changed_at.timestamp(), reset_at.timestamp());
    assert_eq!(updated.created_at.timestamp(), registered.timestamp());

    user::hard_delete(&db, created.uid).await?;
    Ok(())
}

#[tokio::test]
async fn inactive_accounts_are_invisible() -> Result<()> {
    let Some(db) = try_db().await else { return Ok(()) };
    let name = unique_name();
    let created = user::create(&db, &name, &format!("{name}@example.com"), "$argon2id$stub", Utc::now()).await?;
    user::set_active(&db, created.uid, false).await?;

    assert!(user::find_active_by_id(&db, created.uid).await?.is_none());
    assert!(user::find_active_by_identifier(&db, &name).await?.is_none());

    user::hard_delete(&db, created.uid).await?;
    Ok(())
}
