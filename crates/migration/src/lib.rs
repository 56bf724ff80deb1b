//! Migrator for the `users` table, applied in order at startup or from tests.
pub use sea_orm_migration::prelude::*;

mod m20250830_000001_create_users;
mod m20250920_000002_add_password_changed_at;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250830_000001_create_users::Migration),
            Box::new(m20250920_000002_add_password_changed_at::Migration),
        ]
    }
}
