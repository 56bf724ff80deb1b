//! Persistence models for the auth service (SeaORM entities and query helpers).

pub mod errors;
pub mod db;
pub mod user;

#[cfg(test)]
mod tests;
