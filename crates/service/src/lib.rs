//! Service layer for authentication and session consistency.
//! - Token issuance and verification, session cache, reset sessions, notifications.
//! - Persistence goes through the `UserRepository` seam; `models` backs the SeaORM impl.
//! - Infrastructure (expiring store, queue) sits behind traits with in-memory twins for tests.

pub mod auth;
pub mod clock;
pub mod errors;
pub mod storage;
