//! Key/value storage with per-entry expiry, shared by the session cache and reset sessions.

use async_trait::async_trait;

use crate::errors::ServiceError;

pub mod memory;
pub mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

#[async_trait]
pub trait ExpiringStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, ServiceError>;
    /// Unconditional overwrite with a fresh TTL.
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), ServiceError>;
    async fn delete(&self, key: &str) -> Result<(), ServiceError>;
}
