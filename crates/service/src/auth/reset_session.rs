//! Single-use password-recovery secrets.
//!
//! `verify` and `consume` are separate calls: two concurrent resets with the same link can
//! both pass `verify` before either consumes it.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::storage::ExpiringStore;

const KEY_PREFIX: &str = "reset:";
/// 32 random bytes, base64url without padding.
pub const SESSION_ID_LEN: usize = 43;

pub fn is_well_formed(session_id: &str) -> bool {
    session_id.len() == SESSION_ID_LEN
        && session_id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

#[derive(Clone)]
pub struct ResetSessionManager {
    store: Arc<dyn ExpiringStore>,
    ttl_secs: u64,
}

impl ResetSessionManager {
    pub fn new(store: Arc<dyn ExpiringStore>, ttl_secs: u64) -> Self {
        Self { store, ttl_secs }
    }

    fn key(session_id: &str) -> String { format!("{KEY_PREFIX}{session_id}") }

    pub async fn create(&self, uid: Uuid) -> Result<String, ServiceError> {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        let session_id = URL_SAFE_NO_PAD.encode(bytes);
        self.store.set_ex(&Self::key(&session_id), &uid.to_string(), self.ttl_secs).await?;
        Ok(session_id)
    }

    /// Owner of a live session. Ids of the wrong shape never reach the store.
    pub async fn verify(&self, session_id: &str) -> Result<Option<Uuid>, ServiceError> {
        if !is_well_formed(session_id) {
            return Ok(None);
        }
        let raw = self.store.get(&Self::key(session_id)).await?;
        Ok(raw.and_then(|s| Uuid::parse_str(&s).ok()))
    }

    pub async fn consume(&self, session_id: &str) -> Result<(), ServiceError> {
        if !is_well_formed(session_id) {
            return Ok(());
        }
        self.store.delete(&Self::key(session_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStore;
    use chrono::Duration;

    #[tokio::test]
    async fn ids_are_43_urlsafe_chars_and_unique() {
        let mgr = ResetSessionManager::new(Arc::new(MemoryStore::default()), 900);
        let uid = Uuid::new_v4();
        let a = mgr.create(uid).await.unwrap();
        let b = mgr.create(uid).await.unwrap();
        assert_eq!(a.len(), 43);
        assert!(is_well_formed(&a));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn verify_is_repeatable_until_consumed() {
        let mgr = ResetSessionManager::new(Arc::new(MemoryStore::default()), 900);
        let uid = Uuid::new_v4();
        let id = mgr.create(uid).await.unwrap();
        assert_eq!(mgr.verify(&id).await.unwrap(), Some(uid));
        assert_eq!(mgr.verify(&id).await.unwrap(), Some(uid));
        mgr.consume(&id).await.unwrap();
        assert_eq!(mgr.verify(&id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn sessions_expire_after_ttl() {
        let clock = Arc::new(ManualClock::default());
        let mgr = ResetSessionManager::new(Arc::new(MemoryStore::new(clock.clone())), 900);
        let id = mgr.create(Uuid::new_v4()).await.unwrap();
        clock.advance(Duration::seconds(901));
        assert_eq!(mgr.verify(&id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn malformed_ids_skip_the_store() {
        let store = Arc::new(MemoryStore::default());
        store.set_failing(true);
        let mgr = ResetSessionManager::new(store, 900);
        assert_eq!(mgr.verify("short").await.unwrap(), None);
        assert_eq!(mgr.verify(&"=".repeat(43)).await.unwrap(), None);
        assert_eq!(mgr.verify("").await.unwrap(), None);
    }
}
