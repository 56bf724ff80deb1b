use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use super::domain::SessionProjection;
use crate::errors::ServiceError;
use crate::storage::ExpiringStore;

/// Read-through cache of [`SessionProjection`], keyed by the bare uid.
#[derive(Clone)]
pub struct SessionCache {
    store: Arc<dyn ExpiringStore>,
    ttl_secs: u64,
}

impl SessionCache {
    pub fn new(store: Arc<dyn ExpiringStore>, ttl_secs: u64) -> Self {
        Self { store, ttl_secs }
    }

    /// Miss, expiry and undecodable entries all read as `None`.
    pub async fn get(&self, uid: Uuid) -> Result<Option<SessionProjection>, ServiceError> {
        let Some(raw) = self.store.get(&uid.to_string()).await? else { return Ok(None) };
        match serde_json::from_str(&raw) {
            Ok(projection) => Ok(Some(projection)),
            Err(e) => {
                warn!(%uid, error = %e, "cache_entry_undecodable");
                Ok(None)
            }
        }
    }

    pub async fn set(&self, uid: Uuid, projection: &SessionProjection) -> Result<(), ServiceError> {
        let raw = serde_json::to_string(projection)?;
        self.store.set_ex(&uid.to_string(), &raw, self.ttl_secs).await
    }
}
