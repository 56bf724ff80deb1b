use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use moka::future::Cache;

use super::ExpiringStore;
use crate::clock::{Clock, SystemClock};
use crate::errors::ServiceError;

#[derive(Clone)]
struct Entry {
    value: String,
    expires_at: DateTime<Utc>,
}

/// In-process store for single-node runs and tests.
///
/// Expiry is judged against the injected [`Clock`], so a `ManualClock` can age entries
/// without sleeping.
///
/// ```
/// use service::storage::{ExpiringStore, MemoryStore};
/// let store = MemoryStore::default();
/// tokio_test::block_on(store.set_ex("k", "v", 60)).unwrap();
/// assert_eq!(tokio_test::block_on(store.get("k")).unwrap().as_deref(), Some("v"));
/// ```
pub struct MemoryStore {
    cache: Cache<String, Entry>,
    clock: Arc<dyn Clock>,
    writes: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            cache: Cache::builder().max_capacity(100_000).build(),
            clock,
            writes: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    /// Number of successful `set_ex` calls so far.
    pub fn writes(&self) -> usize { self.writes.load(Ordering::SeqCst) }

    /// Make every operation fail, to simulate an unreachable backend.
    pub fn set_failing(&self, failing: bool) { self.failing.store(failing, Ordering::SeqCst); }

    fn check(&self) -> Result<(), ServiceError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ServiceError::Storage("memory store unavailable".into()));
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self { Self::new(Arc::new(SystemClock)) }
}

/// `now + ttl_secs`, saturating at the latest representable instant.
fn expiry(now: DateTime<Utc>, ttl_secs: u64) -> DateTime<Utc> {
    i64::try_from(ttl_secs)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[async_trait]
impl ExpiringStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, ServiceError> {
        self.check()?;
        match self.cache.get(key).await {
            Some(entry) if entry.expires_at > self.clock.now() => Ok(Some(entry.value)),
            Some(_) => {
                self.cache.invalidate(key).await;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), ServiceError> {
        self.check()?;
        let entry = Entry { value: value.to_string(), expires_at: expiry(self.clock.now(), ttl_secs) };
        self.cache.insert(key.to_string(), entry).await;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), ServiceError> {
        self.check()?;
        self.cache.invalidate(key).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[tokio::test]
    async fn entries_expire_on_the_injected_clock() {
        let clock = Arc::new(ManualClock::default());
        let store = MemoryStore::new(clock.clone());
        store.set_ex("a", "1", 900).await.unwrap();

        clock.advance(Duration::seconds(899));
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));

        clock.advance(Duration::seconds(1));
        assert_eq!(store.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_overwrites_and_refreshes_ttl() {
        let clock = Arc::new(ManualClock::default());
        let store = MemoryStore::new(clock.clone());
        store.set_ex("a", "1", 10).await.unwrap();
        clock.advance(Duration::seconds(8));
        store.set_ex("a", "2", 10).await.unwrap();
        clock.advance(Duration::seconds(8));
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("2"));
        assert_eq!(store.writes(), 2);
    }

    #[tokio::test]
    async fn huge_ttls_saturate_instead_of_overflowing() {
        let clock = Arc::new(ManualClock::default());
        let store = MemoryStore::new(clock.clone());
        for ttl in [i64::MAX as u64 / 1000 + 1, i64::MAX as u64, u64::MAX] {
            store.set_ex("a", "1", ttl).await.unwrap();
            assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));
        }
        assert_eq!(expiry(clock.now(), u64::MAX), DateTime::<Utc>::MAX_UTC);
        assert_eq!(expiry(clock.now(), 60), clock.now() + Duration::seconds(60));
    }

    #[tokio::test]
    async fn failing_store_reports_errors() {
        let store = MemoryStore::default();
        store.set_failing(true);
        assert!(store.get("a").await.is_err());
        assert!(store.set_ex("a", "1", 1).await.is_err());
        store.set_failing(false);
        store.delete("a").await.unwrap();
    }
}
