use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::{sync::RwLock, time::Instant};
use warden_core::{CacheStore, Error, Result};

#[derive(Debug)]
struct CachedHash {
    fields: HashMap<String, Vec<u8>>,
    expires_at: Instant,
}

/// In-process [`CacheStore`] with the same key-level expiry and glob
/// matching as the Redis store.
#[derive(Default, Clone)]
pub struct HashMapCacheStore {
    hashes: Arc<RwLock<HashMap<String, CachedHash>>>,
    unavailable: Arc<AtomicBool>,
}

impl HashMapCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail, as an unreachable cache would.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn field_count(&self, key: &str) -> usize {
        let now = Instant::now();
        self.hashes
            .read()
            .await
            .get(key)
            .filter(|hash| hash.expires_at > now)
            .map_or(0, |hash| hash.fields.len())
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::unexpected("cache", "cache is unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for HashMapCacheStore {
    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>> {
        self.check_available()?;
        let now = Instant::now();

        Ok(self
            .hashes
            .read()
            .await
            .get(key)
            .filter(|hash| hash.expires_at > now)
            .and_then(|hash| hash.fields.get(field).cloned()))
    }

    async fn hash_set(&self, key: &str, field: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        self.check_available()?;
        let now = Instant::now();
        let mut hashes = self.hashes.write().await;

        let hash = hashes.entry(key.to_string()).or_insert_with(|| CachedHash {
            fields: HashMap::new(),
            expires_at: now,
        });
        if hash.expires_at <= now {
            hash.fields.clear();
        }
        hash.fields.insert(field.to_string(), value);
        hash.expires_at = now + ttl;

        Ok(())
    }

    async fn hash_find(&self, key: &str, pattern: &str) -> Result<Option<Vec<u8>>> {
        self.check_available()?;
        let pattern = compile(pattern)?;
        let now = Instant::now();

        Ok(self
            .hashes
            .read()
            .await
            .get(key)
            .filter(|hash| hash.expires_at > now)
            .and_then(|hash| {
                hash.fields
                    .iter()
                    .find(|(field, _)| pattern.matches(field))
                    .map(|(_, value)| value.clone())
            }))
    }

    async fn hash_delete_matching(&self, key: &str, pattern: &str) -> Result<u64> {
        self.check_available()?;
        let pattern = compile(pattern)?;
        let mut hashes = self.hashes.write().await;

        let Some(hash) = hashes.get_mut(key) else {
            return Ok(0);
        };
        let before = hash.fields.len();
        hash.fields.retain(|field, _| !pattern.matches(field));

        Ok((before - hash.fields.len()) as u64)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.check_available()?;
        self.hashes.write().await.remove(key);
        Ok(())
    }
}

/// Redis-style glob: `*` matches any run of characters, `?` exactly one.
fn compile(pattern: &str) -> Result<glob::Pattern> {
    glob::Pattern::new(pattern).map_err(|e| Error::unexpected("compile cache pattern", e))
}
