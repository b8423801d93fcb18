use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_core::{Clock, CacheStore, Identity, IdentityId, IdentityRepository, Result, Username};

/// Hash holding every cached identity, under `{id}` and `{id}-{username}`.
pub const IDENTITIES_CACHE_KEY: &str = "identities";

/// Key of the cached user profile owned by the profile service.
pub fn profile_cache_key(id: IdentityId) -> String {
    format!("user-management:{id}")
}

/// Cached value. The store's own TTL covers the whole hash, so each entry
/// carries its own expiry.
#[derive(Serialize, Deserialize)]
struct CachedIdentity {
    expires_at: DateTime<Utc>,
    identity: Identity,
}

/// Read-through cache for identities.
///
/// The cache is an optimisation only: any cache fault is logged and the
/// call falls through to the inner repository.
pub struct CachedIdentityRepository<R> {
    inner: R,
    cache: Arc<dyn CacheStore>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<R: IdentityRepository> CachedIdentityRepository<R> {
    pub fn new(inner: R, cache: Arc<dyn CacheStore>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner,
            cache,
            ttl,
            clock,
        }
    }

    /// Return the cached identity under `field`, or load it, cache it and
    /// return it.
    async fn get_or_create<F>(&self, field: &str, loader: F) -> Result<Identity>
    where
        F: Future<Output = Result<Identity>>,
    {
        match self.cache.hash_get(IDENTITIES_CACHE_KEY, field).await {
            Ok(Some(bytes)) => {
                if let Some(identity) = self.decode(&bytes) {
                    return Ok(identity);
                }
            }
            Ok(None) => {}
            Err(error) => tracing::warn!(error = ?error, field, "Identity cache read failed"),
        }

        let identity = loader.await?;
        self.store(&identity).await;
        Ok(identity)
    }

    async fn store(&self, identity: &Identity) {
        let Some(expires_at) = chrono::Duration::from_std(self.ttl)
            .ok()
            .and_then(|ttl| self.clock.now().checked_add_signed(ttl))
        else {
            tracing::warn!(ttl = ?self.ttl, "Identity cache ttl out of range");
            return;
        };
        let entry = CachedIdentity {
            expires_at,
            identity: identity.clone(),
        };
        let bytes = match serde_json::to_vec(&entry) {
            Ok(bytes) => bytes,
            Err(error) => {
                tracing::warn!(error = %error, "Failed to serialize identity for cache");
                return;
            }
        };

        for field in [
            identity.id().to_string(),
            format!("{}-{}", identity.id(), identity.username()),
        ] {
            if let Err(error) = self
                .cache
                .hash_set(IDENTITIES_CACHE_KEY, &field, bytes.clone(), self.ttl)
                .await
            {
                tracing::warn!(error = ?error, field = %field, "Identity cache write failed");
                return;
            }
        }
    }

    async fn invalidate(&self, id: IdentityId) {
        if let Err(error) = self
            .cache
            .hash_delete_matching(IDENTITIES_CACHE_KEY, &format!("{id}*"))
            .await
        {
            tracing::warn!(error = ?error, identity_id = %id, "Identity cache invalidation failed");
        }
    }

    /// Expired entries read as misses.
    fn decode(&self, bytes: &[u8]) -> Option<Identity> {
        match serde_json::from_slice::<CachedIdentity>(bytes) {
            Ok(entry) if entry.expires_at > self.clock.now() => Some(entry.identity),
            Ok(_) => None,
            Err(error) => {
                tracing::warn!(error = %error, "Discarding undecodable cached identity");
                None
            }
        }
    }
}

#[async_trait]
impl<R: IdentityRepository> IdentityRepository for CachedIdentityRepository<R> {
    type Tx = R::Tx;

    async fn get_by_id(&self, id: IdentityId) -> Result<Identity> {
        self.get_or_create(&id.to_string(), self.inner.get_by_id(id))
            .await
    }

    async fn get_by_username(&self, username: &Username) -> Result<Identity> {
        match self
            .cache
            .hash_find(IDENTITIES_CACHE_KEY, &format!("*-{username}"))
            .await
        {
            // The pattern could also match an id field ending in the
            // username, so the hit is checked.
            Ok(Some(bytes)) => {
                if let Some(identity) = self.decode(&bytes).filter(|i| i.username() == username) {
                    return Ok(identity);
                }
            }
            Ok(None) => {}
            Err(error) => tracing::warn!(error = ?error, "Identity cache scan failed"),
        }

        let identity = self.inner.get_by_username(username).await?;
        self.store(&identity).await;
        Ok(identity)
    }

    async fn create(&self, tx: &mut R::Tx, identity: &Identity) -> Result<()> {
        self.inner.create(tx, identity).await
    }

    async fn email_verified(&self, tx: &mut R::Tx, id: IdentityId) -> Result<()> {
        self.inner.email_verified(tx, id).await?;
        self.invalidate(id).await;
        Ok(())
    }

    async fn delete_by_id(&self, tx: &mut R::Tx, id: IdentityId) -> Result<()> {
        self.inner.delete_by_id(tx, id).await?;
        self.invalidate(id).await;
        if let Err(error) = self.cache.delete(&profile_cache_key(id)).await {
            tracing::warn!(error = ?error, identity_id = %id, "Profile cache invalidation failed");
        }
        Ok(())
    }

    // A reader may have re-cached the pre-commit row since the write.
    async fn forget(&self, id: IdentityId) {
        self.invalidate(id).await;
    }
}

#[cfg(test)]
mod tests {
    use warden_core::{
        Error, IsolationLevel, ManualClock, SaltedHash, TransactionManager, UnitOfWork,
    };

    use super::*;
    use crate::persistence::{HashMapCacheStore, InMemoryDatabase};

    struct Fixture {
        database: InMemoryDatabase,
        cache: HashMapCacheStore,
        repository: CachedIdentityRepository<crate::persistence::InMemoryIdentityRepository>,
        clock: Arc<ManualClock>,
        alice: Identity,
    }

    async fn fixture() -> Fixture {
        let database = InMemoryDatabase::new();
        let cache = HashMapCacheStore::new();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let repository = CachedIdentityRepository::new(
            database.identity_repository(),
            Arc::new(cache.clone()),
            Duration::from_secs(600),
            clock.clone(),
        );
        let alice = Identity::new(
            IdentityId::new(),
            Username::try_from("alice").unwrap(),
            SaltedHash::new(vec![1; 64], vec![2; 16]),
            SaltedHash::new(vec![3; 64], vec![4; 16]),
        );

        let mut tx = database
            .transaction_manager()
            .begin(IsolationLevel::Serializable)
            .await
            .unwrap();
        repository.create(&mut tx, &alice).await.unwrap();
        tx.commit().await.unwrap();

        Fixture {
            database,
            cache,
            repository,
            clock,
            alice,
        }
    }

    impl Fixture {
        async fn delete_behind_the_cache(&self) {
            let mut tx = self
                .database
                .transaction_manager()
                .begin(IsolationLevel::RepeatableRead)
                .await
                .unwrap();
            self.database
                .identity_repository()
                .delete_by_id(&mut tx, self.alice.id())
                .await
                .unwrap();
            tx.commit().await.unwrap();
        }
    }

    #[tokio::test]
    async fn reads_populate_both_fields() {
        let fixture = fixture().await;

        let loaded = fixture.repository.get_by_id(fixture.alice.id()).await.unwrap();

        assert_eq!(loaded, fixture.alice);
        assert_eq!(fixture.cache.field_count(IDENTITIES_CACHE_KEY).await, 2);
    }

    #[tokio::test]
    async fn cached_identity_is_served_without_the_database() {
        let fixture = fixture().await;
        fixture.repository.get_by_id(fixture.alice.id()).await.unwrap();
        fixture.delete_behind_the_cache().await;

        let by_id = fixture.repository.get_by_id(fixture.alice.id()).await.unwrap();
        let by_username = fixture
            .repository
            .get_by_username(fixture.alice.username())
            .await
            .unwrap();

        assert_eq!(by_id, fixture.alice);
        assert_eq!(by_username, fixture.alice);
    }

    #[tokio::test]
    async fn username_probe_ignores_other_users() {
        let fixture = fixture().await;
        fixture.repository.get_by_id(fixture.alice.id()).await.unwrap();

        let result = fixture
            .repository
            .get_by_username(&Username::try_from("lice").unwrap())
            .await;

        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn email_verified_invalidates_all_fields() {
        let fixture = fixture().await;
        fixture.repository.get_by_id(fixture.alice.id()).await.unwrap();

        let mut tx = fixture
            .database
            .transaction_manager()
            .begin(IsolationLevel::RepeatableRead)
            .await
            .unwrap();
        fixture
            .repository
            .email_verified(&mut tx, fixture.alice.id())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(fixture.cache.field_count(IDENTITIES_CACHE_KEY).await, 0);
        assert!(
            fixture
                .repository
                .get_by_id(fixture.alice.id())
                .await
                .unwrap()
                .email_verified()
        );
    }

    #[tokio::test]
    async fn delete_drops_identity_fields_and_profile_entry() {
        let fixture = fixture().await;
        fixture.repository.get_by_id(fixture.alice.id()).await.unwrap();
        let profile_key = profile_cache_key(fixture.alice.id());
        fixture
            .cache
            .hash_set(&profile_key, "profile", b"{}".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        let mut tx = fixture
            .database
            .transaction_manager()
            .begin(IsolationLevel::RepeatableRead)
            .await
            .unwrap();
        fixture
            .repository
            .delete_by_id(&mut tx, fixture.alice.id())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(fixture.cache.field_count(IDENTITIES_CACHE_KEY).await, 0);
        assert_eq!(fixture.cache.field_count(&profile_key).await, 0);
    }

    #[tokio::test]
    async fn unavailable_cache_is_bypassed() {
        let fixture = fixture().await;
        fixture.cache.set_unavailable(true);

        let by_id = fixture.repository.get_by_id(fixture.alice.id()).await.unwrap();
        let by_username = fixture
            .repository
            .get_by_username(fixture.alice.username())
            .await
            .unwrap();

        assert_eq!(by_id, fixture.alice);
        assert_eq!(by_username, fixture.alice);
    }

    #[tokio::test]
    async fn entries_expire_on_their_own_schedule() {
        let fixture = fixture().await;
        fixture.repository.get_by_id(fixture.alice.id()).await.unwrap();
        fixture.delete_behind_the_cache().await;

        // Writes of other entries must not extend this one.
        fixture.clock.advance(chrono::Duration::seconds(300));
        fixture
            .cache
            .hash_set(IDENTITIES_CACHE_KEY, "other", b"{}".to_vec(), Duration::from_secs(600))
            .await
            .unwrap();
        fixture.clock.advance(chrono::Duration::seconds(301));

        let result = fixture.repository.get_by_id(fixture.alice.id()).await;

        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn forget_drops_a_copy_cached_before_the_commit() {
        let fixture = fixture().await;
        let mut tx = fixture
            .database
            .transaction_manager()
            .begin(IsolationLevel::RepeatableRead)
            .await
            .unwrap();
        fixture
            .repository
            .email_verified(&mut tx, fixture.alice.id())
            .await
            .unwrap();

        // A concurrent reader caches the row the commit is about to replace.
        let stale = fixture.repository.get_by_id(fixture.alice.id()).await.unwrap();
        assert!(!stale.email_verified());
        tx.commit().await.unwrap();
        fixture.repository.forget(fixture.alice.id()).await;

        assert!(
            fixture
                .repository
                .get_by_id(fixture.alice.id())
                .await
                .unwrap()
                .email_verified()
        );
    }
}
