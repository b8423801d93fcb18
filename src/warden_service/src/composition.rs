//! Startup assembly. Every repository is wrapped exactly once, outermost
//! first: resilience, observability, then (identities only) the cache.

use std::sync::Arc;

use color_eyre::eyre::{Result, WrapErr};
use warden_adapters::{
    config::Settings,
    crypto::CryptoHashService,
    decorators::{CachedIdentityRepository, Observed, Resilient},
    events::RedisEventPublisher,
    images::HttpImageService,
    persistence::{
        InMemoryDatabase, InMemoryUnitOfWork, PgTransactionManager, PgUnitOfWork,
        PostgresIdentityRepository, PostgresOtpRepository, PostgresRefreshTokenRepository,
        PostgresUserCreator, RedisCacheStore,
    },
    tokens::JwtTokenWriter,
};
use warden_application::{AuthService, IdentityService};
use warden_core::{
    CacheConfig, CacheStore, Clock, CoreConfig, CredentialStore, EventPublisher, HashService,
    IdentityRepository, ImageService, OtpRepository, RefreshTokenRepository, SystemClock,
    TokenWriter, TransactionManager, UnitOfWork, UserCreator,
};

use crate::helpers::{configure_postgresql, configure_redis};

/// Everything the services need besides configuration.
pub struct Infrastructure<T: UnitOfWork> {
    /// Already decorated, see [`decorate`].
    pub store: CredentialStore<T>,
    pub users: Arc<dyn UserCreator<Tx = T>>,
    pub images: Arc<dyn ImageService>,
    pub publisher: Arc<dyn EventPublisher>,
    pub clock: Arc<dyn Clock>,
}

/// Wrap raw repositories in the decorator chain.
pub fn decorate<T, M, I, O, R>(
    transactions: M,
    identities: I,
    otps: O,
    refresh_tokens: R,
    cache: Arc<dyn CacheStore>,
    cache_config: &CacheConfig,
    clock: Arc<dyn Clock>,
) -> CredentialStore<T>
where
    T: UnitOfWork,
    M: TransactionManager<Tx = T> + 'static,
    I: IdentityRepository<Tx = T> + 'static,
    O: OtpRepository<Tx = T> + 'static,
    R: RefreshTokenRepository<Tx = T> + 'static,
{
    let identities =
        CachedIdentityRepository::new(identities, cache, cache_config.identity_ttl, clock);

    CredentialStore {
        transactions: Arc::new(Resilient::new(
            "transaction",
            Observed::new("transaction", transactions),
        )),
        identities: Arc::new(Resilient::new(
            "identity",
            Observed::new("identity", identities),
        )),
        otps: Arc::new(Resilient::new("otp", Observed::new("otp", otps))),
        refresh_tokens: Arc::new(Resilient::new(
            "refresh_token",
            Observed::new("refresh_token", refresh_tokens),
        )),
    }
}

pub fn build_auth_service<T: UnitOfWork>(
    infrastructure: Infrastructure<T>,
    config: &CoreConfig,
) -> Result<AuthService<T>> {
    let Infrastructure {
        store,
        users,
        images,
        publisher,
        clock,
    } = infrastructure;

    let hasher: Arc<dyn HashService> =
        Arc::new(CryptoHashService::new(&config.hashing).wrap_err("Invalid hashing settings")?);
    let tokens: Arc<dyn TokenWriter> =
        Arc::new(JwtTokenWriter::new(config.token.clone(), clock.clone()));

    let identities = IdentityService::new(
        store.clone(),
        users,
        images,
        hasher.clone(),
        clock.clone(),
        config.verification.clone(),
    );

    Ok(AuthService::new(
        identities, store, tokens, hasher, publisher, clock,
    ))
}

/// Production wiring: PostgreSQL, Redis cache and events, HTTP image service.
#[tracing::instrument(name = "Assembling Postgres auth service", skip_all)]
pub async fn postgres_auth_service(settings: &Settings) -> Result<AuthService<PgUnitOfWork>> {
    let config = settings.core_config();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let pg_pool = configure_postgresql(&settings.postgres).await?;
    let redis_conn = configure_redis(&settings.redis).await?;

    let http_client = reqwest::Client::builder()
        .timeout(settings.image_service.timeout())
        .build()?;
    let images: Arc<dyn ImageService> = Arc::new(
        HttpImageService::new(&settings.image_service.base_url, http_client)
            .wrap_err("Invalid image service url")?,
    );

    let store = decorate(
        PgTransactionManager::new(pg_pool.clone()),
        PostgresIdentityRepository::new(pg_pool.clone()),
        PostgresOtpRepository::new(pg_pool.clone()),
        PostgresRefreshTokenRepository::new(pg_pool, clock.clone()),
        Arc::new(RedisCacheStore::new(redis_conn.clone())),
        &config.cache,
        clock.clone(),
    );

    tracing::info!("Auth service assembled");

    build_auth_service(
        Infrastructure {
            store,
            users: Arc::new(PostgresUserCreator::new(images.clone())),
            images,
            publisher: Arc::new(RedisEventPublisher::new(
                redis_conn,
                settings.redis.events_channel.clone(),
            )),
            clock,
        },
        &config,
    )
}

/// Same decorator chain over the in-memory database.
pub fn in_memory_auth_service(
    database: &InMemoryDatabase,
    cache: Arc<dyn CacheStore>,
    images: Arc<dyn ImageService>,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    config: &CoreConfig,
) -> Result<AuthService<InMemoryUnitOfWork>> {
    let store = decorate(
        database.transaction_manager(),
        database.identity_repository(),
        database.otp_repository(),
        database.refresh_token_repository(),
        cache,
        &config.cache,
        clock.clone(),
    );

    build_auth_service(
        Infrastructure {
            store,
            users: Arc::new(database.user_creator_with_images(images.clone())),
            images,
            publisher,
            clock,
        },
        config,
    )
}
