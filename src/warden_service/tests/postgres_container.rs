//! Runs the production wiring against real PostgreSQL and Redis.
//! Needs Docker: `cargo test -p warden_service -- --ignored`.

use std::sync::Arc;

use secrecy::Secret;
use testcontainers_modules::{
    postgres::Postgres,
    redis::{REDIS_PORT, Redis},
    testcontainers::{ContainerAsync, runners::AsyncRunner},
};
use warden_adapters::{
    decorators::IDENTITIES_CACHE_KEY,
    images::InMemoryImageService,
    persistence::{
        PgTransactionManager, PostgresIdentityRepository, PostgresOtpRepository,
        PostgresRefreshTokenRepository, PostgresUserCreator, RedisCacheStore,
    },
    events::RecordingEventPublisher,
    test_support::core_config,
};
use warden_application::{AuthService, RegisterRequest};
use warden_core::{CacheStore, Clock, SystemClock, error::USERNAME_ALREADY_EXISTS};
use warden_service::{
    Infrastructure, build_auth_service, decorate, get_postgres_pool, get_redis_client,
    helpers::MIGRATOR,
};

struct Containers {
    _postgres: ContainerAsync<Postgres>,
    _redis: ContainerAsync<Redis>,
    service: AuthService<warden_adapters::persistence::PgUnitOfWork>,
    cache: RedisCacheStore,
}

async fn start() -> Containers {
    let postgres = Postgres::default().start().await.unwrap();
    let redis = Redis::default().start().await.unwrap();

    let pg_url = format!(
        "postgres://postgres:postgres@{}:{}/postgres",
        postgres.get_host().await.unwrap(),
        postgres.get_host_port_ipv4(5432).await.unwrap()
    );
    let pg_pool = get_postgres_pool(&pg_url, 5).await.unwrap();
    MIGRATOR.run(&pg_pool).await.unwrap();

    let redis_host = format!(
        "{}:{}",
        redis.get_host().await.unwrap(),
        redis.get_host_port_ipv4(REDIS_PORT).await.unwrap()
    );
    let redis_conn = get_redis_client(&redis_host)
        .unwrap()
        .get_multiplexed_async_connection()
        .await
        .unwrap();

    let config = core_config();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cache = RedisCacheStore::new(redis_conn);
    let images = Arc::new(InMemoryImageService::default());

    let store = decorate(
        PgTransactionManager::new(pg_pool.clone()),
        PostgresIdentityRepository::new(pg_pool.clone()),
        PostgresOtpRepository::new(pg_pool.clone()),
        PostgresRefreshTokenRepository::new(pg_pool, clock.clone()),
        Arc::new(cache.clone()),
        &config.cache,
        clock.clone(),
    );
    let service = build_auth_service(
        Infrastructure {
            store,
            users: Arc::new(PostgresUserCreator::new(images.clone())),
            images,
            publisher: Arc::new(RecordingEventPublisher::new()),
            clock,
        },
        &config,
    )
    .unwrap();

    Containers {
        _postgres: postgres,
        _redis: redis,
        service,
        cache,
    }
}

fn request(username: &str) -> RegisterRequest {
    RegisterRequest {
        username: username.to_string(),
        email: Secret::new(format!("{username}@example.com")),
        password: Secret::new("correct horse battery".to_string()),
        display_name: username.to_string(),
        bio: None,
        profile_image: None,
        background_image: None,
    }
}

#[tokio::test]
#[ignore = "requires docker"]
async fn duplicate_username_maps_the_postgres_constraint() {
    let containers = start().await;

    assert!(containers.service.register(request("alice")).await.success);
    let duplicate = containers.service.register(request("alice")).await;

    assert!(!duplicate.success);
    assert_eq!(duplicate.error.as_deref(), Some(USERNAME_ALREADY_EXISTS));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn login_populates_the_redis_cache_and_delete_clears_it() {
    let containers = start().await;
    let identity_id = containers
        .service
        .register(request("alice"))
        .await
        .identity_id
        .unwrap();

    let (result, _) = containers
        .service
        .login("alice", Secret::new("correct horse battery".to_string()))
        .await;
    assert!(result.success);
    assert!(
        containers
            .cache
            .hash_get(IDENTITIES_CACHE_KEY, &identity_id.to_string())
            .await
            .unwrap()
            .is_some()
    );

    assert!(containers.service.delete_by_id(identity_id).await);
    assert!(
        containers
            .cache
            .hash_find(IDENTITIES_CACHE_KEY, &format!("{identity_id}*"))
            .await
            .unwrap()
            .is_none()
    );
}
