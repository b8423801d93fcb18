use color_eyre::eyre::{Result, WrapErr};
use redis::{Client, RedisResult, aio::MultiplexedConnection};
use secrecy::ExposeSecret;
use sqlx::{PgPool, migrate::Migrator, postgres::PgPoolOptions};
use warden_adapters::config::{PostgresSettings, RedisSettings};

/// Schema shared by every Postgres deployment of the service.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Connect to PostgreSQL and bring the schema up to date.
///
/// # Returns
/// A pool ready for the repositories
pub async fn configure_postgresql(settings: &PostgresSettings) -> Result<PgPool> {
    let pg_pool = get_postgres_pool(settings.url.expose_secret(), settings.max_connections)
        .await
        .wrap_err("Failed to create Postgres connection pool")?;

    MIGRATOR
        .run(&pg_pool)
        .await
        .wrap_err("Failed to run migrations")?;

    Ok(pg_pool)
}

/// Open the multiplexed Redis connection shared by the cache and the event
/// publisher.
pub async fn configure_redis(settings: &RedisSettings) -> Result<MultiplexedConnection> {
    get_redis_client(&settings.host_name)
        .wrap_err("Failed to get Redis client")?
        .get_multiplexed_async_connection()
        .await
        .wrap_err("Failed to get Redis connection")
}

pub async fn get_postgres_pool(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
}

/// # Arguments
/// * `redis_hostname` - host, optionally with `:port`
pub fn get_redis_client(redis_hostname: &str) -> RedisResult<Client> {
    let redis_url = format!("redis://{}/", redis_hostname);
    redis::Client::open(redis_url)
}
