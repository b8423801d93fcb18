pub mod hashmap_cache_store;
pub mod in_memory_database;
pub mod postgres_identity_repository;
pub mod postgres_otp_repository;
pub mod postgres_refresh_token_repository;
pub mod postgres_transaction;
pub mod postgres_user_creator;
pub mod redis_cache_store;
pub mod storage_fault;

pub use hashmap_cache_store::HashMapCacheStore;
pub use in_memory_database::{
    InMemoryDatabase, InMemoryIdentityRepository, InMemoryOtpRepository,
    InMemoryRefreshTokenRepository, InMemoryTransactionManager, InMemoryUnitOfWork,
    InMemoryUserCreator,
};
pub use postgres_identity_repository::PostgresIdentityRepository;
pub use postgres_otp_repository::PostgresOtpRepository;
pub use postgres_refresh_token_repository::PostgresRefreshTokenRepository;
pub use postgres_transaction::{PgTransactionManager, PgUnitOfWork};
pub use postgres_user_creator::PostgresUserCreator;
pub use redis_cache_store::RedisCacheStore;

pub(crate) const IDENTITY_NOT_FOUND: &str = "Identity not found";
pub(crate) const OTP_NOT_FOUND: &str = "Verification code not found";
pub(crate) const REFRESH_TOKEN_NOT_FOUND: &str = "Refresh token not found";
