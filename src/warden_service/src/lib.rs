pub mod composition;
pub mod helpers;

pub use composition::{
    Infrastructure, build_auth_service, decorate, in_memory_auth_service,
    postgres_auth_service,
};
pub use helpers::{configure_postgresql, configure_redis, get_postgres_pool, get_redis_client};
