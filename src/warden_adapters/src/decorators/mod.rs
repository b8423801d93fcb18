//! Repository wrappers, composed explicitly at startup:
//! `Resilient<Observed<CachedIdentityRepository<Raw>>>`.

pub mod cached;
pub mod observed;
pub mod resilient;

pub use cached::{CachedIdentityRepository, IDENTITIES_CACHE_KEY, profile_cache_key};
pub use observed::Observed;
pub use resilient::Resilient;
