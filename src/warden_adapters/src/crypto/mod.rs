pub mod crypto_hash_service;

pub use crypto_hash_service::CryptoHashService;
