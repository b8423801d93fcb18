pub mod config;
pub mod crypto;
pub mod decorators;
pub mod events;
pub mod images;
pub mod persistence;
pub mod telemetry;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod tokens;
