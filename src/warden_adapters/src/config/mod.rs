pub mod settings;

pub use settings::{
    CacheSettings, HashingSettings, ImageServiceSettings, PostgresSettings, RedisSettings,
    Settings, SettingsError, TokenSettings, VerificationSettings,
};
