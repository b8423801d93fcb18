pub mod recording_event_publisher;
pub mod redis_event_publisher;

pub use recording_event_publisher::RecordingEventPublisher;
pub use redis_event_publisher::RedisEventPublisher;
