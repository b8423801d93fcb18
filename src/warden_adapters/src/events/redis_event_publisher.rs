use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use warden_core::{DomainEvent, Error, EventPublisher, Result};

/// Publishes events as JSON on a Redis pub/sub channel.
#[derive(Clone)]
pub struct RedisEventPublisher {
    conn: MultiplexedConnection,
    channel: String,
}

impl RedisEventPublisher {
    pub fn new(conn: MultiplexedConnection, channel: impl Into<String>) -> Self {
        Self {
            conn,
            channel: channel.into(),
        }
    }
}

#[async_trait]
impl EventPublisher for RedisEventPublisher {
    #[tracing::instrument(
        name = "Publishing event",
        skip_all,
        fields(event_type = event.event_type(), channel = %self.channel)
    )]
    async fn publish(&self, event: &DomainEvent) -> Result<()> {
        let payload =
            serde_json::to_string(event).map_err(|e| Error::unexpected("serialize event", e))?;

        let mut conn = self.conn.clone();
        let receivers: u64 = redis::cmd("PUBLISH")
            .arg(&self.channel)
            .arg(payload)
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::unexpected("redis PUBLISH", e))?;

        tracing::debug!(receivers, "Event published");
        Ok(())
    }
}
