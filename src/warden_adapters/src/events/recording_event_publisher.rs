use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use warden_core::{DomainEvent, EventPublisher, Result};

/// Keeps every published event in memory, in publication order.
#[derive(Default, Clone)]
pub struct RecordingEventPublisher {
    events: Arc<RwLock<Vec<DomainEvent>>>,
}

impl RecordingEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<DomainEvent> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish(&self, event: &DomainEvent) -> Result<()> {
        tracing::info!(event_type = event.event_type(), identity_id = %event.identity_id(), "Event recorded");
        self.events.write().await.push(event.clone());
        Ok(())
    }
}
