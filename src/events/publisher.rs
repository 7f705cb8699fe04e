use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use crate::state_machine::FreezeMode;

/// A freeze-mode transition that has been applied.
#[derive(Debug, Clone)]
pub struct FreezeTransitionEvent {
    pub logical_database_id: i64,
    pub from: FreezeMode,
    pub to: FreezeMode,
    pub username: String,
    pub occurred_at: DateTime<Utc>,
}

/// Broadcast publisher for freeze-mode transition events.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<FreezeTransitionEvent>,
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a transition event.
    pub fn publish(&self, event: FreezeTransitionEvent) -> Result<(), PublishError> {
        // broadcast::send errors only when there are no subscribers; that is
        // a normal condition for transition events, not a failure.
        match self.sender.send(event) {
            Ok(_) | Err(broadcast::error::SendError(_)) => Ok(()),
        }
    }

    /// Subscribe to transition events.
    pub fn subscribe(&self) -> broadcast::Receiver<FreezeTransitionEvent> {
        self.sender.subscribe()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Error types for event publishing.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Event channel is closed")]
    ChannelClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(to: FreezeMode) -> FreezeTransitionEvent {
        FreezeTransitionEvent {
            logical_database_id: 1,
            from: FreezeMode::Normal,
            to,
            username: "amy".to_string(),
            occurred_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let publisher = EventPublisher::default();
        assert_eq!(publisher.subscriber_count(), 0);
        assert!(publisher.publish(event(FreezeMode::Freezing)).is_ok());
    }

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let publisher = EventPublisher::new(8);
        let mut receiver = publisher.subscribe();

        publisher.publish(event(FreezeMode::Freezing)).unwrap();
        let received = receiver.recv().await.unwrap();
        assert_eq!(received.to, FreezeMode::Freezing);
        assert_eq!(received.logical_database_id, 1);
    }
}
