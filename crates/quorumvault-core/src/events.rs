//! Event bus for vault notifications
//!
//! Events fan out to every subscriber. Publishing with nobody listening is
//! not an error; lagging subscribers lose the oldest events.

use tokio::sync::broadcast;

use quorumvault_types::VaultEvent;

/// Default number of buffered events per subscriber
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Broadcast channel for `VaultEvent`s
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<VaultEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, event: VaultEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<VaultEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorumvault_types::TransactionId;

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::default();
        bus.publish(VaultEvent::submission(TransactionId::new(0)));
        assert_eq!(bus.sender.receiver_count(), 0);
    }

    #[tokio::test]
    async fn test_subscribers_receive_in_order() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        bus.publish(VaultEvent::submission(TransactionId::new(0)));
        bus.publish(VaultEvent::execution(TransactionId::new(0)));

        assert_eq!(rx.recv().await.unwrap().kind(), "Submission");
        assert_eq!(rx.recv().await.unwrap().kind(), "Execution");
    }
}
