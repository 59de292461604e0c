use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

use crate::models::RoundBatch;

pub type BatchSender = broadcast::Sender<Arc<RoundBatch>>;
pub type BatchReceiver = broadcast::Receiver<Arc<RoundBatch>>;

/// Fan-out of round batches to every connected session. Best effort:
/// nothing is buffered for sessions that subscribe later.
#[derive(Clone)]
pub struct LatencyBroadcaster {
    sender: BatchSender,
}

impl LatencyBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> BatchReceiver {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Returns the number of sessions the batch was handed to.
    pub fn publish(&self, batch: RoundBatch) -> usize {
        let size = batch.len();
        match self.sender.send(Arc::new(batch)) {
            Ok(delivered) => {
                debug!("Broadcast batch of {} results to {} sessions", size, delivered);
                delivered
            }
            Err(_) => {
                debug!("No sessions connected, dropping batch of {} results", size);
                0
            }
        }
    }
}

impl Default for LatencyBroadcaster {
    fn default() -> Self {
        Self::new(shared_config::DEFAULT_BROADCAST_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProbeResult, ProbeStatus};

    fn batch(round: u64) -> RoundBatch {
        RoundBatch {
            round,
            results: vec![ProbeResult::new("a", 10, ProbeStatus::Online)],
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_dropped() {
        let broadcaster = LatencyBroadcaster::new(4);
        assert_eq!(broadcaster.publish(batch(1)), 0);
        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_late_subscriber_only_sees_later_batches() {
        let broadcaster = LatencyBroadcaster::new(4);
        let mut early = broadcaster.subscribe();

        broadcaster.publish(batch(1));
        let mut late = broadcaster.subscribe();
        broadcaster.publish(batch(2));

        assert_eq!(early.recv().await.unwrap().round, 1);
        assert_eq!(early.recv().await.unwrap().round, 2);
        assert_eq!(late.recv().await.unwrap().round, 2);
        assert!(late.try_recv().is_err());
    }
}
