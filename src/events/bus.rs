//! Publish/subscribe registry
//!
//! Every subscriber owns a bounded channel. Publishing never blocks: a full
//! channel misses the event and a closed one is dropped from the registry,
//! without affecting delivery to anyone else.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use super::Event;

/// Subscriber identifier
pub type SubscriberId = u64;

/// A live subscription
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriberId,
    pub receiver: mpsc::Receiver<Event>,
}

/// Outcome of one publish
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    /// Subscribers whose channel was full
    pub lagged: usize,
    /// Subscribers removed because their receiver was dropped
    pub pruned: usize,
}

#[derive(Debug, Default)]
struct Registry {
    subscribers: HashMap<SubscriberId, mpsc::Sender<Event>>,
}

/// Cloneable handle to the shared registry
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
    id_counter: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber with room for `capacity` undelivered events
    pub fn subscribe(&self, capacity: usize) -> Subscription {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let id = self.id_counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.lock().subscribers.insert(id, sender);
        debug!(subscriber = id, "Added event subscriber");
        Subscription { id, receiver }
    }

    /// Remove a subscriber; returns false if it was not registered
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self.lock().subscribers.remove(&id).is_some();
        if removed {
            debug!(subscriber = id, "Removed event subscriber");
        }
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// Offer `event` to every subscriber
    pub fn publish(&self, event: Event) -> PublishReport {
        let mut report = PublishReport::default();
        let mut registry = self.lock();

        registry.subscribers.retain(|id, sender| match sender.try_send(event.clone()) {
            Ok(()) => {
                report.delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!(subscriber = *id, "Subscriber lagging, event dropped");
                report.lagged += 1;
                true
            }
            Err(TrySendError::Closed(_)) => {
                debug!(subscriber = *id, "Pruned closed subscriber");
                report.pruned += 1;
                false
            }
        });

        report
    }

    // A panic while holding the lock leaves the map itself intact
    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::{Block, BlockTemplate};
    use crate::crypto::Hash;

    fn block_event(height: u64) -> Event {
        Event::Block(Block::assemble(BlockTemplate {
            height,
            timestamp: height * 10_000,
            previous_hash: Hash::zero(),
            difficulty: 1.0,
            subsidy: 1.0,
            total_fees: 0.0,
            tx_count: 100,
            is_orphan: false,
            transactions: vec![],
            salt: 0,
        }))
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(block_event(1)), PublishReport::default());
    }

    #[test]
    fn test_delivery_to_all() {
        let bus = EventBus::new();
        let mut a = bus.subscribe(4);
        let mut b = bus.subscribe(4);
        assert_ne!(a.id, b.id);

        let report = bus.publish(block_event(1));
        assert_eq!(report.delivered, 2);
        assert_eq!(a.receiver.try_recv().unwrap(), block_event(1));
        assert_eq!(b.receiver.try_recv().unwrap(), block_event(1));
    }

    #[test]
    fn test_full_subscriber_does_not_block_others() {
        let bus = EventBus::new();
        let mut slow = bus.subscribe(1);
        let mut fast = bus.subscribe(8);

        bus.publish(block_event(1));
        let report = bus.publish(block_event(2));
        assert_eq!(report, PublishReport { delivered: 1, lagged: 1, pruned: 0 });

        assert_eq!(slow.receiver.try_recv().unwrap(), block_event(1));
        assert!(slow.receiver.try_recv().is_err());
        assert_eq!(fast.receiver.try_recv().unwrap(), block_event(1));
        assert_eq!(fast.receiver.try_recv().unwrap(), block_event(2));
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[test]
    fn test_closed_subscriber_is_pruned() {
        let bus = EventBus::new();
        let dropped = bus.subscribe(4);
        let mut kept = bus.subscribe(4);
        drop(dropped.receiver);

        let report = bus.publish(block_event(1));
        assert_eq!(report, PublishReport { delivered: 1, lagged: 0, pruned: 1 });
        assert_eq!(bus.subscriber_count(), 1);
        assert!(kept.receiver.try_recv().is_ok());
    }

    #[test]
    fn test_unsubscribe() {
        let bus = EventBus::new();
        let sub = bus.subscribe(4);
        assert!(bus.unsubscribe(sub.id));
        assert!(!bus.unsubscribe(sub.id));
        assert_eq!(bus.publish(block_event(1)).delivered, 0);
    }

    #[test]
    fn test_event_wire_format() {
        let json = serde_json::to_value(block_event(3)).unwrap();
        assert_eq!(json["type"], "block");
        assert_eq!(json["data"]["height"], 3);
    }
}
