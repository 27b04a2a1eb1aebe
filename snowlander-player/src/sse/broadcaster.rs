//! Event fan-out
//!
//! Each subscriber owns a bounded FIFO. A broadcast walks the subscriber set
//! and `try_send`s into every queue, so it never waits on a slow client. A
//! subscriber whose queue is closed (client gone) or full (client stalled)
//! is removed; the others still receive the event.

use snowlander_common::events::SnowEvent;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

/// Identifies one subscription for `unsubscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(u64);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "subscriber-{}", self.0)
    }
}

/// Receiving end handed to an observer
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::Receiver<SnowEvent>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next event, or `None` once the subscription has been dropped by the
    /// fan-out
    pub async fn recv(&mut self) -> Option<SnowEvent> {
        self.rx.recv().await
    }

    /// Next already-delivered event without waiting
    pub fn try_recv(&mut self) -> Option<SnowEvent> {
        self.rx.try_recv().ok()
    }

    pub fn into_stream(self) -> ReceiverStream<SnowEvent> {
        ReceiverStream::new(self.rx)
    }
}

/// Outcome of one broadcast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub pruned: usize,
}

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    senders: BTreeMap<SubscriberId, mpsc::Sender<SnowEvent>>,
}

/// Broadcasts events to every live subscriber
#[derive(Clone)]
pub struct EventFanout {
    subscribers: Arc<Mutex<Subscribers>>,
    capacity: usize,
}

impl EventFanout {
    /// Create a fan-out whose subscribers buffer up to `capacity` events
    pub fn new(capacity: usize) -> Self {
        info!("Event fan-out initialized with per-subscriber capacity {}", capacity);
        Self {
            subscribers: Arc::new(Mutex::new(Subscribers::default())),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Subscribers> {
        // Nothing inside the lock can panic halfway through a mutation
        self.subscribers.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a new observer; it receives events broadcast from now on
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.capacity);
        let mut subscribers = self.lock();
        subscribers.next_id += 1;
        let id = SubscriberId(subscribers.next_id);
        subscribers.senders.insert(id, tx);
        debug!("{} subscribed, total: {}", id, subscribers.senders.len());
        Subscription { id, rx }
    }

    /// Remove an observer; returns whether it was still registered
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.lock();
        let removed = subscribers.senders.remove(&id).is_some();
        if removed {
            debug!("{} unsubscribed, total: {}", id, subscribers.senders.len());
        }
        removed
    }

    /// Deliver `event` to every subscriber, pruning the ones that fail
    pub fn broadcast(&self, event: SnowEvent) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let mut subscribers = self.lock();

        subscribers.senders.retain(|id, tx| match tx.try_send(event.clone()) {
            Ok(()) => {
                report.delivered += 1;
                true
            }
            Err(TrySendError::Closed(_)) => {
                debug!("{} disconnected, removing", id);
                report.pruned += 1;
                false
            }
            Err(TrySendError::Full(_)) => {
                warn!("{} is not keeping up (buffer full), removing", id);
                report.pruned += 1;
                false
            }
        });

        debug!(
            "Broadcast {} to {} subscribers ({} pruned)",
            event.event_type(),
            report.delivered,
            report.pruned
        );
        report
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().senders.len()
    }
}
