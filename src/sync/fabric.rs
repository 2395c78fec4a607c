//! Publish/subscribe fabric.
//!
//! Nodes broadcast chat events and replication snapshots on named topics.
//! Delivery is in order per publisher to every subscriber attached at publish
//! time; nothing is retained for late subscribers.

use meshchat_proto::Event;
use std::collections::HashSet;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{trace, warn};

/// Default number of in-flight events a [`LocalBus`] buffers per subscriber.
pub const DEFAULT_BUS_CAPACITY: usize = 4096;

/// A topic-addressed event fabric.
pub trait EventBus: Send + Sync {
    /// Publish an event on a topic. Never blocks; with no subscribers the
    /// event is dropped.
    fn publish(&self, topic: &str, event: Event);

    /// Subscribe to a set of topics.
    fn subscribe(&self, topics: &[&str]) -> Subscription;
}

/// In-process fabric shared by every node hosted in one daemon.
#[derive(Debug, Clone)]
pub struct LocalBus {
    tx: broadcast::Sender<(String, Event)>,
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

impl LocalBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl EventBus for LocalBus {
    fn publish(&self, topic: &str, event: Event) {
        trace!(%topic, service = event.service(), clock = event.clock(), "Publishing event");
        // Err only means nobody is listening.
        let _ = self.tx.send((topic.to_string(), event));
    }

    fn subscribe(&self, topics: &[&str]) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            topics: topics.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// A topic-filtered stream of events.
#[derive(Debug)]
pub struct Subscription {
    rx: broadcast::Receiver<(String, Event)>,
    topics: HashSet<String>,
}

impl Subscription {
    /// Whether this subscription listens on `topic`.
    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.topics.contains(topic)
    }

    /// Wait for the next event on a subscribed topic.
    ///
    /// Returns `None` once the bus is gone. Events lost to lag are logged
    /// and skipped.
    pub async fn recv(&mut self) -> Option<(String, Event)> {
        loop {
            match self.rx.recv().await {
                Ok((topic, event)) if self.topics.contains(&topic) => return Some((topic, event)),
                Ok(_) => continue,
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "Subscriber lagged, events dropped");
                    crate::metrics::record_lagged(missed);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next already-delivered event on a subscribed topic, if any.
    pub fn try_recv(&mut self) -> Option<(String, Event)> {
        loop {
            match self.rx.try_recv() {
                Ok((topic, event)) if self.topics.contains(&topic) => return Some((topic, event)),
                Ok(_) => continue,
                Err(TryRecvError::Lagged(missed)) => {
                    warn!(missed, "Subscriber lagged, events dropped");
                    crate::metrics::record_lagged(missed);
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Drain every event currently waiting on subscribed topics.
    pub fn drain(&mut self) -> Vec<(String, Event)> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshchat_proto::{ElectionAnnouncement, Publication};

    fn post(channel: &str, clock: u64) -> Event {
        Event::Publish(Publication {
            user: "alice".into(),
            channel: channel.into(),
            message: "hello".into(),
            timestamp: 0.0,
            clock,
        })
    }

    #[test]
    fn test_subscribers_only_see_their_topics() {
        let bus = LocalBus::default();
        let mut general = bus.subscribe(&["general"]);
        let mut both = bus.subscribe(&["general", "random"]);

        bus.publish("general", post("general", 1));
        bus.publish("random", post("random", 2));

        let seen: Vec<u64> = general.drain().iter().map(|(_, e)| e.clock()).collect();
        assert_eq!(seen, vec![1]);

        let seen: Vec<(String, u64)> = both
            .drain()
            .into_iter()
            .map(|(t, e)| (t, e.clock()))
            .collect();
        assert_eq!(seen, vec![("general".into(), 1), ("random".into(), 2)]);
    }

    #[test]
    fn test_late_subscribers_miss_earlier_events() {
        let bus = LocalBus::default();
        bus.publish("general", post("general", 1));

        let mut late = bus.subscribe(&["general"]);
        assert!(late.try_recv().is_none());
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn test_lagging_subscriber_recovers() {
        let bus = LocalBus::new(2);
        let mut sub = bus.subscribe(&["general"]);

        for clock in 1..=5 {
            bus.publish("general", post("general", clock));
        }

        // The oldest events were overwritten; the rest still arrive in order.
        let seen: Vec<u64> = sub.drain().iter().map(|(_, e)| e.clock()).collect();
        assert_eq!(seen, vec![4, 5]);
    }

    #[tokio::test]
    async fn test_recv_waits_for_matching_topic() {
        let bus = LocalBus::default();
        let mut sub = bus.subscribe(&["election"]);

        let publisher = bus.clone();
        tokio::spawn(async move {
            publisher.publish("general", post("general", 1));
            publisher.publish(
                "election",
                Event::Election(ElectionAnnouncement {
                    coordinator: "beta".into(),
                    timestamp: 0.0,
                    clock: 9,
                }),
            );
        });

        let (topic, event) = sub.recv().await.unwrap();
        assert_eq!(topic, "election");
        assert_eq!(event.clock(), 9);
    }
}
