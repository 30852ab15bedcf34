//! Topic subscription registry.
//!
//! Maps each topic name to the ordered set of subscribers registered on it.
//! This is the only process-wide mutable state in the relay. Every operation
//! is a short critical section on one [`DashMap`] shard and nothing here is
//! held across an `.await`.
//!
//! Topic entries are created on first subscription and never removed; they
//! may become empty, and an empty entry reports no subscribers.

use dashmap::DashMap;
use hermes_ws::ConnectionId;
use indexmap::IndexMap;

use crate::error::{BrokerError, BrokerResult};
use crate::outbound::Outbound;

/// Point-in-time registry statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Topic entries, including empty ones.
    pub topics: usize,
    /// Topics with at least one subscriber.
    pub active_topics: usize,
    /// Subscriptions across all topics.
    pub subscriptions: usize,
}

/// Concurrent topic -> subscribers index.
pub struct SubscriptionRegistry<O> {
    topics: DashMap<String, IndexMap<ConnectionId, O>>,
}

impl<O: Outbound> Default for SubscriptionRegistry<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: Outbound> std::fmt::Debug for SubscriptionRegistry<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("stats", &self.stats())
            .finish()
    }
}

impl<O: Outbound> SubscriptionRegistry<O> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            topics: DashMap::new(),
        }
    }

    /// Add `subscriber` to `topic`, creating the topic if needed.
    ///
    /// Returns `false` if it was already subscribed; the set is unchanged.
    pub fn subscribe(&self, topic: &str, subscriber: O) -> bool {
        let id = subscriber.id();
        if let Some(mut subscribers) = self.topics.get_mut(topic) {
            if subscribers.contains_key(&id) {
                return false;
            }
            subscribers.insert(id, subscriber);
            return true;
        }

        let mut subscribers = self.topics.entry(topic.to_string()).or_default();
        if subscribers.contains_key(&id) {
            return false;
        }
        subscribers.insert(id, subscriber);
        true
    }

    /// Remove connection `id` from `topic`.
    ///
    /// Returns `false` for an unknown topic or a connection that was not
    /// subscribed.
    pub fn unsubscribe(&self, topic: &str, id: ConnectionId) -> bool {
        self.topics
            .get_mut(topic)
            .is_some_and(|mut subscribers| subscribers.shift_remove(&id).is_some())
    }

    /// Snapshot of the current subscribers of `topic`, in subscription order.
    ///
    /// Later registry changes do not affect the returned list.
    pub fn subscribers_of(&self, topic: &str) -> Vec<O> {
        self.topics
            .get(topic)
            .map(|subscribers| subscribers.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Remove connection `id` from every topic.
    ///
    /// Other subscribers and emptied topic entries are left in place.
    /// Returns the number of topics the connection was removed from.
    pub fn remove_everywhere(&self, id: ConnectionId) -> usize {
        let mut removed = 0;
        for mut entry in self.topics.iter_mut() {
            if entry.value_mut().shift_remove(&id).is_some() {
                removed += 1;
            }
        }
        removed
    }

    /// Number of subscribers currently on `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.get(topic).map_or(0, |subscribers| subscribers.len())
    }

    /// Whether `topic` has at least one subscriber.
    pub fn has_subscribers(&self, topic: &str) -> bool {
        self.subscriber_count(topic) > 0
    }

    /// Whether connection `id` is subscribed to `topic`.
    pub fn is_subscribed(&self, topic: &str, id: ConnectionId) -> bool {
        self.topics
            .get(topic)
            .is_some_and(|subscribers| subscribers.contains_key(&id))
    }

    /// Topics connection `id` is subscribed to, sorted by name.
    pub fn topics_of(&self, id: ConnectionId) -> Vec<String> {
        let mut topics: Vec<String> = self
            .topics
            .iter()
            .filter(|entry| entry.value().contains_key(&id))
            .map(|entry| entry.key().clone())
            .collect();
        topics.sort_unstable();
        topics
    }

    /// Number of topic entries, including empty ones.
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    /// Current statistics.
    pub fn stats(&self) -> RegistryStats {
        let mut stats = RegistryStats::default();
        for entry in self.topics.iter() {
            stats.topics += 1;
            let len = entry.value().len();
            if len > 0 {
                stats.active_topics += 1;
            }
            stats.subscriptions += len;
        }
        stats
    }

    /// Verify that every stored handle is keyed by its own connection ID.
    pub fn check_invariants(&self) -> BrokerResult<()> {
        for entry in self.topics.iter() {
            for (key, subscriber) in entry.value() {
                if *key != subscriber.id() {
                    return Err(BrokerError::RegistryCorruption(format!(
                        "topic {:?} stores {} under key {}",
                        entry.key(),
                        subscriber.id(),
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}
