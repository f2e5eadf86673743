//! Publish/subscribe routing table.
//!
//! The broker maps topics to subscriber lists and nothing more: message
//! storage lives in the kernel's event queue. Subscriber lists preserve
//! registration order because that order determines the seqs of the
//! `Deliver` events the kernel synthesizes, and hence delivery order
//! within a timestamp.

use std::collections::HashMap;

use types::{AgentId, Topic};

/// Pure routing table from topic to ordered subscriber list.
#[derive(Debug, Default)]
pub struct MessageBroker {
    // Keyed lookups only; iteration order of the map itself is never
    // observable. The Vec keeps registration order.
    subscriptions: HashMap<Topic, Vec<AgentId>>,
}

impl MessageBroker {
    /// Create an empty broker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe an agent to a topic. Idempotent: a second subscribe to
    /// the same topic is a no-op and keeps the original position.
    pub fn subscribe(&mut self, agent: AgentId, topic: Topic) {
        let subscribers = self.subscriptions.entry(topic).or_default();
        if !subscribers.contains(&agent) {
            subscribers.push(agent);
        }
    }

    /// Remove exactly the (agent, topic) pairing. No-op if absent.
    pub fn unsubscribe(&mut self, agent: AgentId, topic: &Topic) {
        if let Some(subscribers) = self.subscriptions.get_mut(topic) {
            subscribers.retain(|&s| s != agent);
            if subscribers.is_empty() {
                self.subscriptions.remove(topic);
            }
        }
    }

    /// Subscribers of a topic, in subscription-registration order.
    pub fn subscribers(&self, topic: &Topic) -> &[AgentId] {
        self.subscriptions
            .get(topic)
            .map(|s| s.as_slice())
            .unwrap_or(&[])
    }

    /// Number of topics with at least one subscriber.
    pub fn topic_count(&self) -> usize {
        self.subscriptions.len()
    }
}
