//! Scheduled events and the kernel's priority queue.
//!
//! Events are totally ordered by the lexicographic key `(time, seq)`.
//! `seq` is a monotone insertion counter stamped by the queue; ties on
//! `time` therefore resolve in scheduling order. This key is the sole
//! source of determinism in the simulator.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use types::{AgentId, Message, Timestamp, Topic};

/// Monotone insertion counter used for tie-breaking.
pub type EventSeq = u64;

/// What a scheduled event does when it reaches the head of the queue.
#[derive(Debug, Clone)]
pub enum EventKind {
    /// Invoke the agent's `wakeup` callback.
    Wakeup(AgentId),
    /// Hand a message to the agent's `receive` callback.
    Deliver(AgentId, Message),
    /// Fan the message out to the topic's subscribers as `Deliver` events
    /// at the same timestamp.
    Publish(Topic, Message),
}

/// A scheduled unit of work.
#[derive(Debug, Clone)]
pub struct Event {
    /// Virtual time at which the event fires.
    pub time: Timestamp,
    /// Unique insertion counter; later-scheduled events have larger seqs.
    pub seq: EventSeq,
    /// What to do when the event fires.
    pub kind: EventKind,
}

// BinaryHeap wrapper - inverted ordering turns the max-heap into a min-heap
// on (time, seq).
#[derive(Debug, Clone)]
struct Scheduled(Event);

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        (self.0.time, self.0.seq) == (other.0.time, other.0.seq)
    }
}

impl Eq for Scheduled {}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering: smaller (time, seq) = "greater" priority.
        (other.0.time, other.0.seq).cmp(&(self.0.time, self.0.seq))
    }
}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Priority queue of scheduled events, keyed by `(time, seq)`.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Scheduled>,
    next_seq: EventSeq,
}

impl EventQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule an event at `time`, stamping it with a fresh seq strictly
    /// greater than every seq handed out so far.
    pub fn push(&mut self, time: Timestamp, kind: EventKind) -> EventSeq {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Scheduled(Event { time, seq, kind }));
        seq
    }

    /// Time of the earliest pending event.
    pub fn peek_time(&self) -> Option<Timestamp> {
        self.heap.peek().map(|s| s.0.time)
    }

    /// Remove and return the earliest pending event.
    pub fn pop(&mut self) -> Option<Event> {
        self.heap.pop().map(|s| s.0)
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Check if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
