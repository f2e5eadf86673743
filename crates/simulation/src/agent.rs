//! The agent contract and the scheduling capability agents receive.
//!
//! Agents are cooperative state machines: a callback runs to completion,
//! mutating the agent's own fields and scheduling follow-on events, then
//! returns control to the kernel. There are no threads, no blocking, and
//! no wall-clock time anywhere in a callback. "Sleep then resume" becomes
//! "schedule a self-wakeup and reconstruct state from fields on re-entry."

use types::{AgentId, Message, Payload, Timestamp, Topic};

use crate::error::{AgentError, ScheduleError};

/// The narrow scheduling interface handed to agent callbacks.
///
/// Agents hold no reference to the kernel; this capability is the only way
/// they affect the simulation. Everything it schedules takes effect through
/// the event queue, so effects scheduled "now" become visible strictly
/// after the current callback returns, in the same virtual instant.
pub trait EventScheduler {
    /// Current virtual time in milliseconds.
    fn now(&self) -> Timestamp;

    /// Schedule a wakeup for `agent` at `at`. Fails if `at` is in the past.
    fn schedule_wakeup(&mut self, agent: AgentId, at: Timestamp) -> Result<(), ScheduleError>;

    /// Publish a message on a topic at `at`. Subscribers observe it at that
    /// timestamp, after all strictly-earlier events, in subscription order.
    fn publish(
        &mut self,
        sender: AgentId,
        topic: Topic,
        payload: Payload,
        at: Timestamp,
    ) -> Result<(), ScheduleError>;

    /// Deliver a message to one specific agent at `at`, bypassing the
    /// broker. Used for request/reply traffic such as order acks.
    fn send_direct(
        &mut self,
        sender: AgentId,
        to: AgentId,
        payload: Payload,
        at: Timestamp,
    ) -> Result<(), ScheduleError>;

    /// Subscribe `agent` to a topic. Idempotent.
    fn subscribe(&mut self, agent: AgentId, topic: Topic);

    /// Remove `agent`'s subscription to a topic. No-op if absent.
    fn unsubscribe(&mut self, agent: AgentId, topic: Topic);
}

/// The contract every simulated agent implements.
///
/// The kernel invokes `wakeup` for scheduled self-wakeups and `receive`
/// for each delivered message; both may schedule further events through
/// the provided [`EventScheduler`]. A returned error aborts the run.
pub trait Agent: Send {
    /// This agent's unique id.
    fn id(&self) -> AgentId;

    /// Human-readable name for logs.
    fn name(&self) -> &str {
        "Agent"
    }

    /// Called once at registration, before the simulation runs. The usual
    /// place to subscribe to topics and schedule the first wakeup.
    fn on_start(&mut self, _api: &mut dyn EventScheduler) -> Result<(), AgentError> {
        Ok(())
    }

    /// Called for each scheduled wakeup.
    fn wakeup(&mut self, _api: &mut dyn EventScheduler, _now: Timestamp) -> Result<(), AgentError> {
        Ok(())
    }

    /// Called for each delivered message.
    fn receive(
        &mut self,
        api: &mut dyn EventScheduler,
        message: &Message,
        now: Timestamp,
    ) -> Result<(), AgentError>;
}
