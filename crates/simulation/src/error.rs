//! Error types for the simulation kernel.
//!
//! Scheduling and registration mistakes are programmer errors and fail
//! loudly. Trading-level rejections never appear here; they travel as
//! ordinary message payloads.

use thiserror::Error;
use types::{AgentId, Timestamp};

/// Error returned when scheduling an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// Attempted to schedule an event before the current virtual time.
    #[error("cannot schedule at t={at}ms before current time t={now}ms")]
    InvalidTime { at: Timestamp, now: Timestamp },
}

/// Failure signalled by an agent callback.
///
/// The kernel aborts the run when a callback returns this; it never
/// retries on an agent's behalf.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct AgentError {
    /// Human-readable description of what went wrong.
    pub reason: String,
}

impl AgentError {
    /// Create a new agent error.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl From<ScheduleError> for AgentError {
    fn from(err: ScheduleError) -> Self {
        Self::new(err.to_string())
    }
}

/// Fatal kernel errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    /// Scheduling precondition violated.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    /// Reference to an agent the kernel has never seen.
    #[error("unknown agent {0}")]
    UnknownAgent(AgentId),

    /// Two agents registered with the same id.
    #[error("agent {0} is already registered")]
    DuplicateAgent(AgentId),

    /// Agents may only be registered before the first `run`.
    #[error("registration is closed once the kernel has run")]
    RegistrationClosed,

    /// An agent callback failed; the run was aborted at the offending event.
    #[error("agent {agent} failed at t={time}ms during {event}: {source}")]
    AgentFailure {
        agent: AgentId,
        time: Timestamp,
        /// Short description of the event being dispatched.
        event: String,
        source: AgentError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_time_display() {
        let err = ScheduleError::InvalidTime { at: 5, now: 10 };
        assert_eq!(
            err.to_string(),
            "cannot schedule at t=5ms before current time t=10ms"
        );
    }

    #[test]
    fn test_agent_error_from_schedule_error() {
        let err: AgentError = ScheduleError::InvalidTime { at: 1, now: 2 }.into();
        assert!(err.reason.contains("t=1ms"));
    }
}
