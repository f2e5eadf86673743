//! Deterministic discrete-event simulation kernel.
//!
//! This crate provides the simulator's spine:
//! - [`Kernel`]: virtual-time clock, event queue, dispatch loop
//! - [`MessageBroker`]: topic-to-subscribers routing table
//! - [`Agent`] and [`EventScheduler`]: the contract between the kernel and
//!   the agents it drives
//!
//! Given identical initial state and identical scheduling inputs, two runs
//! produce identical event traces: all ordering derives from the
//! `(time, seq)` key and subscription-registration order, never from hash
//! iteration, wall-clock sampling, or unseeded randomness.

mod agent;
mod broker;
mod error;
mod event;
mod kernel;

pub use agent::{Agent, EventScheduler};
pub use broker::MessageBroker;
pub use error::{AgentError, KernelError, ScheduleError};
pub use event::{Event, EventKind, EventQueue, EventSeq};
pub use kernel::{Kernel, RunSummary};
