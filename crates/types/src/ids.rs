//! Core identifier types for the market simulation.
//!
//! This module defines the fundamental ID types used throughout the system
//! to uniquely identify orders, agents, and trades, plus the virtual-time
//! type the kernel advances.

use derive_more::{From, Into};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Constants
// =============================================================================

/// Price scale factor: 10,000 means 4 decimal places.
/// - `10000` = $1.00
/// - `1` = $0.0001 (smallest price increment)
pub const PRICE_SCALE: i64 = 10_000;

// =============================================================================
// Core ID Types
// =============================================================================

/// Unique identifier for an order, assigned by the exchange on acceptance.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Default,
    From,
    Into,
)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Order#{}", self.0)
    }
}

/// Unique identifier for an agent. Stable for the whole run; the kernel
/// enforces uniqueness at registration.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Default,
    From,
    Into,
)]
pub struct AgentId(pub u64);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Agent#{}", self.0)
    }
}

/// Unique identifier for a completed trade.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Default,
    From,
    Into,
)]
pub struct TradeId(pub u64);

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Trade#{}", self.0)
    }
}

// =============================================================================
// Symbol Type
// =============================================================================

/// Traded instrument symbol (e.g., "AAPL", "SIM").
pub type Symbol = String;

// =============================================================================
// Time Types
// =============================================================================

/// Virtual simulation time in milliseconds since simulation start.
///
/// Monotonically non-decreasing; the kernel never rewinds it. Unrelated
/// to the wall clock.
pub type Timestamp = u64;
