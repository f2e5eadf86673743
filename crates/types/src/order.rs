//! Order types for the market simulation.
//!
//! This module defines order sides, time-in-force, status tracking, reject
//! reasons, and the `Order` struct itself. Market orders are represented as
//! limit orders at the extreme allowable price (`Price::MAX_LIMIT` for bids,
//! `Price::MIN_LIMIT` for asks), so the matching engine has a single branch.

use crate::ids::{AgentId, OrderId, Symbol, Timestamp};
use crate::money::{Price, Quantity};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Order Side
// =============================================================================

/// Which side of the book the order is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    /// A buy order resting on (or crossing into) the bid ladder.
    Bid,
    /// A sell order resting on (or crossing into) the ask ladder.
    Ask,
}

impl OrderSide {
    /// Returns the opposite side.
    pub fn opposite(self) -> Self {
        match self {
            OrderSide::Bid => OrderSide::Ask,
            OrderSide::Ask => OrderSide::Bid,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Bid => write!(f, "BID"),
            OrderSide::Ask => write!(f, "ASK"),
        }
    }
}

// =============================================================================
// Time In Force
// =============================================================================

/// How long an unfilled order remains live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TimeInForce {
    /// Rest in the book until filled or cancelled.
    #[default]
    GoodTillCancel,
    /// Match what is immediately available; discard the remainder.
    ImmediateOrCancel,
}

// =============================================================================
// Order Status
// =============================================================================

/// Status of an order in the system.
///
/// `Filled`, `Cancelled`, and `Rejected` are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Order created but not yet accepted by the exchange.
    #[default]
    Pending,
    /// Order resting in the book, untouched.
    Resting,
    /// Order partially filled; the rest is still live.
    PartiallyFilled { filled: Quantity },
    /// Order completely filled.
    Filled,
    /// Order was cancelled.
    Cancelled,
    /// Order was rejected on submission.
    Rejected,
}

// =============================================================================
// Reject Reasons
// =============================================================================

/// Why a submission was rejected. Travels back to the submitter as a
/// message payload; not a failure of the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectReason {
    /// Order quantity was zero.
    NonPositiveQuantity,
    /// Limit price was zero or negative.
    NonPositivePrice,
    /// The exchange does not trade this symbol.
    UnknownSymbol,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveQuantity => write!(f, "quantity must be positive"),
            Self::NonPositivePrice => write!(f, "price must be positive"),
            Self::UnknownSymbol => write!(f, "unknown symbol"),
        }
    }
}

/// Why a cancel request failed. Like [`RejectReason`], this is domain data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CancelReason {
    /// No live order with that id (never existed, already filled, or
    /// already cancelled).
    UnknownOrder,
    /// The order belongs to a different agent.
    NotOwner,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownOrder => write!(f, "unknown order"),
            Self::NotOwner => write!(f, "order belongs to another agent"),
        }
    }
}

// =============================================================================
// Order Struct
// =============================================================================

/// A trading order as the exchange's book holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order identifier (assigned by the exchange, 0 as placeholder).
    pub id: OrderId,
    /// Agent who submitted the order.
    pub agent_id: AgentId,
    /// Symbol being traded.
    pub symbol: Symbol,
    /// Bid or Ask.
    pub side: OrderSide,
    /// Limit price in ticks.
    pub price: Price,
    /// Original quantity.
    pub quantity: Quantity,
    /// Remaining unfilled quantity.
    pub remaining: Quantity,
    /// Rest-or-discard behavior for the unfilled remainder.
    pub time_in_force: TimeInForce,
    /// Virtual time at which the book accepted this order.
    pub arrival_time: Timestamp,
    /// Per-book insertion counter breaking ties among same-priced,
    /// same-timestamped orders. Assigned by the book on acceptance.
    pub arrival_seq: u64,
    /// Current status.
    pub status: OrderStatus,
}

impl Order {
    /// Create a new limit order.
    pub fn limit(
        agent_id: AgentId,
        symbol: impl Into<Symbol>,
        side: OrderSide,
        price: Price,
        quantity: Quantity,
    ) -> Self {
        Self {
            id: OrderId(0), // Placeholder, assigned by the exchange
            agent_id,
            symbol: symbol.into(),
            side,
            price,
            quantity,
            remaining: quantity,
            time_in_force: TimeInForce::GoodTillCancel,
            arrival_time: 0,
            arrival_seq: 0,
            status: OrderStatus::Pending,
        }
    }

    /// Create a new market order: a limit at the extreme allowable price.
    pub fn market(
        agent_id: AgentId,
        symbol: impl Into<Symbol>,
        side: OrderSide,
        quantity: Quantity,
    ) -> Self {
        let price = match side {
            OrderSide::Bid => Price::MAX_LIMIT,
            OrderSide::Ask => Price::MIN_LIMIT,
        };
        let mut order = Self::limit(agent_id, symbol, side, price, quantity);
        // A market order that cannot fill should not rest at the sentinel price.
        order.time_in_force = TimeInForce::ImmediateOrCancel;
        order
    }

    /// Set the time-in-force (builder style).
    pub fn with_time_in_force(mut self, tif: TimeInForce) -> Self {
        self.time_in_force = tif;
        self
    }

    /// Check if order is fully filled.
    pub fn is_filled(&self) -> bool {
        self.remaining.is_zero()
    }

    /// Quantity filled so far.
    pub fn filled(&self) -> Quantity {
        self.quantity.saturating_sub(self.remaining)
    }

    /// Check if order is a buy order.
    pub fn is_bid(&self) -> bool {
        self.side == OrderSide::Bid
    }

    /// Check if order is a sell order.
    pub fn is_ask(&self) -> bool {
        self.side == OrderSide::Ask
    }
}
