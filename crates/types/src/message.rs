//! Inter-agent messages and topics.
//!
//! Messages are opaque to the kernel and broker; only the exchange
//! interprets trading payloads. Topics are plain equality-compared labels
//! with canonical constructors in [`topics`].

use crate::ids::{AgentId, OrderId, Symbol, Timestamp};
use crate::market_data::{MarketStats, TopOfBook};
use crate::money::{Price, Quantity};
use crate::order::{CancelReason, OrderSide, RejectReason, TimeInForce};
use crate::trade::Trade;
use serde::{Deserialize, Serialize};

// =============================================================================
// Topics
// =============================================================================

/// Opaque routing label for the pub/sub broker.
pub type Topic = String;

/// Canonical topic names.
pub mod topics {
    use super::{Symbol, Topic};

    /// Inbound order flow for a symbol; the exchange subscribes to this.
    pub fn orders(symbol: &Symbol) -> Topic {
        format!("ord.{symbol}")
    }

    /// Public trade prints for a symbol.
    pub fn trades(symbol: &Symbol) -> Topic {
        format!("md.{symbol}.trades")
    }

    /// Top-of-book updates for a symbol.
    pub fn book(symbol: &Symbol) -> Topic {
        format!("md.{symbol}.book")
    }

    /// Periodic market statistics for a symbol.
    pub fn stats(symbol: &Symbol) -> Topic {
        format!("md.{symbol}.stats")
    }
}

// =============================================================================
// Payloads
// =============================================================================

/// Tagged message content.
///
/// The kernel and broker never inspect these; the exchange consumes the
/// order-flow variants and emits the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    /// Ask the exchange to match (and possibly rest) a new order.
    SubmitOrder {
        symbol: Symbol,
        side: OrderSide,
        price: Price,
        quantity: Quantity,
        time_in_force: TimeInForce,
        /// Correlation tag chosen by the submitter, echoed back in the
        /// accept/reject reply.
        client_tag: u64,
    },
    /// Ask the exchange to remove a resting order.
    CancelOrder { symbol: Symbol, order_id: OrderId },
    /// The exchange accepted a submission.
    OrderAccepted {
        order_id: OrderId,
        client_tag: u64,
        /// Price and quantity now resting, if the order was not fully
        /// filled on arrival.
        resting: Option<(Price, Quantity)>,
    },
    /// The exchange rejected a submission.
    OrderRejected { client_tag: u64, reason: RejectReason },
    /// The exchange removed a resting order on request.
    OrderCancelled {
        order_id: OrderId,
        /// Quantity still unfilled when the cancel landed.
        cancelled: Quantity,
    },
    /// A cancel request failed.
    CancelRejected {
        order_id: OrderId,
        reason: CancelReason,
    },
    /// A match occurred. Sent to both counterparties and published on the
    /// trades topic.
    Trade(Trade),
    /// Top of book changed. Published on the book topic.
    BookUpdate { symbol: Symbol, top: TopOfBook },
    /// Periodic interval statistics. Published on the stats topic.
    MarketData(MarketStats),
}

// =============================================================================
// Message
// =============================================================================

/// A timestamped payload routed between agents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Agent that sent the message.
    pub sender: AgentId,
    /// Message content.
    pub payload: Payload,
    /// Virtual time at which the message was sent.
    pub send_time: Timestamp,
}

impl Message {
    /// Create a new message.
    pub fn new(sender: AgentId, payload: Payload, send_time: Timestamp) -> Self {
        Self {
            sender,
            payload,
            send_time,
        }
    }
}
