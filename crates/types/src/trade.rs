//! Trade types for the market simulation.

use crate::ids::{AgentId, OrderId, Symbol, Timestamp, TradeId};
use crate::money::{Cash, Price, Quantity};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A completed trade between two parties.
///
/// The execution price is always the resting (maker) order's limit price,
/// regardless of how aggressive the incoming order was.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Unique trade identifier.
    pub id: TradeId,
    /// Symbol traded.
    pub symbol: Symbol,
    /// Agent who bought.
    pub buyer_id: AgentId,
    /// Agent who sold.
    pub seller_id: AgentId,
    /// Order that was the buyer.
    pub buyer_order_id: OrderId,
    /// Order that was the seller.
    pub seller_order_id: OrderId,
    /// Execution price (maker's price).
    pub price: Price,
    /// Number of shares traded.
    pub quantity: Quantity,
    /// Virtual time of execution.
    pub timestamp: Timestamp,
}

impl Trade {
    /// Calculate the total value of this trade.
    pub fn value(&self) -> Cash {
        self.price * self.quantity
    }
}

impl fmt::Display for Trade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Trade[{}]: {} {} shares @ {} (buyer: {}, seller: {})",
            self.id, self.symbol, self.quantity, self.price, self.buyer_id, self.seller_id
        )
    }
}
