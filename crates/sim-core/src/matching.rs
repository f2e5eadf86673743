//! Matching engine implementing price-time priority.
//!
//! The engine processes incoming orders against the order book, executing
//! trades at the best available prices. Trades always print at the resting
//! (maker) order's price. Within a level, the oldest order fills first, and
//! a partial fill does not reset a resting order's priority.

use types::{
    Order, OrderId, OrderSide, OrderStatus, Price, Quantity, RejectReason, TimeInForce, Timestamp,
    Trade, TradeId,
};

use crate::order_book::OrderBook;

/// What to do when an incoming order would trade against the same agent's
/// own resting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelfTradePolicy {
    /// Match as with any other counterparty.
    #[default]
    Match,
    /// Cancel the resting order and keep matching.
    CancelResting,
    /// Cancel the incoming order's remainder.
    CancelIncoming,
    /// Decrement both orders by the overlap without printing a trade.
    DecrementBoth,
}

/// Result of an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitResult {
    /// Id assigned to the accepted order.
    pub order_id: OrderId,
    /// Trades generated, in execution order.
    pub fills: Vec<Trade>,
    /// Price and quantity left resting in the book, if any.
    pub resting: Option<(Price, Quantity)>,
    /// Final status of the incoming order.
    pub status: OrderStatus,
    /// Orders removed or reduced by self-trade prevention.
    pub self_trade_cancels: Vec<OrderId>,
}

impl SubmitResult {
    /// Check if any trades occurred.
    pub fn has_fills(&self) -> bool {
        !self.fills.is_empty()
    }

    /// Total quantity filled.
    pub fn filled_quantity(&self) -> Quantity {
        self.fills.iter().map(|t| t.quantity).sum()
    }
}

/// Matching engine for executing orders against an order book.
#[derive(Debug, Clone)]
pub struct MatchingEngine {
    /// Counter for generating unique trade IDs.
    next_trade_id: u64,
    /// Self-trade handling policy.
    policy: SelfTradePolicy,
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchingEngine {
    /// Create a new matching engine with the default self-trade policy.
    pub fn new() -> Self {
        Self::with_policy(SelfTradePolicy::default())
    }

    /// Create a matching engine with an explicit self-trade policy.
    pub fn with_policy(policy: SelfTradePolicy) -> Self {
        Self {
            next_trade_id: 1,
            policy,
        }
    }

    /// The configured self-trade policy.
    pub fn policy(&self) -> SelfTradePolicy {
        self.policy
    }

    fn next_trade_id(&mut self) -> TradeId {
        let id = TradeId(self.next_trade_id);
        self.next_trade_id += 1;
        id
    }

    /// Validate, match, and possibly rest an incoming order.
    ///
    /// Rejections are data, not panics: a malformed order comes back as
    /// `Err(RejectReason)` and leaves the book untouched. On acceptance the
    /// order receives its id and `(arrival_time, arrival_seq)` stamp, crosses
    /// against the opposite ladder while prices overlap, and any
    /// GoodTillCancel remainder rests at the tail of its level.
    pub fn submit(
        &mut self,
        book: &mut OrderBook,
        mut order: Order,
        now: Timestamp,
    ) -> Result<SubmitResult, RejectReason> {
        if order.quantity.is_zero() {
            return Err(RejectReason::NonPositiveQuantity);
        }
        if !order.price.is_positive() {
            return Err(RejectReason::NonPositivePrice);
        }
        if order.symbol != book.symbol() {
            return Err(RejectReason::UnknownSymbol);
        }

        book.assign_arrival(&mut order, now);

        let mut fills = Vec::new();
        let mut self_trade_cancels = Vec::new();
        let mut incoming_cancelled = false;
        let opposite = order.side.opposite();

        while !order.remaining.is_zero() {
            let Some((maker_price, maker_agent, maker_order_id, maker_remaining)) =
                book.peek_best(opposite)
            else {
                break;
            };

            let crosses = match order.side {
                OrderSide::Bid => maker_price <= order.price,
                OrderSide::Ask => maker_price >= order.price,
            };
            if !crosses {
                break;
            }

            if maker_agent == order.agent_id {
                match self.policy {
                    SelfTradePolicy::Match => {}
                    SelfTradePolicy::CancelResting => {
                        book.remove(maker_order_id);
                        self_trade_cancels.push(maker_order_id);
                        continue;
                    }
                    SelfTradePolicy::CancelIncoming => {
                        incoming_cancelled = true;
                        break;
                    }
                    SelfTradePolicy::DecrementBoth => {
                        let overlap = order.remaining.min(maker_remaining);
                        book.fill_best(opposite, overlap);
                        order.remaining -= overlap;
                        self_trade_cancels.push(maker_order_id);
                        continue;
                    }
                }
            }

            let quantity = order.remaining.min(maker_remaining);
            let (buyer_id, seller_id, buyer_order_id, seller_order_id) = match order.side {
                OrderSide::Bid => (order.agent_id, maker_agent, order.id, maker_order_id),
                OrderSide::Ask => (maker_agent, order.agent_id, maker_order_id, order.id),
            };

            fills.push(Trade {
                id: self.next_trade_id(),
                symbol: order.symbol.clone(),
                buyer_id,
                seller_id,
                buyer_order_id,
                seller_order_id,
                price: maker_price, // maker's price, never the taker's limit
                quantity,
                timestamp: now,
            });

            order.remaining -= quantity;
            book.fill_best(opposite, quantity);
            book.set_last_price(maker_price);
        }

        let order_id = order.id;
        let status;
        let resting;

        if order.remaining.is_zero() {
            status = OrderStatus::Filled;
            resting = None;
        } else if incoming_cancelled || order.time_in_force == TimeInForce::ImmediateOrCancel {
            status = OrderStatus::Cancelled;
            resting = None;
        } else {
            status = if fills.is_empty() {
                OrderStatus::Resting
            } else {
                OrderStatus::PartiallyFilled {
                    filled: order.filled(),
                }
            };
            resting = Some((order.price, order.remaining));
            order.status = status;
            book.rest(order);
        }

        Ok(SubmitResult {
            order_id,
            fills,
            resting,
            status,
            self_trade_cancels,
        })
    }

    /// Check whether an incoming order would trade without executing it.
    pub fn would_match(&self, book: &OrderBook, side: OrderSide, price: Price) -> bool {
        match side {
            OrderSide::Bid => book
                .best_ask()
                .is_some_and(|(ask_price, _)| ask_price <= price),
            OrderSide::Ask => book
                .best_bid()
                .is_some_and(|(bid_price, _)| bid_price >= price),
        }
    }
}
