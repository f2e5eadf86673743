//! Momentum trader - follows price trends.
//!
//! Watches the published top of book and keeps a short mid-price history.
//! When the trailing move exceeds a threshold it joins the trend with a
//! passive limit order slightly inside its own side, within a position
//! limit.

use std::collections::VecDeque;

use crate::state::AgentState;
use simulation::{Agent, AgentError, EventScheduler};
use types::{
    AgentId, Cash, Message, OrderSide, Payload, Price, Quantity, Symbol, TimeInForce, Timestamp,
    topics,
};

/// Configuration for a MomentumTrader agent.
#[derive(Debug, Clone)]
pub struct MomentumConfig {
    /// Symbol to trade.
    pub symbol: Symbol,
    /// Mid-price observations considered for the trend signal.
    pub lookback: usize,
    /// Minimum trailing move that counts as momentum.
    pub threshold: Price,
    /// Shares per order.
    pub order_size: u64,
    /// Absolute position bound.
    pub max_position: i64,
    /// Passive price offset from the current mid (fraction).
    pub price_offset: f64,
    /// Starting cash balance.
    pub initial_cash: Cash,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            symbol: "SIM".to_string(),
            lookback: 5,
            threshold: Price::from_float(0.05),
            order_size: 10,
            max_position: 100,
            price_offset: 0.005,
            initial_cash: Cash::from_float(100_000.0),
        }
    }
}

/// A trend follower driven by top-of-book updates.
pub struct MomentumTrader {
    id: AgentId,
    config: MomentumConfig,
    state: AgentState,
    /// Recent mid prices, oldest first.
    mids: VecDeque<Price>,
    next_tag: u64,
}

impl MomentumTrader {
    /// Create a new MomentumTrader with the given configuration.
    pub fn new(id: AgentId, config: MomentumConfig) -> Self {
        let initial_cash = config.initial_cash;
        Self {
            id,
            config,
            state: AgentState::new(initial_cash),
            mids: VecDeque::new(),
            next_tag: 0,
        }
    }

    /// Create a MomentumTrader with default configuration.
    pub fn with_defaults(id: AgentId) -> Self {
        Self::new(id, MomentumConfig::default())
    }

    /// Get current position.
    pub fn position(&self) -> i64 {
        self.state.position()
    }

    fn record_mid(&mut self, mid: Price) {
        self.mids.push_back(mid);
        while self.mids.len() > self.config.lookback {
            self.mids.pop_front();
        }
    }

    /// The trailing move over the lookback window, once it is full.
    fn trailing_move(&self) -> Option<Price> {
        if self.mids.len() < self.config.lookback {
            return None;
        }
        Some(*self.mids.back()? - *self.mids.front()?)
    }

    fn signal(&self) -> Option<OrderSide> {
        let change = self.trailing_move()?;
        if change > self.config.threshold && self.state.position() < self.config.max_position {
            Some(OrderSide::Bid)
        } else if change < -self.config.threshold
            && self.state.position() > -self.config.max_position
        {
            Some(OrderSide::Ask)
        } else {
            None
        }
    }

    fn place_order(
        &mut self,
        api: &mut dyn EventScheduler,
        side: OrderSide,
        now: Timestamp,
    ) -> Result<(), AgentError> {
        let Some(&mid) = self.mids.back() else {
            return Ok(());
        };

        // Passive: buy a touch below the mid, sell a touch above it.
        let factor = match side {
            OrderSide::Bid => 1.0 - self.config.price_offset,
            OrderSide::Ask => 1.0 + self.config.price_offset,
        };
        let price = Price::from_float(mid.to_float() * factor);

        self.next_tag += 1;
        api.publish(
            self.id,
            topics::orders(&self.config.symbol),
            Payload::SubmitOrder {
                symbol: self.config.symbol.clone(),
                side,
                price,
                quantity: Quantity(self.config.order_size),
                time_in_force: TimeInForce::GoodTillCancel,
                client_tag: self.next_tag,
            },
            now,
        )?;
        self.state.record_order();
        Ok(())
    }
}

impl Agent for MomentumTrader {
    fn id(&self) -> AgentId {
        self.id
    }

    fn name(&self) -> &str {
        "MomentumTrader"
    }

    fn on_start(&mut self, api: &mut dyn EventScheduler) -> Result<(), AgentError> {
        api.subscribe(self.id, topics::book(&self.config.symbol));
        Ok(())
    }

    fn receive(
        &mut self,
        api: &mut dyn EventScheduler,
        message: &Message,
        now: Timestamp,
    ) -> Result<(), AgentError> {
        match &message.payload {
            Payload::BookUpdate { top, .. } => {
                if let Some(mid) = top.mid_price() {
                    self.record_mid(mid);
                    if let Some(side) = self.signal() {
                        self.place_order(api, side, now)?;
                    }
                }
            }
            Payload::Trade(trade) => {
                if trade.buyer_id == self.id {
                    self.state.on_buy(trade.quantity.raw(), trade.value());
                } else if trade.seller_id == self.id {
                    self.state.on_sell(trade.quantity.raw(), trade.value());
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::test_support::RecordingScheduler;
    use types::TopOfBook;

    fn book_update(mid: f64) -> Message {
        let top = TopOfBook {
            best_bid: Some((Price::from_float(mid - 0.5), Quantity(10))),
            best_ask: Some((Price::from_float(mid + 0.5), Quantity(10))),
        };
        Message::new(
            AgentId(99),
            Payload::BookUpdate {
                symbol: "SIM".to_string(),
                top,
            },
            0,
        )
    }

    #[test]
    fn test_no_signal_until_window_full() {
        let mut trader = MomentumTrader::with_defaults(AgentId(1));
        let mut api = RecordingScheduler::default();

        for _ in 0..4 {
            trader.receive(&mut api, &book_update(100.0), 0).unwrap();
        }
        assert!(api.published.is_empty());
    }

    #[test]
    fn test_uptrend_triggers_buy() {
        let mut trader = MomentumTrader::with_defaults(AgentId(1));
        let mut api = RecordingScheduler::default();

        for (i, mid) in [100.0, 100.1, 100.2, 100.3, 100.5].iter().enumerate() {
            trader.receive(&mut api, &book_update(*mid), i as Timestamp).unwrap();
        }

        let (topic, payload) = api.published.last().expect("an order was submitted");
        assert_eq!(topic, "ord.SIM");
        match payload {
            Payload::SubmitOrder { side, price, .. } => {
                assert_eq!(*side, OrderSide::Bid);
                // Passive: below the latest mid.
                assert!(*price < Price::from_float(100.5));
            }
            other => panic!("expected SubmitOrder, got {other:?}"),
        }
    }

    #[test]
    fn test_downtrend_triggers_sell() {
        let mut trader = MomentumTrader::with_defaults(AgentId(1));
        let mut api = RecordingScheduler::default();

        for (i, mid) in [100.5, 100.4, 100.3, 100.1, 100.0].iter().enumerate() {
            trader.receive(&mut api, &book_update(*mid), i as Timestamp).unwrap();
        }

        match &api.published.last().unwrap().1 {
            Payload::SubmitOrder { side, .. } => assert_eq!(*side, OrderSide::Ask),
            other => panic!("expected SubmitOrder, got {other:?}"),
        }
    }

    #[test]
    fn test_flat_market_stays_quiet() {
        let mut trader = MomentumTrader::with_defaults(AgentId(1));
        let mut api = RecordingScheduler::default();

        for i in 0..10 {
            trader.receive(&mut api, &book_update(100.0), i).unwrap();
        }
        assert!(api.published.is_empty());
        assert_eq!(trader.state.orders_placed(), 0);
    }

    #[test]
    fn test_position_limit_blocks_signal() {
        let config = MomentumConfig {
            max_position: 0,
            ..Default::default()
        };
        let mut trader = MomentumTrader::new(AgentId(1), config);
        let mut api = RecordingScheduler::default();

        for (i, mid) in [100.0, 100.2, 100.4, 100.6, 100.8].iter().enumerate() {
            trader.receive(&mut api, &book_update(*mid), i as Timestamp).unwrap();
        }
        assert!(api.published.is_empty());
    }
}
