//! Mean reversion trader - fades extreme moves.
//!
//! Tracks fair value from the exchange's published interval VWAP and
//! watches top-of-book mids. When the mid deviates from fair value by
//! more than a threshold it trades against the move, with a limit order
//! halfway between the current price and fair value.

use std::collections::VecDeque;

use crate::state::AgentState;
use simulation::{Agent, AgentError, EventScheduler};
use types::{
    AgentId, Cash, Message, OrderSide, Payload, Price, Quantity, Symbol, TimeInForce, Timestamp,
    topics,
};

/// Configuration for a MeanReversionTrader agent.
#[derive(Debug, Clone)]
pub struct MeanReversionConfig {
    /// Symbol to trade.
    pub symbol: Symbol,
    /// Mid-price observations retained.
    pub window: usize,
    /// Observations required before trading.
    pub min_history: usize,
    /// Deviation from fair value that triggers a fade.
    pub deviation_threshold: Price,
    /// Shares per order.
    pub order_size: u64,
    /// Absolute position bound.
    pub max_position: i64,
    /// Fair value used until the exchange publishes a VWAP.
    pub initial_fair_value: Price,
    /// Starting cash balance.
    pub initial_cash: Cash,
}

impl Default for MeanReversionConfig {
    fn default() -> Self {
        Self {
            symbol: "SIM".to_string(),
            window: 20,
            min_history: 10,
            deviation_threshold: Price::from_float(1.0),
            order_size: 15,
            max_position: 100,
            initial_fair_value: Price::from_float(100.0),
            initial_cash: Cash::from_float(100_000.0),
        }
    }
}

/// A contrarian that buys dips below fair value and sells spikes above it.
pub struct MeanReversionTrader {
    id: AgentId,
    config: MeanReversionConfig,
    state: AgentState,
    /// Recent mid prices, oldest first.
    mids: VecDeque<Price>,
    /// Fair value estimate, tracking the published interval VWAP.
    fair_value: Price,
    next_tag: u64,
}

impl MeanReversionTrader {
    /// Create a new MeanReversionTrader with the given configuration.
    pub fn new(id: AgentId, config: MeanReversionConfig) -> Self {
        let initial_cash = config.initial_cash;
        let fair_value = config.initial_fair_value;
        Self {
            id,
            config,
            state: AgentState::new(initial_cash),
            mids: VecDeque::new(),
            fair_value,
            next_tag: 0,
        }
    }

    /// Create a MeanReversionTrader with default configuration.
    pub fn with_defaults(id: AgentId) -> Self {
        Self::new(id, MeanReversionConfig::default())
    }

    /// Get current position.
    pub fn position(&self) -> i64 {
        self.state.position()
    }

    /// Current fair value estimate.
    pub fn fair_value(&self) -> Price {
        self.fair_value
    }

    fn record_mid(&mut self, mid: Price) {
        self.mids.push_back(mid);
        while self.mids.len() > self.config.window {
            self.mids.pop_front();
        }
    }

    fn signal(&self, mid: Price) -> Option<OrderSide> {
        if self.mids.len() < self.config.min_history {
            return None;
        }
        let deviation = mid - self.fair_value;
        if deviation < -self.config.deviation_threshold
            && self.state.position() < self.config.max_position
        {
            Some(OrderSide::Bid)
        } else if deviation > self.config.deviation_threshold
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
        mid: Price,
        now: Timestamp,
    ) -> Result<(), AgentError> {
        // Limit halfway back toward fair value.
        let price = Price((mid.raw() + self.fair_value.raw()) / 2);

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

impl Agent for MeanReversionTrader {
    fn id(&self) -> AgentId {
        self.id
    }

    fn name(&self) -> &str {
        "MeanReversionTrader"
    }

    fn on_start(&mut self, api: &mut dyn EventScheduler) -> Result<(), AgentError> {
        api.subscribe(self.id, topics::book(&self.config.symbol));
        api.subscribe(self.id, topics::stats(&self.config.symbol));
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
                    if let Some(side) = self.signal(mid) {
                        self.place_order(api, side, mid, now)?;
                    }
                }
            }
            Payload::MarketData(stats) => {
                if let Some(vwap) = stats.vwap {
                    self.fair_value = vwap;
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
