//! Noise trader - generates random background activity.
//!
//! Wakes on a fixed interval and, with some probability, submits a random
//! limit order near the current mid. Occasionally it crosses the spread
//! with a marketable order instead, which keeps trades printing even when
//! the book is one-sided. All randomness comes from a seeded RNG so runs
//! replay identically.

use crate::state::AgentState;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use simulation::{Agent, AgentError, EventScheduler};
use types::{
    AgentId, Cash, Message, OrderSide, Payload, Price, Quantity, Symbol, TimeInForce, Timestamp,
    topics,
};

/// Configuration for a NoiseTrader agent.
#[derive(Debug, Clone)]
pub struct NoiseTraderConfig {
    /// Symbol to trade.
    pub symbol: Symbol,
    /// Milliseconds between wakeups.
    pub wake_interval: Timestamp,
    /// Probability of placing an order on each wakeup.
    pub order_probability: f64,
    /// Probability that a placed order is marketable (crosses the spread).
    pub market_order_probability: f64,
    /// Maximum price deviation from the reference as a fraction.
    pub price_deviation: f64,
    /// Minimum order size.
    pub min_quantity: u64,
    /// Maximum order size.
    pub max_quantity: u64,
    /// Price reference when the market has not printed yet.
    pub initial_price: Price,
    /// Starting cash balance.
    pub initial_cash: Cash,
}

impl Default for NoiseTraderConfig {
    fn default() -> Self {
        Self {
            symbol: "SIM".to_string(),
            wake_interval: 250,
            order_probability: 0.5,
            market_order_probability: 0.1,
            price_deviation: 0.02,
            min_quantity: 1,
            max_quantity: 20,
            initial_price: Price::from_float(100.0),
            initial_cash: Cash::from_float(100_000.0),
        }
    }
}

/// A random trader that keeps the market busy.
pub struct NoiseTrader {
    id: AgentId,
    config: NoiseTraderConfig,
    state: AgentState,
    rng: StdRng,
    /// Latest published mid, used as the price reference.
    last_mid: Option<Price>,
    next_tag: u64,
}

impl NoiseTrader {
    /// Create a NoiseTrader with an explicit seed so runs reproduce.
    pub fn with_seed(id: AgentId, config: NoiseTraderConfig, seed: u64) -> Self {
        let initial_cash = config.initial_cash;
        Self {
            id,
            config,
            state: AgentState::new(initial_cash),
            rng: StdRng::seed_from_u64(seed),
            last_mid: None,
            next_tag: 0,
        }
    }

    /// Get current position.
    pub fn position(&self) -> i64 {
        self.state.position()
    }

    /// Get current cash balance.
    pub fn cash(&self) -> Cash {
        self.state.cash()
    }

    fn reference_price(&self) -> Price {
        self.last_mid.unwrap_or(self.config.initial_price)
    }

    fn random_order(&mut self) -> (OrderSide, Price, Quantity, TimeInForce) {
        let side = if self.rng.random_bool(0.5) {
            OrderSide::Bid
        } else {
            OrderSide::Ask
        };
        let quantity = Quantity(
            self.rng
                .random_range(self.config.min_quantity..=self.config.max_quantity),
        );

        if self.rng.random_bool(self.config.market_order_probability) {
            // Marketable: a limit at the extreme price, immediate-or-cancel.
            let price = match side {
                OrderSide::Bid => Price::MAX_LIMIT,
                OrderSide::Ask => Price::MIN_LIMIT,
            };
            return (side, price, quantity, TimeInForce::ImmediateOrCancel);
        }

        let deviation = self
            .rng
            .random_range(-self.config.price_deviation..self.config.price_deviation);
        let price_float = (self.reference_price().to_float() * (1.0 + deviation)).max(0.01);
        (
            side,
            Price::from_float(price_float),
            quantity,
            TimeInForce::GoodTillCancel,
        )
    }
}

impl Agent for NoiseTrader {
    fn id(&self) -> AgentId {
        self.id
    }

    fn name(&self) -> &str {
        "NoiseTrader"
    }

    fn on_start(&mut self, api: &mut dyn EventScheduler) -> Result<(), AgentError> {
        api.subscribe(self.id, topics::book(&self.config.symbol));
        api.schedule_wakeup(self.id, self.config.wake_interval)?;
        Ok(())
    }

    fn wakeup(&mut self, api: &mut dyn EventScheduler, now: Timestamp) -> Result<(), AgentError> {
        if self.rng.random_bool(self.config.order_probability) {
            let (side, price, quantity, time_in_force) = self.random_order();
            self.next_tag += 1;
            api.publish(
                self.id,
                topics::orders(&self.config.symbol),
                Payload::SubmitOrder {
                    symbol: self.config.symbol.clone(),
                    side,
                    price,
                    quantity,
                    time_in_force,
                    client_tag: self.next_tag,
                },
                now,
            )?;
            self.state.record_order();
        }

        api.schedule_wakeup(self.id, now + self.config.wake_interval)?;
        Ok(())
    }

    fn receive(
        &mut self,
        _api: &mut dyn EventScheduler,
        message: &Message,
        _now: Timestamp,
    ) -> Result<(), AgentError> {
        match &message.payload {
            Payload::BookUpdate { top, .. } => {
                if let Some(mid) = top.mid_price() {
                    self.last_mid = Some(mid);
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
