//! Market maker - provides liquidity with a two-sided quote.
//!
//! On each wakeup the maker cancels its previous quotes and posts a fresh
//! bid/ask pair around its fair value, skewed away from accumulated
//! inventory. Fair value tracks the published mid price.

use crate::state::AgentState;
use simulation::{Agent, AgentError, EventScheduler};
use types::{
    AgentId, Cash, Message, OrderId, OrderSide, Payload, Price, Quantity, Symbol, TimeInForce,
    Timestamp, topics,
};

/// Configuration for a MarketMaker agent.
#[derive(Debug, Clone)]
pub struct MarketMakerConfig {
    /// Symbol to quote.
    pub symbol: Symbol,
    /// Half-spread as a fraction of fair value (e.g., 0.005 = 0.5%).
    pub half_spread: f64,
    /// Order size to quote on each side.
    pub quote_size: u64,
    /// Fair value used until the market publishes a mid.
    pub initial_fair_value: Price,
    /// Starting cash balance.
    pub initial_cash: Cash,
    /// Inventory bound beyond which quoting pauses (in shares).
    pub max_inventory: i64,
    /// Price adjustment per share of inventory (fraction of fair value).
    pub inventory_skew: f64,
    /// Milliseconds between quote refreshes.
    pub refresh_interval: Timestamp,
}

impl Default for MarketMakerConfig {
    fn default() -> Self {
        Self {
            symbol: "SIM".to_string(),
            half_spread: 0.005,
            quote_size: 10,
            initial_fair_value: Price::from_float(100.0),
            initial_cash: Cash::from_float(1_000_000.0),
            max_inventory: 100,
            inventory_skew: 0.0001,
            refresh_interval: 500,
        }
    }
}

/// A market maker that continuously quotes both sides of the book.
pub struct MarketMaker {
    id: AgentId,
    config: MarketMakerConfig,
    state: AgentState,
    /// Current fair value estimate.
    fair_value: Price,
    /// Ids of quotes believed to be resting; cancelled on each refresh.
    live_orders: Vec<OrderId>,
    /// Correlation tag counter for submissions.
    next_tag: u64,
}

impl MarketMaker {
    /// Create a new MarketMaker with the given configuration.
    pub fn new(id: AgentId, config: MarketMakerConfig) -> Self {
        let initial_cash = config.initial_cash;
        let fair_value = config.initial_fair_value;
        Self {
            id,
            config,
            state: AgentState::new(initial_cash),
            fair_value,
            live_orders: Vec::new(),
            next_tag: 0,
        }
    }

    /// Create a MarketMaker with default configuration.
    pub fn with_defaults(id: AgentId) -> Self {
        Self::new(id, MarketMakerConfig::default())
    }

    /// Get current position.
    pub fn position(&self) -> i64 {
        self.state.position()
    }

    /// Get current cash balance.
    pub fn cash(&self) -> Cash {
        self.state.cash()
    }

    /// Inventory skew: long inventory lowers both quotes to shed shares,
    /// short inventory raises them to buy back.
    fn calculate_skew(&self) -> f64 {
        let clamped = self
            .state
            .position()
            .clamp(-self.config.max_inventory, self.config.max_inventory);
        -self.config.inventory_skew * clamped as f64
    }

    fn quote_prices(&self) -> (Price, Price) {
        let fair = self.fair_value.to_float();
        let skew = self.calculate_skew();
        let bid = Price::from_float(fair * (1.0 - self.config.half_spread + skew));
        let ask = Price::from_float(fair * (1.0 + self.config.half_spread + skew));
        (bid, ask)
    }

    fn submit_quote(
        &mut self,
        api: &mut dyn EventScheduler,
        side: OrderSide,
        price: Price,
        now: Timestamp,
    ) -> Result<(), AgentError> {
        self.next_tag += 1;
        api.publish(
            self.id,
            topics::orders(&self.config.symbol),
            Payload::SubmitOrder {
                symbol: self.config.symbol.clone(),
                side,
                price,
                quantity: Quantity(self.config.quote_size),
                time_in_force: TimeInForce::GoodTillCancel,
                client_tag: self.next_tag,
            },
            now,
        )?;
        self.state.record_order();
        Ok(())
    }
}

impl Agent for MarketMaker {
    fn id(&self) -> AgentId {
        self.id
    }

    fn name(&self) -> &str {
        "MarketMaker"
    }

    fn on_start(&mut self, api: &mut dyn EventScheduler) -> Result<(), AgentError> {
        api.subscribe(self.id, topics::book(&self.config.symbol));
        api.schedule_wakeup(self.id, self.config.refresh_interval)?;
        Ok(())
    }

    fn wakeup(&mut self, api: &mut dyn EventScheduler, now: Timestamp) -> Result<(), AgentError> {
        // Pull stale quotes first. Quotes that filled in the meantime come
        // back as CancelRejected(UnknownOrder), which is harmless.
        for order_id in std::mem::take(&mut self.live_orders) {
            api.publish(
                self.id,
                topics::orders(&self.config.symbol),
                Payload::CancelOrder {
                    symbol: self.config.symbol.clone(),
                    order_id,
                },
                now,
            )?;
        }

        if self.state.position().abs() < self.config.max_inventory {
            let (bid, ask) = self.quote_prices();
            self.submit_quote(api, OrderSide::Bid, bid, now)?;
            self.submit_quote(api, OrderSide::Ask, ask, now)?;
        }

        api.schedule_wakeup(self.id, now + self.config.refresh_interval)?;
        Ok(())
    }

    fn receive(
        &mut self,
        _api: &mut dyn EventScheduler,
        message: &Message,
        _now: Timestamp,
    ) -> Result<(), AgentError> {
        match &message.payload {
            Payload::OrderAccepted {
                order_id, resting, ..
            } => {
                if resting.is_some() {
                    self.live_orders.push(*order_id);
                }
            }
            Payload::Trade(trade) => {
                if trade.buyer_id == self.id {
                    self.state.on_buy(trade.quantity.raw(), trade.value());
                } else if trade.seller_id == self.id {
                    self.state.on_sell(trade.quantity.raw(), trade.value());
                }
            }
            Payload::BookUpdate { top, .. } => {
                if let Some(mid) = top.mid_price() {
                    self.fair_value = mid;
                }
            }
            _ => {}
        }
        Ok(())
    }
}
