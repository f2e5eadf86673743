//! Exchange agent: owns the order books and interprets trading payloads.
//!
//! The exchange subscribes to `ord.<symbol>` for each configured symbol.
//! A `SubmitOrder` runs through the matching engine and produces, in
//! order: an `OrderAccepted` (or `OrderRejected`) straight back to the
//! submitter, a `Trade` per fill to both counterparties and on the public
//! trades topic, and a `BookUpdate` on the book topic whenever the top of
//! book moved. A periodic self-wakeup publishes interval statistics
//! (volume, VWAP, depth) per symbol.

use std::collections::BTreeMap;

use sim_core::{MatchingEngine, OrderBook, SelfTradePolicy};
use simulation::{Agent, AgentError, EventScheduler};
use tracing::{debug, trace};
use types::{
    AgentId, CancelReason, MarketStats, Message, Order, OrderId, OrderSide, Payload, Price,
    Quantity, RejectReason, Symbol, TimeInForce, Timestamp, TopOfBook, Trade, topics,
};

/// Configuration for the exchange agent.
#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    /// Symbols to open books for.
    pub symbols: Vec<Symbol>,
    /// Milliseconds between market-statistics publications.
    pub stats_interval: Timestamp,
    /// Book levels included in published depth snapshots.
    pub snapshot_depth: usize,
    /// Self-trade handling policy for the matching engine.
    pub self_trade_policy: SelfTradePolicy,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            symbols: vec!["SIM".to_string()],
            stats_interval: 100,
            snapshot_depth: 5,
            self_trade_policy: SelfTradePolicy::default(),
        }
    }
}

impl ExchangeConfig {
    /// Configuration for a single symbol with default intervals.
    pub fn new(symbol: impl Into<Symbol>) -> Self {
        Self {
            symbols: vec![symbol.into()],
            ..Default::default()
        }
    }

    /// Add another symbol.
    pub fn add_symbol(mut self, symbol: impl Into<Symbol>) -> Self {
        self.symbols.push(symbol.into());
        self
    }

    /// Set the statistics publication interval.
    pub fn with_stats_interval(mut self, interval: Timestamp) -> Self {
        self.stats_interval = interval;
        self
    }

    /// Set the self-trade policy.
    pub fn with_self_trade_policy(mut self, policy: SelfTradePolicy) -> Self {
        self.self_trade_policy = policy;
        self
    }
}

/// The exchange: one order book per symbol, driven entirely by messages.
pub struct ExchangeAgent {
    id: AgentId,
    config: ExchangeConfig,
    // BTreeMap so per-wakeup statistics iterate symbols in a fixed order.
    books: BTreeMap<Symbol, OrderBook>,
    engine: MatchingEngine,
    /// Every trade this exchange has printed, in execution order.
    trade_history: Vec<Trade>,
    /// Index of the first trade not yet covered by a stats publication.
    stats_cursor: usize,
}

impl ExchangeAgent {
    /// Create an exchange with the given configuration.
    pub fn new(id: AgentId, config: ExchangeConfig) -> Self {
        let books = config
            .symbols
            .iter()
            .map(|s| (s.clone(), OrderBook::new(s.clone())))
            .collect();
        let engine = MatchingEngine::with_policy(config.self_trade_policy);
        Self {
            id,
            config,
            books,
            engine,
            trade_history: Vec::new(),
            stats_cursor: 0,
        }
    }

    /// Create a single-symbol exchange with default configuration.
    pub fn with_symbol(id: AgentId, symbol: impl Into<Symbol>) -> Self {
        Self::new(id, ExchangeConfig::new(symbol))
    }

    /// Access a symbol's book.
    pub fn book(&self, symbol: &str) -> Option<&OrderBook> {
        self.books.get(symbol)
    }

    /// All trades printed so far.
    pub fn trade_history(&self) -> &[Trade] {
        &self.trade_history
    }

    #[allow(clippy::too_many_arguments)]
    fn handle_submit(
        &mut self,
        api: &mut dyn EventScheduler,
        sender: AgentId,
        symbol: &Symbol,
        side: OrderSide,
        price: Price,
        quantity: Quantity,
        time_in_force: TimeInForce,
        client_tag: u64,
        now: Timestamp,
    ) -> Result<(), AgentError> {
        let Some(book) = self.books.get_mut(symbol) else {
            api.send_direct(
                self.id,
                sender,
                Payload::OrderRejected {
                    client_tag,
                    reason: RejectReason::UnknownSymbol,
                },
                now,
            )?;
            return Ok(());
        };

        let top_before = book.top_of_book();
        let order = Order::limit(sender, symbol.clone(), side, price, quantity)
            .with_time_in_force(time_in_force);

        let (result, top_after) = match self.engine.submit(book, order, now) {
            Ok(result) => {
                let top_after = book.top_of_book();
                (result, top_after)
            }
            Err(reason) => {
                trace!(%sender, %symbol, %reason, "order rejected");
                api.send_direct(
                    self.id,
                    sender,
                    Payload::OrderRejected { client_tag, reason },
                    now,
                )?;
                return Ok(());
            }
        };

        debug!(
            %sender,
            %symbol,
            order_id = %result.order_id,
            fills = result.fills.len(),
            resting = ?result.resting,
            "order accepted"
        );

        api.send_direct(
            self.id,
            sender,
            Payload::OrderAccepted {
                order_id: result.order_id,
                client_tag,
                resting: result.resting,
            },
            now,
        )?;

        for trade in result.fills {
            api.send_direct(self.id, trade.buyer_id, Payload::Trade(trade.clone()), now)?;
            if trade.seller_id != trade.buyer_id {
                api.send_direct(self.id, trade.seller_id, Payload::Trade(trade.clone()), now)?;
            }
            api.publish(self.id, topics::trades(symbol), Payload::Trade(trade.clone()), now)?;
            self.trade_history.push(trade);
        }

        self.publish_top_if_changed(api, symbol, top_before, top_after, now)
    }

    fn handle_cancel(
        &mut self,
        api: &mut dyn EventScheduler,
        sender: AgentId,
        symbol: &Symbol,
        order_id: OrderId,
        now: Timestamp,
    ) -> Result<(), AgentError> {
        let Some(book) = self.books.get_mut(symbol) else {
            api.send_direct(
                self.id,
                sender,
                Payload::CancelRejected {
                    order_id,
                    reason: CancelReason::UnknownOrder,
                },
                now,
            )?;
            return Ok(());
        };

        let top_before = book.top_of_book();
        match book.cancel(order_id, sender) {
            Ok(order) => {
                let top_after = book.top_of_book();
                debug!(%sender, %symbol, %order_id, remaining = %order.remaining, "order cancelled");
                api.send_direct(
                    self.id,
                    sender,
                    Payload::OrderCancelled {
                        order_id,
                        cancelled: order.remaining,
                    },
                    now,
                )?;
                self.publish_top_if_changed(api, symbol, top_before, top_after, now)
            }
            Err(reason) => {
                trace!(%sender, %symbol, %order_id, %reason, "cancel rejected");
                api.send_direct(
                    self.id,
                    sender,
                    Payload::CancelRejected { order_id, reason },
                    now,
                )?;
                Ok(())
            }
        }
    }

    fn publish_top_if_changed(
        &mut self,
        api: &mut dyn EventScheduler,
        symbol: &Symbol,
        before: TopOfBook,
        after: TopOfBook,
        now: Timestamp,
    ) -> Result<(), AgentError> {
        if before != after {
            api.publish(
                self.id,
                topics::book(symbol),
                Payload::BookUpdate {
                    symbol: symbol.clone(),
                    top: after,
                },
                now,
            )?;
        }
        Ok(())
    }

    fn publish_statistics(
        &mut self,
        api: &mut dyn EventScheduler,
        now: Timestamp,
    ) -> Result<(), AgentError> {
        let interval_trades = &self.trade_history[self.stats_cursor..];

        for (symbol, book) in &self.books {
            let mut volume = Quantity::ZERO;
            let mut value: i128 = 0;
            for trade in interval_trades.iter().filter(|t| &t.symbol == symbol) {
                volume += trade.quantity;
                value += trade.price.raw() as i128 * trade.quantity.raw() as i128;
            }
            let vwap = (!volume.is_zero()).then(|| Price((value / volume.raw() as i128) as i64));

            let stats = MarketStats {
                symbol: symbol.clone(),
                volume,
                vwap,
                top: book.top_of_book(),
                depth: book.snapshot(now, self.config.snapshot_depth),
            };
            api.publish(self.id, topics::stats(symbol), Payload::MarketData(stats), now)?;
        }

        self.stats_cursor = self.trade_history.len();
        Ok(())
    }
}

impl Agent for ExchangeAgent {
    fn id(&self) -> AgentId {
        self.id
    }

    fn name(&self) -> &str {
        "Exchange"
    }

    fn on_start(&mut self, api: &mut dyn EventScheduler) -> Result<(), AgentError> {
        for symbol in &self.config.symbols {
            api.subscribe(self.id, topics::orders(symbol));
        }
        api.schedule_wakeup(self.id, self.config.stats_interval)?;
        Ok(())
    }

    fn wakeup(&mut self, api: &mut dyn EventScheduler, now: Timestamp) -> Result<(), AgentError> {
        self.publish_statistics(api, now)?;
        api.schedule_wakeup(self.id, now + self.config.stats_interval)?;
        Ok(())
    }

    fn receive(
        &mut self,
        api: &mut dyn EventScheduler,
        message: &Message,
        now: Timestamp,
    ) -> Result<(), AgentError> {
        match &message.payload {
            Payload::SubmitOrder {
                symbol,
                side,
                price,
                quantity,
                time_in_force,
                client_tag,
            } => self.handle_submit(
                api,
                message.sender,
                symbol,
                *side,
                *price,
                *quantity,
                *time_in_force,
                *client_tag,
                now,
            ),
            Payload::CancelOrder { symbol, order_id } => {
                self.handle_cancel(api, message.sender, symbol, *order_id, now)
            }
            other => {
                trace!(sender = %message.sender, ?other, "ignoring non-order payload");
                Ok(())
            }
        }
    }
}
