//! Order book implementation using BTreeMap for price-time priority.
//!
//! The book maintains bid and ask ladders keyed by price. Within each
//! price level, orders queue in FIFO order by `(arrival_time, arrival_seq)`.
//! An `OrderId` index makes cancellation O(log N).

use std::collections::{BTreeMap, HashMap, VecDeque};

use types::{
    AgentId, BookLevel, BookSnapshot, CancelReason, Order, OrderId, OrderSide, OrderStatus, Price,
    Quantity, Symbol, Timestamp, TopOfBook,
};

/// A price level containing orders at a single price point.
///
/// Invariant: `total_quantity` equals the sum of `remaining` over the queue,
/// and the level exists in its ladder only while the queue is non-empty.
#[derive(Debug, Clone, Default)]
pub struct PriceLevel {
    /// Total unfilled quantity at this price.
    pub total_quantity: Quantity,
    /// Orders at this price, in arrival order (FIFO).
    pub orders: VecDeque<Order>,
}

impl PriceLevel {
    /// Add an order to the back of the queue.
    pub fn push(&mut self, order: Order) {
        self.total_quantity += order.remaining;
        self.orders.push_back(order);
    }

    /// Peek at the first order without removing it.
    pub fn front(&self) -> Option<&Order> {
        self.orders.front()
    }

    /// Check if this price level is empty.
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Number of orders at this price level.
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }
}

/// Order book for a single symbol.
///
/// Uses `BTreeMap` so price levels iterate in price order:
/// - Bids: best = highest price (reverse iteration)
/// - Asks: best = lowest price (forward iteration)
#[derive(Debug, Clone)]
pub struct OrderBook {
    /// The symbol this order book is for.
    symbol: Symbol,
    /// Buy orders indexed by price.
    bids: BTreeMap<Price, PriceLevel>,
    /// Sell orders indexed by price.
    asks: BTreeMap<Price, PriceLevel>,
    /// Quick lookup of live orders by ID.
    order_index: HashMap<OrderId, (OrderSide, Price)>,
    /// Next order id to assign on acceptance.
    next_order_id: u64,
    /// Per-book arrival counter breaking ties within a price level.
    next_arrival_seq: u64,
    /// Last trade price.
    last_price: Option<Price>,
}

impl OrderBook {
    /// Create a new empty order book for a symbol.
    pub fn new(symbol: impl Into<Symbol>) -> Self {
        Self {
            symbol: symbol.into(),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            order_index: HashMap::new(),
            next_order_id: 1,
            next_arrival_seq: 1,
            last_price: None,
        }
    }

    /// Get the symbol this book is for.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Stamp an incoming order with its id and arrival priority.
    ///
    /// Called once per accepted submission, before matching. A replacement
    /// after cancel goes through here again and lands at the back of the
    /// queue with a fresh `arrival_seq`.
    pub fn assign_arrival(&mut self, order: &mut Order, now: Timestamp) {
        order.id = OrderId(self.next_order_id);
        self.next_order_id += 1;
        order.arrival_time = now;
        order.arrival_seq = self.next_arrival_seq;
        self.next_arrival_seq += 1;
    }

    /// Rest an order at the tail of its price level, creating the level if
    /// needed, and index it for cancellation.
    ///
    /// The caller is responsible for validation and matching; only orders
    /// with `remaining > 0` belong in the book.
    pub fn rest(&mut self, order: Order) {
        debug_assert!(!order.remaining.is_zero());
        self.order_index.insert(order.id, (order.side, order.price));
        self.ladder_mut(order.side)
            .entry(order.price)
            .or_default()
            .push(order);
    }

    /// Remove a resting order on behalf of its owner.
    ///
    /// `UnknownOrder` covers never-existed, already-filled, and
    /// already-cancelled ids alike; `NotOwner` leaves the order untouched.
    pub fn cancel(&mut self, order_id: OrderId, agent_id: AgentId) -> Result<Order, CancelReason> {
        let &(side, price) = self
            .order_index
            .get(&order_id)
            .ok_or(CancelReason::UnknownOrder)?;

        let ladder = self.ladder_mut(side);
        let level = ladder.get_mut(&price).ok_or(CancelReason::UnknownOrder)?;
        let pos = level
            .orders
            .iter()
            .position(|o| o.id == order_id)
            .ok_or(CancelReason::UnknownOrder)?;

        if level.orders[pos].agent_id != agent_id {
            return Err(CancelReason::NotOwner);
        }

        let mut order = level.orders.remove(pos).expect("position just found");
        level.total_quantity = level.total_quantity.saturating_sub(order.remaining);
        if level.is_empty() {
            ladder.remove(&price);
        }
        self.order_index.remove(&order_id);

        order.status = OrderStatus::Cancelled;
        Ok(order)
    }

    /// Forcibly remove a resting order regardless of owner (self-trade
    /// prevention path). Returns the removed order if it was live.
    pub fn remove(&mut self, order_id: OrderId) -> Option<Order> {
        let &(side, price) = self.order_index.get(&order_id)?;
        let ladder = self.ladder_mut(side);
        let level = ladder.get_mut(&price)?;
        let pos = level.orders.iter().position(|o| o.id == order_id)?;

        let mut order = level.orders.remove(pos)?;
        level.total_quantity = level.total_quantity.saturating_sub(order.remaining);
        if level.is_empty() {
            ladder.remove(&price);
        }
        self.order_index.remove(&order_id);

        order.status = OrderStatus::Cancelled;
        Some(order)
    }

    /// Peek at the oldest order of the best level on a side.
    /// Returns (price, agent_id, order_id, remaining).
    pub fn peek_best(&self, side: OrderSide) -> Option<(Price, AgentId, OrderId, Quantity)> {
        let (price, level) = self.best_level(side)?;
        let order = level.front()?;
        Some((price, order.agent_id, order.id, order.remaining))
    }

    /// Fill (reduce) the oldest order of the best level on a side.
    ///
    /// Removes the order when fully filled, deindexes it, and drops the
    /// level once empty. `quantity` must not exceed the order's remaining.
    pub fn fill_best(&mut self, side: OrderSide, quantity: Quantity) {
        let ladder = self.ladder_mut(side);
        let Some((&price, level)) = (match side {
            OrderSide::Bid => ladder.iter_mut().next_back(),
            OrderSide::Ask => ladder.iter_mut().next(),
        }) else {
            return;
        };

        let mut filled_order_id = None;
        if let Some(order) = level.orders.front_mut() {
            debug_assert!(quantity <= order.remaining);
            order.remaining = order.remaining.saturating_sub(quantity);
            order.status = if order.remaining.is_zero() {
                filled_order_id = Some(order.id);
                OrderStatus::Filled
            } else {
                OrderStatus::PartiallyFilled {
                    filled: order.filled(),
                }
            };
        }
        level.total_quantity = level.total_quantity.saturating_sub(quantity);

        if filled_order_id.is_some() {
            level.orders.pop_front();
        }
        if level.is_empty() {
            ladder.remove(&price);
        }
        if let Some(order_id) = filled_order_id {
            self.order_index.remove(&order_id);
        }
    }

    /// Get the best bid price and aggregate quantity.
    pub fn best_bid(&self) -> Option<(Price, Quantity)> {
        self.best_level(OrderSide::Bid)
            .map(|(p, l)| (p, l.total_quantity))
    }

    /// Get the best ask price and aggregate quantity.
    pub fn best_ask(&self) -> Option<(Price, Quantity)> {
        self.best_level(OrderSide::Ask)
            .map(|(p, l)| (p, l.total_quantity))
    }

    /// Current top of book.
    pub fn top_of_book(&self) -> TopOfBook {
        TopOfBook {
            best_bid: self.best_bid(),
            best_ask: self.best_ask(),
        }
    }

    /// Calculate the mid price, falling back to the last trade when one
    /// side is empty.
    pub fn mid_price(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => Some(Price((bid.raw() + ask.raw()) / 2)),
            (Some((bid, _)), None) => Some(bid),
            (None, Some((ask, _))) => Some(ask),
            (None, None) => self.last_price,
        }
    }

    /// Top-`levels` of one side, best first, as (price, aggregate quantity).
    pub fn depth(&self, side: OrderSide, levels: usize) -> Vec<(Price, Quantity)> {
        match side {
            OrderSide::Bid => self
                .bids
                .iter()
                .rev()
                .take(levels)
                .map(|(p, l)| (*p, l.total_quantity))
                .collect(),
            OrderSide::Ask => self
                .asks
                .iter()
                .take(levels)
                .map(|(p, l)| (*p, l.total_quantity))
                .collect(),
        }
    }

    /// Get a snapshot of the top `depth` levels of the book.
    pub fn snapshot(&self, timestamp: Timestamp, depth: usize) -> BookSnapshot {
        let to_level = |(price, level): (&Price, &PriceLevel)| BookLevel {
            price: *price,
            quantity: level.total_quantity,
            order_count: level.order_count(),
        };

        BookSnapshot {
            symbol: self.symbol.clone(),
            bids: self.bids.iter().rev().take(depth).map(to_level).collect(),
            asks: self.asks.iter().take(depth).map(to_level).collect(),
            timestamp,
        }
    }

    /// Look up a live resting order by id.
    pub fn get_order(&self, order_id: OrderId) -> Option<&Order> {
        let &(side, price) = self.order_index.get(&order_id)?;
        self.ladder(side)
            .get(&price)?
            .orders
            .iter()
            .find(|o| o.id == order_id)
    }

    /// Update the last traded price.
    pub fn set_last_price(&mut self, price: Price) {
        self.last_price = Some(price);
    }

    /// Get the last traded price.
    pub fn last_price(&self) -> Option<Price> {
        self.last_price
    }

    /// Check if the book has any orders.
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Number of price levels on the bid side.
    pub fn bid_levels(&self) -> usize {
        self.bids.len()
    }

    /// Number of price levels on the ask side.
    pub fn ask_levels(&self) -> usize {
        self.asks.len()
    }

    /// Total number of live resting orders.
    pub fn order_count(&self) -> usize {
        self.order_index.len()
    }

    /// Access a price level directly (used by invariant checks in tests).
    pub fn level(&self, side: OrderSide, price: Price) -> Option<&PriceLevel> {
        self.ladder(side).get(&price)
    }

    fn ladder(&self, side: OrderSide) -> &BTreeMap<Price, PriceLevel> {
        match side {
            OrderSide::Bid => &self.bids,
            OrderSide::Ask => &self.asks,
        }
    }

    fn ladder_mut(&mut self, side: OrderSide) -> &mut BTreeMap<Price, PriceLevel> {
        match side {
            OrderSide::Bid => &mut self.bids,
            OrderSide::Ask => &mut self.asks,
        }
    }

    fn best_level(&self, side: OrderSide) -> Option<(Price, &PriceLevel)> {
        match side {
            OrderSide::Bid => self.bids.iter().next_back().map(|(p, l)| (*p, l)),
            OrderSide::Ask => self.asks.iter().next().map(|(p, l)| (*p, l)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resting_order(book: &mut OrderBook, agent: u64, side: OrderSide, price: f64, qty: u64) -> OrderId {
        let mut order = Order::limit(
            AgentId(agent),
            book.symbol().to_string(),
            side,
            Price::from_float(price),
            Quantity(qty),
        );
        book.assign_arrival(&mut order, 0);
        let id = order.id;
        book.rest(order);
        id
    }

    #[test]
    fn test_new_order_book() {
        let book = OrderBook::new("AAPL");
        assert_eq!(book.symbol(), "AAPL");
        assert!(book.is_empty());
        assert_eq!(book.best_bid(), None);
        assert_eq!(book.best_ask(), None);
    }

    #[test]
    fn test_rest_bid_and_ask() {
        let mut book = OrderBook::new("AAPL");
        resting_order(&mut book, 1, OrderSide::Bid, 100.0, 50);
        resting_order(&mut book, 2, OrderSide::Ask, 101.0, 75);

        assert_eq!(
            book.best_bid(),
            Some((Price::from_float(100.0), Quantity(50)))
        );
        assert_eq!(
            book.best_ask(),
            Some((Price::from_float(101.0), Quantity(75)))
        );
        assert_eq!(book.order_count(), 2);
    }

    #[test]
    fn test_best_is_highest_bid_lowest_ask() {
        let mut book = OrderBook::new("AAPL");
        resting_order(&mut book, 1, OrderSide::Bid, 99.0, 100);
        resting_order(&mut book, 1, OrderSide::Bid, 100.0, 50);
        resting_order(&mut book, 1, OrderSide::Bid, 98.0, 200);
        resting_order(&mut book, 2, OrderSide::Ask, 102.0, 150);
        resting_order(&mut book, 2, OrderSide::Ask, 101.0, 75);

        assert_eq!(book.best_bid().unwrap().0, Price::from_float(100.0));
        assert_eq!(book.best_ask().unwrap().0, Price::from_float(101.0));
        assert_eq!(book.bid_levels(), 3);
        assert_eq!(book.ask_levels(), 2);
    }

    #[test]
    fn test_fifo_within_level() {
        let mut book = OrderBook::new("AAPL");
        let first = resting_order(&mut book, 1, OrderSide::Bid, 100.0, 50);
        resting_order(&mut book, 2, OrderSide::Bid, 100.0, 75);
        resting_order(&mut book, 3, OrderSide::Bid, 100.0, 25);

        let level = book.level(OrderSide::Bid, Price::from_float(100.0)).unwrap();
        assert_eq!(level.front().unwrap().id, first);
        assert_eq!(level.total_quantity, Quantity(150));
        assert_eq!(level.order_count(), 3);
    }

    #[test]
    fn test_arrival_seq_monotone() {
        let mut book = OrderBook::new("AAPL");
        let mut a = Order::limit(
            AgentId(1),
            "AAPL",
            OrderSide::Bid,
            Price::from_float(100.0),
            Quantity(10),
        );
        let mut b = a.clone();
        book.assign_arrival(&mut a, 5);
        book.assign_arrival(&mut b, 5);
        assert!(a.arrival_seq < b.arrival_seq);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_cancel_order() {
        let mut book = OrderBook::new("AAPL");
        let first = resting_order(&mut book, 1, OrderSide::Bid, 100.0, 50);
        let second = resting_order(&mut book, 1, OrderSide::Bid, 100.0, 75);

        let cancelled = book.cancel(first, AgentId(1)).unwrap();
        assert_eq!(cancelled.id, first);
        assert_eq!(cancelled.status, OrderStatus::Cancelled);

        let level = book.level(OrderSide::Bid, Price::from_float(100.0)).unwrap();
        assert_eq!(level.front().unwrap().id, second);
        assert_eq!(level.total_quantity, Quantity(75));
    }

    #[test]
    fn test_cancel_unknown_order() {
        let mut book = OrderBook::new("AAPL");
        assert_eq!(
            book.cancel(OrderId(999), AgentId(1)),
            Err(CancelReason::UnknownOrder)
        );
    }

    #[test]
    fn test_cancel_not_owner_leaves_order() {
        let mut book = OrderBook::new("AAPL");
        let id = resting_order(&mut book, 1, OrderSide::Ask, 101.0, 30);

        assert_eq!(book.cancel(id, AgentId(2)), Err(CancelReason::NotOwner));
        // Still live and still cancellable by the real owner.
        assert!(book.get_order(id).is_some());
        assert!(book.cancel(id, AgentId(1)).is_ok());
    }

    #[test]
    fn test_cancel_removes_empty_level() {
        let mut book = OrderBook::new("AAPL");
        let id = resting_order(&mut book, 1, OrderSide::Bid, 100.0, 50);
        assert_eq!(book.bid_levels(), 1);

        book.cancel(id, AgentId(1)).unwrap();
        assert_eq!(book.bid_levels(), 0);
        assert!(book.is_empty());
    }

    #[test]
    fn test_fill_best_partial_keeps_order() {
        let mut book = OrderBook::new("AAPL");
        let id = resting_order(&mut book, 1, OrderSide::Ask, 101.0, 50);

        book.fill_best(OrderSide::Ask, Quantity(20));

        let order = book.get_order(id).unwrap();
        assert_eq!(order.remaining, Quantity(30));
        assert_eq!(
            order.status,
            OrderStatus::PartiallyFilled {
                filled: Quantity(20)
            }
        );
        assert_eq!(
            book.best_ask(),
            Some((Price::from_float(101.0), Quantity(30)))
        );
    }

    #[test]
    fn test_fill_best_full_removes_and_deindexes() {
        let mut book = OrderBook::new("AAPL");
        let id = resting_order(&mut book, 1, OrderSide::Ask, 101.0, 50);

        book.fill_best(OrderSide::Ask, Quantity(50));

        assert!(book.get_order(id).is_none());
        assert_eq!(book.best_ask(), None);
        assert_eq!(book.order_count(), 0);
        // Fully filled orders are gone for cancellation purposes too.
        assert_eq!(book.cancel(id, AgentId(1)), Err(CancelReason::UnknownOrder));
    }

    #[test]
    fn test_depth_ordering() {
        let mut book = OrderBook::new("AAPL");
        resting_order(&mut book, 1, OrderSide::Bid, 99.0, 100);
        resting_order(&mut book, 1, OrderSide::Bid, 100.0, 50);
        resting_order(&mut book, 1, OrderSide::Bid, 98.0, 200);

        let depth = book.depth(OrderSide::Bid, 2);
        assert_eq!(
            depth,
            vec![
                (Price::from_float(100.0), Quantity(50)),
                (Price::from_float(99.0), Quantity(100)),
            ]
        );
    }

    #[test]
    fn test_snapshot() {
        let mut book = OrderBook::new("AAPL");
        resting_order(&mut book, 1, OrderSide::Bid, 99.0, 100);
        resting_order(&mut book, 1, OrderSide::Bid, 98.0, 200);
        resting_order(&mut book, 2, OrderSide::Ask, 101.0, 150);

        let snapshot = book.snapshot(1000, 10);
        assert_eq!(snapshot.symbol, "AAPL");
        assert_eq!(snapshot.timestamp, 1000);
        assert_eq!(snapshot.bids.len(), 2);
        assert_eq!(snapshot.asks.len(), 1);
        assert_eq!(snapshot.best_bid(), Some(Price::from_float(99.0)));
        assert_eq!(snapshot.best_ask(), Some(Price::from_float(101.0)));
    }

    #[test]
    fn test_level_quantity_matches_orders() {
        let mut book = OrderBook::new("AAPL");
        resting_order(&mut book, 1, OrderSide::Ask, 101.0, 10);
        resting_order(&mut book, 2, OrderSide::Ask, 101.0, 20);
        book.fill_best(OrderSide::Ask, Quantity(4));

        let level = book.level(OrderSide::Ask, Price::from_float(101.0)).unwrap();
        let sum: Quantity = level.orders.iter().map(|o| o.remaining).sum();
        assert_eq!(level.total_quantity, sum);
    }

    #[test]
    fn test_mid_price_fallbacks() {
        let mut book = OrderBook::new("AAPL");
        assert_eq!(book.mid_price(), None);

        book.set_last_price(Price::from_float(50.0));
        assert_eq!(book.mid_price(), Some(Price::from_float(50.0)));

        resting_order(&mut book, 1, OrderSide::Bid, 99.0, 10);
        assert_eq!(book.mid_price(), Some(Price::from_float(99.0)));

        resting_order(&mut book, 2, OrderSide::Ask, 101.0, 10);
        assert_eq!(book.mid_price(), Some(Price::from_float(100.0)));
    }
}
