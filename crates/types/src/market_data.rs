//! Market data types: book levels, snapshots, top-of-book, and the
//! periodic statistics the exchange publishes.

use crate::ids::{Symbol, Timestamp};
use crate::money::{Price, Quantity};
use serde::{Deserialize, Serialize};

// =============================================================================
// Order Book Views
// =============================================================================

/// A single price level in a book snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    /// Price at this level.
    pub price: Price,
    /// Total quantity available at this price.
    pub quantity: Quantity,
    /// Number of orders at this level.
    pub order_count: usize,
}

/// Snapshot of the top N levels of an order book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BookSnapshot {
    /// Symbol this book is for.
    pub symbol: Symbol,
    /// Bid levels (highest first).
    pub bids: Vec<BookLevel>,
    /// Ask levels (lowest first).
    pub asks: Vec<BookLevel>,
    /// Virtual time the snapshot was taken.
    pub timestamp: Timestamp,
}

impl BookSnapshot {
    /// Get the best bid price.
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.first().map(|l| l.price)
    }

    /// Get the best ask price.
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first().map(|l| l.price)
    }

    /// Calculate the spread between best bid and ask.
    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Calculate the mid price.
    pub fn mid_price(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(Price((bid.0 + ask.0) / 2)),
            _ => None,
        }
    }
}

/// Best bid and best ask with their aggregate level quantities.
///
/// Published on the `md.<symbol>.book` topic whenever either side of the
/// top changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TopOfBook {
    /// Best bid price and aggregate quantity, if any bids rest.
    pub best_bid: Option<(Price, Quantity)>,
    /// Best ask price and aggregate quantity, if any asks rest.
    pub best_ask: Option<(Price, Quantity)>,
}

impl TopOfBook {
    /// Calculate the mid price.
    pub fn mid_price(&self) -> Option<Price> {
        match (self.best_bid, self.best_ask) {
            (Some((bid, _)), Some((ask, _))) => Some(Price((bid.0 + ask.0) / 2)),
            _ => None,
        }
    }

    /// Calculate the spread between best bid and ask.
    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid, self.best_ask) {
            (Some((bid, _)), Some((ask, _))) => Some(ask - bid),
            _ => None,
        }
    }
}

// =============================================================================
// Periodic Market Statistics
// =============================================================================

/// Interval statistics the exchange publishes on `md.<symbol>.stats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketStats {
    /// Symbol these statistics cover.
    pub symbol: Symbol,
    /// Shares traded since the previous statistics publication.
    pub volume: Quantity,
    /// Volume-weighted average price over the interval, if anything traded.
    pub vwap: Option<Price>,
    /// Top of book at publication time.
    pub top: TopOfBook,
    /// Depth snapshot at publication time.
    pub depth: BookSnapshot,
}
