//! Core types for the market simulator.
//!
//! This crate provides all shared data types used across the simulation:
//! identifiers, fixed-point monetary values, orders, trades, book views,
//! and the message vocabulary agents exchange.

mod ids;
mod market_data;
mod message;
mod money;
mod order;
mod trade;

pub use ids::{AgentId, OrderId, PRICE_SCALE, Symbol, Timestamp, TradeId};
pub use market_data::{BookLevel, BookSnapshot, MarketStats, TopOfBook};
pub use message::{Message, Payload, Topic, topics};
pub use money::{Cash, Price, Quantity};
pub use order::{CancelReason, Order, OrderSide, OrderStatus, RejectReason, TimeInForce};
pub use trade::Trade;
