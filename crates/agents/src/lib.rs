//! Agents for the market simulator.
//!
//! This crate provides the exchange agent (the only owner of order books)
//! and the trading strategies that drive order flow. All agents implement
//! the `simulation::Agent` contract and interact with the world purely
//! through scheduled messages.

mod exchange;
mod state;
mod strategies;

pub use exchange::{ExchangeAgent, ExchangeConfig};
pub use state::AgentState;
pub use strategies::{
    MarketMaker, MarketMakerConfig, MeanReversionConfig, MeanReversionTrader, MomentumConfig,
    MomentumTrader, NoiseTrader, NoiseTraderConfig,
};
