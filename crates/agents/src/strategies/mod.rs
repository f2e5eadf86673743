//! Trading strategy agents.
//!
//! Each strategy reacts to published market data (top-of-book updates,
//! interval statistics) and to the direct order-lifecycle replies the
//! exchange sends back. Stochastic strategies take an explicit seed so
//! runs replay identically.

mod market_maker;
mod mean_reversion;
mod momentum;
mod noise_trader;

pub use market_maker::{MarketMaker, MarketMakerConfig};
pub use mean_reversion::{MeanReversionConfig, MeanReversionTrader};
pub use momentum::{MomentumConfig, MomentumTrader};
pub use noise_trader::{NoiseTrader, NoiseTraderConfig};
