//! Central configuration for the demo simulation.
//!
//! All driver parameters are defined here for easy tuning.

use types::{Cash, Price, Timestamp};

/// Master configuration for the demo market.
#[derive(Debug, Clone)]
pub struct SimConfig {
    // ─────────────────────────────────────────────────────────────────────────
    // Simulation Control
    // ─────────────────────────────────────────────────────────────────────────
    /// Symbol being traded.
    pub symbol: String,
    /// Reference price agents use before the market prints.
    pub initial_price: Price,
    /// Virtual horizon in milliseconds.
    pub horizon_ms: Timestamp,
    /// Base seed for the stochastic agents.
    pub seed: u64,
    /// Trades to echo at the end of the run.
    pub trade_tail: usize,

    // ─────────────────────────────────────────────────────────────────────────
    // Agent Counts
    // ─────────────────────────────────────────────────────────────────────────
    /// Number of market makers.
    pub num_market_makers: usize,
    /// Number of noise traders.
    pub num_noise_traders: usize,
    /// Whether to include a momentum trader.
    pub with_momentum: bool,
    /// Whether to include a mean reversion trader.
    pub with_mean_reversion: bool,

    // ─────────────────────────────────────────────────────────────────────────
    // Market Maker Parameters
    // ─────────────────────────────────────────────────────────────────────────
    /// Starting cash for each market maker.
    pub mm_initial_cash: Cash,
    /// Half-spread as a fraction (e.g., 0.0025 = 0.25%).
    pub mm_half_spread: f64,
    /// Number of shares to quote on each side.
    pub mm_quote_size: u64,
    /// Milliseconds between quote refreshes.
    pub mm_refresh_interval: Timestamp,
    /// Maximum inventory before quoting pauses.
    pub mm_max_inventory: i64,
    /// Price adjustment per unit of inventory.
    pub mm_inventory_skew: f64,

    // ─────────────────────────────────────────────────────────────────────────
    // Noise Trader Parameters
    // ─────────────────────────────────────────────────────────────────────────
    /// Starting cash for each noise trader.
    pub nt_initial_cash: Cash,
    /// Milliseconds between noise trader wakeups.
    pub nt_wake_interval: Timestamp,
    /// Probability of placing an order on each wakeup.
    pub nt_order_probability: f64,
    /// Probability that a placed order crosses the spread.
    pub nt_market_order_probability: f64,
    /// Maximum price deviation from the reference as a fraction.
    pub nt_price_deviation: f64,
    /// Minimum order quantity.
    pub nt_min_quantity: u64,
    /// Maximum order quantity.
    pub nt_max_quantity: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            // Simulation Control
            symbol: "SIM".to_string(),
            initial_price: Price::from_float(100.0),
            horizon_ms: 60_000,
            seed: 42,
            trade_tail: 5,

            // Agent Counts
            num_market_makers: 2,
            num_noise_traders: 10,
            with_momentum: true,
            with_mean_reversion: true,

            // Market Maker Parameters
            mm_initial_cash: Cash::from_float(1_000_000.0),
            mm_half_spread: 0.0025,
            mm_quote_size: 50,
            mm_refresh_interval: 500,
            mm_max_inventory: 200,
            mm_inventory_skew: 0.0001,

            // Noise Trader Parameters
            nt_initial_cash: Cash::from_float(10_000.0),
            nt_wake_interval: 250,
            nt_order_probability: 0.5,
            nt_market_order_probability: 0.1,
            nt_price_deviation: 0.01,
            nt_min_quantity: 5,
            nt_max_quantity: 30,
        }
    }
}

impl SimConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Quick 10-second market for smoke testing.
    pub fn demo() -> Self {
        Self {
            horizon_ms: 10_000,
            num_noise_traders: 5,
            ..Self::default()
        }
    }

    /// Busy market: many noise traders, aggressive crossing.
    pub fn high_activity() -> Self {
        Self {
            num_noise_traders: 40,
            nt_order_probability: 0.8,
            nt_market_order_probability: 0.25,
            ..Self::default()
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Builder-style setters for fluent configuration
    // ─────────────────────────────────────────────────────────────────────────

    /// Set the trading symbol.
    pub fn symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = symbol.into();
        self
    }

    /// Set the initial asset price.
    pub fn initial_price(mut self, price: f64) -> Self {
        self.initial_price = Price::from_float(price);
        self
    }

    /// Set the virtual horizon in milliseconds.
    pub fn horizon_ms(mut self, ms: Timestamp) -> Self {
        self.horizon_ms = ms;
        self
    }

    /// Set the base seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set number of market makers.
    pub fn market_makers(mut self, count: usize) -> Self {
        self.num_market_makers = count;
        self
    }

    /// Set number of noise traders.
    pub fn noise_traders(mut self, count: usize) -> Self {
        self.num_noise_traders = count;
        self
    }

    /// Total number of agents, exchange included.
    pub fn total_agents(&self) -> usize {
        1 + self.num_market_makers
            + self.num_noise_traders
            + usize::from(self.with_momentum)
            + usize::from(self.with_mean_reversion)
    }
}
