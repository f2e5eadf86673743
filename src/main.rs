//! Market simulator - demo driver.
//!
//! Builds a kernel, an exchange, and a small population of traders, runs
//! the market to a virtual horizon, and reports what happened. The trade
//! tape is captured the same way any agent would capture it: by
//! subscribing to the public trades topic.

mod config;

use std::sync::{Arc, Mutex};

use agents::{
    ExchangeAgent, ExchangeConfig, MarketMaker, MarketMakerConfig, MeanReversionConfig,
    MeanReversionTrader, MomentumConfig, MomentumTrader, NoiseTrader, NoiseTraderConfig,
};
use simulation::{Agent, AgentError, EventScheduler, Kernel};
use tracing_subscriber::EnvFilter;
use types::{AgentId, Message, Payload, Timestamp, Trade, topics};

pub use config::SimConfig;

/// Collects public trade prints for the end-of-run report.
struct TradeTape {
    id: AgentId,
    symbol: String,
    trades: Arc<Mutex<Vec<Trade>>>,
}

impl Agent for TradeTape {
    fn id(&self) -> AgentId {
        self.id
    }

    fn name(&self) -> &str {
        "TradeTape"
    }

    fn on_start(&mut self, api: &mut dyn EventScheduler) -> Result<(), AgentError> {
        api.subscribe(self.id, topics::trades(&self.symbol));
        Ok(())
    }

    fn receive(
        &mut self,
        _api: &mut dyn EventScheduler,
        message: &Message,
        _now: Timestamp,
    ) -> Result<(), AgentError> {
        if let Payload::Trade(trade) = &message.payload {
            self.trades.lock().unwrap().push(trade.clone());
        }
        Ok(())
    }
}

fn build_kernel(config: &SimConfig, trades: Arc<Mutex<Vec<Trade>>>) -> Kernel {
    let mut kernel = Kernel::new();
    let mut next_id = 1u64;
    let mut fresh_id = || {
        let id = AgentId(next_id);
        next_id += 1;
        id
    };

    kernel
        .register_agent(Box::new(ExchangeAgent::new(
            fresh_id(),
            ExchangeConfig::new(config.symbol.clone()),
        )))
        .expect("registering the exchange");

    for _ in 0..config.num_market_makers {
        let mm_config = MarketMakerConfig {
            symbol: config.symbol.clone(),
            half_spread: config.mm_half_spread,
            quote_size: config.mm_quote_size,
            initial_fair_value: config.initial_price,
            initial_cash: config.mm_initial_cash,
            max_inventory: config.mm_max_inventory,
            inventory_skew: config.mm_inventory_skew,
            refresh_interval: config.mm_refresh_interval,
        };
        kernel
            .register_agent(Box::new(MarketMaker::new(fresh_id(), mm_config)))
            .expect("registering a market maker");
    }

    if config.with_momentum {
        let momentum_config = MomentumConfig {
            symbol: config.symbol.clone(),
            ..Default::default()
        };
        kernel
            .register_agent(Box::new(MomentumTrader::new(fresh_id(), momentum_config)))
            .expect("registering the momentum trader");
    }

    if config.with_mean_reversion {
        let reversion_config = MeanReversionConfig {
            symbol: config.symbol.clone(),
            initial_fair_value: config.initial_price,
            ..Default::default()
        };
        kernel
            .register_agent(Box::new(MeanReversionTrader::new(
                fresh_id(),
                reversion_config,
            )))
            .expect("registering the mean reversion trader");
    }

    for i in 0..config.num_noise_traders {
        let nt_config = NoiseTraderConfig {
            symbol: config.symbol.clone(),
            wake_interval: config.nt_wake_interval,
            order_probability: config.nt_order_probability,
            market_order_probability: config.nt_market_order_probability,
            price_deviation: config.nt_price_deviation,
            min_quantity: config.nt_min_quantity,
            max_quantity: config.nt_max_quantity,
            initial_price: config.initial_price,
            initial_cash: config.nt_initial_cash,
        };
        kernel
            .register_agent(Box::new(NoiseTrader::with_seed(
                fresh_id(),
                nt_config,
                config.seed.wrapping_add(i as u64),
            )))
            .expect("registering a noise trader");
    }

    kernel
        .register_agent(Box::new(TradeTape {
            id: fresh_id(),
            symbol: config.symbol.clone(),
            trades,
        }))
        .expect("registering the trade tape");

    kernel
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = SimConfig::default();
    // Or use a preset:
    // let config = SimConfig::demo();
    // let config = SimConfig::high_activity();

    eprintln!(
        "market-sim: {} agents trading {} for {}ms (seed {})",
        config.total_agents(),
        config.symbol,
        config.horizon_ms,
        config.seed
    );

    let trades = Arc::new(Mutex::new(Vec::new()));
    let mut kernel = build_kernel(&config, trades.clone());

    let summary = match kernel.run(Some(config.horizon_ms)) {
        Ok(summary) => summary,
        Err(err) => {
            eprintln!("simulation failed: {err}");
            std::process::exit(1);
        }
    };

    let trades = trades.lock().unwrap();
    eprintln!("run complete: {summary}");
    eprintln!("total trades: {}", trades.len());

    if !trades.is_empty() {
        eprintln!("last {} trades:", config.trade_tail.min(trades.len()));
        for trade in trades.iter().rev().take(config.trade_tail).rev() {
            eprintln!("  [{}ms] {}", trade.timestamp, trade);
        }
    }
}
