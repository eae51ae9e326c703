// 2.0 config.rs: all tunables in one place. walk constants, ledger limits, asset presets.

use crate::types::{AssetId, Leverage, Quote};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

// 2.1: static per-asset settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    pub id: AssetId,
    pub symbol: String,
    pub initial_price: Decimal,
    // illiquid assets move more per unit of traded notional
    pub liquidity_multiplier: Decimal,
}

// 2.2: price walk constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketParams {
    // volatility is clamped to [min_vol, max_vol] and relaxes toward baseline_vol
    pub baseline_vol: f64,
    pub min_vol: f64,
    pub max_vol: f64,
    // per-tick geometric relaxation factor, < 1
    pub vol_decay: f64,
    // amplitude of the zero-mean uniform jitter term
    pub jitter: f64,
    // normalizer K in tanh(demand / K); keeps drift bounded for any demand
    pub demand_normalizer: f64,
    pub drift_scale: f64,
    // per-tick geometric decay of the demand accumulator, < 1
    pub demand_decay: f64,
    // fractional price move per unit of notional at liquidity multiplier 1
    pub impact_coefficient: Decimal,
    // at or below this the price halves instead of collapsing to zero
    pub price_floor: Decimal,
    pub history_len: usize,
}

impl Default for MarketParams {
    fn default() -> Self {
        Self {
            baseline_vol: 0.004,
            min_vol: 0.0003,
            max_vol: 0.08,
            vol_decay: 0.9,
            jitter: 0.001,
            demand_normalizer: 5_000.0,
            drift_scale: 0.002,
            demand_decay: 0.8,
            impact_coefficient: dec!(0.000005),
            price_floor: dec!(0.00001),
            history_len: 80,
        }
    }
}

// 2.3: ledger limits and starting funds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerParams {
    pub starting_balance: Quote,
    pub max_leverage: Leverage,
    // closed trades kept for display, oldest trimmed beyond this
    pub history_cap: usize,
    // quote value of one star, used to price top-up requests
    pub quote_per_star: Decimal,
}

impl Default for LedgerParams {
    fn default() -> Self {
        Self {
            starting_balance: Quote::new(dec!(1000)),
            max_leverage: Leverage::new(50).unwrap(),
            history_cap: 80,
            quote_per_star: dec!(10),
        }
    }
}

// 2.4: top-level simulation config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    pub market: MarketParams,
    pub ledger: LedgerParams,
    pub assets: Vec<AssetConfig>,
    // logical clock advance per market tick; the caller controls real cadence
    pub tick_interval_ms: i64,
    // audit events kept, oldest drained beyond this
    pub max_events: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            market: MarketParams::default(),
            ledger: LedgerParams::default(),
            assets: vec![
                AssetConfig {
                    id: AssetId(1),
                    symbol: "COIN-A".to_string(),
                    initial_price: dec!(0.50),
                    liquidity_multiplier: dec!(1),
                },
                AssetConfig {
                    id: AssetId(2),
                    symbol: "COIN-B".to_string(),
                    initial_price: dec!(1.20),
                    liquidity_multiplier: dec!(0.6),
                },
                AssetConfig {
                    id: AssetId(3),
                    symbol: "COIN-C".to_string(),
                    initial_price: dec!(0.08),
                    liquidity_multiplier: dec!(2.5),
                },
            ],
            tick_interval_ms: 1500,
            max_events: 200,
        }
    }
}
