//! Synthetic assets and shared market state.
//!
//! `MarketState` is owned exclusively by the price engine; everything else
//! reads prices through the engine or through snapshots.

use crate::config::AssetConfig;
use crate::types::{AssetId, Price};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

// 3.0: one synthetic asset. price is positive at all times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub symbol: String,
    pub price: Price,
    // rolling price history, oldest evicted first
    pub history: VecDeque<Price>,
    // net recent buy pressure, decays each tick so impact is transient
    pub demand: f64,
    pub liquidity_multiplier: Decimal,
}

impl Asset {
    pub fn from_config(config: &AssetConfig) -> Option<Self> {
        let price = Price::new(config.initial_price)?;
        let mut history = VecDeque::new();
        history.push_back(price);
        Some(Self {
            id: config.id,
            symbol: config.symbol.clone(),
            price,
            history,
            demand: 0.0,
            liquidity_multiplier: config.liquidity_multiplier,
        })
    }

    pub fn push_history(&mut self, price: Price, cap: usize) {
        self.history.push_back(price);
        while self.history.len() > cap {
            self.history.pop_front();
        }
    }
}

// 3.1: the whole market: asset table plus one scalar volatility.
// BTreeMap keeps tick iteration, and therefore rng consumption, in a stable order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketState {
    pub assets: BTreeMap<AssetId, Asset>,
    pub volatility: f64,
}

impl MarketState {
    pub fn from_configs(configs: &[AssetConfig], baseline_vol: f64) -> Self {
        let mut assets = BTreeMap::new();
        for config in configs {
            match Asset::from_config(config) {
                Some(asset) => {
                    assets.insert(asset.id, asset);
                }
                None => {
                    tracing::warn!(symbol = %config.symbol, "skipping asset with non-positive initial price");
                }
            }
        }
        Self {
            assets,
            volatility: baseline_vol,
        }
    }

    pub fn asset(&self, id: AssetId) -> Option<&Asset> {
        self.assets.get(&id)
    }

    pub fn asset_mut(&mut self, id: AssetId) -> Option<&mut Asset> {
        self.assets.get_mut(&id)
    }

    pub fn asset_ids(&self) -> Vec<AssetId> {
        self.assets.keys().copied().collect()
    }
}
