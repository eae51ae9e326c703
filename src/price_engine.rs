// 4.0 price_engine.rs: the market price engine. advances every asset one random-walk
// step per tick, folds in trade impact and scripted shocks, and keeps the price
// strictly positive. deterministic given a seeded rng; the rng is always injected,
// never owned.
//
// the walk runs in f64 (gaussian draw, tanh drift), ledger money stays in Decimal;
// conversion happens once per step at the multiplier boundary.

use crate::catalog::MarketEvent;
use crate::config::{AssetConfig, MarketParams};
use crate::market::{Asset, MarketState};
use crate::types::{AssetId, Price, Quote, TradeDirection};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[derive(Debug, Clone, thiserror::Error)]
pub enum MarketError {
    #[error("unknown asset {0:?}")]
    UnknownAsset(AssetId),
}

#[derive(Debug, Clone)]
pub struct PriceEngine {
    params: MarketParams,
    state: MarketState,
}

impl PriceEngine {
    pub fn new(params: MarketParams, configs: &[AssetConfig]) -> Self {
        let state = MarketState::from_configs(configs, params.baseline_vol);
        Self { params, state }
    }

    pub fn from_state(params: MarketParams, state: MarketState) -> Self {
        Self { params, state }
    }

    pub fn state(&self) -> &MarketState {
        &self.state
    }

    pub fn volatility(&self) -> f64 {
        self.state.volatility
    }

    pub fn asset_ids(&self) -> Vec<AssetId> {
        self.state.asset_ids()
    }

    pub fn asset(&self, asset_id: AssetId) -> Result<&Asset, MarketError> {
        self.state
            .asset(asset_id)
            .ok_or(MarketError::UnknownAsset(asset_id))
    }

    pub fn price_of(&self, asset_id: AssetId) -> Result<Price, MarketError> {
        self.asset(asset_id).map(|asset| asset.price)
    }

    // 4.1: one simulation step. per asset: gaussian perturbation scaled by current
    // volatility, a small uniform jitter, and a demand-derived drift bounded by tanh.
    // applied multiplicatively, floored, appended to history. demand decays so trade
    // impact is transient; volatility relaxes toward baseline.
    pub fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let vol = self.state.volatility;
        let params = self.params.clone();
        // volatility is clamped positive, so this only fails on a poisoned state
        let gaussian = Normal::new(0.0, vol).ok();

        for asset in self.state.assets.values_mut() {
            let gauss = match &gaussian {
                Some(dist) => dist.sample(&mut *rng),
                None => 0.0,
            };
            let jitter = (rng.random::<f64>() - 0.5) * params.jitter;
            let drift = (asset.demand / params.demand_normalizer).tanh() * params.drift_scale;

            let shock = gauss + jitter + drift;
            let multiplier = Decimal::from_f64(1.0 + shock).unwrap_or(Decimal::ONE);

            asset.price = floored_step(asset.price, multiplier, params.price_floor);
            let price = asset.price;
            asset.push_history(price, params.history_len);
            asset.demand *= params.demand_decay;
        }

        let relaxed =
            params.baseline_vol + (self.state.volatility - params.baseline_vol) * params.vol_decay;
        self.state.volatility = relaxed.clamp(params.min_vol, params.max_vol);
    }

    // 4.2: price-moving effect of a player trade. proportional to notional, scaled by
    // the asset's liquidity multiplier. non-positive sizes are a no-op.
    pub fn apply_impact(
        &mut self,
        asset_id: AssetId,
        notional: Quote,
        direction: TradeDirection,
    ) -> Result<(), MarketError> {
        if notional.value() <= Decimal::ZERO {
            return Ok(());
        }

        let coefficient = self.params.impact_coefficient;
        let floor = self.params.price_floor;
        let asset = self
            .state
            .asset_mut(asset_id)
            .ok_or(MarketError::UnknownAsset(asset_id))?;

        let move_fraction = coefficient * notional.value() * asset.liquidity_multiplier;
        let multiplier = Decimal::ONE + direction.sign() * move_fraction;
        asset.price = floored_step(asset.price, multiplier, floor);

        let pressure = notional.value().to_f64().unwrap_or(0.0);
        asset.demand += match direction {
            TradeDirection::Buy => pressure,
            TradeDirection::Sell => -pressure,
        };

        Ok(())
    }

    // 4.3: scripted shock. multiplies the target price and raises volatility; the
    // boost bleeds back off through the per-tick relaxation in `tick`.
    pub fn apply_event(
        &mut self,
        asset_id: AssetId,
        event: &MarketEvent,
    ) -> Result<(), MarketError> {
        let floor = self.params.price_floor;
        let asset = self
            .state
            .asset_mut(asset_id)
            .ok_or(MarketError::UnknownAsset(asset_id))?;

        let multiplier = Decimal::ONE + event.impact;
        asset.price = floored_step(asset.price, multiplier, floor);

        let boost = event.impact.abs().to_f64().unwrap_or(0.0) * event.vol_boost;
        self.state.volatility = (self.state.volatility + boost).min(self.params.max_vol);

        Ok(())
    }
}

// 4.4: the floor guard. a move that would drop the price to or below the floor
// halves the previous price instead, so no asset ever becomes irrecoverable.
fn floored_step(previous: Price, multiplier: Decimal, floor: Decimal) -> Price {
    let candidate = previous.value() * multiplier;
    if candidate <= floor {
        Price::new(previous.value() / dec!(2)).unwrap_or(previous)
    } else {
        Price::new_unchecked(candidate)
    }
}
