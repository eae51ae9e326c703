// 5.0 catalog.rs: fixed table of scripted market shocks. each entry carries a signed
// fractional price impact and a volatility boost factor. stateless beyond the table;
// selection randomness is always injected by the caller.

use crate::types::AssetId;
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[derive(Debug, Clone)]
pub struct MarketEvent {
    pub title: &'static str,
    // fractional price impact, e.g. -0.18 = -18%
    pub impact: Decimal,
    // volatility rises by |impact| * vol_boost when applied
    pub vol_boost: f64,
}

#[derive(Debug, Clone)]
pub struct EventCatalog {
    events: Vec<MarketEvent>,
}

impl EventCatalog {
    pub fn new(events: Vec<MarketEvent>) -> Self {
        Self { events }
    }

    // 5.1: the stock shock table.
    pub fn standard() -> Self {
        Self::new(vec![
            MarketEvent { title: "Exchange hack rumor", impact: dec!(-0.18), vol_boost: 2.0 },
            MarketEvent { title: "Spot ETF approved", impact: dec!(0.22), vol_boost: 1.5 },
            MarketEvent { title: "Whale dumps holdings", impact: dec!(-0.12), vol_boost: 1.8 },
            MarketEvent { title: "Short squeeze", impact: dec!(0.15), vol_boost: 2.2 },
            MarketEvent { title: "Regulatory crackdown", impact: dec!(-0.25), vol_boost: 2.5 },
            MarketEvent { title: "Viral meme pump", impact: dec!(0.30), vol_boost: 3.0 },
            MarketEvent { title: "Stablecoin depeg scare", impact: dec!(-0.20), vol_boost: 2.8 },
            MarketEvent { title: "Tier-1 exchange listing", impact: dec!(0.12), vol_boost: 1.2 },
        ])
    }

    pub fn events(&self) -> &[MarketEvent] {
        &self.events
    }

    // 5.2: uniform pick of a shock and a target asset.
    pub fn pick<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        targets: &[AssetId],
    ) -> Option<(&MarketEvent, AssetId)> {
        if self.events.is_empty() || targets.is_empty() {
            return None;
        }
        let event = &self.events[rng.random_range(0..self.events.len())];
        let asset_id = targets[rng.random_range(0..targets.len())];
        Some((event, asset_id))
    }
}
