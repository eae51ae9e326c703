// 6.0 position.rs: one leveraged bet and its terminal history record.
//
// pnl convention, fixed crate-wide: notional is the leveraged exposure,
// margin = notional / leverage, pnl = price_change_pct * notional.
// leverage is never applied a second time anywhere.

use crate::types::{AssetId, Leverage, Price, Quote, Side, Timestamp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub asset_id: AssetId,
    pub side: Side,
    pub entry_price: Price,
    pub notional: Quote,
    pub leverage: Leverage,
    pub margin: Quote,
    pub stop_price: Option<Price>,
    pub opened_at: Timestamp,
}

impl Position {
    // 6.1: signed fractional price move since entry, from this position's point of view.
    pub fn price_change_pct(&self, mark: Price) -> Decimal {
        (mark.value() - self.entry_price.value()) / self.entry_price.value() * self.side.sign()
    }

    pub fn unrealized_pnl(&self, mark: Price) -> Quote {
        Quote::new(self.price_change_pct(mark) * self.notional.value())
    }

    pub fn roe_percent(&self, pnl: Quote) -> Decimal {
        if self.margin.value().is_zero() {
            return Decimal::ZERO;
        }
        pnl.value() / self.margin.value() * dec!(100)
    }

    // 6.2: the stop is a bidirectional trigger line: it fires whenever the current
    // price sits on the opposite side of the stop from the entry, whichever way it
    // was crossed.
    pub fn stop_crossed(&self, current: Price) -> bool {
        match self.stop_price {
            Some(stop) => {
                let current_side = current.value() - stop.value();
                let entry_side = self.entry_price.value() - stop.value();
                current_side * entry_side <= Decimal::ZERO
            }
            None => false,
        }
    }
}

// 6.3: immutable snapshot written when a position closes. append-only history
// material; never consulted by later calculations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub asset_id: AssetId,
    pub side: Side,
    pub leverage: Leverage,
    pub entry_price: Price,
    pub exit_price: Price,
    pub notional: Quote,
    pub margin: Quote,
    pub pnl: Quote,
    pub roe_percent: Decimal,
    pub opened_at: Timestamp,
    pub closed_at: Timestamp,
    pub liquidated: bool,
}
