//! Player balance and the decoupled top-up flow.
//!
//! Balance is the single source of truth for available margin. Margin reserved
//! for the open position is escrowed: debited here on open and re-credited on
//! close, so the two always sum to a conserved total absent market impact and
//! liquidation.

use crate::types::{Quote, Timestamp};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerAccount {
    pub name: String,
    pub balance: Quote,
    // lifetime stars paid for confirmed top-ups
    pub stars_spent: u64,
    pub total_topped_up: Quote,
    pub created_at: Timestamp,
}

impl PlayerAccount {
    pub fn new(name: impl Into<String>, starting_balance: Quote, timestamp: Timestamp) -> Self {
        Self {
            name: name.into(),
            balance: starting_balance,
            stars_spent: 0,
            total_topped_up: Quote::zero(),
            created_at: timestamp,
        }
    }

    pub fn credit(&mut self, amount: Quote) {
        self.balance = self.balance.add(amount);
    }

    pub fn debit(&mut self, amount: Quote) {
        debug_assert!(amount.value() <= self.balance.value());
        self.balance = self.balance.sub(amount);
    }

    // full liquidation zeroes the balance, not just the escrowed margin
    pub fn wipe(&mut self) {
        self.balance = Quote::zero();
    }
}

// 7.1: a pending top-up. requesting touches nothing; the balance moves only when
// the external payment confirmation arrives and the request is credited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopUpRequest {
    pub id: u64,
    pub amount: Quote,
    pub stars_cost: u64,
    pub requested_at: Timestamp,
}

pub fn stars_cost(amount: Quote, quote_per_star: Decimal) -> u64 {
    if quote_per_star <= Decimal::ZERO {
        return 0;
    }
    (amount.value() / quote_per_star).ceil().to_u64().unwrap_or(0)
}
