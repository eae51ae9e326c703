// 9.0 events.rs: every notable state change produces an audit event. the log is
// bounded and serialized as part of the game state; consumers read it for display.

use crate::types::{AssetId, Price, Quote, Side, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimEvent {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    PositionOpened(PositionOpenedEvent),
    PositionClosed(PositionClosedEvent),
    MarketShock(MarketShockEvent),
    TopUpRequested(TopUpRequestedEvent),
    TopUpCredited(TopUpCreditedEvent),
}

// stop-loss and liquidation are successful transitions, reported through the same
// channel as a user close and distinguished only by the reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseReason {
    UserClosed,
    StopLoss,
    Liquidation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionOpenedEvent {
    pub asset_id: AssetId,
    pub side: Side,
    pub notional: Quote,
    pub leverage: u32,
    pub entry_price: Price,
    pub margin: Quote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionClosedEvent {
    pub asset_id: AssetId,
    pub side: Side,
    pub exit_price: Price,
    pub pnl: Quote,
    pub roe_percent: Decimal,
    pub close_reason: CloseReason,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketShockEvent {
    pub asset_id: AssetId,
    pub title: String,
    pub impact: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopUpRequestedEvent {
    pub request_id: u64,
    pub amount: Quote,
    pub stars_cost: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopUpCreditedEvent {
    pub request_id: u64,
    pub amount: Quote,
    pub new_balance: Quote,
}

// 9.1: bounded append-only log with monotonic ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLog {
    events: VecDeque<SimEvent>,
    next_id: u64,
    cap: usize,
}

impl EventLog {
    pub fn new(cap: usize) -> Self {
        Self {
            events: VecDeque::new(),
            next_id: 1,
            cap,
        }
    }

    pub fn record(&mut self, timestamp: Timestamp, payload: EventPayload) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;

        self.events.push_back(SimEvent {
            id,
            timestamp,
            payload,
        });
        while self.events.len() > self.cap {
            self.events.pop_front();
        }

        id
    }

    // newest first
    pub fn recent(&self, count: usize) -> Vec<SimEvent> {
        self.events.iter().rev().take(count).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
