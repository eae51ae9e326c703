// 10.0 sim.rs: the orchestrator. a single writer over the price engine and the
// position ledger; commands come in, immutable snapshots go out. the core owns no
// timers and no entropy: the caller controls tick cadence and injects the rng.
//
// 10.1 commands, 10.2 the tick loop, 10.3 snapshots, 10.4 persistence boundary.

use crate::account::TopUpRequest;
use crate::catalog::{EventCatalog, MarketEvent};
use crate::config::SimConfig;
use crate::events::{
    CloseReason, EventLog, EventPayload, MarketShockEvent, PositionClosedEvent,
    PositionOpenedEvent, SimEvent, TopUpCreditedEvent, TopUpRequestedEvent,
};
use crate::ledger::{LedgerError, LedgerState, PositionLedger, RiskEvent};
use crate::market::MarketState;
use crate::position::{ClosedTrade, Position};
use crate::price_engine::{MarketError, PriceEngine};
use crate::types::{AssetId, Price, Quote, Side, Timestamp, TradeDirection};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, thiserror::Error)]
pub enum SimError {
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("market error: {0}")]
    Market(#[from] MarketError),
}

// 10.0.1: what one market tick did.
#[derive(Debug, Clone)]
pub struct TickOutcome {
    pub time: Timestamp,
    pub risk: Option<RiskEvent>,
}

#[derive(Debug, Clone)]
pub struct AppliedShock {
    pub asset_id: AssetId,
    pub title: String,
    pub impact: Decimal,
}

// 10.3: read-only view for rendering. owned clones; consumers can never reach the
// engine's mutable state through it.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub time: Timestamp,
    pub volatility: f64,
    pub tickers: Vec<AssetTicker>,
    pub balance: Quote,
    pub stars_spent: u64,
    pub position: Option<Position>,
    pub history: Vec<ClosedTrade>,
    pub recent_events: Vec<SimEvent>,
}

#[derive(Debug, Clone)]
pub struct AssetTicker {
    pub id: AssetId,
    pub symbol: String,
    pub price: Price,
    pub history: Vec<Price>,
}

// 10.4: the entire mutable state as one serializable snapshot. storage medium is
// the caller's problem; restoring this plus the same seeded rng reproduces the
// same tick sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub time: Timestamp,
    pub market: MarketState,
    pub ledger: LedgerState,
    pub events: EventLog,
}

#[derive(Debug)]
pub struct Simulator {
    config: SimConfig,
    engine: PriceEngine,
    ledger: PositionLedger,
    catalog: EventCatalog,
    events: EventLog,
    current_time: Timestamp,
}

impl Simulator {
    pub fn new(config: SimConfig) -> Self {
        let start = Timestamp::from_millis(0);
        let engine = PriceEngine::new(config.market.clone(), &config.assets);
        let ledger = PositionLedger::new(config.ledger.clone(), start);
        let events = EventLog::new(config.max_events);
        Self {
            config,
            engine,
            ledger,
            catalog: EventCatalog::standard(),
            events,
            current_time: start,
        }
    }

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn engine(&self) -> &PriceEngine {
        &self.engine
    }

    pub fn ledger(&self) -> &PositionLedger {
        &self.ledger
    }

    pub fn balance(&self) -> Quote {
        self.ledger.balance()
    }

    pub fn position(&self) -> Option<&Position> {
        self.ledger.position()
    }

    pub fn price_of(&self, asset_id: AssetId) -> Result<Price, SimError> {
        Ok(self.engine.price_of(asset_id)?)
    }

    // 10.2: one market tick. advance the logical clock, walk every price, then
    // re-evaluate the open position against its fresh price. stop-loss and
    // liquidation surface here as part of the outcome, never as errors.
    pub fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R) -> TickOutcome {
        self.current_time =
            Timestamp::from_millis(self.current_time.as_millis() + self.config.tick_interval_ms);
        self.engine.tick(rng);

        let open_asset = self.ledger.position().map(|p| p.asset_id);
        let risk = match open_asset {
            Some(asset_id) => match self.engine.price_of(asset_id) {
                Ok(price) => {
                    let outcome = self.ledger.evaluate_risk(price, self.current_time);
                    if let Some(event) = &outcome {
                        self.settle_risk(event);
                    }
                    outcome
                }
                // the ledger only ever holds assets the engine quoted at open
                Err(_) => None,
            },
            None => None,
        };

        debug!(time = self.current_time.as_millis(), "market tick");
        TickOutcome {
            time: self.current_time,
            risk,
        }
    }

    fn settle_risk(&mut self, event: &RiskEvent) {
        match event {
            RiskEvent::StopLoss(trade) => {
                // a stop close is a market close and moves the market like one
                let _ = self
                    .engine
                    .apply_impact(trade.asset_id, trade.notional, TradeDirection::Sell);
                self.record_close(trade, CloseReason::StopLoss);
            }
            RiskEvent::Liquidation(trade) => {
                self.record_close(trade, CloseReason::Liquidation);
            }
        }
    }

    // 10.1: open a leveraged position. the entry price is read before the trade's
    // own buy impact moves the market.
    pub fn open_position(
        &mut self,
        asset_id: AssetId,
        side: Side,
        notional: Quote,
        leverage: u32,
        stop_price: Option<Price>,
    ) -> Result<Position, SimError> {
        let entry_price = self.engine.price_of(asset_id)?;
        let position = self.ledger.open_position(
            asset_id,
            side,
            notional,
            leverage,
            stop_price,
            entry_price,
            self.current_time,
        )?;
        self.engine
            .apply_impact(asset_id, notional, TradeDirection::Buy)?;

        self.events.record(
            self.current_time,
            EventPayload::PositionOpened(PositionOpenedEvent {
                asset_id,
                side,
                notional,
                leverage,
                entry_price,
                margin: position.margin,
            }),
        );
        debug!(%entry_price, %notional, "position opened");

        Ok(position)
    }

    pub fn close_position(&mut self) -> Result<ClosedTrade, SimError> {
        let asset_id = self
            .ledger
            .position()
            .map(|p| p.asset_id)
            .ok_or(LedgerError::NoOpenPosition)?;
        let exit_price = self.engine.price_of(asset_id)?;

        let trade = self.ledger.close_position(exit_price, self.current_time)?;
        self.engine
            .apply_impact(asset_id, trade.notional, TradeDirection::Sell)?;
        self.record_close(&trade, CloseReason::UserClosed);

        Ok(trade)
    }

    // scripted shock against a caller-chosen target
    pub fn apply_shock(
        &mut self,
        asset_id: AssetId,
        event: &MarketEvent,
    ) -> Result<AppliedShock, SimError> {
        self.engine.apply_event(asset_id, event)?;
        Ok(self.record_shock(asset_id, event))
    }

    // scripted shock with catalog-random selection of both event and target
    pub fn trigger_event<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<AppliedShock> {
        let targets = self.engine.asset_ids();
        let (event, asset_id) = self.catalog.pick(rng, &targets)?;
        let event = event.clone();

        // the target came from the engine's own table, so this cannot miss
        self.engine.apply_event(asset_id, &event).ok()?;
        Some(self.record_shock(asset_id, &event))
    }

    pub fn request_top_up(&mut self, amount: Quote) -> Result<TopUpRequest, SimError> {
        let request = self.ledger.request_top_up(amount, self.current_time)?;
        self.events.record(
            self.current_time,
            EventPayload::TopUpRequested(TopUpRequestedEvent {
                request_id: request.id,
                amount: request.amount,
                stars_cost: request.stars_cost,
            }),
        );
        Ok(request)
    }

    pub fn credit_top_up(&mut self, request_id: u64) -> Result<Quote, SimError> {
        let credited = self.ledger.credit_top_up(request_id)?;
        let new_balance = self.ledger.balance();
        self.events.record(
            self.current_time,
            EventPayload::TopUpCredited(TopUpCreditedEvent {
                request_id,
                amount: credited.amount,
                new_balance,
            }),
        );
        Ok(new_balance)
    }

    pub fn snapshot(&self) -> Snapshot {
        let tickers = self
            .engine
            .state()
            .assets
            .values()
            .map(|asset| AssetTicker {
                id: asset.id,
                symbol: asset.symbol.clone(),
                price: asset.price,
                history: asset.history.iter().copied().collect(),
            })
            .collect();

        Snapshot {
            time: self.current_time,
            volatility: self.engine.volatility(),
            tickers,
            balance: self.ledger.balance(),
            stars_spent: self.ledger.account().stars_spent,
            position: self.ledger.position().cloned(),
            history: self.ledger.history().cloned().collect(),
            recent_events: self.events.recent(self.config.max_events),
        }
    }

    // 10.4: persistence boundary. everything mutable, nothing more.
    pub fn save(&self) -> GameState {
        GameState {
            time: self.current_time,
            market: self.engine.state().clone(),
            ledger: self.ledger.state(),
            events: self.events.clone(),
        }
    }

    pub fn restore(config: SimConfig, state: GameState) -> Self {
        let engine = PriceEngine::from_state(config.market.clone(), state.market);
        let ledger = PositionLedger::from_state(config.ledger.clone(), state.ledger);
        Self {
            config,
            engine,
            ledger,
            catalog: EventCatalog::standard(),
            events: state.events,
            current_time: state.time,
        }
    }

    fn record_close(&mut self, trade: &ClosedTrade, close_reason: CloseReason) {
        self.events.record(
            self.current_time,
            EventPayload::PositionClosed(PositionClosedEvent {
                asset_id: trade.asset_id,
                side: trade.side,
                exit_price: trade.exit_price,
                pnl: trade.pnl,
                roe_percent: trade.roe_percent,
                close_reason,
            }),
        );
    }

    fn record_shock(&mut self, asset_id: AssetId, event: &MarketEvent) -> AppliedShock {
        info!(title = event.title, asset = asset_id.0, impact = %event.impact, "market shock applied");
        self.events.record(
            self.current_time,
            EventPayload::MarketShock(MarketShockEvent {
                asset_id,
                title: event.title.to_string(),
                impact: event.impact,
            }),
        );
        AppliedShock {
            asset_id,
            title: event.title.to_string(),
            impact: event.impact,
        }
    }
}
