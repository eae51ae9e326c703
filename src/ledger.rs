// 8.0 ledger.rs: the leveraged-position ledger. converts player intents into balance
// mutations, enforces margin limits, and detects stop-loss and liquidation against
// prices fed in by the orchestrator. baseline design: at most one open position.
//
// 8.1 open, 8.2 close, 8.3 per-tick risk evaluation, 8.4 top-up flow.

use crate::account::{stars_cost, PlayerAccount, TopUpRequest};
use crate::config::LedgerParams;
use crate::position::{ClosedTrade, Position};
use crate::types::{AssetId, Leverage, Price, Quote, Side, Timestamp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::info;

#[derive(Debug, Clone, thiserror::Error)]
pub enum LedgerError {
    #[error("insufficient margin: required {required}, available {available}")]
    InsufficientMargin { required: Quote, available: Quote },

    #[error("a position is already open")]
    PositionAlreadyOpen,

    #[error("no open position")]
    NoOpenPosition,

    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    #[error("unknown top-up request {0}")]
    UnknownTopUp(u64),
}

// 8.0.1: risk triggers are successful state transitions, not errors. they come back
// through the same channel as a normal close, tagged by cause.
#[derive(Debug, Clone)]
pub enum RiskEvent {
    StopLoss(ClosedTrade),
    Liquidation(ClosedTrade),
}

// 8.0.2: the ledger's entire mutable state, split out so it can round-trip through
// a snapshot while params stay config-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerState {
    pub account: PlayerAccount,
    pub position: Option<Position>,
    pub history: VecDeque<ClosedTrade>,
    pub pending_topups: Vec<TopUpRequest>,
    pub next_topup_id: u64,
}

#[derive(Debug, Clone)]
pub struct PositionLedger {
    params: LedgerParams,
    account: PlayerAccount,
    position: Option<Position>,
    // newest first, bounded
    history: VecDeque<ClosedTrade>,
    pending_topups: Vec<TopUpRequest>,
    next_topup_id: u64,
}

impl PositionLedger {
    pub fn new(params: LedgerParams, timestamp: Timestamp) -> Self {
        let account = PlayerAccount::new("You", params.starting_balance, timestamp);
        Self {
            params,
            account,
            position: None,
            history: VecDeque::new(),
            pending_topups: Vec::new(),
            next_topup_id: 1,
        }
    }

    pub fn from_state(params: LedgerParams, state: LedgerState) -> Self {
        Self {
            params,
            account: state.account,
            position: state.position,
            history: state.history,
            pending_topups: state.pending_topups,
            next_topup_id: state.next_topup_id,
        }
    }

    pub fn state(&self) -> LedgerState {
        LedgerState {
            account: self.account.clone(),
            position: self.position.clone(),
            history: self.history.clone(),
            pending_topups: self.pending_topups.clone(),
            next_topup_id: self.next_topup_id,
        }
    }

    pub fn account(&self) -> &PlayerAccount {
        &self.account
    }

    pub fn balance(&self) -> Quote {
        self.account.balance
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn history(&self) -> impl Iterator<Item = &ClosedTrade> {
        self.history.iter()
    }

    pub fn pending_topups(&self) -> &[TopUpRequest] {
        &self.pending_topups
    }

    // 8.1: open a leveraged position. margin = notional / leverage is escrowed out
    // of the balance; the entry price is whatever the engine quoted this instant.
    pub fn open_position(
        &mut self,
        asset_id: AssetId,
        side: Side,
        notional: Quote,
        leverage: u32,
        stop_price: Option<Price>,
        entry_price: Price,
        timestamp: Timestamp,
    ) -> Result<Position, LedgerError> {
        if notional.value() <= Decimal::ZERO {
            return Err(LedgerError::InvalidParameter("notional size must be positive"));
        }
        let leverage = Leverage::new(leverage)
            .ok_or(LedgerError::InvalidParameter("leverage must be at least 1"))?;
        if leverage > self.params.max_leverage {
            return Err(LedgerError::InvalidParameter("leverage above configured maximum"));
        }
        if self.position.is_some() {
            return Err(LedgerError::PositionAlreadyOpen);
        }

        let margin = Quote::new(notional.value() / leverage.as_decimal());
        if margin > self.account.balance {
            return Err(LedgerError::InsufficientMargin {
                required: margin,
                available: self.account.balance,
            });
        }

        self.account.debit(margin);

        let position = Position {
            asset_id,
            side,
            entry_price,
            notional,
            leverage,
            margin,
            stop_price,
            opened_at: timestamp,
        };
        self.position = Some(position.clone());

        Ok(position)
    }

    // 8.2: close the open position at the given exit price. credits escrowed margin
    // plus realized pnl; a loss deeper than the margin clamps the balance at zero.
    pub fn close_position(
        &mut self,
        exit_price: Price,
        timestamp: Timestamp,
    ) -> Result<ClosedTrade, LedgerError> {
        let position = self.position.take().ok_or(LedgerError::NoOpenPosition)?;

        let pnl = position.unrealized_pnl(exit_price);
        let trade = settle(&position, exit_price, pnl, timestamp, false);

        let mut balance = self.account.balance.add(position.margin).add(pnl);
        if balance.is_negative() {
            balance = Quote::zero();
        }
        self.account.balance = balance;

        self.push_history(trade.clone());
        Ok(trade)
    }

    // 8.3: called once per market tick with the latest price for the position's
    // asset. stop-loss is checked first; if it fires, the liquidation check is moot
    // because the position is gone. at most one trigger per call; a call with no
    // open position is a no-op.
    pub fn evaluate_risk(&mut self, current_price: Price, timestamp: Timestamp) -> Option<RiskEvent> {
        let position = self.position.as_ref()?;

        if position.stop_crossed(current_price) {
            let trade = self.close_position(current_price, timestamp).ok()?;
            info!(exit = %current_price, pnl = %trade.pnl, "stop price crossed, position closed");
            return Some(RiskEvent::StopLoss(trade));
        }

        let pnl = position.unrealized_pnl(current_price);
        if pnl.value() <= -position.margin.value() {
            let position = self.position.take()?;
            // zero recovery: the loss is capped at the margin and the whole balance
            // is wiped, not just the escrow
            let trade = settle(
                &position,
                current_price,
                position.margin.negate(),
                timestamp,
                true,
            );
            self.account.wipe();
            self.push_history(trade.clone());
            info!(exit = %current_price, margin = %position.margin, "position liquidated, balance wiped");
            return Some(RiskEvent::Liquidation(trade));
        }

        None
    }

    // 8.4: decoupled top-up flow. requesting records intent and nothing else; the
    // external payment confirmation later drives the credit. opening a position
    // never blocks on an unresolved request.
    pub fn request_top_up(
        &mut self,
        amount: Quote,
        timestamp: Timestamp,
    ) -> Result<TopUpRequest, LedgerError> {
        if amount.value() <= Decimal::ZERO {
            return Err(LedgerError::InvalidParameter("top-up amount must be positive"));
        }

        let request = TopUpRequest {
            id: self.next_topup_id,
            amount,
            stars_cost: stars_cost(amount, self.params.quote_per_star),
            requested_at: timestamp,
        };
        self.next_topup_id += 1;
        self.pending_topups.push(request.clone());

        Ok(request)
    }

    pub fn credit_top_up(&mut self, request_id: u64) -> Result<TopUpRequest, LedgerError> {
        let index = self
            .pending_topups
            .iter()
            .position(|r| r.id == request_id)
            .ok_or(LedgerError::UnknownTopUp(request_id))?;
        let request = self.pending_topups.remove(index);

        self.account.credit(request.amount);
        self.account.stars_spent += request.stars_cost;
        self.account.total_topped_up = self.account.total_topped_up.add(request.amount);

        Ok(request)
    }

    fn push_history(&mut self, trade: ClosedTrade) {
        self.history.push_front(trade);
        self.history.truncate(self.params.history_cap);
    }
}

fn settle(
    position: &Position,
    exit_price: Price,
    pnl: Quote,
    closed_at: Timestamp,
    liquidated: bool,
) -> ClosedTrade {
    let roe_percent = if liquidated {
        dec!(-100)
    } else {
        position.roe_percent(pnl)
    };
    ClosedTrade {
        asset_id: position.asset_id,
        side: position.side,
        leverage: position.leverage,
        entry_price: position.entry_price,
        exit_price,
        notional: position.notional,
        margin: position.margin,
        pnl,
        roe_percent,
        opened_at: position.opened_at,
        closed_at,
        liquidated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_ledger() -> PositionLedger {
        PositionLedger::new(LedgerParams::default(), Timestamp::from_millis(0))
    }

    fn price(value: Decimal) -> Price {
        Price::new_unchecked(value)
    }

    fn open_default(ledger: &mut PositionLedger) -> Position {
        ledger
            .open_position(
                AssetId(1),
                Side::Long,
                Quote::new(dec!(50)),
                5,
                None,
                price(dec!(100)),
                Timestamp::from_millis(0),
            )
            .unwrap()
    }

    #[test]
    fn open_escrows_margin() {
        let mut ledger = test_ledger();
        let position = open_default(&mut ledger);

        assert_eq!(position.margin.value(), dec!(10)); // 50 / 5x
        assert_eq!(ledger.balance().value(), dec!(990));
        assert!(ledger.position().is_some());
    }

    #[test]
    fn second_open_is_rejected() {
        let mut ledger = test_ledger();
        open_default(&mut ledger);

        let result = ledger.open_position(
            AssetId(2),
            Side::Short,
            Quote::new(dec!(10)),
            2,
            None,
            price(dec!(1)),
            Timestamp::from_millis(1),
        );
        assert!(matches!(result, Err(LedgerError::PositionAlreadyOpen)));
    }

    #[test]
    fn open_rejects_bad_parameters() {
        let mut ledger = test_ledger();

        let zero_size = ledger.open_position(
            AssetId(1),
            Side::Long,
            Quote::zero(),
            5,
            None,
            price(dec!(100)),
            Timestamp::from_millis(0),
        );
        assert!(matches!(zero_size, Err(LedgerError::InvalidParameter(_))));

        let zero_leverage = ledger.open_position(
            AssetId(1),
            Side::Long,
            Quote::new(dec!(50)),
            0,
            None,
            price(dec!(100)),
            Timestamp::from_millis(0),
        );
        assert!(matches!(zero_leverage, Err(LedgerError::InvalidParameter(_))));

        let over_max = ledger.open_position(
            AssetId(1),
            Side::Long,
            Quote::new(dec!(50)),
            500,
            None,
            price(dec!(100)),
            Timestamp::from_millis(0),
        );
        assert!(matches!(over_max, Err(LedgerError::InvalidParameter(_))));
    }

    #[test]
    fn open_rejects_insufficient_margin() {
        let mut ledger = test_ledger();

        // margin would be 2000 on a 1000 balance
        let result = ledger.open_position(
            AssetId(1),
            Side::Long,
            Quote::new(dec!(4000)),
            2,
            None,
            price(dec!(100)),
            Timestamp::from_millis(0),
        );
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientMargin { .. })
        ));
        assert_eq!(ledger.balance().value(), dec!(1000)); // untouched
    }

    #[test]
    fn close_round_trips_margin_plus_pnl() {
        let mut ledger = test_ledger();
        open_default(&mut ledger); // entry 100, notional 50, margin 10

        let trade = ledger
            .close_position(price(dec!(110)), Timestamp::from_millis(1))
            .unwrap();

        // +10% move on 50 notional
        assert_eq!(trade.pnl.value(), dec!(5));
        assert_eq!(trade.roe_percent, dec!(50));
        assert!(!trade.liquidated);
        // 1000 - 10 margin + 10 margin + 5 pnl
        assert_eq!(ledger.balance().value(), dec!(1005));
        assert!(ledger.position().is_none());
        assert_eq!(ledger.history().count(), 1);
    }

    #[test]
    fn close_without_position_fails() {
        let mut ledger = test_ledger();
        let result = ledger.close_position(price(dec!(1)), Timestamp::from_millis(0));
        assert!(matches!(result, Err(LedgerError::NoOpenPosition)));
    }

    #[test]
    fn liquidation_wipes_balance_and_flags_history() {
        let mut ledger = test_ledger();
        open_default(&mut ledger); // entry 100, notional 50, margin 10

        // -25% move: pnl = -12.5 <= -margin
        let trade = match ledger.evaluate_risk(price(dec!(75)), Timestamp::from_millis(2)) {
            Some(RiskEvent::Liquidation(trade)) => trade,
            other => panic!("expected liquidation, got {other:?}"),
        };
        assert!(trade.liquidated);
        assert_eq!(trade.pnl.value(), dec!(-10)); // capped at margin
        assert_eq!(trade.roe_percent, dec!(-100));
        assert_eq!(ledger.balance(), Quote::zero());
        assert!(ledger.position().is_none());
        assert_eq!(ledger.history().filter(|t| t.liquidated).count(), 1);
    }

    #[test]
    fn liquidation_triggers_exactly_at_margin_loss() {
        let mut ledger = test_ledger();
        open_default(&mut ledger); // margin 10, notional 50

        // -19% move: pnl = -9.5, still above the line
        assert!(ledger
            .evaluate_risk(price(dec!(81)), Timestamp::from_millis(1))
            .is_none());

        // -20% move: pnl = -10 exactly
        let outcome = ledger.evaluate_risk(price(dec!(80)), Timestamp::from_millis(2));
        assert!(matches!(outcome, Some(RiskEvent::Liquidation(_))));
    }

    #[test]
    fn short_liquidates_when_price_rises() {
        let mut ledger = test_ledger();
        ledger
            .open_position(
                AssetId(1),
                Side::Short,
                Quote::new(dec!(50)),
                5,
                None,
                price(dec!(100)),
                Timestamp::from_millis(0),
            )
            .unwrap();

        let outcome = ledger.evaluate_risk(price(dec!(125)), Timestamp::from_millis(1));
        assert!(matches!(outcome, Some(RiskEvent::Liquidation(_))));
        assert_eq!(ledger.balance(), Quote::zero());
    }

    #[test]
    fn stop_loss_fires_once_then_noop() {
        let mut ledger = test_ledger();
        ledger
            .open_position(
                AssetId(1),
                Side::Long,
                Quote::new(dec!(50)),
                5,
                Some(price(dec!(90))),
                price(dec!(100)),
                Timestamp::from_millis(0),
            )
            .unwrap();

        let trade = match ledger.evaluate_risk(price(dec!(89)), Timestamp::from_millis(1)) {
            Some(RiskEvent::StopLoss(trade)) => trade,
            other => panic!("expected stop loss, got {other:?}"),
        };
        assert_eq!(trade.exit_price, price(dec!(89)));
        assert!(!trade.liquidated);
        // -11% on 50 notional = -5.5; 1000 - 10 + 10 - 5.5
        assert_eq!(ledger.balance().value(), dec!(994.5));

        // position is gone; a second evaluation is a no-op
        assert!(ledger
            .evaluate_risk(price(dec!(50)), Timestamp::from_millis(2))
            .is_none());
        assert_eq!(ledger.history().count(), 1);
    }

    #[test]
    fn stop_checked_before_liquidation() {
        let mut ledger = test_ledger();
        ledger
            .open_position(
                AssetId(1),
                Side::Long,
                Quote::new(dec!(50)),
                5,
                Some(price(dec!(90))),
                price(dec!(100)),
                Timestamp::from_millis(0),
            )
            .unwrap();

        // price 75 crosses the stop AND is past the liquidation line; the stop wins
        let outcome = ledger.evaluate_risk(price(dec!(75)), Timestamp::from_millis(1));
        assert!(matches!(outcome, Some(RiskEvent::StopLoss(_))));
        // a stop close realizes the full loss but never wipes the balance
        assert_eq!(ledger.balance().value(), dec!(987.5));
    }

    #[test]
    fn history_is_newest_first_and_bounded() {
        let params = LedgerParams {
            history_cap: 3,
            ..LedgerParams::default()
        };
        let mut ledger = PositionLedger::new(params, Timestamp::from_millis(0));

        for i in 0..5u32 {
            ledger
                .open_position(
                    AssetId(1),
                    Side::Long,
                    Quote::new(dec!(10)),
                    2,
                    None,
                    price(dec!(100) + Decimal::from(i)),
                    Timestamp::from_millis(i as i64),
                )
                .unwrap();
            ledger
                .close_position(price(dec!(100) + Decimal::from(i)), Timestamp::from_millis(i as i64))
                .unwrap();
        }

        let entries: Vec<_> = ledger.history().collect();
        assert_eq!(entries.len(), 3);
        // newest first
        assert_eq!(entries[0].entry_price.value(), dec!(104));
        assert_eq!(entries[2].entry_price.value(), dec!(102));
    }

    #[test]
    fn top_up_flow_is_decoupled() {
        let mut ledger = test_ledger();

        let request = ledger
            .request_top_up(Quote::new(dec!(500)), Timestamp::from_millis(0))
            .unwrap();
        assert_eq!(request.stars_cost, 50); // 500 / 10 per star
        assert_eq!(ledger.balance().value(), dec!(1000)); // nothing moved yet
        assert_eq!(ledger.pending_topups().len(), 1);

        let credited = ledger.credit_top_up(request.id).unwrap();
        assert_eq!(credited.amount.value(), dec!(500));
        assert_eq!(ledger.balance().value(), dec!(1500));
        assert_eq!(ledger.account().stars_spent, 50);
        assert!(ledger.pending_topups().is_empty());

        assert!(matches!(
            ledger.credit_top_up(request.id),
            Err(LedgerError::UnknownTopUp(_))
        ));
    }

    #[test]
    fn top_up_rejects_non_positive_amount() {
        let mut ledger = test_ledger();
        let result = ledger.request_top_up(Quote::zero(), Timestamp::from_millis(0));
        assert!(matches!(result, Err(LedgerError::InvalidParameter(_))));
    }
}
