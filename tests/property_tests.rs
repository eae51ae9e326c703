//! Property-based tests for the core money and price math.
//!
//! These verify the ledger and engine invariants hold under random inputs.

use papertrade_core::*;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// Strategies for generating test data
fn notional_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..=100_000i64).prop_map(|x| Decimal::new(x, 2)) // $0.01 to $1,000
}

fn entry_price_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..=1_000_000i64).prop_map(|x| Decimal::new(x, 4)) // $0.0001 to $100
}

fn leverage_strategy() -> impl Strategy<Value = u32> {
    1u32..=5u32
}

// bounded so the loss never reaches the margin at up to 5x leverage
fn safe_move_strategy() -> impl Strategy<Value = Decimal> {
    (-150i64..=150i64).prop_map(|x| Decimal::new(x, 3)) // -15% to +15%
}

fn ledger_with_balance() -> PositionLedger {
    PositionLedger::new(LedgerParams::default(), Timestamp::from_millis(0))
}

proptest! {
    /// Margin escrow round-trips: with no liquidation,
    /// balance_after_close = balance_before_open + pnl, exactly.
    #[test]
    fn conservation_without_liquidation(
        notional in notional_strategy(),
        entry in entry_price_strategy(),
        leverage in leverage_strategy(),
        price_move in safe_move_strategy(),
    ) {
        let mut ledger = ledger_with_balance();
        let before = ledger.balance();

        let entry_price = Price::new_unchecked(entry);
        let exit_value = entry * (Decimal::ONE + price_move);
        prop_assume!(exit_value > Decimal::ZERO);
        let exit_price = Price::new_unchecked(exit_value);

        let open = ledger.open_position(
            AssetId(1),
            Side::Long,
            Quote::new(notional),
            leverage,
            None,
            entry_price,
            Timestamp::from_millis(0),
        );
        prop_assume!(open.is_ok());

        let trade = ledger.close_position(exit_price, Timestamp::from_millis(1)).unwrap();
        prop_assert!(!trade.liquidated);
        prop_assert_eq!(ledger.balance().value(), before.value() + trade.pnl.value());
    }

    /// Opening fails whenever the required margin exceeds the balance, and the
    /// balance is untouched by the failure.
    #[test]
    fn open_rejects_margin_above_balance(
        notional in (100_001i64..=10_000_000i64).prop_map(|x| Decimal::new(x, 2)),
        entry in entry_price_strategy(),
    ) {
        let mut ledger = ledger_with_balance();

        // leverage 1 makes margin == notional, which exceeds the $1000 balance
        let result = ledger.open_position(
            AssetId(1),
            Side::Long,
            Quote::new(notional),
            1,
            None,
            Price::new_unchecked(entry),
            Timestamp::from_millis(0),
        );

        let is_insufficient_margin = matches!(result, Err(LedgerError::InsufficientMargin { .. }));
        prop_assert!(is_insufficient_margin);
        prop_assert_eq!(ledger.balance().value(), dec!(1000));
    }

    /// The balance never goes negative, whatever single open/close happens.
    #[test]
    fn balance_never_negative(
        notional in notional_strategy(),
        entry in entry_price_strategy(),
        leverage in 1u32..=50u32,
        price_move in (-999i64..=999i64).prop_map(|x| Decimal::new(x, 3)),
    ) {
        let mut ledger = ledger_with_balance();

        let entry_price = Price::new_unchecked(entry);
        let exit_value = entry * (Decimal::ONE + price_move);
        prop_assume!(exit_value > Decimal::ZERO);

        if ledger.open_position(
            AssetId(1),
            Side::Long,
            Quote::new(notional),
            leverage,
            None,
            entry_price,
            Timestamp::from_millis(0),
        ).is_ok() {
            ledger.close_position(Price::new_unchecked(exit_value), Timestamp::from_millis(1)).unwrap();
        }

        prop_assert!(!ledger.balance().is_negative());
    }

    /// Long and short pnl mirror each other for the same move.
    #[test]
    fn long_short_pnl_mirror(
        notional in notional_strategy(),
        entry in entry_price_strategy(),
        price_move in safe_move_strategy(),
    ) {
        let exit_value = entry * (Decimal::ONE + price_move);
        prop_assume!(exit_value > Decimal::ZERO);
        let entry_price = Price::new_unchecked(entry);
        let exit_price = Price::new_unchecked(exit_value);

        let long = Position {
            asset_id: AssetId(1),
            side: Side::Long,
            entry_price,
            notional: Quote::new(notional),
            leverage: Leverage::new(2).unwrap(),
            margin: Quote::new(notional / dec!(2)),
            stop_price: None,
            opened_at: Timestamp::from_millis(0),
        };
        let short = Position { side: Side::Short, ..long.clone() };

        prop_assert_eq!(
            long.unrealized_pnl(exit_price).value(),
            -short.unrealized_pnl(exit_price).value()
        );
    }

    /// Buy impact strictly raises the price, sell impact strictly lowers it.
    #[test]
    fn impact_direction(notional in (1i64..=1_000_000i64).prop_map(|x| Decimal::new(x, 2))) {
        let config = SimConfig::default();
        let mut engine = PriceEngine::new(config.market, &config.assets);
        let before = engine.price_of(AssetId(1)).unwrap();

        engine.apply_impact(AssetId(1), Quote::new(notional), TradeDirection::Buy).unwrap();
        let after_buy = engine.price_of(AssetId(1)).unwrap();
        prop_assert!(after_buy.value() > before.value());

        engine.apply_impact(AssetId(1), Quote::new(notional), TradeDirection::Sell).unwrap();
        let after_sell = engine.price_of(AssetId(1)).unwrap();
        prop_assert!(after_sell.value() < after_buy.value());
    }

    /// Repeated extreme negative shocks never drive any price to zero or below.
    #[test]
    fn price_floor_survives_crashes(crash_count in 1usize..=120) {
        let config = SimConfig::default();
        let mut engine = PriceEngine::new(config.market, &config.assets);
        let wipeout = MarketEvent {
            title: "wipeout",
            impact: dec!(-0.999999),
            vol_boost: 1.0,
        };

        for _ in 0..crash_count {
            for id in engine.asset_ids() {
                engine.apply_event(id, &wipeout).unwrap();
            }
        }

        for id in engine.asset_ids() {
            prop_assert!(engine.price_of(id).unwrap().value() > Decimal::ZERO);
        }
    }
}
