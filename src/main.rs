//! Paper-trading game core simulation.
//!
//! Walks through the full game lifecycle: random-walk prices, leveraged
//! positions, stop-loss and liquidation triggers, scripted market shocks,
//! and state save/restore.

use papertrade_core::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal_macros::dec;

fn main() {
    println!("Paper-Trading Game Core Simulation");
    println!("Three synthetic coins, one margin account, deterministic seed\n");

    scenario_1_random_walk();
    scenario_2_position_lifecycle();
    scenario_3_stop_loss();
    scenario_4_liquidation();
    scenario_5_market_shocks();
    scenario_6_save_restore();

    println!("\nAll simulations completed successfully.");
}

/// Prices drift under the seeded random walk.
fn scenario_1_random_walk() {
    println!("Scenario 1: Random Walk\n");

    let mut sim = Simulator::new(SimConfig::default());
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..40 {
        sim.tick(&mut rng);
    }

    let snapshot = sim.snapshot();
    for ticker in &snapshot.tickers {
        println!(
            "  {}: {} ({} samples of history)",
            ticker.symbol,
            ticker.price,
            ticker.history.len()
        );
    }
    println!("  volatility: {:.5}\n", snapshot.volatility);
}

/// Open a leveraged long, let the market move, close it by hand.
fn scenario_2_position_lifecycle() {
    println!("Scenario 2: Position Lifecycle\n");

    let mut sim = Simulator::new(SimConfig::default());
    let mut rng = StdRng::seed_from_u64(21);

    let position = sim
        .open_position(AssetId(1), Side::Long, Quote::new(dec!(500)), 5, None)
        .unwrap();
    println!(
        "  opened {:?} {} notional {} @ {} (margin {})",
        position.side, position.leverage, position.notional, position.entry_price, position.margin
    );
    println!("  balance after escrow: {}", sim.balance());

    let mut closed_by_risk = false;
    for _ in 0..20 {
        if sim.tick(&mut rng).risk.is_some() {
            closed_by_risk = true;
            break;
        }
    }

    if closed_by_risk {
        println!("  position closed by a risk trigger during the walk");
    } else {
        let trade = sim.close_position().unwrap();
        println!(
            "  closed @ {} | pnl {} | roe {:.2}%",
            trade.exit_price, trade.pnl, trade.roe_percent
        );
    }
    println!("  balance: {}\n", sim.balance());
}

/// A stop price crossing auto-closes the position exactly once.
fn scenario_3_stop_loss() {
    println!("Scenario 3: Stop-Loss\n");

    let mut sim = Simulator::new(SimConfig::default());
    let mut rng = StdRng::seed_from_u64(3);

    let entry = sim.price_of(AssetId(2)).unwrap();
    let stop = Price::new_unchecked(entry.value() * dec!(0.98));
    sim.open_position(AssetId(2), Side::Long, Quote::new(dec!(400)), 4, Some(stop))
        .unwrap();
    println!("  entry {} with stop {}", entry, stop);

    for i in 1..=500 {
        let outcome = sim.tick(&mut rng);
        if let Some(RiskEvent::StopLoss(trade)) = outcome.risk {
            println!(
                "  stop fired on tick {} @ {} | pnl {}",
                i, trade.exit_price, trade.pnl
            );
            break;
        }
        if let Some(RiskEvent::Liquidation(_)) = outcome.risk {
            println!("  liquidated before the stop could fire (tick {})", i);
            break;
        }
    }
    println!("  balance: {}\n", sim.balance());
}

/// A deep crash pushes the loss past the margin and wipes the account.
fn scenario_4_liquidation() {
    println!("Scenario 4: Liquidation\n");

    let mut sim = Simulator::new(SimConfig::default());
    let mut rng = StdRng::seed_from_u64(9);

    sim.open_position(AssetId(2), Side::Long, Quote::new(dec!(900)), 10, None)
        .unwrap();
    println!("  long 900 notional at 10x (margin 90), balance {}", sim.balance());

    let crash = MarketEvent {
        title: "Flash crash",
        impact: dec!(-0.30),
        vol_boost: 2.0,
    };
    sim.apply_shock(AssetId(2), &crash).unwrap();
    println!("  applied -30% shock");

    let outcome = sim.tick(&mut rng);
    match outcome.risk {
        Some(RiskEvent::Liquidation(trade)) => {
            println!(
                "  liquidated @ {} | pnl {} | roe {:.0}%",
                trade.exit_price, trade.pnl, trade.roe_percent
            );
        }
        other => println!("  unexpected outcome: {:?}", other),
    }
    println!("  balance after wipe: {}\n", sim.balance());
}

/// Scripted shocks move prices and volatility; volatility decays back down.
fn scenario_5_market_shocks() {
    println!("Scenario 5: Market Shocks\n");

    let mut sim = Simulator::new(SimConfig::default());
    let mut rng = StdRng::seed_from_u64(12);

    for _ in 0..3 {
        if let Some(shock) = sim.trigger_event(&mut rng) {
            println!(
                "  {} hits asset {} ({}%)",
                shock.title,
                shock.asset_id.0,
                shock.impact * dec!(100)
            );
        }
    }
    println!("  volatility after shocks: {:.5}", sim.snapshot().volatility);

    for _ in 0..40 {
        sim.tick(&mut rng);
    }
    println!("  volatility after 40 ticks: {:.5}\n", sim.snapshot().volatility);
}

/// Save the whole game, restore it, and keep ticking identically.
fn scenario_6_save_restore() {
    println!("Scenario 6: Save / Restore\n");

    let mut original = Simulator::new(SimConfig::default());
    let mut rng = StdRng::seed_from_u64(77);

    original
        .open_position(AssetId(3), Side::Short, Quote::new(dec!(200)), 2, None)
        .unwrap();
    for _ in 0..10 {
        original.tick(&mut rng);
    }

    let saved = original.save();
    let mut restored = Simulator::restore(SimConfig::default(), saved);

    let mut rng_a = StdRng::seed_from_u64(123);
    let mut rng_b = StdRng::seed_from_u64(123);
    for _ in 0..20 {
        original.tick(&mut rng_a);
        restored.tick(&mut rng_b);
    }

    let price_a = original.price_of(AssetId(3)).unwrap();
    let price_b = restored.price_of(AssetId(3)).unwrap();
    println!("  original  COIN-C: {}", price_a);
    println!("  restored  COIN-C: {}", price_b);
    println!(
        "  identical after restore: {}",
        if price_a == price_b { "yes" } else { "NO" }
    );
}
