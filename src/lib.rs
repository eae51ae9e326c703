// papertrade-core: leveraged paper-trading game engine.
// simulation-first architecture: the price walk and the margin ledger take priority.
// all computation is deterministic given an injected seeded rng, no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: AssetId, Side, Price, Quote, Leverage
//   2.x  config.rs: walk constants, ledger limits, asset presets
//   3.x  market.rs: asset table + scalar volatility, owned by the price engine
//   4.x  price_engine.rs: random-walk ticks, trade impact, scripted shocks
//   5.x  catalog.rs: fixed table of scripted market events
//   6.x  position.rs: leveraged position, pnl/roe math, closed-trade record
//   7.x  account.rs: player balance, stars, decoupled top-up flow
//   8.x  ledger.rs: open/close, margin enforcement, stop-loss, liquidation
//   9.x  events.rs: bounded audit log of state transitions
//   10.x sim.rs: orchestrator: tick loop, commands, snapshots, persistence

// core simulation modules
pub mod catalog;
pub mod market;
pub mod price_engine;
pub mod types;

// ledger modules
pub mod account;
pub mod ledger;
pub mod position;

// orchestration modules
pub mod config;
pub mod events;
pub mod sim;

// re exports for convenience
pub use account::*;
pub use catalog::*;
pub use config::*;
pub use events::*;
pub use ledger::*;
pub use market::*;
pub use position::*;
pub use price_engine::*;
pub use sim::*;
pub use types::*;
