// orderbook-ledger: in-memory order book ledger for a perpetual futures DEX.
// reorg-aware: state is applied speculatively per block and pruned once final.
// all computation is deterministic with no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: MarketId, Address, OrderId, BlockRef, Side, Price, Quote
//   1.5  precision.rs: chain fixed-point (1e18 sizes, 1e6 prices) <-> Decimal
//   2.x  order.rs: order entity, id hashing, lifecycle state machine
//   2.1x priority.rs: price-time priority, view filters, reduce-only clamp
//   3.x  margin.rs: dual valuation, margin fraction, available margin
//   4.x  position.rs: position struct, notional, unrealised pnl
//   5.x  funding.rs: premium-fraction funding accrual
//   6.x  liquidation.rs: liquidable positions, order cancellation walk
//   7.x  config.rs: ConfigProvider trait, StaticConfig
//   8.x  ledger/: the ledger: orders, traders, views, risk, finality, snapshots
//   8.9  api.rs: LedgerApi trait, implemented by SharedLedger
//   10.x trader.rs: trader margin + positions
//   11.x events.rs: state transition events for audit

// core ledger modules
pub mod events;
pub mod funding;
pub mod ledger;
pub mod liquidation;
pub mod margin;
pub mod order;
pub mod position;
pub mod priority;
pub mod trader;
pub mod types;

// integration modules
pub mod api;
pub mod config;
pub mod precision;

// re exports for convenience
pub use api::LedgerApi;
pub use config::{ConfigError, ConfigProvider, MarketRiskConfig, StaticConfig};
pub use events::*;
pub use funding::*;
pub use ledger::*;
pub use liquidation::*;
pub use margin::*;
pub use order::*;
pub use position::*;
pub use precision::PrecisionError;
pub use priority::*;
pub use trader::*;
pub use types::*;
