// 8.0: the ledger. owns orders, traders, last prices and the speculative
// per-block state. each concern is its own `impl Ledger` file; SharedLedger
// wraps it in one reader/writer lock for concurrent callers.

mod config;
mod core;
mod finality;
mod orders;
mod pricing;
mod results;
mod risk;
mod shared;
mod snapshot;
mod traders;
mod views;

pub use config::LedgerOptions;
pub use self::core::{InProgressState, Ledger};
pub use results::LedgerError;
pub use shared::SharedLedger;
pub use snapshot::{LedgerData, LedgerSnapshot};
