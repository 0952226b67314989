// 8.0 ledger/core.rs: the ledger struct. orders, traders, prices, per-block overlays.

use super::config::LedgerOptions;
use crate::config::ConfigProvider;
use crate::events::{EventLog, EventPayload, LedgerEvent};
use crate::order::Order;
use crate::trader::Trader;
use crate::types::{Address, BlockNumber, BlockRef, OrderId, PriceMap};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Speculative fill deltas per in-flight block, keyed by order id hex.
pub type InProgressState = BTreeMap<BlockRef, HashMap<String, Decimal>>;

/** 8.1: main ledger struct. all state lives here */
pub struct Ledger {
    pub(super) options: LedgerOptions,
    pub(super) config: Arc<dyn ConfigProvider>,
    pub(super) orders: HashMap<OrderId, Order>,
    pub(super) traders: HashMap<Address, Trader>,
    pub(super) last_prices: PriceMap,
    pub(super) next_funding_time: u64,
    pub(super) in_progress: InProgressState,
    pub(super) accepted_block_number: BlockNumber,
    pub(super) unknown_fill_count: u64,
    pub(super) events: EventLog,
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("orders", &self.orders.len())
            .field("traders", &self.traders.len())
            .field("in_progress_blocks", &self.in_progress.len())
            .field("accepted_block_number", &self.accepted_block_number)
            .field("config", &self.config)
            .finish()
    }
}

impl Ledger {
    pub fn new(config: Arc<dyn ConfigProvider>, options: LedgerOptions) -> Self {
        let events = EventLog::new(options.max_events);
        Self {
            options,
            config,
            orders: HashMap::new(),
            traders: HashMap::new(),
            last_prices: PriceMap::new(),
            next_funding_time: 0,
            in_progress: InProgressState::new(),
            accepted_block_number: 0,
            unknown_fill_count: 0,
            events,
        }
    }

    pub fn with_config(config: Arc<dyn ConfigProvider>) -> Self {
        Self::new(config, LedgerOptions::default())
    }

    pub fn config(&self) -> &Arc<dyn ConfigProvider> {
        &self.config
    }

    /// Highest block passed to `accept` so far.
    pub fn accepted_block_number(&self) -> BlockNumber {
        self.accepted_block_number
    }

    /// Fills reported for orders the ledger never saw or already pruned.
    pub fn unknown_fill_count(&self) -> u64 {
        self.unknown_fill_count
    }

    pub fn recent_events(&self, count: usize) -> &[LedgerEvent] {
        self.events.recent(count)
    }

    pub fn events(&self) -> &[LedgerEvent] {
        self.events.events()
    }

    pub(super) fn trader_entry(&mut self, trader: Address) -> &mut Trader {
        self.traders.entry(trader).or_default()
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        if self.options.verbose {
            tracing::debug!(target: "ledger", event = ?payload, "ledger event");
        }
        self.events.push(payload);
    }
}
