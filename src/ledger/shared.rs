//! Thread-safe handle over a ledger.
//!
//! One reader/writer lock guards the whole ledger. Mutations take the write
//! lock; queries, including the sorted views and the naughty-trader scan, hold
//! the read lock for their whole computation so they see one consistent state.

use super::core::Ledger;
use super::results::LedgerError;
use super::snapshot::LedgerSnapshot;
use crate::api::LedgerApi;
use crate::liquidation::NaughtyTraders;
use crate::order::{FillOutcome, Lifecycle, Order, OrderStatus, OrderType};
use crate::trader::Trader;
use crate::types::{Address, BlockNumber, BlockRef, CollateralId, MarketId, OrderId, Price, PriceMap, Quote, SignedSize};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct SharedLedger {
    inner: Arc<RwLock<Ledger>>,
}

impl SharedLedger {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ledger)),
        }
    }

    /// Read access for compound queries that must see one state.
    pub fn read(&self) -> RwLockReadGuard<'_, Ledger> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Ledger> {
        self.inner.write()
    }
}

impl From<Ledger> for SharedLedger {
    fn from(ledger: Ledger) -> Self {
        Self::new(ledger)
    }
}

impl LedgerApi for SharedLedger {
    fn add(&self, order: Order) {
        self.inner.write().add(order)
    }

    fn set_order_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        info: &str,
        block_number: BlockNumber,
    ) -> Result<(), LedgerError> {
        self.inner.write().set_order_status(order_id, status, info, block_number)
    }

    fn revert_last_status(&self, order_id: OrderId) -> Result<Lifecycle, LedgerError> {
        self.inner.write().revert_last_status(order_id)
    }

    fn update_filled_base_asset_quantity(
        &self,
        delta: Decimal,
        order_id: OrderId,
        block_number: BlockNumber,
    ) -> Result<FillOutcome, LedgerError> {
        self.inner
            .write()
            .update_filled_base_asset_quantity(delta, order_id, block_number)
    }

    fn delete_order(&self, order_id: OrderId) -> Option<Order> {
        self.inner.write().delete_order(order_id)
    }

    fn accept(&self, block_number: BlockNumber, block_timestamp: u64) -> usize {
        self.inner.write().accept(block_number, block_timestamp)
    }

    fn get_all_orders(&self) -> Vec<Order> {
        self.inner.read().get_all_orders()
    }

    fn get_long_orders(&self, market: MarketId, lower_bound: Option<Price>, block_number: Option<BlockNumber>) -> Vec<Order> {
        self.inner.read().get_long_orders(market, lower_bound, block_number)
    }

    fn get_short_orders(&self, market: MarketId, upper_bound: Option<Price>, block_number: Option<BlockNumber>) -> Vec<Order> {
        self.inner.read().get_short_orders(market, upper_bound, block_number)
    }

    fn get_order_by_id(&self, order_id: OrderId) -> Option<Order> {
        self.inner.read().get_order_by_id(order_id)
    }

    fn get_all_open_orders_for_trader(&self, trader: Address) -> Vec<Order> {
        self.inner.read().get_all_open_orders_for_trader(trader)
    }

    fn get_open_orders_for_trader_by_type(&self, trader: Address, order_type: OrderType) -> Vec<Order> {
        self.inner.read().get_open_orders_for_trader_by_type(trader, order_type)
    }

    fn update_position(&self, trader: Address, market: MarketId, size: SignedSize, open_notional: Quote, is_liquidation: bool) {
        self.inner
            .write()
            .update_position(trader, market, size, open_notional, is_liquidation)
    }

    fn update_margin(&self, trader: Address, collateral: CollateralId, delta: Quote) -> Result<(), LedgerError> {
        self.inner.write().update_margin(trader, collateral, delta)
    }

    fn update_reserved_margin(&self, trader: Address, delta: Quote) -> Result<(), LedgerError> {
        self.inner.write().update_reserved_margin(trader, delta)
    }

    fn update_unrealised_funding(&self, market: MarketId, cumulative_premium_fraction: Decimal) -> Result<(), LedgerError> {
        self.inner
            .write()
            .update_unrealised_funding(market, cumulative_premium_fraction)
    }

    fn reset_unrealised_funding(&self, market: MarketId, trader: Address, cumulative_premium_fraction: Decimal) {
        self.inner
            .write()
            .reset_unrealised_funding(market, trader, cumulative_premium_fraction)
    }

    fn update_last_premium_fraction(&self, market: MarketId, trader: Address, last_premium_fraction: Decimal) {
        self.inner
            .write()
            .update_last_premium_fraction(market, trader, last_premium_fraction)
    }

    fn get_all_traders(&self) -> HashMap<Address, Trader> {
        self.inner.read().get_all_traders()
    }

    fn get_trader_info(&self, trader: Address) -> Option<Trader> {
        self.inner.read().get_trader_info(trader)
    }

    fn update_last_price(&self, market: MarketId, price: Price) {
        self.inner.write().update_last_price(market, price)
    }

    fn get_last_price(&self, market: MarketId) -> Option<Price> {
        self.inner.read().get_last_price(market)
    }

    fn get_last_prices(&self) -> PriceMap {
        self.inner.read().get_last_prices()
    }

    fn update_next_funding_time(&self, next_funding_time: u64) {
        self.inner.write().update_next_funding_time(next_funding_time)
    }

    fn get_next_funding_time(&self) -> u64 {
        self.inner.read().get_next_funding_time()
    }

    fn get_naughty_traders(&self, oracle_prices: &PriceMap, markets: &[MarketId]) -> Result<NaughtyTraders, LedgerError> {
        self.inner.read().get_naughty_traders(oracle_prices, markets)
    }

    fn get_in_progress_blocks(&self) -> Vec<BlockRef> {
        self.inner.read().get_in_progress_blocks()
    }

    fn update_in_progress_state(&self, block: BlockRef, quantities: &HashMap<String, Decimal>) {
        self.inner.write().update_in_progress_state(block, quantities)
    }

    fn remove_in_progress_state(&self, block: BlockRef, quantities: &HashMap<String, Decimal>) {
        self.inner.write().remove_in_progress_state(block, quantities)
    }

    fn in_progress_quantity(&self, key: &str) -> Decimal {
        self.inner.read().in_progress_quantity(key)
    }

    fn unwind_in_progress_block(&self, block: BlockRef) -> usize {
        self.inner.write().unwind_in_progress_block(block)
    }

    fn get_order_book_data_copy(&self) -> LedgerSnapshot {
        self.inner.read().get_order_book_data_copy()
    }

    fn load_from_snapshot(&self, snapshot: LedgerSnapshot) -> Result<(), LedgerError> {
        self.inner.write().load_from_snapshot(snapshot)
    }
}
