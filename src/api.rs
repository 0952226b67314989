//! The ledger's public surface, as consumed by block processors, the matching
//! pipeline and the liquidator.

use crate::ledger::{LedgerError, LedgerSnapshot};
use crate::liquidation::NaughtyTraders;
use crate::order::{FillOutcome, Lifecycle, Order, OrderStatus, OrderType};
use crate::trader::Trader;
use crate::types::{Address, BlockNumber, BlockRef, CollateralId, MarketId, OrderId, Price, PriceMap, Quote, SignedSize};
use rust_decimal::Decimal;
use std::collections::HashMap;

pub trait LedgerApi: Send + Sync {
    // orders
    fn add(&self, order: Order);
    fn set_order_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        info: &str,
        block_number: BlockNumber,
    ) -> Result<(), LedgerError>;
    fn revert_last_status(&self, order_id: OrderId) -> Result<Lifecycle, LedgerError>;
    fn update_filled_base_asset_quantity(
        &self,
        delta: Decimal,
        order_id: OrderId,
        block_number: BlockNumber,
    ) -> Result<FillOutcome, LedgerError>;
    fn delete_order(&self, order_id: OrderId) -> Option<Order>;
    fn accept(&self, block_number: BlockNumber, block_timestamp: u64) -> usize;

    fn get_all_orders(&self) -> Vec<Order>;
    fn get_long_orders(&self, market: MarketId, lower_bound: Option<Price>, block_number: Option<BlockNumber>) -> Vec<Order>;
    fn get_short_orders(&self, market: MarketId, upper_bound: Option<Price>, block_number: Option<BlockNumber>) -> Vec<Order>;
    fn get_order_by_id(&self, order_id: OrderId) -> Option<Order>;
    fn get_all_open_orders_for_trader(&self, trader: Address) -> Vec<Order>;
    fn get_open_orders_for_trader_by_type(&self, trader: Address, order_type: OrderType) -> Vec<Order>;

    // traders
    fn update_position(&self, trader: Address, market: MarketId, size: SignedSize, open_notional: Quote, is_liquidation: bool);
    fn update_margin(&self, trader: Address, collateral: CollateralId, delta: Quote) -> Result<(), LedgerError>;
    fn update_reserved_margin(&self, trader: Address, delta: Quote) -> Result<(), LedgerError>;
    fn update_unrealised_funding(&self, market: MarketId, cumulative_premium_fraction: Decimal) -> Result<(), LedgerError>;
    fn reset_unrealised_funding(&self, market: MarketId, trader: Address, cumulative_premium_fraction: Decimal);
    fn update_last_premium_fraction(&self, market: MarketId, trader: Address, last_premium_fraction: Decimal);
    fn get_all_traders(&self) -> HashMap<Address, Trader>;
    fn get_trader_info(&self, trader: Address) -> Option<Trader>;

    // prices and funding time
    fn update_last_price(&self, market: MarketId, price: Price);
    fn get_last_price(&self, market: MarketId) -> Option<Price>;
    fn get_last_prices(&self) -> PriceMap;
    fn update_next_funding_time(&self, next_funding_time: u64);
    fn get_next_funding_time(&self) -> u64;

    // risk
    fn get_naughty_traders(&self, oracle_prices: &PriceMap, markets: &[MarketId]) -> Result<NaughtyTraders, LedgerError>;

    // speculative state
    fn get_in_progress_blocks(&self) -> Vec<BlockRef>;
    fn update_in_progress_state(&self, block: BlockRef, quantities: &HashMap<String, Decimal>);
    fn remove_in_progress_state(&self, block: BlockRef, quantities: &HashMap<String, Decimal>);
    fn in_progress_quantity(&self, key: &str) -> Decimal;
    fn unwind_in_progress_block(&self, block: BlockRef) -> usize;

    // persistence
    fn get_order_book_data_copy(&self) -> LedgerSnapshot;
    fn load_from_snapshot(&self, snapshot: LedgerSnapshot) -> Result<(), LedgerError>;
}
