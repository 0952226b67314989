//! Order entity and lifecycle state machine.
//!
//! An order is identified by a Keccak-256 hash of its immutable fields, computed
//! once at construction. Its status is not a field but the last entry of an
//! append-only lifecycle log: setting a status appends, reverting pops, and the
//! finality manager prunes by the block number of the last entry.

use crate::precision::{self, PrecisionError};
use crate::types::{Address, BlockNumber, MarketId, OrderId, Price, Quote, Side, SignedSize};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

/// Order lifecycle states. `Placed` is the only non-terminal one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Placed,
    Fulfilled,
    Cancelled,
    /// Settlement transaction reverted on chain.
    ExecutionFailed,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Placed)
    }
}

/// One entry of the lifecycle log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifecycle {
    pub status: OrderStatus,
    pub info: String,
    pub block_number: BlockNumber,
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    /// Rests on the book until filled or cancelled.
    Limit,
    /// Fill what is possible before `expire_at`, then drop.
    ImmediateOrCancel,
}

impl Default for OrderType {
    fn default() -> Self {
        Self::Limit
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrderError {
    #[error("fill delta {delta} would move filled size {filled} outside [0, {base}]")]
    Overfill {
        delta: Decimal,
        filled: Decimal,
        base: Decimal,
    },
}

/// Result of applying a fill delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillOutcome {
    pub filled_base_asset_quantity: SignedSize,
    /// True when this fill completed the order and appended `Fulfilled`.
    pub fulfilled: bool,
    /// True when a negative delta took a fulfilled order back below its size
    /// and popped the `Fulfilled` entry.
    pub reopened: bool,
}

/// A resting order. The hashed fields and the fill are private: the id is
/// computed once from them, and fills only move through [`Order::apply_fill`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    market: MarketId,
    side: Side,
    trader: Address,
    base_asset_quantity: SignedSize,
    filled_base_asset_quantity: SignedSize,
    price: Price,
    salt: u128,
    block_number: BlockNumber,
    pub reduce_only: bool,
    #[serde(default)]
    pub order_type: OrderType,
    /// Unix seconds after which an open IOC order is dropped at accept time.
    #[serde(default)]
    pub expire_at: Option<u64>,
    pub lifecycle: Vec<Lifecycle>,
}

impl Order {
    /// Builds a limit order placed at `block_number`. The side follows the sign of
    /// `base_asset_quantity`; the lifecycle starts with `Placed` at that block.
    pub fn new(
        market: MarketId,
        trader: Address,
        base_asset_quantity: SignedSize,
        price: Price,
        salt: u128,
        block_number: BlockNumber,
        reduce_only: bool,
    ) -> Self {
        debug_assert!(!base_asset_quantity.is_zero(), "order quantity must be non-zero");
        let side = if base_asset_quantity.is_long() {
            Side::Long
        } else {
            Side::Short
        };
        let id = compute_order_id(market, trader, base_asset_quantity, price, block_number, salt);

        Self {
            id,
            market,
            side,
            trader,
            base_asset_quantity,
            filled_base_asset_quantity: SignedSize::zero(),
            price,
            salt,
            block_number,
            reduce_only,
            order_type: OrderType::Limit,
            expire_at: None,
            lifecycle: vec![Lifecycle {
                status: OrderStatus::Placed,
                info: String::new(),
                block_number,
            }],
        }
    }

    /// Turns this into an IOC order that expires at `expire_at` (unix seconds).
    pub fn immediate_or_cancel(mut self, expire_at: u64) -> Self {
        self.order_type = OrderType::ImmediateOrCancel;
        self.expire_at = Some(expire_at);
        self
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn market(&self) -> MarketId {
        self.market
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn trader(&self) -> Address {
        self.trader
    }

    pub fn base_asset_quantity(&self) -> SignedSize {
        self.base_asset_quantity
    }

    pub fn filled_base_asset_quantity(&self) -> SignedSize {
        self.filled_base_asset_quantity
    }

    pub fn price(&self) -> Price {
        self.price
    }

    pub fn salt(&self) -> u128 {
        self.salt
    }

    /// Block the order was placed in.
    pub fn block_number(&self) -> BlockNumber {
        self.block_number
    }

    /// Recomputes the hash from the stored immutable fields.
    pub fn recomputed_id(&self) -> OrderId {
        compute_order_id(
            self.market,
            self.trader,
            self.base_asset_quantity,
            self.price,
            self.block_number,
            self.salt,
        )
    }

    pub fn last_lifecycle(&self) -> Option<&Lifecycle> {
        self.lifecycle.last()
    }

    /// Current status. `None` once every entry has been reverted.
    pub fn status(&self) -> Option<OrderStatus> {
        self.lifecycle.last().map(|l| l.status)
    }

    pub fn is_open(&self) -> bool {
        self.status() == Some(OrderStatus::Placed)
    }

    pub fn unfilled_base_asset_quantity(&self) -> SignedSize {
        self.base_asset_quantity.sub(self.filled_base_asset_quantity)
    }

    pub fn is_fully_filled(&self) -> bool {
        self.filled_base_asset_quantity.abs() == self.base_asset_quantity.abs()
    }

    pub fn is_expired(&self, block_timestamp: u64) -> bool {
        matches!(self.expire_at, Some(expire_at) if self.order_type == OrderType::ImmediateOrCancel && expire_at < block_timestamp)
    }

    pub fn set_status(&mut self, status: OrderStatus, info: impl Into<String>, block_number: BlockNumber) {
        self.lifecycle.push(Lifecycle {
            status,
            info: info.into(),
            block_number,
        });
    }

    pub fn revert_last_status(&mut self) -> Option<Lifecycle> {
        self.lifecycle.pop()
    }

    /// Applies a fill delta in the order's own direction: positive grows the
    /// filled magnitude, negative shrinks it. The stored sign always follows
    /// the side. Reaching the full size appends `Fulfilled` at `block_number`;
    /// a negative delta on a fulfilled order pops that entry again, so the
    /// order is `Fulfilled` exactly while it is fully filled. A rejected delta
    /// changes nothing.
    pub fn apply_fill(&mut self, delta: Decimal, block_number: BlockNumber) -> Result<FillOutcome, OrderError> {
        let base = self.base_asset_quantity.abs();
        let filled = self.filled_base_asset_quantity.abs();
        let next = match filled.checked_add(delta) {
            Some(next) if next >= Decimal::ZERO && next <= base => next,
            _ => return Err(OrderError::Overfill { delta, filled, base }),
        };

        self.filled_base_asset_quantity = SignedSize::from_side(self.side, next);

        let was_fulfilled = self.status() == Some(OrderStatus::Fulfilled);
        let fulfilled = next == base && !was_fulfilled;
        let reopened = delta < Decimal::ZERO && was_fulfilled;
        if fulfilled {
            self.set_status(OrderStatus::Fulfilled, "", block_number);
        }
        if reopened {
            self.lifecycle.pop();
        }

        Ok(FillOutcome {
            filled_base_asset_quantity: self.filled_base_asset_quantity,
            fulfilled,
            reopened,
        })
    }

    /// Copy whose unfilled size is at most `max_unfilled`, for views that must
    /// not show more than a position can absorb. The stored order is untouched.
    pub fn with_unfilled_at_most(&self, max_unfilled: Decimal) -> Order {
        let mut shown = self.clone();
        let base = self.base_asset_quantity.abs();
        if self.unfilled_base_asset_quantity().abs() > max_unfilled {
            shown.filled_base_asset_quantity = SignedSize::from_side(self.side, base - max_unfilled);
        }
        shown
    }

    /// Notional of the unfilled remainder: |unfilled * price|.
    pub fn unfilled_notional(&self) -> Result<Quote, PrecisionError> {
        self.unfilled_base_asset_quantity()
            .abs()
            .checked_mul(self.price.value())
            .map(Quote::new)
            .ok_or(PrecisionError::ArithmeticOverflow { operation: "order notional" })
    }

    /// Chain-scaled view for the external settlement encoder.
    pub fn settlement_order(&self) -> Result<SettlementOrder, PrecisionError> {
        Ok(SettlementOrder {
            market: self.market,
            trader: self.trader,
            base_asset_quantity: precision::size_to_scaled(self.base_asset_quantity.value())?,
            price: precision::price_to_scaled(self.price.value())?,
            salt: self.salt,
            reduce_only: self.reduce_only,
        })
    }
}

/// The fields a settlement transaction carries, in wire precision
/// (size 1e18, price 1e6). Encoding and signing happen elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementOrder {
    pub market: MarketId,
    pub trader: Address,
    pub base_asset_quantity: i128,
    pub price: i128,
    pub salt: u128,
    pub reduce_only: bool,
}

// 32-byte big-endian word, sign extended like an abi int256
fn int_word(v: i128) -> [u8; 32] {
    let mut word = if v < 0 { [0xff; 32] } else { [0u8; 32] };
    word[16..].copy_from_slice(&v.to_be_bytes());
    word
}

fn uint_word(v: u128) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&v.to_be_bytes());
    word
}

fn decimal_words(d: Decimal) -> [[u8; 32]; 2] {
    let d = d.normalize();
    [int_word(d.mantissa()), uint_word(d.scale() as u128)]
}

/// Keccak-256 over market, trader, signed quantity, price, block and salt.
/// Decimals are normalized first so equal values always hash equally.
pub fn compute_order_id(
    market: MarketId,
    trader: Address,
    base_asset_quantity: SignedSize,
    price: Price,
    block_number: BlockNumber,
    salt: u128,
) -> OrderId {
    let mut trader_word = [0u8; 32];
    trader_word[12..].copy_from_slice(trader.as_bytes());

    let mut hasher = Keccak256::new();
    hasher.update(uint_word(market.0 as u128));
    hasher.update(trader_word);
    for word in decimal_words(base_asset_quantity.value()) {
        hasher.update(word);
    }
    for word in decimal_words(price.value()) {
        hasher.update(word);
    }
    hasher.update(uint_word(block_number as u128));
    hasher.update(uint_word(salt));

    OrderId(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn trader() -> Address {
        "0x22Bb736b64A0b4D4081E103f83bccF864F0404aa".parse().unwrap()
    }

    fn short_order(qty: Decimal) -> Order {
        Order::new(
            MarketId(0),
            trader(),
            SignedSize::new(qty),
            Price::new_unchecked(dec!(20)),
            7,
            2,
            false,
        )
    }

    #[test]
    fn side_follows_quantity_sign() {
        assert_eq!(short_order(dec!(-10)).side, Side::Short);
        assert_eq!(short_order(dec!(10)).side, Side::Long);
    }

    #[test]
    fn identical_orders_share_an_id() {
        let a = short_order(dec!(-10));
        let b = short_order(dec!(-10.000));
        assert_eq!(a.id(), b.id());

        let mut other_salt = short_order(dec!(-10));
        other_salt.salt = 8;
        assert_ne!(a.id(), other_salt.recomputed_id());
    }

    #[test]
    fn id_is_not_affected_by_fills_or_status() {
        let mut order = short_order(dec!(-10));
        let id = order.id();
        order.apply_fill(dec!(4), 3).unwrap();
        order.set_status(OrderStatus::Cancelled, "user", 4);
        assert_eq!(order.id(), id);
        assert_eq!(order.recomputed_id(), id);
    }

    #[test]
    fn fills_take_the_order_side() {
        let mut short = short_order(dec!(-10));
        short.apply_fill(dec!(2), 69).unwrap();
        assert_eq!(short.filled_base_asset_quantity.value(), dec!(-2));

        let mut long = short_order(dec!(10));
        long.apply_fill(dec!(2), 69).unwrap();
        assert_eq!(long.filled_base_asset_quantity.value(), dec!(2));
    }

    #[test]
    fn full_fill_appends_fulfilled() {
        let mut order = short_order(dec!(-10));
        let outcome = order.apply_fill(dec!(10), 69).unwrap();
        assert!(outcome.fulfilled);
        assert!(order.unfilled_base_asset_quantity().is_zero());
        assert_eq!(order.status(), Some(OrderStatus::Fulfilled));
        assert_eq!(order.last_lifecycle().unwrap().block_number, 69);
    }

    #[test]
    fn overfill_is_rejected_without_mutation() {
        let mut order = short_order(dec!(-10));
        order.apply_fill(dec!(6), 3).unwrap();
        let err = order.apply_fill(dec!(5), 4).unwrap_err();
        assert_eq!(
            err,
            OrderError::Overfill {
                delta: dec!(5),
                filled: dec!(6),
                base: dec!(10)
            }
        );
        assert_eq!(order.filled_base_asset_quantity.value(), dec!(-6));
        assert!(order.apply_fill(dec!(-7), 4).is_err());
    }

    #[test]
    fn negative_delta_unwinds_a_fill() {
        let mut order = short_order(dec!(-10));
        order.apply_fill(dec!(6), 3).unwrap();
        order.apply_fill(dec!(-6), 3).unwrap();
        assert!(order.filled_base_asset_quantity.is_zero());
        assert!(order.is_open());
    }

    #[test]
    fn partial_unwind_of_a_full_fill_reopens_the_order() {
        let mut order = short_order(dec!(-10));
        order.apply_fill(dec!(10), 5).unwrap();
        assert_eq!(order.status(), Some(OrderStatus::Fulfilled));

        let outcome = order.apply_fill(dec!(-3), 5).unwrap();
        assert!(outcome.reopened && !outcome.fulfilled);
        assert_eq!(order.filled_base_asset_quantity().value(), dec!(-7));
        assert_eq!(order.status(), Some(OrderStatus::Placed));
        assert_eq!(order.lifecycle.len(), 1);

        // filling back up fulfils again, at the new block
        let outcome = order.apply_fill(dec!(3), 6).unwrap();
        assert!(outcome.fulfilled && !outcome.reopened);
        assert_eq!(order.last_lifecycle().unwrap().block_number, 6);
    }

    #[test]
    fn positive_delta_keeps_a_manual_fulfilled() {
        let mut order = short_order(dec!(-10));
        order.set_status(OrderStatus::Fulfilled, "", 4);
        let outcome = order.apply_fill(dec!(1), 5).unwrap();
        assert!(!outcome.reopened);
        assert_eq!(order.status(), Some(OrderStatus::Fulfilled));
    }

    #[test]
    fn rejected_unwind_keeps_status_and_fill() {
        let mut order = short_order(dec!(-2));
        order.apply_fill(dec!(2), 11).unwrap();
        let before = order.clone();
        assert!(order.apply_fill(dec!(3), 11).is_err());
        assert!(order.apply_fill(dec!(-5), 11).is_err());
        assert!(order.apply_fill(Decimal::MAX, 11).is_err());
        assert_eq!(order, before);
    }

    #[test]
    fn clamped_copy_caps_the_unfilled_size() {
        let mut order = short_order(dec!(-10));
        order.apply_fill(dec!(2), 3).unwrap();
        let shown = order.with_unfilled_at_most(dec!(5));
        assert_eq!(shown.unfilled_base_asset_quantity().value(), dec!(-5));
        assert_eq!(shown.filled_base_asset_quantity().value(), dec!(-5));
        assert_eq!(order.filled_base_asset_quantity().value(), dec!(-2));
        assert_eq!(order.with_unfilled_at_most(dec!(9)), order);
    }

    #[test]
    fn unfilled_notional_is_checked() {
        let order = short_order(dec!(-3));
        assert_eq!(order.unfilled_notional().unwrap().value(), dec!(60));
        let huge = Order::new(
            MarketId(0),
            trader(),
            SignedSize::new(dec!(100000000000000000000)),
            Price::new_unchecked(dec!(1000000000)),
            0,
            1,
            false,
        );
        assert!(huge.unfilled_notional().is_err());
    }

    #[test]
    fn unfilled_quantity_keeps_the_sign() {
        let mut long = short_order(dec!(10));
        long.filled_base_asset_quantity = SignedSize::new(dec!(5));
        assert_eq!(long.unfilled_base_asset_quantity().value(), dec!(5));

        let mut short = short_order(dec!(-10));
        short.filled_base_asset_quantity = SignedSize::new(dec!(-5));
        assert_eq!(short.unfilled_base_asset_quantity().value(), dec!(-5));
    }

    #[test]
    fn revert_pops_down_to_empty() {
        let mut order = short_order(dec!(-10));
        order.set_status(OrderStatus::Fulfilled, "", 3);
        assert_eq!(order.revert_last_status().unwrap().status, OrderStatus::Fulfilled);
        assert_eq!(order.lifecycle.len(), 1);
        assert_eq!(order.lifecycle[0].block_number, 2);
        order.revert_last_status();
        assert_eq!(order.status(), None);
        assert!(order.revert_last_status().is_none());
    }

    #[test]
    fn ioc_expiry() {
        let order = short_order(dec!(-1)).immediate_or_cancel(100);
        assert!(!order.is_expired(100));
        assert!(order.is_expired(101));
        assert!(!short_order(dec!(-1)).is_expired(u64::MAX));
    }

    #[test]
    fn settlement_order_is_chain_scaled() {
        let settlement = short_order(dec!(-3)).settlement_order().unwrap();
        assert_eq!(settlement.base_asset_quantity, -3 * precision::SIZE_BASE_PRECISION);
        assert_eq!(settlement.price, 20 * precision::PRICE_PRECISION);
    }
}
