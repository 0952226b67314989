//! Liquidation and order-cancellation candidates.
//!
//! A trader below the maintenance margin fraction has every position in the
//! scanned markets flagged for liquidation. A trader above it but with negative
//! available margin keeps the positions and loses open orders instead, taken in
//! price-time priority until the freed margin covers the deficit.

use crate::margin::order_reserved_margin;
use crate::order::Order;
use crate::precision::PrecisionError;
use crate::types::{Address, MarketId, Quote, Side, SignedSize};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidablePosition {
    pub trader: Address,
    pub market: MarketId,
    pub side: Side,
    pub size: SignedSize,
    pub margin_fraction: Decimal,
    /// Size already liquidated in the current block.
    pub filled_size: Decimal,
    /// Largest single liquidation allowed, signed like the position.
    pub max_liquidation_size: SignedSize,
}

impl LiquidablePosition {
    pub fn remaining_size(&self) -> Decimal {
        (self.size.abs() - self.filled_size).max(Decimal::ZERO)
    }
}

/// `max(|size| * ratio, min_size)`, never more than the position itself.
pub fn calculate_max_liquidation_size(
    size: SignedSize,
    max_liquidation_ratio: Decimal,
    min_size_requirement: Decimal,
) -> SignedSize {
    let Some(side) = size.side() else {
        return SignedSize::zero();
    };
    let allowed = (size.abs() * max_liquidation_ratio)
        .max(min_size_requirement)
        .min(size.abs());
    SignedSize::from_side(side, allowed)
}

/// Most at risk first, then by trader and market so the output is stable.
pub fn sort_liquidable(positions: &mut [LiquidablePosition]) {
    positions.sort_by(|a, b| {
        a.margin_fraction
            .cmp(&b.margin_fraction)
            .then(a.trader.cmp(&b.trader))
            .then(a.market.cmp(&b.market))
    });
}

/// Takes orders from `candidates` in the order given until the margin they
/// reserve covers `deficit`. Returns the taken prefix.
pub fn select_orders_to_cancel<'a>(
    candidates: impl IntoIterator<Item = &'a Order>,
    deficit: Quote,
    min_allowable_margin: Decimal,
) -> Result<Vec<Order>, PrecisionError> {
    let mut freed = Quote::zero();
    let mut out = Vec::new();
    for order in candidates {
        if freed >= deficit {
            break;
        }
        freed = freed.checked_add(order_reserved_margin(order, min_allowable_margin)?)?;
        out.push(order.clone());
    }
    Ok(out)
}

/// Result of a naughty-trader scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NaughtyTraders {
    pub liquidable: Vec<LiquidablePosition>,
    pub orders_to_cancel: BTreeMap<Address, Vec<Order>>,
}

impl NaughtyTraders {
    pub fn is_empty(&self) -> bool {
        self.liquidable.is_empty() && self.orders_to_cancel.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Price;
    use rust_decimal_macros::dec;

    fn short_order(price: Decimal, salt: u128) -> Order {
        Order::new(
            MarketId(0),
            Address([1; 20]),
            SignedSize::new(dec!(-3)),
            Price::new_unchecked(price),
            salt,
            2,
            false,
        )
    }

    #[test]
    fn max_liquidation_size_uses_ratio() {
        let max = calculate_max_liquidation_size(SignedSize::new(dec!(-8)), dec!(0.25), dec!(0.01));
        assert_eq!(max.value(), dec!(-2));
    }

    #[test]
    fn max_liquidation_size_respects_min_size_and_position() {
        let max = calculate_max_liquidation_size(SignedSize::new(dec!(4)), dec!(0.25), dec!(1.5));
        assert_eq!(max.value(), dec!(1.5));

        let max = calculate_max_liquidation_size(SignedSize::new(dec!(1)), dec!(0.25), dec!(5));
        assert_eq!(max.value(), dec!(1));
        assert!(calculate_max_liquidation_size(SignedSize::zero(), dec!(0.25), dec!(5)).is_zero());
    }

    #[test]
    fn cancellation_stops_once_deficit_is_covered() {
        let book = vec![short_order(dec!(8), 3), short_order(dec!(9), 2), short_order(dec!(10), 1)];
        let taken = select_orders_to_cancel(&book, Quote::new(dec!(5)), dec!(0.2)).unwrap();
        let prices: Vec<_> = taken.iter().map(|o| o.price().value()).collect();
        // 8 frees 4.8, 9 brings it to 10.2
        assert_eq!(prices, vec![dec!(8), dec!(9)]);
    }

    #[test]
    fn nothing_to_cancel_without_a_deficit() {
        let book = vec![short_order(dec!(8), 3)];
        assert!(select_orders_to_cancel(&book, Quote::zero(), dec!(0.2)).unwrap().is_empty());
    }

    #[test]
    fn liquidable_sorted_by_risk() {
        let entry = |trader: u8, mf: Decimal| LiquidablePosition {
            trader: Address([trader; 20]),
            market: MarketId(0),
            side: Side::Long,
            size: SignedSize::new(dec!(1)),
            margin_fraction: mf,
            filled_size: Decimal::ZERO,
            max_liquidation_size: SignedSize::new(dec!(1)),
        };
        let mut all = vec![entry(1, dec!(0.05)), entry(2, dec!(-0.1)), entry(0, dec!(0.05))];
        sort_liquidable(&mut all);
        assert_eq!(all[0].trader, Address([2; 20]));
        assert_eq!(all[1].trader, Address([0; 20]));
        assert_eq!(all[2].remaining_size(), dec!(1));
    }
}
