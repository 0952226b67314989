//! Property-based tests for the ledger invariants.
//!
//! These tests verify invariants hold under random inputs.

use orderbook_ledger::*;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

// Strategies for generating test data
fn price_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|x| Decimal::new(x, 2)) // 0.01 to 10,000
}

fn size_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..10_000i64).prop_map(|x| Decimal::new(x, 2)) // 0.01 to 100
}

fn side_strategy() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Long), Just(Side::Short)]
}

fn quote_strategy() -> impl Strategy<Value = Decimal> {
    (-1_000_000i64..1_000_000i64).prop_map(|x| Decimal::new(x, 2))
}

fn book_strategy() -> impl Strategy<Value = Vec<(Decimal, u64, u128)>> {
    prop::collection::vec((price_strategy(), 1u64..50u64, 0u128..1_000u128), 1..40)
}

fn ledger() -> Ledger {
    Ledger::with_config(Arc::new(StaticConfig::default()))
}

fn order(side: Side, size: Decimal, price: Decimal, block: u64, salt: u128) -> Order {
    Order::new(
        MarketId(0),
        Address([9; 20]),
        SignedSize::from_side(side, size),
        Price::new_unchecked(price),
        salt,
        block,
        false,
    )
}

proptest! {
    /// Filled magnitude never leaves [0, |base|], whatever fills arrive, and the
    /// order reads `Fulfilled` exactly while it is fully filled
    #[test]
    fn fill_stays_within_order_size(
        size in size_strategy(),
        side in side_strategy(),
        fills in prop::collection::vec(-5_000i64..5_000i64, 1..20),
    ) {
        let mut ledger = ledger();
        let o = order(side, size, dec!(10), 1, 0);
        let id = o.id();
        ledger.add(o);

        for raw in fills {
            let _ = ledger.update_filled_base_asset_quantity(Decimal::new(raw, 2), id, 2);
            let stored = ledger.get_order(id).unwrap();
            let filled = stored.filled_base_asset_quantity();
            prop_assert!(filled.abs() <= size);
            prop_assert!(filled.is_zero() || filled.side() == Some(side));
            prop_assert_eq!(stored.status() == Some(OrderStatus::Fulfilled), filled.abs() == size);
            prop_assert_eq!(stored.lifecycle.len(), if filled.abs() == size { 2 } else { 1 });
        }
    }

    /// Rejected fills leave the order untouched
    #[test]
    fn overfill_is_rejected_atomically(
        size in size_strategy(),
        side in side_strategy(),
        extra in 1i64..1_000i64,
    ) {
        let mut ledger = ledger();
        let o = order(side, size, dec!(10), 1, 0);
        let id = o.id();
        ledger.add(o);

        let before = ledger.get_order(id).unwrap().clone();
        let result = ledger.update_filled_base_asset_quantity(size + Decimal::new(extra, 2), id, 2);
        prop_assert!(matches!(result, Err(LedgerError::Overfill { .. })), "expected Overfill error, got {:?}", result);
        prop_assert_eq!(ledger.get_order(id).unwrap(), &before);
    }

    /// Margin deltas are additive and order-independent
    #[test]
    fn margin_updates_commute(deltas in prop::collection::vec(quote_strategy(), 1..20)) {
        let trader = Address([3; 20]);
        let mut forward = ledger();
        let mut backward = ledger();

        for d in &deltas {
            forward.update_margin(trader, CollateralId::HUSD, Quote::new(*d)).unwrap();
        }
        for d in deltas.iter().rev() {
            backward.update_margin(trader, CollateralId::HUSD, Quote::new(*d)).unwrap();
        }

        let total: Decimal = deltas.iter().copied().sum();
        let f = forward.get_trader(trader).unwrap().margin.deposited[&CollateralId::HUSD];
        let b = backward.get_trader(trader).unwrap().margin.deposited[&CollateralId::HUSD];
        prop_assert_eq!(f.value(), total);
        prop_assert_eq!(b.value(), total);
    }

    /// Short view ascends by price, long view descends, ties by block then salt
    #[test]
    fn side_views_are_in_priority_order(book in book_strategy(), side in side_strategy()) {
        let mut ledger = ledger();
        for (price, block, salt) in &book {
            ledger.add(order(side, dec!(1), *price, *block, *salt));
        }

        let view = match side {
            Side::Long => ledger.get_long_orders(MarketId(0), None, None),
            Side::Short => ledger.get_short_orders(MarketId(0), None, None),
        };
        prop_assert_eq!(view.len(), ledger.order_count());

        for pair in view.windows(2) {
            let (a, b) = (PriorityKey::of(&pair[0]), PriorityKey::of(&pair[1]));
            prop_assert_ne!(a.cmp_for(side, &b), std::cmp::Ordering::Greater);
            match side {
                Side::Long => {
                    prop_assert!(a.price >= b.price);
                }
                Side::Short => {
                    prop_assert!(a.price <= b.price);
                }
            }
        }
    }

    /// Price bound and block cap never admit an order outside them
    #[test]
    fn view_bounds_hold(book in book_strategy(), bound in price_strategy(), cap in 1u64..50u64) {
        let mut ledger = ledger();
        for (price, block, salt) in &book {
            ledger.add(order(Side::Long, dec!(1), *price, *block, *salt));
            ledger.add(order(Side::Short, dec!(1), *price, *block, *salt));
        }
        let bound = Price::new_unchecked(bound);

        for o in ledger.get_long_orders(MarketId(0), Some(bound), Some(cap)) {
            prop_assert!(o.price() >= bound && o.block_number() <= cap);
        }
        for o in ledger.get_short_orders(MarketId(0), Some(bound), Some(cap)) {
            prop_assert!(o.price() <= bound && o.block_number() <= cap);
        }
    }

    /// Nothing terminal at or below an accepted height survives the accept,
    /// and nothing above it is touched
    #[test]
    fn accept_prunes_exactly_the_settled(
        statuses in prop::collection::vec((0u8..4u8, 1u64..20u64), 1..30),
        height in 1u64..20u64,
    ) {
        let mut ledger = ledger();
        let mut expected_kept = 0;
        for (salt, (kind, block)) in statuses.iter().enumerate() {
            let o = order(Side::Long, dec!(1), dec!(10), 1, salt as u128);
            let id = o.id();
            ledger.add(o);
            let status = match kind {
                0 => None,
                1 => Some(OrderStatus::Fulfilled),
                2 => Some(OrderStatus::Cancelled),
                _ => Some(OrderStatus::ExecutionFailed),
            };
            match status {
                Some(status) => {
                    ledger.set_order_status(id, status, "", *block).unwrap();
                    if *block > height {
                        expected_kept += 1;
                    }
                }
                None => expected_kept += 1,
            }
        }

        ledger.accept(height, 0);
        prop_assert_eq!(ledger.order_count(), expected_kept);
        for o in ledger.get_all_orders() {
            let last = o.last_lifecycle().unwrap();
            prop_assert!(!last.status.is_terminal() || last.block_number > height);
        }
    }

    /// Required margin scales linearly with notional
    #[test]
    fn reserved_margin_is_linear(size in size_strategy(), price in price_strategy(), side in side_strategy()) {
        let o = order(side, size, price, 1, 0);
        let reserved = order_reserved_margin(&o, dec!(0.2)).unwrap();
        prop_assert_eq!(reserved.value(), size * price * dec!(0.2));
        prop_assert!(!reserved.is_negative());
    }

    /// Funding accrual is (cpf - last) * size and settles to zero
    #[test]
    fn funding_accrues_then_settles(
        size in size_strategy(),
        side in side_strategy(),
        cpf in (-1_000i64..1_000i64).prop_map(|x| Decimal::new(x, 4)),
    ) {
        let mut ledger = ledger();
        let trader = Address([5; 20]);
        let signed = SignedSize::from_side(side, size);
        ledger.update_position(trader, MarketId(0), signed, Quote::new(size * dec!(10)), false);
        ledger.update_unrealised_funding(MarketId(0), cpf).unwrap();

        let position = &ledger.get_trader(trader).unwrap().positions[&MarketId(0)];
        prop_assert_eq!(position.unrealised_funding.value(), cpf * signed.value());

        ledger.reset_unrealised_funding(MarketId(0), trader, cpf);
        let position = &ledger.get_trader(trader).unwrap().positions[&MarketId(0)];
        prop_assert!(position.unrealised_funding.is_zero());
        prop_assert_eq!(position.last_premium_fraction, cpf);
    }
}
