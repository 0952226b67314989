// 2.0: price-time priority. shorts: cheapest first. longs: highest bid first.
// ties go to the older block, then the lower salt.
// 2.1 has the view filter, 2.2 the reduce-only clamp.

use crate::order::Order;
use crate::position::Position;
use crate::types::{BlockNumber, MarketId, Price, Side};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityKey {
    pub price: Price,
    pub block_number: BlockNumber,
    pub salt: u128,
}

impl PriorityKey {
    pub fn of(order: &Order) -> Self {
        Self {
            price: order.price(),
            block_number: order.block_number(),
            salt: order.salt(),
        }
    }

    /// Orders two keys for the given book side. `Less` means `self` matches first.
    pub fn cmp_for(&self, side: Side, other: &Self) -> Ordering {
        let by_price = match side {
            Side::Short => self.price.cmp(&other.price),
            Side::Long => other.price.cmp(&self.price),
        };
        by_price
            .then(self.block_number.cmp(&other.block_number))
            .then(self.salt.cmp(&other.salt))
    }
}

pub fn sort_by_priority(side: Side, orders: &mut [Order]) {
    orders.sort_by(|a, b| PriorityKey::of(a).cmp_for(side, &PriorityKey::of(b)));
}

/// 2.1: which orders a side view admits before reduce-only handling.
#[derive(Debug, Clone, Copy)]
pub struct ViewFilter {
    pub market: MarketId,
    pub side: Side,
    /// Long view: `price >= bound`. Short view: `price <= bound`.
    pub price_bound: Option<Price>,
    pub max_block_number: Option<BlockNumber>,
}

impl ViewFilter {
    pub fn admits(&self, order: &Order) -> bool {
        if order.market() != self.market || order.side() != self.side {
            return false;
        }
        if !order.is_open() || order.is_fully_filled() {
            return false;
        }
        if let Some(bound) = self.price_bound {
            let in_range = match self.side {
                Side::Long => order.price() >= bound,
                Side::Short => order.price() <= bound,
            };
            if !in_range {
                return false;
            }
        }
        match self.max_block_number {
            Some(max) => order.block_number() <= max,
            None => true,
        }
    }
}

/// 2.2: a reduce-only order only shows up against an opposite, non-zero position,
/// and never for more than that position can absorb. Returns the copy to show.
pub fn reduce_only_view(order: &Order, position: Option<&Position>) -> Option<Order> {
    let size = position.map(|p| p.size).unwrap_or_default();
    let position_side = size.side()?;
    if position_side == order.side() {
        return None;
    }
    Some(order.with_unfilled_at_most(size.abs()))
}
