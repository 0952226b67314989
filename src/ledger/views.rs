//! Price-time priority views over the open orders of one market side.

use super::core::Ledger;
use crate::order::Order;
use crate::priority::{reduce_only_view, sort_by_priority, ViewFilter};
use crate::types::{BlockNumber, MarketId, Price, Side};

impl Ledger {
    /// Open long orders with `price >= lower_bound`, highest price first.
    pub fn get_long_orders(
        &self,
        market: MarketId,
        lower_bound: Option<Price>,
        block_number: Option<BlockNumber>,
    ) -> Vec<Order> {
        self.side_view(ViewFilter {
            market,
            side: Side::Long,
            price_bound: lower_bound,
            max_block_number: block_number,
        })
    }

    /// Open short orders with `price <= upper_bound`, lowest price first.
    pub fn get_short_orders(
        &self,
        market: MarketId,
        upper_bound: Option<Price>,
        block_number: Option<BlockNumber>,
    ) -> Vec<Order> {
        self.side_view(ViewFilter {
            market,
            side: Side::Short,
            price_bound: upper_bound,
            max_block_number: block_number,
        })
    }

    // copies, never references: reduce-only orders may be shown clamped
    pub(super) fn side_view(&self, filter: ViewFilter) -> Vec<Order> {
        let mut out: Vec<Order> = self
            .orders
            .values()
            .filter(|order| filter.admits(order))
            .filter_map(|order| {
                if !order.reduce_only {
                    return Some(order.clone());
                }
                let position = self
                    .traders
                    .get(&order.trader())
                    .and_then(|t| t.get_position(order.market()));
                reduce_only_view(order, position)
            })
            .collect();

        sort_by_priority(filter.side, &mut out);
        out
    }
}
