//! Order mutation and lookup.

use super::core::Ledger;
use super::results::LedgerError;
use crate::events::{
    EventPayload, OrderAddedEvent, OrderFilledEvent, OrderStatusChangedEvent, OrderStatusRevertedEvent,
};
use crate::order::{FillOutcome, Lifecycle, Order, OrderStatus, OrderType};
use crate::types::{Address, BlockNumber, OrderId};
use rust_decimal::Decimal;

impl Ledger {
    /// Insert an order under its id. Re-adding the same id replaces the entry.
    pub fn add(&mut self, order: Order) {
        let order_id = order.id();
        tracing::debug!(
            target: "ledger",
            order_id = %order_id,
            market = order.market().0,
            trader = %order.trader(),
            size = %order.base_asset_quantity(),
            price = %order.price(),
            block = order.block_number(),
            "order added"
        );

        self.emit_event(EventPayload::OrderAdded(OrderAddedEvent {
            order_id,
            market: order.market(),
            trader: order.trader(),
            side: order.side(),
            size: order.base_asset_quantity(),
            price: order.price(),
            reduce_only: order.reduce_only,
        }));

        self.orders.insert(order_id, order);
    }

    /// Remove an order outright. Returns it if it was indexed.
    pub fn delete_order(&mut self, order_id: OrderId) -> Option<Order> {
        let removed = self.orders.remove(&order_id);
        if removed.is_some() {
            tracing::debug!(target: "ledger", order_id = %order_id, "order deleted");
            self.emit_event(EventPayload::OrderDeleted { order_id });
        }
        removed
    }

    /// Append a lifecycle entry. No transition check: the chain is the authority.
    pub fn set_order_status(
        &mut self,
        order_id: OrderId,
        status: OrderStatus,
        info: &str,
        block_number: BlockNumber,
    ) -> Result<(), LedgerError> {
        let order = self
            .orders
            .get_mut(&order_id)
            .ok_or(LedgerError::OrderNotFound(order_id))?;
        order.set_status(status, info, block_number);

        tracing::debug!(target: "ledger", order_id = %order_id, ?status, block = block_number, "order status set");
        self.emit_event(EventPayload::OrderStatusChanged(OrderStatusChangedEvent {
            order_id,
            status,
            info: info.to_string(),
            block_number,
        }));
        Ok(())
    }

    /// Pop the most recent lifecycle entry. Fails with `OrderNotFound` when the
    /// order is not indexed (never added, deleted or pruned) and with
    /// `NoStatusToRevert` when it is indexed but every entry, `Placed`
    /// included, has already been popped.
    pub fn revert_last_status(&mut self, order_id: OrderId) -> Result<Lifecycle, LedgerError> {
        let order = self
            .orders
            .get_mut(&order_id)
            .ok_or(LedgerError::OrderNotFound(order_id))?;
        let reverted = order
            .revert_last_status()
            .ok_or(LedgerError::NoStatusToRevert(order_id))?;
        let current = order.status();

        tracing::debug!(target: "ledger", order_id = %order_id, reverted = ?reverted.status, ?current, "order status reverted");
        self.emit_event(EventPayload::OrderStatusReverted(OrderStatusRevertedEvent {
            order_id,
            reverted: reverted.status,
            current,
        }));
        Ok(reverted)
    }

    /// Apply a fill delta in the order's direction. Reaching the full size marks
    /// the order Fulfilled at `block_number`; a negative delta on a fulfilled
    /// order reopens it.
    pub fn update_filled_base_asset_quantity(
        &mut self,
        delta: Decimal,
        order_id: OrderId,
        block_number: BlockNumber,
    ) -> Result<FillOutcome, LedgerError> {
        let Some(order) = self.orders.get_mut(&order_id) else {
            self.unknown_fill_count += 1;
            tracing::warn!(
                target: "ledger",
                order_id = %order_id,
                %delta,
                unknown_fills = self.unknown_fill_count,
                "fill for unknown order"
            );
            return Err(LedgerError::FillForUnknownOrder(order_id));
        };

        let outcome = match order.apply_fill(delta, block_number) {
            Ok(outcome) => outcome,
            Err(source) => {
                tracing::warn!(target: "ledger", order_id = %order_id, %delta, error = %source, "overfill rejected");
                return Err(LedgerError::Overfill { order_id, source });
            }
        };

        tracing::debug!(
            target: "ledger",
            order_id = %order_id,
            %delta,
            filled = %outcome.filled_base_asset_quantity,
            fulfilled = outcome.fulfilled,
            reopened = outcome.reopened,
            "order filled"
        );
        self.emit_event(EventPayload::OrderFilled(OrderFilledEvent {
            order_id,
            delta,
            filled: outcome.filled_base_asset_quantity,
            block_number,
            fulfilled: outcome.fulfilled,
            reopened: outcome.reopened,
        }));
        Ok(outcome)
    }

    pub fn get_order(&self, order_id: OrderId) -> Option<&Order> {
        self.orders.get(&order_id)
    }

    pub fn get_order_by_id(&self, order_id: OrderId) -> Option<Order> {
        self.orders.get(&order_id).cloned()
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Every indexed order, whatever its status.
    pub fn get_all_orders(&self) -> Vec<Order> {
        self.orders.values().cloned().collect()
    }

    pub fn get_all_open_orders_for_trader(&self, trader: Address) -> Vec<Order> {
        self.orders
            .values()
            .filter(|o| o.trader() == trader && o.is_open())
            .cloned()
            .collect()
    }

    pub fn get_open_orders_for_trader_by_type(&self, trader: Address, order_type: OrderType) -> Vec<Order> {
        self.orders
            .values()
            .filter(|o| o.trader() == trader && o.order_type == order_type && o.is_open())
            .cloned()
            .collect()
    }
}
