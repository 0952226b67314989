//! Block finality: accept-time pruning and per-block speculative state.
//!
//! Blocks are processed speculatively before they are final. Fills seen in an
//! in-flight block are recorded per block so a reorg can take them back out;
//! competing blocks at the same height are told apart by hash. Once a height is
//! accepted, orders that reached a terminal state at or below it can never be
//! revived and are dropped.

use super::core::Ledger;
use crate::events::EventPayload;
use crate::order::Order;
use crate::types::{BlockNumber, BlockRef, OrderId};
use rust_decimal::Decimal;
use std::collections::HashMap;

fn is_settled(order: &Order, block_number: BlockNumber, block_timestamp: u64) -> bool {
    match order.last_lifecycle() {
        Some(last) if last.status.is_terminal() => last.block_number <= block_number,
        Some(_) => order.is_expired(block_timestamp),
        // every status reverted away: the placement itself is being finalised
        None => order.block_number() <= block_number,
    }
}

impl Ledger {
    /// Finalise everything up to `block_number`. Returns the number of orders
    /// pruned. A height below a previous accept is ignored.
    pub fn accept(&mut self, block_number: BlockNumber, block_timestamp: u64) -> usize {
        if block_number < self.accepted_block_number {
            tracing::debug!(
                target: "ledger",
                block = block_number,
                accepted = self.accepted_block_number,
                "accept below watermark ignored"
            );
            return 0;
        }
        self.accepted_block_number = block_number;

        let before = self.orders.len();
        self.orders
            .retain(|_, order| !is_settled(order, block_number, block_timestamp));
        let pruned = before - self.orders.len();

        self.in_progress.retain(|block, _| block.number > block_number);

        tracing::info!(target: "ledger", block = block_number, pruned, remaining = self.orders.len(), "block accepted");
        self.emit_event(EventPayload::BlockAccepted { block_number, pruned });
        pruned
    }

    pub fn get_in_progress_blocks(&self) -> Vec<BlockRef> {
        self.in_progress.keys().copied().collect()
    }

    /// Add `quantities` to the block's overlay.
    pub fn update_in_progress_state(&mut self, block: BlockRef, quantities: &HashMap<String, Decimal>) {
        let overlay = self.in_progress.entry(block).or_default();
        for (key, quantity) in quantities {
            *overlay.entry(key.clone()).or_default() += *quantity;
        }
        tracing::debug!(target: "ledger", block = block.number, hash = %block.hash, keys = quantities.len(), "in-progress state updated");
    }

    /// Subtract `quantities` from the block's overlay. Zeroed keys and empty
    /// blocks are dropped.
    pub fn remove_in_progress_state(&mut self, block: BlockRef, quantities: &HashMap<String, Decimal>) {
        let Some(overlay) = self.in_progress.get_mut(&block) else {
            return;
        };
        for (key, quantity) in quantities {
            if let Some(current) = overlay.get_mut(key) {
                *current -= *quantity;
                if current.is_zero() {
                    overlay.remove(key);
                }
            }
        }
        if overlay.is_empty() {
            self.in_progress.remove(&block);
        }
    }

    /// Sum of `key` across every in-flight block.
    pub fn in_progress_quantity(&self, key: &str) -> Decimal {
        self.in_progress
            .values()
            .filter_map(|overlay| overlay.get(key))
            .copied()
            .sum()
    }

    /// The block was orphaned: take its fills back out of the orders still
    /// indexed and forget the overlay. Unwinding a full fill reopens the order.
    /// Each order's unwind is all or nothing: a delta that would leave the fill
    /// outside the order size is logged and that order is left as it was.
    /// Returns the number of orders touched.
    pub fn unwind_in_progress_block(&mut self, block: BlockRef) -> usize {
        let Some(overlay) = self.in_progress.remove(&block) else {
            return 0;
        };

        let mut touched = 0;
        for (key, quantity) in overlay {
            let order_id: OrderId = match key.parse() {
                Ok(id) => id,
                Err(err) => {
                    tracing::warn!(target: "ledger", %key, error = %err, "unparseable in-progress key");
                    continue;
                }
            };
            let Some(order) = self.orders.get_mut(&order_id) else {
                continue;
            };

            if let Err(err) = order.apply_fill(-quantity, block.number) {
                tracing::warn!(target: "ledger", order_id = %order_id, error = %err, "could not unwind in-progress fill");
                continue;
            }
            touched += 1;
        }

        tracing::info!(target: "ledger", block = block.number, hash = %block.hash, orders = touched, "in-progress block unwound");
        self.emit_event(EventPayload::InProgressBlockUnwound { block, orders: touched });
        touched
    }
}
