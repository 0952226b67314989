//! Deep copies of ledger state and restore from them.

use super::core::Ledger;
use super::results::LedgerError;
use crate::events::EventPayload;
use crate::order::Order;
use crate::trader::Trader;
use crate::types::{Address, BlockNumber, OrderId, PriceMap};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The persistent part of the ledger. In-progress overlays and the audit log
/// are not included.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerData {
    pub orders: HashMap<OrderId, Order>,
    pub traders: HashMap<Address, Trader>,
    pub last_prices: PriceMap,
    pub next_funding_time: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub data: LedgerData,
    pub accepted_block_number: BlockNumber,
    pub taken_at: DateTime<Utc>,
}

impl LedgerSnapshot {
    pub fn to_json(&self) -> Result<String, LedgerError> {
        serde_json::to_string(self).map_err(|e| LedgerError::Serialization { reason: e.to_string() })
    }

    pub fn from_json(json: &str) -> Result<Self, LedgerError> {
        serde_json::from_str(json).map_err(|e| LedgerError::Serialization { reason: e.to_string() })
    }

    // orders are keyed by the hash of their own fields
    fn validate(&self) -> Result<(), LedgerError> {
        for (key, order) in &self.data.orders {
            let recomputed = order.recomputed_id();
            if *key != recomputed || order.id() != recomputed {
                return Err(LedgerError::InvalidSnapshot {
                    reason: format!("order {} does not hash to its key", key),
                });
            }
        }
        Ok(())
    }
}

impl Ledger {
    /// Independent deep copy of the persistent state.
    pub fn get_order_book_data_copy(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            data: LedgerData {
                orders: self.orders.clone(),
                traders: self.traders.clone(),
                last_prices: self.last_prices.clone(),
                next_funding_time: self.next_funding_time,
            },
            accepted_block_number: self.accepted_block_number,
            taken_at: Utc::now(),
        }
    }

    /// Replace all state with the snapshot. On error nothing changes.
    pub fn load_from_snapshot(&mut self, snapshot: LedgerSnapshot) -> Result<(), LedgerError> {
        snapshot.validate()?;

        let LedgerSnapshot {
            data,
            accepted_block_number,
            taken_at,
        } = snapshot;
        let (orders, traders) = (data.orders.len(), data.traders.len());

        self.orders = data.orders;
        self.traders = data.traders;
        self.last_prices = data.last_prices;
        self.next_funding_time = data.next_funding_time;
        self.accepted_block_number = accepted_block_number;
        self.in_progress.clear();

        tracing::info!(
            target: "ledger",
            orders,
            traders,
            accepted = accepted_block_number,
            %taken_at,
            "ledger restored from snapshot"
        );
        self.emit_event(EventPayload::SnapshotRestored {
            accepted_block_number,
            orders,
            traders,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticConfig;
    use crate::types::{CollateralId, MarketId, Price, Quote, SignedSize};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn populated() -> Ledger {
        let mut ledger = Ledger::with_config(Arc::new(StaticConfig::default()));
        let trader = Address([3; 20]);
        ledger.add(Order::new(
            MarketId(0),
            trader,
            SignedSize::new(dec!(1.5)),
            Price::new_unchecked(dec!(20)),
            9,
            4,
            false,
        ));
        ledger.update_margin(trader, CollateralId::HUSD, Quote::new(dec!(100))).unwrap();
        ledger.update_position(trader, MarketId(0), SignedSize::new(dec!(-2)), Quote::new(dec!(40)), false);
        ledger.update_last_price(MarketId(0), Price::new_unchecked(dec!(21)));
        ledger.update_next_funding_time(1_700_000_000);
        ledger.accept(3, 3);
        ledger
    }

    #[test]
    fn copy_is_independent() {
        let mut ledger = populated();
        let copy = ledger.get_order_book_data_copy();
        let id = *copy.data.orders.keys().next().unwrap();
        ledger.update_filled_base_asset_quantity(dec!(1), id, 5).unwrap();
        assert!(copy.data.orders[&id].filled_base_asset_quantity().is_zero());
    }

    #[test]
    fn json_round_trip_restores_state() {
        let ledger = populated();
        let json = ledger.get_order_book_data_copy().to_json().unwrap();

        let mut restored = Ledger::with_config(Arc::new(StaticConfig::default()));
        restored.load_from_snapshot(LedgerSnapshot::from_json(&json).unwrap()).unwrap();
        assert_eq!(restored.get_all_orders(), ledger.get_all_orders());
        assert_eq!(restored.get_all_traders(), ledger.get_all_traders());
        assert_eq!(restored.get_last_prices(), ledger.get_last_prices());
        assert_eq!(restored.get_next_funding_time(), 1_700_000_000);
        assert_eq!(restored.accepted_block_number(), 3);
    }

    #[test]
    fn tampered_order_is_rejected() {
        let ledger = populated();
        let mut snapshot = ledger.get_order_book_data_copy();
        // file an order under another order's id
        let (_, order) = snapshot.data.orders.drain().next().unwrap();
        let other = Order::new(
            order.market(),
            order.trader(),
            order.base_asset_quantity(),
            order.price(),
            order.salt() + 1,
            order.block_number(),
            order.reduce_only,
        );
        snapshot.data.orders.insert(other.id(), order);

        let mut target = populated();
        let before = target.get_all_orders();
        let err = target.load_from_snapshot(snapshot).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidSnapshot { .. }));
        assert_eq!(target.get_all_orders(), before);
    }

    #[test]
    fn garbage_json_is_a_serialization_error() {
        assert!(matches!(
            LedgerSnapshot::from_json("{"),
            Err(LedgerError::Serialization { .. })
        ));
    }
}
