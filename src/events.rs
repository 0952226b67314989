// 11.0: every state change produces an event. used for audit trails and for
// tests that want to see what the ledger did. the EventPayload enum lists all
// event types. events are observability only and never part of a snapshot.

use crate::order::OrderStatus;
use crate::types::{Address, BlockNumber, BlockRef, CollateralId, MarketId, OrderId, Price, Quote, Side, SignedSize};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub id: EventId,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    // Order events
    OrderAdded(OrderAddedEvent),
    OrderStatusChanged(OrderStatusChangedEvent),
    OrderStatusReverted(OrderStatusRevertedEvent),
    OrderFilled(OrderFilledEvent),
    OrderDeleted { order_id: OrderId },

    // Trader events
    PositionUpdated(PositionUpdatedEvent),
    MarginUpdated(MarginUpdatedEvent),
    ReservedMarginUpdated { trader: Address, delta: Quote, reserved: Quote },

    // Funding and price events
    FundingAccrued { market: MarketId, cumulative_premium_fraction: Decimal, positions: usize },
    FundingSettled { trader: Address, market: MarketId, cumulative_premium_fraction: Decimal },
    LastPriceUpdated { market: MarketId, price: Price },

    // Finality events
    BlockAccepted { block_number: BlockNumber, pruned: usize },
    InProgressBlockUnwound { block: BlockRef, orders: usize },
    SnapshotRestored { accepted_block_number: BlockNumber, orders: usize, traders: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAddedEvent {
    pub order_id: OrderId,
    pub market: MarketId,
    pub trader: Address,
    pub side: Side,
    pub size: SignedSize,
    pub price: Price,
    pub reduce_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusChangedEvent {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub info: String,
    pub block_number: BlockNumber,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusRevertedEvent {
    pub order_id: OrderId,
    pub reverted: OrderStatus,
    /// Status after the revert. `None` once the lifecycle is empty.
    pub current: Option<OrderStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderFilledEvent {
    pub order_id: OrderId,
    pub delta: Decimal,
    pub filled: SignedSize,
    pub block_number: BlockNumber,
    pub fulfilled: bool,
    /// A negative delta took the order out of `Fulfilled`.
    pub reopened: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionUpdatedEvent {
    pub trader: Address,
    pub market: MarketId,
    pub size: SignedSize,
    pub open_notional: Quote,
    pub is_liquidation: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginUpdatedEvent {
    pub trader: Address,
    pub collateral: CollateralId,
    pub delta: Quote,
    pub balance: Quote,
}

// 11.1: bounded in-memory log. oldest events are dropped first.
#[derive(Debug, Clone)]
pub struct EventLog {
    events: Vec<LedgerEvent>,
    next_id: u64,
    max_events: usize,
}

impl EventLog {
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Vec::new(),
            next_id: 1,
            max_events,
        }
    }

    pub fn push(&mut self, payload: EventPayload) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        self.events.push(LedgerEvent {
            id,
            timestamp: Utc::now(),
            payload,
        });

        if self.events.len() > self.max_events {
            let drain_count = self.events.len() - self.max_events;
            self.events.drain(0..drain_count);
        }
        id
    }

    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    pub fn recent(&self, count: usize) -> &[LedgerEvent] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn price_event(market: u32) -> EventPayload {
        EventPayload::LastPriceUpdated {
            market: MarketId(market),
            price: Price::new_unchecked(dec!(20)),
        }
    }

    #[test]
    fn log_assigns_increasing_ids() {
        let mut log = EventLog::new(10);
        let a = log.push(price_event(0));
        let b = log.push(price_event(1));
        assert!(a < b);
        assert_eq!(log.events().len(), 2);
        assert_eq!(log.recent(1)[0].payload, price_event(1));

        log.clear();
        assert!(log.events().is_empty());
    }

    #[test]
    fn log_drops_oldest_past_capacity() {
        let mut log = EventLog::new(2);
        for market in 0..5 {
            log.push(price_event(market));
        }
        assert_eq!(log.events().len(), 2);
        assert_eq!(log.events()[0].id, EventId(4));
    }
}
