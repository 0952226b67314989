// 8.0.2: errors for ledger operations.

use crate::config::ConfigError;
use crate::order::OrderError;
use crate::precision::PrecisionError;
use crate::types::OrderId;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("Order {0} not found")]
    OrderNotFound(OrderId),

    /// The order is indexed but its lifecycle is already empty: a placed
    /// order can be reverted once, down to no status at all, and no further.
    /// An order that is not indexed yields `OrderNotFound` instead.
    #[error("Order {0} has no status left to revert")]
    NoStatusToRevert(OrderId),

    /// Fill reported for an order the ledger does not hold. Counted, and safe
    /// to ignore for callers replaying chain logs.
    #[error("Fill for unknown order {0}")]
    FillForUnknownOrder(OrderId),

    #[error("Order {order_id}: {source}")]
    Overfill {
        order_id: OrderId,
        #[source]
        source: OrderError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid snapshot: {reason}")]
    InvalidSnapshot { reason: String },

    #[error("Snapshot serialization failed: {reason}")]
    Serialization { reason: String },

    /// Chain-scale conversion failed, or a margin, notional or funding amount
    /// left the 96-bit decimal range.
    #[error("Precision error: {0}")]
    Precision(#[from] PrecisionError),
}

impl LedgerError {
    pub fn is_unknown_fill(&self) -> bool {
        matches!(self, LedgerError::FillForUnknownOrder(_))
    }
}
