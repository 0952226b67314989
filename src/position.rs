// 4.0: per-market position of one trader. size and open notional are written
// by the settlement processor, funding fields are maintained by the ledger.
// 4.1 has the valuation helpers at the bottom.

use crate::precision::PrecisionError;
use crate::types::{Price, Quote, Side, SignedSize};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub size: SignedSize,
    /// Quote paid (long) or received (short) to open the current size.
    pub open_notional: Quote,
    /// Funding owed by the trader, positive = payable.
    pub unrealised_funding: Quote,
    /// Cumulative premium fraction at the last funding settlement.
    pub last_premium_fraction: Decimal,
}

impl Position {
    pub fn with_size(size: SignedSize, open_notional: Decimal) -> Self {
        Self {
            size,
            open_notional: Quote::new(open_notional),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.size.is_zero()
    }

    pub fn side(&self) -> Option<Side> {
        self.size.side()
    }

    pub fn notional(&self, price: Price) -> Result<Quote, PrecisionError> {
        notional_value(self.size, price)
    }

    pub fn unrealised_pnl(&self, price: Price) -> Result<Quote, PrecisionError> {
        calculate_unrealised_pnl(self.size, self.open_notional, price)
    }
}

// 4.1: |size| * price
pub fn notional_value(size: SignedSize, price: Price) -> Result<Quote, PrecisionError> {
    size.abs()
        .checked_mul(price.value())
        .map(Quote::new)
        .ok_or(PrecisionError::ArithmeticOverflow { operation: "notional" })
}

// longs gain when notional grows past what they paid, shorts when it shrinks
pub fn calculate_unrealised_pnl(size: SignedSize, open_notional: Quote, price: Price) -> Result<Quote, PrecisionError> {
    let notional = notional_value(size, price)?;
    match size.side() {
        Some(Side::Long) => notional.checked_sub(open_notional),
        Some(Side::Short) => open_notional.checked_sub(notional),
        None => Ok(Quote::zero()),
    }
}
