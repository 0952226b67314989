//! Trader ledger: margin balances and per-market positions.
//!
//! Traders are created lazily on the first write that mentions them and are never
//! removed. A zero-size position is still a position: it keeps its funding
//! watermark for the next time the trader opens that market.

use crate::funding::total_pending_funding;
use crate::position::Position;
use crate::precision::PrecisionError;
use crate::types::{CollateralId, MarketId, Quote};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Margin {
    /// Signed balance per collateral. May go negative after losses.
    pub deposited: BTreeMap<CollateralId, Quote>,
    /// Margin locked by open orders.
    pub reserved: Quote,
}

impl Margin {
    pub fn total_deposited(&self) -> Result<Quote, PrecisionError> {
        Quote::checked_sum(self.deposited.values())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trader {
    pub positions: BTreeMap<MarketId, Position>,
    pub margin: Margin,
}

impl Trader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_position(&self, market: MarketId) -> Option<&Position> {
        self.positions.get(&market)
    }

    pub fn get_position_mut(&mut self, market: MarketId) -> Option<&mut Position> {
        self.positions.get_mut(&market)
    }

    pub fn position_entry(&mut self, market: MarketId) -> &mut Position {
        self.positions.entry(market).or_default()
    }

    /// True if any of `markets` holds a non-zero position.
    pub fn has_exposure(&self, markets: &[MarketId]) -> bool {
        markets
            .iter()
            .filter_map(|m| self.positions.get(m))
            .any(|p| !p.is_empty())
    }

    /// Returns the new balance. On overflow the balance is left as it was.
    pub fn deposit(&mut self, collateral: CollateralId, delta: Quote) -> Result<Quote, PrecisionError> {
        let current = self.margin.deposited.get(&collateral).copied().unwrap_or_default();
        let balance = current.checked_add(delta)?;
        self.margin.deposited.insert(collateral, balance);
        Ok(balance)
    }

    pub fn reserve(&mut self, delta: Quote) -> Result<Quote, PrecisionError> {
        self.margin.reserved = self.margin.reserved.checked_add(delta)?;
        Ok(self.margin.reserved)
    }

    /// Funding payable across `markets`.
    pub fn pending_funding(&self, markets: &[MarketId]) -> Result<Quote, PrecisionError> {
        total_pending_funding(markets.iter().filter_map(|m| self.positions.get(m)))
    }

    /// Deposits net of funding owed on `markets`. This is the margin the risk
    /// engine starts from.
    pub fn normalised_margin(&self, markets: &[MarketId]) -> Result<Quote, PrecisionError> {
        self.margin.total_deposited()?.checked_sub(self.pending_funding(markets)?)
    }
}
