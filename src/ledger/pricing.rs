//! Last traded prices and the next funding time.

use super::core::Ledger;
use crate::events::EventPayload;
use crate::types::{MarketId, Price, PriceMap};

impl Ledger {
    pub fn update_last_price(&mut self, market: MarketId, price: Price) {
        self.last_prices.insert(market, price);
        tracing::debug!(target: "ledger", market = market.0, %price, "last price updated");
        self.emit_event(EventPayload::LastPriceUpdated { market, price });
    }

    pub fn get_last_price(&self, market: MarketId) -> Option<Price> {
        self.last_prices.get(&market).copied()
    }

    pub fn get_last_prices(&self) -> PriceMap {
        self.last_prices.clone()
    }

    /// Unix seconds of the next funding settlement.
    pub fn update_next_funding_time(&mut self, next_funding_time: u64) {
        self.next_funding_time = next_funding_time;
    }

    pub fn get_next_funding_time(&self) -> u64 {
        self.next_funding_time
    }
}
