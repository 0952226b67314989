//! Trader, margin and funding bookkeeping.

use super::core::Ledger;
use super::results::LedgerError;
use crate::events::{EventPayload, MarginUpdatedEvent, PositionUpdatedEvent};
use crate::funding::{accrued_funding, settle_funding};
use crate::trader::Trader;
use crate::types::{Address, CollateralId, MarketId, Quote, SignedSize};
use rust_decimal::Decimal;
use std::collections::HashMap;

impl Ledger {
    /// Overwrite size and open notional. Funding fields are kept.
    pub fn update_position(
        &mut self,
        trader: Address,
        market: MarketId,
        size: SignedSize,
        open_notional: Quote,
        is_liquidation: bool,
    ) {
        let position = self.trader_entry(trader).position_entry(market);
        position.size = size;
        position.open_notional = open_notional;

        if is_liquidation {
            tracing::info!(target: "ledger", %trader, market = market.0, %size, "position updated by liquidation");
        } else {
            tracing::debug!(target: "ledger", %trader, market = market.0, %size, %open_notional, "position updated");
        }
        self.emit_event(EventPayload::PositionUpdated(PositionUpdatedEvent {
            trader,
            market,
            size,
            open_notional,
            is_liquidation,
        }));
    }

    /// Add `delta` to one collateral balance. On overflow nothing changes.
    pub fn update_margin(&mut self, trader: Address, collateral: CollateralId, delta: Quote) -> Result<(), LedgerError> {
        let balance = self.trader_entry(trader).deposit(collateral, delta)?;

        tracing::debug!(target: "ledger", %trader, collateral = collateral.0, %delta, %balance, "margin updated");
        self.emit_event(EventPayload::MarginUpdated(MarginUpdatedEvent {
            trader,
            collateral,
            delta,
            balance,
        }));
        Ok(())
    }

    pub fn update_reserved_margin(&mut self, trader: Address, delta: Quote) -> Result<(), LedgerError> {
        let reserved = self.trader_entry(trader).reserve(delta)?;

        tracing::debug!(target: "ledger", %trader, %delta, %reserved, "reserved margin updated");
        self.emit_event(EventPayload::ReservedMarginUpdated { trader, delta, reserved });
        Ok(())
    }

    /// Accrue funding on every position in `market` against the new cumulative
    /// premium fraction. All or nothing: if any accrual overflows, no position
    /// is touched.
    pub fn update_unrealised_funding(
        &mut self,
        market: MarketId,
        cumulative_premium_fraction: Decimal,
    ) -> Result<(), LedgerError> {
        let mut accrued = Vec::new();
        for (address, trader) in &self.traders {
            if let Some(position) = trader.get_position(market) {
                accrued.push((*address, accrued_funding(position, cumulative_premium_fraction)?));
            }
        }

        let positions = accrued.len();
        for (address, funding) in accrued {
            if let Some(position) = self
                .traders
                .get_mut(&address)
                .and_then(|t| t.get_position_mut(market))
            {
                position.unrealised_funding = funding;
            }
        }

        tracing::debug!(target: "ledger", market = market.0, cpf = %cumulative_premium_fraction, positions, "funding accrued");
        self.emit_event(EventPayload::FundingAccrued {
            market,
            cumulative_premium_fraction,
            positions,
        });
        Ok(())
    }

    /// Funding settled on chain: zero it and move the watermark. No-op without
    /// a position.
    pub fn reset_unrealised_funding(&mut self, market: MarketId, trader: Address, cumulative_premium_fraction: Decimal) {
        let Some(position) = self
            .traders
            .get_mut(&trader)
            .and_then(|t| t.get_position_mut(market))
        else {
            return;
        };
        settle_funding(position, cumulative_premium_fraction);

        tracing::debug!(target: "ledger", %trader, market = market.0, cpf = %cumulative_premium_fraction, "funding settled");
        self.emit_event(EventPayload::FundingSettled {
            trader,
            market,
            cumulative_premium_fraction,
        });
    }

    /// Move the funding watermark only. No-op without a position.
    pub fn update_last_premium_fraction(&mut self, market: MarketId, trader: Address, last_premium_fraction: Decimal) {
        if let Some(position) = self
            .traders
            .get_mut(&trader)
            .and_then(|t| t.get_position_mut(market))
        {
            position.last_premium_fraction = last_premium_fraction;
        }
    }

    pub fn get_all_traders(&self) -> HashMap<Address, Trader> {
        self.traders.clone()
    }

    pub fn get_trader(&self, trader: Address) -> Option<&Trader> {
        self.traders.get(&trader)
    }

    pub fn get_trader_info(&self, trader: Address) -> Option<Trader> {
        self.traders.get(&trader).cloned()
    }
}
