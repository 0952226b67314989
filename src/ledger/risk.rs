//! Naughty-trader scan: liquidation and order-cancellation candidates.

use super::core::Ledger;
use super::results::LedgerError;
use crate::liquidation::{
    calculate_max_liquidation_size, select_orders_to_cancel, sort_liquidable, LiquidablePosition, NaughtyTraders,
};
use crate::margin::{MarginMode, TraderRisk};
use crate::order::{Order, OrderType};
use crate::priority::ViewFilter;
use crate::trader::Trader;
use crate::types::{Address, MarketId, PriceMap, Side};
use rust_decimal::Decimal;

impl Ledger {
    /// Margin state of one trader over `markets`, valued at `oracle_prices` and
    /// the ledger's last prices. `None` for a trader the ledger never saw.
    pub fn get_trader_risk(
        &self,
        trader: Address,
        oracle_prices: &PriceMap,
        markets: &[MarketId],
    ) -> Result<Option<TraderRisk>, LedgerError> {
        let Some(entry) = self.traders.get(&trader) else {
            return Ok(None);
        };
        Ok(Some(TraderRisk::evaluate(entry, markets, oracle_prices, &self.last_prices)?))
    }

    /// Scans every trader with exposure in `markets`. Traders under maintenance
    /// margin get all their positions flagged for liquidation; traders with
    /// negative available margin get enough open orders flagged for
    /// cancellation to cover the deficit. Config errors and amounts outside the
    /// decimal range abort the scan.
    pub fn get_naughty_traders(
        &self,
        oracle_prices: &PriceMap,
        markets: &[MarketId],
    ) -> Result<NaughtyTraders, LedgerError> {
        let min_allowable_margin = self.config.min_allowable_margin()?;
        let maintenance_margin = self.config.maintenance_margin()?;

        let mut result = NaughtyTraders::default();

        for (address, trader) in &self.traders {
            if !trader.has_exposure(markets) {
                continue;
            }

            let risk = TraderRisk::evaluate(trader, markets, oracle_prices, &self.last_prices)?;
            let margin_fraction = risk.margin_fraction(MarginMode::Maintenance)?;

            if margin_fraction < maintenance_margin {
                tracing::info!(target: "ledger", trader = %address, %margin_fraction, "trader below maintenance margin");
                result
                    .liquidable
                    .extend(self.liquidable_positions(*address, trader, markets, margin_fraction)?);
                continue;
            }

            let available = risk.available_margin(min_allowable_margin)?;
            if !available.is_negative() {
                continue;
            }

            let candidates = self.cancellable_orders(*address, markets);
            let to_cancel = select_orders_to_cancel(&candidates, available.negate(), min_allowable_margin)?;
            tracing::info!(
                target: "ledger",
                trader = %address,
                %available,
                orders = to_cancel.len(),
                "negative available margin"
            );
            if !to_cancel.is_empty() {
                result.orders_to_cancel.insert(*address, to_cancel);
            }
        }

        sort_liquidable(&mut result.liquidable);
        Ok(result)
    }

    fn liquidable_positions(
        &self,
        address: Address,
        trader: &Trader,
        markets: &[MarketId],
        margin_fraction: Decimal,
    ) -> Result<Vec<LiquidablePosition>, LedgerError> {
        let mut out = Vec::new();
        for market in markets {
            let Some(position) = trader.get_position(*market) else {
                continue;
            };
            let Some(side) = position.side() else {
                continue;
            };

            let max_liquidation_size = calculate_max_liquidation_size(
                position.size,
                self.config.max_liquidation_ratio(*market)?,
                self.config.min_size_requirement(*market)?,
            );
            out.push(LiquidablePosition {
                trader: address,
                market: *market,
                side,
                size: position.size,
                margin_fraction,
                filled_size: Decimal::ZERO,
                max_liquidation_size,
            });
        }
        Ok(out)
    }

    // market by market in the order given, longs then shorts, each in priority order
    fn cancellable_orders(&self, trader: Address, markets: &[MarketId]) -> Vec<Order> {
        let mut out = Vec::new();
        for market in markets {
            for side in [Side::Long, Side::Short] {
                let view = self.side_view(ViewFilter {
                    market: *market,
                    side,
                    price_bound: None,
                    max_block_number: None,
                });
                out.extend(
                    view.into_iter()
                        .filter(|o| o.trader() == trader && !o.reduce_only && o.order_type == OrderType::Limit),
                );
            }
        }
        out
    }
}
