//! Margin fraction and margin requirements.
//!
//! Every trader is valued twice: once at oracle prices and once at last traded
//! prices. Which of the two valuations counts depends on the question asked.
//! Opening risk (min allowable margin) takes the more pessimistic one, while
//! liquidation (maintenance margin) takes the more forgiving one so a single
//! bad print cannot liquidate anybody.
//!
//! `margin_fraction = (margin + pnl) / notional`, with `margin` already net of
//! funding owed. No exposure yields `Decimal::MAX`. Every step is checked:
//! an amount outside the 96-bit decimal range is a `PrecisionError`, never a
//! panic and never a fraction.

use crate::order::Order;
use crate::position::{calculate_unrealised_pnl, notional_value, Position};
use crate::precision::PrecisionError;
use crate::trader::Trader;
use crate::types::{MarketId, Price, PriceMap, Quote};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarginMode {
    /// Pick the valuation with the lower margin fraction.
    MinAllowable,
    /// Pick the valuation with the higher margin fraction.
    Maintenance,
}

/// Total notional and unrealised pnl of a trader under one price source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Valuation {
    pub notional: Quote,
    pub unrealised_pnl: Quote,
}

impl Valuation {
    pub fn equity(&self, margin: Quote) -> Result<Quote, PrecisionError> {
        margin.checked_add(self.unrealised_pnl)
    }

    fn include(&mut self, position: &Position, price: Price) -> Result<(), PrecisionError> {
        let notional = self.notional.checked_add(notional_value(position.size, price)?)?;
        let pnl = self
            .unrealised_pnl
            .checked_add(calculate_unrealised_pnl(position.size, position.open_notional, price)?)?;
        self.notional = notional;
        self.unrealised_pnl = pnl;
        Ok(())
    }
}

pub fn margin_fraction(margin: Quote, valuation: &Valuation) -> Result<Decimal, PrecisionError> {
    if valuation.notional.is_zero() {
        return Ok(Decimal::MAX);
    }
    valuation
        .equity(margin)?
        .value()
        .checked_div(valuation.notional.value())
        .ok_or(PrecisionError::ArithmeticOverflow { operation: "margin fraction" })
}

pub fn calculate_required_margin(notional: Quote, ratio: Decimal) -> Result<Quote, PrecisionError> {
    notional.checked_mul(ratio)
}

/// Margin an open order locks: `|unfilled * price| * ratio`.
pub fn order_reserved_margin(order: &Order, min_allowable_margin: Decimal) -> Result<Quote, PrecisionError> {
    calculate_required_margin(order.unfilled_notional()?, min_allowable_margin)
}

/// Oracle and last-price valuations of one trader over a set of markets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DualValuation {
    pub oracle: Valuation,
    pub last: Valuation,
}

impl DualValuation {
    /// Values every non-zero position in `markets`. A market missing from one
    /// source is valued at the other source's price; a market missing from
    /// both is skipped.
    pub fn of(
        trader: &Trader,
        markets: &[MarketId],
        oracle_prices: &PriceMap,
        last_prices: &PriceMap,
    ) -> Result<Self, PrecisionError> {
        let mut out = Self::default();

        for market in markets {
            let Some(position) = trader.get_position(*market) else {
                continue;
            };
            if position.is_empty() {
                continue;
            }

            let oracle = oracle_prices.get(market).or_else(|| last_prices.get(market));
            let last = last_prices.get(market).or_else(|| oracle_prices.get(market));
            let (Some(oracle), Some(last)) = (oracle, last) else {
                tracing::warn!(target: "ledger", market = market.0, "no oracle or last price, market skipped in valuation");
                continue;
            };

            out.oracle.include(position, *oracle)?;
            out.last.include(position, *last)?;
        }

        Ok(out)
    }

    /// Ties go to the oracle valuation.
    pub fn select(&self, mode: MarginMode, margin: Quote) -> Result<Valuation, PrecisionError> {
        let oracle_mf = margin_fraction(margin, &self.oracle)?;
        let last_mf = margin_fraction(margin, &self.last)?;
        let take_last = match mode {
            MarginMode::MinAllowable => last_mf < oracle_mf,
            MarginMode::Maintenance => last_mf > oracle_mf,
        };
        Ok(if take_last { self.last } else { self.oracle })
    }
}

/// Everything the risk engine needs to know about one trader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraderRisk {
    /// Deposits net of funding owed.
    pub margin: Quote,
    pub reserved: Quote,
    pub valuations: DualValuation,
}

impl TraderRisk {
    pub fn evaluate(
        trader: &Trader,
        markets: &[MarketId],
        oracle_prices: &PriceMap,
        last_prices: &PriceMap,
    ) -> Result<Self, PrecisionError> {
        Ok(Self {
            margin: trader.normalised_margin(markets)?,
            reserved: trader.margin.reserved,
            valuations: DualValuation::of(trader, markets, oracle_prices, last_prices)?,
        })
    }

    pub fn valuation(&self, mode: MarginMode) -> Result<Valuation, PrecisionError> {
        self.valuations.select(mode, self.margin)
    }

    pub fn margin_fraction(&self, mode: MarginMode) -> Result<Decimal, PrecisionError> {
        margin_fraction(self.margin, &self.valuation(mode)?)
    }

    /// `margin + pnl - reserved - notional * ratio` under the min allowable
    /// valuation. Negative means open orders must go.
    pub fn available_margin(&self, min_allowable_margin: Decimal) -> Result<Quote, PrecisionError> {
        let valuation = self.valuation(MarginMode::MinAllowable)?;
        valuation
            .equity(self.margin)?
            .checked_sub(self.reserved)?
            .checked_sub(calculate_required_margin(valuation.notional, min_allowable_margin)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CollateralId, SignedSize};
    use rust_decimal_macros::dec;

    fn prices(market: MarketId, price: Decimal) -> PriceMap {
        PriceMap::from([(market, Price::new_unchecked(price))])
    }

    // short 9 opened at 10, oracle has moved to 11
    fn short_trader() -> Trader {
        let mut trader = Trader::new();
        trader.deposit(CollateralId::HUSD, Quote::new(dec!(40))).unwrap();
        trader
            .positions
            .insert(MarketId(0), Position::with_size(SignedSize::new(dec!(-9)), dec!(90)));
        trader
    }

    #[test]
    fn no_exposure_is_the_sentinel() {
        let mf = margin_fraction(Quote::new(dec!(40)), &Valuation::default());
        assert_eq!(mf, Ok(Decimal::MAX));
    }

    #[test]
    fn min_allowable_takes_the_worse_valuation() {
        let m = MarketId(0);
        let risk = TraderRisk::evaluate(&short_trader(), &[m], &prices(m, dec!(11)), &prices(m, dec!(10))).unwrap();

        let pessimistic = risk.valuation(MarginMode::MinAllowable).unwrap();
        assert_eq!(pessimistic.notional.value(), dec!(99));
        assert_eq!(pessimistic.unrealised_pnl.value(), dec!(-9));

        let forgiving = risk.valuation(MarginMode::Maintenance).unwrap();
        assert_eq!(forgiving.notional.value(), dec!(90));
        assert_eq!(forgiving.unrealised_pnl.value(), dec!(0));
        assert_eq!(risk.margin_fraction(MarginMode::Maintenance), Ok(dec!(40) / dec!(90)));
    }

    #[test]
    fn available_margin_counts_reserved_and_requirement() {
        let m = MarketId(0);
        let mut trader = short_trader();
        // orders at 10, 9, 8 for 3 each, 20% reserved
        trader.reserve(Quote::new(dec!(16.2))).unwrap();
        let risk = TraderRisk::evaluate(&trader, &[m], &prices(m, dec!(11)), &prices(m, dec!(10))).unwrap();
        // 40 - 9 - 16.2 - 99 * 0.2
        assert_eq!(risk.available_margin(dec!(0.2)).unwrap().value(), dec!(-5));
    }

    #[test]
    fn missing_source_falls_back_to_the_other() {
        let m = MarketId(0);
        let valuation = DualValuation::of(&short_trader(), &[m], &PriceMap::new(), &prices(m, dec!(10))).unwrap();
        assert_eq!(valuation.oracle, valuation.last);
        assert_eq!(valuation.oracle.notional.value(), dec!(90));

        let skipped = DualValuation::of(&short_trader(), &[m], &PriceMap::new(), &PriceMap::new()).unwrap();
        assert_eq!(skipped, DualValuation::default());
    }

    #[test]
    fn funding_owed_reduces_margin() {
        let m = MarketId(0);
        let mut trader = short_trader();
        trader.position_entry(m).unrealised_funding = Quote::new(dec!(4));
        let risk = TraderRisk::evaluate(&trader, &[m], &prices(m, dec!(10)), &prices(m, dec!(10))).unwrap();
        assert_eq!(risk.margin.value(), dec!(36));
        assert_eq!(risk.margin_fraction(MarginMode::MinAllowable), Ok(dec!(36) / dec!(90)));
    }

    #[test]
    fn overflow_is_an_error_not_a_sentinel() {
        let m = MarketId(0);
        let mut trader = Trader::new();
        trader
            .positions
            .insert(m, Position::with_size(SignedSize::new(dec!(100000000000000000000)), dec!(1)));
        let err = TraderRisk::evaluate(&trader, &[m], &prices(m, dec!(1000000000)), &PriceMap::new()).unwrap_err();
        assert_eq!(err, PrecisionError::ArithmeticOverflow { operation: "notional" });

        // tiny notional against a huge negative equity
        let valuation = Valuation {
            notional: Quote::new(dec!(0.0000000000000000000000000001)),
            unrealised_pnl: Quote::new(Decimal::MIN / dec!(2)),
        };
        assert!(margin_fraction(Quote::zero(), &valuation).is_err());
    }
}
