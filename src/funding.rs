// 5.0: funding accrual. the exchange publishes a cumulative premium fraction (cpf)
// per market; a position owes (cpf - last settled cpf) * size since it last settled.
// positive = the trader pays.

use crate::position::Position;
use crate::precision::PrecisionError;
use crate::types::{Quote, SignedSize};
use rust_decimal::Decimal;

pub fn calculate_funding_from_cumulative(
    position_size: SignedSize,
    last_premium_fraction: Decimal,
    cumulative_premium_fraction: Decimal,
) -> Result<Quote, PrecisionError> {
    cumulative_premium_fraction
        .checked_sub(last_premium_fraction)
        .and_then(|funding_delta| position_size.value().checked_mul(funding_delta))
        .map(Quote::new)
        .ok_or(PrecisionError::ArithmeticOverflow { operation: "funding" })
}

// 5.1: funding owed once accrued up to `cumulative_premium_fraction`. the
// watermark itself stays put, so repeated accruals against a moving cpf stack
// up until the next settlement. the position is not touched.
pub fn accrued_funding(position: &Position, cumulative_premium_fraction: Decimal) -> Result<Quote, PrecisionError> {
    let accrued = calculate_funding_from_cumulative(
        position.size,
        position.last_premium_fraction,
        cumulative_premium_fraction,
    )?;
    position.unrealised_funding.checked_add(accrued)
}

// 5.2: funding was paid on chain. clear it and move the watermark.
pub fn settle_funding(position: &mut Position, cumulative_premium_fraction: Decimal) {
    position.unrealised_funding = Quote::zero();
    position.last_premium_fraction = cumulative_premium_fraction;
}

pub fn total_pending_funding<'a>(positions: impl IntoIterator<Item = &'a Position>) -> Result<Quote, PrecisionError> {
    Quote::checked_sum(positions.into_iter().map(|p| &p.unrealised_funding))
}
