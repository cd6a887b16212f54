// 4.0: mark to market. unrealized pnl = size * (mark - avg cost).
// for a short the negative size flips the sign, which is cost basis - market value.
// never touches quantity, avg cost or realized pnl.

use crate::position::Position;
use crate::types::{Price, Quote, SignedSize};
use rust_decimal::Decimal;

// 4.1: the pnl formula. size * (mark - avg cost). None outside the decimal range.
pub fn calculate_unrealized_pnl(
    size: SignedSize,
    avg_cost: Price,
    mark_price: Price,
) -> Option<Quote> {
    let price_move = mark_price.value().checked_sub(avg_cost.value())?;
    size.value().checked_mul(price_move).map(Quote::new)
}

// 4.2: |size| * mark. always non-negative, direction lives in the pnl.
pub fn calculate_market_value(size: SignedSize, mark_price: Price) -> Option<Quote> {
    size.abs().checked_mul(mark_price.value()).map(Quote::new)
}

/// Pure revaluation: returns a copy of `position` marked at `market_price`.
pub fn revalue(position: &Position, market_price: Decimal) -> Result<Position, ValuationError> {
    let price = Price::new(market_price).ok_or(ValuationError::InvalidMarketPrice(market_price))?;
    let mut next = position.clone();
    next.mark(price)?;
    Ok(next)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValuationError {
    #[error("Market price must be positive, got {0}")]
    InvalidMarketPrice(Decimal),

    #[error("Valuing at {0} exceeds the decimal range")]
    Overflow(Decimal),
}
