// 3.0: per-symbol position with weighted-average cost basis.
// realized pnl = closed qty * (exit - avg cost), sign flipped for shorts.
// 3.1+ has open/increase/reduce/reverse logic at the bottom. every transition is
// computed on a copy and committed in one assignment, so nobody sees half a trade.

use crate::config::LedgerConfig;
use crate::trade::{Trade, TradeError};
use crate::types::{Price, Quote, Side, SignedSize, Symbol, Timestamp};
use crate::valuation::{calculate_market_value, calculate_unrealized_pnl, ValuationError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    symbol: Symbol,
    quantity: SignedSize,
    avg_cost: Option<Price>,
    realized_pnl: Quote,
    unrealized_pnl: Option<Quote>,
    market_value: Option<Quote>,
    last_price: Option<Price>,
    total_fees: Quote,
    trade_count: u64,
    first_trade_at: Option<Timestamp>,
    last_updated: Option<Timestamp>,
}

impl Position {
    /// A flat position with no history.
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            quantity: SignedSize::zero(),
            avg_cost: None,
            realized_pnl: Quote::zero(),
            unrealized_pnl: None,
            market_value: None,
            last_price: None,
            total_fees: Quote::zero(),
            trade_count: 0,
            first_trade_at: None,
            last_updated: None,
        }
    }

    /// Rehydrate a position from stored fields. Rejects states where avg cost
    /// and quantity disagree about being flat.
    pub fn restore(state: PositionState) -> Result<Self, PositionError> {
        let symbol = Symbol::new(state.symbol).ok_or(PositionError::EmptySymbol)?;
        let quantity = SignedSize::new(state.quantity);

        let avg_cost = match (quantity.is_zero(), state.avg_cost) {
            (true, None) => None,
            (false, Some(cost)) => {
                let cost = Price::new(cost).ok_or(PositionError::NonPositiveAvgCost(cost))?;
                if quantity.abs().checked_mul(cost.value()).is_none() {
                    return Err(PositionError::CostBasisOverflow(symbol));
                }
                Some(cost)
            }
            (true, Some(_)) => return Err(PositionError::AvgCostWhileFlat(symbol)),
            (false, None) => return Err(PositionError::MissingAvgCost(symbol)),
        };

        Ok(Self {
            symbol,
            quantity,
            avg_cost,
            realized_pnl: Quote::new(state.realized_pnl),
            unrealized_pnl: None,
            market_value: None,
            last_price: None,
            total_fees: Quote::new(state.total_fees),
            trade_count: state.trade_count,
            first_trade_at: state.first_trade_at,
            last_updated: state.last_updated,
        })
    }

    /// Persistable fields. Valuation is derived and left out.
    pub fn state(&self) -> PositionState {
        PositionState {
            symbol: self.symbol.to_string(),
            quantity: self.quantity.value(),
            avg_cost: self.avg_cost.map(|p| p.value()),
            realized_pnl: self.realized_pnl.value(),
            total_fees: self.total_fees.value(),
            trade_count: self.trade_count,
            first_trade_at: self.first_trade_at,
            last_updated: self.last_updated,
        }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn quantity(&self) -> SignedSize {
        self.quantity
    }

    pub fn avg_cost(&self) -> Option<Price> {
        self.avg_cost
    }

    pub fn realized_pnl(&self) -> Quote {
        self.realized_pnl
    }

    pub fn unrealized_pnl(&self) -> Option<Quote> {
        self.unrealized_pnl
    }

    pub fn market_value(&self) -> Option<Quote> {
        self.market_value
    }

    pub fn last_price(&self) -> Option<Price> {
        self.last_price
    }

    pub fn total_fees(&self) -> Quote {
        self.total_fees
    }

    pub fn trade_count(&self) -> u64 {
        self.trade_count
    }

    pub fn first_trade_at(&self) -> Option<Timestamp> {
        self.first_trade_at
    }

    pub fn last_updated(&self) -> Option<Timestamp> {
        self.last_updated
    }

    pub fn is_flat(&self) -> bool {
        self.quantity.is_zero()
    }

    pub fn side(&self) -> Option<Side> {
        self.quantity.side()
    }

    // 3.1: realized + unrealized. never stored, always derived.
    // trades and marks are refused when this would leave the decimal range,
    // so the saturating add never clamps a committed position.
    pub fn total_pnl(&self) -> Quote {
        self.realized_pnl
            .saturating_add(self.unrealized_pnl.unwrap_or_else(Quote::zero))
    }

    /// |quantity| * avg cost. None while flat.
    pub fn cost_basis(&self) -> Option<Quote> {
        self.avg_cost
            .map(|cost| Quote::new(self.quantity.abs().saturating_mul(cost.value())))
    }

    /// Apply one validated trade. Either the whole transition commits or the
    /// position is left untouched.
    pub fn apply_trade(
        &mut self,
        trade: &Trade,
        config: &LedgerConfig,
    ) -> Result<TradeOutcome, TradeError> {
        if trade.symbol() != &self.symbol {
            return Err(TradeError::SymbolMismatch {
                expected: self.symbol.clone(),
                got: trade.symbol().clone(),
            });
        }

        let (next, outcome) = transition(self, trade, config)
            .ok_or_else(|| TradeError::Overflow(self.symbol.clone()))?;
        *self = next;
        Ok(outcome)
    }

    // 3.2: valuation fields only. quantity, avg cost and realized pnl stay put.
    // on overflow nothing is written.
    pub(crate) fn mark(&mut self, price: Price) -> Result<(), ValuationError> {
        let overflow = || ValuationError::Overflow(price.value());

        let (market_value, unrealized_pnl) = match self.avg_cost {
            Some(avg_cost) if !self.quantity.is_zero() => {
                let market_value =
                    calculate_market_value(self.quantity, price).ok_or_else(overflow)?;
                let unrealized_pnl = calculate_unrealized_pnl(self.quantity, avg_cost, price)
                    .ok_or_else(overflow)?;
                self.realized_pnl
                    .checked_add(unrealized_pnl)
                    .ok_or_else(overflow)?;
                (Some(market_value), Some(unrealized_pnl))
            }
            _ => (None, None),
        };

        self.last_price = Some(price);
        self.market_value = market_value;
        self.unrealized_pnl = unrealized_pnl;
        Ok(())
    }

    /// Explicit reinitialization. The only path that clears realized pnl.
    pub fn reset(&mut self, timestamp: Timestamp) {
        let symbol = self.symbol.clone();
        *self = Self::new(symbol);
        self.last_updated = Some(timestamp);
    }
}

/// Stored form of a position, for persistence collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionState {
    pub symbol: String,
    pub quantity: Decimal,
    pub avg_cost: Option<Decimal>,
    pub realized_pnl: Decimal,
    #[serde(default)]
    pub total_fees: Decimal,
    #[serde(default)]
    pub trade_count: u64,
    #[serde(default)]
    pub first_trade_at: Option<Timestamp>,
    #[serde(default)]
    pub last_updated: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PositionError {
    #[error("Position symbol is empty")]
    EmptySymbol,

    #[error("Position {0} is open but has no average cost")]
    MissingAvgCost(Symbol),

    #[error("Position {0} is flat but carries an average cost")]
    AvgCostWhileFlat(Symbol),

    #[error("Average cost must be positive, got {0}")]
    NonPositiveAvgCost(Decimal),

    #[error("Position {0} cost basis exceeds the decimal range")]
    CostBasisOverflow(Symbol),
}

/// Which transition a trade caused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionKind {
    /// Flat -> open.
    Opened,
    /// Same direction add. Avg cost re-weighted.
    Increased,
    /// Partial close. Avg cost unchanged.
    Reduced,
    /// Closed to flat.
    Closed,
    /// Closed the old side and opened the other at the trade price.
    Reversed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeOutcome {
    pub kind: TransitionKind,
    /// Realized pnl from this trade alone, net of fees when fees are tracked.
    pub realized_delta: Quote,
    pub fee: Quote,
    pub closed_quantity: Decimal,
    pub previous_quantity: SignedSize,
    pub quantity: SignedSize,
    pub previous_avg_cost: Option<Price>,
    pub avg_cost: Option<Price>,
}

// 3.3: realized pnl formula. close_size carries the direction of the position being closed.
// None when the result leaves the decimal range.
pub fn calculate_realized_pnl(
    close_size: SignedSize,
    entry_price: Price,
    exit_price: Price,
) -> Option<Quote> {
    let price_move = exit_price.value().checked_sub(entry_price.value())?;
    close_size.value().checked_mul(price_move).map(Quote::new)
}

// 3.4: quantity-weighted mean of old cost and fill price
pub fn weighted_avg_cost(
    size: SignedSize,
    avg_cost: Price,
    add_size: SignedSize,
    fill_price: Price,
) -> Option<Price> {
    let total = size.abs().checked_add(add_size.abs())?;
    let held = size.abs().checked_mul(avg_cost.value())?;
    let added = add_size.abs().checked_mul(fill_price.value())?;
    let weighted_sum = held.checked_add(added)?;
    weighted_sum.checked_div(total).and_then(Price::new)
}

// None means some figure left the decimal range. the caller keeps the old position.
fn transition(
    position: &Position,
    trade: &Trade,
    config: &LedgerConfig,
) -> Option<(Position, TradeOutcome)> {
    let fee = if config.track_fees {
        trade.fee()
    } else {
        Quote::zero()
    };

    let (mut next, kind, gross, closed_quantity) = match position.avg_cost {
        Some(avg_cost) if !position.quantity.is_zero() => {
            if position.quantity.same_direction(trade.quantity()) {
                let next = increase_position(position, trade, avg_cost)?;
                (next, TransitionKind::Increased, Quote::zero(), Decimal::ZERO)
            } else {
                reduce_or_reverse(position, trade, avg_cost, config.flat_epsilon)?
            }
        }
        _ => {
            let next = open_position(position, trade);
            (next, TransitionKind::Opened, Quote::zero(), Decimal::ZERO)
        }
    };

    let realized_delta = gross.checked_sub(fee)?;
    next.realized_pnl = next.realized_pnl.checked_add(realized_delta)?;
    next.total_fees = next.total_fees.checked_add(fee)?;
    next.trade_count += 1;
    if next.first_trade_at.is_none() {
        next.first_trade_at = Some(trade.timestamp());
    }
    next.last_updated = Some(trade.timestamp());

    // cost basis has to stay representable for snapshots
    if let Some(cost) = next.avg_cost {
        next.quantity.abs().checked_mul(cost.value())?;
    }

    // keep market value in step with the new quantity at the last valued price
    match next.last_price {
        Some(price) => next.mark(price).ok()?,
        None => {
            next.market_value = None;
            next.unrealized_pnl = None;
        }
    }

    let outcome = TradeOutcome {
        kind,
        realized_delta,
        fee,
        closed_quantity,
        previous_quantity: position.quantity,
        quantity: next.quantity,
        previous_avg_cost: position.avg_cost,
        avg_cost: next.avg_cost,
    };

    Some((next, outcome))
}

// 3.5: first trade on a flat position
fn open_position(position: &Position, trade: &Trade) -> Position {
    let mut next = position.clone();
    next.quantity = trade.quantity();
    next.avg_cost = Some(trade.price());
    next
}

// 3.6: adds to existing position. averages the cost
fn increase_position(position: &Position, trade: &Trade, avg_cost: Price) -> Option<Position> {
    debug_assert!(position.quantity.same_direction(trade.quantity()));

    let mut next = position.clone();
    next.avg_cost = Some(weighted_avg_cost(
        position.quantity,
        avg_cost,
        trade.quantity(),
        trade.price(),
    )?);
    next.quantity = position.quantity.checked_add(trade.quantity().value())?;
    Some(next)
}

// 3.7: opposite direction. partial close, full close, or close-then-open.
// dust within epsilon of zero snaps to flat.
fn reduce_or_reverse(
    position: &Position,
    trade: &Trade,
    avg_cost: Price,
    epsilon: Decimal,
) -> Option<(Position, TransitionKind, Quote, Decimal)> {
    let position_abs = position.quantity.abs();
    let trade_abs = trade.quantity().abs();
    let close_qty = trade_abs.min(position_abs);

    // trade opposes the held side here
    let close_size = SignedSize::from_side(trade.side().opposite(), close_qty);
    let gross = calculate_realized_pnl(close_size, avg_cost, trade.price())?;

    let mut next = position.clone();
    let excess = trade_abs - position_abs;

    if excess > epsilon {
        // whole old position closed at avg cost, excess opens at the trade price
        next.quantity = SignedSize::from_side(trade.side(), excess);
        next.avg_cost = Some(trade.price());
        return Some((next, TransitionKind::Reversed, gross, close_qty));
    }

    let remaining = position.quantity.checked_add(trade.quantity().value())?;
    if remaining.abs() <= epsilon {
        next.quantity = SignedSize::zero();
        next.avg_cost = None;
        Some((next, TransitionKind::Closed, gross, close_qty))
    } else {
        // remaining quantity keeps the original cost basis
        next.quantity = remaining;
        Some((next, TransitionKind::Reduced, gross, close_qty))
    }
}
