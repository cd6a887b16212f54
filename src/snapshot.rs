// 5.0: read-only views handed to api/reporting collaborators.
// decimals serialize as strings so no precision is lost. absent values are null, never zero.
// timestamps are RFC 3339 strings in UTC.

use crate::position::Position;
use crate::types::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionView {
    pub symbol: String,
    pub side: Option<Side>,
    pub quantity: Decimal,
    pub avg_cost: Option<Decimal>,
    pub cost_basis: Option<Decimal>,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Option<Decimal>,
    pub total_pnl: Decimal,
    pub market_value: Option<Decimal>,
    pub last_price: Option<Decimal>,
    pub total_fees: Decimal,
    pub trade_count: u64,
    pub first_trade_at: Option<String>,
    pub last_updated: Option<String>,
}

impl PositionView {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<&Position> for PositionView {
    fn from(position: &Position) -> Self {
        Self {
            symbol: position.symbol().to_string(),
            side: position.side(),
            quantity: position.quantity().value(),
            avg_cost: position.avg_cost().map(|p| p.value()),
            cost_basis: position.cost_basis().map(|q| q.value()),
            realized_pnl: position.realized_pnl().value(),
            unrealized_pnl: position.unrealized_pnl().map(|q| q.value()),
            total_pnl: position.total_pnl().value(),
            market_value: position.market_value().map(|q| q.value()),
            last_price: position.last_price().map(|p| p.value()),
            total_fees: position.total_fees().value(),
            trade_count: position.trade_count(),
            first_trade_at: position.first_trade_at().map(|t| t.to_rfc3339()),
            last_updated: position.last_updated().map(|t| t.to_rfc3339()),
        }
    }
}

// 5.1: book-wide totals. unvalued positions contribute nothing unrealized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioView {
    pub positions: Vec<PositionView>,
    pub open_positions: usize,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,
    pub total_pnl: Decimal,
    pub gross_market_value: Decimal,
    pub total_fees: Decimal,
}

impl PortfolioView {
    /// Aggregate views. Positions are listed in symbol order.
    pub fn from_views(mut positions: Vec<PositionView>) -> Self {
        positions.sort_by(|a, b| a.symbol.cmp(&b.symbol));

        let open_positions = positions.iter().filter(|p| !p.quantity.is_zero()).count();
        let realized_pnl = saturating_sum(positions.iter().map(|p| p.realized_pnl));
        let unrealized_pnl = saturating_sum(positions.iter().filter_map(|p| p.unrealized_pnl));
        let gross_market_value = saturating_sum(positions.iter().filter_map(|p| p.market_value));
        let total_fees = saturating_sum(positions.iter().map(|p| p.total_fees));

        Self {
            positions,
            open_positions,
            realized_pnl,
            unrealized_pnl,
            total_pnl: realized_pnl.saturating_add(unrealized_pnl),
            gross_market_value,
            total_fees,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// each position fits the decimal range on its own, their sum may not
fn saturating_sum(values: impl Iterator<Item = Decimal>) -> Decimal {
    values.fold(Decimal::ZERO, |acc, v| acc.saturating_add(v))
}
