// 8.0.2: result types and errors for position book operations.

use crate::config::ConfigError;
use crate::position::PositionError;
use crate::trade::TradeError;
use crate::types::Quote;
use crate::valuation::ValuationError;
use rust_decimal::Decimal;

/// Per-symbol result of a batch revaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct RevalueResult {
    pub symbol: String,
    pub result: Result<Option<Quote>, LedgerError>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("Invalid trade: {0}")]
    InvalidTrade(#[from] TradeError),

    #[error("Market price must be positive, got {0}")]
    InvalidMarketPrice(Decimal),

    #[error("Valuing at {0} exceeds the decimal range")]
    ValuationOverflow(Decimal),

    #[error("Symbol {0} has never been traded")]
    SymbolNotFound(String),

    #[error("Invalid position state: {0}")]
    InvalidPosition(#[from] PositionError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl LedgerError {
    pub(crate) fn not_found(symbol: &str) -> Self {
        LedgerError::SymbolNotFound(symbol.to_string())
    }

    pub fn is_recoverable(&self) -> bool {
        // rejected inputs never mutate a ledger
        !matches!(self, LedgerError::Config(_))
    }
}

impl From<ValuationError> for LedgerError {
    fn from(err: ValuationError) -> Self {
        match err {
            ValuationError::InvalidMarketPrice(price) => LedgerError::InvalidMarketPrice(price),
            ValuationError::Overflow(price) => LedgerError::ValuationOverflow(price),
        }
    }
}
