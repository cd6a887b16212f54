// 2.0: trade records. one execution = symbol, signed quantity, price, optional fee, timestamp.
// TradeRecord is what collaborators hand us. Trade is what survives validation (2.1).
// the ledger only accepts Trade, so an invalid execution can never reach a mutation.

use crate::types::{Price, Quote, Side, SignedSize, Symbol, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Raw execution as received from the trade source. Nothing here is trusted yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub symbol: String,
    /// Positive = buy, negative = sell.
    pub quantity: Decimal,
    pub price: Decimal,
    #[serde(default)]
    pub fee: Option<Decimal>,
    pub timestamp: Timestamp,
}

impl TradeRecord {
    pub fn new(
        symbol: impl Into<String>,
        quantity: Decimal,
        price: Decimal,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            quantity,
            price,
            fee: None,
            timestamp,
        }
    }

    pub fn with_fee(mut self, fee: Decimal) -> Self {
        self.fee = Some(fee);
        self
    }

    // 2.1: the gatekeeper. checks run in field order so the first problem is reported.
    pub fn validate(&self) -> Result<Trade, TradeError> {
        let symbol = Symbol::new(self.symbol.as_str()).ok_or(TradeError::EmptySymbol)?;

        if self.quantity.is_zero() {
            return Err(TradeError::ZeroQuantity);
        }

        let price = Price::new(self.price).ok_or(TradeError::NonPositivePrice(self.price))?;

        let fee = self.fee.unwrap_or(Decimal::ZERO);
        if fee < Decimal::ZERO {
            return Err(TradeError::NegativeFee(fee));
        }

        Ok(Trade {
            symbol,
            quantity: SignedSize::new(self.quantity),
            price,
            fee: Quote::new(fee),
            timestamp: self.timestamp,
        })
    }
}

/// A validated execution. Only constructible through [`TradeRecord::validate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    symbol: Symbol,
    quantity: SignedSize,
    price: Price,
    fee: Quote,
    timestamp: Timestamp,
}

impl Trade {
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn quantity(&self) -> SignedSize {
        self.quantity
    }

    pub fn price(&self) -> Price {
        self.price
    }

    pub fn fee(&self) -> Quote {
        self.fee
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn side(&self) -> Side {
        // quantity is never zero after validation
        if self.quantity.is_long() {
            Side::Long
        } else {
            Side::Short
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TradeError {
    #[error("Trade symbol is empty")]
    EmptySymbol,

    #[error("Trade quantity must be non-zero")]
    ZeroQuantity,

    #[error("Trade price must be positive, got {0}")]
    NonPositivePrice(Decimal),

    #[error("Trade fee must be non-negative, got {0}")]
    NegativeFee(Decimal),

    #[error("Trade for {got} routed to ledger for {expected}")]
    SymbolMismatch { expected: Symbol, got: Symbol },

    #[error("Trade on {0} takes the position outside the decimal range")]
    Overflow(Symbol),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record(quantity: Decimal, price: Decimal) -> TradeRecord {
        TradeRecord::new("BTC-USD", quantity, price, Timestamp::from_millis(0))
    }

    #[test]
    fn valid_buy() {
        let trade = record(dec!(1.5), dec!(50000)).validate().unwrap();
        assert_eq!(trade.symbol().as_str(), "BTC-USD");
        assert_eq!(trade.side(), Side::Long);
        assert_eq!(trade.fee().value(), dec!(0)); // fee defaults to zero
    }

    #[test]
    fn valid_sell_with_fee() {
        let trade = record(dec!(-2), dec!(100)).with_fee(dec!(0.4)).validate().unwrap();
        assert_eq!(trade.side(), Side::Short);
        assert_eq!(trade.quantity().value(), dec!(-2));
        assert_eq!(trade.fee().value(), dec!(0.4));
    }

    #[test]
    fn rejects_zero_quantity() {
        assert_eq!(
            record(dec!(0), dec!(100)).validate(),
            Err(TradeError::ZeroQuantity)
        );
    }

    #[test]
    fn rejects_non_positive_price() {
        assert_eq!(
            record(dec!(1), dec!(0)).validate(),
            Err(TradeError::NonPositivePrice(dec!(0)))
        );
        assert_eq!(
            record(dec!(1), dec!(-5)).validate(),
            Err(TradeError::NonPositivePrice(dec!(-5)))
        );
    }

    #[test]
    fn rejects_negative_fee() {
        assert_eq!(
            record(dec!(1), dec!(10)).with_fee(dec!(-0.01)).validate(),
            Err(TradeError::NegativeFee(dec!(-0.01)))
        );
    }

    #[test]
    fn rejects_empty_symbol() {
        let trade = TradeRecord::new("", dec!(1), dec!(10), Timestamp::from_millis(0));
        assert_eq!(trade.validate(), Err(TradeError::EmptySymbol));
    }

    #[test]
    fn deserializes_without_fee() {
        let json = r#"{"symbol":"ETH-USD","quantity":"-0.5","price":"3000","timestamp":0}"#;
        let record: TradeRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.fee, None);
        assert_eq!(record.validate().unwrap().quantity().value(), dec!(-0.5));
    }
}
