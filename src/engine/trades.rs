//! Trade application.

use super::core::PositionBook;
use super::results::LedgerError;
use crate::events::{EventPayload, TradeRejectedEvent};
use crate::position::{Position, TradeOutcome, TransitionKind};
use crate::trade::{Trade, TradeError, TradeRecord};
use crate::types::{Quote, Symbol};
use tracing::{debug, info, warn};

impl PositionBook {
    /// Apply one execution to `symbol`'s ledger and return the realized pnl
    /// it produced. Invalid trades are rejected before any ledger is touched.
    pub fn apply_trade(&self, symbol: &str, record: &TradeRecord) -> Result<Quote, LedgerError> {
        self.apply_trade_detailed(symbol, record)
            .map(|outcome| outcome.realized_delta)
    }

    /// Route by the record's own symbol.
    pub fn submit(&self, record: &TradeRecord) -> Result<Quote, LedgerError> {
        self.apply_trade(&record.symbol, record)
    }

    pub fn apply_trade_detailed(
        &self,
        symbol: &str,
        record: &TradeRecord,
    ) -> Result<TradeOutcome, LedgerError> {
        let trade = self
            .validate_for(symbol, record)
            .map_err(|err| self.reject(symbol, record, err))?;

        // a first trade that cannot be booked must not leave a ledger behind
        if !self.contains(trade.symbol().as_str()) {
            Position::new(trade.symbol().clone())
                .apply_trade(&trade, &self.config.ledger)
                .map_err(|err| self.reject(symbol, record, err))?;
        }

        let ledger = self.ledger_or_insert(trade.symbol());
        let mut position = ledger.lock();
        let outcome = position
            .apply_trade(&trade, &self.config.ledger)
            .map_err(|err| self.reject(symbol, record, err))?;

        match outcome.kind {
            TransitionKind::Closed | TransitionKind::Reversed => info!(
                symbol = %trade.symbol(),
                kind = ?outcome.kind,
                closed = %outcome.closed_quantity,
                quantity = %outcome.quantity,
                realized_delta = %outcome.realized_delta,
                "position closed out"
            ),
            _ => debug!(
                symbol = %trade.symbol(),
                kind = ?outcome.kind,
                quantity = %outcome.quantity,
                price = %trade.price(),
                realized_delta = %outcome.realized_delta,
                "trade applied"
            ),
        }

        self.emit_event(
            trade.timestamp(),
            EventPayload::from_outcome(trade.symbol(), trade.price(), &outcome),
        );

        Ok(outcome)
    }

    fn reject(&self, symbol: &str, record: &TradeRecord, err: TradeError) -> LedgerError {
        warn!(
            symbol,
            quantity = %record.quantity,
            price = %record.price,
            error = %err,
            "trade rejected"
        );
        self.emit_event(
            record.timestamp,
            EventPayload::TradeRejected(TradeRejectedEvent {
                symbol: record.symbol.clone(),
                quantity: record.quantity,
                price: record.price,
                reason: err.to_string(),
            }),
        );
        LedgerError::InvalidTrade(err)
    }

    fn validate_for(
        &self,
        symbol: &str,
        record: &TradeRecord,
    ) -> Result<Trade, TradeError> {
        let expected = Symbol::new(symbol).ok_or(TradeError::EmptySymbol)?;
        let trade = record.validate()?;
        if trade.symbol() != &expected {
            return Err(TradeError::SymbolMismatch {
                expected,
                got: trade.symbol().clone(),
            });
        }
        Ok(trade)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Timestamp;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn record(symbol: &str, quantity: Decimal, price: Decimal) -> TradeRecord {
        TradeRecord::new(symbol, quantity, price, Timestamp::from_millis(1))
    }

    #[test]
    fn first_trade_creates_position() {
        let book = PositionBook::default();
        let delta = book
            .apply_trade("BTC-USD", &record("BTC-USD", dec!(1), dec!(50000)))
            .unwrap();

        assert_eq!(delta.value(), dec!(0));
        assert!(book.contains("BTC-USD"));
        assert!(matches!(
            book.events()[0].payload,
            EventPayload::PositionOpened(_)
        ));
    }

    #[test]
    fn rejected_trade_creates_nothing() {
        let book = PositionBook::default();
        let err = book
            .apply_trade("BTC-USD", &record("BTC-USD", dec!(0), dec!(50000)))
            .unwrap_err();

        assert_eq!(err, LedgerError::InvalidTrade(TradeError::ZeroQuantity));
        assert!(!book.contains("BTC-USD"));
        assert!(matches!(
            book.events()[0].payload,
            EventPayload::TradeRejected(_)
        ));
    }

    #[test]
    fn overflowing_trade_is_rejected() {
        let book = PositionBook::default();
        let size = Decimal::from(10i64.pow(15));
        book.submit(&record("BTC-USD", size, Decimal::from(10i64.pow(13))))
            .unwrap();
        let before = book.position("BTC-USD").unwrap();

        let err = book
            .submit(&record("BTC-USD", size, Decimal::from(10i64.pow(14))))
            .unwrap_err();

        let btc = Symbol::new("BTC-USD").unwrap();
        assert_eq!(err, LedgerError::InvalidTrade(TradeError::Overflow(btc)));
        assert_eq!(book.position("BTC-USD").unwrap(), before);
        assert!(matches!(
            book.events().last().unwrap().payload,
            EventPayload::TradeRejected(_)
        ));
    }

    #[test]
    fn overflowing_first_trade_creates_nothing() {
        let book = PositionBook::default();
        let err = book
            .submit(&record("BTC-USD", Decimal::MAX, dec!(2)))
            .unwrap_err();

        assert!(matches!(
            err,
            LedgerError::InvalidTrade(TradeError::Overflow(_))
        ));
        assert!(!book.contains("BTC-USD"));
    }

    #[test]
    fn symbol_routing_mismatch() {
        let book = PositionBook::default();
        let err = book
            .apply_trade("ETH-USD", &record("BTC-USD", dec!(1), dec!(50000)))
            .unwrap_err();

        assert!(matches!(
            err,
            LedgerError::InvalidTrade(TradeError::SymbolMismatch { .. })
        ));
        assert!(book.symbols().is_empty());
    }

    #[test]
    fn submit_routes_by_record() {
        let book = PositionBook::default();
        book.submit(&record("ETH-USD", dec!(-2), dec!(3000))).unwrap();
        let delta = book.submit(&record("ETH-USD", dec!(1), dec!(2900))).unwrap();

        assert_eq!(delta.value(), dec!(100));
        let outcome = book
            .apply_trade_detailed("ETH-USD", &record("ETH-USD", dec!(2), dec!(2800)))
            .unwrap();
        assert_eq!(outcome.kind, TransitionKind::Reversed);
        assert_eq!(outcome.realized_delta.value(), dec!(200));
        assert_eq!(book.snapshot("ETH-USD").unwrap().quantity, dec!(1));
    }
}
