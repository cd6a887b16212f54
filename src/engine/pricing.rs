//! Market price updates.

use super::core::PositionBook;
use super::results::{LedgerError, RevalueResult};
use crate::events::{EventPayload, PositionRevaluedEvent};
use crate::types::{Price, Quote, Timestamp};
use rust_decimal::Decimal;
use tracing::{debug, warn};

impl PositionBook {
    /// Mark `symbol` at `market_price`. Quantity, avg cost and realized pnl are
    /// never touched.
    pub fn revalue(&self, symbol: &str, market_price: Decimal) -> Result<(), LedgerError> {
        self.revalue_at(symbol, market_price, Timestamp::now())
            .map(|_| ())
    }

    /// Same as [`revalue`](Self::revalue) with an explicit tick time. Returns the
    /// new unrealized pnl, None while flat.
    pub fn revalue_at(
        &self,
        symbol: &str,
        market_price: Decimal,
        timestamp: Timestamp,
    ) -> Result<Option<Quote>, LedgerError> {
        let Some(price) = Price::new(market_price) else {
            warn!(symbol, price = %market_price, "market price rejected");
            return Err(LedgerError::InvalidMarketPrice(market_price));
        };

        let ledger = self
            .ledger(symbol)
            .ok_or_else(|| LedgerError::not_found(symbol))?;
        let mut position = ledger.lock();
        if let Err(err) = position.mark(price) {
            warn!(symbol, price = %price, error = %err, "revaluation rejected");
            return Err(err.into());
        }

        debug!(
            symbol,
            price = %price,
            market_value = ?position.market_value().map(|q| q.value()),
            unrealized_pnl = ?position.unrealized_pnl().map(|q| q.value()),
            "position revalued"
        );

        self.emit_event(
            timestamp,
            EventPayload::PositionRevalued(PositionRevaluedEvent {
                symbol: position.symbol().clone(),
                market_price: price,
                market_value: position.market_value(),
                unrealized_pnl: position.unrealized_pnl(),
            }),
        );

        Ok(position.unrealized_pnl())
    }

    /// Apply a batch of price ticks. Each tick succeeds or fails on its own.
    pub fn revalue_all<'a, I>(&self, prices: I) -> Vec<RevalueResult>
    where
        I: IntoIterator<Item = (&'a str, Decimal)>,
    {
        let timestamp = Timestamp::now();
        prices
            .into_iter()
            .map(|(symbol, price)| RevalueResult {
                symbol: symbol.to_string(),
                result: self.revalue_at(symbol, price, timestamp),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trade::TradeRecord;
    use rust_decimal_macros::dec;

    fn book_with(symbol: &str, quantity: Decimal, price: Decimal) -> PositionBook {
        let book = PositionBook::default();
        book.submit(&TradeRecord::new(symbol, quantity, price, Timestamp::from_millis(0)))
            .unwrap();
        book
    }

    #[test]
    fn revalue_sets_market_fields() {
        let book = book_with("BTC-USD", dec!(2), dec!(50000));
        let unrealized = book
            .revalue_at("BTC-USD", dec!(52000), Timestamp::from_millis(5))
            .unwrap();

        assert_eq!(unrealized.unwrap().value(), dec!(4000));
        let view = book.snapshot("BTC-USD").unwrap();
        assert_eq!(view.market_value, Some(dec!(104000)));
        assert_eq!(view.total_pnl, dec!(4000));
    }

    #[test]
    fn invalid_price_leaves_state() {
        let book = book_with("BTC-USD", dec!(1), dec!(50000));
        book.revalue("BTC-USD", dec!(51000)).unwrap();
        let before = book.position("BTC-USD").unwrap();

        assert_eq!(
            book.revalue("BTC-USD", dec!(-1)),
            Err(LedgerError::InvalidMarketPrice(dec!(-1)))
        );
        assert_eq!(book.position("BTC-USD").unwrap(), before);
    }

    #[test]
    fn overflowing_price_leaves_state() {
        let book = book_with("BTC-USD", Decimal::from(10i64.pow(15)), dec!(1));
        book.revalue("BTC-USD", dec!(2)).unwrap();
        let before = book.position("BTC-USD").unwrap();

        let price = Decimal::from(10i64.pow(14));
        let err = book.revalue("BTC-USD", price).unwrap_err();
        assert_eq!(err, LedgerError::ValuationOverflow(price));
        assert!(err.is_recoverable());
        assert_eq!(book.position("BTC-USD").unwrap(), before);
    }

    #[test]
    fn unknown_symbol() {
        let book = PositionBook::default();
        assert_eq!(
            book.revalue("DOGE-USD", dec!(0.1)),
            Err(LedgerError::SymbolNotFound("DOGE-USD".into()))
        );
    }

    #[test]
    fn batch_reports_per_symbol() {
        let book = book_with("BTC-USD", dec!(1), dec!(50000));
        let results = book.revalue_all([("BTC-USD", dec!(49000)), ("ETH-USD", dec!(3000))]);

        assert_eq!(results.len(), 2);
        assert_eq!(
            results[0].result,
            Ok(Some(Quote::new(dec!(-1000))))
        );
        assert!(matches!(
            results[1].result,
            Err(LedgerError::SymbolNotFound(_))
        ));
    }
}
