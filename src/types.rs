// 1.0: all the primitives live here. nothing in the ledger works without these types.
// symbols, prices, sizes, money, timestamps. each is a newtype so the compiler catches mixups.
// every amount is a rust_decimal::Decimal. no binary floats anywhere in the accounting path.

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::iter::Sum;

// 1.1: tradable instrument identifier. never empty, deserialization included.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    #[must_use]
    pub fn new(symbol: impl Into<String>) -> Option<Self> {
        let symbol = symbol.into();
        if symbol.trim().is_empty() {
            None
        } else {
            Some(Self(symbol))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Symbol must not be blank")]
pub struct BlankSymbol;

impl TryFrom<String> for Symbol {
    type Error = BlankSymbol;

    fn try_from(symbol: String) -> Result<Self, Self::Error> {
        Self::new(symbol).ok_or(BlankSymbol)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Long = profit when price goes up. Short = profit when price goes down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn sign(&self) -> Decimal {
        match self {
            Side::Long => dec!(1),
            Side::Short => dec!(-1),
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }
}

// 1.2: signed size: positive = long, negative = short. core to all position math.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignedSize(Decimal);

impl SignedSize {
    pub fn new(size: Decimal) -> Self {
        Self(size)
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn from_side(side: Side, abs_size: Decimal) -> Self {
        Self(side.sign() * abs_size.abs())
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn abs(&self) -> Decimal {
        self.0.abs()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_long(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_short(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn side(&self) -> Option<Side> {
        if self.is_long() {
            Some(Side::Long)
        } else if self.is_short() {
            Some(Side::Short)
        } else {
            None
        }
    }

    pub fn checked_add(&self, delta: Decimal) -> Option<Self> {
        self.0.checked_add(delta).map(Self)
    }

    // true when both sizes are non-zero and point the same way
    pub fn same_direction(&self, other: SignedSize) -> bool {
        matches!((self.side(), other.side()), (Some(a), Some(b)) if a == b)
    }
}

impl fmt::Display for SignedSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.3: price in quote currency per unit of base. must be positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    #[must_use]
    pub fn new(value: Decimal) -> Option<Self> {
        if value > Decimal::ZERO {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn new_unchecked(value: Decimal) -> Self {
        debug_assert!(value > Decimal::ZERO);
        Self(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.4: quote currency amount. pnl, fees, market value all use this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quote(Decimal);

impl Quote {
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(&self, other: Quote) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(&self, other: Quote) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    // reporting totals clamp at the decimal bounds
    pub fn saturating_add(&self, other: Quote) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialOrd for Quote {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Quote {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl Sum for Quote {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, q| acc.saturating_add(q))
    }
}

impl<'a> Sum<&'a Quote> for Quote {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, q| acc.saturating_add(*q))
    }
}

// 1.5: millisecond timestamp. audit/ordering only, never used in pnl math.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }

    // ISO 8601 / RFC 3339 in UTC. falls back to raw millis if out of chrono's range.
    pub fn to_rfc3339(&self) -> String {
        match DateTime::<Utc>::from_timestamp_millis(self.0) {
            Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
            None => self.0.to_string(),
        }
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp_millis())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn signed_size_operations() {
        let long = SignedSize::from_side(Side::Long, dec!(10));
        assert!(long.is_long());
        assert_eq!(long.abs(), dec!(10));

        let short = SignedSize::from_side(Side::Short, dec!(10));
        assert!(short.is_short());
        assert_eq!(short.abs(), dec!(10));
        assert_eq!(short.value(), dec!(-10));

        assert!(long.same_direction(SignedSize::new(dec!(0.5))));
        assert!(!long.same_direction(short));
        assert!(!SignedSize::zero().same_direction(long));
    }

    #[test]
    fn price_must_be_positive() {
        assert!(Price::new(dec!(0)).is_none());
        assert!(Price::new(dec!(-1)).is_none());
        assert_eq!(Price::new(dec!(0.01)).unwrap().value(), dec!(0.01));
    }

    #[test]
    fn symbol_rejects_blank() {
        assert!(Symbol::new("").is_none());
        assert!(Symbol::new("   ").is_none());
        assert_eq!(Symbol::new("BTC-USD").unwrap().as_str(), "BTC-USD");
    }

    #[test]
    fn symbol_deserialize_goes_through_new() {
        let symbol: Symbol = serde_json::from_str("\"ETH-USD\"").unwrap();
        assert_eq!(symbol.as_str(), "ETH-USD");
        assert_eq!(serde_json::to_string(&symbol).unwrap(), "\"ETH-USD\"");

        assert!(serde_json::from_str::<Symbol>("\"\"").is_err());
        assert!(serde_json::from_str::<Symbol>("\"  \"").is_err());
    }

    #[test]
    fn quote_arithmetic_is_exact() {
        // 0.1 + 0.2 drifts in binary floating point, not here
        let sum = Quote::new(dec!(0.1)).checked_add(Quote::new(dec!(0.2))).unwrap();
        assert_eq!(sum.value(), dec!(0.3));

        assert!(Quote::new(Decimal::MAX).checked_add(Quote::new(dec!(1))).is_none());
        assert!(Quote::new(Decimal::MIN).checked_sub(Quote::new(dec!(1))).is_none());

        let total: Quote = [dec!(1.5), dec!(-0.5), dec!(2)]
            .into_iter()
            .map(Quote::new)
            .sum();
        assert_eq!(total.value(), dec!(3));
    }

    #[test]
    fn timestamp_iso8601() {
        let ts = Timestamp::from_millis(1_700_000_000_123);
        assert_eq!(ts.to_rfc3339(), "2023-11-14T22:13:20.123Z");
    }
}
