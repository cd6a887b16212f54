// 7.0 config.rs: accounting settings. passed in explicitly, never global.
// 7.1 presets: default (fees net, tiny epsilon), strict (exact flattening), gross (fees ignored).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// Accounting rules shared by every position in a book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    // |quantity| at or below this after a close is treated as flat
    pub flat_epsilon: Decimal,
    // Subtract trade fees from realized pnl as they are paid
    pub track_fees: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            flat_epsilon: Decimal::new(1, 12), // 1e-12
            track_fees: true,
        }
    }
}

impl LedgerConfig {
    /// Only an exact zero counts as flat.
    pub fn strict() -> Self {
        Self {
            flat_epsilon: Decimal::ZERO,
            ..Self::default()
        }
    }

    /// Realized pnl before fees.
    pub fn gross() -> Self {
        Self {
            track_fees: false,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.flat_epsilon < Decimal::ZERO {
            return Err(ConfigError::NegativeEpsilon(self.flat_epsilon));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Flat epsilon must be non-negative, got {0}")]
    NegativeEpsilon(Decimal),

    #[error("Event retention must be at least 1")]
    ZeroEventRetention,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn presets() {
        assert_eq!(LedgerConfig::default().flat_epsilon, dec!(0.000000000001));
        assert!(LedgerConfig::default().track_fees);
        assert!(LedgerConfig::strict().flat_epsilon.is_zero());
        assert!(!LedgerConfig::gross().track_fees);
    }

    #[test]
    fn validate_rejects_negative_epsilon() {
        let config = LedgerConfig {
            flat_epsilon: dec!(-0.1),
            ..LedgerConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NegativeEpsilon(dec!(-0.1))));
        assert!(LedgerConfig::strict().validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: LedgerConfig = serde_json::from_str(r#"{"track_fees":false}"#).unwrap();
        assert!(!config.track_fees);
        assert_eq!(config.flat_epsilon, LedgerConfig::default().flat_epsilon);
    }
}
