//! Position book configuration options.

use crate::config::{ConfigError, LedgerConfig};
use serde::{Deserialize, Serialize};

/// Position book configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookConfig {
    /// Accounting rules applied to every symbol.
    pub ledger: LedgerConfig,
    /// Maximum number of events to retain in memory.
    pub max_events: usize,
    /// Record audit events at all.
    pub record_events: bool,
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            ledger: LedgerConfig::default(),
            max_events: 100_000,
            record_events: true,
        }
    }
}

impl BookConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ledger.validate()?;
        if self.max_events == 0 {
            return Err(ConfigError::ZeroEventRetention);
        }
        Ok(())
    }
}
