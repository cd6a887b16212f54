// 8.0 engine/core.rs: the position book. one ledger per symbol, each behind its own lock.
// map lock is only held to look up or insert a ledger. lock order is always
// symbol ledger -> event log, never the reverse.

use super::config::BookConfig;
use super::results::LedgerError;
use crate::config::ConfigError;
use crate::events::{
    Event, EventLog, EventPayload, PositionResetEvent, PositionRestoredEvent,
};
use crate::position::{Position, PositionState};
use crate::snapshot::{PortfolioView, PositionView};
use crate::types::{Symbol, Timestamp};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

pub(super) type Ledger = Arc<Mutex<Position>>;

/** 8.1: main book struct. all state lives here */
#[derive(Debug)]
pub struct PositionBook {
    pub(super) config: BookConfig,
    pub(super) ledgers: RwLock<HashMap<Symbol, Ledger>>,
    pub(super) events: Mutex<EventLog>,
}

impl Default for PositionBook {
    fn default() -> Self {
        Self::with_config(BookConfig::default())
    }
}

impl PositionBook {
    pub fn new(config: BookConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    fn with_config(config: BookConfig) -> Self {
        let events = EventLog::new(config.max_events);
        Self {
            config,
            ledgers: RwLock::new(HashMap::new()),
            events: Mutex::new(events),
        }
    }

    pub fn config(&self) -> &BookConfig {
        &self.config
    }

    pub fn symbols(&self) -> Vec<Symbol> {
        let mut symbols: Vec<Symbol> = self.ledgers.read().keys().cloned().collect();
        symbols.sort();
        symbols
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.ledgers.read().contains_key(symbol)
    }

    /// Copy of the current position state.
    pub fn position(&self, symbol: &str) -> Result<Position, LedgerError> {
        let ledger = self.ledger(symbol).ok_or_else(|| LedgerError::not_found(symbol))?;
        let position = ledger.lock().clone();
        Ok(position)
    }

    // 8.2: read-only view for api/reporting
    pub fn snapshot(&self, symbol: &str) -> Result<PositionView, LedgerError> {
        let ledger = self.ledger(symbol).ok_or_else(|| LedgerError::not_found(symbol))?;
        let view = PositionView::from(&*ledger.lock());
        Ok(view)
    }

    /// Totals across every symbol. Each position is read under its own lock,
    /// so the view is consistent per symbol, not across symbols.
    pub fn portfolio(&self) -> PortfolioView {
        let ledgers: Vec<Ledger> = self.ledgers.read().values().cloned().collect();
        let views = ledgers
            .iter()
            .map(|ledger| PositionView::from(&*ledger.lock()))
            .collect();
        PortfolioView::from_views(views)
    }

    /// Explicit reinitialization of one symbol. Clears realized pnl.
    pub fn reset(&self, symbol: &str) -> Result<(), LedgerError> {
        self.reset_at(symbol, Timestamp::now())
    }

    pub fn reset_at(&self, symbol: &str, timestamp: Timestamp) -> Result<(), LedgerError> {
        let ledger = self.ledger(symbol).ok_or_else(|| LedgerError::not_found(symbol))?;
        let mut position = ledger.lock();

        let discarded_size = position.quantity();
        let discarded_realized_pnl = position.realized_pnl();
        position.reset(timestamp);

        info!(
            symbol = %position.symbol(),
            discarded_size = %discarded_size,
            discarded_realized_pnl = %discarded_realized_pnl,
            "position reset"
        );

        self.emit_event(
            timestamp,
            EventPayload::PositionReset(PositionResetEvent {
                symbol: position.symbol().clone(),
                discarded_size,
                discarded_realized_pnl,
            }),
        );
        Ok(())
    }

    /// Rehydrate a symbol from stored state, replacing whatever the book holds.
    pub fn restore(&self, state: PositionState) -> Result<(), LedgerError> {
        let restored = Position::restore(state)?;
        let symbol = restored.symbol().clone();
        let timestamp = restored.last_updated().unwrap_or_else(Timestamp::now);

        let ledger = self.ledger_or_insert(&symbol);
        let mut position = ledger.lock();
        *position = restored;

        info!(symbol = %symbol, size = %position.quantity(), "position restored");

        self.emit_event(
            timestamp,
            EventPayload::PositionRestored(PositionRestoredEvent {
                symbol,
                size: position.quantity(),
                avg_cost: position.avg_cost(),
                realized_pnl: position.realized_pnl(),
            }),
        );
        Ok(())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().events().iter().cloned().collect()
    }

    pub fn recent_events(&self, count: usize) -> Vec<Event> {
        self.events.lock().recent(count).cloned().collect()
    }

    pub(super) fn ledger(&self, symbol: &str) -> Option<Ledger> {
        self.ledgers.read().get(symbol).cloned()
    }

    // positions come into existence flat on first use
    pub(super) fn ledger_or_insert(&self, symbol: &Symbol) -> Ledger {
        if let Some(ledger) = self.ledger(symbol.as_str()) {
            return ledger;
        }

        let mut ledgers = self.ledgers.write();
        ledgers
            .entry(symbol.clone())
            .or_insert_with(|| Arc::new(Mutex::new(Position::new(symbol.clone()))))
            .clone()
    }

    pub(super) fn emit_event(&self, timestamp: Timestamp, payload: EventPayload) {
        if !self.config.record_events {
            return;
        }
        self.events.lock().record(timestamp, payload);
    }
}
