// 6.0: every committed state change produces an event. used for audit trails and
// notifying reporting collaborators. rejected trades are recorded too.

use crate::position::{TradeOutcome, TransitionKind};
use crate::types::{Price, Quote, SignedSize, Symbol, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }

    pub fn symbol(&self) -> Option<&Symbol> {
        match &self.payload {
            EventPayload::PositionOpened(e) => Some(&e.symbol),
            EventPayload::PositionIncreased(e)
            | EventPayload::PositionReduced(e)
            | EventPayload::PositionClosed(e)
            | EventPayload::PositionReversed(e) => Some(&e.symbol),
            EventPayload::PositionRevalued(e) => Some(&e.symbol),
            EventPayload::PositionReset(e) => Some(&e.symbol),
            EventPayload::PositionRestored(e) => Some(&e.symbol),
            EventPayload::TradeRejected(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // Trade events
    PositionOpened(PositionOpenedEvent),
    PositionIncreased(PositionChangedEvent),
    PositionReduced(PositionChangedEvent),
    PositionClosed(PositionChangedEvent),
    PositionReversed(PositionChangedEvent),
    TradeRejected(TradeRejectedEvent),

    // Price events
    PositionRevalued(PositionRevaluedEvent),

    // Lifecycle events
    PositionReset(PositionResetEvent),
    PositionRestored(PositionRestoredEvent),
}

impl EventPayload {
    pub(crate) fn from_outcome(symbol: &Symbol, price: Price, outcome: &TradeOutcome) -> Self {
        if outcome.kind == TransitionKind::Opened {
            return EventPayload::PositionOpened(PositionOpenedEvent {
                symbol: symbol.clone(),
                size: outcome.quantity,
                entry_price: price,
                fee: outcome.fee,
            });
        }

        let changed = PositionChangedEvent {
            symbol: symbol.clone(),
            fill_price: price,
            old_size: outcome.previous_quantity,
            new_size: outcome.quantity,
            old_avg_cost: outcome.previous_avg_cost,
            new_avg_cost: outcome.avg_cost,
            closed_quantity: outcome.closed_quantity,
            realized_delta: outcome.realized_delta,
            fee: outcome.fee,
        };

        match outcome.kind {
            TransitionKind::Increased => EventPayload::PositionIncreased(changed),
            TransitionKind::Reduced => EventPayload::PositionReduced(changed),
            TransitionKind::Closed => EventPayload::PositionClosed(changed),
            _ => EventPayload::PositionReversed(changed),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionOpenedEvent {
    pub symbol: Symbol,
    pub size: SignedSize,
    pub entry_price: Price,
    pub fee: Quote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionChangedEvent {
    pub symbol: Symbol,
    pub fill_price: Price,
    pub old_size: SignedSize,
    pub new_size: SignedSize,
    pub old_avg_cost: Option<Price>,
    pub new_avg_cost: Option<Price>,
    pub closed_quantity: Decimal,
    pub realized_delta: Quote,
    pub fee: Quote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRejectedEvent {
    pub symbol: String,
    pub quantity: Decimal,
    pub price: Decimal,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionRevaluedEvent {
    pub symbol: Symbol,
    pub market_price: Price,
    pub market_value: Option<Quote>,
    pub unrealized_pnl: Option<Quote>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionResetEvent {
    pub symbol: Symbol,
    pub discarded_size: SignedSize,
    pub discarded_realized_pnl: Quote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionRestoredEvent {
    pub symbol: Symbol,
    pub size: SignedSize,
    pub avg_cost: Option<Price>,
    pub realized_pnl: Quote,
}

pub trait EventEmitter {
    fn emit(&mut self, event: Event);
}

/// Bounded in-memory event log. Oldest events are dropped past `max_events`.
#[derive(Debug)]
pub struct EventLog {
    events: VecDeque<Event>,
    next_id: u64,
    max_events: usize,
}

impl EventLog {
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::new(),
            next_id: 1,
            max_events,
        }
    }

    pub fn events(&self) -> &VecDeque<Event> {
        &self.events
    }

    /// The last `count` events, oldest first.
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &Event> {
        let start = self.events.len().saturating_sub(count);
        self.events.range(start..)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn next_id(&mut self) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn record(&mut self, timestamp: Timestamp, payload: EventPayload) -> EventId {
        let id = self.next_id();
        self.emit(Event::new(id, timestamp, payload));
        id
    }
}

impl EventEmitter for EventLog {
    fn emit(&mut self, event: Event) {
        self.events.push_back(event);

        while self.events.len() > self.max_events {
            self.events.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn revalued(symbol: &str) -> EventPayload {
        EventPayload::PositionRevalued(PositionRevaluedEvent {
            symbol: Symbol::new(symbol).unwrap(),
            market_price: Price::new_unchecked(dec!(100)),
            market_value: None,
            unrealized_pnl: None,
        })
    }

    #[test]
    fn event_log_assigns_ids() {
        let mut log = EventLog::new(10);
        let first = log.record(Timestamp::from_millis(1), revalued("BTC-USD"));
        let second = log.record(Timestamp::from_millis(2), revalued("ETH-USD"));

        assert_eq!(first, EventId(1));
        assert_eq!(second, EventId(2));
        assert_eq!(log.events().len(), 2);
        let last = log.recent(1).next().unwrap();
        assert_eq!(last.symbol().unwrap().as_str(), "ETH-USD");

        log.clear();
        assert!(log.events().is_empty());
    }

    #[test]
    fn event_log_drops_oldest() {
        let mut log = EventLog::new(3);
        for i in 0..5 {
            log.record(Timestamp::from_millis(i), revalued("BTC-USD"));
        }

        assert_eq!(log.events().len(), 3);
        assert_eq!(log.events()[0].id, EventId(3));
        assert_eq!(log.recent(10).count(), 3);
    }

    #[test]
    fn event_log_keeps_newest_window_past_cap() {
        let mut log = EventLog::new(1000);
        for i in 0..5000 {
            log.record(Timestamp::from_millis(i), revalued("BTC-USD"));
        }

        assert_eq!(log.events().len(), 1000);
        let ids: Vec<u64> = log.events().iter().map(|e| e.id.0).collect();
        assert_eq!(ids, (4001..=5000).collect::<Vec<u64>>());

        let recent: Vec<u64> = log.recent(3).map(|e| e.id.0).collect();
        assert_eq!(recent, vec![4998, 4999, 5000]);
        assert_eq!(log.recent(0).count(), 0);
    }

    #[test]
    fn blank_symbol_event_does_not_deserialize() {
        let event = Event::new(EventId(1), Timestamp::from_millis(0), revalued("BTC-USD"));
        let json = serde_json::to_string(&event).unwrap();

        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back.symbol().unwrap().as_str(), "BTC-USD");

        let blank = json.replace("BTC-USD", "");
        assert!(serde_json::from_str::<Event>(&blank).is_err());
    }

    #[test]
    fn outcome_maps_to_payload() {
        let outcome = TradeOutcome {
            kind: TransitionKind::Reversed,
            realized_delta: Quote::new(dec!(4000)),
            fee: Quote::zero(),
            closed_quantity: dec!(2),
            previous_quantity: SignedSize::new(dec!(2)),
            quantity: SignedSize::new(dec!(-1)),
            previous_avg_cost: Some(Price::new_unchecked(dec!(50000))),
            avg_cost: Some(Price::new_unchecked(dec!(52000))),
        };
        let symbol = Symbol::new("BTC-USD").unwrap();

        let payload =
            EventPayload::from_outcome(&symbol, Price::new_unchecked(dec!(52000)), &outcome);
        match payload {
            EventPayload::PositionReversed(e) => {
                assert_eq!(e.realized_delta.value(), dec!(4000));
                assert!(e.new_size.is_short());
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }
}
