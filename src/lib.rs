// position-ledger: per-symbol position accounting engine.
// weighted-average cost basis, realized/unrealized pnl, exact decimal math.
// all computation is deterministic with no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: Symbol, Side, SignedSize, Price, Quote, Timestamp
//   2.x  trade.rs: trade records and validation
//   3.x  position.rs: position state, open/increase/reduce/reverse transitions
//   4.x  valuation.rs: mark to market, unrealized pnl, market value
//   5.x  snapshot.rs: read-only views for api/reporting
//   6.x  events.rs: state transition events for audit
//   7.x  config.rs: accounting settings and presets
//   8.x  engine/: position book: per-symbol locking, trades, price ticks

pub mod config;
pub mod engine;
pub mod events;
pub mod position;
pub mod snapshot;
pub mod trade;
pub mod types;
pub mod valuation;

// re exports for convenience
pub use config::*;
pub use engine::*;
pub use events::*;
pub use position::*;
pub use snapshot::*;
pub use trade::*;
pub use types::*;
pub use valuation::*;
