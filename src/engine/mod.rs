// 8.0: the position book. routes executions to per-symbol ledgers, applies price
// ticks, serves snapshots. synchronous and in-memory with no external I/O.

mod config;
mod core;
mod pricing;
mod results;
mod trades;

pub use config::BookConfig;
pub use core::PositionBook;
pub use results::{LedgerError, RevalueResult};
