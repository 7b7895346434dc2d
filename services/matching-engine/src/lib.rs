//! Matching engine for the trading simulator
//!
//! Multi-instrument continuous limit order book with configurable
//! price-time (FIFO) or pro-rata priority, advanced order types
//! (stop-loss, stop-limit, trailing stop, iceberg), per-trader risk
//! limits, and atomic settlement of cash, positions, and P&L with each
//! fill.
//!
//! **Key invariants:**
//! - Strict price → timestamp → sequence priority under insertions,
//!   partial fills, and cancellations
//! - The observable trade sequence depends only on submission order and
//!   content (single-threaded cooperative execution)
//! - Settlement is applied atomically with each fill
//! - Sequence numbers are monotonic and never reused

pub mod book;
pub mod clock;
pub mod engine;
pub mod events;
pub mod matching;
pub mod risk;
pub mod trader;

pub use book::OrderBook;
pub use engine::{MatchingEngine, MatchingStrategy};
pub use events::{EngineEvent, EventKind};
pub use trader::Trader;
