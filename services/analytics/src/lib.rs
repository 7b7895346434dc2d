//! Analytics consumers of the engine's trade stream
//!
//! Everything here is strictly read-only with respect to engine state:
//! aggregators consume `Trade` values delivered through the event bus or
//! the recent-trades accessor.

pub mod candles;

pub use candles::{Candle, CandleAggregator};
