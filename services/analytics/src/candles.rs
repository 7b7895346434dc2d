//! Rolling OHLCV candle aggregation
//!
//! Buckets trades into fixed periods aligned to epoch boundaries. The
//! current candle rolls into history when a trade lands past its end;
//! empty periods produce no candle.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::ids::Symbol;
use types::trade::Trade;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// One OHLCV bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub symbol: Symbol,
    /// Bucket start, Unix nanos (inclusive).
    pub start: i64,
    /// Bucket end, Unix nanos (exclusive).
    pub end: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub trades: u64,
}

impl Candle {
    fn open_at(symbol: Symbol, start: i64, end: i64, price: Decimal, volume: Decimal) -> Self {
        Self {
            symbol,
            start,
            end,
            open: price,
            high: price,
            low: price,
            close: price,
            volume,
            trades: 1,
        }
    }

    fn update(&mut self, price: Decimal, volume: Decimal) {
        if price > self.high {
            self.high = price;
        }
        if price < self.low {
            self.low = price;
        }
        self.close = price;
        self.volume += volume;
        self.trades += 1;
    }

    /// OHLC ordering invariants.
    pub fn is_valid(&self) -> bool {
        self.high >= self.open
            && self.high >= self.close
            && self.high >= self.low
            && self.low <= self.open
            && self.low <= self.close
            && self.volume >= Decimal::ZERO
            && self.end > self.start
    }
}

/// Aggregates one symbol's trades into fixed-period candles.
#[derive(Debug)]
pub struct CandleAggregator {
    symbol: Symbol,
    period_seconds: i64,
    current: Option<Candle>,
    history: Vec<Candle>,
}

impl CandleAggregator {
    pub fn new(symbol: Symbol, period_seconds: i64) -> Self {
        assert!(period_seconds > 0, "Candle period must be positive");
        Self {
            symbol,
            period_seconds,
            current: None,
            history: Vec::new(),
        }
    }

    /// Align a timestamp down to its bucket start.
    fn bucket_start(&self, timestamp: i64) -> i64 {
        let period = self.period_seconds * NANOS_PER_SECOND;
        (timestamp / period) * period
    }

    /// Fold one trade into the aggregation.
    ///
    /// Returns the previous candle when the trade opens a new bucket.
    pub fn add_trade(&mut self, trade: &Trade) -> Option<Candle> {
        let price = trade.price.as_decimal();
        let volume = trade.quantity.as_decimal();
        let start = self.bucket_start(trade.executed_at);
        let end = start + self.period_seconds * NANOS_PER_SECOND;

        let in_current = self
            .current
            .as_ref()
            .map_or(false, |candle| {
                candle.start <= trade.executed_at && trade.executed_at < candle.end
            });

        if in_current {
            self.current
                .as_mut()
                .expect("checked above")
                .update(price, volume);
            return None;
        }

        let closed = self.current.take();
        if let Some(candle) = &closed {
            self.history.push(candle.clone());
        }
        self.current = Some(Candle::open_at(
            self.symbol.clone(),
            start,
            end,
            price,
            volume,
        ));
        closed
    }

    /// The candle still being built.
    pub fn current_candle(&self) -> Option<&Candle> {
        self.current.as_ref()
    }

    /// Up to `limit` closed candles plus the open one, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<Candle> {
        let tail_start = self.history.len().saturating_sub(limit);
        let mut out: Vec<Candle> = self.history[tail_start..].to_vec();
        if let Some(current) = &self.current {
            out.push(current.clone());
        }
        out
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ids::{OrderId, TradeId};
    use types::numeric::{Price, Quantity};
    use types::order::Side;

    fn trade(seq: u64, price: u64, qty: u64, at_seconds: i64) -> Trade {
        Trade {
            trade_id: TradeId::new(seq),
            symbol: Symbol::new("AAPL"),
            price: Price::from_u64(price),
            quantity: Quantity::from_u64(qty),
            maker_order_id: OrderId::new("m"),
            taker_order_id: OrderId::new("t"),
            maker_trader_id: None,
            taker_trader_id: None,
            taker_side: Side::BUY,
            maker_fee: Decimal::ZERO,
            taker_fee: Decimal::ZERO,
            executed_at: at_seconds * NANOS_PER_SECOND,
        }
    }

    #[test]
    fn test_first_trade_opens_candle() {
        let mut agg = CandleAggregator::new(Symbol::new("AAPL"), 60);
        assert!(agg.add_trade(&trade(1, 100, 2, 10)).is_none());

        let current = agg.current_candle().unwrap();
        assert_eq!(current.open, Decimal::from(100));
        assert_eq!(current.close, Decimal::from(100));
        assert_eq!(current.volume, Decimal::from(2));
        assert_eq!(current.start, 0);
        assert_eq!(current.end, 60 * NANOS_PER_SECOND);
        assert!(current.is_valid());
    }

    #[test]
    fn test_trades_update_ohlcv_within_bucket() {
        let mut agg = CandleAggregator::new(Symbol::new("AAPL"), 60);
        agg.add_trade(&trade(1, 100, 1, 1));
        agg.add_trade(&trade(2, 105, 2, 10));
        agg.add_trade(&trade(3, 98, 1, 20));
        agg.add_trade(&trade(4, 101, 1, 59));

        let current = agg.current_candle().unwrap();
        assert_eq!(current.open, Decimal::from(100));
        assert_eq!(current.high, Decimal::from(105));
        assert_eq!(current.low, Decimal::from(98));
        assert_eq!(current.close, Decimal::from(101));
        assert_eq!(current.volume, Decimal::from(5));
        assert_eq!(current.trades, 4);
        assert!(current.is_valid());
    }

    #[test]
    fn test_boundary_rolls_candle() {
        let mut agg = CandleAggregator::new(Symbol::new("AAPL"), 60);
        agg.add_trade(&trade(1, 100, 1, 30));

        let closed = agg.add_trade(&trade(2, 102, 1, 61)).unwrap();
        assert_eq!(closed.close, Decimal::from(100));
        assert_eq!(closed.start, 0);

        let current = agg.current_candle().unwrap();
        assert_eq!(current.open, Decimal::from(102));
        assert_eq!(current.start, 60 * NANOS_PER_SECOND);
    }

    #[test]
    fn test_recent_includes_open_candle() {
        let mut agg = CandleAggregator::new(Symbol::new("AAPL"), 60);
        agg.add_trade(&trade(1, 100, 1, 10));
        agg.add_trade(&trade(2, 101, 1, 70));
        agg.add_trade(&trade(3, 102, 1, 130));

        let recent = agg.recent(10);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].close, Decimal::from(100));
        assert_eq!(recent[2].close, Decimal::from(102));

        let limited = agg.recent(1);
        assert_eq!(limited.len(), 2); // one closed + the open bucket
    }

    #[test]
    fn test_candle_serialization() {
        let mut agg = CandleAggregator::new(Symbol::new("AAPL"), 60);
        agg.add_trade(&trade(1, 100, 1, 10));

        let candle = agg.current_candle().unwrap().clone();
        let json = serde_json::to_string(&candle).unwrap();
        let deserialized: Candle = serde_json::from_str(&json).unwrap();
        assert_eq!(candle, deserialized);
    }
}
