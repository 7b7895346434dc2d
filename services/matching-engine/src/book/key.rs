//! Priority keys for the lazy-deletion heaps
//!
//! Both sides share one key shape: `rank` folds the side into the
//! comparison (negated effective price for bids, effective price for
//! asks) so the minimum key is always the side's best order. Ties break
//! on timestamp, then sequence; partial fills never reassign either.

use rust_decimal::Decimal;
use types::ids::OrderId;
use types::order::{Order, Side};

/// Effective price used for priority comparisons.
///
/// LIMIT orders compare at their limit price. A MARKET order dominates
/// its side: buys compare at the maximum representable price, sells at
/// zero, so a MARKET always crosses before any LIMIT on the same side.
pub fn effective_price(order: &Order) -> Decimal {
    match order.price {
        Some(price) => price.as_decimal(),
        None => match order.side {
            Side::BUY => Decimal::MAX,
            Side::SELL => Decimal::ZERO,
        },
    }
}

/// Heap entry: priority rank plus the id it stands for.
///
/// The derived lexicographic `Ord` is the book's priority order once
/// wrapped in `Reverse` (min-heap): price first, then timestamp, then
/// sequence. An entry whose id has left the index is a tombstone and is
/// discarded when it surfaces.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct BookKey {
    rank: Decimal,
    timestamp: i64,
    sequence: u64,
    order_id: OrderId,
}

impl BookKey {
    /// Build the key for an order with its assigned book sequence.
    pub fn for_order(order: &Order, sequence: u64) -> Self {
        let effective = effective_price(order);
        let rank = match order.side {
            Side::BUY => -effective,
            Side::SELL => effective,
        };
        Self {
            rank,
            timestamp: order.timestamp,
            sequence,
            order_id: order.order_id.clone(),
        }
    }

    pub fn order_id(&self) -> &OrderId {
        &self.order_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ids::Symbol;
    use types::numeric::{Price, Quantity};
    use types::order::TimeInForce;

    fn limit(id: &str, side: Side, price: u64, ts: i64) -> Order {
        Order::limit(
            OrderId::new(id),
            None,
            Symbol::new("AAPL"),
            side,
            Price::from_u64(price),
            Quantity::from_u64(1),
            TimeInForce::GTC,
            ts,
        )
        .unwrap()
    }

    #[test]
    fn test_higher_bid_ranks_first() {
        let low = BookKey::for_order(&limit("b1", Side::BUY, 100, 1), 1);
        let high = BookKey::for_order(&limit("b2", Side::BUY, 101, 2), 2);
        assert!(high < low, "higher bid price must sort before lower");
    }

    #[test]
    fn test_lower_ask_ranks_first() {
        let low = BookKey::for_order(&limit("a1", Side::SELL, 100, 1), 1);
        let high = BookKey::for_order(&limit("a2", Side::SELL, 101, 2), 2);
        assert!(low < high, "lower ask price must sort before higher");
    }

    #[test]
    fn test_equal_price_breaks_on_timestamp() {
        let early = BookKey::for_order(&limit("a1", Side::SELL, 100, 1), 5);
        let late = BookKey::for_order(&limit("a2", Side::SELL, 100, 2), 1);
        assert!(early < late, "earlier timestamp wins at equal price");
    }

    #[test]
    fn test_equal_timestamp_breaks_on_sequence() {
        let first = BookKey::for_order(&limit("a1", Side::SELL, 100, 1), 1);
        let second = BookKey::for_order(&limit("a2", Side::SELL, 100, 1), 2);
        assert!(first < second, "lower sequence wins at equal price and time");
    }

    #[test]
    fn test_market_dominates_side() {
        let market_buy = Order::market(
            OrderId::new("m1"),
            None,
            Symbol::new("AAPL"),
            Side::BUY,
            Quantity::from_u64(1),
            10,
        )
        .unwrap();
        let market_key = BookKey::for_order(&market_buy, 10);
        let limit_key = BookKey::for_order(&limit("b1", Side::BUY, 1_000_000, 1), 1);
        assert!(market_key < limit_key, "MARKET buy must outrank any LIMIT bid");

        assert_eq!(effective_price(&market_buy), Decimal::MAX);
    }

    #[test]
    fn test_market_sell_effective_price_is_zero() {
        let market_sell = Order::market(
            OrderId::new("m2"),
            None,
            Symbol::new("AAPL"),
            Side::SELL,
            Quantity::from_u64(1),
            10,
        )
        .unwrap();
        assert_eq!(effective_price(&market_sell), Decimal::ZERO);
    }
}
