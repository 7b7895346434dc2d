//! Crossing detection
//!
//! A bid and an ask cross when the bid's effective price is at or above
//! the ask's. Effective prices come from the book's priority rule, so a
//! MARKET order crosses against any opposite liquidity.

use types::order::Order;

pub use crate::book::key::effective_price;

/// Whether the two top-of-book orders can trade.
pub fn crosses(bid: &Order, ask: &Order) -> bool {
    effective_price(bid) >= effective_price(ask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ids::{OrderId, Symbol};
    use types::numeric::{Price, Quantity};
    use types::order::{Side, TimeInForce};

    fn limit(side: Side, price: u64) -> Order {
        Order::limit(
            OrderId::new("o"),
            None,
            Symbol::new("AAPL"),
            side,
            Price::from_u64(price),
            Quantity::from_u64(1),
            TimeInForce::GTC,
            1,
        )
        .unwrap()
    }

    fn market(side: Side) -> Order {
        Order::market(
            OrderId::new("m"),
            None,
            Symbol::new("AAPL"),
            side,
            Quantity::from_u64(1),
            1,
        )
        .unwrap()
    }

    #[test]
    fn test_crossing_limits() {
        assert!(crosses(&limit(Side::BUY, 101), &limit(Side::SELL, 100)));
        assert!(crosses(&limit(Side::BUY, 100), &limit(Side::SELL, 100)));
        assert!(!crosses(&limit(Side::BUY, 99), &limit(Side::SELL, 100)));
    }

    #[test]
    fn test_market_always_crosses() {
        assert!(crosses(&market(Side::BUY), &limit(Side::SELL, 1_000_000)));
        assert!(crosses(&limit(Side::BUY, 1), &market(Side::SELL)));
        assert!(crosses(&market(Side::BUY), &market(Side::SELL)));
    }
}
