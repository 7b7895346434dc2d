//! Trade execution records
//!
//! A trade is the atomic exchange produced by one maker/taker pairing in
//! the match loop. Fees are recorded per participant in quote currency.

use crate::ids::{OrderId, Symbol, TradeId, TraderId};
use crate::numeric::{Price, Quantity};
use crate::order::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An executed trade between a resting maker and an aggressing taker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Engine-monotonic trade identifier.
    pub trade_id: TradeId,
    pub symbol: Symbol,
    pub price: Price,
    pub quantity: Quantity,

    pub maker_order_id: OrderId,
    pub taker_order_id: OrderId,
    pub maker_trader_id: Option<TraderId>,
    pub taker_trader_id: Option<TraderId>,

    /// Side of the aggressing order.
    pub taker_side: Side,

    /// Fee debited from the maker's cash, in quote currency.
    pub maker_fee: Decimal,
    /// Fee debited from the taker's cash, in quote currency.
    pub taker_fee: Decimal,

    /// Unix nanos at execution.
    pub executed_at: i64,
}

impl Trade {
    /// Trade value (price × quantity) in quote currency.
    pub fn value(&self) -> Decimal {
        self.quantity.as_decimal() * self.price.as_decimal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trade() -> Trade {
        Trade {
            trade_id: TradeId::new(7),
            symbol: Symbol::new("AAPL"),
            price: Price::from_str("100.5").unwrap(),
            quantity: Quantity::from_u64(2),
            maker_order_id: OrderId::new("a1"),
            taker_order_id: OrderId::new("b1"),
            maker_trader_id: Some(TraderId::new("B")),
            taker_trader_id: Some(TraderId::new("A")),
            taker_side: Side::BUY,
            maker_fee: Decimal::ZERO,
            taker_fee: Decimal::new(1005, 1),
            executed_at: 1708123456789000000,
        }
    }

    #[test]
    fn test_trade_value() {
        let trade = sample_trade();
        assert_eq!(trade.value(), Decimal::from(201));
    }

    #[test]
    fn test_trade_serialization() {
        let trade = sample_trade();
        let json = serde_json::to_string(&trade).unwrap();
        let deserialized: Trade = serde_json::from_str(&json).unwrap();
        assert_eq!(trade, deserialized);
    }
}
