//! Order types and residual accounting
//!
//! An order couples immutable request attributes with a mutable
//! `remaining_quantity`. Orders are built through the typed constructors,
//! which enforce per-type field requirements at creation time.

use crate::errors::OrderError;
use crate::ids::{OrderId, Symbol, TraderId};
use crate::numeric::{Price, Quantity};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order (bid)
    BUY,
    /// Sell order (ask)
    SELL,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::BUY => Side::SELL,
            Side::SELL => Side::BUY,
        }
    }
}

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    /// Rest at a limit price until matched or canceled
    Limit,
    /// Execute immediately against resting liquidity
    Market,
    /// Held by the engine; converts to MARKET when the trigger fires
    StopLoss,
    /// Held by the engine; converts to LIMIT when the trigger fires
    StopLimit,
    /// Stop whose trigger trails the high/low-water mark by a fixed offset
    TrailingStop,
    /// Parent order exposing only a display slice at a time
    Iceberg,
}

impl OrderType {
    /// Advanced types are held by the engine and never rest in a book
    /// themselves (iceberg parents rest through their child slices).
    pub fn is_advanced(&self) -> bool {
        matches!(
            self,
            OrderType::StopLoss | OrderType::StopLimit | OrderType::TrailingStop | OrderType::Iceberg
        )
    }

    /// Stop-family types held in the engine's pending-stop table.
    pub fn is_stop(&self) -> bool {
        matches!(
            self,
            OrderType::StopLoss | OrderType::StopLimit | OrderType::TrailingStop
        )
    }
}

/// Time-in-force policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good-Till-Cancel: rests until filled or explicitly canceled
    GTC,
    /// Immediate-Or-Cancel: match on arrival, cancel any residual
    IOC,
}

/// An order request plus its mutable residual.
///
/// `price` is the resting limit for LIMIT orders and the display-slice
/// limit for ICEBERG parents; MARKET orders carry no price. Stop orders
/// keep their trigger in `stop_price` and, for STOP_LIMIT, the post-trigger
/// limit in `limit_price`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub trader_id: Option<TraderId>,
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    pub price: Option<Price>,
    pub stop_price: Option<Price>,
    pub limit_price: Option<Price>,
    pub trailing_offset: Option<Decimal>,
    pub quantity: Quantity,
    pub remaining_quantity: Quantity,
    /// ICEBERG only: size of each displayed child slice.
    pub display_quantity: Option<Quantity>,
    /// ICEBERG only: quantity not yet sliced into a child.
    pub hidden_remaining: Quantity,
    pub time_in_force: TimeInForce,
    /// Unix nanos, set at creation.
    pub timestamp: i64,
    /// Assigned on first placement into a book; final priority tie-break.
    pub sequence: Option<u64>,
}

impl Order {
    fn base(
        order_id: OrderId,
        trader_id: Option<TraderId>,
        symbol: Symbol,
        side: Side,
        order_type: OrderType,
        quantity: Quantity,
        time_in_force: TimeInForce,
        timestamp: i64,
    ) -> Self {
        Self {
            order_id,
            trader_id,
            symbol,
            side,
            order_type,
            price: None,
            stop_price: None,
            limit_price: None,
            trailing_offset: None,
            quantity,
            remaining_quantity: quantity,
            display_quantity: None,
            hidden_remaining: Quantity::zero(),
            time_in_force,
            timestamp,
            sequence: None,
        }
    }

    /// Create a LIMIT order.
    #[allow(clippy::too_many_arguments)]
    pub fn limit(
        order_id: OrderId,
        trader_id: Option<TraderId>,
        symbol: Symbol,
        side: Side,
        price: Price,
        quantity: Quantity,
        time_in_force: TimeInForce,
        timestamp: i64,
    ) -> Result<Self, OrderError> {
        let mut order = Self::base(
            order_id,
            trader_id,
            symbol,
            side,
            OrderType::Limit,
            quantity,
            time_in_force,
            timestamp,
        );
        order.price = Some(price);
        Ok(order)
    }

    /// Create a MARKET order. Market orders never rest, so they are
    /// implicitly immediate-or-cancel.
    pub fn market(
        order_id: OrderId,
        trader_id: Option<TraderId>,
        symbol: Symbol,
        side: Side,
        quantity: Quantity,
        timestamp: i64,
    ) -> Result<Self, OrderError> {
        Ok(Self::base(
            order_id,
            trader_id,
            symbol,
            side,
            OrderType::Market,
            quantity,
            TimeInForce::IOC,
            timestamp,
        ))
    }

    /// Create a STOP_LOSS order triggered at `stop_price`.
    pub fn stop_loss(
        order_id: OrderId,
        trader_id: Option<TraderId>,
        symbol: Symbol,
        side: Side,
        stop_price: Price,
        quantity: Quantity,
        timestamp: i64,
    ) -> Result<Self, OrderError> {
        let mut order = Self::base(
            order_id,
            trader_id,
            symbol,
            side,
            OrderType::StopLoss,
            quantity,
            TimeInForce::GTC,
            timestamp,
        );
        order.stop_price = Some(stop_price);
        Ok(order)
    }

    /// Create a STOP_LIMIT order: triggers at `stop_price`, then rests as a
    /// LIMIT at `limit_price`.
    #[allow(clippy::too_many_arguments)]
    pub fn stop_limit(
        order_id: OrderId,
        trader_id: Option<TraderId>,
        symbol: Symbol,
        side: Side,
        stop_price: Price,
        limit_price: Price,
        quantity: Quantity,
        timestamp: i64,
    ) -> Result<Self, OrderError> {
        let mut order = Self::base(
            order_id,
            trader_id,
            symbol,
            side,
            OrderType::StopLimit,
            quantity,
            TimeInForce::GTC,
            timestamp,
        );
        order.stop_price = Some(stop_price);
        order.limit_price = Some(limit_price);
        Ok(order)
    }

    /// Create a TRAILING_STOP order whose trigger trails the symbol's
    /// high-water (SELL) or low-water (BUY) mark by `trailing_offset`.
    pub fn trailing_stop(
        order_id: OrderId,
        trader_id: Option<TraderId>,
        symbol: Symbol,
        side: Side,
        trailing_offset: Decimal,
        quantity: Quantity,
        timestamp: i64,
    ) -> Result<Self, OrderError> {
        if trailing_offset <= Decimal::ZERO {
            return Err(OrderError::InvalidOrder(
                "trailing offset must be positive".to_string(),
            ));
        }
        let mut order = Self::base(
            order_id,
            trader_id,
            symbol,
            side,
            OrderType::TrailingStop,
            quantity,
            TimeInForce::GTC,
            timestamp,
        );
        order.trailing_offset = Some(trailing_offset);
        Ok(order)
    }

    /// Create an ICEBERG parent: `quantity` is the total, of which at most
    /// `display_quantity` is exposed to the book at a time.
    #[allow(clippy::too_many_arguments)]
    pub fn iceberg(
        order_id: OrderId,
        trader_id: Option<TraderId>,
        symbol: Symbol,
        side: Side,
        price: Price,
        total_quantity: Quantity,
        display_quantity: Quantity,
        timestamp: i64,
    ) -> Result<Self, OrderError> {
        if display_quantity > total_quantity {
            return Err(OrderError::InvalidOrder(
                "display quantity exceeds total quantity".to_string(),
            ));
        }
        let mut order = Self::base(
            order_id,
            trader_id,
            symbol,
            side,
            OrderType::Iceberg,
            total_quantity,
            TimeInForce::GTC,
            timestamp,
        );
        order.price = Some(price);
        order.display_quantity = Some(display_quantity);
        order.hidden_remaining = total_quantity;
        Ok(order)
    }

    /// Apply a fill, decrementing the residual.
    ///
    /// # Panics
    /// Panics if the fill exceeds the remaining quantity.
    pub fn fill(&mut self, quantity: Quantity) {
        assert!(
            quantity.as_decimal() <= self.remaining_quantity.as_decimal(),
            "Fill would exceed remaining quantity"
        );
        self.remaining_quantity = self.remaining_quantity - quantity;
    }

    /// Whether the residual is exhausted.
    pub fn is_filled(&self) -> bool {
        self.remaining_quantity.is_zero()
    }

    /// Total quantity filled so far.
    pub fn filled_quantity(&self) -> Quantity {
        self.quantity - self.remaining_quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limit_buy(id: &str, price: u64, qty: u64) -> Order {
        Order::limit(
            OrderId::new(id),
            Some(TraderId::new("t1")),
            Symbol::new("AAPL"),
            Side::BUY,
            Price::from_u64(price),
            Quantity::from_u64(qty),
            TimeInForce::GTC,
            1708123456789000000,
        )
        .unwrap()
    }

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::BUY.opposite(), Side::SELL);
        assert_eq!(Side::SELL.opposite(), Side::BUY);
    }

    #[test]
    fn test_limit_order_creation() {
        let order = limit_buy("b1", 101, 2);
        assert_eq!(order.order_type, OrderType::Limit);
        assert_eq!(order.price, Some(Price::from_u64(101)));
        assert_eq!(order.remaining_quantity, order.quantity);
        assert!(order.sequence.is_none());
    }

    #[test]
    fn test_market_order_has_no_price() {
        let order = Order::market(
            OrderId::new("m1"),
            None,
            Symbol::new("AAPL"),
            Side::SELL,
            Quantity::from_u64(5),
            1708123456789000000,
        )
        .unwrap();
        assert!(order.price.is_none());
        assert_eq!(order.time_in_force, TimeInForce::IOC);
    }

    #[test]
    fn test_stop_limit_carries_both_prices() {
        let order = Order::stop_limit(
            OrderId::new("s1"),
            Some(TraderId::new("t1")),
            Symbol::new("AAPL"),
            Side::SELL,
            Price::from_u64(95),
            Price::from_u64(94),
            Quantity::from_u64(10),
            1708123456789000000,
        )
        .unwrap();
        assert_eq!(order.stop_price, Some(Price::from_u64(95)));
        assert_eq!(order.limit_price, Some(Price::from_u64(94)));
        assert!(order.order_type.is_stop());
    }

    #[test]
    fn test_trailing_stop_rejects_non_positive_offset() {
        let result = Order::trailing_stop(
            OrderId::new("ts1"),
            None,
            Symbol::new("AAPL"),
            Side::SELL,
            Decimal::ZERO,
            Quantity::from_u64(1),
            1708123456789000000,
        );
        assert!(matches!(result, Err(OrderError::InvalidOrder(_))));
    }

    #[test]
    fn test_iceberg_validation() {
        let result = Order::iceberg(
            OrderId::new("i1"),
            None,
            Symbol::new("AAPL"),
            Side::SELL,
            Price::from_u64(100),
            Quantity::from_u64(100),
            Quantity::from_u64(1000),
            1708123456789000000,
        );
        assert!(matches!(result, Err(OrderError::InvalidOrder(_))));

        let parent = Order::iceberg(
            OrderId::new("i2"),
            None,
            Symbol::new("AAPL"),
            Side::SELL,
            Price::from_u64(100),
            Quantity::from_u64(1000),
            Quantity::from_u64(100),
            1708123456789000000,
        )
        .unwrap();
        assert_eq!(parent.hidden_remaining, Quantity::from_u64(1000));
        assert!(parent.order_type.is_advanced());
    }

    #[test]
    fn test_fill_accounting() {
        let mut order = limit_buy("b1", 101, 5);
        order.fill(Quantity::from_u64(2));
        assert_eq!(order.remaining_quantity, Quantity::from_u64(3));
        assert_eq!(order.filled_quantity(), Quantity::from_u64(2));
        assert!(!order.is_filled());

        order.fill(Quantity::from_u64(3));
        assert!(order.is_filled());
    }

    #[test]
    #[should_panic(expected = "Fill would exceed remaining quantity")]
    fn test_overfill_panics() {
        let mut order = limit_buy("b1", 101, 1);
        order.fill(Quantity::from_u64(2));
    }

    #[test]
    fn test_order_serialization() {
        let order = limit_buy("b1", 101, 2);
        let json = serde_json::to_string(&order).unwrap();
        let deserialized: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(order, deserialized);
    }
}
