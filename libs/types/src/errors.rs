//! Error taxonomy for the simulator core
//!
//! Every failure is surfaced synchronously to the caller and leaves engine
//! state untouched. Internal invariant violations (negative residuals,
//! overfills) are not errors; they panic.

use crate::ids::{OrderId, Symbol, TraderId};
use crate::order::OrderType;
use rust_decimal::Decimal;
use thiserror::Error;

/// Construction-time order validation failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrderError {
    #[error("invalid order: {0}")]
    InvalidOrder(String),
}

/// Order book operation failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BookError {
    #[error("order symbol {order} does not match book symbol {book}")]
    SymbolMismatch { book: Symbol, order: Symbol },

    #[error("{0:?} orders cannot rest in a book; submit via the engine")]
    UnsupportedOrderType(OrderType),

    /// Benign: cancel of an unknown or already-removed id.
    #[error("order not found: {order_id}")]
    NotFound { order_id: OrderId },
}

/// The risk rule an order violated. Carried inside `EngineError::RiskRejected`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RiskViolation {
    #[error("order notional {notional} exceeds max order notional {limit}")]
    MaxOrderNotional { limit: Decimal, notional: Decimal },

    #[error("order notional {notional} exceeds risk-per-trade allowance {allowed}")]
    RiskPerTradeFraction { allowed: Decimal, notional: Decimal },

    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: Decimal, available: Decimal },

    #[error("projected exposure {projected} exceeds per-symbol limit {limit}")]
    MaxExposurePerSymbol { limit: Decimal, projected: Decimal },
}

/// Top-level engine error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("no order book registered for symbol {0}")]
    UnknownSymbol(Symbol),

    #[error("unknown trader: {0}")]
    UnknownTrader(TraderId),

    /// A MARKET order arrived with no live order on the opposite side; it is
    /// rejected rather than booked or silently discarded.
    #[error("market order {order_id} has no opposite liquidity")]
    UnmatchableMarket { order_id: OrderId },

    #[error("risk check rejected order: {0}")]
    RiskRejected(#[from] RiskViolation),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Book(#[from] BookError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_error_display() {
        let err = BookError::SymbolMismatch {
            book: Symbol::new("AAPL"),
            order: Symbol::new("MSFT"),
        };
        assert_eq!(
            err.to_string(),
            "order symbol MSFT does not match book symbol AAPL"
        );
    }

    #[test]
    fn test_risk_violation_nests_into_engine_error() {
        let violation = RiskViolation::InsufficientBalance {
            required: Decimal::from(1000),
            available: Decimal::from(10),
        };
        let err: EngineError = violation.into();
        assert!(matches!(err, EngineError::RiskRejected(_)));
        assert!(err.to_string().contains("insufficient balance"));
    }

    #[test]
    fn test_not_found_carries_id() {
        let err = BookError::NotFound {
            order_id: OrderId::new("zz"),
        };
        assert!(err.to_string().contains("zz"));
    }

    #[test]
    fn test_unsupported_order_type_display() {
        let err = BookError::UnsupportedOrderType(OrderType::StopLoss);
        assert!(err.to_string().contains("submit via the engine"));
    }
}
