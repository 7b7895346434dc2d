//! Pre-trade risk checks
//!
//! Validates an order against the submitting trader's limits before it
//! touches a book. Checks run in a fixed order and the first failure
//! wins; a rejected order is never recorded.

use rust_decimal::Decimal;
use types::errors::RiskViolation;
use types::numeric::Price;
use types::order::{Order, OrderType, Side};

use crate::trader::Trader;

/// Price basis for the order's notional.
///
/// LIMIT and ICEBERG use their limit price; STOP_LOSS and STOP_LIMIT use
/// the trigger; MARKET and TRAILING_STOP fall back to the engine-supplied
/// reference (last trade price, else the opposite best quote). With no
/// basis available the notional checks are skipped.
fn basis_price(order: &Order, market_reference: Option<Price>) -> Option<Decimal> {
    match order.order_type {
        OrderType::Limit | OrderType::Iceberg => order.price.map(|p| p.as_decimal()),
        OrderType::StopLoss | OrderType::StopLimit => order.stop_price.map(|p| p.as_decimal()),
        OrderType::Market | OrderType::TrailingStop => {
            market_reference.map(|p| p.as_decimal())
        }
    }
}

/// Evaluate every applicable check for `order` against `trader`.
///
/// Checks, in order: notional cap, risk-per-trade fraction of equity,
/// buyer cash sufficiency, projected per-symbol exposure.
pub fn check_order(
    trader: &Trader,
    order: &Order,
    market_reference: Option<Price>,
) -> Result<(), RiskViolation> {
    let notional = basis_price(order, market_reference)
        .map(|basis| basis * order.quantity.as_decimal());

    if let (Some(limit), Some(notional)) = (trader.max_order_notional, notional) {
        if notional > limit {
            return Err(RiskViolation::MaxOrderNotional { limit, notional });
        }
    }

    if let (Some(fraction), Some(notional)) = (trader.risk_per_trade_fraction, notional) {
        let allowed = trader.equity() * fraction;
        if notional > allowed {
            return Err(RiskViolation::RiskPerTradeFraction { allowed, notional });
        }
    }

    if order.side == Side::BUY {
        if let Some(notional) = notional {
            if trader.balance() < notional {
                return Err(RiskViolation::InsufficientBalance {
                    required: notional,
                    available: trader.balance(),
                });
            }
        }
    }

    if let Some(limit) = trader.max_exposure_per_symbol {
        let current = trader.position(&order.symbol);
        let delta = match order.side {
            Side::BUY => order.quantity.as_decimal(),
            Side::SELL => -order.quantity.as_decimal(),
        };
        let projected = (current + delta).abs();
        if projected > limit {
            return Err(RiskViolation::MaxExposurePerSymbol { limit, projected });
        }
    }

    Ok(())
}
