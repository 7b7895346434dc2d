//! Trade execution
//!
//! Builds trade records with engine-monotonic identifiers and computes
//! maker/taker fees from the configured schedule.

use rust_decimal::Decimal;
use types::ids::{Symbol, TradeId};
use types::numeric::{Price, Quantity};
use types::order::Order;
use types::trade::Trade;

/// Proportional fee rates applied to trade notional.
///
/// Fees are debits against each participant's cash; a zero schedule
/// models a fee-free venue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeSchedule {
    pub maker_rate: Decimal,
    pub taker_rate: Decimal,
}

impl FeeSchedule {
    pub fn new(maker_rate: Decimal, taker_rate: Decimal) -> Self {
        Self {
            maker_rate,
            taker_rate,
        }
    }

    /// Fee-free schedule.
    pub fn free() -> Self {
        Self {
            maker_rate: Decimal::ZERO,
            taker_rate: Decimal::ZERO,
        }
    }

    pub fn maker_fee(&self, notional: Decimal) -> Decimal {
        notional * self.maker_rate
    }

    pub fn taker_fee(&self, notional: Decimal) -> Decimal {
        notional * self.taker_rate
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self::free()
    }
}

/// Builds trades, owning the monotonic trade-id sequence.
#[derive(Debug)]
pub struct MatchExecutor {
    next_trade_id: u64,
    fees: FeeSchedule,
}

impl MatchExecutor {
    pub fn new(fees: FeeSchedule) -> Self {
        Self {
            next_trade_id: 1,
            fees,
        }
    }

    pub fn fees(&self) -> &FeeSchedule {
        &self.fees
    }

    fn next_trade_id(&mut self) -> TradeId {
        let id = TradeId::new(self.next_trade_id);
        self.next_trade_id += 1;
        id
    }

    /// Build the trade for one maker/taker fill at the execution price.
    pub fn execute(
        &mut self,
        symbol: Symbol,
        maker: &Order,
        taker: &Order,
        price: Price,
        quantity: Quantity,
        executed_at: i64,
    ) -> Trade {
        let notional = quantity * price;
        Trade {
            trade_id: self.next_trade_id(),
            symbol,
            price,
            quantity,
            maker_order_id: maker.order_id.clone(),
            taker_order_id: taker.order_id.clone(),
            maker_trader_id: maker.trader_id.clone(),
            taker_trader_id: taker.trader_id.clone(),
            taker_side: taker.side,
            maker_fee: self.fees.maker_fee(notional),
            taker_fee: self.fees.taker_fee(notional),
            executed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ids::{OrderId, TraderId};
    use types::order::{Side, TimeInForce};

    fn order(id: &str, trader: &str, side: Side, price: u64) -> Order {
        Order::limit(
            OrderId::new(id),
            Some(TraderId::new(trader)),
            Symbol::new("AAPL"),
            side,
            Price::from_u64(price),
            Quantity::from_u64(10),
            TimeInForce::GTC,
            1,
        )
        .unwrap()
    }

    #[test]
    fn test_trade_ids_monotonic() {
        let mut executor = MatchExecutor::new(FeeSchedule::free());
        let maker = order("a1", "B", Side::SELL, 100);
        let taker = order("b1", "A", Side::BUY, 101);

        let t1 = executor.execute(
            Symbol::new("AAPL"),
            &maker,
            &taker,
            Price::from_u64(100),
            Quantity::from_u64(1),
            1,
        );
        let t2 = executor.execute(
            Symbol::new("AAPL"),
            &maker,
            &taker,
            Price::from_u64(100),
            Quantity::from_u64(1),
            2,
        );
        assert_eq!(t1.trade_id.value(), 1);
        assert_eq!(t2.trade_id.value(), 2);
    }

    #[test]
    fn test_trade_carries_participants() {
        let mut executor = MatchExecutor::new(FeeSchedule::free());
        let maker = order("a1", "B", Side::SELL, 100);
        let taker = order("b1", "A", Side::BUY, 101);

        let trade = executor.execute(
            Symbol::new("AAPL"),
            &maker,
            &taker,
            Price::from_u64(100),
            Quantity::from_u64(2),
            1,
        );
        assert_eq!(trade.maker_order_id.as_str(), "a1");
        assert_eq!(trade.taker_order_id.as_str(), "b1");
        assert_eq!(trade.taker_side, Side::BUY);
        assert_eq!(trade.value(), Decimal::from(200));
    }

    #[test]
    fn test_fee_calculation() {
        // 0.02% maker, 0.05% taker.
        let fees = FeeSchedule::new(Decimal::new(2, 4), Decimal::new(5, 4));
        let mut executor = MatchExecutor::new(fees);
        let maker = order("a1", "B", Side::SELL, 100);
        let taker = order("b1", "A", Side::BUY, 101);

        let trade = executor.execute(
            Symbol::new("AAPL"),
            &maker,
            &taker,
            Price::from_u64(1000),
            Quantity::from_u64(1),
            1,
        );
        assert_eq!(trade.maker_fee, Decimal::new(2, 1)); // 1000 × 0.0002
        assert_eq!(trade.taker_fee, Decimal::new(5, 1)); // 1000 × 0.0005
    }
}
