//! Trader state and fill settlement
//!
//! A trader holds quote-currency cash, signed per-symbol positions with a
//! weighted-average cost basis, realized and unrealized P&L, and the risk
//! limits enforced at submission time. Settlement is applied atomically
//! with each fill by the engine.

use std::collections::HashMap;

use rust_decimal::Decimal;
use types::ids::{Symbol, TraderId};
use types::numeric::{Price, Quantity};
use types::order::{Order, Side};

/// Positions smaller than this are evicted to keep reports tidy.
fn position_epsilon() -> Decimal {
    Decimal::new(1, 12)
}

/// A registered trader.
#[derive(Debug, Clone)]
pub struct Trader {
    trader_id: TraderId,
    balance: Decimal,
    positions: HashMap<Symbol, Decimal>,
    avg_cost: HashMap<Symbol, Decimal>,
    realized: HashMap<Symbol, Decimal>,
    marks: HashMap<Symbol, Decimal>,
    order_history: Vec<Order>,

    /// Cap on a single order's notional.
    pub max_order_notional: Option<Decimal>,
    /// Cap on the absolute projected position per symbol.
    pub max_exposure_per_symbol: Option<Decimal>,
    /// Cap on a single order's notional as a fraction of equity.
    pub risk_per_trade_fraction: Option<Decimal>,
    /// Reserved: windowed enforcement is deliberately not implemented.
    pub daily_loss_limit: Option<Decimal>,
}

impl Trader {
    pub fn new(trader_id: TraderId, starting_balance: Decimal) -> Self {
        Self {
            trader_id,
            balance: starting_balance,
            positions: HashMap::new(),
            avg_cost: HashMap::new(),
            realized: HashMap::new(),
            marks: HashMap::new(),
            order_history: Vec::new(),
            max_order_notional: None,
            max_exposure_per_symbol: None,
            risk_per_trade_fraction: None,
            daily_loss_limit: None,
        }
    }

    pub fn trader_id(&self) -> &TraderId {
        &self.trader_id
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    /// Add cash.
    ///
    /// # Panics
    /// Panics if the amount is not positive.
    pub fn deposit(&mut self, amount: Decimal) {
        assert!(amount > Decimal::ZERO, "Deposit amount must be positive");
        self.balance += amount;
    }

    /// Withdraw cash.
    ///
    /// # Panics
    /// Panics if the amount is not positive or exceeds the balance.
    pub fn withdraw(&mut self, amount: Decimal) {
        assert!(amount > Decimal::ZERO, "Withdraw amount must be positive");
        assert!(amount <= self.balance, "Insufficient balance");
        self.balance -= amount;
    }

    /// Append a submitted order to the history, whether or not it executes.
    pub fn record_order(&mut self, order: Order) {
        self.order_history.push(order);
    }

    pub fn order_history(&self) -> &[Order] {
        &self.order_history
    }

    /// Signed position for a symbol (zero when flat).
    pub fn position(&self, symbol: &Symbol) -> Decimal {
        self.positions.get(symbol).copied().unwrap_or_default()
    }

    pub fn positions(&self) -> &HashMap<Symbol, Decimal> {
        &self.positions
    }

    /// Weighted-average entry price for the open position.
    pub fn avg_cost(&self, symbol: &Symbol) -> Decimal {
        self.avg_cost.get(symbol).copied().unwrap_or_default()
    }

    /// Settle one fill: cash leg, fee debit, position and cost-basis
    /// update, and realized P&L when reducing or flipping.
    pub fn apply_fill(
        &mut self,
        symbol: &Symbol,
        side: Side,
        price: Price,
        quantity: Quantity,
        fee: Decimal,
    ) {
        let p = price.as_decimal();
        let q = quantity.as_decimal();
        let notional = p * q;

        match side {
            Side::BUY => self.balance -= notional,
            Side::SELL => self.balance += notional,
        }
        self.balance -= fee;

        let position = self.position(symbol);
        let avg = self.avg_cost(symbol);
        let signed = match side {
            Side::BUY => q,
            Side::SELL => -q,
        };
        let new_position = position + signed;

        let extending =
            position.is_zero() || (position > Decimal::ZERO) == (signed > Decimal::ZERO);
        if extending {
            // Quantity-weighted average across the old lot and the new fill.
            let new_avg = (avg * position.abs() + notional) / (position.abs() + q);
            self.avg_cost.insert(symbol.clone(), new_avg);
        } else {
            let cover = q.min(position.abs());
            let pnl = match side {
                // Reducing a long: gain when selling above cost.
                Side::SELL => (p - avg) * cover,
                // Covering a short: gain when buying back below entry.
                Side::BUY => (avg - p) * cover,
            };
            *self.realized.entry(symbol.clone()).or_default() += pnl;
            let flipped =
                !new_position.is_zero() && (new_position > Decimal::ZERO) != (position > Decimal::ZERO);
            if flipped {
                // Residual beyond the cover opens the opposite side at the
                // fill price.
                self.avg_cost.insert(symbol.clone(), p);
            }
        }

        if new_position.abs() < position_epsilon() {
            self.positions.remove(symbol);
            self.avg_cost.remove(symbol);
        } else {
            self.positions.insert(symbol.clone(), new_position);
        }
    }

    /// Record the latest mark price for a symbol.
    pub fn update_mark(&mut self, symbol: &Symbol, price: Price) {
        self.marks.insert(symbol.clone(), price.as_decimal());
    }

    /// Unrealized P&L for one symbol: (mark − avg cost) × position.
    /// Before the first mark the position is carried at cost.
    pub fn unrealized_pnl(&self, symbol: &Symbol) -> Decimal {
        let position = self.position(symbol);
        if position.is_zero() {
            return Decimal::ZERO;
        }
        let avg = self.avg_cost(symbol);
        let mark = self.marks.get(symbol).copied().unwrap_or(avg);
        (mark - avg) * position
    }

    pub fn total_unrealized(&self) -> Decimal {
        self.positions
            .keys()
            .map(|symbol| self.unrealized_pnl(symbol))
            .sum()
    }

    pub fn realized_pnl(&self, symbol: &Symbol) -> Decimal {
        self.realized.get(symbol).copied().unwrap_or_default()
    }

    pub fn total_realized(&self) -> Decimal {
        self.realized.values().copied().sum()
    }

    /// Cash plus every position valued at its mark (cost before the first
    /// mark).
    pub fn equity(&self) -> Decimal {
        let marked: Decimal = self
            .positions
            .iter()
            .map(|(symbol, position)| {
                let mark = self
                    .marks
                    .get(symbol)
                    .copied()
                    .unwrap_or_else(|| self.avg_cost(symbol));
                position * mark
            })
            .sum();
        self.balance + marked
    }
}
