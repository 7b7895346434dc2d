//! Matching engine core
//!
//! Sole ingress for order flow across all registered symbols. A
//! submission runs to completion — risk gate, routing, matching,
//! settlement, stop activation, iceberg replenishment — before the next
//! begins, so the observable trade sequence depends only on submission
//! order and content.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use types::errors::{BookError, EngineError};
use types::ids::{OrderId, Symbol, TraderId};
use types::numeric::{Price, Quantity};
use types::order::{Order, OrderType, Side, TimeInForce};
use types::trade::Trade;

use crate::book::{DepthSnapshot, OrderBook};
use crate::clock::MonotonicClock;
use crate::events::{EngineEvent, EventBus, EventKind, EventPayload};
use crate::matching::{allocation, crossing, FeeSchedule, MatchExecutor};
use crate::risk;
use crate::trader::Trader;

/// How aggressor quantity is divided among resting makers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchingStrategy {
    /// Strict price-time priority: the earliest maker fills first.
    #[default]
    Fifo,
    /// Proportional allocation across the top maker price level.
    /// MARKET aggressors fall back to FIFO.
    ProRata,
}

/// A stop-family order held by the engine until its trigger fires.
#[derive(Debug, Clone)]
struct PendingStop {
    order: Order,
    /// Highest last price observed since submission (TRAILING_STOP SELL).
    high_water: Option<Decimal>,
    /// Lowest last price observed since submission (TRAILING_STOP BUY).
    low_water: Option<Decimal>,
}

impl PendingStop {
    fn new(order: Order) -> Self {
        Self {
            order,
            high_water: None,
            low_water: None,
        }
    }

    /// Fold a last-trade price into the trailing watermarks.
    fn observe(&mut self, last: Decimal) {
        if self.order.order_type != OrderType::TrailingStop {
            return;
        }
        match self.order.side {
            Side::SELL => self.high_water = Some(self.high_water.map_or(last, |h| h.max(last))),
            Side::BUY => self.low_water = Some(self.low_water.map_or(last, |l| l.min(last))),
        }
    }

    /// Current effective trigger price, if determinable.
    fn trigger_price(&self) -> Option<Decimal> {
        match self.order.order_type {
            OrderType::StopLoss | OrderType::StopLimit => {
                self.order.stop_price.map(|p| p.as_decimal())
            }
            OrderType::TrailingStop => {
                let offset = self.order.trailing_offset?;
                match self.order.side {
                    Side::SELL => self.high_water.map(|high| high - offset),
                    Side::BUY => self.low_water.map(|low| low + offset),
                }
            }
            _ => None,
        }
    }

    /// SELL stops fire when last ≤ trigger; BUY stops when last ≥ trigger.
    fn is_triggered(&self, last: Decimal) -> bool {
        let Some(trigger) = self.trigger_price() else {
            return false;
        };
        match self.order.side {
            Side::SELL => last <= trigger,
            Side::BUY => last >= trigger,
        }
    }

    /// Convert into the order that re-enters submission: STOP_LOSS and
    /// TRAILING_STOP become MARKET, STOP_LIMIT becomes a LIMIT at its
    /// limit price.
    fn convert(&self, timestamp: i64) -> Result<Order, EngineError> {
        let stop = &self.order;
        match stop.order_type {
            OrderType::StopLoss | OrderType::TrailingStop => Order::market(
                OrderId::new(format!("{}-mkt", stop.order_id)),
                stop.trader_id.clone(),
                stop.symbol.clone(),
                stop.side,
                stop.quantity,
                timestamp,
            )
            .map_err(Into::into),
            OrderType::StopLimit => Order::limit(
                OrderId::new(format!("{}-lmt", stop.order_id)),
                stop.trader_id.clone(),
                stop.symbol.clone(),
                stop.side,
                stop.limit_price.expect("stop-limit carries its limit price"),
                stop.quantity,
                TimeInForce::GTC,
                timestamp,
            )
            .map_err(Into::into),
            _ => unreachable!("only stop-family orders are held as pending stops"),
        }
    }
}

/// An iceberg order's hidden reserve and its current displayed slice.
#[derive(Debug)]
struct IcebergParent {
    order: Order,
    next_slice: u32,
    live_child: Option<OrderId>,
}

impl IcebergParent {
    fn new(order: Order) -> Self {
        Self {
            order,
            next_slice: 0,
            live_child: None,
        }
    }

    /// Carve the next child LIMIT out of the hidden reserve.
    fn slice(&mut self, timestamp: i64) -> Option<Order> {
        let hidden = self.order.hidden_remaining;
        if hidden.is_zero() {
            return None;
        }
        let display = self
            .order
            .display_quantity
            .expect("iceberg parent has a display quantity");
        let quantity = display.min(hidden);
        self.order.hidden_remaining = hidden - quantity;
        self.next_slice += 1;

        let child = Order::limit(
            OrderId::new(format!("{}-s{}", self.order.order_id, self.next_slice)),
            self.order.trader_id.clone(),
            self.order.symbol.clone(),
            self.order.side,
            self.order.price.expect("iceberg parent has a price"),
            quantity,
            TimeInForce::GTC,
            timestamp,
        )
        .expect("child slice is a valid limit order");
        self.live_child = Some(child.order_id.clone());
        Some(child)
    }
}

/// P&L summary for one trader across all symbols.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PnlReport {
    pub realized: Decimal,
    pub unrealized: Decimal,
    pub equity: Decimal,
    pub cash: Decimal,
}

/// The matching engine: registry of books and traders, matcher, settler,
/// and event publisher.
pub struct MatchingEngine {
    books: HashMap<Symbol, OrderBook>,
    traders: HashMap<TraderId, Trader>,
    trades: Vec<Trade>,
    last_trade_price: HashMap<Symbol, Price>,
    stop_orders: Vec<PendingStop>,
    iceberg_parents: HashMap<OrderId, IcebergParent>,
    iceberg_children: HashMap<OrderId, OrderId>,
    strategy: MatchingStrategy,
    executor: MatchExecutor,
    bus: EventBus,
    clock: MonotonicClock,
}

impl MatchingEngine {
    /// FIFO engine on a fee-free venue.
    pub fn new() -> Self {
        Self::with_config(MatchingStrategy::Fifo, FeeSchedule::free())
    }

    pub fn with_config(strategy: MatchingStrategy, fees: FeeSchedule) -> Self {
        Self {
            books: HashMap::new(),
            traders: HashMap::new(),
            trades: Vec::new(),
            last_trade_price: HashMap::new(),
            stop_orders: Vec::new(),
            iceberg_parents: HashMap::new(),
            iceberg_children: HashMap::new(),
            strategy,
            executor: MatchExecutor::new(fees),
            bus: EventBus::new(),
            clock: MonotonicClock::new(),
        }
    }

    /// Register a symbol's order book.
    pub fn add_order_book(&mut self, book: OrderBook) {
        self.books.insert(book.symbol().clone(), book);
    }

    /// Register a trader before their first order.
    pub fn register_trader(&mut self, trader: Trader) {
        self.traders.insert(trader.trader_id().clone(), trader);
    }

    pub fn book(&self, symbol: &Symbol) -> Option<&OrderBook> {
        self.books.get(symbol)
    }

    pub fn trader(&self, trader_id: &TraderId) -> Option<&Trader> {
        self.traders.get(trader_id)
    }

    /// Register an event handler.
    pub fn subscribe(&mut self, kind: EventKind, handler: impl FnMut(&EngineEvent) + 'static) {
        self.bus.subscribe(kind, handler);
    }

    /// All trades executed so far, in execution order.
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// The most recent trades, newest first.
    pub fn recent_trades(&self, limit: usize) -> Vec<Trade> {
        self.trades.iter().rev().take(limit).cloned().collect()
    }

    pub fn last_trade_price(&self, symbol: &Symbol) -> Option<Price> {
        self.last_trade_price.get(symbol).copied()
    }

    /// Aggregated top-of-book depth for a symbol.
    pub fn depth(&self, symbol: &Symbol, levels: usize) -> Result<DepthSnapshot, EngineError> {
        self.books
            .get(symbol)
            .map(|book| book.depth(levels))
            .ok_or_else(|| EngineError::UnknownSymbol(symbol.clone()))
    }

    /// Submit an order of any type. The sole ingress for order flow.
    pub fn submit_order(&mut self, order: Order) -> Result<(), EngineError> {
        if !self.books.contains_key(&order.symbol) {
            return Err(EngineError::UnknownSymbol(order.symbol.clone()));
        }
        self.clock.observe(order.timestamp);

        // Risk gate and history recording apply to registered traders. A
        // rejected order is not recorded.
        if let Some(trader_id) = order.trader_id.clone() {
            if self.traders.contains_key(&trader_id) {
                let reference = self.market_reference(&order);
                let trader = self.traders.get(&trader_id).expect("checked above");
                risk::check_order(trader, &order, reference)?;
                self.traders
                    .get_mut(&trader_id)
                    .expect("checked above")
                    .record_order(order.clone());
            }
        }

        match order.order_type {
            OrderType::StopLoss | OrderType::StopLimit | OrderType::TrailingStop => {
                let mut pending = PendingStop::new(order);
                if let Some(last) = self.last_trade_price.get(&pending.order.symbol) {
                    pending.observe(last.as_decimal());
                }
                debug!(order_id = %pending.order.order_id, "stop order held pending trigger");
                self.stop_orders.push(pending);
                Ok(())
            }
            OrderType::Iceberg => {
                let parent_id = order.order_id.clone();
                let mut parent = IcebergParent::new(order);
                let child = parent
                    .slice(self.clock.now())
                    .expect("a fresh iceberg has hidden quantity");
                self.iceberg_children
                    .insert(child.order_id.clone(), parent_id.clone());
                self.iceberg_parents.insert(parent_id, parent);
                self.submit_order(child)
            }
            OrderType::Market => {
                let opposite_empty = {
                    let book = self.books.get_mut(&order.symbol).expect("checked above");
                    match order.side {
                        Side::BUY => book.best_ask().is_none(),
                        Side::SELL => book.best_bid().is_none(),
                    }
                };
                if opposite_empty {
                    return Err(EngineError::UnmatchableMarket {
                        order_id: order.order_id,
                    });
                }
                let order_id = order.order_id.clone();
                let symbol = order.symbol.clone();
                self.insert_and_publish(order)?;
                self.run_matching_cycle(&symbol)?;
                // A MARKET never rests: cancel any residual the sweep left.
                self.remove_if_resting(&symbol, &order_id);
                Ok(())
            }
            OrderType::Limit => {
                let order_id = order.order_id.clone();
                let symbol = order.symbol.clone();
                let time_in_force = order.time_in_force;
                self.insert_and_publish(order)?;
                self.run_matching_cycle(&symbol)?;
                if time_in_force == TimeInForce::IOC {
                    self.remove_if_resting(&symbol, &order_id);
                }
                Ok(())
            }
        }
    }

    /// Cancel an order wherever the engine holds it: a book, the pending
    /// stop table, or the iceberg registry. Canceling an unknown id is a
    /// no-op; cancels observed between submissions take effect atomically.
    pub fn cancel_order(&mut self, order_id: &OrderId, symbol: Option<&Symbol>) -> bool {
        let removed = match symbol {
            Some(symbol) => self
                .books
                .get_mut(symbol)
                .and_then(|book| book.remove(order_id).ok()),
            None => self
                .books
                .values_mut()
                .find_map(|book| book.remove(order_id).ok()),
        };
        if let Some(order) = removed {
            let timestamp = self.clock.now();
            self.bus
                .publish(EventPayload::OrderRemoved { order }, timestamp);
            // A canceled displayed slice takes its hidden reserve with it.
            if let Some(parent_id) = self.iceberg_children.remove(order_id) {
                self.iceberg_parents.remove(&parent_id);
            }
            return true;
        }

        let live_stops = self.stop_orders.len();
        self.stop_orders
            .retain(|pending| &pending.order.order_id != order_id);
        if self.stop_orders.len() < live_stops {
            return true;
        }

        if let Some(parent) = self.iceberg_parents.remove(order_id) {
            if let Some(child_id) = parent.live_child {
                self.iceberg_children.remove(&child_id);
                if let Some(book) = self.books.get_mut(&parent.order.symbol) {
                    if let Ok(child) = book.remove(&child_id) {
                        let timestamp = self.clock.now();
                        self.bus
                            .publish(EventPayload::OrderRemoved { order: child }, timestamp);
                    }
                }
            }
            return true;
        }

        false
    }

    /// Cancel every resting order for a trader across all books.
    pub fn cancel_all(&mut self, trader_id: &TraderId) -> usize {
        let mut removed = Vec::new();
        for book in self.books.values_mut() {
            removed.extend(book.cancel_all(trader_id));
        }
        let count = removed.len();
        for order in removed {
            if let Some(parent_id) = self.iceberg_children.remove(&order.order_id) {
                self.iceberg_parents.remove(&parent_id);
            }
            let timestamp = self.clock.now();
            self.bus
                .publish(EventPayload::OrderRemoved { order }, timestamp);
        }
        self.stop_orders
            .retain(|pending| pending.order.trader_id.as_ref() != Some(trader_id));
        count
    }

    /// Realized/unrealized P&L, equity, and cash for a trader.
    pub fn pnl_report(&self, trader_id: &TraderId) -> Result<PnlReport, EngineError> {
        let trader = self
            .traders
            .get(trader_id)
            .ok_or_else(|| EngineError::UnknownTrader(trader_id.clone()))?;
        Ok(PnlReport {
            realized: trader.total_realized(),
            unrealized: trader.total_unrealized(),
            equity: trader.equity(),
            cash: trader.balance(),
        })
    }

    /// Signed positions per symbol for a trader.
    pub fn position_report(
        &self,
        trader_id: &TraderId,
    ) -> Result<HashMap<Symbol, Decimal>, EngineError> {
        let trader = self
            .traders
            .get(trader_id)
            .ok_or_else(|| EngineError::UnknownTrader(trader_id.clone()))?;
        Ok(trader.positions().clone())
    }

    /// Reference price for a MARKET-like order's notional: last trade
    /// price, else the opposite-side best quote.
    fn market_reference(&mut self, order: &Order) -> Option<Price> {
        if let Some(last) = self.last_trade_price.get(&order.symbol) {
            return Some(*last);
        }
        let book = self.books.get_mut(&order.symbol)?;
        match order.side {
            Side::BUY => book.best_ask().and_then(|o| o.price),
            Side::SELL => book.best_bid().and_then(|o| o.price),
        }
    }

    fn insert_and_publish(&mut self, order: Order) -> Result<(), EngineError> {
        let symbol = order.symbol.clone();
        let order_id = order.order_id.clone();
        let book = self.books.get_mut(&symbol).expect("book resolved at submit");
        book.insert(order)?;
        let added = book.get(&order_id).cloned().expect("just inserted");
        let timestamp = self.clock.now();
        self.bus
            .publish(EventPayload::OrderAdded { order: added }, timestamp);
        Ok(())
    }

    fn remove_if_resting(&mut self, symbol: &Symbol, order_id: &OrderId) {
        let book = self.books.get_mut(symbol).expect("book resolved at submit");
        if let Ok(order) = book.remove(order_id) {
            let timestamp = self.clock.now();
            self.bus
                .publish(EventPayload::OrderRemoved { order }, timestamp);
        }
    }

    /// Match, then activate stops, until a full pass fires nothing.
    /// Bounded by the live stop count so a pathological trigger chain
    /// cannot cycle.
    fn run_matching_cycle(&mut self, symbol: &Symbol) -> Result<(), EngineError> {
        let mut rounds = self.stop_orders.len() + 1;
        loop {
            self.match_book(symbol)?;
            let fired = self.activate_stops(symbol)?;
            if fired == 0 {
                break;
            }
            if rounds == 0 {
                warn!(%symbol, "stop activation did not converge; deferring remaining stops");
                break;
            }
            rounds -= 1;
        }
        Ok(())
    }

    /// Execute the aggressor against resting liquidity while the tops
    /// cross.
    fn match_book(&mut self, symbol: &Symbol) -> Result<(), EngineError> {
        // Pro-rata applies at the aggressor's first maker price level;
        // once it walks deeper, allocation reverts to FIFO.
        let mut pro_rata_scope: Option<(OrderId, Decimal)> = None;
        loop {
            let (bid, ask) = {
                let book = self.books.get_mut(symbol).expect("book resolved at submit");
                let bid = book.best_bid().cloned();
                let ask = book.best_ask().cloned();
                match (bid, ask) {
                    (Some(bid), Some(ask)) => (bid, ask),
                    _ => break,
                }
            };
            if !crossing::crosses(&bid, &ask) {
                break;
            }

            let Some(price) = self.execution_price(symbol, &bid, &ask) else {
                debug!(%symbol, "no execution price available; tops left resting");
                break;
            };

            // The just-submitted order (higher book sequence) is the
            // taker; the resting order is the maker.
            let (taker, maker) = if bid.sequence > ask.sequence {
                (bid, ask)
            } else {
                (ask, bid)
            };

            // MARKET aggressors (and a priceless maker top) always fall
            // back to FIFO.
            let mut use_pro_rata = false;
            if self.strategy == MatchingStrategy::ProRata && taker.price.is_some() {
                if let Some(level) = maker.price {
                    let level = level.as_decimal();
                    let same_taker = matches!(
                        &pro_rata_scope,
                        Some((scoped_taker, _)) if *scoped_taker == taker.order_id
                    );
                    if same_taker {
                        use_pro_rata = matches!(
                            &pro_rata_scope,
                            Some((_, scoped_level)) if *scoped_level == level
                        );
                    } else {
                        pro_rata_scope = Some((taker.order_id.clone(), level));
                        use_pro_rata = true;
                    }
                }
            }

            let fills = self.plan_fills(symbol, &taker, &maker, use_pro_rata);
            if fills.is_empty() {
                break;
            }
            for (maker_id, quantity) in fills {
                self.execute_fill(symbol, &taker.order_id, &maker_id, price, quantity)?;
            }
        }
        Ok(())
    }

    /// Maker fills for one match iteration, in maker priority order.
    fn plan_fills(
        &self,
        symbol: &Symbol,
        taker: &Order,
        maker: &Order,
        use_pro_rata: bool,
    ) -> Vec<(OrderId, Quantity)> {
        if use_pro_rata {
            if let Some(level_price) = maker.price {
                let book = self.books.get(symbol).expect("book resolved at submit");
                return allocation::pro_rata(
                    taker.remaining_quantity,
                    &book.makers_at(maker.side, level_price),
                )
                .into_iter()
                .map(|share| (share.order_id, share.quantity))
                .collect();
            }
        }
        vec![(
            maker.order_id.clone(),
            taker.remaining_quantity.min(maker.remaining_quantity),
        )]
    }

    /// Execution price: the ask's resting limit; a MARKET ask defers to
    /// the bid's limit. A two-MARKET top (only reachable through stop
    /// activation) falls back to the last trade price; with none
    /// available no trade occurs and both orders remain.
    fn execution_price(&self, symbol: &Symbol, bid: &Order, ask: &Order) -> Option<Price> {
        ask.price
            .or(bid.price)
            .or_else(|| self.last_trade_price.get(symbol).copied())
    }

    /// One maker/taker fill: build the trade, settle both traders, update
    /// residuals and marks, publish, and replenish any iceberg slice.
    fn execute_fill(
        &mut self,
        symbol: &Symbol,
        taker_id: &OrderId,
        maker_id: &OrderId,
        price: Price,
        quantity: Quantity,
    ) -> Result<(), EngineError> {
        let (maker, taker) = {
            let book = self.books.get(symbol).expect("book resolved at submit");
            let maker = book
                .get(maker_id)
                .cloned()
                .ok_or_else(|| BookError::NotFound {
                    order_id: maker_id.clone(),
                })?;
            let taker = book
                .get(taker_id)
                .cloned()
                .ok_or_else(|| BookError::NotFound {
                    order_id: taker_id.clone(),
                })?;
            (maker, taker)
        };

        let executed_at = self.clock.now();
        let trade = self
            .executor
            .execute(symbol.clone(), &maker, &taker, price, quantity, executed_at);

        self.settle(&trade);

        let (maker_evicted, taker_evicted) = {
            let book = self.books.get_mut(symbol).expect("book resolved at submit");
            let maker_evicted = book.apply_fill(maker_id, quantity)?;
            let taker_evicted = book.apply_fill(taker_id, quantity)?;
            (maker_evicted, taker_evicted)
        };

        self.last_trade_price.insert(symbol.clone(), price);
        for trader in self.traders.values_mut() {
            trader.update_mark(symbol, price);
        }

        debug!(
            trade_id = trade.trade_id.value(),
            %symbol,
            price = %trade.price,
            quantity = %trade.quantity,
            "trade executed"
        );
        self.trades.push(trade.clone());
        self.bus
            .publish(EventPayload::TradeExecuted { trade }, executed_at);

        for evicted in [maker_evicted, taker_evicted].into_iter().flatten() {
            let timestamp = self.clock.now();
            self.bus.publish(
                EventPayload::OrderRemoved {
                    order: evicted.clone(),
                },
                timestamp,
            );
            self.replenish_iceberg(&evicted)?;
        }
        Ok(())
    }

    /// Apply the cash, fee, position, and P&L legs to both participants.
    fn settle(&mut self, trade: &Trade) {
        let maker_side = trade.taker_side.opposite();
        if let Some(trader_id) = &trade.maker_trader_id {
            if let Some(trader) = self.traders.get_mut(trader_id) {
                trader.apply_fill(
                    &trade.symbol,
                    maker_side,
                    trade.price,
                    trade.quantity,
                    trade.maker_fee,
                );
            }
        }
        if let Some(trader_id) = &trade.taker_trader_id {
            if let Some(trader) = self.traders.get_mut(trader_id) {
                trader.apply_fill(
                    &trade.symbol,
                    trade.taker_side,
                    trade.price,
                    trade.quantity,
                    trade.taker_fee,
                );
            }
        }
    }

    /// When a fully filled order was an iceberg slice, post the next
    /// child at the same price with a fresh timestamp and sequence, so it
    /// queues behind anything already resting at that level.
    fn replenish_iceberg(&mut self, evicted: &Order) -> Result<(), EngineError> {
        let Some(parent_id) = self.iceberg_children.remove(&evicted.order_id) else {
            return Ok(());
        };
        let timestamp = self.clock.now();
        let next_child = {
            let Some(parent) = self.iceberg_parents.get_mut(&parent_id) else {
                return Ok(());
            };
            parent.live_child = None;
            parent.slice(timestamp)
        };
        match next_child {
            Some(child) => {
                debug!(parent = %parent_id, child = %child.order_id, "iceberg slice replenished");
                self.iceberg_children
                    .insert(child.order_id.clone(), parent_id);
                self.insert_and_publish(child)
            }
            None => {
                self.iceberg_parents.remove(&parent_id);
                Ok(())
            }
        }
    }

    /// Scan pending stops for the symbol against the updated last price;
    /// fired stops are removed first (triggering is idempotent), then
    /// their conversions re-enter `submit_order` with risk re-applied. A
    /// rejected or unmatchable conversion is logged and dropped rather
    /// than failing the submission that moved the price.
    fn activate_stops(&mut self, symbol: &Symbol) -> Result<usize, EngineError> {
        let Some(last) = self.last_trade_price.get(symbol).copied() else {
            return Ok(0);
        };
        let last = last.as_decimal();

        let mut fired = Vec::new();
        self.stop_orders.retain_mut(|pending| {
            if &pending.order.symbol != symbol {
                return true;
            }
            pending.observe(last);
            if pending.is_triggered(last) {
                fired.push(pending.clone());
                false
            } else {
                true
            }
        });

        let count = fired.len();
        for pending in fired {
            let timestamp = self.clock.now();
            let converted = pending.convert(timestamp)?;
            debug!(
                stop = %pending.order.order_id,
                converted = %converted.order_id,
                "stop triggered"
            );
            if let Err(err) = self.submit_order(converted) {
                warn!(
                    stop = %pending.order.order_id,
                    %err,
                    "triggered stop conversion rejected"
                );
            }
        }
        Ok(count)
    }
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new()
    }
}
