//! Per-symbol order book with lazy-deletion priority heaps
//!
//! Each side is a binary heap of priority keys next to an id → order
//! index. Cancellation only removes the index entry; the heap entry
//! becomes a tombstone and is discarded when it surfaces at the top.
//! This gives O(log n) insertion, O(1) amortized top-of-book access, and
//! O(1) cancellation without reheapification.

pub mod depth;
pub mod key;

pub use depth::{DepthLevel, DepthSnapshot};

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap};

use rust_decimal::Decimal;
use types::errors::BookError;
use types::ids::{OrderId, Symbol, TraderId};
use types::numeric::{Price, Quantity};
use types::order::{Order, Side};

use key::BookKey;

/// A single symbol's resting orders.
///
/// Holds LIMIT orders and in-flight MARKET orders (which the engine
/// removes before a submission returns). Advanced order types are held by
/// the engine and never enter a book directly.
#[derive(Debug)]
pub struct OrderBook {
    symbol: Symbol,
    bids: BinaryHeap<Reverse<BookKey>>,
    asks: BinaryHeap<Reverse<BookKey>>,
    orders_by_id: HashMap<OrderId, Order>,
    sequence_counter: u64,
}

impl OrderBook {
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            bids: BinaryHeap::new(),
            asks: BinaryHeap::new(),
            orders_by_id: HashMap::new(),
            sequence_counter: 0,
        }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Insert an order, assigning its book sequence number.
    ///
    /// Returns the assigned sequence. The sequence survives partial fills;
    /// an order keeps its original priority for its entire residency.
    pub fn insert(&mut self, mut order: Order) -> Result<u64, BookError> {
        if order.symbol != self.symbol {
            return Err(BookError::SymbolMismatch {
                book: self.symbol.clone(),
                order: order.symbol.clone(),
            });
        }
        if order.order_type.is_advanced() {
            return Err(BookError::UnsupportedOrderType(order.order_type));
        }
        assert!(
            !self.orders_by_id.contains_key(&order.order_id),
            "duplicate order id in book"
        );

        self.sequence_counter += 1;
        order.sequence = Some(self.sequence_counter);

        let entry = Reverse(BookKey::for_order(&order, self.sequence_counter));
        match order.side {
            Side::BUY => self.bids.push(entry),
            Side::SELL => self.asks.push(entry),
        }
        self.orders_by_id.insert(order.order_id.clone(), order);
        Ok(self.sequence_counter)
    }

    /// Remove an order by id, tombstoning its heap entry.
    ///
    /// Removing an id that is absent (never added, already removed, or
    /// fully filled) returns `NotFound`, which callers treat as a no-op.
    pub fn remove(&mut self, order_id: &OrderId) -> Result<Order, BookError> {
        self.orders_by_id
            .remove(order_id)
            .ok_or_else(|| BookError::NotFound {
                order_id: order_id.clone(),
            })
    }

    pub fn get(&self, order_id: &OrderId) -> Option<&Order> {
        self.orders_by_id.get(order_id)
    }

    pub fn contains(&self, order_id: &OrderId) -> bool {
        self.orders_by_id.contains_key(order_id)
    }

    /// Number of live orders.
    pub fn len(&self) -> usize {
        self.orders_by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders_by_id.is_empty()
    }

    /// Pop tombstones until the top entry refers to a live order.
    fn clean_top(heap: &mut BinaryHeap<Reverse<BookKey>>, index: &HashMap<OrderId, Order>) {
        while let Some(Reverse(top)) = heap.peek() {
            let live = index
                .get(top.order_id())
                .map_or(false, |order| !order.remaining_quantity.is_zero());
            if live {
                break;
            }
            heap.pop();
        }
    }

    /// Highest-priority live bid.
    pub fn best_bid(&mut self) -> Option<&Order> {
        Self::clean_top(&mut self.bids, &self.orders_by_id);
        let Reverse(top) = self.bids.peek()?;
        self.orders_by_id.get(top.order_id())
    }

    /// Highest-priority live ask.
    pub fn best_ask(&mut self) -> Option<&Order> {
        Self::clean_top(&mut self.asks, &self.orders_by_id);
        let Reverse(top) = self.asks.peek()?;
        self.orders_by_id.get(top.order_id())
    }

    /// Decrement an order's residual by a fill.
    ///
    /// Returns the evicted order once its residual reaches zero; the heap
    /// entry is left behind as a tombstone.
    pub fn apply_fill(
        &mut self,
        order_id: &OrderId,
        quantity: Quantity,
    ) -> Result<Option<Order>, BookError> {
        let order = self
            .orders_by_id
            .get_mut(order_id)
            .ok_or_else(|| BookError::NotFound {
                order_id: order_id.clone(),
            })?;
        order.fill(quantity);
        if order.is_filled() {
            Ok(self.orders_by_id.remove(order_id))
        } else {
            Ok(None)
        }
    }

    /// Live orders resting at an exact price on one side, in priority
    /// order. Used for pro-rata allocation across a level.
    pub fn makers_at(&self, side: Side, price: Price) -> Vec<(OrderId, Quantity)> {
        let mut makers: Vec<&Order> = self
            .orders_by_id
            .values()
            .filter(|order| {
                order.side == side
                    && order.price == Some(price)
                    && !order.remaining_quantity.is_zero()
            })
            .collect();
        makers.sort_by_key(|order| (order.timestamp, order.sequence.unwrap_or(u64::MAX)));
        makers
            .into_iter()
            .map(|order| (order.order_id.clone(), order.remaining_quantity))
            .collect()
    }

    /// Aggregate live resting quantity by price, up to `levels` distinct
    /// prices per side. Does not disturb heap ordering.
    pub fn depth(&self, levels: usize) -> DepthSnapshot {
        let mut bid_levels: BTreeMap<Decimal, Decimal> = BTreeMap::new();
        let mut ask_levels: BTreeMap<Decimal, Decimal> = BTreeMap::new();

        for order in self.orders_by_id.values() {
            // In-flight MARKET orders have no price level to display.
            let Some(price) = order.price else { continue };
            if order.remaining_quantity.is_zero() {
                continue;
            }
            let side_levels = match order.side {
                Side::BUY => &mut bid_levels,
                Side::SELL => &mut ask_levels,
            };
            *side_levels.entry(price.as_decimal()).or_default() +=
                order.remaining_quantity.as_decimal();
        }

        let to_level = |(price, quantity): (&Decimal, &Decimal)| DepthLevel {
            price: Price::new(*price),
            quantity: Quantity::new(*quantity),
        };

        DepthSnapshot {
            symbol: self.symbol.clone(),
            bids: bid_levels.iter().rev().take(levels).map(to_level).collect(),
            asks: ask_levels.iter().take(levels).map(to_level).collect(),
        }
    }

    /// Remove every live order belonging to a trader.
    pub fn cancel_all(&mut self, trader_id: &TraderId) -> Vec<Order> {
        let ids: Vec<OrderId> = self
            .orders_by_id
            .values()
            .filter(|order| order.trader_id.as_ref() == Some(trader_id))
            .map(|order| order.order_id.clone())
            .collect();
        ids.into_iter()
            .filter_map(|id| self.orders_by_id.remove(&id))
            .collect()
    }
}
