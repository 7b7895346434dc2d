//! Engine events and the in-process publish/subscribe bus
//!
//! The engine publishes `order_added`, `order_removed`, and
//! `trade_executed` events synchronously, in the order the underlying
//! state changes occur. Handlers receive shared references while the
//! engine is exclusively borrowed, so re-entrant mutation cannot compile;
//! handlers that need to submit follow-up orders must enqueue them for
//! after the current submission drains.

use serde::{Deserialize, Serialize};
use types::order::Order;
use types::trade::Trade;
use uuid::Uuid;

/// Event stream a handler can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    OrderAdded,
    OrderRemoved,
    TradeExecuted,
}

/// Event payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum EventPayload {
    OrderAdded { order: Order },
    OrderRemoved { order: Order },
    TradeExecuted { trade: Trade },
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::OrderAdded { .. } => EventKind::OrderAdded,
            EventPayload::OrderRemoved { .. } => EventKind::OrderRemoved,
            EventPayload::TradeExecuted { .. } => EventKind::TradeExecuted,
        }
    }
}

/// Published event envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineEvent {
    /// Unique event identifier (UUID v7, time-sortable).
    pub event_id: Uuid,
    /// Bus-monotonic sequence number.
    pub sequence: u64,
    /// Unix nanos when the event was published.
    pub timestamp: i64,
    pub payload: EventPayload,
}

type Handler = Box<dyn FnMut(&EngineEvent)>;

/// Minimal synchronous publish/subscribe registry.
///
/// Handlers must be total: a panicking handler aborts the current
/// submission.
#[derive(Default)]
pub struct EventBus {
    order_added: Vec<Handler>,
    order_removed: Vec<Handler>,
    trade_executed: Vec<Handler>,
    sequence: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event kind.
    pub fn subscribe(&mut self, kind: EventKind, handler: impl FnMut(&EngineEvent) + 'static) {
        self.handlers_mut(kind).push(Box::new(handler));
    }

    /// Publish an event to every handler of its kind.
    pub fn publish(&mut self, payload: EventPayload, timestamp: i64) {
        self.sequence += 1;
        let event = EngineEvent {
            event_id: Uuid::now_v7(),
            sequence: self.sequence,
            timestamp,
            payload,
        };
        for handler in self.handlers_mut(event.payload.kind()) {
            handler(&event);
        }
    }

    fn handlers_mut(&mut self, kind: EventKind) -> &mut Vec<Handler> {
        match kind {
            EventKind::OrderAdded => &mut self.order_added,
            EventKind::OrderRemoved => &mut self.order_removed,
            EventKind::TradeExecuted => &mut self.trade_executed,
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("order_added", &self.order_added.len())
            .field("order_removed", &self.order_removed.len())
            .field("trade_executed", &self.trade_executed.len())
            .field("sequence", &self.sequence)
            .finish()
    }
}
