//! Pro-rata allocation across one price level
//!
//! Splits an aggressor quantity over the live makers resting at a single
//! price, proportionally to each maker's remaining quantity. Shares are
//! floored to the quantity precision and the rounding residue goes to
//! the top-priority maker, capped at its remaining quantity. Any portion
//! the cap leaves unallocated is picked up by the engine's next match
//! iteration.

use rust_decimal::{Decimal, RoundingStrategy};
use types::ids::OrderId;
use types::numeric::Quantity;

/// Decimal places shares are floored to.
const ALLOCATION_DP: u32 = 8;

/// One maker's slice of the aggressor quantity.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub order_id: OrderId,
    pub quantity: Quantity,
}

/// Allocate `aggressor_quantity` across `makers` (in priority order, each
/// with its remaining quantity) proportionally to remaining quantity.
///
/// Returns one allocation per maker touched, in maker priority order.
/// When the aggressor demand covers the whole level, every maker is
/// filled in full.
pub fn pro_rata(aggressor_quantity: Quantity, makers: &[(OrderId, Quantity)]) -> Vec<Allocation> {
    if makers.is_empty() || aggressor_quantity.is_zero() {
        return Vec::new();
    }

    let level_total: Decimal = makers.iter().map(|(_, qty)| qty.as_decimal()).sum();
    if level_total <= Decimal::ZERO {
        return Vec::new();
    }

    // Demand covers the level: everyone fills in full, no rounding needed.
    if aggressor_quantity.as_decimal() >= level_total {
        return makers
            .iter()
            .map(|(order_id, quantity)| Allocation {
                order_id: order_id.clone(),
                quantity: *quantity,
            })
            .collect();
    }

    let demand = aggressor_quantity.as_decimal();
    let mut shares: Vec<(OrderId, Decimal)> = makers
        .iter()
        .map(|(order_id, quantity)| {
            let share = (demand * quantity.as_decimal() / level_total)
                .round_dp_with_strategy(ALLOCATION_DP, RoundingStrategy::ToZero);
            (order_id.clone(), share)
        })
        .collect();

    // Rounding residue goes to the top-priority maker, capped at its
    // remaining quantity.
    let allocated: Decimal = shares.iter().map(|(_, share)| *share).sum();
    let residue = demand - allocated;
    if residue > Decimal::ZERO {
        let cap = makers[0].1.as_decimal();
        let head = &mut shares[0];
        head.1 = (head.1 + residue).min(cap);
    }

    shares
        .into_iter()
        .filter_map(|(order_id, share)| {
            Quantity::try_new(share).map(|quantity| Allocation { order_id, quantity })
        })
        .collect()
}
