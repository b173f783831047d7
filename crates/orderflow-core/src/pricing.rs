//! Order price computation.
//!
//! Pure and deterministic: derived line costs and the aggregate price block
//! are always recomputed from scratch, never adjusted incrementally. Every
//! code path that changes an order's items must call [`recalculate`] before
//! persisting.

use orderflow_types::{Order, OrderPrices};
use rust_decimal::Decimal;

/// Recomputes per-line costs and the aggregate price block.
pub fn recalculate(order: &mut Order) {
	let mut items_cost = Decimal::ZERO;
	let mut discount_value = Decimal::ZERO;
	let mut total_cost = Decimal::ZERO;

	for item in &mut order.items {
		item.cost = item.price * Decimal::from(item.qty);
		item.total_cost = item.cost - item.discount_value;
		items_cost += item.cost;
		discount_value += item.discount_value;
		total_cost += item.total_cost;
	}

	order.prices = OrderPrices {
		items_cost,
		discount_value,
		total_cost,
	};
}
