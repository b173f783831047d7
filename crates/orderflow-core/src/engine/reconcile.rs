//! Periodic shipment reconciliation.
//!
//! Pulls the carrier status of every order with an active shipment in one
//! batch call and applies the derived transitions. The whole sweep runs in a
//! single unit-of-work session, so one poisonous order aborts the batch and
//! the next run starts from a clean state.

use super::OrderEngine;
use crate::OrderError;
use chrono::Utc;
use std::collections::HashMap;

/// Outcome of one reconciliation sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileSummary {
	/// Orders with an active shipment that were checked.
	pub scanned: usize,
	/// Orders whose shipment or order status changed and were persisted.
	pub updated: usize,
}

impl OrderEngine {
	/// Reconciles every active shipment against the carrier.
	///
	/// Only changed orders are persisted; a run over already-synchronized
	/// orders writes nothing, so the sweep is idempotent.
	pub async fn reconcile_shipments(&self) -> Result<ReconcileSummary, OrderError> {
		let mut session = self.store.begin().await;
		let mut orders = self
			.store
			.find_with_active_shipments(Some(&session))
			.await?;
		let scanned = orders.len();
		if orders.is_empty() {
			session.commit();
			return Ok(ReconcileSummary { scanned, updated: 0 });
		}

		let tracking_numbers: Vec<String> = orders
			.iter()
			.map(|order| order.shipment.tracking_number.clone())
			.collect();
		let events: HashMap<String, _> = self
			.carrier
			.fetch_status_batch(&tracking_numbers)
			.await?
			.into_iter()
			.map(|event| (event.tracking_number.clone(), event))
			.collect();

		let mut changed = Vec::new();
		for order in &mut orders {
			let Some(event) = events.get(&order.shipment.tracking_number) else {
				continue;
			};
			let previous = order.status;
			if self
				.apply_tracking_event(order, event, &mut session)
				.await?
			{
				order.updated_at = Utc::now();
				self.store.update(order, &mut session).await?;
				tracing::info!(
					order_id = %order.id,
					tracking_number = %order.shipment.tracking_number,
					from = %previous,
					to = %order.status,
					shipment_status = %event.status,
					"Shipment reconciled"
				);
				changed.push(order.clone());
			}
		}
		session.commit();

		for order in &changed {
			self.mirror_order(order).await;
		}

		let summary = ReconcileSummary {
			scanned,
			updated: changed.len(),
		};
		tracing::info!(scanned = summary.scanned, updated = summary.updated, "Reconciliation sweep done");
		Ok(summary)
	}
}
