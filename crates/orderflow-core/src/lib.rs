//! Core orchestration module for the orderflow system.
//!
//! Hosts the order workflow engine: transactional order creation, the guarded
//! status state machine, price computation, shipment reconciliation, the job
//! scheduler and the outbound notification worker. Collaborator backends are
//! injected through the builder from factory maps, so the engine itself never
//! knows which implementations it talks to.

pub mod builder;
pub mod engine;
pub mod notify;
pub mod pricing;
pub mod scheduler;
pub mod state;

pub use builder::{BuilderError, Orderflow, OrderflowBuilder, OrderflowFactories};
pub use engine::{OrderEngine, ReconcileSummary};
pub use notify::{Notification, NotificationQueue, NotifierInterface, TracingNotifier};
pub use scheduler::{InProcessLeaderLock, LeaderLock, Scheduler};
pub use state::TransitionEffect;

use orderflow_carrier::CarrierError;
use orderflow_customer::CustomerError;
use orderflow_inventory::InventoryError;
use orderflow_search::SearchError;
use orderflow_storage::StoreError;
use orderflow_types::OrderStatus;
use thiserror::Error;

/// Errors surfaced by the workflow engine.
///
/// Validation, not-found and business-rule failures are raised before any
/// write; collaborator failures inside the transactional phase abort the
/// whole unit of work.
#[derive(Debug, Error)]
pub enum OrderError {
	/// No order with the given id exists.
	#[error("Order with id \"{0}\" not found")]
	OrderNotFound(u64),
	/// The target status is never reachable manually.
	#[error("Status \"{0}\" cannot be assigned manually")]
	UnsupportedTransition(OrderStatus),
	/// The manual transition guard failed.
	#[error("Cannot move order from \"{current}\" to \"{target}\", required status: {required}")]
	InvalidTransition {
		current: OrderStatus,
		target: OrderStatus,
		required: &'static str,
	},
	/// Payment gate: the order is not paid and not cash-on-delivery.
	#[error("Order is not paid yet")]
	NotPaid,
	/// Cancellation is only possible before the parcel ships.
	#[error("Cannot cancel order in status \"{0}\"")]
	CannotCancel(OrderStatus),
	/// Shipped and finalized orders are immutable through the edit path.
	#[error("Cannot edit order in status \"{0}\"")]
	CannotEdit(OrderStatus),
	/// The requested payment method is not configured.
	#[error("Payment method \"{0}\" not found")]
	PaymentMethodNotFound(String),
	/// Order store failure.
	#[error(transparent)]
	Store(#[from] StoreError),
	/// Inventory ledger failure, including unknown SKUs and stock conflicts.
	#[error(transparent)]
	Inventory(#[from] InventoryError),
	/// Customer directory failure.
	#[error(transparent)]
	Customer(#[from] CustomerError),
	/// Carrier gateway failure.
	#[error(transparent)]
	Carrier(#[from] CarrierError),
	/// Search mirror failure on a read or reindex path.
	#[error(transparent)]
	Search(#[from] SearchError),
}
