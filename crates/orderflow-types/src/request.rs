//! Request DTOs for order creation and mutation.
//!
//! These are the inputs of the orchestrator operations. Server-managed
//! fields (id, status, prices, logs, customer snapshot) do not appear here:
//! the edit path merges an explicit allow-list instead of copying arbitrary
//! keys onto the order.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::order::{AdditionalService, OrderStatus};
use crate::shipment::{Address, ShipmentPatch};

/// A requested line item, resolved against the inventory catalog by SKU.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderItem {
	pub sku: String,
	pub qty: u32,
	#[serde(default)]
	pub discount_value: Decimal,
	#[serde(default)]
	pub additional_services: Vec<AdditionalService>,
}

/// Administrative order creation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminCreateOrder {
	/// Existing customer to attach the order to; when absent the customer
	/// is resolved by contact info or created.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub customer_id: Option<u64>,
	#[serde(default)]
	pub customer_first_name: String,
	#[serde(default)]
	pub customer_last_name: String,
	#[serde(default)]
	pub customer_email: String,
	#[serde(default)]
	pub customer_phone: String,
	/// Whether to save the shipping address on the customer record.
	#[serde(default)]
	pub should_save_address: bool,
	pub recipient: Address,
	pub items: Vec<NewOrderItem>,
	pub payment_method_id: String,
	#[serde(default)]
	pub admin_note: String,
	#[serde(default)]
	pub is_callback_needed: bool,
	/// Historical-data import: skips id/price/status assignment and
	/// inventory reservation, keeping the supplied values.
	#[serde(default)]
	pub migrate: Option<MigratedOrderData>,
	/// Tracking number carried over from an external system, if any.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tracking_number: Option<String>,
}

/// Fields preserved verbatim during historical-data migration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigratedOrderData {
	pub id: u64,
	pub status: OrderStatus,
	pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Client checkout request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientCreateOrder {
	pub email: String,
	pub address: Address,
	pub items: Vec<NewOrderItem>,
	pub payment_method_id: String,
	#[serde(default)]
	pub customer_note: String,
	#[serde(default)]
	pub is_callback_needed: bool,
}

/// Explicit allow-list of order fields mutable through the edit workflow.
///
/// Only present fields are applied. Status, logs, prices and the customer
/// snapshot are deliberately absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditOrder {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub items: Option<Vec<NewOrderItem>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub shipment: Option<ShipmentPatch>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub payment_method_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub client_note: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub admin_note: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub customer_note: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub is_callback_needed: Option<bool>,
}

/// Listing filter for order queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderFilter {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub customer_id: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub status: Option<OrderStatus>,
	/// Free-text term matched against indexed order fields.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub term: Option<String>,
	#[serde(default)]
	pub skip: usize,
	#[serde(default = "default_limit")]
	pub limit: usize,
}

fn default_limit() -> usize {
	25
}

// Hand-written so a programmatically built filter gets the same page size
// as a deserialized one, not a zero limit.
impl Default for OrderFilter {
	fn default() -> Self {
		Self {
			customer_id: None,
			status: None,
			term: None,
			skip: 0,
			limit: default_limit(),
		}
	}
}

impl OrderFilter {
	/// True when the filter needs the search index rather than a store scan.
	pub fn needs_search(&self) -> bool {
		self.term.is_some() || self.status.is_some()
	}
}
