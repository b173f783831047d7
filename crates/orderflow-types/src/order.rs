//! Order types for the workflow system.
//!
//! This module defines the central order entity, its line items, the
//! aggregate price block and the status enumeration that drives the
//! order state machine.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::payment::PaymentType;
use crate::shipment::Shipment;

/// The authoritative persisted order record.
///
/// An order is created by the creation workflow and afterwards mutated only
/// through the orchestrator's transactional update path. Customer identity
/// fields are a snapshot taken at creation time so that later customer edits
/// do not rewrite historical orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
	/// Unique identifier, allocated from the counter inside the creation
	/// transaction. Immutable.
	pub id: u64,
	/// Zero-padded display form of `id`. Immutable.
	pub id_for_customer: String,
	/// Identifier of the customer this order belongs to.
	pub customer_id: u64,
	/// Customer first name, snapshotted at creation.
	pub customer_first_name: String,
	/// Customer last name, snapshotted at creation.
	pub customer_last_name: String,
	/// Customer email, snapshotted at creation.
	pub customer_email: String,
	/// Customer phone number, snapshotted at creation.
	pub customer_phone: String,
	/// Customer discount percentage, snapshotted at creation.
	pub discount_percent: Decimal,
	/// Ordered line items.
	pub items: Vec<OrderItem>,
	/// Aggregate prices; always a pure function of `items`.
	pub prices: OrderPrices,
	/// Current workflow status. Assigned only by the orchestrator.
	pub status: OrderStatus,
	/// Shipment data, populated progressively as the order moves through
	/// packing and carrier hand-off.
	pub shipment: Shipment,
	/// Whether payment has been confirmed. Meaning depends on the payment
	/// type: cash-on-delivery orders are paid on receipt.
	pub is_order_paid: bool,
	/// Payment type of the chosen payment method.
	pub payment_type: PaymentType,
	/// Identifier of the chosen payment method.
	pub payment_method_id: String,
	/// Admin-facing display name of the payment method, snapshotted.
	pub payment_method_admin_name: String,
	/// Client-facing display name of the payment method, snapshotted.
	pub payment_method_client_name: String,
	/// Display name of the shipping method, snapshotted.
	pub shipping_method_name: String,
	/// Note visible to the client.
	#[serde(default)]
	pub client_note: String,
	/// Internal admin note.
	#[serde(default)]
	pub admin_note: String,
	/// Note left by the customer at checkout.
	#[serde(default)]
	pub customer_note: String,
	/// Whether a manager callback was requested.
	#[serde(default)]
	pub is_callback_needed: bool,
	/// Append-only audit trail of status and shipment changes.
	#[serde(default)]
	pub logs: Vec<LogEntry>,
	/// Timestamp when this order was created.
	pub created_at: DateTime<Utc>,
	/// Timestamp when this order was last updated.
	pub updated_at: DateTime<Utc>,
}

impl Order {
	/// Appends an audit log entry with the current time.
	pub fn push_log(&mut self, text: impl Into<String>) {
		self.logs.push(LogEntry {
			time: Utc::now(),
			text: text.into(),
		});
	}
}

/// A single purchasable line of an order.
///
/// `cost` and `total_cost` are derived values, recomputed by the pricing
/// module after every item mutation and never hand-set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
	/// Identifier of the product this item was taken from.
	pub product_id: u64,
	/// Identifier of the purchased variant within the product.
	pub variant_id: String,
	/// Stock-keeping unit of the variant.
	pub sku: String,
	/// Display name of the variant, snapshotted at creation.
	pub name: String,
	/// Purchased quantity.
	pub qty: u32,
	/// Unit price at the time of purchase.
	pub price: Decimal,
	/// Absolute discount applied to this line.
	pub discount_value: Decimal,
	/// Derived: `price * qty`.
	pub cost: Decimal,
	/// Derived: `cost - discount_value`.
	pub total_cost: Decimal,
	/// Product image shown in order listings.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub image_url: Option<String>,
	/// URL slug of the product.
	#[serde(default)]
	pub slug: String,
	/// Extra paid services attached to this line (gift wrap and similar).
	#[serde(default)]
	pub additional_services: Vec<AdditionalService>,
}

/// An extra paid service attached to a line item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdditionalService {
	pub id: u64,
	pub name: String,
	pub price: Decimal,
}

/// Aggregate price block of an order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderPrices {
	/// Sum of `items[].cost`.
	pub items_cost: Decimal,
	/// Sum of `items[].discount_value`.
	pub discount_value: Decimal,
	/// Sum of `items[].total_cost`.
	pub total_cost: Decimal,
}

/// One entry of the append-only order audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
	/// When the change was observed.
	pub time: DateTime<Utc>,
	/// Human-readable description of the change.
	pub text: String,
}

/// Status of an order in the workflow.
///
/// Serialized as stable SCREAMING_SNAKE_CASE tokens across all external
/// boundaries for forward compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
	/// Order has been placed but not yet taken into processing.
	New,
	/// Order is being processed by a manager.
	Processing,
	/// Items confirmed, the order awaits packing.
	ReadyToPack,
	/// Items packed, a carrier shipment document exists.
	Packed,
	/// Payment gate passed, the parcel awaits carrier pickup.
	ReadyToShip,
	/// The carrier picked the parcel up.
	Shipped,
	/// The recipient refused the parcel at delivery.
	RecipientDenied,
	/// The parcel travels back to the sender.
	Returning,
	/// The sender refused to accept the returned parcel. Terminal.
	RefusedToReturn,
	/// The parcel returned and items went back to stock. Terminal.
	Returned,
	/// The order was delivered and settled. Terminal.
	Finished,
	/// The order was canceled before shipping. Terminal.
	Canceled,
}

impl OrderStatus {
	/// Statuses after which no further transitions are permitted.
	pub const FINAL: [OrderStatus; 4] = [
		OrderStatus::Finished,
		OrderStatus::Canceled,
		OrderStatus::RefusedToReturn,
		OrderStatus::Returned,
	];

	/// Returns true for terminal statuses.
	pub fn is_final(&self) -> bool {
		Self::FINAL.contains(self)
	}

	/// Returns the stable string token of this status.
	pub fn as_token(&self) -> &'static str {
		match self {
			OrderStatus::New => "NEW",
			OrderStatus::Processing => "PROCESSING",
			OrderStatus::ReadyToPack => "READY_TO_PACK",
			OrderStatus::Packed => "PACKED",
			OrderStatus::ReadyToShip => "READY_TO_SHIP",
			OrderStatus::Shipped => "SHIPPED",
			OrderStatus::RecipientDenied => "RECIPIENT_DENIED",
			OrderStatus::Returning => "RETURNING",
			OrderStatus::RefusedToReturn => "REFUSED_TO_RETURN",
			OrderStatus::Returned => "RETURNED",
			OrderStatus::Finished => "FINISHED",
			OrderStatus::Canceled => "CANCELED",
		}
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_token())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn status_tokens_round_trip() {
		for status in [
			OrderStatus::New,
			OrderStatus::ReadyToPack,
			OrderStatus::RecipientDenied,
			OrderStatus::RefusedToReturn,
		] {
			let token = serde_json::to_string(&status).unwrap();
			assert_eq!(token, format!("\"{}\"", status.as_token()));
			let back: OrderStatus = serde_json::from_str(&token).unwrap();
			assert_eq!(back, status);
		}
	}

	#[test]
	fn final_statuses() {
		assert!(OrderStatus::Finished.is_final());
		assert!(OrderStatus::Canceled.is_final());
		assert!(OrderStatus::Returned.is_final());
		assert!(OrderStatus::RefusedToReturn.is_final());
		assert!(!OrderStatus::Shipped.is_final());
		assert!(!OrderStatus::RecipientDenied.is_final());
	}
}
