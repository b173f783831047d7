//! Shipment and address types.
//!
//! Defines the shipment block embedded in every order, the recipient and
//! sender addresses, the carrier status tokens and the patch/tracking
//! structures exchanged with the carrier gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Delivery point kind supported by the carrier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressType {
	/// Delivery to a carrier warehouse / pickup point.
	#[default]
	Warehouse,
	/// Courier delivery to the door.
	Doors,
}

impl AddressType {
	/// Display name used as the order's shipping method name.
	pub fn shipping_method_name(&self) -> &'static str {
		match self {
			AddressType::Warehouse => "Pickup from carrier warehouse",
			AddressType::Doors => "Courier delivery to the door",
		}
	}
}

/// A delivery address within a carrier-recognized settlement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Address {
	#[serde(default)]
	pub first_name: String,
	#[serde(default)]
	pub last_name: String,
	#[serde(default)]
	pub phone: String,
	/// Carrier-recognized delivery locality.
	#[serde(default)]
	pub settlement: String,
	/// Street address or warehouse number within the settlement.
	#[serde(default)]
	pub address: String,
	#[serde(default = "default_address_type")]
	pub address_type: AddressType,
}

fn default_address_type() -> AddressType {
	AddressType::Warehouse
}

impl Address {
	/// Two addresses are the same delivery point when settlement, address
	/// and type all match.
	pub fn is_same_place(&self, other: &Address) -> bool {
		self.settlement == other.settlement
			&& self.address == other.address
			&& self.address_type == other.address_type
	}
}

/// Sender side of a shipment, resolved from configuration when the
/// shipment document is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentSender {
	pub first_name: String,
	pub last_name: String,
	pub phone: String,
	pub settlement: String,
	pub address: String,
	pub address_type: AddressType,
}

/// Shipment block of an order.
///
/// `sender` and `tracking_number` are populated only once the order reaches
/// the packing stage and a carrier document is created.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Shipment {
	pub recipient: Address,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sender: Option<ShipmentSender>,
	#[serde(default)]
	pub tracking_number: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub status: Option<ShipmentStatus>,
	#[serde(default)]
	pub status_description: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub estimated_delivery_date: Option<DateTime<Utc>>,
	/// Parcel weight for the carrier document; carriers bill a default when
	/// absent.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub weight_kg: Option<f64>,
	/// Declared parcel value; the order total is used when absent.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub declared_value: Option<rust_decimal::Decimal>,
}

/// Carrier-reported shipment status.
///
/// Exchanged with the carrier gateway as stable snake_case tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
	/// The carrier awaits the parcel from the sender.
	AwaitingPickup,
	/// The parcel moves between carrier facilities.
	InTransit,
	/// The parcel arrived at the destination point.
	Arrived,
	/// The recipient received the parcel.
	Received,
	/// Cash-on-delivery money was picked up by the sender.
	CashPickedUp,
	/// The recipient refused the parcel.
	RecipientDenied,
	/// The parcel travels back to the sender.
	Returning,
}

// Logs and tracing render shipment statuses in the same register as order
// statuses; the snake_case wire tokens stay with serde.
impl fmt::Display for ShipmentStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let token = match self {
			ShipmentStatus::AwaitingPickup => "AWAITING_PICKUP",
			ShipmentStatus::InTransit => "IN_TRANSIT",
			ShipmentStatus::Arrived => "ARRIVED",
			ShipmentStatus::Received => "RECEIVED",
			ShipmentStatus::CashPickedUp => "CASH_PICKED_UP",
			ShipmentStatus::RecipientDenied => "RECIPIENT_DENIED",
			ShipmentStatus::Returning => "RETURNING",
		};
		f.write_str(token)
	}
}

/// Partial shipment update supplied by an admin.
///
/// Only present fields are applied; the tracking number is settable at most
/// once per packing attempt and changing it forces a status re-fetch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShipmentPatch {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub recipient: Option<Address>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tracking_number: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub weight_kg: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub declared_value: Option<rust_decimal::Decimal>,
}

impl Shipment {
	/// Applies the present fields of a patch onto this shipment.
	pub fn apply_patch(&mut self, patch: &ShipmentPatch) {
		if let Some(recipient) = &patch.recipient {
			self.recipient = recipient.clone();
		}
		if let Some(tracking_number) = &patch.tracking_number {
			self.tracking_number = tracking_number.clone();
		}
		if let Some(weight_kg) = patch.weight_kg {
			self.weight_kg = Some(weight_kg);
		}
		if let Some(declared_value) = patch.declared_value {
			self.declared_value = Some(declared_value);
		}
	}
}

/// Carrier answer to a shipment document creation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentDocument {
	pub tracking_number: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub estimated_delivery_date: Option<DateTime<Utc>>,
	pub status: ShipmentStatus,
	#[serde(default)]
	pub status_description: String,
}

/// One tracking record returned by the carrier status endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingEvent {
	pub tracking_number: String,
	pub status: ShipmentStatus,
	#[serde(default)]
	pub status_description: String,
}
