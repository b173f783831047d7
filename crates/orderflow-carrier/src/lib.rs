//! Carrier gateway module for the orderflow system.
//!
//! Wraps the external shipping carrier behind a trait: creating shipment
//! documents when an order is packed and fetching tracking statuses for the
//! reconciliation job. Implementations map carrier-specific status codes to
//! the shared [`ShipmentStatus`] tokens.

use async_trait::async_trait;
use orderflow_types::{
	Address, ConfigSchema, PaymentType, ShipmentDocument, ShipmentSender, ShipmentStatus,
	TrackingEvent,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod http;
	pub mod mock;
}

/// Errors that can occur during carrier operations.
#[derive(Debug, Error)]
pub enum CarrierError {
	/// The carrier endpoint could not be reached.
	#[error("Network error: {0}")]
	Network(String),
	/// The carrier answered with an error.
	#[error("Carrier rejected the request: {0}")]
	Api(String),
	/// Error during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Data needed to create a shipment document with the carrier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentRequest {
	pub recipient: Address,
	pub sender: ShipmentSender,
	pub payment_type: PaymentType,
	/// Declared parcel value, also the cash-on-delivery amount when the
	/// payment type is cash on delivery.
	pub declared_value: Decimal,
	#[serde(default = "default_weight_kg")]
	pub weight_kg: f64,
	/// Parcel description printed on the waybill.
	#[serde(default)]
	pub description: String,
}

fn default_weight_kg() -> f64 {
	1.0
}

/// Trait defining the interface for carrier backends.
#[async_trait]
pub trait CarrierInterface: Send + Sync {
	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Registers a shipment with the carrier and returns the document.
	async fn create_shipment(
		&self,
		request: &ShipmentRequest,
	) -> Result<ShipmentDocument, CarrierError>;

	/// Fetches the current status of one tracking number.
	///
	/// Returns `None` when the carrier does not know the number yet or
	/// reports a status outside the recognized set.
	async fn fetch_status(
		&self,
		tracking_number: &str,
	) -> Result<Option<TrackingEvent>, CarrierError>;

	/// Fetches statuses for a batch of tracking numbers.
	///
	/// Numbers the carrier cannot resolve are absent from the result.
	async fn fetch_status_batch(
		&self,
		tracking_numbers: &[String],
	) -> Result<Vec<TrackingEvent>, CarrierError>;
}

/// Type alias for carrier factory functions.
pub type CarrierFactory = fn(&toml::Value) -> Result<Box<dyn CarrierInterface>, CarrierError>;

/// Service that manages carrier operations.
pub struct CarrierService {
	backend: Box<dyn CarrierInterface>,
}

impl CarrierService {
	/// Creates a new CarrierService with the specified backend.
	pub fn new(backend: Box<dyn CarrierInterface>) -> Self {
		Self { backend }
	}

	/// Registers a shipment with the carrier and returns the document.
	pub async fn create_shipment(
		&self,
		request: &ShipmentRequest,
	) -> Result<ShipmentDocument, CarrierError> {
		self.backend.create_shipment(request).await
	}

	/// Fetches the current status of one tracking number.
	pub async fn fetch_status(
		&self,
		tracking_number: &str,
	) -> Result<Option<TrackingEvent>, CarrierError> {
		self.backend.fetch_status(tracking_number).await
	}

	/// Fetches statuses for a batch of tracking numbers.
	pub async fn fetch_status_batch(
		&self,
		tracking_numbers: &[String],
	) -> Result<Vec<TrackingEvent>, CarrierError> {
		self.backend.fetch_status_batch(tracking_numbers).await
	}
}

/// Maps a carrier status code to the shared status token.
///
/// Codes outside the table are not actionable for the workflow and map to
/// `None` so callers can skip them.
pub fn map_status_code(code: u32) -> Option<ShipmentStatus> {
	match code {
		1..=3 => Some(ShipmentStatus::AwaitingPickup),
		4..=6 | 41 => Some(ShipmentStatus::InTransit),
		7 | 8 => Some(ShipmentStatus::Arrived),
		9 => Some(ShipmentStatus::Received),
		10 | 11 => Some(ShipmentStatus::CashPickedUp),
		102 | 103 => Some(ShipmentStatus::RecipientDenied),
		104 | 105 => Some(ShipmentStatus::Returning),
		_ => None,
	}
}
