//! Mock carrier implementation for testing and development.
//!
//! Issues sequential tracking numbers, remembers every created shipment and
//! lets tests move a shipment through carrier statuses with [`MockCarrier::set_status`].
//! A one-shot failure switch simulates an unreachable carrier.

use crate::{CarrierError, CarrierInterface, ShipmentRequest};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use orderflow_types::{
	ConfigSchema, Schema, ShipmentDocument, ShipmentStatus, TrackingEvent, ValidationError,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct State {
	next_seq: u64,
	events: HashMap<String, TrackingEvent>,
}

/// Mock carrier that keeps shipments in memory. Clones share state.
#[derive(Clone)]
pub struct MockCarrier {
	state: Arc<Mutex<State>>,
	fail_next: Arc<AtomicBool>,
}

impl MockCarrier {
	/// Creates an empty mock carrier.
	pub fn new() -> Self {
		Self {
			state: Arc::new(Mutex::new(State::default())),
			fail_next: Arc::new(AtomicBool::new(false)),
		}
	}

	/// Makes the next carrier call fail with a network error.
	pub fn fail_next_call(&self) {
		self.fail_next.store(true, Ordering::SeqCst);
	}

	/// Moves a tracking number to the given status.
	pub fn set_status(&self, tracking_number: &str, status: ShipmentStatus, description: &str) {
		let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
		state.events.insert(
			tracking_number.to_string(),
			TrackingEvent {
				tracking_number: tracking_number.to_string(),
				status,
				status_description: description.to_string(),
			},
		);
	}

	fn check_failure(&self) -> Result<(), CarrierError> {
		if self.fail_next.swap(false, Ordering::SeqCst) {
			return Err(CarrierError::Network("mock carrier unreachable".to_string()));
		}
		Ok(())
	}
}

impl Default for MockCarrier {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl CarrierInterface for MockCarrier {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MockCarrierSchema)
	}

	async fn create_shipment(
		&self,
		_request: &ShipmentRequest,
	) -> Result<ShipmentDocument, CarrierError> {
		self.check_failure()?;
		let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
		state.next_seq += 1;
		let tracking_number = format!("2045{:010}", state.next_seq);
		state.events.insert(
			tracking_number.clone(),
			TrackingEvent {
				tracking_number: tracking_number.clone(),
				status: ShipmentStatus::AwaitingPickup,
				status_description: "Awaiting pickup from sender".to_string(),
			},
		);
		Ok(ShipmentDocument {
			tracking_number,
			estimated_delivery_date: Some(Utc::now() + Duration::days(3)),
			status: ShipmentStatus::AwaitingPickup,
			status_description: "Awaiting pickup from sender".to_string(),
		})
	}

	async fn fetch_status(
		&self,
		tracking_number: &str,
	) -> Result<Option<TrackingEvent>, CarrierError> {
		self.check_failure()?;
		let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
		Ok(state.events.get(tracking_number).cloned())
	}

	async fn fetch_status_batch(
		&self,
		tracking_numbers: &[String],
	) -> Result<Vec<TrackingEvent>, CarrierError> {
		self.check_failure()?;
		let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
		Ok(tracking_numbers
			.iter()
			.filter_map(|number| state.events.get(number).cloned())
			.collect())
	}
}

/// Configuration schema for MockCarrier.
pub struct MockCarrierSchema;

impl ConfigSchema for MockCarrierSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		// Mock carrier has no required configuration
		Schema::new(vec![], vec![]).validate(config)
	}
}

/// Factory function to create a mock carrier from configuration.
pub fn create_carrier(_config: &toml::Value) -> Result<Box<dyn CarrierInterface>, CarrierError> {
	Ok(Box::new(MockCarrier::new()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use orderflow_types::{Address, AddressType, PaymentType, ShipmentSender};
	use rust_decimal::Decimal;

	fn request() -> ShipmentRequest {
		ShipmentRequest {
			recipient: Address {
				first_name: "Anna".into(),
				last_name: "Koval".into(),
				phone: "+380501112233".into(),
				settlement: "Kyiv".into(),
				address: "Warehouse 12".into(),
				address_type: AddressType::Warehouse,
			},
			sender: ShipmentSender {
				first_name: "Shop".into(),
				last_name: "Sender".into(),
				phone: "+380440000000".into(),
				settlement: "Lviv".into(),
				address: "Warehouse 1".into(),
				address_type: AddressType::Warehouse,
			},
			payment_type: PaymentType::CashOnDelivery,
			declared_value: Decimal::from(230),
			weight_kg: 1.0,
			description: "Order #00001".into(),
		}
	}

	#[tokio::test]
	async fn issues_sequential_tracking_numbers() {
		let carrier = MockCarrier::new();
		let first = carrier.create_shipment(&request()).await.unwrap();
		let second = carrier.create_shipment(&request()).await.unwrap();
		assert_eq!(first.tracking_number, "20450000000001");
		assert_eq!(second.tracking_number, "20450000000002");
		assert_eq!(first.status, ShipmentStatus::AwaitingPickup);
	}

	#[tokio::test]
	async fn tracks_created_shipments() {
		let carrier = MockCarrier::new();
		let document = carrier.create_shipment(&request()).await.unwrap();

		carrier.set_status(
			&document.tracking_number,
			ShipmentStatus::Received,
			"Parcel received",
		);
		let event = carrier
			.fetch_status(&document.tracking_number)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(event.status, ShipmentStatus::Received);

		let batch = carrier
			.fetch_status_batch(&[
				document.tracking_number.clone(),
				"20459999999999".to_string(),
			])
			.await
			.unwrap();
		assert_eq!(batch.len(), 1);
	}

	#[tokio::test]
	async fn failure_switch_is_one_shot() {
		let carrier = MockCarrier::new();
		carrier.fail_next_call();
		assert!(matches!(
			carrier.create_shipment(&request()).await,
			Err(CarrierError::Network(_))
		));
		assert!(carrier.create_shipment(&request()).await.is_ok());
	}
}
