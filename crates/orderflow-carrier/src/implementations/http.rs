//! HTTP carrier gateway implementation.
//!
//! Talks to the carrier's JSON API: one POST endpoint that dispatches on a
//! `method` field. Shipment documents are created with `create_document`,
//! tracking statuses are read with `track_documents`. Carrier status codes
//! are translated through [`map_status_code`]; unknown codes are skipped.

use crate::{map_status_code, CarrierError, CarrierInterface, ShipmentRequest};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use orderflow_types::{
	AddressType, ConfigSchema, Field, FieldType, PaymentType, Schema, ShipmentDocument,
	ShipmentStatus, TrackingEvent, ValidationError,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

/// Configuration for the HTTP carrier gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpCarrierConfig {
	/// Base URL of the carrier JSON API.
	pub endpoint: String,
	/// API key sent with every request.
	pub api_key: String,
	/// Request timeout in seconds.
	#[serde(default = "default_timeout_seconds")]
	pub timeout_seconds: u64,
}

fn default_timeout_seconds() -> u64 {
	30
}

/// HTTP carrier gateway.
pub struct HttpCarrier {
	config: HttpCarrierConfig,
	client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
	api_key: &'a str,
	method: &'a str,
	payload: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
	#[serde(default)]
	success: bool,
	#[serde(default)]
	errors: Vec<String>,
	#[serde(default = "Vec::new")]
	data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct DocumentData {
	tracking_number: String,
	#[serde(default)]
	estimated_delivery_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TrackingData {
	tracking_number: String,
	status_code: u32,
	#[serde(default)]
	status: String,
}

impl HttpCarrier {
	/// Creates a new gateway from validated configuration.
	pub fn new(config: HttpCarrierConfig) -> Result<Self, CarrierError> {
		let client = reqwest::Client::builder()
			.timeout(Duration::from_secs(config.timeout_seconds))
			.build()
			.map_err(|e| CarrierError::Configuration(e.to_string()))?;
		Ok(Self { config, client })
	}

	async fn call<T>(
		&self,
		method: &str,
		payload: serde_json::Value,
	) -> Result<Vec<T>, CarrierError>
	where
		T: serde::de::DeserializeOwned,
	{
		let request = ApiRequest {
			api_key: &self.config.api_key,
			method,
			payload,
		};
		let response = self
			.client
			.post(&self.config.endpoint)
			.json(&request)
			.send()
			.await
			.map_err(|e| CarrierError::Network(e.to_string()))?;
		let response: ApiResponse<T> = response
			.json()
			.await
			.map_err(|e| CarrierError::Network(e.to_string()))?;
		if !response.success {
			return Err(CarrierError::Api(response.errors.join("; ")));
		}
		Ok(response.data)
	}
}

fn service_type(sender: AddressType, recipient: AddressType) -> &'static str {
	match (sender, recipient) {
		(AddressType::Warehouse, AddressType::Warehouse) => "warehouse_warehouse",
		(AddressType::Warehouse, AddressType::Doors) => "warehouse_doors",
		(AddressType::Doors, AddressType::Warehouse) => "doors_warehouse",
		(AddressType::Doors, AddressType::Doors) => "doors_doors",
	}
}

fn parse_delivery_date(raw: &Option<String>) -> Option<DateTime<Utc>> {
	let raw = raw.as_deref()?;
	let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
	let time = date.and_hms_opt(0, 0, 0)?;
	Some(DateTime::from_naive_utc_and_offset(time, Utc))
}

#[async_trait]
impl CarrierInterface for HttpCarrier {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(HttpCarrierSchema)
	}

	async fn create_shipment(
		&self,
		request: &ShipmentRequest,
	) -> Result<ShipmentDocument, CarrierError> {
		let payload = json!({
			"sender": {
				"name": format!("{} {}", request.sender.first_name, request.sender.last_name),
				"phone": request.sender.phone,
				"settlement": request.sender.settlement,
				"address": request.sender.address,
			},
			"recipient": {
				"name": format!("{} {}", request.recipient.first_name, request.recipient.last_name),
				"phone": request.recipient.phone,
				"settlement": request.recipient.settlement,
				"address": request.recipient.address,
			},
			"service_type": service_type(
				request.sender.address_type,
				request.recipient.address_type,
			),
			"weight_kg": request.weight_kg,
			"declared_value": request.declared_value,
			"description": request.description,
			"cash_on_delivery": matches!(request.payment_type, PaymentType::CashOnDelivery)
				.then_some(request.declared_value),
		});

		let mut documents: Vec<DocumentData> = self.call("create_document", payload).await?;
		let document = documents
			.pop()
			.ok_or_else(|| CarrierError::Api("empty create_document response".to_string()))?;

		Ok(ShipmentDocument {
			estimated_delivery_date: parse_delivery_date(&document.estimated_delivery_date),
			tracking_number: document.tracking_number,
			status: ShipmentStatus::AwaitingPickup,
			status_description: String::new(),
		})
	}

	async fn fetch_status(
		&self,
		tracking_number: &str,
	) -> Result<Option<TrackingEvent>, CarrierError> {
		let numbers = [tracking_number.to_string()];
		let events = self.fetch_status_batch(&numbers).await?;
		Ok(events.into_iter().next())
	}

	async fn fetch_status_batch(
		&self,
		tracking_numbers: &[String],
	) -> Result<Vec<TrackingEvent>, CarrierError> {
		if tracking_numbers.is_empty() {
			return Ok(Vec::new());
		}
		let payload = json!({ "documents": tracking_numbers });
		let records: Vec<TrackingData> = self.call("track_documents", payload).await?;
		Ok(records
			.into_iter()
			.filter_map(|record| {
				map_status_code(record.status_code).map(|status| TrackingEvent {
					tracking_number: record.tracking_number,
					status,
					status_description: record.status,
				})
			})
			.collect())
	}
}

/// Configuration schema for HttpCarrier.
pub struct HttpCarrierSchema;

impl ConfigSchema for HttpCarrierSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			// Required fields
			vec![
				Field::new("endpoint", FieldType::String),
				Field::new("api_key", FieldType::String),
			],
			// Optional fields
			vec![Field::new(
				"timeout_seconds",
				FieldType::Integer {
					min: Some(1),
					max: Some(300),
				},
			)],
		);
		schema.validate(config)
	}
}

/// Factory function to create an HTTP carrier gateway from configuration.
///
/// Configuration parameters:
/// - `endpoint`: base URL of the carrier JSON API.
/// - `api_key`: API key sent with every request.
/// - `timeout_seconds` (optional): request timeout, default 30.
pub fn create_carrier(config: &toml::Value) -> Result<Box<dyn CarrierInterface>, CarrierError> {
	HttpCarrierSchema
		.validate(config)
		.map_err(|e| CarrierError::Configuration(e.to_string()))?;
	let config: HttpCarrierConfig = config
		.clone()
		.try_into()
		.map_err(|e: toml::de::Error| CarrierError::Configuration(e.to_string()))?;
	Ok(Box::new(HttpCarrier::new(config)?))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn schema_requires_endpoint_and_key() {
		let valid: toml::Value = toml::from_str(
			r#"
			endpoint = "https://api.carrier.example/v2"
			api_key = "secret"
			"#,
		)
		.unwrap();
		assert!(HttpCarrierSchema.validate(&valid).is_ok());

		let missing: toml::Value = toml::from_str(r#"endpoint = "https://x""#).unwrap();
		assert!(HttpCarrierSchema.validate(&missing).is_err());
	}

	#[test]
	fn delivery_date_parses_plain_dates() {
		let parsed = parse_delivery_date(&Some("2026-03-02".to_string())).unwrap();
		assert_eq!(parsed.to_rfc3339(), "2026-03-02T00:00:00+00:00");
		assert!(parse_delivery_date(&Some("tomorrow".to_string())).is_none());
		assert!(parse_delivery_date(&None).is_none());
	}

	#[test]
	fn service_type_covers_all_pairs() {
		assert_eq!(
			service_type(AddressType::Warehouse, AddressType::Doors),
			"warehouse_doors"
		);
		assert_eq!(
			service_type(AddressType::Doors, AddressType::Doors),
			"doors_doors"
		);
	}
}
