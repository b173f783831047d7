//! Configuration module for the orderflow system.
//!
//! Provides structures and utilities for managing workflow configuration.
//! Configuration is loaded from TOML files, environment variable references
//! are resolved, and the result is validated before the engine is built.

use orderflow_types::{PaymentMethod, ShipmentSender};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		let message = err.message().to_string();
		ConfigError::Parse(message)
	}
}

/// Main configuration structure for the orderflow service.
///
/// Contains all configuration sections required for the workflow to operate:
/// service identity, the order store, the inventory ledger, the customer
/// directory, the carrier gateway, the search mirror, payment methods and
/// the background jobs.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Configuration specific to this service instance.
	pub service: ServiceConfig,
	/// Configuration for the order store backend.
	pub storage: StorageConfig,
	/// Configuration for the inventory ledger.
	pub inventory: BackendConfig,
	/// Configuration for the customer directory.
	pub customer: BackendConfig,
	/// Configuration for the carrier gateway.
	pub carrier: CarrierConfig,
	/// Configuration for the search mirror.
	pub search: BackendConfig,
	/// Payment methods offered at checkout.
	pub payment_methods: Vec<PaymentMethod>,
	/// Background job schedule.
	#[serde(default)]
	pub jobs: JobsConfig,
	/// Outbound notification delivery.
	#[serde(default)]
	pub notifications: NotificationsConfig,
}

/// Configuration specific to this service instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
	/// Unique identifier for this service instance.
	pub id: String,
	/// Whether this instance runs the scheduled jobs.
	/// Only one instance of a deployment should set this.
	#[serde(default = "default_primary_instance")]
	pub primary_instance: bool,
}

fn default_primary_instance() -> bool {
	true
}

/// Configuration for the order store backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
	/// Name of the counter collection used for order ids.
	#[serde(default = "default_order_counter")]
	pub order_counter: String,
}

fn default_order_counter() -> String {
	"orders".to_string()
}

/// Configuration for a single-backend collaborator.
///
/// Used by the inventory ledger, the customer directory and the search
/// mirror, which each run exactly one backend at a time.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the carrier gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CarrierConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of carrier implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
	/// Sender side stamped onto every shipment document.
	pub sender: ShipmentSender,
}

/// Background job schedule.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobsConfig {
	/// Whether the scheduled jobs run at all.
	#[serde(default = "default_jobs_enabled")]
	pub enabled: bool,
	/// Interval in seconds between shipment reconciliation runs.
	#[serde(default = "default_reconcile_interval")]
	pub reconcile_interval_seconds: u64,
	/// Interval in seconds between order count cache refreshes.
	#[serde(default = "default_count_cache_interval")]
	pub count_cache_interval_seconds: u64,
	/// Interval in seconds between full search reindex runs. Disabled when
	/// absent.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub reindex_interval_seconds: Option<u64>,
}

fn default_jobs_enabled() -> bool {
	true
}

/// Hourly, matching the carrier's own status update cadence.
fn default_reconcile_interval() -> u64 {
	3600
}

fn default_count_cache_interval() -> u64 {
	1800
}

impl Default for JobsConfig {
	fn default() -> Self {
		Self {
			enabled: default_jobs_enabled(),
			reconcile_interval_seconds: default_reconcile_interval(),
			count_cache_interval_seconds: default_count_cache_interval(),
			reindex_interval_seconds: None,
		}
	}
}

/// Outbound notification delivery settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationsConfig {
	/// Maximum delivery attempts per notification.
	#[serde(default = "default_max_attempts")]
	pub max_attempts: u32,
	/// Initial backoff in seconds between delivery attempts.
	#[serde(default = "default_initial_backoff")]
	pub initial_backoff_seconds: u64,
}

fn default_max_attempts() -> u32 {
	5
}

fn default_initial_backoff() -> u64 {
	2
}

impl Default for NotificationsConfig {
	fn default() -> Self {
		Self {
			max_attempts: default_max_attempts(),
			initial_backoff_seconds: default_initial_backoff(),
		}
	}
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = input.to_string();
	let mut replacements = Vec::new();

	for cap in re.captures_iter(input) {
		let full_match = cap.get(0).unwrap();
		let var_name = cap.get(1).unwrap().as_str();
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name) {
			Ok(v) => v,
			Err(_) => {
				if let Some(default) = default_value {
					default.to_string()
				} else {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name
					)));
				}
			},
		};

		replacements.push((full_match.start(), full_match.end(), value));
	}

	// Apply replacements in reverse order to maintain positions
	for (start, end, value) in replacements.iter().rev() {
		result.replace_range(start..end, value);
	}

	Ok(result)
}

fn validate_backend(section: &str, primary: &str, implementations: &HashMap<String, toml::Value>) -> Result<(), ConfigError> {
	if implementations.is_empty() {
		return Err(ConfigError::Validation(format!(
			"At least one {} implementation must be configured",
			section
		)));
	}
	if primary.is_empty() {
		return Err(ConfigError::Validation(format!(
			"{} primary implementation cannot be empty",
			section
		)));
	}
	if !implementations.contains_key(primary) {
		return Err(ConfigError::Validation(format!(
			"Primary {} '{}' not found in implementations",
			section, primary
		)));
	}
	Ok(())
}

impl Config {
	/// Loads configuration from a file with environment variable resolution.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let raw = tokio::fs::read_to_string(path).await?;
		raw.parse()
	}

	/// Validates the configuration to ensure all required fields are properly set.
	///
	/// - Ensures the service id is not empty
	/// - Checks every collaborator names a configured primary implementation
	/// - Requires at least one payment method with unique ids
	/// - Bounds the job intervals
	fn validate(&self) -> Result<(), ConfigError> {
		if self.service.id.is_empty() {
			return Err(ConfigError::Validation("Service id cannot be empty".into()));
		}

		validate_backend(
			"storage",
			&self.storage.primary,
			&self.storage.implementations,
		)?;
		validate_backend(
			"inventory",
			&self.inventory.primary,
			&self.inventory.implementations,
		)?;
		validate_backend(
			"customer",
			&self.customer.primary,
			&self.customer.implementations,
		)?;
		validate_backend(
			"carrier",
			&self.carrier.primary,
			&self.carrier.implementations,
		)?;
		validate_backend("search", &self.search.primary, &self.search.implementations)?;

		if self.payment_methods.is_empty() {
			return Err(ConfigError::Validation(
				"At least one payment method must be configured".into(),
			));
		}
		let mut seen_ids = std::collections::HashSet::new();
		for method in &self.payment_methods {
			if !seen_ids.insert(method.id.as_str()) {
				return Err(ConfigError::Validation(format!(
					"Duplicate payment method id '{}'",
					method.id
				)));
			}
		}

		if self.jobs.reconcile_interval_seconds == 0 {
			return Err(ConfigError::Validation(
				"jobs.reconcile_interval_seconds must be greater than 0".into(),
			));
		}
		if self.jobs.reconcile_interval_seconds > 86400 {
			return Err(ConfigError::Validation(
				"jobs.reconcile_interval_seconds cannot exceed 86400 (24 hours)".into(),
			));
		}
		if self.jobs.count_cache_interval_seconds == 0 {
			return Err(ConfigError::Validation(
				"jobs.count_cache_interval_seconds must be greater than 0".into(),
			));
		}
		if self.notifications.max_attempts == 0 {
			return Err(ConfigError::Validation(
				"notifications.max_attempts must be at least 1".into(),
			));
		}

		Ok(())
	}
}

/// Parses configuration from a TOML string.
///
/// Environment variables are resolved and the configuration is validated
/// after parsing.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const VALID_CONFIG: &str = r#"
[service]
id = "orderflow-main"

[storage]
primary = "memory"
[storage.implementations.memory]

[inventory]
primary = "memory"
[inventory.implementations.memory]

[customer]
primary = "memory"
[customer.implementations.memory]

[carrier]
primary = "mock"
[carrier.implementations.mock]
[carrier.sender]
first_name = "Shop"
last_name = "Sender"
phone = "+380440000000"
settlement = "Lviv"
address = "Warehouse 1"
address_type = "warehouse"

[search]
primary = "memory"
[search.implementations.memory]

[[payment_methods]]
id = "cod"
payment_type = "cash_on_delivery"
admin_name = "Cash on delivery"
client_name = "Pay on pickup"

[[payment_methods]]
id = "card"
payment_type = "online_payment"
admin_name = "Card online"
client_name = "Pay by card"
"#;

	#[test]
	fn parses_valid_config_with_defaults() {
		let config: Config = VALID_CONFIG.parse().unwrap();
		assert_eq!(config.service.id, "orderflow-main");
		assert!(config.service.primary_instance);
		assert_eq!(config.jobs.reconcile_interval_seconds, 3600);
		assert_eq!(config.jobs.count_cache_interval_seconds, 1800);
		assert_eq!(config.storage.order_counter, "orders");
		assert_eq!(config.payment_methods.len(), 2);
	}

	#[test]
	fn env_var_resolution() {
		std::env::set_var("ORDERFLOW_TEST_KEY", "secret");
		let input = "api_key = \"${ORDERFLOW_TEST_KEY}\"";
		assert_eq!(
			resolve_env_vars(input).unwrap(),
			"api_key = \"secret\"".to_string()
		);
		std::env::remove_var("ORDERFLOW_TEST_KEY");

		let with_default = "api_key = \"${ORDERFLOW_MISSING:-fallback}\"";
		assert_eq!(
			resolve_env_vars(with_default).unwrap(),
			"api_key = \"fallback\"".to_string()
		);

		assert!(resolve_env_vars("x = \"${ORDERFLOW_MISSING}\"").is_err());
	}

	#[test]
	fn rejects_unknown_primary() {
		let broken = VALID_CONFIG.replace("primary = \"mock\"", "primary = \"nova\"");
		let err = broken.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("'nova' not found"));
	}

	#[test]
	fn rejects_duplicate_payment_method_ids() {
		let broken = VALID_CONFIG.replace("id = \"card\"", "id = \"cod\"");
		let err = broken.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("Duplicate payment method id"));
	}

	#[test]
	fn rejects_zero_reconcile_interval() {
		let broken = format!(
			"{}\n[jobs]\nreconcile_interval_seconds = 0\n",
			VALID_CONFIG
		);
		let err = broken.parse::<Config>().unwrap_err();
		assert!(err
			.to_string()
			.contains("reconcile_interval_seconds must be greater than 0"));
	}

	#[tokio::test]
	async fn loads_from_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("config.toml");
		tokio::fs::write(&path, VALID_CONFIG).await.unwrap();
		let config = Config::from_file(path.to_str().unwrap()).await.unwrap();
		assert_eq!(config.service.id, "orderflow-main");
	}
}
