//! Customer directory module for the orderflow system.
//!
//! Resolves or creates customers from contact info, manages their saved
//! addresses, carts and lifetime spend. Mutations participate in the
//! caller's unit-of-work session.

use async_trait::async_trait;
use orderflow_storage::Session;
use orderflow_types::{Address, ConfigSchema};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod memory;
}

/// Errors that can occur during customer directory operations.
#[derive(Debug, Error)]
pub enum CustomerError {
	/// No customer with the given id exists.
	#[error("Customer with id \"{0}\" not found")]
	CustomerNotFound(u64),
	/// Error in the directory backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Error during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// A customer record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerRecord {
	pub id: u64,
	pub first_name: String,
	pub last_name: String,
	pub email: String,
	pub phone: String,
	/// Personal discount applied to new orders.
	#[serde(default)]
	pub discount_percent: Decimal,
	#[serde(default)]
	pub addresses: Vec<SavedAddress>,
	/// Lifetime spend, incremented when orders finish.
	#[serde(default)]
	pub total_spent: Decimal,
	/// Ids of the customer's orders.
	#[serde(default)]
	pub order_ids: Vec<u64>,
	/// Active cart, emptied when a client order is placed.
	#[serde(default)]
	pub cart: Vec<CartItem>,
}

/// A saved delivery address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedAddress {
	#[serde(flatten)]
	pub address: Address,
	#[serde(default)]
	pub is_default: bool,
}

/// One line of a customer's cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
	pub sku: String,
	pub qty: u32,
}

/// Data for creating a new customer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCustomer {
	pub first_name: String,
	pub last_name: String,
	pub email: String,
	pub phone: String,
	/// Saved as the default address when present.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub address: Option<Address>,
}

/// Trait defining the interface for customer directory backends.
#[async_trait]
pub trait CustomerInterface: Send + Sync {
	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Loads a customer by id.
	async fn get_by_id(&self, id: u64) -> Result<CustomerRecord, CustomerError>;

	/// Finds a customer by email or phone number.
	async fn resolve_by_contact(
		&self,
		email: &str,
		phone: &str,
	) -> Result<Option<CustomerRecord>, CustomerError>;

	/// Creates a new customer under the session.
	async fn create_customer(
		&self,
		dto: NewCustomer,
		session: &mut Session,
	) -> Result<CustomerRecord, CustomerError>;

	/// Saves an address on the customer, skipping addresses that point to
	/// the same delivery place as an existing one.
	async fn add_address(
		&self,
		customer_id: u64,
		address: Address,
		session: &mut Session,
	) -> Result<CustomerRecord, CustomerError>;

	/// Records an order id on the customer.
	async fn register_order(
		&self,
		customer_id: u64,
		order_id: u64,
		session: &mut Session,
	) -> Result<(), CustomerError>;

	/// Adds to the customer's lifetime spend.
	async fn increment_lifetime_spend(
		&self,
		customer_id: u64,
		amount: Decimal,
		session: &mut Session,
	) -> Result<(), CustomerError>;

	/// Empties the customer's active cart.
	async fn empty_cart(
		&self,
		customer_id: u64,
		session: &mut Session,
	) -> Result<(), CustomerError>;
}

/// Type alias for customer directory factory functions.
pub type CustomerFactory = fn(&toml::Value) -> Result<Box<dyn CustomerInterface>, CustomerError>;

/// Service that manages customer directory operations.
pub struct CustomerService {
	backend: Box<dyn CustomerInterface>,
}

impl CustomerService {
	/// Creates a new CustomerService with the specified backend.
	pub fn new(backend: Box<dyn CustomerInterface>) -> Self {
		Self { backend }
	}

	/// Loads a customer by id.
	pub async fn get_by_id(&self, id: u64) -> Result<CustomerRecord, CustomerError> {
		self.backend.get_by_id(id).await
	}

	/// Finds a customer by email or phone number.
	pub async fn resolve_by_contact(
		&self,
		email: &str,
		phone: &str,
	) -> Result<Option<CustomerRecord>, CustomerError> {
		self.backend.resolve_by_contact(email, phone).await
	}

	/// Creates a new customer under the session.
	pub async fn create_customer(
		&self,
		dto: NewCustomer,
		session: &mut Session,
	) -> Result<CustomerRecord, CustomerError> {
		self.backend.create_customer(dto, session).await
	}

	/// Saves an address on the customer.
	pub async fn add_address(
		&self,
		customer_id: u64,
		address: Address,
		session: &mut Session,
	) -> Result<CustomerRecord, CustomerError> {
		self.backend.add_address(customer_id, address, session).await
	}

	/// Records an order id on the customer.
	pub async fn register_order(
		&self,
		customer_id: u64,
		order_id: u64,
		session: &mut Session,
	) -> Result<(), CustomerError> {
		self.backend
			.register_order(customer_id, order_id, session)
			.await
	}

	/// Adds to the customer's lifetime spend.
	pub async fn increment_lifetime_spend(
		&self,
		customer_id: u64,
		amount: Decimal,
		session: &mut Session,
	) -> Result<(), CustomerError> {
		self.backend
			.increment_lifetime_spend(customer_id, amount, session)
			.await
	}

	/// Empties the customer's active cart.
	pub async fn empty_cart(
		&self,
		customer_id: u64,
		session: &mut Session,
	) -> Result<(), CustomerError> {
		self.backend.empty_cart(customer_id, session).await
	}
}
