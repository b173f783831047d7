//! Inventory ledger module for the orderflow system.
//!
//! Tracks, per SKU, the purchasable variant record (catalog data used to
//! snapshot line items) together with quantity in stock and the quantities
//! reserved against open orders. Mutations participate in the caller's
//! unit-of-work session and roll back on abort.

use async_trait::async_trait;
use orderflow_storage::Session;
use orderflow_types::ConfigSchema;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod memory;
}

/// Errors that can occur during inventory operations.
#[derive(Debug, Error)]
pub enum InventoryError {
	/// No variant with the given SKU exists.
	#[error("Product with sku \"{0}\" not found")]
	SkuNotFound(String),
	/// Requested quantity exceeds the sellable stock.
	#[error(
		"Not enough quantity in stock of sku \"{sku}\". You are trying to add: {requested}. In stock: {in_stock}"
	)]
	InsufficientStock {
		sku: String,
		requested: u32,
		in_stock: u32,
	},
	/// No reservation held by the given order for the SKU.
	#[error("No reservation of sku \"{sku}\" for order {order_id}")]
	ReservationNotFound { sku: String, order_id: u64 },
	/// Error in the ledger backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Error during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Catalog and stock data of one purchasable variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantRecord {
	pub sku: String,
	pub product_id: u64,
	pub variant_id: String,
	pub name: String,
	pub price: Decimal,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub image_url: Option<String>,
	#[serde(default)]
	pub slug: String,
	/// On-hand sellable quantity. Reservations are held against it but do
	/// not decrement it until the parcel ships.
	pub qty_in_stock: u32,
	/// Quantity currently reserved by open orders.
	#[serde(default)]
	pub qty_reserved: u32,
	/// Units sold, incremented when orders ship.
	#[serde(default)]
	pub sales_count: u64,
}

impl VariantRecord {
	/// Quantity available for new reservations.
	pub fn available(&self) -> u32 {
		self.qty_in_stock.saturating_sub(self.qty_reserved)
	}
}

/// Trait defining the interface for inventory ledger backends.
#[async_trait]
pub trait InventoryInterface: Send + Sync {
	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Looks up the variant record for a SKU.
	async fn find_variant(&self, sku: &str) -> Result<VariantRecord, InventoryError>;

	/// Reserves quantity against an order. Fails when the sellable stock
	/// cannot cover the request.
	async fn reserve(
		&self,
		sku: &str,
		qty: u32,
		order_id: u64,
		session: &mut Session,
	) -> Result<(), InventoryError>;

	/// Releases the reservation an order holds for a SKU, returning the
	/// quantity to the sellable pool.
	async fn release(
		&self,
		sku: &str,
		order_id: u64,
		session: &mut Session,
	) -> Result<(), InventoryError>;

	/// Converts a reservation into a permanent sale: the reservation is
	/// dropped and the stock decremented.
	async fn commit_to_stock(
		&self,
		sku: &str,
		qty: u32,
		order_id: u64,
		session: &mut Session,
	) -> Result<(), InventoryError>;

	/// Puts returned quantity back on the shelf.
	async fn return_to_stock(
		&self,
		sku: &str,
		qty: u32,
		session: &mut Session,
	) -> Result<(), InventoryError>;

	/// Increments the sales counter of a variant.
	async fn increment_sales_count(
		&self,
		sku: &str,
		qty: u32,
		session: &mut Session,
	) -> Result<(), InventoryError>;
}

/// Type alias for inventory factory functions.
pub type InventoryFactory = fn(&toml::Value) -> Result<Box<dyn InventoryInterface>, InventoryError>;

/// Service that manages inventory operations.
pub struct InventoryService {
	backend: Box<dyn InventoryInterface>,
}

impl InventoryService {
	/// Creates a new InventoryService with the specified backend.
	pub fn new(backend: Box<dyn InventoryInterface>) -> Self {
		Self { backend }
	}

	/// Looks up the variant record for a SKU.
	pub async fn find_variant(&self, sku: &str) -> Result<VariantRecord, InventoryError> {
		self.backend.find_variant(sku).await
	}

	/// Reserves quantity against an order.
	pub async fn reserve(
		&self,
		sku: &str,
		qty: u32,
		order_id: u64,
		session: &mut Session,
	) -> Result<(), InventoryError> {
		self.backend.reserve(sku, qty, order_id, session).await
	}

	/// Releases the reservation an order holds for a SKU.
	pub async fn release(
		&self,
		sku: &str,
		order_id: u64,
		session: &mut Session,
	) -> Result<(), InventoryError> {
		self.backend.release(sku, order_id, session).await
	}

	/// Converts a reservation into a permanent sale.
	pub async fn commit_to_stock(
		&self,
		sku: &str,
		qty: u32,
		order_id: u64,
		session: &mut Session,
	) -> Result<(), InventoryError> {
		self.backend
			.commit_to_stock(sku, qty, order_id, session)
			.await
	}

	/// Puts returned quantity back on the shelf.
	pub async fn return_to_stock(
		&self,
		sku: &str,
		qty: u32,
		session: &mut Session,
	) -> Result<(), InventoryError> {
		self.backend.return_to_stock(sku, qty, session).await
	}

	/// Increments the sales counter of a variant.
	pub async fn increment_sales_count(
		&self,
		sku: &str,
		qty: u32,
		session: &mut Session,
	) -> Result<(), InventoryError> {
		self.backend.increment_sales_count(sku, qty, session).await
	}
}
