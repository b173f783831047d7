//! In-memory inventory ledger implementation.
//!
//! Keeps variant records in a RwLock'd map and registers an undo on the
//! session for every mutation, so an aborted workflow leaves no reservation
//! or stock change behind. The factory can seed the catalog from the
//! `variants` array of its configuration section.

use crate::{InventoryError, InventoryInterface, VariantRecord};
use async_trait::async_trait;
use orderflow_storage::Session;
use orderflow_types::{ConfigSchema, Schema, ValidationError};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

type Records = Arc<RwLock<HashMap<String, Record>>>;

#[derive(Debug, Clone)]
struct Record {
	variant: VariantRecord,
	/// Open reservations keyed by order id.
	reservations: HashMap<u64, u32>,
}

/// In-memory inventory ledger. Clones share the same records.
#[derive(Clone)]
pub struct MemoryInventory {
	records: Records,
}

impl MemoryInventory {
	/// Creates an empty ledger.
	pub fn new() -> Self {
		Self {
			records: Arc::new(RwLock::new(HashMap::new())),
		}
	}

	/// Creates a ledger pre-seeded with the given variants.
	pub fn with_variants(variants: Vec<VariantRecord>) -> Self {
		let ledger = Self::new();
		{
			let mut records = ledger.records.write().unwrap_or_else(|e| e.into_inner());
			for variant in variants {
				records.insert(
					variant.sku.clone(),
					Record {
						variant,
						reservations: HashMap::new(),
					},
				);
			}
		}
		ledger
	}

	/// Mutates the record of a SKU and registers the inverse on the session.
	fn mutate<F>(
		&self,
		sku: &str,
		session: &mut Session,
		mutate: F,
	) -> Result<(), InventoryError>
	where
		F: FnOnce(&mut Record) -> Result<(), InventoryError>,
	{
		let mut records = self
			.records
			.write()
			.map_err(|e| InventoryError::Backend(e.to_string()))?;
		let record = records
			.get_mut(sku)
			.ok_or_else(|| InventoryError::SkuNotFound(sku.to_string()))?;

		let previous = record.clone();
		mutate(record)?;

		let map = self.records.clone();
		let key = sku.to_string();
		session.on_abort(move || {
			if let Ok(mut records) = map.write() {
				records.insert(key, previous);
			}
		});
		Ok(())
	}
}

impl Default for MemoryInventory {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl InventoryInterface for MemoryInventory {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryInventorySchema)
	}

	async fn find_variant(&self, sku: &str) -> Result<VariantRecord, InventoryError> {
		let records = self
			.records
			.read()
			.map_err(|e| InventoryError::Backend(e.to_string()))?;
		let record = records
			.get(sku)
			.ok_or_else(|| InventoryError::SkuNotFound(sku.to_string()))?;
		let mut variant = record.variant.clone();
		variant.qty_reserved = record.reservations.values().sum();
		Ok(variant)
	}

	async fn reserve(
		&self,
		sku: &str,
		qty: u32,
		order_id: u64,
		session: &mut Session,
	) -> Result<(), InventoryError> {
		self.mutate(sku, session, |record| {
			let reserved: u32 = record.reservations.values().sum();
			let available = record.variant.qty_in_stock.saturating_sub(reserved);
			if available < qty {
				return Err(InventoryError::InsufficientStock {
					sku: record.variant.sku.clone(),
					requested: qty,
					in_stock: available,
				});
			}
			*record.reservations.entry(order_id).or_insert(0) += qty;
			Ok(())
		})
	}

	async fn release(
		&self,
		sku: &str,
		order_id: u64,
		session: &mut Session,
	) -> Result<(), InventoryError> {
		self.mutate(sku, session, |record| {
			record
				.reservations
				.remove(&order_id)
				.ok_or(InventoryError::ReservationNotFound {
					sku: record.variant.sku.clone(),
					order_id,
				})?;
			Ok(())
		})
	}

	async fn commit_to_stock(
		&self,
		sku: &str,
		qty: u32,
		order_id: u64,
		session: &mut Session,
	) -> Result<(), InventoryError> {
		self.mutate(sku, session, |record| {
			record
				.reservations
				.remove(&order_id)
				.ok_or(InventoryError::ReservationNotFound {
					sku: record.variant.sku.clone(),
					order_id,
				})?;
			record.variant.qty_in_stock = record.variant.qty_in_stock.saturating_sub(qty);
			Ok(())
		})
	}

	async fn return_to_stock(
		&self,
		sku: &str,
		qty: u32,
		session: &mut Session,
	) -> Result<(), InventoryError> {
		self.mutate(sku, session, |record| {
			record.variant.qty_in_stock += qty;
			Ok(())
		})
	}

	async fn increment_sales_count(
		&self,
		sku: &str,
		qty: u32,
		session: &mut Session,
	) -> Result<(), InventoryError> {
		self.mutate(sku, session, |record| {
			record.variant.sales_count += u64::from(qty);
			Ok(())
		})
	}
}

/// Configuration schema for MemoryInventory.
pub struct MemoryInventorySchema;

impl ConfigSchema for MemoryInventorySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		// The optional `variants` seed is type-checked by serde in the factory.
		Schema::new(vec![], vec![]).validate(config)
	}
}

#[derive(Debug, Default, Deserialize)]
struct SeedConfig {
	#[serde(default)]
	variants: Vec<VariantRecord>,
}

/// Factory function to create a memory inventory ledger from configuration.
///
/// Configuration parameters:
/// - `variants` (optional): array of variant records seeding the catalog.
pub fn create_inventory(
	config: &toml::Value,
) -> Result<Box<dyn InventoryInterface>, InventoryError> {
	let seed: SeedConfig = config
		.clone()
		.try_into()
		.map_err(|e: toml::de::Error| InventoryError::Configuration(e.to_string()))?;
	Ok(Box::new(MemoryInventory::with_variants(seed.variants)))
}
