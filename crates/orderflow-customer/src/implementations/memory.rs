//! In-memory customer directory implementation.

use crate::{CartItem, CustomerError, CustomerInterface, CustomerRecord, NewCustomer, SavedAddress};
use async_trait::async_trait;
use orderflow_storage::Session;
use orderflow_types::{Address, ConfigSchema, Schema, ValidationError};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

type Records = Arc<RwLock<HashMap<u64, CustomerRecord>>>;

/// In-memory customer directory. Clones share the same records.
#[derive(Clone)]
pub struct MemoryCustomerDirectory {
	records: Records,
	next_id: Arc<RwLock<u64>>,
}

impl MemoryCustomerDirectory {
	/// Creates an empty directory.
	pub fn new() -> Self {
		Self {
			records: Arc::new(RwLock::new(HashMap::new())),
			next_id: Arc::new(RwLock::new(0)),
		}
	}

	/// Inserts a record directly. Test seeding only.
	pub fn seed(&self, record: CustomerRecord) {
		let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
		let mut next_id = self.next_id.write().unwrap_or_else(|e| e.into_inner());
		*next_id = (*next_id).max(record.id);
		records.insert(record.id, record);
	}

	/// Mutates a customer and registers the inverse on the session.
	fn mutate<F>(
		&self,
		customer_id: u64,
		session: &mut Session,
		mutate: F,
	) -> Result<CustomerRecord, CustomerError>
	where
		F: FnOnce(&mut CustomerRecord),
	{
		let mut records = self
			.records
			.write()
			.map_err(|e| CustomerError::Backend(e.to_string()))?;
		let record = records
			.get_mut(&customer_id)
			.ok_or(CustomerError::CustomerNotFound(customer_id))?;

		let previous = record.clone();
		mutate(record);
		let updated = record.clone();

		let map = self.records.clone();
		session.on_abort(move || {
			if let Ok(mut records) = map.write() {
				records.insert(previous.id, previous);
			}
		});
		Ok(updated)
	}
}

impl Default for MemoryCustomerDirectory {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl CustomerInterface for MemoryCustomerDirectory {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryCustomerSchema)
	}

	async fn get_by_id(&self, id: u64) -> Result<CustomerRecord, CustomerError> {
		let records = self
			.records
			.read()
			.map_err(|e| CustomerError::Backend(e.to_string()))?;
		records
			.get(&id)
			.cloned()
			.ok_or(CustomerError::CustomerNotFound(id))
	}

	async fn resolve_by_contact(
		&self,
		email: &str,
		phone: &str,
	) -> Result<Option<CustomerRecord>, CustomerError> {
		let records = self
			.records
			.read()
			.map_err(|e| CustomerError::Backend(e.to_string()))?;
		Ok(records
			.values()
			.find(|record| {
				(!email.is_empty() && record.email.eq_ignore_ascii_case(email))
					|| (!phone.is_empty() && record.phone == phone)
			})
			.cloned())
	}

	async fn create_customer(
		&self,
		dto: NewCustomer,
		session: &mut Session,
	) -> Result<CustomerRecord, CustomerError> {
		let id = {
			let mut next_id = self
				.next_id
				.write()
				.map_err(|e| CustomerError::Backend(e.to_string()))?;
			*next_id += 1;
			*next_id
		};

		let record = CustomerRecord {
			id,
			first_name: dto.first_name,
			last_name: dto.last_name,
			email: dto.email,
			phone: dto.phone,
			discount_percent: Decimal::ZERO,
			addresses: dto
				.address
				.map(|address| {
					vec![SavedAddress {
						address,
						is_default: true,
					}]
				})
				.unwrap_or_default(),
			total_spent: Decimal::ZERO,
			order_ids: Vec::new(),
			cart: Vec::new(),
		};

		let mut records = self
			.records
			.write()
			.map_err(|e| CustomerError::Backend(e.to_string()))?;
		records.insert(id, record.clone());

		let map = self.records.clone();
		session.on_abort(move || {
			if let Ok(mut records) = map.write() {
				records.remove(&id);
			}
		});
		Ok(record)
	}

	async fn add_address(
		&self,
		customer_id: u64,
		address: Address,
		session: &mut Session,
	) -> Result<CustomerRecord, CustomerError> {
		self.mutate(customer_id, session, |record| {
			let already_saved = record
				.addresses
				.iter()
				.any(|saved| saved.address.is_same_place(&address));
			if !already_saved {
				record.addresses.push(SavedAddress {
					is_default: record.addresses.is_empty(),
					address,
				});
			}
		})
	}

	async fn register_order(
		&self,
		customer_id: u64,
		order_id: u64,
		session: &mut Session,
	) -> Result<(), CustomerError> {
		self.mutate(customer_id, session, |record| {
			record.order_ids.push(order_id);
		})
		.map(|_| ())
	}

	async fn increment_lifetime_spend(
		&self,
		customer_id: u64,
		amount: Decimal,
		session: &mut Session,
	) -> Result<(), CustomerError> {
		self.mutate(customer_id, session, |record| {
			record.total_spent += amount;
		})
		.map(|_| ())
	}

	async fn empty_cart(
		&self,
		customer_id: u64,
		session: &mut Session,
	) -> Result<(), CustomerError> {
		self.mutate(customer_id, session, |record| {
			record.cart = Vec::<CartItem>::new();
		})
		.map(|_| ())
	}
}

/// Configuration schema for MemoryCustomerDirectory.
pub struct MemoryCustomerSchema;

impl ConfigSchema for MemoryCustomerSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		// Memory directory has no required configuration
		Schema::new(vec![], vec![]).validate(config)
	}
}

/// Factory function to create a memory customer directory from configuration.
pub fn create_directory(
	_config: &toml::Value,
) -> Result<Box<dyn CustomerInterface>, CustomerError> {
	Ok(Box::new(MemoryCustomerDirectory::new()))
}
