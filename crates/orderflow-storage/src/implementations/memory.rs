//! In-memory store and counter implementations.
//!
//! Reference backends used in tests and single-node deployments. The order
//! map lives behind a std RwLock; transactional isolation comes from the
//! shared gate: sessions hold its write side for their whole lifetime, and
//! non-session reads take the read side, so an in-flight transaction is
//! never observable from the outside.

use crate::{CounterInterface, OrderStoreInterface, Session, StoreError};
use async_trait::async_trait;
use orderflow_types::{ConfigSchema, Order, OrderFilter, Schema, ValidationError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock as StdRwLock};
use tokio::sync::RwLock;

/// In-memory order store. Clones share the same underlying map and gate.
#[derive(Clone)]
pub struct MemoryOrderStore {
	gate: Arc<RwLock<()>>,
	orders: Arc<StdRwLock<HashMap<u64, Order>>>,
}

impl MemoryOrderStore {
	/// Creates an empty MemoryOrderStore.
	pub fn new() -> Self {
		Self {
			gate: Arc::new(RwLock::new(())),
			orders: Arc::new(StdRwLock::new(HashMap::new())),
		}
	}

	fn read_orders(&self) -> Result<Vec<Order>, StoreError> {
		let orders = self
			.orders
			.read()
			.map_err(|e| StoreError::Backend(e.to_string()))?;
		Ok(orders.values().cloned().collect())
	}
}

impl Default for MemoryOrderStore {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl OrderStoreInterface for MemoryOrderStore {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryStoreSchema)
	}

	async fn begin(&self) -> Session {
		let guard = self.gate.clone().write_owned().await;
		Session::new(guard)
	}

	async fn find_by_id(&self, id: u64, session: Option<&Session>) -> Result<Order, StoreError> {
		// Outside a session, wait out any in-flight transaction.
		let _read_guard = match session {
			Some(_) => None,
			None => Some(self.gate.read().await),
		};
		let orders = self
			.orders
			.read()
			.map_err(|e| StoreError::Backend(e.to_string()))?;
		orders.get(&id).cloned().ok_or(StoreError::NotFound)
	}

	async fn find(&self, filter: &OrderFilter) -> Result<Vec<Order>, StoreError> {
		let _read_guard = self.gate.read().await;
		let mut orders = self.read_orders()?;
		if let Some(customer_id) = filter.customer_id {
			orders.retain(|order| order.customer_id == customer_id);
		}
		orders.sort_by(|a, b| b.id.cmp(&a.id));
		Ok(orders
			.into_iter()
			.skip(filter.skip)
			.take(filter.limit)
			.collect())
	}

	async fn find_with_active_shipments(
		&self,
		session: Option<&Session>,
	) -> Result<Vec<Order>, StoreError> {
		let _read_guard = match session {
			Some(_) => None,
			None => Some(self.gate.read().await),
		};
		let mut orders = self.read_orders()?;
		orders.retain(|order| !order.shipment.tracking_number.is_empty() && !order.status.is_final());
		orders.sort_by_key(|order| order.id);
		Ok(orders)
	}

	async fn insert(&self, order: &Order, session: &mut Session) -> Result<(), StoreError> {
		let mut orders = self
			.orders
			.write()
			.map_err(|e| StoreError::Backend(e.to_string()))?;
		if orders.contains_key(&order.id) {
			return Err(StoreError::DuplicateId(order.id));
		}
		orders.insert(order.id, order.clone());

		let map = self.orders.clone();
		let id = order.id;
		session.on_abort(move || {
			if let Ok(mut orders) = map.write() {
				orders.remove(&id);
			}
		});
		Ok(())
	}

	async fn update(&self, order: &Order, session: &mut Session) -> Result<(), StoreError> {
		let mut orders = self
			.orders
			.write()
			.map_err(|e| StoreError::Backend(e.to_string()))?;
		let previous = orders
			.insert(order.id, order.clone())
			.ok_or(StoreError::NotFound)?;

		let map = self.orders.clone();
		session.on_abort(move || {
			if let Ok(mut orders) = map.write() {
				orders.insert(previous.id, previous);
			}
		});
		Ok(())
	}

	async fn estimated_count(&self) -> Result<u64, StoreError> {
		let orders = self
			.orders
			.read()
			.map_err(|e| StoreError::Backend(e.to_string()))?;
		Ok(orders.len() as u64)
	}

	async fn find_all(&self) -> Result<Vec<Order>, StoreError> {
		let _read_guard = self.gate.read().await;
		let mut orders = self.read_orders()?;
		orders.sort_by_key(|order| order.id);
		Ok(orders)
	}
}

/// Configuration schema for MemoryOrderStore.
pub struct MemoryStoreSchema;

impl ConfigSchema for MemoryStoreSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		// Memory storage has no required configuration
		Schema::new(vec![], vec![]).validate(config)
	}
}

/// Factory function to create a memory order store from configuration.
pub fn create_store(_config: &toml::Value) -> Result<Box<dyn OrderStoreInterface>, StoreError> {
	Ok(Box::new(MemoryOrderStore::new()))
}

/// In-memory counter allocator.
///
/// Values are issued immediately and never taken back: an aborted creation
/// burns its sequence value, matching the behavior of a database counter
/// incremented with an atomic find-and-modify.
#[derive(Clone)]
pub struct MemoryCounter {
	counters: Arc<Mutex<HashMap<String, u64>>>,
}

impl MemoryCounter {
	/// Creates a MemoryCounter with all sequences at zero.
	pub fn new() -> Self {
		Self {
			counters: Arc::new(Mutex::new(HashMap::new())),
		}
	}
}

impl Default for MemoryCounter {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl CounterInterface for MemoryCounter {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		// The counter reads the same storage section as the order store.
		Box::new(MemoryStoreSchema)
	}

	async fn next_value(
		&self,
		collection: &str,
		_session: &mut Session,
	) -> Result<u64, StoreError> {
		let mut counters = self
			.counters
			.lock()
			.map_err(|e| StoreError::Backend(e.to_string()))?;
		let value = counters.entry(collection.to_string()).or_insert(0);
		*value += 1;
		Ok(*value)
	}

	async fn set_value(&self, collection: &str, value: u64) -> Result<(), StoreError> {
		let mut counters = self
			.counters
			.lock()
			.map_err(|e| StoreError::Backend(e.to_string()))?;
		counters.insert(collection.to_string(), value);
		Ok(())
	}
}

/// Factory function to create a memory counter from configuration.
pub fn create_counter(_config: &toml::Value) -> Result<Box<dyn CounterInterface>, StoreError> {
	Ok(Box::new(MemoryCounter::new()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Utc;
	use orderflow_types::{OrderPrices, OrderStatus, PaymentType, Shipment};

	fn sample_order(id: u64) -> Order {
		Order {
			id,
			id_for_customer: orderflow_types::format_order_number(id),
			customer_id: 1,
			customer_first_name: "Anna".into(),
			customer_last_name: "Koval".into(),
			customer_email: "anna@example.com".into(),
			customer_phone: "+380501112233".into(),
			discount_percent: Default::default(),
			items: vec![],
			prices: OrderPrices::default(),
			status: OrderStatus::New,
			shipment: Shipment::default(),
			is_order_paid: false,
			payment_type: PaymentType::CashOnDelivery,
			payment_method_id: "cod".into(),
			payment_method_admin_name: "COD".into(),
			payment_method_client_name: "Cash on delivery".into(),
			shipping_method_name: "Pickup from carrier warehouse".into(),
			client_note: String::new(),
			admin_note: String::new(),
			customer_note: String::new(),
			is_callback_needed: false,
			logs: vec![],
			created_at: Utc::now(),
			updated_at: Utc::now(),
		}
	}

	#[tokio::test]
	async fn insert_and_find() {
		let store = MemoryOrderStore::new();
		let mut session = store.begin().await;
		store.insert(&sample_order(1), &mut session).await.unwrap();
		session.commit();

		let found = store.find_by_id(1, None).await.unwrap();
		assert_eq!(found.id, 1);
		assert!(matches!(
			store.find_by_id(2, None).await,
			Err(StoreError::NotFound)
		));
	}

	#[tokio::test]
	async fn aborted_insert_is_not_observable() {
		let store = MemoryOrderStore::new();
		let mut session = store.begin().await;
		store.insert(&sample_order(1), &mut session).await.unwrap();
		session.abort();

		assert!(matches!(
			store.find_by_id(1, None).await,
			Err(StoreError::NotFound)
		));
		assert_eq!(store.estimated_count().await.unwrap(), 0);
	}

	#[tokio::test]
	async fn aborted_update_restores_previous_state() {
		let store = MemoryOrderStore::new();
		let mut session = store.begin().await;
		store.insert(&sample_order(1), &mut session).await.unwrap();
		session.commit();

		let mut session = store.begin().await;
		let mut order = store.find_by_id(1, Some(&session)).await.unwrap();
		order.status = OrderStatus::Processing;
		store.update(&order, &mut session).await.unwrap();
		session.abort();

		let found = store.find_by_id(1, None).await.unwrap();
		assert_eq!(found.status, OrderStatus::New);
	}

	#[tokio::test]
	async fn active_shipments_excludes_final_and_untracked() {
		let store = MemoryOrderStore::new();
		let mut session = store.begin().await;

		let untracked = sample_order(1);
		let mut tracked = sample_order(2);
		tracked.status = OrderStatus::ReadyToShip;
		tracked.shipment.tracking_number = "20450000000002".into();
		let mut finished = sample_order(3);
		finished.status = OrderStatus::Finished;
		finished.shipment.tracking_number = "20450000000003".into();

		for order in [&untracked, &tracked, &finished] {
			store.insert(order, &mut session).await.unwrap();
		}
		session.commit();

		let active = store.find_with_active_shipments(None).await.unwrap();
		assert_eq!(active.len(), 1);
		assert_eq!(active[0].id, 2);
	}

	#[tokio::test]
	async fn counter_is_strictly_increasing_and_burns_on_abort() {
		let store = MemoryOrderStore::new();
		let counter = MemoryCounter::new();

		let mut session = store.begin().await;
		assert_eq!(counter.next_value("order", &mut session).await.unwrap(), 1);
		session.abort();

		let mut session = store.begin().await;
		// The burned value is not reissued.
		assert_eq!(counter.next_value("order", &mut session).await.unwrap(), 2);
		session.commit();

		counter.set_value("order", 100).await.unwrap();
		let mut session = store.begin().await;
		assert_eq!(
			counter.next_value("order", &mut session).await.unwrap(),
			101
		);
		session.commit();
	}
}
