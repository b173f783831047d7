//! Builder pattern for constructing the order engine.
//!
//! Composes an [`OrderEngine`] from factory functions keyed by implementation
//! name. Every configured implementation of a component is instantiated and
//! logged; the configured primary one is wired into the engine. The builder
//! also spawns the notification delivery worker.

use crate::engine::OrderEngine;
use crate::notify::{self, NotificationQueue, NotifierInterface};
use orderflow_carrier::{CarrierError, CarrierInterface, CarrierService};
use orderflow_config::Config;
use orderflow_customer::{CustomerError, CustomerInterface, CustomerService};
use orderflow_inventory::{InventoryError, InventoryInterface, InventoryService};
use orderflow_search::{SearchError, SearchInterface, SearchService};
use orderflow_storage::{
	CounterInterface, CounterService, OrderStoreInterface, OrderStoreService, StoreError,
};
use orderflow_types::ConfigSchema;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

/// Errors that can occur during engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Container for all factory functions needed to build an OrderEngine.
///
/// Each factory takes the TOML configuration of its implementation section
/// and returns the boxed backend. Counter factories are keyed by the storage
/// implementation names: the id sequence lives next to the orders it numbers.
pub struct OrderflowFactories<SF, CF, IF, CUF, CAF, SEF> {
	pub store_factories: HashMap<String, SF>,
	pub counter_factories: HashMap<String, CF>,
	pub inventory_factories: HashMap<String, IF>,
	pub customer_factories: HashMap<String, CUF>,
	pub carrier_factories: HashMap<String, CAF>,
	pub search_factories: HashMap<String, SEF>,
}

/// A fully wired orderflow runtime.
pub struct Orderflow {
	pub engine: Arc<OrderEngine>,
	/// Handle of the notification delivery worker.
	pub notification_worker: JoinHandle<()>,
}

/// Builder for constructing an OrderEngine with pluggable implementations.
pub struct OrderflowBuilder {
	config: Config,
}

impl OrderflowBuilder {
	/// Creates a new OrderflowBuilder with the given configuration.
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the engine using factories for each component type.
	pub fn build<SF, CF, IF, CUF, CAF, SEF>(
		self,
		factories: OrderflowFactories<SF, CF, IF, CUF, CAF, SEF>,
		notifier: Arc<dyn NotifierInterface>,
	) -> Result<Orderflow, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn OrderStoreInterface>, StoreError>,
		CF: Fn(&toml::Value) -> Result<Box<dyn CounterInterface>, StoreError>,
		IF: Fn(&toml::Value) -> Result<Box<dyn InventoryInterface>, InventoryError>,
		CUF: Fn(&toml::Value) -> Result<Box<dyn CustomerInterface>, CustomerError>,
		CAF: Fn(&toml::Value) -> Result<Box<dyn CarrierInterface>, CarrierError>,
		SEF: Fn(&toml::Value) -> Result<Box<dyn SearchInterface>, SearchError>,
	{
		let store_backend = load_primary(
			"storage",
			&self.config.storage.primary,
			&self.config.storage.implementations,
			&factories.store_factories,
			|i| i.config_schema(),
		)?;
		// The counter lives in the same backend as the orders it numbers.
		let counter_backend = load_primary(
			"counter",
			&self.config.storage.primary,
			&self.config.storage.implementations,
			&factories.counter_factories,
			|i| i.config_schema(),
		)?;
		let inventory_backend = load_primary(
			"inventory",
			&self.config.inventory.primary,
			&self.config.inventory.implementations,
			&factories.inventory_factories,
			|i| i.config_schema(),
		)?;
		let customer_backend = load_primary(
			"customer",
			&self.config.customer.primary,
			&self.config.customer.implementations,
			&factories.customer_factories,
			|i| i.config_schema(),
		)?;
		let carrier_backend = load_primary(
			"carrier",
			&self.config.carrier.primary,
			&self.config.carrier.implementations,
			&factories.carrier_factories,
			|i| i.config_schema(),
		)?;
		let search_backend = load_primary(
			"search",
			&self.config.search.primary,
			&self.config.search.implementations,
			&factories.search_factories,
			|i| i.config_schema(),
		)?;

		let (queue, receiver) = NotificationQueue::new();
		let notification_worker = notify::spawn_worker(
			receiver,
			notifier,
			self.config.notifications.max_attempts,
			Duration::from_secs(self.config.notifications.initial_backoff_seconds),
		);

		let engine = OrderEngine::new(
			Arc::new(OrderStoreService::new(store_backend)),
			Arc::new(CounterService::new(counter_backend)),
			Arc::new(InventoryService::new(inventory_backend)),
			Arc::new(CustomerService::new(customer_backend)),
			Arc::new(CarrierService::new(carrier_backend)),
			Arc::new(SearchService::new(search_backend)),
			queue,
			self.config.payment_methods,
			self.config.carrier.sender,
			self.config.storage.order_counter,
		);

		Ok(Orderflow {
			engine: Arc::new(engine),
			notification_worker,
		})
	}
}

/// Instantiates every configured implementation of one component, checks its
/// configuration against the implementation's schema and returns the primary
/// one.
fn load_primary<I: ?Sized, F, E>(
	component: &'static str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
	factories: &HashMap<String, F>,
	schema: fn(&I) -> Box<dyn ConfigSchema>,
) -> Result<Box<I>, BuilderError>
where
	F: Fn(&toml::Value) -> Result<Box<I>, E>,
	E: std::fmt::Display,
{
	let mut loaded = HashMap::new();
	for (name, config) in implementations {
		if let Some(factory) = factories.get(name) {
			match factory(config) {
				Ok(implementation) => {
					schema(implementation.as_ref()).validate(config).map_err(|e| {
						BuilderError::Config(format!(
							"Invalid {} configuration for '{}': {}",
							component, name, e
						))
					})?;
					loaded.insert(name.clone(), implementation);
					let is_primary = primary == name;
					tracing::info!(component = component, implementation = %name, enabled = %is_primary, "Loaded");
				},
				Err(e) => {
					tracing::error!(
						component = component,
						implementation = %name,
						error = %e,
						"Failed to create implementation"
					);
					return Err(BuilderError::Config(format!(
						"Failed to create {} implementation '{}': {}",
						component, name, e
					)));
				},
			}
		}
	}

	loaded.remove(primary).ok_or_else(|| {
		BuilderError::MissingComponent(format!(
			"Primary {} '{}' failed to load or has invalid configuration",
			component, primary
		))
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::notify::TracingNotifier;
	use orderflow_types::{Field, FieldType, NewOrderItem, OrderStatus, Schema, ValidationError};
	use rust_decimal::Decimal;
	use std::str::FromStr;

	const CONFIG: &str = r#"
		[service]
		id = "orderflow-test"

		[storage]
		primary = "memory"
		[storage.implementations.memory]

		[inventory]
		primary = "memory"
		[inventory.implementations.memory]
		variants = [
			{ sku = "SKU-A", product_id = 1, variant_id = "v1", name = "Variant A", price = "100", qty_in_stock = 5 },
		]

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
		admin_name = "COD"
		client_name = "Cash on delivery"
	"#;

	fn factories() -> OrderflowFactories<
		orderflow_storage::StoreFactory,
		orderflow_storage::CounterFactory,
		orderflow_inventory::InventoryFactory,
		orderflow_customer::CustomerFactory,
		orderflow_carrier::CarrierFactory,
		orderflow_search::SearchFactory,
	> {
		OrderflowFactories {
			store_factories: HashMap::from([(
				"memory".to_string(),
				orderflow_storage::implementations::memory::create_store as _,
			)]),
			counter_factories: HashMap::from([(
				"memory".to_string(),
				orderflow_storage::implementations::memory::create_counter as _,
			)]),
			inventory_factories: HashMap::from([(
				"memory".to_string(),
				orderflow_inventory::implementations::memory::create_inventory as _,
			)]),
			customer_factories: HashMap::from([(
				"memory".to_string(),
				orderflow_customer::implementations::memory::create_directory as _,
			)]),
			carrier_factories: HashMap::from([(
				"mock".to_string(),
				orderflow_carrier::implementations::mock::create_carrier as _,
			)]),
			search_factories: HashMap::from([(
				"memory".to_string(),
				orderflow_search::implementations::memory::create_search as _,
			)]),
		}
	}

	#[tokio::test]
	async fn builds_a_working_engine_from_config() {
		let config = Config::from_str(CONFIG).unwrap();
		let orderflow = OrderflowBuilder::new(config)
			.build(factories(), Arc::new(TracingNotifier))
			.unwrap();

		let order = orderflow
			.engine
			.create_order_client(orderflow_types::ClientCreateOrder {
				email: "anna@example.com".into(),
				address: orderflow_types::Address {
					first_name: "Anna".into(),
					last_name: "Koval".into(),
					phone: "+380501112233".into(),
					settlement: "Kyiv".into(),
					address: "Warehouse 12".into(),
					address_type: orderflow_types::AddressType::Warehouse,
				},
				items: vec![NewOrderItem {
					sku: "SKU-A".into(),
					qty: 1,
					discount_value: Decimal::ZERO,
					additional_services: vec![],
				}],
				payment_method_id: "cod".into(),
				customer_note: String::new(),
				is_callback_needed: false,
			})
			.await
			.unwrap();
		assert_eq!(order.status, OrderStatus::New);
		assert_eq!(order.prices.total_cost, Decimal::from(100));

		orderflow.notification_worker.abort();
	}

	#[tokio::test]
	async fn missing_primary_factory_is_rejected() {
		// The config layer already rejects a primary with no matching section.
		assert!(
			Config::from_str(&CONFIG.replace("primary = \"mock\"", "primary = \"http\"")).is_err()
		);

		// A factory map missing the configured primary fails at build time.
		let config = Config::from_str(CONFIG).unwrap();
		let mut incomplete = factories();
		incomplete.carrier_factories.clear();
		let result = OrderflowBuilder::new(config).build(incomplete, Arc::new(TracingNotifier));
		assert!(matches!(result, Err(BuilderError::MissingComponent(_))));
	}

	#[test]
	fn schema_violations_are_rejected_at_build_time() {
		struct EndpointSchema;
		impl ConfigSchema for EndpointSchema {
			fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
				Schema::new(vec![Field::new("endpoint", FieldType::String)], vec![])
					.validate(config)
			}
		}

		type UnitFactory = fn(&toml::Value) -> Result<Box<()>, StoreError>;
		let factories: HashMap<String, UnitFactory> =
			HashMap::from([("strict".to_string(), (|_| Ok(Box::new(()))) as UnitFactory)]);
		let implementations =
			HashMap::from([("strict".to_string(), toml::Value::Table(Default::default()))]);

		let result = load_primary("test", "strict", &implementations, &factories, |_| {
			Box::new(EndpointSchema)
		});
		assert!(
			matches!(result, Err(BuilderError::Config(ref msg)) if msg.contains("endpoint"))
		);
	}
}
