//! Main entry point for the orderflow service.
//!
//! This binary wires the order workflow engine together: it loads the TOML
//! configuration, instantiates the configured backend implementations through
//! factory maps and runs the periodic jobs until interrupted.

use clap::Parser;
use orderflow_config::Config;
use orderflow_core::{
	InProcessLeaderLock, Orderflow, OrderflowBuilder, OrderflowFactories, Scheduler,
	TracingNotifier,
};
use std::path::PathBuf;
use std::sync::Arc;

// Import implementations from individual crates
use orderflow_carrier::implementations::http::create_carrier as create_http_carrier;
use orderflow_carrier::implementations::mock::create_carrier as create_mock_carrier;
use orderflow_customer::implementations::memory::create_directory;
use orderflow_inventory::implementations::memory::create_inventory;
use orderflow_search::implementations::memory::create_search;
use orderflow_storage::implementations::memory::{create_counter, create_store};

/// Command-line arguments for the orderflow service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

/// Macro to create a factory HashMap with the appropriate function pointer type
macro_rules! create_factory_map {
    ($interface:path, $error:path, $( $name:literal => $factory:expr ),* $(,)?) => {{
        let mut factories = std::collections::HashMap::new();
        $(
            factories.insert(
                $name.to_string(),
                $factory as fn(&toml::Value) -> Result<Box<dyn $interface>, $error>
            );
        )*
        factories
    }};
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt().with_env_filter(env_filter).with_target(true).init();

	// Load configuration
	let config_path = args
		.config
		.to_str()
		.ok_or("Config path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.service.id);

	let jobs = config.jobs.clone();
	let primary_instance = config.service.primary_instance;

	let orderflow = build_orderflow(config)?;

	// Only the primary instance runs the scheduled jobs; secondaries serve
	// workflow operations and stay out of the carrier's way.
	let mut job_handles = Vec::new();
	if primary_instance {
		let scheduler = Scheduler::new(
			orderflow.engine.clone(),
			Arc::new(InProcessLeaderLock::new()),
			jobs,
		);
		job_handles = scheduler.spawn();
	} else {
		tracing::info!("Secondary instance, scheduled jobs not started");
	}

	tokio::signal::ctrl_c().await?;
	tracing::info!("Shutdown signal received");

	for handle in job_handles {
		handle.abort();
	}
	orderflow.notification_worker.abort();

	tracing::info!("Stopped orderflow service");
	Ok(())
}

/// Builds the engine with all available backend implementations.
fn build_orderflow(config: Config) -> Result<Orderflow, Box<dyn std::error::Error>> {
	let builder = OrderflowBuilder::new(config);

	let store_factories = create_factory_map!(
		orderflow_storage::OrderStoreInterface,
		orderflow_storage::StoreError,
		"memory" => create_store,
	);

	let counter_factories = create_factory_map!(
		orderflow_storage::CounterInterface,
		orderflow_storage::StoreError,
		"memory" => create_counter,
	);

	let inventory_factories = create_factory_map!(
		orderflow_inventory::InventoryInterface,
		orderflow_inventory::InventoryError,
		"memory" => create_inventory,
	);

	let customer_factories = create_factory_map!(
		orderflow_customer::CustomerInterface,
		orderflow_customer::CustomerError,
		"memory" => create_directory,
	);

	let carrier_factories = create_factory_map!(
		orderflow_carrier::CarrierInterface,
		orderflow_carrier::CarrierError,
		"http" => create_http_carrier,
		"mock" => create_mock_carrier,
	);

	let search_factories = create_factory_map!(
		orderflow_search::SearchInterface,
		orderflow_search::SearchError,
		"memory" => create_search,
	);

	let factories = OrderflowFactories {
		store_factories,
		counter_factories,
		inventory_factories,
		customer_factories,
		carrier_factories,
		search_factories,
	};

	Ok(builder.build(factories, Arc::new(TracingNotifier))?)
}
