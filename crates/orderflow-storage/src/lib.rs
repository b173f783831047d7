//! Storage module for the orderflow system.
//!
//! This module provides the authoritative order store behind a unit-of-work
//! session, plus the counter allocator that issues order ids. Every
//! orchestrator operation that mutates an order runs inside exactly one
//! [`Session`]; collaborators that participate in the transaction register
//! undo actions on it so an abort leaves no partial mutation observable.

use async_trait::async_trait;
use orderflow_types::{ConfigSchema, Order, OrderFilter};
use thiserror::Error;
use tokio::sync::OwnedRwLockWriteGuard;

/// Re-export implementations
pub mod implementations {
	pub mod memory;
}

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
	/// A requested record is not found.
	#[error("Not found")]
	NotFound,
	/// An insert collided with an existing id.
	#[error("Duplicate id: {0}")]
	DuplicateId(u64),
	/// Error in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Error during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

// Undos must be `Sync` as well: sessions are passed by reference across
// awaits, so `Session` itself has to be `Sync` for the futures to be `Send`.
type Undo = Box<dyn FnOnce() + Send + Sync>;

/// A unit-of-work transaction handle.
///
/// The session holds an exclusive transaction guard, serializing conflicting
/// transactions, and collects undo actions registered by every collaborator
/// that mutates state under it. [`Session::commit`] discards the undos;
/// [`Session::abort`] (or dropping the session) replays them in reverse
/// order, rolling the world back to the pre-transaction state.
pub struct Session {
	_guard: OwnedRwLockWriteGuard<()>,
	undos: Vec<Undo>,
}

impl Session {
	/// Creates a session from an acquired transaction guard.
	pub fn new(guard: OwnedRwLockWriteGuard<()>) -> Self {
		Self {
			_guard: guard,
			undos: Vec::new(),
		}
	}

	/// Registers an action to run if this session aborts.
	pub fn on_abort<F>(&mut self, undo: F)
	where
		F: FnOnce() + Send + Sync + 'static,
	{
		self.undos.push(Box::new(undo));
	}

	/// Commits the session: all mutations made under it become permanent.
	pub fn commit(mut self) {
		self.undos.clear();
	}

	/// Aborts the session, rolling back every registered mutation.
	pub fn abort(self) {
		// Drop runs the undos.
	}
}

impl Drop for Session {
	fn drop(&mut self) {
		// An un-committed session rolls back, so an early `?` return from
		// the middle of a workflow cannot leak partial writes.
		for undo in self.undos.drain(..).rev() {
			undo();
		}
	}
}

/// Trait defining the interface for order store backends.
///
/// Reads may run inside a session (the caller already holds the transaction
/// guard) or outside one, in which case the backend must not expose state of
/// an in-flight transaction.
#[async_trait]
pub trait OrderStoreInterface: Send + Sync {
	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Begins a transaction.
	async fn begin(&self) -> Session;

	/// Loads an order by id.
	async fn find_by_id(&self, id: u64, session: Option<&Session>) -> Result<Order, StoreError>;

	/// Lists orders matching the store-side filter fields, newest first.
	async fn find(&self, filter: &OrderFilter) -> Result<Vec<Order>, StoreError>;

	/// Loads all orders with a non-empty tracking number and a non-final
	/// status, the working set of shipment reconciliation.
	async fn find_with_active_shipments(
		&self,
		session: Option<&Session>,
	) -> Result<Vec<Order>, StoreError>;

	/// Inserts a new order under the session.
	async fn insert(&self, order: &Order, session: &mut Session) -> Result<(), StoreError>;

	/// Replaces an existing order under the session.
	async fn update(&self, order: &Order, session: &mut Session) -> Result<(), StoreError>;

	/// Returns an order count estimate, cheap enough to call on a timer.
	async fn estimated_count(&self) -> Result<u64, StoreError>;

	/// Loads every order. Used by the search reindex job.
	async fn find_all(&self) -> Result<Vec<Order>, StoreError>;
}

/// Type alias for order store factory functions.
pub type StoreFactory = fn(&toml::Value) -> Result<Box<dyn OrderStoreInterface>, StoreError>;

/// High-level order store service.
///
/// Wraps a backend implementation and is the only type the orchestrator
/// talks to for order persistence.
pub struct OrderStoreService {
	backend: Box<dyn OrderStoreInterface>,
}

impl OrderStoreService {
	/// Creates a new OrderStoreService with the specified backend.
	pub fn new(backend: Box<dyn OrderStoreInterface>) -> Self {
		Self { backend }
	}

	/// Begins a transaction.
	pub async fn begin(&self) -> Session {
		self.backend.begin().await
	}

	/// Loads an order by id, optionally inside a session.
	pub async fn find_by_id(
		&self,
		id: u64,
		session: Option<&Session>,
	) -> Result<Order, StoreError> {
		self.backend.find_by_id(id, session).await
	}

	/// Lists orders matching the filter, newest first.
	pub async fn find(&self, filter: &OrderFilter) -> Result<Vec<Order>, StoreError> {
		self.backend.find(filter).await
	}

	/// Loads the reconciliation working set.
	pub async fn find_with_active_shipments(
		&self,
		session: Option<&Session>,
	) -> Result<Vec<Order>, StoreError> {
		self.backend.find_with_active_shipments(session).await
	}

	/// Inserts a new order under the session.
	pub async fn insert(&self, order: &Order, session: &mut Session) -> Result<(), StoreError> {
		self.backend.insert(order, session).await
	}

	/// Replaces an existing order under the session.
	pub async fn update(&self, order: &Order, session: &mut Session) -> Result<(), StoreError> {
		self.backend.update(order, session).await
	}

	/// Returns an order count estimate.
	pub async fn estimated_count(&self) -> Result<u64, StoreError> {
		self.backend.estimated_count().await
	}

	/// Loads every order.
	pub async fn find_all(&self) -> Result<Vec<Order>, StoreError> {
		self.backend.find_all().await
	}
}

/// Trait defining the interface for counter allocators.
///
/// Issues a strictly increasing integer sequence per logical collection.
/// Allocation happens inside the creation session, but a burned value is
/// never returned on abort: ids stay pairwise distinct and gaps are allowed.
#[async_trait]
pub trait CounterInterface: Send + Sync {
	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Allocates the next value of the named sequence.
	async fn next_value(&self, collection: &str, session: &mut Session)
		-> Result<u64, StoreError>;

	/// Administrative repair: pins the sequence to the given value.
	async fn set_value(&self, collection: &str, value: u64) -> Result<(), StoreError>;
}

/// Type alias for counter factory functions.
pub type CounterFactory = fn(&toml::Value) -> Result<Box<dyn CounterInterface>, StoreError>;

/// Service that manages counter allocation.
pub struct CounterService {
	backend: Box<dyn CounterInterface>,
}

impl CounterService {
	/// Creates a new CounterService with the specified backend.
	pub fn new(backend: Box<dyn CounterInterface>) -> Self {
		Self { backend }
	}

	/// Allocates the next value of the named sequence.
	pub async fn next_value(
		&self,
		collection: &str,
		session: &mut Session,
	) -> Result<u64, StoreError> {
		self.backend.next_value(collection, session).await
	}

	/// Administrative repair: pins the sequence to the given value.
	pub async fn set_value(&self, collection: &str, value: u64) -> Result<(), StoreError> {
		self.backend.set_value(collection, value).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicU32, Ordering};
	use std::sync::Arc;

	fn test_session() -> Session {
		let gate = Arc::new(tokio::sync::RwLock::new(()));
		Session::new(gate.try_write_owned().unwrap())
	}

	#[test]
	fn abort_replays_undos_in_reverse() {
		let trace = Arc::new(std::sync::Mutex::new(Vec::new()));
		let mut session = test_session();
		for i in 0..3 {
			let trace = trace.clone();
			session.on_abort(move || trace.lock().unwrap().push(i));
		}
		session.abort();
		assert_eq!(*trace.lock().unwrap(), vec![2, 1, 0]);
	}

	#[test]
	fn commit_discards_undos() {
		let calls = Arc::new(AtomicU32::new(0));
		let mut session = test_session();
		let calls_in_undo = calls.clone();
		session.on_abort(move || {
			calls_in_undo.fetch_add(1, Ordering::SeqCst);
		});
		session.commit();
		assert_eq!(calls.load(Ordering::SeqCst), 0);
	}

	#[test]
	fn sessions_can_be_shared_across_awaits() {
		// `&Session` crosses await points in the engine, so the futures are
		// only `Send` when `Session` is `Sync`.
		fn assert_send_sync<T: Send + Sync>() {}
		assert_send_sync::<Session>();
	}

	#[test]
	fn dropping_an_open_session_rolls_back() {
		let calls = Arc::new(AtomicU32::new(0));
		{
			let mut session = test_session();
			let calls_in_undo = calls.clone();
			session.on_abort(move || {
				calls_in_undo.fetch_add(1, Ordering::SeqCst);
			});
		}
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}
}
