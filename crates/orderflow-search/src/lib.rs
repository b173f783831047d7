//! Search mirror module for the orderflow system.
//!
//! Keeps a denormalized copy of orders in a search backend for term queries
//! over customer names, phones and order numbers. The mirror is written
//! after a workflow commits; it is best-effort and can always be rebuilt
//! from the order store with a reindex.

use async_trait::async_trait;
use orderflow_types::ConfigSchema;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod memory;
}

/// Errors that can occur during search mirror operations.
#[derive(Debug, Error)]
pub enum SearchError {
	/// The collection does not exist in the backend.
	#[error("Collection \"{0}\" not found")]
	CollectionNotFound(String),
	/// Error in the search backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Error during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// A query against one collection of the mirror.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
	/// Free-text term matched against all string fields of a document.
	pub term: Option<String>,
	/// Exact-match filters on top-level document fields.
	pub filters: Vec<(String, serde_json::Value)>,
	pub skip: usize,
	pub limit: usize,
}

/// Matching documents plus the total match count before paging.
#[derive(Debug, Clone, Default)]
pub struct SearchResults {
	pub hits: Vec<serde_json::Value>,
	pub total: usize,
}

/// Trait defining the interface for search mirror backends.
#[async_trait]
pub trait SearchInterface: Send + Sync {
	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Creates the collection when it does not exist yet.
	async fn ensure_collection(&self, collection: &str) -> Result<(), SearchError>;

	/// Inserts or replaces a document by id.
	async fn upsert_document(
		&self,
		collection: &str,
		id: u64,
		document: serde_json::Value,
	) -> Result<(), SearchError>;

	/// Removes a document by id. Missing documents are not an error.
	async fn delete_document(&self, collection: &str, id: u64) -> Result<(), SearchError>;

	/// Drops a whole collection. Used by the reindex job.
	async fn drop_collection(&self, collection: &str) -> Result<(), SearchError>;

	/// Runs a query against a collection.
	async fn query(
		&self,
		collection: &str,
		query: &SearchQuery,
	) -> Result<SearchResults, SearchError>;
}

/// Type alias for search mirror factory functions.
pub type SearchFactory = fn(&toml::Value) -> Result<Box<dyn SearchInterface>, SearchError>;

/// Service that manages the search mirror.
pub struct SearchService {
	backend: Box<dyn SearchInterface>,
}

impl SearchService {
	/// Creates a new SearchService with the specified backend.
	pub fn new(backend: Box<dyn SearchInterface>) -> Self {
		Self { backend }
	}

	/// Creates the collection when it does not exist yet.
	pub async fn ensure_collection(&self, collection: &str) -> Result<(), SearchError> {
		self.backend.ensure_collection(collection).await
	}

	/// Inserts or replaces a document by id.
	pub async fn upsert_document(
		&self,
		collection: &str,
		id: u64,
		document: serde_json::Value,
	) -> Result<(), SearchError> {
		self.backend.upsert_document(collection, id, document).await
	}

	/// Removes a document by id.
	pub async fn delete_document(&self, collection: &str, id: u64) -> Result<(), SearchError> {
		self.backend.delete_document(collection, id).await
	}

	/// Drops a whole collection.
	pub async fn drop_collection(&self, collection: &str) -> Result<(), SearchError> {
		self.backend.drop_collection(collection).await
	}

	/// Runs a query against a collection.
	pub async fn query(
		&self,
		collection: &str,
		query: &SearchQuery,
	) -> Result<SearchResults, SearchError> {
		self.backend.query(collection, query).await
	}
}
