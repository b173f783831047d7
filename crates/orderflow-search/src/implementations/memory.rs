//! In-memory search mirror implementation.
//!
//! Collections are maps of document id to JSON document. Term matching is a
//! case-insensitive substring scan over every string value in a document,
//! which is enough for order numbers, names and phone fragments.

use crate::{SearchError, SearchInterface, SearchQuery, SearchResults};
use async_trait::async_trait;
use orderflow_types::{ConfigSchema, Schema, ValidationError};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

type Collections = Arc<RwLock<HashMap<String, BTreeMap<u64, serde_json::Value>>>>;

/// In-memory search mirror. Clones share the same collections.
#[derive(Clone)]
pub struct MemorySearch {
	collections: Collections,
}

impl MemorySearch {
	/// Creates an empty mirror.
	pub fn new() -> Self {
		Self {
			collections: Arc::new(RwLock::new(HashMap::new())),
		}
	}
}

impl Default for MemorySearch {
	fn default() -> Self {
		Self::new()
	}
}

fn contains_term(value: &serde_json::Value, term: &str) -> bool {
	match value {
		serde_json::Value::String(text) => text.to_lowercase().contains(term),
		serde_json::Value::Array(items) => items.iter().any(|item| contains_term(item, term)),
		serde_json::Value::Object(fields) => {
			fields.values().any(|field| contains_term(field, term))
		}
		serde_json::Value::Number(number) => number.to_string().contains(term),
		_ => false,
	}
}

fn matches(document: &serde_json::Value, query: &SearchQuery) -> bool {
	for (field, expected) in &query.filters {
		if document.get(field) != Some(expected) {
			return false;
		}
	}
	match &query.term {
		Some(term) => contains_term(document, &term.to_lowercase()),
		None => true,
	}
}

#[async_trait]
impl SearchInterface for MemorySearch {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemorySearchSchema)
	}

	async fn ensure_collection(&self, collection: &str) -> Result<(), SearchError> {
		let mut collections = self
			.collections
			.write()
			.map_err(|e| SearchError::Backend(e.to_string()))?;
		collections.entry(collection.to_string()).or_default();
		Ok(())
	}

	async fn upsert_document(
		&self,
		collection: &str,
		id: u64,
		document: serde_json::Value,
	) -> Result<(), SearchError> {
		let mut collections = self
			.collections
			.write()
			.map_err(|e| SearchError::Backend(e.to_string()))?;
		collections
			.entry(collection.to_string())
			.or_default()
			.insert(id, document);
		Ok(())
	}

	async fn delete_document(&self, collection: &str, id: u64) -> Result<(), SearchError> {
		let mut collections = self
			.collections
			.write()
			.map_err(|e| SearchError::Backend(e.to_string()))?;
		if let Some(documents) = collections.get_mut(collection) {
			documents.remove(&id);
		}
		Ok(())
	}

	async fn drop_collection(&self, collection: &str) -> Result<(), SearchError> {
		let mut collections = self
			.collections
			.write()
			.map_err(|e| SearchError::Backend(e.to_string()))?;
		collections.remove(collection);
		Ok(())
	}

	async fn query(
		&self,
		collection: &str,
		query: &SearchQuery,
	) -> Result<SearchResults, SearchError> {
		let collections = self
			.collections
			.read()
			.map_err(|e| SearchError::Backend(e.to_string()))?;
		let documents = collections
			.get(collection)
			.ok_or_else(|| SearchError::CollectionNotFound(collection.to_string()))?;

		// Newest first, matching the order listing endpoints.
		let matched: Vec<&serde_json::Value> = documents
			.values()
			.rev()
			.filter(|document| matches(document, query))
			.collect();
		let total = matched.len();
		let hits = matched
			.into_iter()
			.skip(query.skip)
			.take(query.limit)
			.cloned()
			.collect();
		Ok(SearchResults { hits, total })
	}
}

/// Configuration schema for MemorySearch.
pub struct MemorySearchSchema;

impl ConfigSchema for MemorySearchSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		// Memory mirror has no required configuration
		Schema::new(vec![], vec![]).validate(config)
	}
}

/// Factory function to create a memory search mirror from configuration.
pub fn create_search(_config: &toml::Value) -> Result<Box<dyn SearchInterface>, SearchError> {
	Ok(Box::new(MemorySearch::new()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	async fn seeded() -> MemorySearch {
		let mirror = MemorySearch::new();
		mirror.ensure_collection("orders").await.unwrap();
		mirror
			.upsert_document(
				"orders",
				1,
				json!({
					"id": 1,
					"id_for_customer": "00001",
					"customer": "Anna Koval",
					"phone": "+380501112233",
					"status": "NEW",
				}),
			)
			.await
			.unwrap();
		mirror
			.upsert_document(
				"orders",
				2,
				json!({
					"id": 2,
					"id_for_customer": "00002",
					"customer": "Borys Shevchenko",
					"phone": "+380671234567",
					"status": "SHIPPED",
				}),
			)
			.await
			.unwrap();
		mirror
	}

	#[tokio::test]
	async fn term_matches_nested_strings() {
		let mirror = seeded().await;
		let results = mirror
			.query(
				"orders",
				&SearchQuery {
					term: Some("koval".to_string()),
					limit: 10,
					..SearchQuery::default()
				},
			)
			.await
			.unwrap();
		assert_eq!(results.total, 1);
		assert_eq!(results.hits[0]["id"], 1);
	}

	#[tokio::test]
	async fn filters_and_paging() {
		let mirror = seeded().await;
		let results = mirror
			.query(
				"orders",
				&SearchQuery {
					filters: vec![("status".to_string(), serde_json::json!("SHIPPED"))],
					limit: 10,
					..SearchQuery::default()
				},
			)
			.await
			.unwrap();
		assert_eq!(results.total, 1);
		assert_eq!(results.hits[0]["id"], 2);

		// Paging keeps the total of all matches.
		let paged = mirror
			.query(
				"orders",
				&SearchQuery {
					skip: 1,
					limit: 1,
					..SearchQuery::default()
				},
			)
			.await
			.unwrap();
		assert_eq!(paged.total, 2);
		assert_eq!(paged.hits.len(), 1);
	}

	#[tokio::test]
	async fn drop_and_missing_collection() {
		let mirror = seeded().await;
		mirror.drop_collection("orders").await.unwrap();
		assert!(matches!(
			mirror.query("orders", &SearchQuery::default()).await,
			Err(SearchError::CollectionNotFound(_))
		));
	}
}
