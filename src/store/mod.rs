//! Document store contract
//!
//! The transform cache keeps its metadata in schemaless document
//! collections. Anything that can filter on top-level field equality,
//! sort by one field, and apply `$set`-style updates can back it.
//!
//! Two backends ship with the crate:
//!
//! | Backend | Persistence | Use |
//! |---------|-------------|-----|
//! | [`MemoryStore`] | none | tests, embedding |
//! | [`JsonFileStore`] | one JSON array per collection | CLI default |
//!
//! No call is transactional with respect to any other call.

mod json_file;
mod memory;
mod query;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use crate::error::DistillResult;
use serde_json::{Map, Value};

/// A schemaless document
pub type Document = Map<String, Value>;

/// Equality conditions on top-level fields; every condition must match
pub type Filter = Map<String, Value>;

/// Field assigned to documents that are inserted without one
pub const ID_FIELD: &str = "_id";

/// Sort direction for [`FindOptions`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Ordering, limiting and projection for `find`
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    /// Field and direction to sort by
    pub sort: Option<(String, SortOrder)>,
    /// Maximum number of documents returned
    pub limit: Option<usize>,
    /// Top-level fields to keep (all fields when `None`)
    pub projection: Option<Vec<String>>,
}

impl FindOptions {
    /// Sort ascending by `field`
    pub fn sort_asc(field: impl Into<String>) -> Self {
        Self {
            sort: Some((field.into(), SortOrder::Ascending)),
            ..Self::default()
        }
    }

    /// Sort descending by `field`
    pub fn sort_desc(field: impl Into<String>) -> Self {
        Self {
            sort: Some((field.into(), SortOrder::Descending)),
            ..Self::default()
        }
    }

    /// Limit the number of results
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Keep only the given fields
    pub fn project<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Some(fields.into_iter().map(Into::into).collect());
        self
    }
}

/// Result of an `update_one` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateOutcome {
    /// Documents matched by the filter
    pub matched: u64,
    /// Documents whose fields changed
    pub modified: u64,
    /// Whether a new document was inserted by an upsert
    pub upserted: bool,
}

/// Abstract document-collection CRUD
pub trait DocumentStore: Send + Sync {
    /// Find all documents in `collection` matching `filter`
    fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> DistillResult<Vec<Document>>;

    /// Find the first matching document
    fn find_one(&self, collection: &str, filter: &Filter) -> DistillResult<Option<Document>> {
        let options = FindOptions::default().limit(1);
        Ok(self.find(collection, filter, &options)?.into_iter().next())
    }

    /// Count matching documents
    fn count_documents(&self, collection: &str, filter: &Filter) -> DistillResult<u64>;

    /// Insert a document, assigning an `_id` if it has none
    fn insert_one(&self, collection: &str, document: Document) -> DistillResult<()>;

    /// Set fields on the first matching document, optionally inserting one
    fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        set: &Document,
        upsert: bool,
    ) -> DistillResult<UpdateOutcome>;

    /// Set fields on every matching document, returning how many matched
    fn update_many(&self, collection: &str, filter: &Filter, set: &Document)
        -> DistillResult<u64>;

    /// Delete the first matching document, returning 0 or 1
    fn delete_one(&self, collection: &str, filter: &Filter) -> DistillResult<u64>;

    /// Delete every matching document, returning how many were removed
    fn delete_many(&self, collection: &str, filter: &Filter) -> DistillResult<u64>;
}

/// Build a filter from `(field, value)` pairs
pub fn filter<I, K, V>(pairs: I) -> Filter
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
