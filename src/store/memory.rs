//! In-process document store

use super::{query, Document, DocumentStore, Filter, FindOptions, UpdateOutcome};
use crate::error::{DistillError, DistillResult};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Document store held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> DistillResult<MutexGuard<'_, HashMap<String, Vec<Document>>>> {
        self.collections
            .lock()
            .map_err(|_| DistillError::Store("memory store lock poisoned".to_string()))
    }
}

impl DocumentStore for MemoryStore {
    fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> DistillResult<Vec<Document>> {
        let guard = self.lock()?;
        Ok(guard
            .get(collection)
            .map(|docs| query::find(docs, filter, options))
            .unwrap_or_default())
    }

    fn count_documents(&self, collection: &str, filter: &Filter) -> DistillResult<u64> {
        let guard = self.lock()?;
        Ok(guard
            .get(collection)
            .map(|docs| query::count(docs, filter))
            .unwrap_or(0))
    }

    fn insert_one(&self, collection: &str, document: Document) -> DistillResult<()> {
        let mut guard = self.lock()?;
        query::insert(guard.entry(collection.to_string()).or_default(), document);
        Ok(())
    }

    fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        set: &Document,
        upsert: bool,
    ) -> DistillResult<UpdateOutcome> {
        let mut guard = self.lock()?;
        let docs = guard.entry(collection.to_string()).or_default();
        Ok(query::update_one(docs, filter, set, upsert))
    }

    fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        set: &Document,
    ) -> DistillResult<u64> {
        let mut guard = self.lock()?;
        Ok(guard
            .get_mut(collection)
            .map(|docs| query::update_many(docs, filter, set))
            .unwrap_or(0))
    }

    fn delete_one(&self, collection: &str, filter: &Filter) -> DistillResult<u64> {
        let mut guard = self.lock()?;
        Ok(guard
            .get_mut(collection)
            .map(|docs| query::delete_one(docs, filter))
            .unwrap_or(0))
    }

    fn delete_many(&self, collection: &str, filter: &Filter) -> DistillResult<u64> {
        let mut guard = self.lock()?;
        Ok(guard
            .get_mut(collection)
            .map(|docs| query::delete_many(docs, filter))
            .unwrap_or(0))
    }
}
