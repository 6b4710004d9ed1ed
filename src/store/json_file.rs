//! JSON-file-backed document store
//!
//! Each collection is a single `<collection>.json` file holding a JSON
//! array. Every mutating call rewrites the file through a temporary file
//! and a rename, so readers never observe a half-written collection.

use super::{query, Document, DocumentStore, Filter, FindOptions, UpdateOutcome};
use crate::error::{DistillError, DistillResult};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Document store persisting collections as JSON files in a directory
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    // serialises read-modify-write cycles within this process only
    guard: Mutex<()>,
}

impl JsonFileStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> DistillResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| DistillError::io(format!("creating database dir {}", dir.display()), e))?;
        debug!("Opened JSON document store at {}", dir.display());
        Ok(Self {
            dir,
            guard: Mutex::new(()),
        })
    }

    /// Directory holding the collection files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        self.dir.join(format!("{}.json", collection))
    }

    fn lock(&self) -> DistillResult<MutexGuard<'_, ()>> {
        self.guard
            .lock()
            .map_err(|_| DistillError::Store("json store lock poisoned".to_string()))
    }

    fn load(&self, collection: &str) -> DistillResult<Vec<Document>> {
        let path = self.collection_path(collection);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| DistillError::io(format!("reading collection {}", path.display()), e))?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content).map_err(|e| {
            DistillError::Store(format!("corrupt collection {}: {}", path.display(), e))
        })
    }

    fn persist(&self, collection: &str, docs: &[Document]) -> DistillResult<()> {
        let path = self.collection_path(collection);
        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(docs)?;

        fs::write(&tmp, content)
            .map_err(|e| DistillError::io(format!("writing collection {}", tmp.display()), e))?;
        fs::rename(&tmp, &path)
            .map_err(|e| DistillError::io(format!("replacing collection {}", path.display()), e))?;
        Ok(())
    }

    /// Load, mutate and write back a collection, skipping the write when unchanged
    fn modify<T>(
        &self,
        collection: &str,
        op: impl FnOnce(&mut Vec<Document>) -> (T, bool),
    ) -> DistillResult<T> {
        let _guard = self.lock()?;
        let mut docs = self.load(collection)?;
        let (result, dirty) = op(&mut docs);
        if dirty {
            self.persist(collection, &docs)?;
        }
        Ok(result)
    }
}

impl DocumentStore for JsonFileStore {
    fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> DistillResult<Vec<Document>> {
        let _guard = self.lock()?;
        let docs = self.load(collection)?;
        Ok(query::find(&docs, filter, options))
    }

    fn count_documents(&self, collection: &str, filter: &Filter) -> DistillResult<u64> {
        let _guard = self.lock()?;
        let docs = self.load(collection)?;
        Ok(query::count(&docs, filter))
    }

    fn insert_one(&self, collection: &str, document: Document) -> DistillResult<()> {
        self.modify(collection, |docs| {
            query::insert(docs, document);
            ((), true)
        })
    }

    fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        set: &Document,
        upsert: bool,
    ) -> DistillResult<UpdateOutcome> {
        self.modify(collection, |docs| {
            let outcome = query::update_one(docs, filter, set, upsert);
            let dirty = outcome.modified > 0 || outcome.upserted;
            (outcome, dirty)
        })
    }

    fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        set: &Document,
    ) -> DistillResult<u64> {
        self.modify(collection, |docs| {
            let n = query::update_many(docs, filter, set);
            (n, n > 0)
        })
    }

    fn delete_one(&self, collection: &str, filter: &Filter) -> DistillResult<u64> {
        self.modify(collection, |docs| {
            let n = query::delete_one(docs, filter);
            (n, n > 0)
        })
    }

    fn delete_many(&self, collection: &str, filter: &Filter) -> DistillResult<u64> {
        self.modify(collection, |docs| {
            let n = query::delete_many(docs, filter);
            (n, n > 0)
        })
    }
}
