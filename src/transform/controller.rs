//! Transform controller
//!
//! Turns a (source file, engine, options) triple into a cached artifact:
//! checksum the input, look up the record store, run the engine on a miss,
//! account for the bytes, persist the record and update the provenance
//! graph. Also serves cached content back by key or by path, deleting
//! records whose artifact has disappeared.

use super::cache_manager::{discard_artifact, CacheManager, CacheSizeStatus, Recount};
use super::checksum;
use super::engine::{merge_options, EngineOptions, Progress};
use super::provenance::ProvenanceGraph;
use super::record::{self, natural_key, TransformRecord, TRANSFORMS};
use super::registry::EngineRegistry;
use super::uri;
use crate::config::{Config, ConfigManager};
use crate::error::{DistillError, DistillResult};
use crate::journal::{self, Journal};
use crate::store::{filter, Document, DocumentStore, Filter, FindOptions, JsonFileStore, ID_FIELD};
use serde::Serialize;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a `transform` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransformOutcome {
    /// `sha256(checksum || engine || options_hash)`
    pub cache_key: String,
    /// Whether the artifact was served from cache
    pub was_cached: bool,
    /// Location of the artifact in the cache directory
    pub cache_path: PathBuf,
}

/// Snapshot of the cache for `distill cache stats`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of transform records
    pub entries: u64,
    /// Running byte total from the counter
    pub total_size_bytes: u64,
    /// Sum of `size_bytes` over all records
    pub recorded_bytes: u64,
    /// Configured byte budget
    pub budget_bytes: u64,
}

impl CacheStats {
    pub fn status(&self) -> CacheSizeStatus {
        CacheSizeStatus::from_usage(self.total_size_bytes, self.budget_bytes)
    }

    pub fn percentage(&self) -> f64 {
        CacheSizeStatus::percentage(self.total_size_bytes, self.budget_bytes)
    }

    /// Counter and records disagree (crash or concurrent writer)
    pub fn has_drift(&self) -> bool {
        self.total_size_bytes != self.recorded_bytes
    }
}

/// A record together with the filter that selects exactly its document
struct Located {
    selector: Filter,
    record: TransformRecord,
}

impl Located {
    fn from_document(doc: Document) -> DistillResult<Self> {
        let selector = match doc.get(ID_FIELD) {
            Some(id) => {
                let mut f = Filter::new();
                f.insert(ID_FIELD.to_string(), id.clone());
                Some(f)
            }
            None => None,
        };
        let record = TransformRecord::from_document(doc)?;
        let selector = selector.unwrap_or_else(|| record.natural_key());
        Ok(Self { selector, record })
    }
}

/// Orchestrates engines, the cache directory and the record store
pub struct TransformController {
    registry: EngineRegistry,
    cache: CacheManager,
    store: Arc<dyn DocumentStore>,
    graph: ProvenanceGraph,
    default_engine: String,
    journal: Option<Journal>,
}

impl TransformController {
    pub fn new(
        registry: EngineRegistry,
        cache: CacheManager,
        store: Arc<dyn DocumentStore>,
        default_engine: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            cache,
            graph: ProvenanceGraph::new(store.clone()),
            store,
            default_engine: default_engine.into(),
            journal: None,
        }
    }

    /// Record events to a journal
    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Build a controller backed by the on-disk store and cache from config
    pub fn from_config(config: &Config) -> DistillResult<Self> {
        let store: Arc<dyn DocumentStore> =
            Arc::new(JsonFileStore::open(ConfigManager::database_dir(config))?);
        let cache = CacheManager::new(
            ConfigManager::cache_dir(config),
            config.cache.budget_bytes(),
            store.clone(),
        )?;
        let registry = EngineRegistry::from_config(config);

        Ok(Self::new(registry, cache, store, config.cache.default_engine.clone())
            .with_journal(Journal::new(config)))
    }

    pub fn registry(&self) -> &EngineRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    pub fn default_engine(&self) -> &str {
        &self.default_engine
    }

    fn journal(&self, event: &str, data: Value) {
        if let Some(journal) = &self.journal {
            journal.log(event, &data);
        }
    }

    /// Transform `path`, logging engine progress at debug level
    pub fn transform(
        &self,
        path: &Path,
        engine_name: &str,
        overrides: &EngineOptions,
        output: Option<&Path>,
    ) -> DistillResult<TransformOutcome> {
        self.transform_with_progress(path, engine_name, overrides, output, &mut |msg| {
            debug!("{}", msg)
        })
    }

    /// Transform `path`, forwarding engine progress messages to `progress`
    pub fn transform_with_progress(
        &self,
        path: &Path,
        engine_name: &str,
        overrides: &EngineOptions,
        output: Option<&Path>,
        progress: Progress<'_>,
    ) -> DistillResult<TransformOutcome> {
        let source_size = match fs::metadata(path) {
            Ok(meta) if meta.is_file() => meta.len(),
            _ => return Err(DistillError::FileNotFound(path.to_path_buf())),
        };
        let source = uri::canonical(path)?;
        let path = source.as_path();

        let registered = self.registry.get(engine_name)?;
        let options = merge_options(&registered.base_options, overrides);

        let file_checksum = checksum::sha256_file(path)?;
        let options_hash = registered.engine.options_hash(&options);
        let cache_key = checksum::cache_key(&file_checksum, &registered.name, &options_hash);

        let hit = self.lookup(&file_checksum, &registered.name, &options_hash, &cache_key)?;
        if let Some(hit) = hit {
            return self.serve_hit(hit, cache_key, output);
        }

        let extension = registered.engine.extension(&options);
        record::check_extension(&extension)?;
        let target = record::artifact_path(self.cache.cache_dir(), &cache_key, &extension);
        if target.exists() || record::refs_dir(&target).exists() {
            debug!("Removing orphaned artifact {}", target.display());
            discard_artifact(&target)?;
        }

        // artifact size is unknown until the engine runs; use the source as a proxy
        self.evict_for(source_size)?;

        info!(
            "Transforming {} with engine {}",
            path.display(),
            registered.name
        );
        let produced = registered
            .engine
            .transform(path, &target, &options, progress)?;

        let size_bytes = match fs::metadata(&target) {
            Ok(meta) if meta.is_file() => meta.len(),
            _ => {
                return Err(DistillError::engine_failure(
                    registered.name.as_str(),
                    format!("no output written to {}", target.display()),
                ))
            }
        };

        self.evict_for(size_bytes)?;
        self.cache.add_file(size_bytes)?;

        let now = record::now();
        let record = TransformRecord {
            file_uri: uri::file_uri(path),
            cache_uri: uri::file_uri(&target),
            checksum: file_checksum,
            size_bytes,
            created_at: now,
            last_accessed: now,
            engine: registered.name.clone(),
            options_hash,
            extension: Some(extension),
            cache_key: Some(cache_key.clone()),
            referenced_uris: produced.referenced_uris,
        };
        self.store.insert_one(TRANSFORMS, record.to_document()?)?;
        self.graph
            .record_transform(&record.file_uri, &record.cache_uri, &record.referenced_uris)?;

        if let Some(dest) = output {
            copy_to_output(&target, dest)?;
        }

        info!("Cached {} ({} bytes)", record.cache_uri, size_bytes);
        self.journal(
            journal::TRANSFORM_CREATED,
            json!({
                "cache_key": cache_key,
                "file_uri": record.file_uri,
                "engine": record.engine,
                "size_bytes": size_bytes,
            }),
        );

        Ok(TransformOutcome {
            cache_key,
            was_cached: false,
            cache_path: target,
        })
    }

    /// Find a live record for the natural key, dropping candidates whose
    /// artifact has gone
    fn lookup(
        &self,
        file_checksum: &str,
        engine: &str,
        options_hash: &str,
        cache_key: &str,
    ) -> DistillResult<Option<(Located, PathBuf)>> {
        let candidates = self.store.find(
            TRANSFORMS,
            &natural_key(file_checksum, engine, options_hash),
            &FindOptions::default(),
        )?;

        let mut hit = None;
        for doc in candidates {
            let located = Located::from_document(doc)?;
            let path = self.resolve_artifact(cache_key, &located.record)?;

            match path {
                Some(path) if hit.is_none() && path.is_file() => hit = Some((located, path)),
                Some(path) if path.is_file() => {}
                _ => self.heal(&located)?,
            }
        }
        Ok(hit)
    }

    fn serve_hit(
        &self,
        (located, path): (Located, PathBuf),
        cache_key: String,
        output: Option<&Path>,
    ) -> DistillResult<TransformOutcome> {
        debug!("Cache hit for {}", cache_key);
        self.touch(&located.selector)?;

        if let Some(dest) = output {
            copy_to_output(&path, dest)?;
        }

        self.journal(
            journal::TRANSFORM_HIT,
            json!({"cache_key": cache_key, "file_uri": located.record.file_uri}),
        );
        Ok(TransformOutcome {
            cache_key,
            was_cached: true,
            cache_path: path,
        })
    }

    fn touch(&self, selector: &Filter) -> DistillResult<()> {
        let mut set = Document::new();
        set.insert(
            "last_accessed".to_string(),
            json!(record::timestamp::format(&record::now())),
        );
        self.store.update_one(TRANSFORMS, selector, &set, false)?;
        Ok(())
    }

    fn evict_for(&self, incoming: u64) -> DistillResult<()> {
        for cache_uri in self.cache.ensure_space(incoming)? {
            self.journal(journal::CACHE_EVICTED, json!({"cache_uri": cache_uri}));
        }
        Ok(())
    }

    /// Drop a record whose artifact is gone, keeping the counter in step
    fn heal(&self, located: &Located) -> DistillResult<()> {
        warn!(
            "Removing stale record for {}: artifact missing",
            located.record.cache_uri
        );
        self.cache.discard(&located.record)?;
        self.store.delete_one(TRANSFORMS, &located.selector)?;
        self.cache.remove_file(located.record.size_bytes)?;
        self.journal(
            journal::RECORD_HEALED,
            json!({
                "cache_uri": located.record.cache_uri,
                "file_uri": located.record.file_uri,
            }),
        );
        Ok(())
    }

    /// Read cached content by cache key, or transform a path with the
    /// default engine first
    pub fn get_content(&self, target: &str, output: Option<&Path>) -> DistillResult<String> {
        if checksum::is_cache_key(target) {
            return self.read_cached(target, output);
        }

        let outcome = self.transform(
            Path::new(target),
            &self.default_engine,
            &EngineOptions::new(),
            None,
        )?;
        self.read_cached(&outcome.cache_key, output)
    }

    fn read_cached(&self, key: &str, output: Option<&Path>) -> DistillResult<String> {
        let located = self
            .find_by_key(key)?
            .ok_or_else(|| DistillError::ChecksumNotFound(key.to_string()))?;

        let path = self.resolve_artifact(key, &located.record)?;
        let path = match path {
            Some(path) if path.is_file() => path,
            other => {
                self.heal(&located)?;
                return Err(DistillError::CacheFileMissing {
                    key: key.to_string(),
                    path: other.unwrap_or_else(|| self.cache.cache_dir().join(key)),
                });
            }
        };

        self.touch(&located.selector)?;
        if let Some(dest) = output {
            copy_to_output(&path, dest)?;
        }

        fs::read_to_string(&path)
            .map_err(|e| DistillError::io(format!("reading {}", path.display()), e))
    }

    /// Point lookup on the persisted key, then a full scan for records
    /// written without one
    fn find_by_key(&self, key: &str) -> DistillResult<Option<Located>> {
        if let Some(doc) = self
            .store
            .find_one(TRANSFORMS, &filter([("cache_key", key)]))?
        {
            return Ok(Some(Located::from_document(doc)?));
        }

        debug!("Scanning records for key {}", key);
        let docs = self
            .store
            .find(TRANSFORMS, &Filter::new(), &FindOptions::default())?;
        for doc in docs {
            let located = Located::from_document(doc)?;
            if located.record.computed_key() == key {
                return Ok(Some(located));
            }
        }
        Ok(None)
    }

    /// Artifact path from the stored extension, else any `<key>.*` file
    fn resolve_artifact(
        &self,
        key: &str,
        record: &TransformRecord,
    ) -> DistillResult<Option<PathBuf>> {
        if let Some(path) = record.artifact_path(self.cache.cache_dir()) {
            return Ok(Some(path));
        }

        let dir = self.cache.cache_dir();
        let entries =
            fs::read_dir(dir).map_err(|e| DistillError::io(format!("reading {}", dir.display()), e))?;
        for entry in entries {
            let entry = entry.map_err(|e| DistillError::io("reading cache entry", e))?;
            let path = entry.path();
            if path.is_file() && path.file_stem().is_some_and(|stem| stem == key) {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    /// Counter, record totals and budget
    pub fn stats(&self) -> DistillResult<CacheStats> {
        let records = self.records()?;
        Ok(CacheStats {
            entries: records.len() as u64,
            total_size_bytes: self.cache.get_current_size()?,
            recorded_bytes: records.iter().map(|r| r.size_bytes).sum(),
            budget_bytes: self.cache.budget_bytes(),
        })
    }

    /// All records, most recently accessed first
    pub fn records(&self) -> DistillResult<Vec<TransformRecord>> {
        self.store
            .find(TRANSFORMS, &Filter::new(), &FindOptions::sort_desc("last_accessed"))?
            .into_iter()
            .map(TransformRecord::from_document)
            .collect()
    }

    /// Reconcile the byte counter with the records on disk
    pub fn recount(&self) -> DistillResult<Recount> {
        self.cache.recount()
    }

    /// Delete every artifact and record and reset the counter
    ///
    /// Provenance nodes and edges are kept.
    pub fn clear(&self) -> DistillResult<u64> {
        let records = self.records()?;
        for record in &records {
            self.cache.discard(record)?;
        }

        let removed = self.store.delete_many(TRANSFORMS, &Filter::new())?;
        self.cache.reset()?;
        info!("Cleared {} cached artifacts", removed);
        Ok(removed)
    }
}

/// Place an artifact at `dest`, hard-linking when possible
///
/// Refuses to overwrite an existing path.
pub fn copy_to_output(src: &Path, dest: &Path) -> DistillResult<()> {
    if dest.exists() {
        return Err(DistillError::OutputCollision(dest.to_path_buf()));
    }

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| DistillError::io(format!("creating {}", parent.display()), e))?;
    }

    if let Err(e) = fs::hard_link(src, dest) {
        debug!("Hard link to {} failed ({}), copying", dest.display(), e);
        fs::copy(src, dest).map_err(|e| {
            DistillError::io(
                format!("copying {} to {}", src.display(), dest.display()),
                e,
            )
        })?;
    }
    Ok(())
}
