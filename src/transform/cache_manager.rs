//! Cache directory and byte budget
//!
//! Tracks the running byte total of all cached artifacts in a small
//! side-record next to the artifacts and evicts least-recently-accessed
//! entries when a new artifact would overflow the budget.
//!
//! # Concurrency
//!
//! There is no cross-process locking. Two processes sharing one cache
//! directory can race on eviction and on the counter, double-evicting or
//! under-counting; [`CacheManager::recount`] repairs the counter.

use super::record::{refs_dir, TransformRecord, TRANSFORMS};
use super::uri;
use crate::error::{DistillError, DistillResult};
use crate::store::{DocumentStore, Filter, FindOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Side-record holding the running byte total
pub const SIZE_FILE: &str = "cache_size.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct SizeCounter {
    total_size_bytes: u64,
}

/// Format bytes as human-readable size (e.g., "1.5 GB")
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Delete an artifact file and its `.refs/` directory, whichever exist
pub fn discard_artifact(path: &Path) -> DistillResult<()> {
    if path.is_file() {
        fs::remove_file(path)
            .map_err(|e| DistillError::io(format!("removing {}", path.display()), e))?;
    }
    let refs = refs_dir(path);
    if refs.is_dir() {
        fs::remove_dir_all(&refs)
            .map_err(|e| DistillError::io(format!("removing {}", refs.display()), e))?;
    }
    Ok(())
}

/// Cache size status relative to the budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSizeStatus {
    /// Under 80% of budget
    Ok,
    /// Between 80% and 100% of budget
    Warning,
    /// At or over the budget
    Exceeded,
}

impl CacheSizeStatus {
    /// Determine status based on current size and budget
    pub fn from_usage(current_bytes: u64, budget_bytes: u64) -> Self {
        if budget_bytes == 0 {
            return if current_bytes == 0 { Self::Ok } else { Self::Exceeded };
        }
        let percent = Self::percentage(current_bytes, budget_bytes);
        if percent >= 100.0 {
            Self::Exceeded
        } else if percent >= 80.0 {
            Self::Warning
        } else {
            Self::Ok
        }
    }

    /// Get percentage of budget used
    pub fn percentage(current_bytes: u64, budget_bytes: u64) -> f64 {
        if budget_bytes == 0 {
            return 0.0;
        }
        (current_bytes as f64 / budget_bytes as f64) * 100.0
    }
}

/// Outcome of reconciling the counter with the record store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recount {
    /// Counter value before reconciliation
    pub before: u64,
    /// Counter value after reconciliation
    pub after: u64,
    /// Records dropped because their artifact was gone
    pub stale_records: u64,
}

/// Owns the cache directory and its byte budget
pub struct CacheManager {
    cache_dir: PathBuf,
    budget_bytes: u64,
    store: Arc<dyn DocumentStore>,
}

impl CacheManager {
    /// Create a manager for `cache_dir`, creating the directory if needed
    pub fn new(
        cache_dir: impl Into<PathBuf>,
        budget_bytes: u64,
        store: Arc<dyn DocumentStore>,
    ) -> DistillResult<Self> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir).map_err(|e| {
            DistillError::io(format!("creating cache dir {}", cache_dir.display()), e)
        })?;

        Ok(Self {
            cache_dir,
            budget_bytes,
            store,
        })
    }

    /// Cache directory
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Configured byte budget
    pub fn budget_bytes(&self) -> u64 {
        self.budget_bytes
    }

    fn counter_path(&self) -> PathBuf {
        self.cache_dir.join(SIZE_FILE)
    }

    /// Running byte total; a missing or unreadable counter reads as zero
    pub fn get_current_size(&self) -> DistillResult<u64> {
        let path = self.counter_path();
        if !path.exists() {
            return Ok(0);
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| DistillError::io(format!("reading {}", path.display()), e))?;
        match serde_json::from_str::<SizeCounter>(&content) {
            Ok(counter) => Ok(counter.total_size_bytes),
            Err(e) => {
                warn!("Ignoring unreadable cache size counter {}: {}", path.display(), e);
                Ok(0)
            }
        }
    }

    fn set_size(&self, total_size_bytes: u64) -> DistillResult<()> {
        let path = self.counter_path();
        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_string(&SizeCounter { total_size_bytes })?;

        fs::write(&tmp, content)
            .map_err(|e| DistillError::io(format!("writing {}", tmp.display()), e))?;
        fs::rename(&tmp, &path)
            .map_err(|e| DistillError::io(format!("replacing {}", path.display()), e))?;
        Ok(())
    }

    /// Add an artifact's size to the running total
    pub fn add_file(&self, size: u64) -> DistillResult<u64> {
        let total = self.get_current_size()?.saturating_add(size);
        self.set_size(total)?;
        Ok(total)
    }

    /// Subtract an artifact's size from the running total, clamped at zero
    pub fn remove_file(&self, size: u64) -> DistillResult<u64> {
        let total = self.get_current_size()?.saturating_sub(size);
        self.set_size(total)?;
        Ok(total)
    }

    /// Reset the running total to zero
    pub fn reset(&self) -> DistillResult<()> {
        self.set_size(0)
    }

    /// Evict least-recently-accessed entries until `new_size` more bytes fit
    ///
    /// Returns the evicted artifact URIs. If the store runs out of entries
    /// first (e.g. one artifact larger than the whole budget), everything
    /// evictable is evicted and the call still succeeds.
    pub fn ensure_space(&self, new_size: u64) -> DistillResult<Vec<String>> {
        let current = self.get_current_size()?;
        let wanted = current.saturating_add(new_size);
        if wanted <= self.budget_bytes {
            return Ok(Vec::new());
        }

        let bytes_needed = wanted - self.budget_bytes;
        debug!(
            "Cache over budget by {} (current {}, incoming {})",
            format_bytes(bytes_needed),
            format_bytes(current),
            format_bytes(new_size)
        );

        let oldest_first =
            self.store
                .find(TRANSFORMS, &Filter::new(), &FindOptions::sort_asc("last_accessed"))?;

        let mut selected = Vec::new();
        let mut freed: u64 = 0;
        for doc in oldest_first {
            if freed >= bytes_needed {
                break;
            }
            let record = TransformRecord::from_document(doc)?;
            freed = freed.saturating_add(record.size_bytes);
            selected.push(record);
        }

        let mut evicted = Vec::with_capacity(selected.len());
        for record in selected {
            self.evict(&record)?;
            evicted.push(record.cache_uri);
        }

        if freed < bytes_needed {
            warn!(
                "Evicted everything available but still {} over budget",
                format_bytes(bytes_needed - freed)
            );
        }
        Ok(evicted)
    }

    /// Delete whatever is left on disk for a record
    pub fn discard(&self, record: &TransformRecord) -> DistillResult<()> {
        match self.artifact_path(record) {
            Some(path) => discard_artifact(&path),
            None => Ok(()),
        }
    }

    /// Delete one record's artifact, record and counted bytes
    fn evict(&self, record: &TransformRecord) -> DistillResult<()> {
        self.discard(record)?;
        self.store.delete_one(TRANSFORMS, &record.natural_key())?;
        self.remove_file(record.size_bytes)?;
        info!(
            "Evicted {} ({})",
            record.cache_uri,
            format_bytes(record.size_bytes)
        );
        Ok(())
    }

    /// Artifact location for a record: its cache URI, else the key-derived path
    pub fn artifact_path(&self, record: &TransformRecord) -> Option<PathBuf> {
        uri::uri_to_path(&record.cache_uri).or_else(|| record.artifact_path(&self.cache_dir))
    }

    /// Reconcile the counter with the records whose artifacts still exist
    ///
    /// Records pointing at vanished artifacts are deleted.
    pub fn recount(&self) -> DistillResult<Recount> {
        let before = self.get_current_size()?;
        let docs = self
            .store
            .find(TRANSFORMS, &Filter::new(), &FindOptions::default())?;

        let mut live_total: u64 = 0;
        let mut stale_records = 0;
        for doc in docs {
            let record = TransformRecord::from_document(doc)?;
            let present = self.artifact_path(&record).is_some_and(|p| p.is_file());
            if present {
                live_total = live_total.saturating_add(record.size_bytes);
            } else {
                warn!("Dropping stale record for {}", record.cache_uri);
                self.discard(&record)?;
                self.store.delete_one(TRANSFORMS, &record.natural_key())?;
                stale_records += 1;
            }
        }

        self.set_size(live_total)?;
        info!(
            "Recounted cache: {} -> {} ({} stale records)",
            format_bytes(before),
            format_bytes(live_total),
            stale_records
        );
        Ok(Recount {
            before,
            after: live_total,
            stale_records,
        })
    }
}
