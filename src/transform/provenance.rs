//! Provenance graph
//!
//! Two collections record where artifacts came from:
//!
//! - `nodes`: `{uri, type, generated?}`, one per URI
//! - `edges`: `{source, target, type, created_at}`, one per
//!   (source, target, type)
//!
//! Every write is match-then-set on the natural key, so repeating a
//! transform never duplicates graph entries.

use super::record::timestamp;
use crate::error::DistillResult;
use crate::store::{filter, Document, DocumentStore};
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Node collection
pub const NODES: &str = "nodes";

/// Edge collection
pub const EDGES: &str = "edges";

/// Node type for local files
pub const FILE_NODE: &str = "file";

/// Relationship recorded by an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Source file to its derived artifact
    Transform,
    /// Artifact to an auxiliary artifact it references
    RefersTo,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transform => "transform",
            Self::RefersTo => "refers_to",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Writes provenance nodes and edges to a document store
pub struct ProvenanceGraph {
    store: Arc<dyn DocumentStore>,
}

impl ProvenanceGraph {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Upsert a node; `generated` is only written when given
    pub fn upsert_node(
        &self,
        uri: &str,
        node_type: &str,
        generated: Option<bool>,
    ) -> DistillResult<()> {
        let mut set = Document::new();
        set.insert("type".to_string(), Value::from(node_type));
        if let Some(generated) = generated {
            set.insert("generated".to_string(), Value::Bool(generated));
        }

        let outcome = self
            .store
            .update_one(NODES, &filter([("uri", uri)]), &set, true)?;
        if outcome.upserted {
            debug!("Added provenance node {}", uri);
        }
        Ok(())
    }

    /// Insert an edge unless one with the same (source, target, type) exists
    pub fn upsert_edge(&self, source: &str, target: &str, kind: EdgeKind) -> DistillResult<()> {
        let key = filter([
            ("source", source),
            ("target", target),
            ("type", kind.as_str()),
        ]);
        if self.store.find_one(EDGES, &key)?.is_some() {
            return Ok(());
        }

        let mut doc = key;
        doc.insert(
            "created_at".to_string(),
            json!(timestamp::format(&super::record::now())),
        );
        self.store.insert_one(EDGES, doc)?;
        debug!("Added provenance edge {} -[{}]-> {}", source, kind, target);
        Ok(())
    }

    /// Record a completed transform and the references it produced
    pub fn record_transform(
        &self,
        source_uri: &str,
        output_uri: &str,
        referenced_uris: &[String],
    ) -> DistillResult<()> {
        self.upsert_node(source_uri, FILE_NODE, None)?;
        self.upsert_node(output_uri, FILE_NODE, Some(true))?;
        self.upsert_edge(source_uri, output_uri, EdgeKind::Transform)?;

        for reference in referenced_uris {
            self.upsert_node(reference, FILE_NODE, Some(true))?;
            self.upsert_edge(output_uri, reference, EdgeKind::RefersTo)?;
        }
        Ok(())
    }
}
