//! JSON hand-off format between the graph-construction step and the engine.
//!
//! ```json
//! {
//!   "nodes": [{"id": "urn:unit:1", "type": "SemanticUnit", "label": "..."}],
//!   "relationships": [{"source": "urn:unit:1", "target": "urn:entity:hinton", "type": "mentions"}]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::graph::{Graph, GraphBuilder};
use crate::types::{NodeRecord, RelationshipRecord, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub relationships: Vec<RelationshipRecord>,
}

impl GraphSnapshot {
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let snapshot = Self::from_json(&raw)?;
        tracing::info!(
            path = %path.display(),
            nodes = snapshot.nodes.len(),
            relationships = snapshot.relationships.len(),
            "Loaded graph snapshot"
        );
        Ok(snapshot)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Builds the graph: all nodes first, then relationships.
    ///
    /// In strict mode any relationship to an unknown node fails the build;
    /// otherwise such relationships are dropped and counted on the graph.
    pub fn into_graph(self, strict: bool) -> Result<Graph> {
        let mut builder = if strict {
            GraphBuilder::strict()
        } else {
            GraphBuilder::new()
        };
        for node in self.nodes {
            builder.add_node(node);
        }
        for rel in self.relationships {
            builder.add_relationship(rel)?;
        }
        builder.finalize()
    }
}

impl From<&Graph> for GraphSnapshot {
    fn from(graph: &Graph) -> Self {
        Self {
            nodes: graph.nodes().cloned().collect(),
            relationships: graph.relationships().cloned().collect(),
        }
    }
}
