//! Immutable graph snapshot and its builder.
//!
//! The directed relationship store (a petgraph `DiGraph`) is the source of truth.
//! `finalize()` derives two read-only indices from it:
//! - per-node out/in relationship counts (directed semantics preserved);
//! - a symmetric undirected adjacency used by every structural algorithm.
//!
//! Self-relationships are kept in the store but never enter the adjacency.

use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeMap, HashMap};

use crate::types::{GraphError, NodeRecord, RelationshipRecord, Result};

#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: Vec<NodeRecord>,
    index: HashMap<String, usize>,
    relationships: Vec<RelationshipRecord>,
    warnings: Vec<String>,
    strict: bool,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder whose `finalize` fails if any relationship had to be dropped.
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    /// Adds a node, or updates the attributes of an existing node with the same id.
    pub fn add_node(&mut self, record: NodeRecord) -> &mut Self {
        match self.index.get(&record.id) {
            Some(&pos) => self.nodes[pos] = record,
            None => {
                self.index.insert(record.id.clone(), self.nodes.len());
                self.nodes.push(record);
            }
        }
        self
    }

    /// Adds a relationship between two known nodes.
    ///
    /// Unknown endpoints make the call a no-op with a recorded warning.
    /// Negative or non-finite weights are rejected.
    pub fn add_relationship(&mut self, record: RelationshipRecord) -> Result<&mut Self> {
        if !record.weight.is_finite() || record.weight < 0.0 {
            return Err(GraphError::InvalidGraph(format!(
                "relationship {} -> {} has invalid weight {}",
                record.source, record.target, record.weight
            )));
        }

        let missing: Vec<&str> = [record.source.as_str(), record.target.as_str()]
            .into_iter()
            .filter(|id| !self.index.contains_key(*id))
            .collect();

        if !missing.is_empty() {
            let warning = format!(
                "dropped relationship {} -[{}]-> {}: unknown node(s) {}",
                record.source,
                record.relationship_type,
                record.target,
                missing.join(", ")
            );
            tracing::warn!("{}", warning);
            self.warnings.push(warning);
            return Ok(self);
        }

        self.relationships.push(record);
        Ok(self)
    }

    /// Shorthand for [`GraphBuilder::add_relationship`] with a plain weight and type.
    pub fn relate(
        &mut self,
        source: &str,
        target: &str,
        weight: f64,
        relationship_type: &str,
    ) -> Result<&mut Self> {
        self.add_relationship(
            RelationshipRecord::new(source, target)
                .with_weight(weight)
                .with_type(relationship_type),
        )
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Builds the derived indices and freezes the graph.
    pub fn finalize(self) -> Result<Graph> {
        if self.strict && !self.warnings.is_empty() {
            return Err(GraphError::InvalidGraph(format!(
                "{} relationship(s) reference unknown nodes; first: {}",
                self.warnings.len(),
                self.warnings[0]
            )));
        }

        let n = self.nodes.len();
        let mut store: DiGraph<NodeRecord, RelationshipRecord> =
            DiGraph::with_capacity(n, self.relationships.len());
        for node in self.nodes {
            store.add_node(node);
        }

        let mut out_degree = vec![0usize; n];
        let mut in_degree = vec![0usize; n];
        let mut pairs: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); n];
        let mut self_loops = 0usize;

        for rel in self.relationships {
            let (Some(&u), Some(&v)) = (self.index.get(&rel.source), self.index.get(&rel.target))
            else {
                continue;
            };
            out_degree[u] += 1;
            in_degree[v] += 1;

            if u == v {
                self_loops += 1;
            } else {
                *pairs[u].entry(v).or_insert(0.0) += rel.weight;
                *pairs[v].entry(u).or_insert(0.0) += rel.weight;
            }

            store.add_edge(NodeIndex::new(u), NodeIndex::new(v), rel);
        }

        let adjacency: Vec<Vec<(usize, f64)>> = pairs
            .into_iter()
            .map(|neighbors| neighbors.into_iter().collect())
            .collect();
        let undirected_edges = adjacency.iter().map(Vec::len).sum::<usize>() / 2;

        tracing::debug!(
            nodes = n,
            relationships = store.edge_count(),
            undirected_edges,
            dropped = self.warnings.len(),
            "Graph finalized"
        );

        Ok(Graph {
            store,
            index: self.index,
            out_degree,
            in_degree,
            adjacency,
            undirected_edges,
            self_loops,
            dropped_relationships: self.warnings.len(),
        })
    }
}

/// A finalized, read-only graph snapshot.
///
/// Nodes are addressed by dense indices `0..node_count()` in insertion order.
#[derive(Debug, Clone)]
pub struct Graph {
    store: DiGraph<NodeRecord, RelationshipRecord>,
    index: HashMap<String, usize>,
    out_degree: Vec<usize>,
    in_degree: Vec<usize>,
    adjacency: Vec<Vec<(usize, f64)>>,
    undirected_edges: usize,
    self_loops: usize,
    dropped_relationships: usize,
}

impl Graph {
    pub fn empty() -> Self {
        Self {
            store: DiGraph::new(),
            index: HashMap::new(),
            out_degree: Vec::new(),
            in_degree: Vec::new(),
            adjacency: Vec::new(),
            undirected_edges: 0,
            self_loops: 0,
            dropped_relationships: 0,
        }
    }

    pub fn node_count(&self) -> usize {
        self.store.node_count()
    }

    pub fn relationship_count(&self) -> usize {
        self.store.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.store.node_count() == 0
    }

    pub fn undirected_edge_count(&self) -> usize {
        self.undirected_edges
    }

    pub fn self_loop_count(&self) -> usize {
        self.self_loops
    }

    /// Relationships dropped at build time because an endpoint was unknown.
    pub fn dropped_relationships(&self) -> usize {
        self.dropped_relationships
    }

    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn node(&self, idx: usize) -> &NodeRecord {
        &self.store[NodeIndex::new(idx)]
    }

    pub fn node_by_id(&self, id: &str) -> Option<&NodeRecord> {
        self.node_index(id).map(|idx| self.node(idx))
    }

    pub fn node_id(&self, idx: usize) -> &str {
        &self.node(idx).id
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeRecord> {
        self.store.node_weights()
    }

    pub fn relationships(&self) -> impl Iterator<Item = &RelationshipRecord> {
        self.store.edge_weights()
    }

    pub fn neighbors(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        self.adjacency[idx].iter().map(|&(v, _)| v)
    }

    /// Undirected neighbors with the summed weight of all relationships to each.
    pub fn weighted_neighbors(&self, idx: usize) -> &[(usize, f64)] {
        &self.adjacency[idx]
    }

    /// Undirected degree, excluding self-relationships.
    pub fn degree(&self, idx: usize) -> usize {
        self.adjacency[idx].len()
    }

    pub fn degree_of(&self, id: &str) -> Option<usize> {
        self.node_index(id).map(|idx| self.degree(idx))
    }

    pub fn out_degree(&self, idx: usize) -> usize {
        self.out_degree[idx]
    }

    pub fn in_degree(&self, idx: usize) -> usize {
        self.in_degree[idx]
    }

    /// The directed relationship store.
    pub fn as_petgraph(&self) -> &DiGraph<NodeRecord, RelationshipRecord> {
        &self.store
    }

    /// Uniform seed weights over nodes flagged as entry points.
    pub fn entry_point_seeds(&self) -> HashMap<String, f64> {
        self.nodes()
            .filter(|node| node.is_entry_point())
            .map(|node| (node.id.clone(), 1.0))
            .collect()
    }

    /// Stable blake3 digest over node ids and relationships, in insertion order.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for node in self.nodes() {
            hasher.update(node.id.as_bytes());
            hasher.update(&[0]);
        }
        hasher.update(&[0xff]);
        for rel in self.relationships() {
            hasher.update(rel.source.as_bytes());
            hasher.update(&[0]);
            hasher.update(rel.target.as_bytes());
            hasher.update(&[0]);
            hasher.update(&rel.weight.to_le_bytes());
            hasher.update(rel.relationship_type.as_bytes());
            hasher.update(&[0]);
        }
        hasher.finalize().to_hex().to_string()
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{build_graph, path_graph};

    #[test]
    fn test_add_node_is_idempotent() {
        let mut builder = GraphBuilder::new();
        builder.add_node(NodeRecord::new("a").with_label("first"));
        builder.add_node(NodeRecord::new("b"));
        builder.add_node(NodeRecord::new("a").with_label("second"));
        let graph = builder.finalize().unwrap();

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.node_index("a"), Some(0));
        assert_eq!(graph.node(0).label, "second");
    }

    #[test]
    fn test_unknown_endpoint_dropped_with_warning() {
        let mut builder = GraphBuilder::new();
        builder.add_node(NodeRecord::new("a"));
        builder.relate("a", "ghost", 1.0, "mentions").unwrap();
        assert_eq!(builder.warnings().len(), 1);
        assert!(builder.warnings()[0].contains("ghost"));

        let graph = builder.finalize().unwrap();
        assert_eq!(graph.relationship_count(), 0);
        assert_eq!(graph.dropped_relationships(), 1);
        assert_eq!(graph.degree(0), 0);
    }

    #[test]
    fn test_strict_builder_rejects_dangling() {
        let mut builder = GraphBuilder::strict();
        builder.add_node(NodeRecord::new("a"));
        builder.relate("ghost", "a", 1.0, "mentions").unwrap();
        let err = builder.finalize().unwrap_err();
        assert!(matches!(err, GraphError::InvalidGraph(_)));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut builder = GraphBuilder::new();
        builder.add_node(NodeRecord::new("a"));
        builder.add_node(NodeRecord::new("b"));
        assert!(matches!(
            builder.relate("a", "b", -0.5, "x"),
            Err(GraphError::InvalidGraph(_))
        ));
        assert!(builder.relate("a", "b", f64::NAN, "x").is_err());
    }

    #[test]
    fn test_adjacency_symmetric_and_indices() {
        let graph = build_graph(&["a", "b", "c"], &[("a", "b"), ("b", "a"), ("b", "c")]);

        assert_eq!(graph.relationship_count(), 3);
        assert_eq!(graph.undirected_edge_count(), 2);
        assert_eq!(graph.degree_of("b"), Some(2));
        assert_eq!(graph.out_degree(1), 2);
        assert_eq!(graph.in_degree(1), 1);
        assert_eq!(graph.weighted_neighbors(0), &[(1, 2.0)]);

        for u in 0..graph.node_count() {
            for v in graph.neighbors(u) {
                assert!(graph.neighbors(v).any(|w| w == u));
            }
        }
    }

    #[test]
    fn test_self_loop_excluded_from_adjacency() {
        let graph = build_graph(&["a", "b"], &[("a", "a"), ("a", "b")]);
        assert_eq!(graph.relationship_count(), 2);
        assert_eq!(graph.self_loop_count(), 1);
        assert_eq!(graph.degree(0), 1);
        assert_eq!(graph.out_degree(0), 2);
        assert_eq!(graph.in_degree(0), 1);
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let a = path_graph(&["a", "b", "c"]);
        let b = path_graph(&["a", "b", "c"]);
        let c = path_graph(&["a", "c", "b"]);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn test_entry_point_seeds() {
        let mut builder = GraphBuilder::new();
        builder.add_node(
            NodeRecord::new("e1").with_attribute("entry_point", serde_json::Value::Bool(true)),
        );
        builder.add_node(NodeRecord::new("u1").with_type("SemanticUnit"));
        let graph = builder.finalize().unwrap();

        let seeds = graph.entry_point_seeds();
        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds.get("e1"), Some(&1.0));
    }
}
