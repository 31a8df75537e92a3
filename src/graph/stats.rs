use petgraph::algo::connected_components;
use serde::Serialize;
use std::collections::BTreeMap;

use super::model::Graph;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GraphStatistics {
    pub node_count: usize,
    /// Relationship records, self-relationships and parallel relationships included.
    pub edge_count: usize,
    /// Distinct neighbor pairs in the undirected adjacency.
    pub undirected_edge_count: usize,
    /// `2E / (V (V - 1))` over the undirected adjacency; 0 for fewer than two nodes.
    pub density: f64,
    /// Undirected degree -> number of nodes with that degree.
    pub degree_distribution: BTreeMap<usize, usize>,
    pub average_degree: f64,
    pub max_degree: usize,
    pub isolated_nodes: usize,
    pub self_loops: usize,
    pub connected_components: usize,
    pub node_types: BTreeMap<String, usize>,
    pub relationship_types: BTreeMap<String, usize>,
}

pub fn compute_graph_statistics(graph: &Graph) -> GraphStatistics {
    let n = graph.node_count();
    let undirected = graph.undirected_edge_count();

    let mut degree_distribution = BTreeMap::new();
    let mut max_degree = 0;
    let mut isolated_nodes = 0;
    for v in 0..n {
        let degree = graph.degree(v);
        *degree_distribution.entry(degree).or_insert(0) += 1;
        max_degree = max_degree.max(degree);
        if degree == 0 {
            isolated_nodes += 1;
        }
    }

    let density = if n < 2 {
        0.0
    } else {
        (2 * undirected) as f64 / (n * (n - 1)) as f64
    };
    let average_degree = if n == 0 {
        0.0
    } else {
        (2 * undirected) as f64 / n as f64
    };

    let mut node_types = BTreeMap::new();
    for node in graph.nodes() {
        *node_types.entry(node.node_type.clone()).or_insert(0) += 1;
    }
    let mut relationship_types = BTreeMap::new();
    for rel in graph.relationships() {
        *relationship_types
            .entry(rel.relationship_type.clone())
            .or_insert(0) += 1;
    }

    GraphStatistics {
        node_count: n,
        edge_count: graph.relationship_count(),
        undirected_edge_count: undirected,
        density,
        degree_distribution,
        average_degree,
        max_degree,
        isolated_nodes,
        self_loops: graph.self_loop_count(),
        connected_components: connected_components(graph.as_petgraph()),
        node_types,
        relationship_types,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{build_graph, path_graph, star_graph};

    #[test]
    fn test_empty_graph_statistics() {
        let stats = compute_graph_statistics(&Graph::empty());
        assert_eq!(stats.node_count, 0);
        assert_eq!(stats.edge_count, 0);
        assert_eq!(stats.density, 0.0);
        assert!(stats.degree_distribution.is_empty());
        assert_eq!(stats.connected_components, 0);
    }

    #[test]
    fn test_path_statistics() {
        let stats = compute_graph_statistics(&path_graph(&["A", "B", "C", "D", "E"]));
        assert_eq!(stats.node_count, 5);
        assert_eq!(stats.edge_count, 4);
        assert!((stats.density - 0.4).abs() < 1e-12);
        assert_eq!(stats.degree_distribution.get(&1), Some(&2));
        assert_eq!(stats.degree_distribution.get(&2), Some(&3));
        assert_eq!(stats.connected_components, 1);
        assert_eq!(stats.relationship_types.get("related"), Some(&4));
    }

    #[test]
    fn test_components_self_loops_and_isolated() {
        let graph = build_graph(&["a", "b", "c", "d"], &[("a", "b"), ("c", "c"), ("b", "a")]);
        let stats = compute_graph_statistics(&graph);
        assert_eq!(stats.edge_count, 3);
        assert_eq!(stats.undirected_edge_count, 1);
        assert_eq!(stats.self_loops, 1);
        assert_eq!(stats.isolated_nodes, 2);
        assert_eq!(stats.connected_components, 3);
        assert_eq!(stats.node_types.get("unknown"), Some(&4));
    }

    #[test]
    fn test_star_degrees() {
        let stats = compute_graph_statistics(&star_graph(5));
        assert_eq!(stats.max_degree, 5);
        assert!((stats.average_degree - 10.0 / 6.0).abs() < 1e-12);
    }
}
