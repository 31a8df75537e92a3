use crate::graph::{Graph, GraphBuilder};
use crate::types::NodeRecord;

/// Builds a graph with unit-weight relationships; panics on invalid input.
pub fn build_graph(nodes: &[&str], edges: &[(&str, &str)]) -> Graph {
    let mut builder = GraphBuilder::new();
    for id in nodes {
        builder.add_node(NodeRecord::new(*id));
    }
    for (source, target) in edges {
        builder
            .relate(source, target, 1.0, "related")
            .expect("fixture relationship");
    }
    builder.finalize().expect("fixture graph")
}

pub fn weighted_graph(nodes: &[&str], edges: &[(&str, &str, f64)]) -> Graph {
    let mut builder = GraphBuilder::new();
    for id in nodes {
        builder.add_node(NodeRecord::new(*id));
    }
    for (source, target, weight) in edges {
        builder
            .relate(source, target, *weight, "related")
            .expect("fixture relationship");
    }
    builder.finalize().expect("fixture graph")
}

pub fn path_graph(nodes: &[&str]) -> Graph {
    let edges: Vec<(&str, &str)> = nodes.windows(2).map(|w| (w[0], w[1])).collect();
    build_graph(nodes, &edges)
}

pub fn cycle_graph(n: usize) -> Graph {
    let ids: Vec<String> = (0..n).map(|i| format!("n{}", i)).collect();
    let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let edges: Vec<(&str, &str)> = (0..n).map(|i| (refs[i], refs[(i + 1) % n])).collect();
    build_graph(&refs, &edges)
}

/// Star with center "X" and leaves "L0".."L{leaves-1}".
pub fn star_graph(leaves: usize) -> Graph {
    let mut ids: Vec<String> = vec!["X".to_string()];
    ids.extend((0..leaves).map(|i| format!("L{}", i)));
    let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let edges: Vec<(&str, &str)> = refs[1..].iter().map(|leaf| ("X", *leaf)).collect();
    build_graph(&refs, &edges)
}

pub fn clique_edges<'a>(nodes: &[&'a str]) -> Vec<(&'a str, &'a str)> {
    let mut edges = Vec::new();
    for i in 0..nodes.len() {
        for j in (i + 1)..nodes.len() {
            edges.push((nodes[i], nodes[j]));
        }
    }
    edges
}

pub fn two_triangles() -> Graph {
    build_graph(
        &["A", "B", "C", "D", "E", "F"],
        &[
            ("A", "B"),
            ("B", "C"),
            ("C", "A"),
            ("D", "E"),
            ("E", "F"),
            ("F", "D"),
        ],
    )
}
