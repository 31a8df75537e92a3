use serde::Serialize;

use super::model::Graph;
use crate::types::NodeValues;

#[derive(Debug, Clone, Serialize)]
pub struct KCoreResult {
    pub core_numbers: NodeValues<usize>,
    pub degeneracy: usize,
}

impl KCoreResult {
    pub fn core_number(&self, id: &str) -> Option<usize> {
        self.core_numbers.get(id).copied()
    }

    /// Ids of the nodes in the k-core, i.e. with core number >= `k`.
    pub fn members(&self, k: usize) -> Vec<&str> {
        self.core_numbers
            .iter()
            .filter(|(_, &core)| core >= k)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.core_numbers.is_empty()
    }
}

/// Core number of every node by degree-bucketed peeling, O(V + E).
///
/// Nodes are kept in an array sorted by current degree, with `bin[d]` pointing
/// at the first node of degree `d`. Decrementing a neighbor swaps it to the
/// front of its bucket and moves the bucket boundary, so each removal costs
/// O(degree).
pub fn compute_kcore(graph: &Graph) -> KCoreResult {
    let n = graph.node_count();
    if n == 0 {
        return KCoreResult {
            core_numbers: NodeValues::new(),
            degeneracy: 0,
        };
    }

    let mut degree: Vec<usize> = (0..n).map(|v| graph.degree(v)).collect();
    let max_degree = degree.iter().copied().max().unwrap_or(0);

    let mut bin = vec![0usize; max_degree + 1];
    for &d in &degree {
        bin[d] += 1;
    }
    let mut start = 0;
    for slot in bin.iter_mut() {
        let count = *slot;
        *slot = start;
        start += count;
    }

    let mut pos = vec![0usize; n];
    let mut vert = vec![0usize; n];
    for v in 0..n {
        pos[v] = bin[degree[v]];
        vert[pos[v]] = v;
        bin[degree[v]] += 1;
    }
    for d in (1..=max_degree).rev() {
        bin[d] = bin[d - 1];
    }
    bin[0] = 0;

    for i in 0..n {
        let v = vert[i];
        for u in graph.neighbors(v) {
            if degree[u] > degree[v] {
                let du = degree[u];
                let pu = pos[u];
                let pw = bin[du];
                let w = vert[pw];
                if u != w {
                    pos[u] = pw;
                    vert[pu] = w;
                    pos[w] = pu;
                    vert[pw] = u;
                }
                bin[du] += 1;
                degree[u] -= 1;
            }
        }
    }

    let degeneracy = degree.iter().copied().max().unwrap_or(0);
    let core_numbers = (0..n)
        .map(|v| (graph.node_id(v).to_string(), degree[v]))
        .collect();

    tracing::debug!(nodes = n, degeneracy, "K-core decomposition complete");

    KCoreResult {
        core_numbers,
        degeneracy,
    }
}
