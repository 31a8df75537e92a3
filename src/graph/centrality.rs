//! Betweenness centrality.
//!
//! Brandes' algorithm for **undirected, unweighted** graphs over the
//! undirected adjacency index. Every source runs a BFS; dependencies are
//! back-propagated in order of non-increasing distance.
//!
//! Each unordered pair is visited from both ends, so dividing the raw sum by
//! `(n-1)(n-2)` gives the standard undirected normalization `2/((n-1)(n-2))`
//! applied to pair counts. Disconnected pairs contribute nothing.

use serde::Serialize;
use std::collections::VecDeque;

use super::model::Graph;
use crate::cancel::CancelSignal;
use crate::config::CentralityConfig;
use crate::types::NodeValues;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    SizeLimitExceeded,
    Cancelled,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SizeLimitExceeded => write!(f, "size_limit_exceeded"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CentralityResult {
    pub scores: NodeValues<f64>,
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<SkipReason>,
}

impl CentralityResult {
    fn skipped(reason: SkipReason) -> Self {
        Self {
            scores: NodeValues::new(),
            skipped: true,
            reason: Some(reason),
        }
    }

    pub fn score(&self, id: &str) -> Option<f64> {
        self.scores.get(id).copied()
    }

    /// True when the scores carry no signal: skipped, empty, or all zero.
    pub fn is_flat(&self) -> bool {
        self.skipped || self.scores.values().all(|&s| s == 0.0)
    }
}

pub fn compute_betweenness_centrality(graph: &Graph, max_nodes: usize) -> CentralityResult {
    compute_betweenness_centrality_with(
        graph,
        &CentralityConfig { max_nodes },
        &CancelSignal::none(),
    )
}

pub fn compute_betweenness_centrality_with(
    graph: &Graph,
    config: &CentralityConfig,
    cancel: &CancelSignal,
) -> CentralityResult {
    let n = graph.node_count();
    if n > config.max_nodes {
        tracing::warn!(
            nodes = n,
            max_nodes = config.max_nodes,
            "Skipping betweenness centrality: graph exceeds node ceiling"
        );
        return CentralityResult::skipped(SkipReason::SizeLimitExceeded);
    }

    if n < 3 {
        return CentralityResult {
            scores: (0..n)
                .map(|v| (graph.node_id(v).to_string(), 0.0))
                .collect(),
            skipped: false,
            reason: None,
        };
    }

    let mut betweenness = vec![0.0f64; n];

    let mut stack: Vec<usize> = Vec::with_capacity(n);
    let mut queue: VecDeque<usize> = VecDeque::with_capacity(n);
    let mut pred: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut sigma = vec![0.0f64; n];
    let mut dist: Vec<i64> = vec![-1; n];
    let mut delta = vec![0.0f64; n];

    for s in 0..n {
        if cancel.is_cancelled() {
            tracing::warn!(processed_sources = s, "Betweenness centrality cancelled");
            return CentralityResult::skipped(SkipReason::Cancelled);
        }

        // Isolated sources reach nothing.
        if graph.degree(s) == 0 {
            continue;
        }

        stack.clear();
        queue.clear();
        pred.iter_mut().for_each(Vec::clear);
        sigma.fill(0.0);
        dist.fill(-1);
        delta.fill(0.0);

        sigma[s] = 1.0;
        dist[s] = 0;
        queue.push_back(s);

        while let Some(v) = queue.pop_front() {
            stack.push(v);
            for w in graph.neighbors(v) {
                if dist[w] < 0 {
                    dist[w] = dist[v] + 1;
                    queue.push_back(w);
                }
                if dist[w] == dist[v] + 1 {
                    sigma[w] += sigma[v];
                    pred[w].push(v);
                }
            }
        }

        while let Some(w) = stack.pop() {
            let sigma_w = sigma[w];
            for &v in &pred[w] {
                if sigma_w > 0.0 {
                    delta[v] += (sigma[v] / sigma_w) * (1.0 + delta[w]);
                }
            }
            if w != s {
                betweenness[w] += delta[w];
            }
        }
    }

    let norm = 1.0 / ((n - 1) * (n - 2)) as f64;
    let scores = (0..n)
        .map(|v| (graph.node_id(v).to_string(), betweenness[v] * norm))
        .collect();

    tracing::debug!(nodes = n, "Betweenness centrality complete");

    CentralityResult {
        scores,
        skipped: false,
        reason: None,
    }
}
