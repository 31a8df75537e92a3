//! Modularity-based community detection (Leiden-style).
//!
//! Each level runs three phases on a weighted undirected level graph:
//! 1. local moving: nodes visited in index order move to the neighboring (or an
//!    empty) community with the best resolution-scaled gain;
//! 2. refinement: each community is split into its connected components;
//! 3. aggregation: every refined community becomes a super-node. The unrefined
//!    partition seeds the next level, so modularity carries over unchanged.
//!
//! Levels repeat until refinement leaves nothing to merge or `max_levels` is hit.
//! The returned partition is split into connected components once more, which
//! never lowers modularity.

use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};

use super::model::Graph;
use crate::cancel::CancelSignal;
use crate::config::CommunityConfig;
use crate::types::{NodeValues, Result};

const MAX_SWEEPS: usize = 64;
const GAIN_EPSILON: f64 = 1e-10;

#[derive(Debug, Clone, Serialize)]
pub struct Community {
    pub id: usize,
    pub size: usize,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommunityDiagnostics {
    pub levels: usize,
    pub converged: bool,
    /// The cancellation signal stopped local moving before convergence.
    pub cancelled: bool,
    /// Communities in the full partition, before size filtering and truncation.
    pub total_communities: usize,
    /// Communities left out for being smaller than `min_community_size`.
    pub dropped_small: usize,
    /// Communities left out by the `max_communities` cap.
    pub truncated: usize,
    /// Modularity of the initial singleton partition, after every level, and of the final partition.
    pub modularity_history: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommunityResult {
    /// Community id of every node. Ids are ordered by community size, largest first.
    pub assignment: NodeValues<usize>,
    /// Retained communities, largest first.
    pub communities: Vec<Community>,
    pub modularity: f64,
    pub diagnostics: CommunityDiagnostics,
}

impl CommunityResult {
    pub fn community_of(&self, id: &str) -> Option<usize> {
        self.assignment.get(id).copied()
    }

    pub fn members(&self, community: usize) -> Option<&[String]> {
        self.communities
            .iter()
            .find(|c| c.id == community)
            .map(|c| c.members.as_slice())
    }
}

/// Weighted undirected graph at one aggregation level.
#[derive(Debug, Clone)]
struct LevelGraph {
    adjacency: Vec<Vec<(usize, f64)>>,
    self_weight: Vec<f64>,
    strength: Vec<f64>,
    total_weight: f64,
}

impl LevelGraph {
    fn from_graph(graph: &Graph) -> Self {
        let n = graph.node_count();
        let adjacency: Vec<Vec<(usize, f64)>> =
            (0..n).map(|v| graph.weighted_neighbors(v).to_vec()).collect();
        let strength: Vec<f64> = adjacency
            .iter()
            .map(|edges| edges.iter().map(|&(_, w)| w).sum())
            .collect();
        let total_weight = strength.iter().sum::<f64>() / 2.0;
        Self {
            adjacency,
            self_weight: vec![0.0; n],
            strength,
            total_weight,
        }
    }

    fn len(&self) -> usize {
        self.adjacency.len()
    }

    /// Collapses each group of `groups` into one node. Intra-group weight becomes self-weight.
    fn aggregate(&self, groups: &[usize], group_count: usize) -> LevelGraph {
        let mut self_weight = vec![0.0; group_count];
        let mut edges: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); group_count];

        for (v, &g) in groups.iter().enumerate() {
            self_weight[g] += self.self_weight[v];
            for &(u, w) in &self.adjacency[v] {
                let h = groups[u];
                if g == h {
                    if v < u {
                        self_weight[g] += w;
                    }
                } else {
                    *edges[g].entry(h).or_insert(0.0) += w;
                }
            }
        }

        let adjacency: Vec<Vec<(usize, f64)>> = edges
            .into_iter()
            .map(|neighbors| neighbors.into_iter().collect())
            .collect();
        let strength = adjacency
            .iter()
            .zip(&self_weight)
            .map(|(edges, &s)| edges.iter().map(|&(_, w)| w).sum::<f64>() + 2.0 * s)
            .collect();

        LevelGraph {
            adjacency,
            self_weight,
            strength,
            total_weight: self.total_weight,
        }
    }

    fn modularity(&self, partition: &[usize], resolution: f64) -> f64 {
        if self.total_weight <= 0.0 {
            return 0.0;
        }
        let m = self.total_weight;
        let count = partition.iter().copied().max().map_or(0, |c| c + 1);
        let mut internal = vec![0.0; count];
        let mut total = vec![0.0; count];

        for v in 0..self.len() {
            let c = partition[v];
            internal[c] += self.self_weight[v];
            total[c] += self.strength[v];
            for &(u, w) in &self.adjacency[v] {
                if v < u && partition[u] == c {
                    internal[c] += w;
                }
            }
        }

        internal
            .iter()
            .zip(&total)
            .map(|(&inside, &tot)| inside / m - resolution * (tot / (2.0 * m)).powi(2))
            .sum()
    }

    /// Splits every community into its connected components. Returns new labels
    /// (numbered by first member) and their count.
    fn connected_refinement(&self, partition: &[usize]) -> (Vec<usize>, usize) {
        let n = self.len();
        let mut refined = vec![usize::MAX; n];
        let mut count = 0;
        let mut queue = VecDeque::new();

        for start in 0..n {
            if refined[start] != usize::MAX {
                continue;
            }
            refined[start] = count;
            queue.push_back(start);
            while let Some(v) = queue.pop_front() {
                for &(u, w) in &self.adjacency[v] {
                    if w > 0.0 && refined[u] == usize::MAX && partition[u] == partition[v] {
                        refined[u] = count;
                        queue.push_back(u);
                    }
                }
            }
            count += 1;
        }

        (refined, count)
    }
}

/// Outcome of one local-moving phase.
struct MoveOutcome {
    moved: bool,
    cancelled: bool,
}

/// Greedy local moving. `partition` labels must be < `level.len()`.
fn local_moving(
    level: &LevelGraph,
    partition: &mut [usize],
    resolution: f64,
    cancel: &CancelSignal,
) -> MoveOutcome {
    let n = level.len();
    let two_m = 2.0 * level.total_weight;

    let mut total = vec![0.0f64; n];
    let mut size = vec![0usize; n];
    for v in 0..n {
        total[partition[v]] += level.strength[v];
        size[partition[v]] += 1;
    }
    let mut empty: Vec<usize> = (0..n).rev().filter(|&c| size[c] == 0).collect();

    let mut link = vec![0.0f64; n];
    let mut touched_flag = vec![false; n];
    let mut touched: Vec<usize> = Vec::new();
    let mut moved = false;

    for sweep in 0..MAX_SWEEPS {
        if cancel.is_cancelled() {
            return MoveOutcome {
                moved,
                cancelled: true,
            };
        }

        let mut moves = 0usize;
        for v in 0..n {
            let current = partition[v];
            let k = level.strength[v];

            for &(u, w) in &level.adjacency[v] {
                let c = partition[u];
                if !touched_flag[c] {
                    touched_flag[c] = true;
                    touched.push(c);
                }
                link[c] += w;
            }

            total[current] -= k;
            size[current] -= 1;

            let gain = |c: usize| link[c] - resolution * total[c] * k / two_m;

            let mut best = current;
            let mut best_gain = gain(current);
            for &c in &touched {
                if c == current {
                    continue;
                }
                let candidate = gain(c);
                if candidate > best_gain + GAIN_EPSILON {
                    best = c;
                    best_gain = candidate;
                }
            }

            // An empty community has zero gain; only worth it if `v` has company to leave.
            if size[current] > 0 && best_gain < -GAIN_EPSILON {
                if let Some(&fresh) = empty.last() {
                    best = fresh;
                }
            }

            if best != current {
                if empty.last() == Some(&best) {
                    empty.pop();
                }
                if size[current] == 0 {
                    empty.push(current);
                }
                partition[v] = best;
                moves += 1;
            }
            total[best] += k;
            size[best] += 1;

            for &c in &touched {
                link[c] = 0.0;
                touched_flag[c] = false;
            }
            touched.clear();
        }

        tracing::trace!(sweep, moves, "Local moving sweep");
        if moves == 0 {
            break;
        }
        moved = true;
    }

    MoveOutcome {
        moved,
        cancelled: false,
    }
}

/// Relabels to 0..k in order of first appearance.
fn renumber(partition: &mut [usize]) -> usize {
    let mut mapping: Vec<usize> = vec![usize::MAX; partition.len().max(1)];
    let mut next = 0;
    for label in partition.iter_mut() {
        if *label >= mapping.len() {
            mapping.resize(*label + 1, usize::MAX);
        }
        if mapping[*label] == usize::MAX {
            mapping[*label] = next;
            next += 1;
        }
        *label = mapping[*label];
    }
    next
}

pub fn detect_communities(
    graph: &Graph,
    resolution: f64,
    min_community_size: usize,
    max_communities: usize,
) -> Result<CommunityResult> {
    let config = CommunityConfig {
        resolution,
        min_community_size,
        max_communities,
        ..CommunityConfig::default()
    };
    detect_communities_with(graph, &config, &CancelSignal::none())
}

pub fn detect_communities_with(
    graph: &Graph,
    config: &CommunityConfig,
    cancel: &CancelSignal,
) -> Result<CommunityResult> {
    config.validate()?;
    let resolution = config.resolution;
    let n = graph.node_count();

    let base = LevelGraph::from_graph(graph);
    let mut level = base.clone();
    let mut membership: Vec<usize> = (0..n).collect();
    let mut partition: Vec<usize> = (0..n).collect();
    let mut history = vec![base.modularity(&partition, resolution)];
    let mut levels = 0;
    let mut converged = base.total_weight <= 0.0;
    let mut cancelled = false;

    while !converged && levels < config.max_levels {
        levels += 1;

        let outcome = local_moving(&level, &mut partition, resolution, cancel);
        history.push(level.modularity(&partition, resolution));
        if outcome.cancelled {
            tracing::warn!(levels, "Community detection cancelled");
            cancelled = true;
            break;
        }

        let (refined, refined_count) = level.connected_refinement(&partition);
        if refined_count == level.len() {
            converged = true;
            break;
        }

        let mut next_partition = vec![0usize; refined_count];
        for (v, &r) in refined.iter().enumerate() {
            next_partition[r] = partition[v];
        }
        renumber(&mut next_partition);

        for m in membership.iter_mut() {
            *m = refined[*m];
        }
        level = level.aggregate(&refined, refined_count);
        partition = next_partition;

        tracing::trace!(
            levels,
            nodes = level.len(),
            moved = outcome.moved,
            "Aggregated level graph"
        );
    }

    let mut assignment: Vec<usize> = membership.iter().map(|&m| partition[m]).collect();
    let (split, _) = base.connected_refinement(&assignment);
    assignment = split;
    let modularity = base.modularity(&assignment, resolution);
    history.push(modularity);

    let result = assemble(
        graph,
        &assignment,
        modularity,
        config,
        levels,
        converged,
        cancelled,
        history,
    );

    tracing::debug!(
        nodes = n,
        communities = result.diagnostics.total_communities,
        modularity,
        levels,
        converged,
        "Community detection complete"
    );

    Ok(result)
}

fn assemble(
    graph: &Graph,
    assignment: &[usize],
    modularity: f64,
    config: &CommunityConfig,
    levels: usize,
    converged: bool,
    cancelled: bool,
    modularity_history: Vec<f64>,
) -> CommunityResult {
    let count = assignment.iter().copied().max().map_or(0, |c| c + 1);
    let mut groups: Vec<Vec<usize>> = vec![Vec::new(); count];
    for (v, &c) in assignment.iter().enumerate() {
        groups[c].push(v);
    }
    // Largest first; equal sizes keep first-member order (labels are numbered that way).
    groups.sort_by(|a, b| b.len().cmp(&a.len()));

    let mut final_label = vec![0usize; graph.node_count()];
    for (id, members) in groups.iter().enumerate() {
        for &v in members {
            final_label[v] = id;
        }
    }

    let min_size = config.min_community_size.max(1);
    let mut dropped_small = 0;
    let mut communities = Vec::new();
    for (id, members) in groups.iter().enumerate() {
        if members.len() < min_size {
            dropped_small += 1;
            continue;
        }
        communities.push(Community {
            id,
            size: members.len(),
            members: members
                .iter()
                .map(|&v| graph.node_id(v).to_string())
                .collect(),
        });
    }
    let truncated = communities.len().saturating_sub(config.max_communities);
    communities.truncate(config.max_communities);

    CommunityResult {
        assignment: (0..graph.node_count())
            .map(|v| (graph.node_id(v).to_string(), final_label[v]))
            .collect(),
        communities,
        modularity,
        diagnostics: CommunityDiagnostics {
            levels,
            converged,
            cancelled,
            total_communities: count,
            dropped_small,
            truncated,
            modularity_history,
        },
    }
}
