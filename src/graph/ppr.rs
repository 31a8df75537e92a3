use serde::Serialize;
use std::collections::HashMap;

use super::model::Graph;
use crate::cancel::CancelSignal;
use crate::config::PprConfig;
use crate::types::{GraphError, NodeValues, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Converged,
    IterationCap,
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct PprResult {
    pub scores: NodeValues<f64>,
    pub converged: bool,
    pub iterations_used: usize,
    /// L1 delta of the last completed iteration.
    pub final_delta: f64,
    pub stop_reason: StopReason,
    /// Seeds that survived filtering against the graph.
    pub seed_count: usize,
}

impl PprResult {
    pub fn score(&self, id: &str) -> Option<f64> {
        self.scores.get(id).copied()
    }
}

/// A low-iteration and a high-iteration walk over the same seeds.
#[derive(Debug, Clone, Serialize)]
pub struct DualPassResult {
    pub shallow: PprResult,
    pub deep: PprResult,
    /// L1 distance between the two score vectors.
    pub divergence: f64,
}

pub fn run_personalized_walk(
    graph: &Graph,
    seeds: &HashMap<String, f64>,
    alpha: f64,
    max_iterations: usize,
    convergence_threshold: f64,
) -> Result<PprResult> {
    let config = PprConfig {
        alpha,
        max_iterations,
        convergence_threshold,
    };
    run_personalized_walk_with(graph, seeds, &config, &CancelSignal::none())
}

/// Personalized PageRank by power iteration over the undirected adjacency.
///
/// Each step returns `alpha` of the mass to the seed distribution and spreads
/// `1 - alpha` uniformly over each node's neighbors. Nodes without neighbors
/// send their whole mass back to the seeds, so the vector always sums to 1.
pub fn run_personalized_walk_with(
    graph: &Graph,
    seeds: &HashMap<String, f64>,
    config: &PprConfig,
    cancel: &CancelSignal,
) -> Result<PprResult> {
    config.validate()?;
    let personalization = seed_distribution(graph, seeds)?;
    let seed_count = personalization.iter().filter(|&&p| p > 0.0).count();

    let n = graph.node_count();
    let alpha = config.alpha;
    let follow = 1.0 - alpha;

    let mut scores = personalization.clone();
    let mut next = vec![0.0f64; n];
    let mut iterations_used = 0;
    let mut final_delta = f64::INFINITY;
    let mut stop_reason = StopReason::IterationCap;

    for iteration in 1..=config.max_iterations {
        if cancel.is_cancelled() {
            stop_reason = StopReason::Cancelled;
            break;
        }

        next.fill(0.0);
        let mut dangling_sum = 0.0;

        for u in 0..n {
            let degree = graph.degree(u);
            if degree == 0 {
                dangling_sum += scores[u];
                continue;
            }
            let share = follow * scores[u] / degree as f64;
            for v in graph.neighbors(u) {
                next[v] += share;
            }
        }

        let restart = alpha + follow * dangling_sum;
        for (value, &p) in next.iter_mut().zip(&personalization) {
            *value += restart * p;
        }

        let delta: f64 = scores
            .iter()
            .zip(next.iter())
            .map(|(a, b)| (a - b).abs())
            .sum();

        std::mem::swap(&mut scores, &mut next);
        iterations_used = iteration;
        final_delta = delta;

        if delta < config.convergence_threshold {
            stop_reason = StopReason::Converged;
            break;
        }
    }

    tracing::debug!(
        nodes = n,
        seeds = seed_count,
        iterations = iterations_used,
        delta = final_delta,
        reason = ?stop_reason,
        "Personalized walk finished"
    );

    Ok(PprResult {
        scores: (0..n)
            .map(|v| (graph.node_id(v).to_string(), scores[v]))
            .collect(),
        converged: stop_reason == StopReason::Converged,
        iterations_used,
        final_delta,
        stop_reason,
        seed_count,
    })
}

/// Runs two independent walks with different iteration caps.
pub fn run_dual_pass(
    graph: &Graph,
    seeds: &HashMap<String, f64>,
    config: &PprConfig,
    shallow_iterations: usize,
    deep_iterations: usize,
    cancel: &CancelSignal,
) -> Result<DualPassResult> {
    let shallow_config = PprConfig {
        max_iterations: shallow_iterations,
        ..config.clone()
    };
    let deep_config = PprConfig {
        max_iterations: deep_iterations,
        ..config.clone()
    };

    let shallow = run_personalized_walk_with(graph, seeds, &shallow_config, cancel)?;
    let deep = run_personalized_walk_with(graph, seeds, &deep_config, cancel)?;

    let divergence = shallow
        .scores
        .iter()
        .map(|(id, &s)| (s - deep.score(id).unwrap_or(0.0)).abs())
        .sum();

    Ok(DualPassResult {
        shallow,
        deep,
        divergence,
    })
}

/// Divides each score by the square root of the node's undirected degree.
pub fn apply_hub_dampening(scores: &mut NodeValues<f64>, graph: &Graph) {
    for (id, score) in scores.iter_mut() {
        if let Some(degree) = graph.degree_of(id) {
            if degree > 0 {
                *score /= (degree as f64).sqrt();
            }
        }
    }
}

/// Seed weights as a dense vector over graph indices, summing to 1.
fn seed_distribution(graph: &Graph, seeds: &HashMap<String, f64>) -> Result<Vec<f64>> {
    let mut personalization = vec![0.0f64; graph.node_count()];
    let mut dropped = 0usize;

    for (id, &weight) in seeds {
        if !weight.is_finite() || weight < 0.0 {
            return Err(GraphError::InvalidConfig(format!(
                "seed {} has invalid weight {}",
                id, weight
            )));
        }
        match graph.node_index(id) {
            Some(idx) => personalization[idx] += weight,
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        tracing::debug!(dropped, "Ignoring seeds not present in the graph");
    }

    // Dividing by the largest weight first keeps the total finite.
    let largest = personalization.iter().copied().fold(0.0f64, f64::max);
    if largest <= 0.0 {
        return Err(GraphError::EmptySeedSet);
    }
    for p in personalization.iter_mut() {
        *p /= largest;
    }
    let total: f64 = personalization.iter().sum();
    for p in personalization.iter_mut() {
        *p /= total;
    }
    Ok(personalization)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{build_graph, path_graph, star_graph};

    fn seeds(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(id, w)| (id.to_string(), *w)).collect()
    }

    #[test]
    fn test_ppr_single_isolated_seed_keeps_all_mass() {
        let graph = build_graph(&["A"], &[]);
        let result = run_personalized_walk(&graph, &seeds(&[("A", 1.0)]), 0.15, 50, 1e-9).unwrap();
        assert!(result.converged);
        assert!((result.score("A").unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_ppr_seed_without_relationships_among_others() {
        let graph = build_graph(&["A", "B", "C"], &[("B", "C")]);
        let result = run_personalized_walk(&graph, &seeds(&[("A", 1.0)]), 0.3, 50, 1e-9).unwrap();
        assert!((result.score("A").unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(result.score("B"), Some(0.0));
    }

    #[test]
    fn test_ppr_chain_decays_with_distance() {
        let graph = path_graph(&["A", "B", "C"]);
        let result = run_personalized_walk(&graph, &seeds(&[("A", 1.0)]), 0.5, 100, 1e-10).unwrap();
        assert!(result.score("A").unwrap() > result.score("B").unwrap());
        assert!(result.score("B").unwrap() > result.score("C").unwrap());
    }

    #[test]
    fn test_ppr_star_center_seed() {
        let graph = star_graph(5);
        let result = run_personalized_walk(&graph, &seeds(&[("X", 1.0)]), 0.15, 500, 1e-10).unwrap();
        assert!(result.converged);

        let x = result.score("X").unwrap();
        // x = alpha + (1 - alpha) * leaves_total, leaves_total = (1 - alpha) * x
        let expected_x = 1.0 / (1.0 + 0.85);
        assert!((x - expected_x).abs() < 1e-6, "x={}", x);

        let leaf = result.score("L0").unwrap();
        assert!(x > leaf);
        for i in 1..5 {
            let other = result.score(&format!("L{}", i)).unwrap();
            assert!((other - leaf).abs() < 1e-9);
        }
        assert!((x + 5.0 * leaf - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_ppr_mass_conserved_with_dangling_nodes() {
        let graph = build_graph(
            &["a", "b", "c", "d", "lonely"],
            &[("a", "b"), ("b", "c"), ("c", "a"), ("c", "d")],
        );
        for alpha in [0.05, 0.15, 0.5, 0.9] {
            let result = run_personalized_walk(
                &graph,
                &seeds(&[("a", 2.0), ("lonely", 1.0)]),
                alpha,
                1000,
                1e-12,
            )
            .unwrap();
            assert!((result.scores.values().sum::<f64>() - 1.0).abs() < 1e-9, "alpha={}", alpha);
            assert!(result.scores.values().all(|&s| s >= 0.0));
        }
    }

    #[test]
    fn test_ppr_iteration_cap_is_reported_not_error() {
        let graph = star_graph(5);
        let result = run_personalized_walk(&graph, &seeds(&[("X", 1.0)]), 0.15, 2, 1e-12).unwrap();
        assert!(!result.converged);
        assert_eq!(result.iterations_used, 2);
        assert_eq!(result.stop_reason, StopReason::IterationCap);
        assert!((result.scores.values().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_ppr_unknown_seeds_dropped() {
        let graph = path_graph(&["A", "B"]);
        let result = run_personalized_walk(
            &graph,
            &seeds(&[("A", 1.0), ("missing", 5.0)]),
            0.15,
            100,
            1e-9,
        )
        .unwrap();
        assert_eq!(result.seed_count, 1);
        assert!((result.scores.values().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_ppr_empty_seed_set_rejected() {
        let graph = path_graph(&["A", "B"]);
        let err = run_personalized_walk(&graph, &seeds(&[("nope", 1.0)]), 0.15, 10, 1e-6);
        assert!(matches!(err, Err(GraphError::EmptySeedSet)));

        let err = run_personalized_walk(&graph, &HashMap::new(), 0.15, 10, 1e-6);
        assert!(matches!(err, Err(GraphError::EmptySeedSet)));

        let err = run_personalized_walk(&graph, &seeds(&[("A", 0.0)]), 0.15, 10, 1e-6);
        assert!(matches!(err, Err(GraphError::EmptySeedSet)));
    }

    #[test]
    fn test_ppr_huge_seed_weights_keep_mass() {
        let graph = path_graph(&["A", "B", "C"]);
        let result = run_personalized_walk(
            &graph,
            &seeds(&[("A", f64::MAX), ("B", f64::MAX)]),
            0.15,
            500,
            1e-9,
        )
        .unwrap();
        assert_eq!(result.seed_count, 2);
        assert!((result.scores.values().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(result.score("A").unwrap() > 0.0);
        assert!(result.score("C").unwrap() > 0.0);
    }

    #[test]
    fn test_ppr_invalid_parameters_rejected() {
        let graph = path_graph(&["A", "B"]);
        let s = seeds(&[("A", 1.0)]);
        assert!(matches!(
            run_personalized_walk(&graph, &s, 1.0, 10, 1e-6),
            Err(GraphError::InvalidConfig(_))
        ));
        assert!(matches!(
            run_personalized_walk(&graph, &seeds(&[("A", -1.0)]), 0.15, 10, 1e-6),
            Err(GraphError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_dual_pass_is_independent() {
        let graph = path_graph(&["A", "B", "C", "D", "E"]);
        let s = seeds(&[("A", 1.0)]);
        let config = PprConfig {
            convergence_threshold: 1e-12,
            ..PprConfig::default()
        };
        let dual = run_dual_pass(&graph, &s, &config, 2, 500, &CancelSignal::none()).unwrap();

        assert_eq!(dual.shallow.iterations_used, 2);
        assert!(!dual.shallow.converged);
        assert!(dual.deep.iterations_used > 2);
        assert!(dual.divergence > 0.0);

        let again = run_personalized_walk_with(
            &graph,
            &s,
            &PprConfig {
                max_iterations: 500,
                ..config
            },
            &CancelSignal::none(),
        )
        .unwrap();
        assert_eq!(again.scores, dual.deep.scores);
    }

    #[test]
    fn test_ppr_cancelled_returns_seed_distribution() {
        let graph = path_graph(&["A", "B", "C"]);
        let cancel = CancelSignal::new();
        cancel.cancel();
        let result =
            run_personalized_walk_with(&graph, &seeds(&[("A", 1.0)]), &PprConfig::default(), &cancel)
                .unwrap();
        assert_eq!(result.stop_reason, StopReason::Cancelled);
        assert_eq!(result.iterations_used, 0);
        assert_eq!(result.score("A"), Some(1.0));
    }

    #[test]
    fn test_hub_dampening() {
        let graph = star_graph(4);
        let mut scores: NodeValues<f64> = vec![("X".to_string(), 1.0), ("L0".to_string(), 1.0)]
            .into_iter()
            .collect();
        apply_hub_dampening(&mut scores, &graph);
        assert!((scores.get("X").unwrap() - 0.5).abs() < 1e-12);
        assert!((scores.get("L0").unwrap() - 1.0).abs() < 1e-12);
    }
}
