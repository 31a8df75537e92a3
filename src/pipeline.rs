//! Per-request analysis orchestration.
//!
//! Runs the selected algorithms against one snapshot, isolating each phase:
//! a phase that fails validation or is skipped is recorded in the report and
//! the remaining phases still run.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cancel::CancelSignal;
use crate::config::AnalysisConfig;
use crate::graph::{
    aggregate_ranking_with, compute_betweenness_centrality_with, compute_graph_statistics,
    compute_kcore, detect_communities_with, run_personalized_walk_with, CentralityResult,
    CommunityResult, Graph, GraphStatistics, KCoreResult, PprResult, Ranking, StopReason,
};
use crate::types::{GraphError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    Statistics,
    #[serde(rename = "kcore")]
    KCore,
    Centrality,
    #[serde(rename = "ppr")]
    PersonalizedWalk,
    Communities,
    Ranking,
}

impl Algorithm {
    pub const ALL: [Algorithm; 6] = [
        Algorithm::Statistics,
        Algorithm::KCore,
        Algorithm::Centrality,
        Algorithm::PersonalizedWalk,
        Algorithm::Communities,
        Algorithm::Ranking,
    ];
}

impl std::str::FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "statistics" | "stats" => Ok(Self::Statistics),
            "kcore" | "k_core" | "k-core" => Ok(Self::KCore),
            "centrality" | "betweenness" => Ok(Self::Centrality),
            "ppr" | "pagerank" | "personalized_walk" => Ok(Self::PersonalizedWalk),
            "communities" | "leiden" => Ok(Self::Communities),
            "ranking" | "rank" => Ok(Self::Ranking),
            _ => Err(format!("Unknown algorithm: {}", s)),
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Statistics => write!(f, "statistics"),
            Self::KCore => write!(f, "kcore"),
            Self::Centrality => write!(f, "centrality"),
            Self::PersonalizedWalk => write!(f, "ppr"),
            Self::Communities => write!(f, "communities"),
            Self::Ranking => write!(f, "ranking"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub algorithms: BTreeSet<Algorithm>,
    /// PPR seeds. Falls back to the graph's entry points when absent.
    pub seeds: Option<HashMap<String, f64>>,
    /// Normalized content scores for the sparse-graph ranking fallback.
    pub content: Option<HashMap<String, f64>>,
}

impl Default for AnalysisRequest {
    fn default() -> Self {
        Self {
            algorithms: Algorithm::ALL.into_iter().collect(),
            seeds: None,
            content: None,
        }
    }
}

impl AnalysisRequest {
    pub fn only(algorithms: &[Algorithm]) -> Self {
        Self {
            algorithms: algorithms.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn with_seeds(mut self, seeds: HashMap<String, f64>) -> Self {
        self.seeds = Some(seeds);
        self
    }

    pub fn with_content(mut self, content: HashMap<String, f64>) -> Self {
        self.content = Some(content);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PhaseStatus {
    Succeeded,
    Skipped { reason: String },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct PhaseOutcome {
    pub algorithm: Algorithm,
    #[serde(flatten)]
    pub status: PhaseStatus,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub fingerprint: String,
    pub generated_at: DateTime<Utc>,
    pub node_count: usize,
    pub relationship_count: usize,
    pub dropped_relationships: usize,
    pub phases: Vec<PhaseOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<GraphStatistics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kcore: Option<KCoreResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub centrality: Option<CentralityResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ppr: Option<PprResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub communities: Option<CommunityResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranking: Option<Ranking>,
}

impl AnalysisReport {
    pub fn outcome(&self, algorithm: Algorithm) -> Option<&PhaseOutcome> {
        self.phases.iter().find(|p| p.algorithm == algorithm)
    }

    pub fn status(&self, algorithm: Algorithm) -> Option<&PhaseStatus> {
        self.outcome(algorithm).map(|p| &p.status)
    }

    pub fn succeeded(&self) -> Vec<Algorithm> {
        self.phases
            .iter()
            .filter(|p| p.status == PhaseStatus::Succeeded)
            .map(|p| p.algorithm)
            .collect()
    }

    pub fn failed(&self) -> Vec<Algorithm> {
        self.phases
            .iter()
            .filter(|p| matches!(p.status, PhaseStatus::Failed { .. }))
            .map(|p| p.algorithm)
            .collect()
    }
}

/// What a phase produced: a value, optionally flagged as skipped with a reason.
type PhaseValue<T> = (T, Option<String>);

#[derive(Debug, Clone, Default)]
pub struct AnalysisEngine {
    config: AnalysisConfig,
}

impl AnalysisEngine {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// A fresh signal carrying the configured per-request deadline, if any.
    pub fn cancel_signal(&self) -> CancelSignal {
        match self.config.timeout_ms {
            Some(ms) => CancelSignal::with_timeout(Duration::from_millis(ms)),
            None => CancelSignal::new(),
        }
    }

    pub fn analyze(
        &self,
        graph: &Graph,
        request: &AnalysisRequest,
        cancel: &CancelSignal,
    ) -> AnalysisReport {
        let selected = |algorithm: Algorithm| request.algorithms.contains(&algorithm);
        let mut phases = Vec::new();

        let statistics = if selected(Algorithm::Statistics) {
            run_phase(&mut phases, Algorithm::Statistics, || {
                Ok((compute_graph_statistics(graph), None))
            })
        } else {
            None
        };

        let kcore = if selected(Algorithm::KCore) {
            run_phase(&mut phases, Algorithm::KCore, || Ok((compute_kcore(graph), None)))
        } else {
            None
        };

        let centrality = if selected(Algorithm::Centrality) {
            run_phase(&mut phases, Algorithm::Centrality, || {
                let result =
                    compute_betweenness_centrality_with(graph, &self.config.centrality, cancel);
                let reason = result.reason.map(|r| r.to_string());
                Ok((result, reason))
            })
        } else {
            None
        };

        let ppr = if selected(Algorithm::PersonalizedWalk) {
            run_phase(&mut phases, Algorithm::PersonalizedWalk, || {
                let seeds = match &request.seeds {
                    Some(seeds) => seeds.clone(),
                    None => graph.entry_point_seeds(),
                };
                let result = run_personalized_walk_with(graph, &seeds, &self.config.ppr, cancel)?;
                let reason = (result.stop_reason == StopReason::Cancelled)
                    .then(|| "cancelled".to_string());
                Ok((result, reason))
            })
        } else {
            None
        };

        let communities = if selected(Algorithm::Communities) {
            run_phase(&mut phases, Algorithm::Communities, || {
                let result = detect_communities_with(graph, &self.config.communities, cancel)?;
                let reason = result
                    .diagnostics
                    .cancelled
                    .then(|| "cancelled".to_string());
                Ok((result, reason))
            })
        } else {
            None
        };

        let ranking = if selected(Algorithm::Ranking) {
            let usable_centrality = centrality.as_ref().filter(|c| !c.skipped);
            run_phase(&mut phases, Algorithm::Ranking, || {
                if kcore.is_none() && usable_centrality.is_none() && request.content.is_none() {
                    return Err(GraphError::InvalidConfig(
                        "ranking needs k-core, centrality or content scores".to_string(),
                    ));
                }
                let ranking = aggregate_ranking_with(
                    graph,
                    kcore.as_ref(),
                    usable_centrality,
                    request.content.as_ref(),
                    &self.config.ranking,
                );
                Ok((ranking, None))
            })
        } else {
            None
        };

        AnalysisReport {
            fingerprint: graph.fingerprint(),
            generated_at: Utc::now(),
            node_count: graph.node_count(),
            relationship_count: graph.relationship_count(),
            dropped_relationships: graph.dropped_relationships(),
            phases,
            statistics,
            kcore,
            centrality,
            ppr,
            communities,
            ranking,
        }
    }

    /// Runs [`AnalysisEngine::analyze`] on tokio's blocking pool.
    pub async fn analyze_async(
        &self,
        graph: Arc<Graph>,
        request: AnalysisRequest,
        cancel: CancelSignal,
    ) -> Result<AnalysisReport> {
        let engine = self.clone();
        tokio::task::spawn_blocking(move || engine.analyze(&graph, &request, &cancel))
            .await
            .map_err(|e| GraphError::Internal(format!("analysis task failed: {}", e)))
    }

    /// Analyzes independent snapshots in parallel, each with its own deadline.
    pub fn analyze_batch(&self, graphs: &[Graph], request: &AnalysisRequest) -> Vec<AnalysisReport> {
        graphs
            .par_iter()
            .map(|graph| self.analyze(graph, request, &self.cancel_signal()))
            .collect()
    }
}

fn run_phase<T>(
    phases: &mut Vec<PhaseOutcome>,
    algorithm: Algorithm,
    phase: impl FnOnce() -> Result<PhaseValue<T>>,
) -> Option<T> {
    let started = Instant::now();
    let outcome = phase();
    let elapsed_ms = started.elapsed().as_millis() as u64;

    let (status, value) = match outcome {
        Ok((value, None)) => (PhaseStatus::Succeeded, Some(value)),
        Ok((value, Some(reason))) => (PhaseStatus::Skipped { reason }, Some(value)),
        Err(e) => (PhaseStatus::Failed { error: e.to_string() }, None),
    };

    match &status {
        PhaseStatus::Succeeded => {
            tracing::info!(%algorithm, elapsed_ms, "Analysis phase succeeded")
        }
        PhaseStatus::Skipped { reason } => {
            tracing::warn!(%algorithm, elapsed_ms, reason = %reason, "Analysis phase skipped")
        }
        PhaseStatus::Failed { error } => {
            tracing::warn!(%algorithm, elapsed_ms, error = %error, "Analysis phase failed")
        }
    }

    phases.push(PhaseOutcome {
        algorithm,
        status,
        elapsed_ms,
    });
    value
}
