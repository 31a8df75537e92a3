//! Composite ranking over structural scores.
//!
//! Merges k-core numbers, betweenness centrality and an optional content score
//! into one ordered list with dense ranks `1..=N`.

use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;

use super::centrality::CentralityResult;
use super::kcore::KCoreResult;
use super::model::Graph;
use crate::config::RankingConfig;

/// Standard weighting.
pub const CORE_WEIGHT: f64 = 0.6;
pub const CENTRALITY_WEIGHT: f64 = 0.4;

/// Sparse-graph fallback weighting.
pub const SPARSE_CORE_WEIGHT: f64 = 0.4;
pub const SPARSE_CENTRALITY_WEIGHT: f64 = 0.3;
pub const SPARSE_CONTENT_WEIGHT: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Weighting {
    Standard,
    SparseFallback,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComponentScores {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub core_number: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub centrality: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedEntry {
    pub node: String,
    pub score: f64,
    pub components: ComponentScores,
    pub rank: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Ranking {
    pub entries: Vec<RankedEntry>,
    pub weighting: Weighting,
}

impl Ranking {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, node: &str) -> Option<&RankedEntry> {
        self.entries.iter().find(|e| e.node == node)
    }

    /// Attaches a short explanation to every entry using the graph's connection counts.
    pub fn with_explanations(mut self, graph: &Graph) -> Self {
        for entry in &mut self.entries {
            let connections = graph.degree_of(&entry.node).unwrap_or(0);
            entry.explanation = Some(explain(&entry.components, connections));
        }
        self
    }
}

pub fn aggregate_ranking(
    kcore: Option<&KCoreResult>,
    centrality: Option<&CentralityResult>,
    content: Option<&HashMap<String, f64>>,
) -> Ranking {
    let mut scores: IndexMap<String, ComponentScores> = IndexMap::new();

    if let Some(kcore) = kcore {
        for (id, &core) in kcore.core_numbers.iter() {
            scores.entry(id.clone()).or_default().core_number = Some(core);
        }
    }

    if let Some(centrality) = centrality.filter(|c| !c.skipped) {
        for (id, &score) in centrality.scores.iter() {
            scores.entry(id.clone()).or_default().centrality = Some(score);
        }
    }

    if let Some(content) = content {
        // Nodes seen only here are appended in id order.
        let mut ids: Vec<&String> = content.keys().collect();
        ids.sort_by(|a, b| {
            let pa = scores.get_index_of(*a).unwrap_or(usize::MAX);
            let pb = scores.get_index_of(*b).unwrap_or(usize::MAX);
            pa.cmp(&pb).then_with(|| a.cmp(b))
        });
        for id in ids {
            let raw = content[id];
            let value = if raw.is_nan() { 0.0 } else { raw.clamp(0.0, 1.0) };
            if value != raw {
                tracing::warn!(node = %id, raw, value, "Content score outside [0, 1], clamped");
            }
            scores.entry(id.clone()).or_default().content = Some(value);
        }
    }

    let weighting = if content.is_some() && structural_signal_is_weak(kcore, centrality) {
        Weighting::SparseFallback
    } else {
        Weighting::Standard
    };

    let mut entries: Vec<RankedEntry> = scores
        .into_iter()
        .map(|(node, components)| RankedEntry {
            score: composite(&components, weighting),
            node,
            components,
            rank: 0,
            explanation: None,
        })
        .collect();

    // Stable: equal scores keep first-seen order.
    entries.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = i + 1;
    }

    tracing::debug!(entries = entries.len(), weighting = ?weighting, "Ranking aggregated");

    Ranking { entries, weighting }
}

/// [`aggregate_ranking`] plus the optional explanation and truncation of `config`.
pub fn aggregate_ranking_with(
    graph: &Graph,
    kcore: Option<&KCoreResult>,
    centrality: Option<&CentralityResult>,
    content: Option<&HashMap<String, f64>>,
    config: &RankingConfig,
) -> Ranking {
    let mut ranking = aggregate_ranking(kcore, centrality, content);
    if let Some(limit) = config.limit {
        ranking.entries.truncate(limit);
    }
    if config.explain {
        ranking = ranking.with_explanations(graph);
    }
    ranking
}

fn structural_signal_is_weak(
    kcore: Option<&KCoreResult>,
    centrality: Option<&CentralityResult>,
) -> bool {
    let core_weak = kcore.map_or(true, |k| k.degeneracy <= 1);
    let centrality_weak = centrality.map_or(true, CentralityResult::is_flat);
    core_weak || centrality_weak
}

fn composite(components: &ComponentScores, weighting: Weighting) -> f64 {
    let core = components.core_number.unwrap_or(0) as f64;
    let centrality = components.centrality.unwrap_or(0.0);
    match weighting {
        Weighting::Standard => CORE_WEIGHT * core + CENTRALITY_WEIGHT * centrality,
        Weighting::SparseFallback => {
            SPARSE_CORE_WEIGHT * core
                + SPARSE_CENTRALITY_WEIGHT * centrality
                + SPARSE_CONTENT_WEIGHT * components.content.unwrap_or(0.0)
        }
    }
}

fn explain(components: &ComponentScores, connections: usize) -> String {
    let core_level = match components.core_number {
        Some(k) if k >= 3 => "high",
        Some(2) => "moderate",
        _ => "low",
    };
    let centrality_level = match components.centrality {
        Some(c) if c >= 0.1 => "high",
        Some(c) if c >= 0.01 => "moderate",
        _ => "low",
    };
    let noun = if connections == 1 { "connection" } else { "connections" };
    format!(
        "{} {}; {} structural embedding (core {}); {} bridging centrality",
        connections,
        noun,
        core_level,
        components.core_number.unwrap_or(0),
        centrality_level
    )
}
