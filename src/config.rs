use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::types::{GraphError, Result};

pub const DEFAULT_MAX_CENTRALITY_NODES: usize = 1000;
pub const DEFAULT_PPR_ALPHA: f64 = 0.15;
pub const DEFAULT_PPR_MAX_ITERATIONS: usize = 100;
pub const DEFAULT_PPR_THRESHOLD: f64 = 1e-6;
pub const DEFAULT_RESOLUTION: f64 = 1.0;
pub const DEFAULT_MAX_COMMUNITIES: usize = 100;
pub const DEFAULT_MAX_LEVELS: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CentralityConfig {
    /// Graphs with more nodes than this are skipped instead of traversed.
    pub max_nodes: usize,
}

impl Default for CentralityConfig {
    fn default() -> Self {
        Self {
            max_nodes: DEFAULT_MAX_CENTRALITY_NODES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PprConfig {
    /// Restart probability per step. `1 - alpha` is the probability of following an edge.
    pub alpha: f64,
    pub max_iterations: usize,
    /// L1 norm of the per-iteration score delta below which the walk has converged.
    pub convergence_threshold: f64,
}

impl Default for PprConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_PPR_ALPHA,
            max_iterations: DEFAULT_PPR_MAX_ITERATIONS,
            convergence_threshold: DEFAULT_PPR_THRESHOLD,
        }
    }
}

impl PprConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(GraphError::InvalidConfig(format!(
                "alpha must be in (0, 1), got {}",
                self.alpha
            )));
        }
        if self.max_iterations == 0 {
            return Err(GraphError::InvalidConfig(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if !(self.convergence_threshold.is_finite() && self.convergence_threshold > 0.0) {
            return Err(GraphError::InvalidConfig(format!(
                "convergence_threshold must be positive, got {}",
                self.convergence_threshold
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CommunityConfig {
    /// Scales the null-model term. <1 = fewer, larger communities; >1 = more, smaller.
    pub resolution: f64,
    pub min_community_size: usize,
    pub max_communities: usize,
    /// Cap on local-moving/refinement/aggregation rounds.
    pub max_levels: usize,
}

impl Default for CommunityConfig {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            min_community_size: 1,
            max_communities: DEFAULT_MAX_COMMUNITIES,
            max_levels: DEFAULT_MAX_LEVELS,
        }
    }
}

impl CommunityConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.resolution.is_finite() && self.resolution > 0.0) {
            return Err(GraphError::InvalidConfig(format!(
                "resolution must be positive, got {}",
                self.resolution
            )));
        }
        if self.max_communities == 0 {
            return Err(GraphError::InvalidConfig(
                "max_communities must be at least 1".to_string(),
            ));
        }
        if self.max_levels == 0 {
            return Err(GraphError::InvalidConfig(
                "max_levels must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct RankingConfig {
    /// Attach a human-readable explanation to every ranked entry.
    pub explain: bool,
    /// Keep only the first `limit` entries.
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AnalysisConfig {
    pub centrality: CentralityConfig,
    pub ppr: PprConfig,
    pub communities: CommunityConfig,
    pub ranking: RankingConfig,
    /// Per-request deadline for the cancellable algorithms.
    pub timeout_ms: Option<u64>,
}

impl AnalysisConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: AnalysisConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.ppr.validate()?;
        self.communities.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ppr.alpha, 0.15);
        assert_eq!(config.centrality.max_nodes, 1000);
    }

    #[test]
    fn test_alpha_out_of_range_rejected() {
        for alpha in [0.0, 1.0, -0.1, 1.5, f64::NAN] {
            let config = PprConfig {
                alpha,
                ..PprConfig::default()
            };
            assert!(
                matches!(config.validate(), Err(GraphError::InvalidConfig(_))),
                "alpha={}",
                alpha
            );
        }
    }

    #[test]
    fn test_community_config_validation() {
        let bad_resolution = CommunityConfig {
            resolution: 0.0,
            ..CommunityConfig::default()
        };
        assert!(bad_resolution.validate().is_err());

        let no_communities = CommunityConfig {
            max_communities: 0,
            ..CommunityConfig::default()
        };
        assert!(no_communities.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            AnalysisConfig::from_json(r#"{"ppr": {"alpha": 0.3}, "communities": {"resolution": 0.5}}"#)
                .unwrap();
        assert_eq!(config.ppr.alpha, 0.3);
        assert_eq!(config.ppr.max_iterations, DEFAULT_PPR_MAX_ITERATIONS);
        assert_eq!(config.communities.resolution, 0.5);
        assert_eq!(config.communities.max_communities, DEFAULT_MAX_COMMUNITIES);
    }

    #[test]
    fn test_invalid_json_config_rejected() {
        assert!(matches!(
            AnalysisConfig::from_json(r#"{"ppr": {"alpha": 2.0}}"#),
            Err(GraphError::InvalidConfig(_))
        ));
        assert!(matches!(
            AnalysisConfig::from_json(r#"{"communities": {"min_community_size": -1}}"#),
            Err(GraphError::Serialization(_))
        ));
    }
}
