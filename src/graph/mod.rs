//! Graph model and analytics
//!
//! - `model`: immutable graph snapshot and its builder
//! - `kcore`: degeneracy ordering and core numbers
//! - `centrality`: Brandes betweenness centrality
//! - `ppr`: personalized random-walk scoring
//! - `leiden`: modularity-based community detection
//! - `stats`: size, density and degree distribution
//! - `ranking`: composite ranking over the structural scores

pub mod centrality;
pub mod kcore;
pub mod leiden;
pub mod model;
pub mod ppr;
pub mod ranking;
pub mod stats;

pub use centrality::{
    compute_betweenness_centrality, compute_betweenness_centrality_with, CentralityResult,
    SkipReason,
};
pub use kcore::{compute_kcore, KCoreResult};
pub use leiden::{
    detect_communities, detect_communities_with, Community, CommunityDiagnostics, CommunityResult,
};
pub use model::{Graph, GraphBuilder};
pub use ppr::{
    apply_hub_dampening, run_dual_pass, run_personalized_walk, run_personalized_walk_with,
    DualPassResult, PprResult, StopReason,
};
pub use ranking::{
    aggregate_ranking, aggregate_ranking_with, ComponentScores, RankedEntry, Ranking, Weighting,
};
pub use stats::{compute_graph_statistics, GraphStatistics};
