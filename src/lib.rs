pub mod cancel;
pub mod config;
pub mod graph;
pub mod pipeline;
pub mod snapshot;
pub mod types;

#[cfg(test)]
pub mod test_utils;

pub use cancel::CancelSignal;
pub use config::AnalysisConfig;
pub use graph::{Graph, GraphBuilder};
pub use pipeline::{AnalysisEngine, AnalysisReport, AnalysisRequest};
pub use types::error::{GraphError, Result};
