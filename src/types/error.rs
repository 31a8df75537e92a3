use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Invalid graph: {0}")]
    InvalidGraph(String),

    #[error("No valid seeds remain after filtering against the graph")]
    EmptySeedSet,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, GraphError>;

impl From<std::io::Error> for GraphError {
    fn from(e: std::io::Error) -> Self {
        GraphError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for GraphError {
    fn from(e: serde_json::Error) -> Self {
        GraphError::Serialization(e.to_string())
    }
}

impl From<anyhow::Error> for GraphError {
    fn from(e: anyhow::Error) -> Self {
        GraphError::Internal(e.to_string())
    }
}
