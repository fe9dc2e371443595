use thiserror::Error;

use crate::source::SourceError;
use crate::wikidata::GraphError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Record source returned no records")]
    EmptySource,

    #[error("Missing configuration: {0}")]
    MissingConfig(&'static str),

    #[error("Invalid classification config: {0}")]
    InvalidClassification(String),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Knowledge graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("IO error at {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
