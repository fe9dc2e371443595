mod airtable;
mod file;

use std::path::PathBuf;

use crate::record::RawRecord;

pub use airtable::{AirtableConfig, AirtableSource, DEFAULT_AIRTABLE_ENDPOINT};
pub use file::JsonFileSource;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Airtable API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Unexpected record layout in {0}")]
    UnexpectedShape(String),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

pub type SourceResult<T> = Result<T, SourceError>;

/// Origin of the flat organization records.
#[async_trait::async_trait]
pub trait RecordSource: Send + Sync {
    /// All records in source order.
    async fn fetch_records(&self) -> SourceResult<Vec<RawRecord>>;

    /// Short name used in log lines.
    fn name(&self) -> &str;
}
