use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use super::{RecordSource, SourceError, SourceResult};
use crate::record::{fields, RawRecord};

/// Reads records from a local JSON file.
///
/// Accepts a plain array of objects or an Airtable listing
/// (`{"records": [{"fields": {...}}]}`). A directory header such as the one
/// heading `anschriftenverzeichnis.json` is skipped.
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse(&self, document: Value) -> SourceResult<Vec<RawRecord>> {
        let items = match document {
            Value::Array(items) => items,
            Value::Object(mut map) => match map.remove("records") {
                Some(Value::Array(records)) => records
                    .into_iter()
                    .map(|mut r| {
                        r.get_mut("fields")
                            .map_or_else(|| Value::Object(Map::new()), Value::take)
                    })
                    .collect(),
                _ => return Err(SourceError::UnexpectedShape(self.path.display().to_string())),
            },
            _ => return Err(SourceError::UnexpectedShape(self.path.display().to_string())),
        };

        let mut records = Vec::with_capacity(items.len());
        for (position, item) in items.into_iter().enumerate() {
            match item {
                Value::Object(map) => {
                    let record = RawRecord::from_fields(map);
                    if is_header(&record) {
                        tracing::debug!("Skipping directory header at position {}", position);
                        continue;
                    }
                    records.push(record);
                }
                other => tracing::warn!(
                    "Ignoring non-object entry at position {} in {}: {}",
                    position,
                    self.path.display(),
                    other
                ),
            }
        }
        Ok(records)
    }
}

fn is_header(record: &RawRecord) -> bool {
    record.contains("source")
        && record.contains("owner")
        && !record.contains(fields::ORGANISATION_ID)
}

#[async_trait::async_trait]
impl RecordSource for JsonFileSource {
    async fn fetch_records(&self) -> SourceResult<Vec<RawRecord>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| SourceError::Io {
                path: self.path.clone(),
                source,
            })?;
        let records = self.parse(serde_json::from_str(&content)?)?;
        tracing::info!("Read {} records from {}", records.len(), self.path.display());
        Ok(records)
    }

    fn name(&self) -> &str {
        "file"
    }
}
