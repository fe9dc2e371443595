use std::path::{Path, PathBuf};

use serde::Serialize;

use super::builder::ArtifactSet;
use crate::error::{Error, Result};

pub const DIRECTORY_FILE: &str = "anschriftenverzeichnis.json";
pub const ENRICHMENT_FILE: &str = "wikidata.json";
pub const INDEX_FILE: &str = "organizations-index.json";
pub const ORGANIZATIONS_DIR: &str = "organizations";

/// Writes an [`ArtifactSet`] as pretty-printed JSON below one directory.
pub struct ArtifactWriter {
    output_dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Returns the number of files written.
    pub async fn write(&self, artifacts: &ArtifactSet) -> Result<usize> {
        let organizations_dir = self.output_dir.join(ORGANIZATIONS_DIR);
        create_dir(&organizations_dir).await?;

        write_json(&self.output_dir.join(DIRECTORY_FILE), &artifacts.directory).await?;
        write_json(&self.output_dir.join(ENRICHMENT_FILE), &artifacts.enrichment).await?;
        write_json(&self.output_dir.join(INDEX_FILE), &artifacts.index).await?;

        for organization in &artifacts.organizations {
            let path = organizations_dir.join(format!("{}.json", organization.key));
            write_json(&path, &organization.record).await?;
        }

        let written = 3 + artifacts.organizations.len();
        tracing::info!("Wrote {} files to {}", written, self.output_dir.display());
        Ok(written)
    }
}

async fn create_dir(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    tokio::fs::write(path, bytes)
        .await
        .map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::debug!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::build_artifacts;
    use crate::record::RawRecord;
    use chrono::NaiveDate;
    use serde_json::{json, Value};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn read(path: &Path) -> Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    fn sample_set() -> ArtifactSet {
        let entities = vec![
            RawRecord::from(json!({"Organisation": "Bundesamt für Justiz", "OrganisationKurz": "BfJ", "OrganisationId": 12, "Ort": "Bonn"})),
            RawRecord::from(json!({"Organisation": "Deutscher Bundestag", "OrganisationKurz": "BT", "OrganisationId": 1})),
        ];
        build_artifacts(
            entities,
            2,
            BTreeMap::new(),
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_writes_all_artifacts() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("public");
        let writer = ArtifactWriter::new(&output);

        let written = writer.write(&sample_set()).await.unwrap();

        assert_eq!(written, 5);
        let directory = read(&output.join(DIRECTORY_FILE));
        assert_eq!(directory[0]["amount"], json!("2 Authorities / Institutions"));
        assert_eq!(directory.as_array().unwrap().len(), 3);
        assert_eq!(read(&output.join(ENRICHMENT_FILE)), json!({}));
        assert_eq!(read(&output.join(INDEX_FILE)).as_array().unwrap().len(), 2);

        let bfj = read(&output.join(ORGANIZATIONS_DIR).join("bfj-12.json"));
        assert_eq!(bfj["Organisation"], json!("Bundesamt für Justiz"));
        assert_eq!(bfj["locations"][0]["Ort"], json!("Bonn"));
        assert_eq!(bfj["hasWikidata"], json!(false));
        assert!(output.join(ORGANIZATIONS_DIR).join("bt-1.json").exists());
    }

    #[tokio::test]
    async fn test_output_is_utf8_not_escaped() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path());

        writer.write(&sample_set()).await.unwrap();

        let raw = std::fs::read_to_string(dir.path().join(INDEX_FILE)).unwrap();
        assert!(raw.contains("Bundesamt für Justiz"));
    }

    #[tokio::test]
    async fn test_unwritable_target_reports_path() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, "file, not a directory").unwrap();

        let result = ArtifactWriter::new(&blocker).write(&sample_set()).await;

        assert!(matches!(result, Err(Error::Io { path, .. }) if path.starts_with(&blocker)));
    }
}
