use std::time::Instant;

use chrono::NaiveDate;

use crate::artifact::{build_artifacts, ArtifactWriter};
use crate::directory::{aggregate_locations, classify, ClassificationConfig};
use crate::error::{Error, Result};
use crate::source::RecordSource;
use crate::wikidata::{Enrichment, ReferenceResolver};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub records_fetched: usize,
    pub organizations: usize,
    pub merged_groups: usize,
    pub location_entries: usize,
    pub enriched_entities: usize,
    pub referenced_entities: usize,
    pub failed_batches: usize,
    pub files_written: usize,
    pub duration_ms: u64,
}

/// One build: fetch, aggregate, classify, enrich, write.
pub struct Pipeline {
    source: Box<dyn RecordSource>,
    resolver: Option<ReferenceResolver>,
    classification: ClassificationConfig,
    writer: ArtifactWriter,
    today: Option<NaiveDate>,
}

impl Pipeline {
    #[must_use]
    pub fn new(source: Box<dyn RecordSource>, writer: ArtifactWriter) -> Self {
        Self {
            source,
            resolver: None,
            classification: ClassificationConfig::default(),
            writer,
            today: None,
        }
    }

    /// Without a resolver no enrichment is attempted.
    #[must_use]
    pub fn with_resolver(mut self, resolver: ReferenceResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    #[must_use]
    pub fn with_classification(mut self, classification: ClassificationConfig) -> Self {
        self.classification = classification;
        self
    }

    /// Reference date for ages; defaults to the local date at run time.
    #[must_use]
    pub const fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub async fn run(&self) -> Result<PipelineStats> {
        let start = Instant::now();
        let mut stats = PipelineStats::default();

        tracing::info!("Fetching records from {}", self.source.name());
        let records = self.source.fetch_records().await?;
        if records.is_empty() {
            return Err(Error::EmptySource);
        }
        stats.records_fetched = records.len();

        let aggregation = aggregate_locations(&records);
        stats.organizations = aggregation.organization_count();
        stats.merged_groups = aggregation.merged_group_count;
        stats.location_entries = aggregation.location_entry_count;
        tracing::info!(
            "Aggregated {} records into {} organizations ({} regular, {} Dienstort groups, {} location entries)",
            records.len(),
            stats.organizations,
            aggregation.regular_count,
            aggregation.group_count,
            aggregation.location_entry_count
        );

        let entities = classify(aggregation.entities, &self.classification);

        let enrichment = match &self.resolver {
            Some(resolver) => resolver.resolve(&entities).await,
            None => {
                tracing::info!("Wikidata enrichment disabled");
                Enrichment::default()
            }
        };
        stats.enriched_entities = enrichment.stats.enriched;
        stats.referenced_entities = enrichment.stats.principal_references
            + enrichment.stats.organizational_references
            + enrichment.stats.detail_references;
        stats.failed_batches = enrichment.stats.failed_batches;

        let today = self
            .today
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        let artifacts = build_artifacts(entities, stats.organizations, enrichment.bundles, today);
        stats.files_written = self.writer.write(&artifacts).await?;

        stats.duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::info!(
            "Build finished in {} ms: {} organizations, {} enriched, {} files",
            stats.duration_ms,
            stats.organizations,
            stats.enriched_entities,
            stats.files_written
        );
        Ok(stats)
    }
}
