pub mod artifact;
pub mod directory;
pub mod error;
pub mod pipeline;
pub mod record;
pub mod source;
pub mod wikidata;

pub use artifact::{
    build_artifacts, file_key, slugify, ArtifactSet, ArtifactWriter, DirectoryHeader,
    FullEntityRecord, IndexEntry,
};
pub use directory::{
    aggregate_locations, classify, classify_entity, extract_branch, strip_branch, Aggregation,
    BranchMatch, ClassificationConfig, ClassificationRule,
};
pub use error::{Error, Result};
pub use pipeline::{Pipeline, PipelineStats};
pub use record::{fields, RawRecord};
pub use source::{
    AirtableConfig, AirtableSource, JsonFileSource, RecordSource, SourceError, SourceResult,
};
pub use wikidata::{
    EnrichmentBundle, GraphEntity, GraphError, KnowledgeGraph, Qid, ReferenceResolver,
    WikidataClient, WikidataConfig, WikidataFacts,
};
