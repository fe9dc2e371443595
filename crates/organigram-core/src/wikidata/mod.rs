mod client;
mod config;
mod facts;
mod resolver;
mod types;

pub use client::{GraphError, GraphResult, KnowledgeGraph, WikidataClient};
pub use config::{WikidataConfig, DEFAULT_ENDPOINT, MAX_BATCH_SIZE};
pub use facts::{
    commons_image, current_leader, entity_url, Budget, EmployeeCount, Leader, NamedRef,
    SocialAccount, SocialMedia, WikidataFacts,
};
pub use resolver::{
    Enrichment, EnrichmentStats, ReferenceResolver, END_TIME_QUALIFIER,
    ORGANIZATIONAL_PROPERTIES, PRINCIPAL_DETAIL_PROPERTIES, PRINCIPAL_PROPERTY,
};
pub use types::{
    Claim, DataValue, EnrichmentBundle, GraphEntity, LangValue, PropertySet, Qid, Sitelink, Snak,
};
