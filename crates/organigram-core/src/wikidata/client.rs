use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::config::WikidataConfig;
use super::types::{GraphEntity, PropertySet, Qid};

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Wikidata requests need a User-Agent naming a contact; set WIKIDATA_USER_AGENT")]
    MissingUserAgent,
    #[error("Invalid Wikidata id: {0}")]
    InvalidId(String),
    #[error("Batch of {requested} ids exceeds the limit of {limit}")]
    BatchTooLarge { requested: usize, limit: usize },
    #[error("Wikidata API error {code}: {info}")]
    Api { code: String, info: String },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

pub type GraphResult<T> = Result<T, GraphError>;

/// Batched entity lookup against a knowledge graph.
#[async_trait::async_trait]
pub trait KnowledgeGraph: Send + Sync {
    /// Fetch one batch of entities. Ids unknown to the graph are absent from the result.
    async fn fetch_entities(
        &self,
        ids: &[Qid],
        props: PropertySet,
    ) -> GraphResult<HashMap<Qid, GraphEntity>>;

    /// Largest batch [`KnowledgeGraph::fetch_entities`] accepts.
    fn batch_size(&self) -> usize;
}

#[derive(Debug, Deserialize)]
struct GetEntitiesResponse {
    #[serde(default)]
    entities: HashMap<String, WireEntity>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    info: String,
}

#[derive(Debug, Deserialize)]
struct WireEntity {
    #[serde(default)]
    missing: Option<Value>,
    #[serde(flatten)]
    entity: GraphEntity,
}

/// `wbgetentities` client for the Wikidata action API.
pub struct WikidataClient {
    config: WikidataConfig,
    endpoint: Url,
    inner: Client,
}

impl WikidataClient {
    pub fn new(config: WikidataConfig) -> GraphResult<Self> {
        let endpoint = Url::parse(&config.endpoint)?;
        if config.user_agent.trim().is_empty() {
            return Err(GraphError::MissingUserAgent);
        }
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(u64::from(config.connect_timeout_seconds)))
            .timeout(Duration::from_secs(u64::from(config.request_timeout_seconds)))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            config,
            endpoint,
            inner,
        })
    }

    pub const fn config(&self) -> &WikidataConfig {
        &self.config
    }

    fn request_url(&self, ids: &[Qid], props: PropertySet) -> Url {
        let ids = ids.iter().map(Qid::as_str).collect::<Vec<_>>().join("|");
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("action", "wbgetentities")
            .append_pair("format", "json")
            .append_pair("ids", &ids)
            .append_pair("languages", &self.config.languages_param())
            .append_pair("props", props.as_props());
        url
    }
}

#[async_trait::async_trait]
impl KnowledgeGraph for WikidataClient {
    async fn fetch_entities(
        &self,
        ids: &[Qid],
        props: PropertySet,
    ) -> GraphResult<HashMap<Qid, GraphEntity>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let limit = self.batch_size();
        if ids.len() > limit {
            return Err(GraphError::BatchTooLarge {
                requested: ids.len(),
                limit,
            });
        }

        let url = self.request_url(ids, props);
        tracing::debug!("Fetching {} Wikidata entities ({:?})", ids.len(), props);

        let response: GetEntitiesResponse = self
            .inner
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(GraphError::Api {
                code: error.code,
                info: error.info,
            });
        }

        let mut entities = HashMap::with_capacity(response.entities.len());
        for (key, wire) in response.entities {
            if wire.missing.is_some() {
                tracing::debug!("Wikidata has no entity {}", key);
                continue;
            }
            match Qid::parse(&key) {
                Some(qid) => {
                    entities.insert(qid, wire.entity);
                }
                None => tracing::warn!("Ignoring unexpected Wikidata entity key {}", key),
            }
        }

        Ok(entities)
    }

    fn batch_size(&self) -> usize {
        self.config.effective_batch_size()
    }
}
