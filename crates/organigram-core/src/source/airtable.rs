use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use url::Url;

use super::{RecordSource, SourceError, SourceResult};
use crate::error::{Error, Result};
use crate::record::RawRecord;

pub const DEFAULT_AIRTABLE_ENDPOINT: &str = "https://api.airtable.com/v0";
const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone)]
pub struct AirtableConfig {
    pub api_key: String,
    pub base_id: String,
    pub table_id: String,
    pub endpoint: String,
    pub page_size: u32,
    pub request_timeout_seconds: u32,
}

impl AirtableConfig {
    /// Fails with [`Error::MissingConfig`] naming the first blank credential.
    pub fn new(
        api_key: impl Into<String>,
        base_id: impl Into<String>,
        table_id: impl Into<String>,
    ) -> Result<Self> {
        let config = Self {
            api_key: api_key.into(),
            base_id: base_id.into(),
            table_id: table_id.into(),
            endpoint: DEFAULT_AIRTABLE_ENDPOINT.to_string(),
            page_size: MAX_PAGE_SIZE,
            request_timeout_seconds: 60,
        };

        if config.api_key.trim().is_empty() {
            return Err(Error::MissingConfig("AIRTABLE_API_KEY"));
        }
        if config.base_id.trim().is_empty() {
            return Err(Error::MissingConfig("AIRTABLE_BASE_ID"));
        }
        if config.table_id.trim().is_empty() {
            return Err(Error::MissingConfig("AIRTABLE_TABLE_ID"));
        }
        Ok(config)
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn table_url(&self) -> SourceResult<Url> {
        let base = format!("{}/", self.endpoint.trim_end_matches('/'));
        let mut url = Url::parse(&base)?;
        url.path_segments_mut()
            .map_err(|()| SourceError::UnexpectedShape(self.endpoint.clone()))?
            .pop_if_empty()
            .push(&self.base_id)
            .push(&self.table_id);
        Ok(url)
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    records: Vec<AirtableRecord>,
    #[serde(default)]
    offset: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AirtableRecord {
    #[serde(default)]
    fields: Map<String, Value>,
}

/// Lists every record of one Airtable table, following the `offset` cursor.
pub struct AirtableSource {
    config: AirtableConfig,
    inner: Client,
}

impl AirtableSource {
    pub fn new(config: AirtableConfig) -> SourceResult<Self> {
        let inner = Client::builder()
            .timeout(Duration::from_secs(u64::from(config.request_timeout_seconds)))
            .build()?;
        Ok(Self { config, inner })
    }

    async fn fetch_page(&self, offset: Option<&str>) -> SourceResult<ListResponse> {
        let mut url = self.config.table_url()?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("pageSize", &self.config.page_size.min(MAX_PAGE_SIZE).to_string());
            if let Some(offset) = offset {
                query.append_pair("offset", offset);
            }
        }

        let response = self
            .inner
            .get(url)
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SourceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait::async_trait]
impl RecordSource for AirtableSource {
    async fn fetch_records(&self) -> SourceResult<Vec<RawRecord>> {
        let mut records = Vec::new();
        let mut offset: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self.fetch_page(offset.as_deref()).await?;
            pages += 1;
            tracing::debug!("Airtable page {} returned {} records", pages, page.records.len());
            records.extend(page.records.into_iter().map(|r| RawRecord::from_fields(r.fields)));

            match page.offset {
                Some(next) if !next.is_empty() => offset = Some(next),
                _ => break,
            }
        }

        tracing::info!("Fetched {} records from Airtable in {} pages", records.len(), pages);
        Ok(records)
    }

    fn name(&self) -> &str {
        "airtable"
    }
}
