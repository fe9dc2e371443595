use serde::{Deserialize, Serialize};

pub const DEFAULT_ENDPOINT: &str = "https://www.wikidata.org/w/api.php";

/// `wbgetentities` accepts at most 50 ids per request for anonymous clients.
pub const MAX_BATCH_SIZE: usize = 50;

/// Knowledge-graph client and resolver configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WikidataConfig {
    /// Action API endpoint
    pub endpoint: String,
    /// Label/description languages, most preferred first
    pub languages: Vec<String>,
    /// Ids per `wbgetentities` call (capped at [`MAX_BATCH_SIZE`])
    pub batch_size: usize,
    /// Requests in flight per wave; 0 issues a whole wave at once
    pub max_concurrent_requests: usize,
    /// Connection timeout in seconds
    pub connect_timeout_seconds: u32,
    /// Request timeout in seconds
    pub request_timeout_seconds: u32,
    /// Client identification sent with every request; must name the operator
    /// and a contact address. There is no default.
    pub user_agent: String,
}

impl Default for WikidataConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            languages: vec!["de".to_string(), "en".to_string()],
            batch_size: MAX_BATCH_SIZE,
            max_concurrent_requests: 0,
            connect_timeout_seconds: 10,
            request_timeout_seconds: 30,
            user_agent: String::new(),
        }
    }
}

impl WikidataConfig {
    #[must_use]
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.clamp(1, MAX_BATCH_SIZE)
    }

    #[must_use]
    pub fn languages_param(&self) -> String {
        self.languages.join("|")
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub const fn with_max_concurrent_requests(mut self, max: usize) -> Self {
        self.max_concurrent_requests = max;
        self
    }
}
