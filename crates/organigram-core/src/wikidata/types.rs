use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

static QID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|/)(Q[1-9][0-9]*)$").expect("qid pattern is a valid regex"));

/// Wikidata item identifier such as `Q183`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Qid(String);

impl Qid {
    /// Accepts a bare id or an entity URL ending in one.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim().trim_end_matches('/');
        QID_PATTERN
            .captures(trimmed)
            .and_then(|c| c.get(1))
            .map(|m| Self(m.as_str().to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Qid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Qid {
    type Err = super::GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| super::GraphError::InvalidId(s.to_string()))
    }
}

/// Which parts of an entity to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertySet {
    /// Labels, descriptions, claims and sitelinks.
    Full,
    LabelsOnly,
}

impl PropertySet {
    #[must_use]
    pub const fn as_props(&self) -> &'static str {
        match self {
            Self::Full => "labels|descriptions|claims|sitelinks",
            Self::LabelsOnly => "labels|descriptions",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LangValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sitelink {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataValue {
    #[serde(default)]
    pub value: Value,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snak {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snaktype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datavalue: Option<DataValue>,
}

impl Snak {
    fn value(&self) -> Option<&Value> {
        self.datavalue.as_ref().map(|d| &d.value)
    }

    /// Target of an item-valued snak.
    #[must_use]
    pub fn entity_id(&self) -> Option<Qid> {
        let value = self.value()?;
        value
            .get("id")
            .and_then(Value::as_str)
            .and_then(Qid::parse)
            .or_else(|| {
                value
                    .get("numeric-id")
                    .and_then(Value::as_u64)
                    .map(|n| Qid(format!("Q{n}")))
            })
    }

    #[must_use]
    pub fn string_value(&self) -> Option<&str> {
        self.value()?.as_str()
    }

    /// Wikidata time string, e.g. `+1949-05-23T00:00:00Z`.
    #[must_use]
    pub fn time(&self) -> Option<&str> {
        self.value()?.get("time")?.as_str()
    }

    /// Quantity amount with its leading sign, e.g. `+1200`.
    #[must_use]
    pub fn amount(&self) -> Option<&str> {
        self.value()?.get("amount")?.as_str()
    }

    #[must_use]
    pub fn unit(&self) -> Option<&str> {
        self.value()?.get("unit")?.as_str()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<String>,
    #[serde(default)]
    pub mainsnak: Snak,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub qualifiers: BTreeMap<String, Vec<Snak>>,
}

impl Claim {
    #[must_use]
    pub fn entity_id(&self) -> Option<Qid> {
        self.mainsnak.entity_id()
    }

    #[must_use]
    pub fn has_qualifier(&self, property: &str) -> bool {
        self.qualifiers.contains_key(property)
    }

    #[must_use]
    pub fn qualifier(&self, property: &str) -> Option<&Snak> {
        self.qualifiers.get(property)?.first()
    }
}

/// Entity payload as returned by `wbgetentities`, minus revision metadata and claim references.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphEntity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Qid>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, LangValue>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub descriptions: BTreeMap<String, LangValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims: Option<BTreeMap<String, Vec<Claim>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sitelinks: Option<BTreeMap<String, Sitelink>>,
}

impl GraphEntity {
    #[must_use]
    pub fn label(&self, lang: &str) -> Option<&str> {
        self.labels
            .get(lang)
            .map(|v| v.value.as_str())
            .filter(|v| !v.is_empty())
    }

    #[must_use]
    pub fn description(&self, lang: &str) -> Option<&str> {
        self.descriptions
            .get(lang)
            .map(|v| v.value.as_str())
            .filter(|v| !v.is_empty())
    }

    #[must_use]
    pub fn claims(&self, property: &str) -> &[Claim] {
        self.claims
            .as_ref()
            .and_then(|c| c.get(property))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn first_claim(&self, property: &str) -> Option<&Claim> {
        self.claims(property).first()
    }

    /// Item ids referenced by the given property, in claim order.
    pub fn referenced_ids<'a>(&'a self, property: &str) -> impl Iterator<Item = Qid> + 'a {
        self.claims(property).iter().filter_map(Claim::entity_id)
    }

    #[must_use]
    pub fn sitelink(&self, site: &str) -> Option<&Sitelink> {
        self.sitelinks.as_ref()?.get(site)
    }
}

/// Enrichment of one organization: its own payload plus every entity it references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentBundle {
    pub qid: Qid,
    pub data: GraphEntity,
    #[serde(default)]
    pub referenced_entities: BTreeMap<Qid, GraphEntity>,
}

impl EnrichmentBundle {
    #[must_use]
    pub fn referenced(&self, qid: &Qid) -> Option<&GraphEntity> {
        self.referenced_entities.get(qid)
    }
}
