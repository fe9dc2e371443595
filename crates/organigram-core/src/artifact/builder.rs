use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use serde::ser::{SerializeSeq, Serializer};
use serde::Serialize;
use serde_json::{Map, Value};
use unicode_normalization::UnicodeNormalization;

use crate::record::{fields, RawRecord};
use crate::wikidata::{EnrichmentBundle, WikidataFacts};

const MAX_KEY_CHARS: usize = 50;

/// Metadata element heading the directory file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryHeader {
    pub source: String,
    pub owner: String,
    pub creation_date: String,
    pub amount: String,
}

impl DirectoryHeader {
    #[must_use]
    pub fn new(organization_count: usize) -> Self {
        Self {
            source: "airtable".to_string(),
            owner: "German Organigram".to_string(),
            creation_date: String::new(),
            amount: format!("{organization_count} Authorities / Institutions"),
        }
    }
}

/// Header followed by every aggregated, classified entity.
#[derive(Debug, Clone)]
pub struct Directory {
    pub header: DirectoryHeader,
    pub entities: Vec<RawRecord>,
}

impl Serialize for Directory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.entities.len() + 1))?;
        seq.serialize_element(&self.header)?;
        for entity in &self.entities {
            seq.serialize_element(entity)?;
        }
        seq.end()
    }
}

/// Listing projection of one organization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexEntry {
    #[serde(rename = "Organisation")]
    pub organisation: String,
    #[serde(rename = "OrganisationId", skip_serializing_if = "Option::is_none")]
    pub organisation_id: Option<Value>,
    #[serde(rename = "OrganisationDisplay", skip_serializing_if = "Option::is_none")]
    pub organisation_display: Option<String>,
    #[serde(rename = "OrganisationKurz", skip_serializing_if = "Option::is_none")]
    pub organisation_kurz: Option<String>,
    #[serde(rename = "Kategorie", skip_serializing_if = "Option::is_none")]
    pub kategorie: Option<String>,
    #[serde(rename = "Ressort", skip_serializing_if = "Option::is_none")]
    pub ressort: Option<String>,
    #[serde(rename = "Versteckt")]
    pub versteckt: bool,
    #[serde(rename = "hasWikidata")]
    pub has_wikidata: bool,
}

/// Main entity fields plus locations and enrichment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FullEntityRecord {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    pub locations: Vec<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wikidata: Option<EnrichmentBundle>,
    pub has_wikidata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wikidata_facts: Option<WikidataFacts>,
}

#[derive(Debug, Clone)]
pub struct OrganizationArtifact {
    /// File stem under `organizations/`.
    pub key: String,
    pub record: FullEntityRecord,
}

/// Everything one run writes.
#[derive(Debug, Clone)]
pub struct ArtifactSet {
    pub directory: Directory,
    pub enrichment: BTreeMap<String, EnrichmentBundle>,
    pub index: Vec<IndexEntry>,
    pub organizations: Vec<OrganizationArtifact>,
    /// Nameless entries whose id matched no organization.
    pub unattached_locations: usize,
    /// Organizations whose file key was taken and received a numeric suffix.
    pub duplicate_keys: usize,
}

/// Lowercase ASCII slug of a name, at most 50 characters.
#[must_use]
pub fn slugify(name: &str) -> String {
    let kept: String = name
        .nfkd()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();

    let mut slug = String::with_capacity(kept.len());
    let mut in_separator = false;
    for c in kept.chars() {
        if c == '-' || c.is_whitespace() {
            if !in_separator {
                slug.push('-');
            }
            in_separator = true;
        } else {
            slug.push(c);
            in_separator = false;
        }
    }

    slug.trim_matches('-').chars().take(MAX_KEY_CHARS).collect()
}

/// File stem of an organization: slug of its best name plus `-<OrganisationId>`.
#[must_use]
pub fn file_key(record: &RawRecord) -> String {
    let name = record
        .short_code()
        .or_else(|| record.organisation())
        .or_else(|| record.display_name())
        .unwrap_or("org");
    let slug = slugify(name);
    match record.organisation_id() {
        Some(id) if !id.is_empty() => format!("{slug}-{id}"),
        _ => slug,
    }
}

#[must_use]
pub fn location_projection(record: &RawRecord) -> Map<String, Value> {
    fields::LOCATION_FIELDS
        .iter()
        .filter_map(|key| record.get(key).map(|v| ((*key).to_string(), v.clone())))
        .collect()
}

fn index_entry(main: &RawRecord, organisation: &str, has_wikidata: bool) -> IndexEntry {
    let text = |key: &str| main.text(key).map(String::from);
    IndexEntry {
        organisation: organisation.to_string(),
        organisation_id: main.organisation_id_value().cloned(),
        organisation_display: text(fields::ORGANISATION_DISPLAY),
        organisation_kurz: text(fields::ORGANISATION_KURZ),
        kategorie: text(fields::KATEGORIE),
        ressort: text(fields::RESSORT),
        versteckt: main.is_hidden(),
        has_wikidata,
    }
}

struct OrganizationGroup<'a> {
    name: &'a str,
    members: Vec<&'a RawRecord>,
    attached: Vec<&'a RawRecord>,
}

/// Merge classified entities with their enrichment into the artifact set.
///
/// Entities sharing an `Organisation` form one organization whose first member
/// is the main entity. Nameless location entries attach to the organization
/// whose main entity has the same `OrganisationId`.
#[must_use]
pub fn build_artifacts(
    entities: Vec<RawRecord>,
    organization_count: usize,
    enrichment: BTreeMap<String, EnrichmentBundle>,
    today: NaiveDate,
) -> ArtifactSet {
    let built = build_organizations(&entities, &enrichment, today);

    tracing::info!(
        "Built {} organization records ({} with Wikidata)",
        built.organizations.len(),
        built.index.iter().filter(|e| e.has_wikidata).count()
    );

    ArtifactSet {
        directory: Directory {
            header: DirectoryHeader::new(organization_count),
            entities,
        },
        enrichment,
        index: built.index,
        organizations: built.organizations,
        unattached_locations: built.unattached_locations,
        duplicate_keys: built.duplicate_keys,
    }
}

struct BuiltOrganizations {
    index: Vec<IndexEntry>,
    organizations: Vec<OrganizationArtifact>,
    unattached_locations: usize,
    duplicate_keys: usize,
}

fn build_organizations(
    entities: &[RawRecord],
    enrichment: &BTreeMap<String, EnrichmentBundle>,
    today: NaiveDate,
) -> BuiltOrganizations {
    let mut groups: Vec<OrganizationGroup<'_>> = Vec::new();
    let mut by_name: HashMap<&str, usize> = HashMap::new();
    let mut by_id: HashMap<String, usize> = HashMap::new();
    let mut nameless = Vec::new();

    for entity in entities {
        let Some(name) = entity.organisation() else {
            nameless.push(entity);
            continue;
        };
        if let Some(&idx) = by_name.get(name) {
            groups[idx].members.push(entity);
            continue;
        }
        let idx = groups.len();
        by_name.insert(name, idx);
        if let Some(id) = entity.organisation_id() {
            by_id.entry(id).or_insert(idx);
        }
        groups.push(OrganizationGroup {
            name,
            members: vec![entity],
            attached: Vec::new(),
        });
    }

    let mut unattached_locations = 0;
    for entry in nameless {
        match entry.organisation_id().and_then(|id| by_id.get(&id)) {
            Some(&idx) => groups[idx].attached.push(entry),
            None => unattached_locations += 1,
        }
    }
    if unattached_locations > 0 {
        tracing::warn!(
            "{} location entries match no organization",
            unattached_locations
        );
    }

    let mut index = Vec::with_capacity(groups.len());
    let mut organizations = Vec::with_capacity(groups.len());
    let mut taken_keys = HashSet::new();
    let mut duplicate_keys = 0;

    for group in &groups {
        let main = group.members[0];
        let key = unique_key(file_key(main), &mut taken_keys);
        if key.suffixed {
            tracing::warn!(
                "File key of '{}' is already taken, writing it as {}",
                group.name,
                key.value
            );
            duplicate_keys += 1;
        }
        let key = key.value;

        let bundle = main
            .organisation_id()
            .and_then(|id| enrichment.get(&id))
            .cloned();
        let has_wikidata = bundle.is_some();

        index.push(index_entry(main, group.name, has_wikidata));

        let locations = group
            .members
            .iter()
            .chain(group.attached.iter())
            .map(|record| location_projection(record))
            .collect();

        organizations.push(OrganizationArtifact {
            key,
            record: FullEntityRecord {
                fields: main.fields().clone(),
                locations,
                wikidata_facts: bundle.as_ref().map(|b| WikidataFacts::from_bundle(b, today)),
                wikidata: bundle,
                has_wikidata,
            },
        });
    }

    BuiltOrganizations {
        index,
        organizations,
        unattached_locations,
        duplicate_keys,
    }
}

struct AssignedKey {
    value: String,
    suffixed: bool,
}

/// Claims `base`, or the first free `base-2`, `base-3`, ... when it is taken.
fn unique_key(base: String, taken: &mut HashSet<String>) -> AssignedKey {
    if taken.insert(base.clone()) {
        return AssignedKey {
            value: base,
            suffixed: false,
        };
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base}-{n}");
        if taken.insert(candidate.clone()) {
            return AssignedKey {
                value: candidate,
                suffixed: true,
            };
        }
        n += 1;
    }
}
