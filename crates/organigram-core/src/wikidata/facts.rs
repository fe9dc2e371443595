use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use url::Url;

use super::resolver::current_principal_claims;
use super::types::{Claim, EnrichmentBundle, GraphEntity, Qid, Snak};

/// Language of every label in the summary.
pub const LANG: &str = "de";

const COMMONS_FILE_PATH: &str = "https://commons.wikimedia.org/wiki/Special:FilePath/";
const EURO: &str = "Q4916";

/// Follower-count qualifier properties and the platform they denote.
const FOLLOWER_PLATFORMS: &[(&str, Platform)] = &[
    ("P6552", Platform::Twitter),
    ("P2397", Platform::Youtube),
    ("P2003", Platform::Instagram),
    ("P2013", Platform::Facebook),
    ("P4264", Platform::Linkedin),
    ("P12361", Platform::Bluesky),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Platform {
    Twitter,
    Facebook,
    Instagram,
    Youtube,
    Linkedin,
    Bluesky,
}

impl Platform {
    const fn handle_property(self) -> &'static str {
        match self {
            Self::Twitter => "P2002",
            Self::Facebook => "P2013",
            Self::Instagram => "P2003",
            Self::Youtube => "P2397",
            Self::Linkedin => "P4264",
            Self::Bluesky => "P12361",
        }
    }

    const fn url_prefix(self) -> &'static str {
        match self {
            Self::Twitter => "https://twitter.com/",
            Self::Facebook => "https://facebook.com/",
            Self::Instagram => "https://instagram.com/",
            Self::Youtube => "https://youtube.com/channel/",
            Self::Linkedin => "https://linkedin.com/company/",
            Self::Bluesky => "https://bsky.app/profile/",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedRef {
    pub name: String,
    pub qid: Qid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Leader {
    pub name: String,
    pub qid: Qid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub party: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmployeeCount {
    pub count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Budget {
    pub amount: f64,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SocialAccount {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub followers: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SocialMedia {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter: Option<SocialAccount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facebook: Option<SocialAccount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instagram: Option<SocialAccount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube: Option<SocialAccount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<SocialAccount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bluesky: Option<SocialAccount>,
}

impl SocialMedia {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.twitter.is_none()
            && self.facebook.is_none()
            && self.instagram.is_none()
            && self.youtube.is_none()
            && self.linkedin.is_none()
            && self.bluesky.is_none()
    }

    fn slot(&mut self, platform: Platform) -> &mut Option<SocialAccount> {
        match platform {
            Platform::Twitter => &mut self.twitter,
            Platform::Facebook => &mut self.facebook,
            Platform::Instagram => &mut self.instagram,
            Platform::Youtube => &mut self.youtube,
            Platform::Linkedin => &mut self.linkedin,
            Platform::Bluesky => &mut self.bluesky,
        }
    }
}

/// Display facts derived from one enrichment bundle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WikidataFacts {
    pub qid: Qid,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inception: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wikipedia: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employees: Option<EmployeeCount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<Budget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leader: Option<Leader>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_organization: Option<NamedRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subsidiaries: Vec<NamedRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub part_of: Vec<NamedRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub has_parts: Vec<NamedRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_of: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replaces: Option<NamedRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replaced_by: Option<NamedRef>,
    #[serde(skip_serializing_if = "SocialMedia::is_empty")]
    pub social_media: SocialMedia,
}

impl WikidataFacts {
    /// Collect every fact; ages are computed relative to `today`.
    #[must_use]
    pub fn from_bundle(bundle: &EnrichmentBundle, today: NaiveDate) -> Self {
        let data = &bundle.data;
        Self {
            qid: bundle.qid.clone(),
            url: entity_url(&bundle.qid),
            label: data.label(LANG).map(String::from),
            description: data.description(LANG).map(String::from),
            image: commons_image(data, "P18", 800),
            logo: commons_image(data, "P154", 400),
            inception: inception(data),
            website: first_string(data, "P856").map(String::from),
            wikipedia: wikipedia_link(data, LANG),
            email: email(data),
            employees: employee_count(data),
            budget: budget(data),
            leader: current_leader(bundle, today),
            parent_organization: first_named(bundle, "P749"),
            subsidiaries: all_named(bundle, "P355"),
            part_of: all_named(bundle, "P361"),
            has_parts: all_named(bundle, "P527"),
            instance_of: first_named(bundle, "P31").map(|r| r.name),
            replaces: first_named(bundle, "P1365"),
            replaced_by: first_named(bundle, "P1366"),
            social_media: social_media(data),
        }
    }
}

#[must_use]
pub fn entity_url(qid: &Qid) -> String {
    format!("https://www.wikidata.org/wiki/{qid}")
}

fn first_string<'a>(entity: &'a GraphEntity, property: &str) -> Option<&'a str> {
    entity
        .first_claim(property)
        .and_then(|c| c.mainsnak.string_value())
        .filter(|s| !s.is_empty())
}

/// Four-digit year of a Wikidata time string such as `+1949-05-23T00:00:00Z`.
fn year_of(time: &str) -> Option<String> {
    let digits = time.trim_start_matches('+');
    let year = digits.get(..4)?;
    year.bytes()
        .all(|b| b.is_ascii_digit())
        .then(|| year.to_string())
}

fn qualifier_year(claim: &Claim, property: &str) -> Option<String> {
    claim.qualifier(property).and_then(Snak::time).and_then(year_of)
}

fn parse_amount(amount: &str) -> Option<f64> {
    amount.trim_start_matches('+').parse().ok()
}

fn parse_count(amount: &str) -> Option<u64> {
    let digits = amount.trim_start_matches('+');
    let integral = digits.split('.').next().unwrap_or(digits);
    integral.parse().ok()
}

/// Commons `Special:FilePath` URL for a file-valued property.
#[must_use]
pub fn commons_image(entity: &GraphEntity, property: &str, width: u32) -> Option<String> {
    let filename = first_string(entity, property)?.replace(' ', "_");
    let mut url = Url::parse(COMMONS_FILE_PATH).ok()?;
    url.path_segments_mut().ok()?.pop_if_empty().push(&filename);
    url.query_pairs_mut().append_pair("width", &width.to_string());
    Some(url.to_string())
}

#[must_use]
pub fn wikipedia_link(entity: &GraphEntity, lang: &str) -> Option<String> {
    let sitelink = entity.sitelink(&format!("{lang}wiki"))?;
    if sitelink.title.is_empty() {
        return None;
    }
    let mut url = Url::parse(&format!("https://{lang}.wikipedia.org/wiki/")).ok()?;
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .push(&sitelink.title.replace(' ', "_"));
    Some(url.to_string())
}

#[must_use]
pub fn inception(entity: &GraphEntity) -> Option<String> {
    entity
        .first_claim("P571")
        .and_then(|c| c.mainsnak.time())
        .and_then(year_of)
}

#[must_use]
pub fn email(entity: &GraphEntity) -> Option<String> {
    first_string(entity, "P968").map(|e| e.replace("mailto:", ""))
}

#[must_use]
pub fn employee_count(entity: &GraphEntity) -> Option<EmployeeCount> {
    let claim = entity.first_claim("P1128")?;
    let count = claim.mainsnak.amount().and_then(parse_count)?;
    Some(EmployeeCount {
        count,
        date: qualifier_year(claim, "P585"),
    })
}

#[must_use]
pub fn budget(entity: &GraphEntity) -> Option<Budget> {
    let claim = entity.first_claim("P2769")?;
    let amount = claim.mainsnak.amount().and_then(parse_amount)?;
    let currency = if claim.mainsnak.unit().is_some_and(|u| u.contains(EURO)) {
        "€"
    } else {
        ""
    };
    Some(Budget {
        amount,
        currency: currency.to_string(),
        year: qualifier_year(claim, "P585"),
    })
}

fn named(bundle: &EnrichmentBundle, claim: &Claim) -> Option<NamedRef> {
    let qid = claim.entity_id()?;
    let name = bundle.referenced(&qid)?.label(LANG)?.to_string();
    Some(NamedRef { name, qid })
}

fn first_named(bundle: &EnrichmentBundle, property: &str) -> Option<NamedRef> {
    let claim = bundle.data.first_claim(property)?;
    named(bundle, claim)
}

fn all_named(bundle: &EnrichmentBundle, property: &str) -> Vec<NamedRef> {
    bundle
        .data
        .claims(property)
        .iter()
        .filter_map(|claim| named(bundle, claim))
        .collect()
}

fn short_gender(label: &str) -> Option<&'static str> {
    match label {
        "männlich" => Some("m"),
        "weiblich" => Some("w"),
        "divers" => Some("d"),
        _ => None,
    }
}

fn birth_date(time: &str) -> Option<NaiveDate> {
    let digits = time.trim_start_matches('+');
    let mut parts = digits.get(..10)?.split('-');
    let year = parts.next()?.parse().ok()?;
    let month = parts.next()?.parse().ok()?;
    let day = parts.next()?.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn age_on(birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age
}

/// First chairperson without an end date whose label is known.
#[must_use]
pub fn current_leader(bundle: &EnrichmentBundle, today: NaiveDate) -> Option<Leader> {
    current_principal_claims(&bundle.data)
        .find_map(|claim| leader_from_claim(bundle, claim, today))
}

fn leader_from_claim(bundle: &EnrichmentBundle, claim: &Claim, today: NaiveDate) -> Option<Leader> {
    let qid = claim.entity_id()?;
    let person = bundle.referenced(&qid)?;
    let name = person.label(LANG)?.to_string();

    let referenced_label = |property: &str| {
        person
            .first_claim(property)
            .and_then(Claim::entity_id)
            .and_then(|id| bundle.referenced(&id))
            .and_then(|entity| entity.label(LANG))
    };

    let birth = person
        .first_claim("P569")
        .and_then(|c| c.mainsnak.time())
        .and_then(birth_date);

    Some(Leader {
        name,
        since: qualifier_year(claim, "P580"),
        party: referenced_label("P102").map(String::from),
        gender: referenced_label("P21")
            .and_then(short_gender)
            .map(String::from),
        birth_date: birth.map(|d| format!("{}.{}.{}", d.day(), d.month(), d.year())),
        age: birth.map(|d| age_on(d, today)),
        image: commons_image(person, "P18", 400),
        description: person.description(LANG).map(String::from),
        qid,
    })
}

#[must_use]
pub fn social_media(entity: &GraphEntity) -> SocialMedia {
    let mut followers: HashMap<Platform, u64> = HashMap::new();
    for claim in entity.claims("P8687") {
        let Some(count) = claim.mainsnak.amount().and_then(parse_count) else {
            continue;
        };
        for (qualifier, platform) in FOLLOWER_PLATFORMS {
            if claim.has_qualifier(qualifier) {
                followers
                    .entry(*platform)
                    .and_modify(|best| *best = (*best).max(count))
                    .or_insert(count);
            }
        }
    }

    let mut media = SocialMedia::default();
    for (_, platform) in FOLLOWER_PLATFORMS {
        let Some(handle) = first_string(entity, platform.handle_property()) else {
            continue;
        };
        *media.slot(*platform) = Some(SocialAccount {
            url: format!("{}{handle}", platform.url_prefix()),
            followers: followers.get(platform).copied(),
        });
    }
    media
}
