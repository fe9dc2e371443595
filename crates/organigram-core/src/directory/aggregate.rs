use std::collections::{HashMap, HashSet};

use serde_json::Value;

use super::pattern::{extract_branch, strip_branch, BranchMatch};
use crate::record::{fields, RawRecord};

/// Output of [`aggregate_locations`].
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    /// Regular entries in source order, then every group (main entry first, then its locations).
    pub entities: Vec<RawRecord>,
    pub regular_count: usize,
    pub group_count: usize,
    /// Groups with more than one member, i.e. that produced location entries.
    pub merged_group_count: usize,
    pub location_entry_count: usize,
}

impl Aggregation {
    /// Distinct organizations after merging.
    #[must_use]
    pub const fn organization_count(&self) -> usize {
        self.regular_count + self.group_count
    }
}

struct Member<'a> {
    record: &'a RawRecord,
    location: String,
}

/// Merge `(Dienstort X)` records of the same organization.
///
/// A group of one collapses to a plain entry with the stripped name. In larger
/// groups the first record by source order becomes the main entry and every
/// sibling becomes a location entry pointing at it.
#[must_use]
pub fn aggregate_locations(records: &[RawRecord]) -> Aggregation {
    let mut regular = Vec::new();
    let mut groups: Vec<(String, Vec<Member<'_>>)> = Vec::new();
    let mut group_index: HashMap<String, usize> = HashMap::new();

    for record in records {
        let display = record.display_name().unwrap_or_default();
        match extract_branch(display) {
            BranchMatch::NoMatch => regular.push(record.clone()),
            BranchMatch::Match { canonical, location } => {
                let idx = *group_index.entry(canonical.clone()).or_insert_with(|| {
                    groups.push((canonical, Vec::new()));
                    groups.len() - 1
                });
                groups[idx].1.push(Member { record, location });
            }
        }
    }

    let mut output = Aggregation {
        regular_count: regular.len(),
        group_count: groups.len(),
        entities: regular,
        ..Aggregation::default()
    };
    let mut seen_location_ids = HashSet::new();

    for (canonical, members) in groups {
        let Some((first, siblings)) = members.split_first() else {
            continue;
        };

        let main = main_entry(first.record, &canonical);
        let main_id = main.organisation_id_value().cloned();

        if !siblings.is_empty() {
            output.merged_group_count += 1;
            tracing::debug!(
                "Merging {} Dienstorte into '{}'",
                siblings.len() + 1,
                canonical
            );
        }

        output.entities.push(main);

        for (index, sibling) in siblings.iter().enumerate() {
            let entry = location_entry(sibling, index + 1, main_id.as_ref());
            if let Some(location_id) = entry.location_id() {
                if !seen_location_ids.insert(location_id.to_string()) {
                    tracing::warn!("Duplicate synthetic location id {}", location_id);
                }
            }
            output.location_entry_count += 1;
            output.entities.push(entry);
        }
    }

    output
}

fn main_entry(record: &RawRecord, canonical: &str) -> RawRecord {
    let stripped_org = record.organisation().map(strip_branch);
    let entry = record
        .clone()
        .with(fields::ORGANISATION_DISPLAY, canonical);
    match stripped_org {
        Some(org) => entry.with(fields::ORGANISATION, org),
        None => entry,
    }
}

fn location_entry(member: &Member<'_>, index: usize, main_id: Option<&Value>) -> RawRecord {
    let own_id = member
        .record
        .organisation_id()
        .or_else(|| main_id.and_then(id_string))
        .unwrap_or_default();

    let entry = member
        .record
        .clone()
        .with(fields::LIEGENSCHAFTS_ID, format!("DIENSTORT_{own_id}_{index}"))
        .with(fields::LIEGENSCHAFT, format!("Dienstort {}", member.location))
        .without(fields::ORGANISATION)
        .without(fields::ORGANISATION_DISPLAY);

    match main_id {
        Some(id) => entry.with(fields::ORGANISATION_ID, id.clone()),
        None => entry.without(fields::ORGANISATION_ID),
    }
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
