use std::collections::{BTreeMap, BTreeSet, HashMap};

use futures::stream::{self, StreamExt};

use super::client::KnowledgeGraph;
use super::types::{Claim, EnrichmentBundle, GraphEntity, PropertySet, Qid};
use crate::record::RawRecord;

/// Chairperson; the current holder is resolved to full depth.
pub const PRINCIPAL_PROPERTY: &str = "P488";
/// End time qualifier marking a past office-holder.
pub const END_TIME_QUALIFIER: &str = "P582";
/// Organizational relations resolved to labels and descriptions.
pub const ORGANIZATIONAL_PROPERTIES: &[&str] = &[
    "P749",  // parent organization
    "P355",  // subsidiary
    "P361",  // part of
    "P527",  // has part
    "P31",   // instance of
    "P1365", // replaces
    "P1366", // replaced by
];
/// Relations of an office-holder resolved one hop further.
pub const PRINCIPAL_DETAIL_PROPERTIES: &[&str] = &[
    "P102", // member of political party
    "P21",  // sex or gender
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentStats {
    /// Entities carrying both a stable id and a Wikidata id.
    pub requested: usize,
    pub enriched: usize,
    pub principal_references: usize,
    pub organizational_references: usize,
    pub detail_references: usize,
    pub failed_batches: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Enrichment {
    /// Bundles keyed by `OrganisationId`.
    pub bundles: BTreeMap<String, EnrichmentBundle>,
    pub stats: EnrichmentStats,
}

#[derive(Default)]
struct WaveOutcome {
    entities: HashMap<Qid, GraphEntity>,
    failed_batches: usize,
}

/// References found on one organization's own payload.
#[derive(Default)]
struct EntityReferences {
    principal: BTreeSet<Qid>,
    organizational: BTreeSet<Qid>,
}

/// Resolves organizations to Wikidata bundles in three ordered waves.
///
/// Wave 1 fetches every organization's own entity, one call per entity.
/// Wave 2 fetches the union of all current chairpersons (full payload) and
/// all organizational references (labels only), each id once per run.
/// Wave 3 fetches party and gender of the chairpersons, again deduplicated
/// against everything already known. A failed call only loses its own ids.
pub struct ReferenceResolver {
    graph: Box<dyn KnowledgeGraph>,
    max_concurrent_requests: usize,
}

impl ReferenceResolver {
    #[must_use]
    pub fn new(graph: Box<dyn KnowledgeGraph>) -> Self {
        Self {
            graph,
            max_concurrent_requests: 0,
        }
    }

    /// Cap on calls in flight per wave; 0 sends a whole wave at once.
    #[must_use]
    pub const fn with_max_concurrent_requests(mut self, max: usize) -> Self {
        self.max_concurrent_requests = max;
        self
    }

    pub async fn resolve(&self, entities: &[RawRecord]) -> Enrichment {
        let targets = collect_targets(entities);
        let mut stats = EnrichmentStats {
            requested: targets.len(),
            ..EnrichmentStats::default()
        };
        if targets.is_empty() {
            return Enrichment {
                bundles: BTreeMap::new(),
                stats,
            };
        }

        let own_ids: BTreeSet<Qid> = targets.values().cloned().collect();
        tracing::info!("Fetching {} Wikidata entities", own_ids.len());
        let wave1 = self.fetch_wave(&[(&own_ids, PropertySet::Full)], 1).await;
        stats.failed_batches += wave1.failed_batches;
        let own = wave1.entities;

        let references: HashMap<&Qid, EntityReferences> = own
            .iter()
            .map(|(qid, entity)| (qid, entity_references(entity)))
            .collect();

        let principal_ids: BTreeSet<Qid> = references
            .values()
            .flat_map(|r| r.principal.iter().cloned())
            .collect();
        let organizational_ids: BTreeSet<Qid> = references
            .values()
            .flat_map(|r| r.organizational.iter().cloned())
            .filter(|qid| !principal_ids.contains(qid))
            .collect();
        stats.principal_references = principal_ids.len();
        stats.organizational_references = organizational_ids.len();

        let principal_to_fetch = without_known(&principal_ids, &own);
        let organizational_to_fetch = without_known(&organizational_ids, &own);
        tracing::info!(
            "Fetching {} principal and {} organizational references",
            principal_to_fetch.len(),
            organizational_to_fetch.len()
        );

        let batch = self.graph.batch_size().max(1);
        let reference_wave = self
            .fetch_wave(
                &[
                    (&principal_to_fetch, PropertySet::Full),
                    (&organizational_to_fetch, PropertySet::LabelsOnly),
                ],
                batch,
            )
            .await;
        stats.failed_batches += reference_wave.failed_batches;

        let mut known: HashMap<Qid, GraphEntity> = own.clone();
        known.extend(reference_wave.entities);

        let detail_ids: BTreeSet<Qid> = principal_ids
            .iter()
            .filter_map(|qid| known.get(qid))
            .flat_map(detail_references)
            .collect();
        stats.detail_references = detail_ids.len();

        let detail_to_fetch = without_known(&detail_ids, &known);
        tracing::info!("Fetching {} principal detail references", detail_to_fetch.len());
        let detail_wave = self
            .fetch_wave(&[(&detail_to_fetch, PropertySet::LabelsOnly)], batch)
            .await;
        stats.failed_batches += detail_wave.failed_batches;
        known.extend(detail_wave.entities);

        let mut bundles = BTreeMap::new();
        for (org_id, qid) in targets {
            let (Some(data), Some(refs)) = (own.get(&qid), references.get(&qid)) else {
                tracing::debug!("No Wikidata payload for organization {} ({})", org_id, qid);
                continue;
            };
            let bundle = EnrichmentBundle {
                qid: qid.clone(),
                data: data.clone(),
                referenced_entities: assemble_references(refs, &known),
            };
            bundles.insert(org_id, bundle);
        }
        stats.enriched = bundles.len();

        tracing::info!(
            "Enriched {}/{} organizations ({} failed batches)",
            stats.enriched,
            stats.requested,
            stats.failed_batches
        );

        Enrichment { bundles, stats }
    }

    /// Fan out every id set of one wave in chunks through a single bounded
    /// stream, join, and merge the id-keyed results.
    async fn fetch_wave(&self, sets: &[(&BTreeSet<Qid>, PropertySet)], chunk_size: usize) -> WaveOutcome {
        let chunks: Vec<(Vec<Qid>, PropertySet)> = sets
            .iter()
            .flat_map(|(ids, props)| {
                let ids: Vec<Qid> = ids.iter().cloned().collect();
                ids.chunks(chunk_size.max(1))
                    .map(|chunk| (chunk.to_vec(), *props))
                    .collect::<Vec<_>>()
            })
            .collect();
        if chunks.is_empty() {
            return WaveOutcome::default();
        }

        let width = if self.max_concurrent_requests == 0 {
            chunks.len()
        } else {
            self.max_concurrent_requests
        };

        let results: Vec<_> = stream::iter(chunks.into_iter().map(|(chunk, props)| async move {
            let result = self.graph.fetch_entities(&chunk, props).await;
            (chunk, result)
        }))
        .buffer_unordered(width.max(1))
        .collect()
        .await;

        let mut outcome = WaveOutcome::default();
        for (chunk, result) in results {
            match result {
                Ok(entities) => outcome.entities.extend(entities),
                Err(e) => {
                    outcome.failed_batches += 1;
                    tracing::warn!(
                        "Wikidata batch of {} ids starting at {} failed: {}",
                        chunk.len(),
                        chunk.first().map(Qid::as_str).unwrap_or_default(),
                        e
                    );
                }
            }
        }
        outcome
    }
}

/// `OrganisationId` to Wikidata id, first occurrence wins.
fn collect_targets(entities: &[RawRecord]) -> BTreeMap<String, Qid> {
    let mut targets = BTreeMap::new();
    for entity in entities {
        let (Some(org_id), Some(qid)) = (entity.organisation_id(), entity.wikidata_id()) else {
            continue;
        };
        match targets.get(&org_id) {
            None => {
                targets.insert(org_id, qid);
            }
            Some(existing) if *existing != qid => {
                tracing::warn!(
                    "Organization {} carries conflicting Wikidata ids {} and {}; keeping {}",
                    org_id,
                    existing,
                    qid,
                    existing
                );
            }
            Some(_) => {}
        }
    }
    targets
}

/// Chairperson claims without an end time, in claim order.
pub fn current_principal_claims(entity: &GraphEntity) -> impl Iterator<Item = &Claim> {
    entity
        .claims(PRINCIPAL_PROPERTY)
        .iter()
        .filter(|claim| !claim.has_qualifier(END_TIME_QUALIFIER))
}

fn entity_references(entity: &GraphEntity) -> EntityReferences {
    let principal = current_principal_claims(entity)
        .filter_map(Claim::entity_id)
        .collect();
    let organizational = ORGANIZATIONAL_PROPERTIES
        .iter()
        .flat_map(|property| entity.referenced_ids(property))
        .collect();
    EntityReferences {
        principal,
        organizational,
    }
}

fn detail_references(principal: &GraphEntity) -> Vec<Qid> {
    PRINCIPAL_DETAIL_PROPERTIES
        .iter()
        .flat_map(|property| principal.referenced_ids(property))
        .collect()
}

fn without_known(ids: &BTreeSet<Qid>, known: &HashMap<Qid, GraphEntity>) -> BTreeSet<Qid> {
    ids.iter().filter(|qid| !known.contains_key(*qid)).cloned().collect()
}

fn label_view(entity: &GraphEntity) -> GraphEntity {
    GraphEntity {
        id: entity.id.clone(),
        labels: entity.labels.clone(),
        descriptions: entity.descriptions.clone(),
        claims: None,
        sitelinks: None,
    }
}

fn assemble_references(
    refs: &EntityReferences,
    known: &HashMap<Qid, GraphEntity>,
) -> BTreeMap<Qid, GraphEntity> {
    let mut referenced = BTreeMap::new();

    for qid in &refs.organizational {
        if let Some(entity) = known.get(qid) {
            referenced.insert(qid.clone(), label_view(entity));
        }
    }

    for qid in &refs.principal {
        let Some(principal) = known.get(qid) else {
            continue;
        };
        for detail in detail_references(principal) {
            if let Some(entity) = known.get(&detail) {
                referenced.entry(detail).or_insert_with(|| label_view(entity));
            }
        }
        referenced.insert(qid.clone(), principal.clone());
    }

    referenced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wikidata::client::{GraphError, GraphResult};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct FakeState {
        calls: Mutex<Vec<(Vec<Qid>, PropertySet)>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    struct FakeGraph {
        entities: HashMap<Qid, GraphEntity>,
        failing: BTreeSet<Qid>,
        batch_size: usize,
        state: Arc<FakeState>,
    }

    impl FakeGraph {
        fn new(entities: Vec<(&str, serde_json::Value)>) -> (Self, Arc<FakeState>) {
            let state = Arc::new(FakeState::default());
            let graph = Self {
                entities: entities
                    .into_iter()
                    .map(|(id, value)| (qid(id), serde_json::from_value(value).unwrap()))
                    .collect(),
                failing: BTreeSet::new(),
                batch_size: 50,
                state: Arc::clone(&state),
            };
            (graph, state)
        }

        fn failing_on(mut self, id: &str) -> Self {
            self.failing.insert(qid(id));
            self
        }
    }

    #[async_trait::async_trait]
    impl KnowledgeGraph for FakeGraph {
        async fn fetch_entities(
            &self,
            ids: &[Qid],
            props: PropertySet,
        ) -> GraphResult<HashMap<Qid, GraphEntity>> {
            let now = self.state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.state.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.state.calls.lock().unwrap().push((ids.to_vec(), props));
            tokio::task::yield_now().await;
            self.state.in_flight.fetch_sub(1, Ordering::SeqCst);

            if ids.iter().any(|id| self.failing.contains(id)) {
                return Err(GraphError::Api {
                    code: "fake".into(),
                    info: "scripted failure".into(),
                });
            }
            Ok(ids
                .iter()
                .filter_map(|id| {
                    self.entities.get(id).map(|entity| {
                        let mut entity = entity.clone();
                        if props == PropertySet::LabelsOnly {
                            entity.claims = None;
                            entity.sitelinks = None;
                        }
                        (id.clone(), entity)
                    })
                })
                .collect())
        }

        fn batch_size(&self) -> usize {
            self.batch_size
        }
    }

    fn qid(id: &str) -> Qid {
        Qid::parse(id).unwrap()
    }

    fn item_claim(property: &str, target: &str) -> serde_json::Value {
        json!({
            "mainsnak": {
                "snaktype": "value",
                "property": property,
                "datavalue": {"value": {"entity-type": "item", "id": target}, "type": "wikibase-entityid"}
            }
        })
    }

    fn org(id: i64, wikidata: &str) -> RawRecord {
        RawRecord::from(json!({"OrganisationId": id, "Organisation": format!("Org {id}"), "WikidataId": wikidata}))
    }

    fn labelled(label: &str) -> serde_json::Value {
        json!({"labels": {"de": {"language": "de", "value": label}}})
    }

    fn calls_for(state: &FakeState, id: &str) -> usize {
        let target = qid(id);
        state
            .calls
            .lock()
            .unwrap()
            .iter()
            .map(|(ids, _)| ids.iter().filter(|q| **q == target).count())
            .sum()
    }

    fn shared_chair_graph() -> (FakeGraph, Arc<FakeState>) {
        FakeGraph::new(vec![
            ("Q1", json!({
                "labels": {"de": {"value": "Amt A"}},
                "claims": {"P488": [item_claim("P488", "Q100")], "P749": [item_claim("P749", "Q50")]}
            })),
            ("Q2", json!({
                "labels": {"de": {"value": "Amt B"}},
                "claims": {"P488": [item_claim("P488", "Q100")]}
            })),
            ("Q100", json!({
                "labels": {"de": {"value": "Erika Beispiel"}},
                "claims": {"P102": [item_claim("P102", "Q200")], "P21": [item_claim("P21", "Q300")]}
            })),
            ("Q50", labelled("Bundesministerium")),
            ("Q200", labelled("Partei")),
            ("Q300", labelled("weiblich")),
        ])
    }

    #[tokio::test]
    async fn test_shared_principal_is_fetched_once() {
        let (graph, state) = shared_chair_graph();
        let resolver = ReferenceResolver::new(Box::new(graph));

        let result = resolver.resolve(&[org(1, "Q1"), org(2, "Q2")]).await;

        assert_eq!(result.bundles.len(), 2);
        assert_eq!(calls_for(&state, "Q100"), 1);
        assert_eq!(calls_for(&state, "Q200"), 1);

        let a = &result.bundles["1"];
        let b = &result.bundles["2"];
        assert_eq!(a.referenced(&qid("Q100")), b.referenced(&qid("Q100")));
        assert!(a.referenced(&qid("Q100")).unwrap().claims.is_some());
        assert!(a.referenced(&qid("Q200")).is_some());
        assert!(b.referenced(&qid("Q300")).is_some());
        assert!(a.referenced(&qid("Q50")).is_some());
        assert!(b.referenced(&qid("Q50")).is_none());
        assert_eq!(result.stats.principal_references, 1);
        assert_eq!(result.stats.detail_references, 2);
    }

    #[tokio::test]
    async fn test_waves_use_expected_property_sets() {
        let (graph, state) = shared_chair_graph();
        let resolver = ReferenceResolver::new(Box::new(graph));

        let _ = resolver.resolve(&[org(1, "Q1"), org(2, "Q2")]).await;

        let calls = state.calls.lock().unwrap().clone();
        let props_of = |id: &str| {
            calls
                .iter()
                .find(|(ids, _)| ids.contains(&qid(id)))
                .map(|(_, props)| *props)
        };
        assert_eq!(props_of("Q1"), Some(PropertySet::Full));
        assert_eq!(props_of("Q100"), Some(PropertySet::Full));
        assert_eq!(props_of("Q50"), Some(PropertySet::LabelsOnly));
        assert_eq!(props_of("Q300"), Some(PropertySet::LabelsOnly));

        let own_calls = calls.iter().filter(|(ids, _)| ids.len() == 1 && (ids[0] == qid("Q1") || ids[0] == qid("Q2")));
        assert_eq!(own_calls.count(), 2);
    }

    #[tokio::test]
    async fn test_failed_own_fetch_only_drops_that_entity() {
        let (graph, _) = shared_chair_graph();
        let resolver = ReferenceResolver::new(Box::new(graph.failing_on("Q1")));

        let result = resolver.resolve(&[org(1, "Q1"), org(2, "Q2")]).await;

        assert!(!result.bundles.contains_key("1"));
        assert!(result.bundles.contains_key("2"));
        assert_eq!(result.stats.failed_batches, 1);
        assert_eq!(result.stats.enriched, 1);
    }

    #[tokio::test]
    async fn test_failed_reference_batch_keeps_bundle() {
        let (graph, _) = shared_chair_graph();
        let resolver = ReferenceResolver::new(Box::new(graph.failing_on("Q100")));

        let result = resolver.resolve(&[org(1, "Q1")]).await;

        let bundle = &result.bundles["1"];
        assert_eq!(bundle.data.label("de"), Some("Amt A"));
        assert!(bundle.referenced(&qid("Q100")).is_none());
        assert!(bundle.referenced(&qid("Q50")).is_some());
    }

    #[tokio::test]
    async fn test_past_chairperson_is_not_principal() {
        let mut ended = item_claim("P488", "Q101");
        ended["qualifiers"] = json!({"P582": [{"datavalue": {"value": {"time": "+2020-01-01T00:00:00Z"}}}]});
        let (graph, state) = FakeGraph::new(vec![
            ("Q1", json!({"claims": {"P488": [ended, item_claim("P488", "Q102")]}})),
            ("Q101", labelled("Alt")),
            ("Q102", labelled("Neu")),
        ]);
        let resolver = ReferenceResolver::new(Box::new(graph));

        let result = resolver.resolve(&[org(1, "Q1")]).await;

        assert_eq!(calls_for(&state, "Q101"), 0);
        let bundle = &result.bundles["1"];
        assert!(bundle.referenced(&qid("Q102")).is_some());
        assert!(bundle.referenced(&qid("Q101")).is_none());
    }

    #[tokio::test]
    async fn test_entities_without_ids_are_skipped() {
        let (graph, state) = FakeGraph::new(vec![("Q1", labelled("Amt"))]);
        let resolver = ReferenceResolver::new(Box::new(graph));
        let entities = vec![
            RawRecord::from(json!({"OrganisationId": 1})),
            RawRecord::from(json!({"WikidataId": "Q1"})),
        ];

        let result = resolver.resolve(&entities).await;

        assert!(result.bundles.is_empty());
        assert_eq!(result.stats.requested, 0);
        assert!(state.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_entity_without_claims_yields_empty_references() {
        let (graph, _) = FakeGraph::new(vec![("Q1", labelled("Amt"))]);
        let resolver = ReferenceResolver::new(Box::new(graph));

        let result = resolver.resolve(&[org(1, "Q1")]).await;

        assert!(result.bundles["1"].referenced_entities.is_empty());
    }

    #[tokio::test]
    async fn test_location_entries_share_main_bundle() {
        let (graph, state) = FakeGraph::new(vec![("Q1", labelled("Amt"))]);
        let resolver = ReferenceResolver::new(Box::new(graph));
        let location = RawRecord::from(json!({"OrganisationId": 1, "LiegenschaftsId": "DIENSTORT_2_1", "WikidataId": "Q1"}));

        let result = resolver.resolve(&[org(1, "Q1"), location]).await;

        assert_eq!(result.bundles.len(), 1);
        assert_eq!(calls_for(&state, "Q1"), 1);
    }

    #[tokio::test]
    async fn test_large_reference_sets_are_chunked() {
        let claims: Vec<_> = (1000..1120)
            .map(|n| item_claim("P527", &format!("Q{n}")))
            .collect();
        let mut entities = vec![("Q1", json!({"claims": {"P527": claims}}))];
        let labels: Vec<(String, serde_json::Value)> = (1000..1120)
            .map(|n| (format!("Q{n}"), labelled("Teil")))
            .collect();
        entities.extend(labels.iter().map(|(id, value)| (id.as_str(), value.clone())));
        let (graph, state) = FakeGraph::new(entities);
        let resolver = ReferenceResolver::new(Box::new(graph));

        let result = resolver.resolve(&[org(1, "Q1")]).await;

        assert_eq!(result.bundles["1"].referenced_entities.len(), 120);
        let calls = state.calls.lock().unwrap();
        let label_calls: Vec<_> = calls
            .iter()
            .filter(|(_, props)| *props == PropertySet::LabelsOnly)
            .collect();
        assert_eq!(label_calls.len(), 3);
        assert!(label_calls.iter().all(|(ids, _)| ids.len() <= 50));
    }

    #[tokio::test]
    async fn test_unbounded_wave_fans_out_fully() {
        let ids: Vec<String> = (1..=6).map(|n| format!("Q{n}")).collect();
        let (graph, state) = FakeGraph::new(ids.iter().map(|id| (id.as_str(), labelled("Amt"))).collect());
        let resolver = ReferenceResolver::new(Box::new(graph));
        let orgs: Vec<_> = ids.iter().zip(1..).map(|(id, n)| org(n, id)).collect();

        let result = resolver.resolve(&orgs).await;

        assert_eq!(result.bundles.len(), 6);
        assert_eq!(state.max_in_flight.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_concurrency_cap_is_respected() {
        let ids: Vec<String> = (1..=6).map(|n| format!("Q{n}")).collect();
        let (graph, state) = FakeGraph::new(ids.iter().map(|id| (id.as_str(), labelled("Amt"))).collect());
        let resolver = ReferenceResolver::new(Box::new(graph)).with_max_concurrent_requests(2);
        let orgs: Vec<_> = ids.iter().zip(1..).map(|(id, n)| org(n, id)).collect();

        let result = resolver.resolve(&orgs).await;

        assert_eq!(result.bundles.len(), 6);
        assert!(state.max_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_concurrency_cap_spans_principal_and_organizational_sets() {
        let (mut graph, state) = FakeGraph::new(vec![
            ("Q1", json!({
                "claims": {
                    "P488": [item_claim("P488", "Q100"), item_claim("P488", "Q101")],
                    "P749": [item_claim("P749", "Q50"), item_claim("P749", "Q51")]
                }
            })),
            ("Q100", labelled("Erika Beispiel")),
            ("Q101", labelled("Max Muster")),
            ("Q50", labelled("Bundesministerium")),
            ("Q51", labelled("Bundesamt")),
        ]);
        graph.batch_size = 1;
        let resolver = ReferenceResolver::new(Box::new(graph)).with_max_concurrent_requests(1);

        let result = resolver.resolve(&[org(1, "Q1")]).await;

        assert_eq!(result.bundles["1"].referenced_entities.len(), 4);
        assert_eq!(state.calls.lock().unwrap().len(), 5);
        assert_eq!(state.max_in_flight.load(Ordering::SeqCst), 1);
    }
}
