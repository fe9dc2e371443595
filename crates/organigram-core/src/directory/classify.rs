use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::record::{fields, RawRecord};

/// Allow-lists and labels driving [`classify`].
///
/// Defaults describe the German federal government; tests and alternative
/// directories inject their own sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    /// Label shared by constitutional organs and their supporting bodies.
    pub constitutional_label: String,
    /// Short codes of constitutional organs in the strict sense.
    pub constitutional_codes: Vec<String>,
    /// Short codes of supporting bodies filed under the constitutional label.
    pub supporting_codes: Vec<String>,
    /// Organisation names of supporting bodies.
    pub supporting_names: Vec<String>,
    /// Short codes that become their own label when none is set.
    pub self_labelled_codes: Vec<String>,
    /// `Kategorie` value of supreme federal authorities.
    pub supreme_authority_category: String,
    /// Maximum characters of a name used as label.
    pub max_label_chars: usize,
    pub synthetic_label_prefix: String,
    pub fallback_label: String,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            constitutional_label: "Verfassungsorgane".to_string(),
            constitutional_codes: ["BPr", "BT", "BR", "BVerfG", "BRH"]
                .map(String::from)
                .to_vec(),
            supporting_codes: ["WB", "TAB"].map(String::from).to_vec(),
            supporting_names: [
                "Verwaltung des Deutschen Bundestages",
                "Sekretariat des Bundesrates",
            ]
            .map(String::from)
            .to_vec(),
            self_labelled_codes: vec!["BKM".to_string()],
            supreme_authority_category: "Oberste Bundesbehörde".to_string(),
            max_label_chars: 50,
            synthetic_label_prefix: "ORG_".to_string(),
            fallback_label: "Sonstige".to_string(),
        }
    }
}

impl ClassificationConfig {
    /// Read a JSON config; missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.constitutional_label.trim().is_empty() {
            return Err(Error::InvalidClassification(
                "constitutional_label must not be empty".into(),
            ));
        }
        if self.fallback_label.trim().is_empty() {
            return Err(Error::InvalidClassification(
                "fallback_label must not be empty".into(),
            ));
        }
        if self.max_label_chars == 0 {
            return Err(Error::InvalidClassification(
                "max_label_chars must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn listed(list: &[String], value: Option<&str>) -> bool {
    value.is_some_and(|v| list.iter().any(|item| item == v))
}

/// Which rule assigned a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationRule {
    ConstitutionalOrgan,
    SupportingBody,
    SelfLabelled,
    SupremeAuthority,
    Fallback,
    /// Label was already present and no overriding rule applied.
    Existing,
}

/// Label every entity, returning the relabelled copies.
#[must_use]
pub fn classify(entities: Vec<RawRecord>, config: &ClassificationConfig) -> Vec<RawRecord> {
    entities
        .into_iter()
        .map(|entity| classify_entity(entity, config).0)
        .collect()
}

/// Apply the rule chain to one entity.
///
/// Allow-list rules overwrite any existing label; the remaining rules only
/// fill an empty one.
#[must_use]
pub fn classify_entity(
    entity: RawRecord,
    config: &ClassificationConfig,
) -> (RawRecord, ClassificationRule) {
    let code = entity.short_code();

    if listed(&config.constitutional_codes, code) {
        let entity = entity
            .with(fields::RESSORT, config.constitutional_label.as_str())
            .with(fields::IST_VERFASSUNGSORGAN, true);
        return (entity, ClassificationRule::ConstitutionalOrgan);
    }

    if listed(&config.supporting_codes, code)
        || listed(&config.supporting_names, entity.organisation())
    {
        let entity = entity
            .with(fields::RESSORT, config.constitutional_label.as_str())
            .with(fields::IST_VERFASSUNGSORGAN, false);
        return (entity, ClassificationRule::SupportingBody);
    }

    if entity.ressort().is_some() {
        return (entity, ClassificationRule::Existing);
    }

    if let Some(code) = code.filter(|c| listed(&config.self_labelled_codes, Some(*c))) {
        let label = code.to_string();
        return (
            entity.with(fields::RESSORT, label),
            ClassificationRule::SelfLabelled,
        );
    }

    if entity.category() == Some(config.supreme_authority_category.as_str()) {
        let label = supreme_authority_label(&entity, config);
        return (
            entity.with(fields::RESSORT, label),
            ClassificationRule::SupremeAuthority,
        );
    }

    let label = config.fallback_label.clone();
    (entity.with(fields::RESSORT, label), ClassificationRule::Fallback)
}

fn supreme_authority_label(entity: &RawRecord, config: &ClassificationConfig) -> String {
    if let Some(code) = entity.short_code() {
        return code.trim().to_string();
    }
    if let Some(name) = entity.organisation() {
        return truncate_label(name, config.max_label_chars);
    }
    if let Some(id) = entity.organisation_id() {
        return format!("{}{id}", config.synthetic_label_prefix);
    }
    config.fallback_label.clone()
}

fn truncate_label(name: &str, max_chars: usize) -> String {
    let collapsed = name.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .chars()
        .take(max_chars)
        .collect::<String>()
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(value: serde_json::Value) -> (RawRecord, ClassificationRule) {
        classify_entity(RawRecord::from(value), &ClassificationConfig::default())
    }

    #[test]
    fn test_constitutional_organ_overrides_existing_label() {
        let (entity, rule) = run(json!({"OrganisationKurz": "BT", "Ressort": "BMI"}));

        assert_eq!(rule, ClassificationRule::ConstitutionalOrgan);
        assert_eq!(entity.ressort(), Some("Verfassungsorgane"));
        assert_eq!(entity.get(fields::IST_VERFASSUNGSORGAN), Some(&json!(true)));
    }

    #[test]
    fn test_supporting_body_by_code_and_by_name() {
        let (by_code, rule) = run(json!({"OrganisationKurz": "WB"}));
        assert_eq!(rule, ClassificationRule::SupportingBody);
        assert_eq!(by_code.ressort(), Some("Verfassungsorgane"));
        assert_eq!(by_code.get(fields::IST_VERFASSUNGSORGAN), Some(&json!(false)));

        let (by_name, rule) = run(json!({"Organisation": "Sekretariat des Bundesrates"}));
        assert_eq!(rule, ClassificationRule::SupportingBody);
        assert_eq!(by_name.ressort(), Some("Verfassungsorgane"));
    }

    #[test]
    fn test_existing_label_is_kept() {
        let input = json!({"OrganisationKurz": "BKA", "Ressort": "BMI", "Kategorie": "Oberste Bundesbehörde"});
        let (entity, rule) = run(input.clone());

        assert_eq!(rule, ClassificationRule::Existing);
        assert_eq!(entity, RawRecord::from(input));
    }

    #[test]
    fn test_self_labelled_fix_up() {
        let (entity, rule) = run(json!({"OrganisationKurz": "BKM", "Kategorie": "Oberste Bundesbehörde"}));

        assert_eq!(rule, ClassificationRule::SelfLabelled);
        assert_eq!(entity.ressort(), Some("BKM"));
    }

    #[test]
    fn test_supreme_authority_prefers_short_code() {
        let (entity, _) = run(json!({"Kategorie": "Oberste Bundesbehörde", "OrganisationKurz": "BfDI", "Organisation": "Bundesbeauftragte für den Datenschutz"}));

        assert_eq!(entity.ressort(), Some("BfDI"));
    }

    #[test]
    fn test_supreme_authority_uses_short_name() {
        let (entity, rule) = run(json!({"Kategorie": "Oberste Bundesbehörde", "Organisation": "Bundesbeauftragte für X"}));

        assert_eq!(rule, ClassificationRule::SupremeAuthority);
        assert_eq!(entity.ressort(), Some("Bundesbeauftragte für X"));
    }

    #[test]
    fn test_supreme_authority_truncates_long_name() {
        let name = "Beauftragte der Bundesregierung für Kultur und Medien und noch viel mehr";
        let (entity, _) = run(json!({"Kategorie": "Oberste Bundesbehörde", "Organisation": name}));

        let label = entity.ressort().unwrap_or_default();
        assert!(label.chars().count() <= 50);
        assert!(name.starts_with(label));
    }

    #[test]
    fn test_supreme_authority_synthetic_id() {
        let (entity, _) = run(json!({"Kategorie": "Oberste Bundesbehörde", "OrganisationId": "42"}));

        assert_eq!(entity.ressort(), Some("ORG_42"));
    }

    #[test]
    fn test_supreme_authority_without_anything() {
        let (entity, rule) = run(json!({"Kategorie": "Oberste Bundesbehörde"}));

        assert_eq!(rule, ClassificationRule::SupremeAuthority);
        assert_eq!(entity.ressort(), Some("Sonstige"));
    }

    #[test]
    fn test_unlabelled_entity_gets_fallback() {
        let (entity, rule) = run(json!({"Organisation": "Irgendein Amt"}));

        assert_eq!(rule, ClassificationRule::Fallback);
        assert_eq!(entity.ressort(), Some("Sonstige"));
    }

    #[test]
    fn test_injected_config_replaces_allow_lists() {
        let config = ClassificationConfig {
            constitutional_label: "Organs".into(),
            constitutional_codes: vec!["XYZ".into()],
            ..ClassificationConfig::default()
        };

        let (custom, _) = classify_entity(RawRecord::from(json!({"OrganisationKurz": "XYZ"})), &config);
        let (default_code, rule) =
            classify_entity(RawRecord::from(json!({"OrganisationKurz": "BT", "Ressort": "BMI"})), &config);

        assert_eq!(custom.ressort(), Some("Organs"));
        assert_eq!(rule, ClassificationRule::Existing);
        assert_eq!(default_code.ressort(), Some("BMI"));
    }

    #[test]
    fn test_every_entity_ends_up_labelled() {
        let entities = vec![
            RawRecord::from(json!({"LiegenschaftsId": "DIENSTORT_2_1"})),
            RawRecord::from(json!({"OrganisationKurz": "BR"})),
            RawRecord::new(),
        ];

        let labelled = classify(entities, &ClassificationConfig::default());

        assert!(labelled.iter().all(|e| e.ressort().is_some()));
    }

    #[test]
    fn test_config_from_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classification.json");
        std::fs::write(&path, r#"{"fallback_label": "Ohne Ressort"}"#).unwrap();

        let config = ClassificationConfig::from_file(&path).unwrap();

        assert_eq!(config.fallback_label, "Ohne Ressort");
        assert_eq!(config.constitutional_codes.len(), 5);
    }

    #[test]
    fn test_config_rejects_empty_fallback() {
        let config = ClassificationConfig {
            fallback_label: " ".into(),
            ..ClassificationConfig::default()
        };

        assert!(matches!(config.validate(), Err(Error::InvalidClassification(_))));
    }
}
