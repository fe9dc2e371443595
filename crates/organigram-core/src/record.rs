use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::wikidata::Qid;

/// Field names used by the organigram table.
pub mod fields {
    pub const ORGANISATION: &str = "Organisation";
    pub const ORGANISATION_ID: &str = "OrganisationId";
    pub const ORGANISATION_DISPLAY: &str = "OrganisationDisplay";
    pub const ORGANISATION_KURZ: &str = "OrganisationKurz";
    pub const ORGANISATION_KURZ_INOFFIZIELL: &str = "OrganisationKurzInoffiziell";
    pub const RESSORT: &str = "Ressort";
    pub const KATEGORIE: &str = "Kategorie";
    pub const VERSTECKT: &str = "Versteckt";
    pub const IST_RESSORT: &str = "IstRessort";
    pub const IST_VERFASSUNGSORGAN: &str = "IstVerfassungsorgan";
    pub const LIEGENSCHAFT: &str = "Liegenschaft";
    pub const LIEGENSCHAFTS_ID: &str = "LiegenschaftsId";
    pub const WIKIDATA_ID: &str = "WikidataId";
    pub const WIKIDATA: &str = "Wikidata";

    /// Fields describing a physical location, copied into `locations` of a full record.
    pub const LOCATION_FIELDS: &[&str] = &[
        LIEGENSCHAFTS_ID,
        LIEGENSCHAFT,
        "Hauptadresse",
        "PLZ",
        "Ort",
        "Bundesland",
        "Land",
        "Breitengrad",
        "Längengrad",
        "Telefon",
        "Telefax",
        "E-Mail",
    ];
}

/// One row of the source table: field name to value, no schema enforced.
///
/// Records are treated as values. The `with`/`without` builders consume the
/// record and return the changed copy, so a record shared elsewhere is never
/// edited in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(Map<String, Value>);

impl RawRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn from_fields(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    #[must_use]
    pub const fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    #[must_use]
    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Non-blank string value of a field.
    #[must_use]
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn without(mut self, key: &str) -> Self {
        self.0.remove(key);
        self
    }

    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.text(fields::ORGANISATION_DISPLAY)
    }

    #[must_use]
    pub fn organisation(&self) -> Option<&str> {
        self.text(fields::ORGANISATION)
    }

    #[must_use]
    pub fn short_code(&self) -> Option<&str> {
        self.text(fields::ORGANISATION_KURZ)
    }

    #[must_use]
    pub fn ressort(&self) -> Option<&str> {
        self.text(fields::RESSORT)
    }

    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.text(fields::KATEGORIE)
    }

    #[must_use]
    pub fn location_id(&self) -> Option<&str> {
        self.text(fields::LIEGENSCHAFTS_ID)
    }

    /// Raw stable identifier value, number or string as the source supplied it.
    #[must_use]
    pub fn organisation_id_value(&self) -> Option<&Value> {
        match self.0.get(fields::ORGANISATION_ID) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(value) => Some(value),
        }
    }

    /// Stable identifier rendered as a string key.
    #[must_use]
    pub fn organisation_id(&self) -> Option<String> {
        match self.organisation_id_value()? {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_hidden(&self) -> bool {
        match self.0.get(fields::VERSTECKT) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true") || s == "1",
            Some(Value::Number(n)) => n.as_i64() == Some(1),
            _ => false,
        }
    }

    /// Knowledge-graph id, taken from `WikidataId` or `Wikidata`.
    #[must_use]
    pub fn wikidata_id(&self) -> Option<Qid> {
        self.text(fields::WIKIDATA_ID)
            .or_else(|| self.text(fields::WIKIDATA))
            .and_then(Qid::parse)
    }
}

impl From<Map<String, Value>> for RawRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Build a record from a JSON literal; anything but an object yields an empty record.
impl From<Value> for RawRecord {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_organisation_id_accepts_numbers_and_strings() {
        let numeric = RawRecord::from(json!({"OrganisationId": 17}));
        let text = RawRecord::from(json!({"OrganisationId": " 17 "}));
        let blank = RawRecord::from(json!({"OrganisationId": ""}));

        assert_eq!(numeric.organisation_id().as_deref(), Some("17"));
        assert_eq!(text.organisation_id().as_deref(), Some("17"));
        assert_eq!(blank.organisation_id(), None);
    }

    #[test]
    fn test_text_skips_blank_values() {
        let record = RawRecord::from(json!({"Ressort": "  ", "Kategorie": "Oberste Bundesbehörde"}));

        assert_eq!(record.ressort(), None);
        assert_eq!(record.category(), Some("Oberste Bundesbehörde"));
    }

    #[test]
    fn test_with_and_without_return_changed_copy() {
        let original = RawRecord::from(json!({"Organisation": "Amt X"}));
        let changed = original.clone().without("Organisation").with("Ressort", "BMI");

        assert_eq!(original.organisation(), Some("Amt X"));
        assert_eq!(changed.organisation(), None);
        assert_eq!(changed.ressort(), Some("BMI"));
    }

    #[test]
    fn test_wikidata_id_from_either_field() {
        let bare = RawRecord::from(json!({"WikidataId": "Q42"}));
        let url = RawRecord::from(json!({"Wikidata": "https://www.wikidata.org/wiki/Q64"}));
        let junk = RawRecord::from(json!({"WikidataId": "n/a"}));

        assert_eq!(bare.wikidata_id().map(|q| q.to_string()).as_deref(), Some("Q42"));
        assert_eq!(url.wikidata_id().map(|q| q.to_string()).as_deref(), Some("Q64"));
        assert!(junk.wikidata_id().is_none());
    }

    #[test]
    fn test_hidden_flag() {
        assert!(RawRecord::from(json!({"Versteckt": true})).is_hidden());
        assert!(!RawRecord::from(json!({"Versteckt": false})).is_hidden());
        assert!(!RawRecord::new().is_hidden());
    }
}
