//! FILENAME: core/bom-hierarchy/src/record.rs
//! Raw rows of dimension and fact tables.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::value::FieldValue;

/// One raw row keyed by field name.
///
/// Serde-transparent: a JSON object deserializes straight into a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: FxHashMap<String, FieldValue>,
}

/// A row of a dimension table (code, optional label, optional `PATH`).
pub type DimensionRecord = Record;

/// A row of the fact table (dimension foreign keys plus numeric measures).
pub type FactRecord = Record;

impl Record {
    pub fn new() -> Self {
        Record::default()
    }

    /// Builder-style field setter.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// The normalized join key of a field, if it has one.
    pub fn key(&self, field: &str) -> Option<String> {
        self.fields.get(field).and_then(FieldValue::as_key)
    }

    /// The coerced numeric value of a field (missing fields are 0).
    pub fn number(&self, field: &str) -> f64 {
        self.fields.get(field).map_or(0.0, FieldValue::as_f64)
    }

    /// Whether any of the given measures holds a non-zero number.
    pub fn has_measure_data<S: AsRef<str>>(&self, measures: &[S]) -> bool {
        measures.iter().any(|m| self.number(m.as_ref()) != 0.0)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Record {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Drops fact rows whose measures are all null, zero or empty.
///
/// The ingestion layer normally does this before handing rows over; hosts
/// that feed unfiltered tables can call it themselves.
pub fn retain_measured<S: AsRef<str>>(records: Vec<FactRecord>, measures: &[S]) -> Vec<FactRecord> {
    let before = records.len();
    let kept: Vec<FactRecord> = records
        .into_iter()
        .filter(|r| r.has_measure_data(measures))
        .collect();
    if kept.len() != before {
        log::debug!(
            target: "hierarchy",
            "dropped unmeasured facts dropped={} kept={}",
            before - kept.len(),
            kept.len()
        );
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_from_json_object() {
        let record: Record =
            serde_json::from_str(r#"{"LE": "A", "COST_UNIT": 10, "QTY_UNIT": null}"#).unwrap();
        assert_eq!(record.key("LE"), Some("A".to_string()));
        assert_eq!(record.number("COST_UNIT"), 10.0);
        assert_eq!(record.number("QTY_UNIT"), 0.0);
        assert_eq!(record.number("MISSING"), 0.0);
        assert_eq!(record.len(), 3);
    }

    #[test]
    fn test_retain_measured() {
        let records = vec![
            Record::new().with("LE", "A").with("COST_UNIT", 0.0).with("QTY_UNIT", 2.0),
            Record::new().with("LE", "B").with("COST_UNIT", 0.0),
            Record::new().with("LE", "C").with("COST_UNIT", "").with("QTY_UNIT", FieldValue::Empty),
            Record::new().with("LE", "D").with("COST_UNIT", -3.0),
        ];

        let kept = retain_measured(records, &["COST_UNIT", "QTY_UNIT"]);
        let les: Vec<String> = kept.iter().filter_map(|r| r.key("LE")).collect();
        assert_eq!(les, vec!["A", "D"]);
    }
}
