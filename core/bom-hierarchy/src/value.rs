//! FILENAME: core/bom-hierarchy/src/value.rs
//! Field values as they arrive from the ingestion layer.

use serde::{Deserialize, Serialize};

/// A single field of a dimension or fact row.
///
/// Deserialized untagged, so a JSON row such as
/// `{"LE": "A", "COST_UNIT": 10, "FLAG": null}` maps directly.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Boolean(bool),
}

impl FieldValue {
    /// Normalized join key for this value.
    ///
    /// Text is trimmed (blank text has no key), integral numbers print
    /// without a fractional part so `2024.0` and `"2024"` join.
    pub fn as_key(&self) -> Option<String> {
        match self {
            FieldValue::Empty => None,
            FieldValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            FieldValue::Number(n) => Some(number_key(*n)),
            FieldValue::Boolean(b) => Some(b.to_string()),
        }
    }

    /// Runs `f` on the join key without allocating for text values.
    pub fn with_key<R>(&self, f: impl FnOnce(&str) -> R) -> Option<R> {
        match self {
            FieldValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(f(trimmed))
                }
            }
            other => other.as_key().map(|k| f(&k)),
        }
    }

    /// Numeric coercion used by aggregation. Anything that does not yield a
    /// finite number counts as 0.
    pub fn as_f64(&self) -> f64 {
        let n = match self {
            FieldValue::Empty => 0.0,
            FieldValue::Number(n) => *n,
            FieldValue::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
            FieldValue::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
        };
        if n.is_finite() {
            n
        } else {
            0.0
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FieldValue::Empty)
    }
}

fn number_key(n: f64) -> String {
    // i64 keeps 15 significant digits exact; larger values fall back to float text
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Empty, Into::into)
    }
}
