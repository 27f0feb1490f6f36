//! Raw request records.

use crate::error::{DpeError, Result};
use serde_json::Value;
use std::collections::BTreeMap;

/// A single raw attribute value as submitted by a caller.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    /// JSON number (booleans are stored as 0/1)
    Number(f64),
    /// JSON string, kept verbatim
    Text(String),
}

impl From<f64> for FeatureValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<i64> for FeatureValue {
    fn from(v: i64) -> Self {
        Self::Number(v as f64)
    }
}

impl From<&str> for FeatureValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// Attribute name → raw value, one per request.
///
/// `null` entries are treated as absent. Unknown keys are kept but never
/// reach a model: the encoder only reads the features it is configured for.
///
/// # Examples
///
/// ```
/// use dpe_predict::encoding::FeatureRecord;
/// use serde_json::json;
///
/// let record = FeatureRecord::from_json(&json!({
///     "surface_habitable_logement": 80,
///     "type_energie_n1": "Gaz naturel ",
///     "hauteur_sous_plafond": null,
/// })).expect("object payload");
///
/// assert_eq!(record.number("surface_habitable_logement").expect("numeric"), Some(80.0));
/// assert_eq!(record.text("type_energie_n1").expect("string"), Some("Gaz naturel"));
/// assert_eq!(record.number("hauteur_sous_plafond").expect("absent"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureRecord {
    values: BTreeMap<String, FeatureValue>,
}

impl FeatureRecord {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON object into a record.
    ///
    /// # Errors
    ///
    /// Returns [`DpeError::InvalidInput`] if the payload is not an object or a
    /// field holds an array or object.
    pub fn from_json(payload: &Value) -> Result<Self> {
        let Value::Object(map) = payload else {
            return Err(DpeError::invalid_input(
                "<body>",
                format!("expected a JSON object, got {}", json_type(payload)),
            ));
        };

        let mut values = BTreeMap::new();
        for (key, value) in map {
            let parsed = match value {
                Value::Null => continue,
                Value::Bool(b) => FeatureValue::Number(f64::from(u8::from(*b))),
                Value::Number(n) => match n.as_f64() {
                    Some(f) => FeatureValue::Number(f),
                    None => return Err(DpeError::invalid_input(key, "number out of range")),
                },
                Value::String(s) => FeatureValue::Text(s.clone()),
                Value::Array(_) | Value::Object(_) => {
                    return Err(DpeError::invalid_input(
                        key,
                        format!("expected a number or a string, got {}", json_type(value)),
                    ))
                }
            };
            values.insert(key.clone(), parsed);
        }
        Ok(Self { values })
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FeatureValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts or replaces a value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FeatureValue>) {
        self.values.insert(key.into(), value.into());
    }

    /// Raw value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&FeatureValue> {
        self.values.get(key)
    }

    /// Numeric value for `key`; numeric strings are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`DpeError::InvalidInput`] if the value is a non-numeric string.
    pub fn number(&self, key: &str) -> Result<Option<f64>> {
        match self.values.get(key) {
            None => Ok(None),
            Some(FeatureValue::Number(n)) => Ok(Some(*n)),
            Some(FeatureValue::Text(s)) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Ok(None);
                }
                trimmed
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .map(Some)
                    .ok_or_else(|| DpeError::invalid_input(key, format!("expected a number, got '{s}'")))
            }
        }
    }

    /// Categorical value for `key`, trimmed. Blank strings count as absent.
    ///
    /// # Errors
    ///
    /// Returns [`DpeError::InvalidInput`] if the value is a number.
    pub fn text(&self, key: &str) -> Result<Option<&str>> {
        match self.values.get(key) {
            None => Ok(None),
            Some(FeatureValue::Text(s)) => {
                let trimmed = s.trim();
                Ok((!trimmed.is_empty()).then_some(trimmed))
            }
            Some(FeatureValue::Number(n)) => Err(DpeError::invalid_input(
                key,
                format!("expected a string, got number {n}"),
            )),
        }
    }

    /// Number of attributes present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if no attribute is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates attributes in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<FeatureValue>> FromIterator<(K, V)> for FeatureRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
