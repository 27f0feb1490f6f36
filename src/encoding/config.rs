//! Per-model encoding configuration: vocabularies and feature roles.

use crate::error::{DpeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Wall insulation quality, worst to best.
pub const INSULATION_LEVELS: [&str; 4] = ["Insuffisante", "Moyenne", "bonne", "très bonne"];

/// Construction periods, oldest first.
pub const CONSTRUCTION_PERIODS: [&str; 10] = [
    "avant 1948",
    "1948-1974",
    "1975-1977",
    "1978-1982",
    "1983-1988",
    "1989-2000",
    "2001-2005",
    "2006-2012",
    "2013-2021",
    "après 2021",
];

/// Building size categories, smallest first.
pub const BUILDING_CATEGORIES: [&str; 4] = [
    "Maison(Unitaire ou 2 à 3 logements)",
    "Petit Collectif(4 à 9 logements)",
    "Moyen Collectif(10 à 30 logements)",
    "Grand Collectif(> 30 logements)",
];

/// Main energy carriers.
pub const ENERGY_TYPES: [&str; 7] = [
    "Gaz naturel",
    "Électricité",
    "Réseau de chauffage urbain",
    "Bois et biomasse",
    "Fioul",
    "Gaz (GPL/Propane/Butane)",
    "Charbon",
];

/// New vs. existing dwelling.
pub const DWELLING_AGES: [&str; 2] = ["Neuf", "Ancien"];

/// Building types known to the consumption model.
pub const BUILDING_TYPES: [&str; 2] = ["maison", "immeuble"];

/// An ordered label list. The position of a label is its code, so the
/// order must match the one used at training time.
///
/// # Examples
///
/// ```
/// use dpe_predict::encoding::Vocabulary;
///
/// let vocab = Vocabulary::new(["Insuffisante", "Moyenne", "bonne", "très bonne"]);
/// assert_eq!(vocab.encode("bonne"), Some(2));
/// assert_eq!(vocab.encode(" Moyenne "), Some(1));
/// assert_eq!(vocab.encode("excellente"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vocabulary {
    labels: Vec<String>,
}

impl Vocabulary {
    /// Builds a vocabulary from labels in code order.
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// Code of `value` (trimmed, case-sensitive), `None` if unknown.
    #[must_use]
    pub fn encode(&self, value: &str) -> Option<usize> {
        let value = value.trim();
        self.labels.iter().position(|label| label == value)
    }

    /// Label for a code.
    #[must_use]
    pub fn label(&self, code: usize) -> Option<&str> {
        self.labels.get(code).map(String::as_str)
    }

    /// All labels in code order.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// True if there are no labels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// How a raw attribute turns into model columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum FeatureRole {
    /// Copied as a number into a column named after the feature.
    Numeric {
        /// Reject the record when the value is missing.
        #[serde(default)]
        required: bool,
        /// Reject non-integral values.
        #[serde(default)]
        integer: bool,
    },
    /// Label → position in the vocabulary, one column named after the feature.
    Ordinal {
        /// Ordered labels
        vocabulary: Vocabulary,
    },
    /// Label → indicator column `{feature}_{label}` set to 1.
    OneHot {
        /// Accepted labels
        vocabulary: Vocabulary,
    },
    /// A single 0/1 column, 1 when the label equals `when`.
    Flag {
        /// Output column name
        column: String,
        /// Label that sets the flag
        when: String,
        /// Accepted labels
        vocabulary: Vocabulary,
    },
}

/// One input attribute and its encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    /// Attribute name in the request record
    pub name: String,
    /// Encoding applied to it
    #[serde(flatten)]
    pub role: FeatureRole,
}

impl FeatureSpec {
    /// Optional numeric feature.
    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: FeatureRole::Numeric {
                required: false,
                integer: false,
            },
        }
    }

    /// Required integer feature.
    pub fn required_integer(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: FeatureRole::Numeric {
                required: true,
                integer: true,
            },
        }
    }

    /// Ordinal feature over `labels`.
    pub fn ordinal<S: Into<String>>(name: impl Into<String>, labels: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            role: FeatureRole::Ordinal {
                vocabulary: Vocabulary::new(labels),
            },
        }
    }

    /// One-hot feature over `labels`.
    pub fn one_hot<S: Into<String>>(name: impl Into<String>, labels: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            role: FeatureRole::OneHot {
                vocabulary: Vocabulary::new(labels),
            },
        }
    }

    /// Boolean flag feature.
    pub fn flag<S: Into<String>>(
        name: impl Into<String>,
        column: impl Into<String>,
        when: impl Into<String>,
        labels: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            name: name.into(),
            role: FeatureRole::Flag {
                column: column.into(),
                when: when.into(),
                vocabulary: Vocabulary::new(labels),
            },
        }
    }
}

/// What to do with a categorical value outside the vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownPolicy {
    /// Fail with `UnrecognizedCategory`.
    #[default]
    Reject,
    /// Ordinals encode as -1, one-hot and flag features set no column.
    Sentinel,
}

impl std::str::FromStr for UnknownPolicy {
    type Err = DpeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "reject" => Ok(Self::Reject),
            "sentinel" => Ok(Self::Sentinel),
            other => Err(DpeError::invalid_input(
                "unknown_policy",
                format!("expected 'reject' or 'sentinel', got '{other}'"),
            )),
        }
    }
}

/// Value used for an absent optional numeric feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingNumeric {
    /// Leave the column to the schema's zero fill.
    #[default]
    Zero,
    /// Emit `NaN` so a downstream imputer fills it.
    Nan,
}

/// Encoding configuration for one model.
///
/// The two built-in configurations match how the shipped models were
/// trained; a JSON file with the same shape can replace either one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Used in logs only
    pub name: String,
    /// Input attributes, in encoding order
    pub features: Vec<FeatureSpec>,
    /// Out-of-vocabulary handling
    #[serde(default)]
    pub unknown_policy: UnknownPolicy,
    /// Absent optional numerics
    #[serde(default)]
    pub missing_numeric: MissingNumeric,
}

impl EncoderConfig {
    /// Encoding used by the DPE class model.
    #[must_use]
    pub fn classifier() -> Self {
        Self {
            name: "classifier".into(),
            features: vec![
                FeatureSpec::numeric("surface_habitable_logement"),
                FeatureSpec::numeric("hauteur_sous_plafond"),
                FeatureSpec::ordinal("qualite_isolation_murs", INSULATION_LEVELS),
                FeatureSpec::ordinal("nombre_appartement_cat", BUILDING_CATEGORIES),
                FeatureSpec::one_hot("periode_construction", CONSTRUCTION_PERIODS),
                FeatureSpec::one_hot("type_energie_n1", ENERGY_TYPES),
                FeatureSpec::one_hot("type_energie_principale_chauffage", ENERGY_TYPES),
                FeatureSpec::one_hot("logement", DWELLING_AGES),
            ],
            unknown_policy: UnknownPolicy::Reject,
            missing_numeric: MissingNumeric::Zero,
        }
    }

    /// Encoding used by the consumption model.
    #[must_use]
    pub fn regressor() -> Self {
        Self {
            name: "regressor".into(),
            features: vec![
                FeatureSpec::numeric("hauteur_sous_plafond"),
                FeatureSpec::numeric("surface_habitable_logement"),
                FeatureSpec::ordinal("qualite_isolation_murs", INSULATION_LEVELS),
                FeatureSpec::required_integer("etiquette_dpe"),
                FeatureSpec::ordinal("periode_construction", CONSTRUCTION_PERIODS),
                FeatureSpec::ordinal("nombre_appartement_cat", BUILDING_CATEGORIES),
                FeatureSpec::one_hot("type_batiment", BUILDING_TYPES),
                FeatureSpec::one_hot("type_energie_principale_chauffage", ENERGY_TYPES),
                FeatureSpec::one_hot("type_energie_n1", ENERGY_TYPES),
                FeatureSpec::flag("logement", "logement_neuf", "Neuf", DWELLING_AGES),
            ],
            unknown_policy: UnknownPolicy::Reject,
            missing_numeric: MissingNumeric::Nan,
        }
    }

    /// Overrides the unknown-category policy.
    #[must_use]
    pub fn with_unknown_policy(mut self, policy: UnknownPolicy) -> Self {
        self.unknown_policy = policy;
        self
    }

    /// Reads a configuration file and validates it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unreadable, unparsable, or invalid.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: Self = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the configuration as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Checks for duplicate features, empty or duplicated vocabularies, and
    /// flags whose trigger label is not in their vocabulary.
    ///
    /// # Errors
    ///
    /// Returns [`DpeError::FormatError`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for spec in &self.features {
            if !names.insert(spec.name.as_str()) {
                return Err(DpeError::format(format!(
                    "{} encoder: feature '{}' declared twice",
                    self.name, spec.name
                )));
            }

            let vocabulary = match &spec.role {
                FeatureRole::Numeric { .. } => continue,
                FeatureRole::Ordinal { vocabulary } | FeatureRole::OneHot { vocabulary } => {
                    vocabulary
                }
                FeatureRole::Flag {
                    when, vocabulary, ..
                } => {
                    if vocabulary.encode(when).is_none() {
                        return Err(DpeError::format(format!(
                            "{} encoder: flag '{}' triggers on '{when}', which is not in its vocabulary",
                            self.name, spec.name
                        )));
                    }
                    vocabulary
                }
            };

            if vocabulary.is_empty() {
                return Err(DpeError::format(format!(
                    "{} encoder: feature '{}' has an empty vocabulary",
                    self.name, spec.name
                )));
            }
            let mut seen = HashSet::new();
            if let Some(dup) = vocabulary.labels().iter().find(|l| !seen.insert(l.trim())) {
                return Err(DpeError::format(format!(
                    "{} encoder: feature '{}' lists '{dup}' twice",
                    self.name, spec.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_vocabulary_order_is_code() {
        let vocab = Vocabulary::new(CONSTRUCTION_PERIODS);
        assert_eq!(vocab.encode("avant 1948"), Some(0));
        assert_eq!(vocab.encode("après 2021"), Some(9));
        assert_eq!(vocab.label(5), Some("1989-2000"));
        assert_eq!(vocab.len(), 10);
    }

    #[test]
    fn test_vocabulary_is_case_sensitive() {
        let vocab = Vocabulary::new(INSULATION_LEVELS);
        assert_eq!(vocab.encode("bonne"), Some(2));
        assert_eq!(vocab.encode("Bonne"), None);
    }

    #[test]
    fn test_builtin_configs_are_valid() {
        EncoderConfig::classifier().validate().unwrap();
        EncoderConfig::regressor().validate().unwrap();
    }

    #[test]
    fn test_validate_duplicate_feature() {
        let mut config = EncoderConfig::classifier();
        config.features.push(FeatureSpec::numeric("hauteur_sous_plafond"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_duplicate_label() {
        let config = EncoderConfig {
            name: "t".into(),
            features: vec![FeatureSpec::ordinal("q", ["a", "b", "a "])],
            unknown_policy: UnknownPolicy::Reject,
            missing_numeric: MissingNumeric::Zero,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_flag_trigger_in_vocabulary() {
        let config = EncoderConfig {
            name: "t".into(),
            features: vec![FeatureSpec::flag("logement", "neuf", "New", DWELLING_AGES)],
            unknown_policy: UnknownPolicy::Reject,
            missing_numeric: MissingNumeric::Zero,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_policy_from_str() {
        assert_eq!("reject".parse::<UnknownPolicy>().unwrap(), UnknownPolicy::Reject);
        assert_eq!("sentinel".parse::<UnknownPolicy>().unwrap(), UnknownPolicy::Sentinel);
        assert!("ignore".parse::<UnknownPolicy>().is_err());
    }

    #[test]
    fn test_config_json_shape() {
        let json = serde_json::to_value(EncoderConfig::regressor()).unwrap();
        assert_eq!(json["missing_numeric"], "nan");
        assert_eq!(json["features"][3]["name"], "etiquette_dpe");
        assert_eq!(json["features"][3]["role"], "numeric");
        assert_eq!(json["features"][3]["required"], true);
        assert_eq!(json["features"][9]["role"], "flag");
        assert_eq!(json["features"][9]["column"], "logement_neuf");
    }

    #[test]
    fn test_config_save_load() {
        let config = EncoderConfig::classifier().with_unknown_policy(UnknownPolicy::Sentinel);
        let file = NamedTempFile::new().unwrap();
        config.save(file.path()).unwrap();
        assert_eq!(EncoderConfig::load(file.path()).unwrap(), config);
    }
}
