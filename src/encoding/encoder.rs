//! Record → named feature columns.

use super::config::{EncoderConfig, FeatureRole, MissingNumeric, UnknownPolicy, Vocabulary};
use super::record::FeatureRecord;
use crate::error::{DpeError, Result};

/// Named columns produced by the encoder, in encoding order.
///
/// Column names are what the training pipeline called them, so they can be
/// matched against a [`TrainingSchema`](super::TrainingSchema).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodedFeatures {
    columns: Vec<(String, f32)>,
}

impl EncodedFeatures {
    fn push(&mut self, name: impl Into<String>, value: f32) {
        self.columns.push((name.into(), value));
    }

    /// Value of a column, if it was produced.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f32> {
        self.columns
            .iter()
            .find(|(col, _)| col == name)
            .map(|(_, v)| *v)
    }

    /// Iterates `(column, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.columns.iter().map(|(c, v)| (c.as_str(), *v))
    }

    /// Number of produced columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// True if nothing was produced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Applies an [`EncoderConfig`] to request records.
///
/// # Examples
///
/// ```
/// use dpe_predict::encoding::{EncoderConfig, FeatureEncoder, FeatureRecord};
///
/// let encoder = FeatureEncoder::new(EncoderConfig::classifier()).expect("built-in config");
/// let record = FeatureRecord::new()
///     .with("qualite_isolation_murs", "bonne")
///     .with("type_energie_n1", "Gaz naturel ");
///
/// let encoded = encoder.encode(&record).expect("known labels");
/// assert_eq!(encoded.get("qualite_isolation_murs"), Some(2.0));
/// assert_eq!(encoded.get("type_energie_n1_Gaz naturel"), Some(1.0));
/// ```
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    config: EncoderConfig,
}

impl FeatureEncoder {
    /// Validates and wraps a configuration.
    ///
    /// # Errors
    ///
    /// Returns the validation error if the configuration is inconsistent.
    pub fn new(config: EncoderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Encodes a record.
    ///
    /// Absent categoricals produce no column, absent numerics follow
    /// [`MissingNumeric`]. Attributes the configuration doesn't mention are
    /// ignored.
    ///
    /// # Errors
    ///
    /// - [`DpeError::InvalidInput`] for wrong value types, a missing required
    ///   numeric, or a fractional value where an integer is required
    /// - [`DpeError::UnrecognizedCategory`] for labels outside the vocabulary
    ///   under [`UnknownPolicy::Reject`]
    pub fn encode(&self, record: &FeatureRecord) -> Result<EncodedFeatures> {
        let mut out = EncodedFeatures::default();

        for spec in &self.config.features {
            let name = spec.name.as_str();
            match &spec.role {
                FeatureRole::Numeric { required, integer } => match record.number(name)? {
                    Some(v) => {
                        if *integer && v.fract() != 0.0 {
                            return Err(DpeError::invalid_input(
                                name,
                                format!("expected an integer, got {v}"),
                            ));
                        }
                        let value = v as f32;
                        if !value.is_finite() {
                            return Err(DpeError::invalid_input(
                                name,
                                format!("{v} is outside the representable range"),
                            ));
                        }
                        out.push(name, value);
                    }
                    None if *required => {
                        return Err(DpeError::invalid_input(name, "required field is missing"));
                    }
                    None => {
                        if self.config.missing_numeric == MissingNumeric::Nan {
                            out.push(name, f32::NAN);
                        }
                    }
                },
                FeatureRole::Ordinal { vocabulary } => {
                    if let Some(raw) = record.text(name)? {
                        match self.lookup(name, raw, vocabulary)? {
                            Some(code) => out.push(name, code as f32),
                            None => out.push(name, -1.0),
                        }
                    }
                }
                FeatureRole::OneHot { vocabulary } => {
                    if let Some(raw) = record.text(name)? {
                        if let Some(code) = self.lookup(name, raw, vocabulary)? {
                            let label = vocabulary.label(code).unwrap_or(raw);
                            out.push(format!("{name}_{label}"), 1.0);
                        }
                    }
                }
                FeatureRole::Flag {
                    column,
                    when,
                    vocabulary,
                } => {
                    if let Some(raw) = record.text(name)? {
                        if self.lookup(name, raw, vocabulary)?.is_some() {
                            let set = raw.trim() == when.trim();
                            out.push(column.as_str(), if set { 1.0 } else { 0.0 });
                        }
                    }
                }
            }
        }

        Ok(out)
    }

    /// `Ok(None)` means "unknown, keep going" under the sentinel policy.
    fn lookup(&self, feature: &str, raw: &str, vocabulary: &Vocabulary) -> Result<Option<usize>> {
        match vocabulary.encode(raw) {
            Some(code) => Ok(Some(code)),
            None => match self.config.unknown_policy {
                UnknownPolicy::Reject => Err(DpeError::UnrecognizedCategory {
                    feature: feature.to_string(),
                    value: raw.to_string(),
                }),
                UnknownPolicy::Sentinel => {
                    tracing::debug!(
                        encoder = %self.config.name,
                        feature,
                        value = raw,
                        "unrecognized category mapped to sentinel"
                    );
                    Ok(None)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::config::FeatureSpec;

    fn dashboard_record() -> FeatureRecord {
        FeatureRecord::new()
            .with("surface_habitable_logement", 80.0)
            .with("hauteur_sous_plafond", 2.5)
            .with("periode_construction", "1975-1977")
            .with("nombre_appartement_cat", "Petit Collectif(4 à 9 logements)")
            .with("type_energie_n1", "Gaz naturel ")
            .with("type_energie_principale_chauffage", "Électricité")
            .with("qualite_isolation_murs", "Moyenne")
            .with("logement", "Neuf")
    }

    #[test]
    fn test_classifier_encoding() {
        let encoder = FeatureEncoder::new(EncoderConfig::classifier()).unwrap();
        let encoded = encoder.encode(&dashboard_record()).unwrap();

        assert_eq!(encoded.get("surface_habitable_logement"), Some(80.0));
        assert_eq!(encoded.get("qualite_isolation_murs"), Some(1.0));
        assert_eq!(encoded.get("nombre_appartement_cat"), Some(1.0));
        assert_eq!(encoded.get("periode_construction_1975-1977"), Some(1.0));
        assert_eq!(encoded.get("type_energie_n1_Gaz naturel"), Some(1.0));
        assert_eq!(
            encoded.get("type_energie_principale_chauffage_Électricité"),
            Some(1.0)
        );
        assert_eq!(encoded.get("logement_Neuf"), Some(1.0));
        assert_eq!(encoded.len(), 8);
    }

    #[test]
    fn test_regressor_encoding() {
        let encoder = FeatureEncoder::new(EncoderConfig::regressor()).unwrap();
        let record = dashboard_record().with("etiquette_dpe", 3.0);
        let encoded = encoder.encode(&record).unwrap();

        assert_eq!(encoded.get("periode_construction"), Some(2.0));
        assert_eq!(encoded.get("etiquette_dpe"), Some(3.0));
        assert_eq!(encoded.get("logement_neuf"), Some(1.0));
        assert!(encoded.get("type_batiment_maison").is_none());
    }

    #[test]
    fn test_regressor_missing_numeric_is_nan() {
        let encoder = FeatureEncoder::new(EncoderConfig::regressor()).unwrap();
        let record = FeatureRecord::new().with("etiquette_dpe", 0.0);
        let encoded = encoder.encode(&record).unwrap();
        assert!(encoded.get("hauteur_sous_plafond").unwrap().is_nan());
    }

    #[test]
    fn test_classifier_missing_numeric_is_omitted() {
        let encoder = FeatureEncoder::new(EncoderConfig::classifier()).unwrap();
        let encoded = encoder.encode(&FeatureRecord::new()).unwrap();
        assert!(encoded.is_empty());
    }

    #[test]
    fn test_required_integer() {
        let encoder = FeatureEncoder::new(EncoderConfig::regressor()).unwrap();

        let err = encoder.encode(&FeatureRecord::new()).unwrap_err();
        assert!(matches!(err, DpeError::InvalidInput { ref field, .. } if field == "etiquette_dpe"));

        let err = encoder
            .encode(&FeatureRecord::new().with("etiquette_dpe", 2.5))
            .unwrap_err();
        assert!(matches!(err, DpeError::InvalidInput { .. }));
    }

    #[test]
    fn test_number_beyond_f32_range_is_invalid_input() {
        let encoder = FeatureEncoder::new(EncoderConfig::regressor()).unwrap();
        let record = FeatureRecord::new()
            .with("surface_habitable_logement", 1e39)
            .with("etiquette_dpe", 3.0);
        let err = encoder.encode(&record).unwrap_err();
        assert!(matches!(
            err,
            DpeError::InvalidInput { ref field, .. } if field == "surface_habitable_logement"
        ));

        let record = FeatureRecord::new().with("etiquette_dpe", -1e300);
        assert!(matches!(
            encoder.encode(&record).unwrap_err(),
            DpeError::InvalidInput { ref field, .. } if field == "etiquette_dpe"
        ));
    }

    #[test]
    fn test_unknown_category_rejected() {
        let encoder = FeatureEncoder::new(EncoderConfig::classifier()).unwrap();
        let record = dashboard_record().with("qualite_isolation_murs", "excellente");
        let err = encoder.encode(&record).unwrap_err();
        assert!(matches!(
            err,
            DpeError::UnrecognizedCategory { ref feature, ref value }
                if feature == "qualite_isolation_murs" && value == "excellente"
        ));
    }

    #[test]
    fn test_unknown_category_sentinel() {
        let config = EncoderConfig::classifier().with_unknown_policy(UnknownPolicy::Sentinel);
        let encoder = FeatureEncoder::new(config).unwrap();
        let record = dashboard_record()
            .with("qualite_isolation_murs", "excellente")
            .with("type_energie_n1", "Solaire");
        let encoded = encoder.encode(&record).unwrap();

        assert_eq!(encoded.get("qualite_isolation_murs"), Some(-1.0));
        assert!(encoded.iter().all(|(c, _)| !c.starts_with("type_energie_n1_")));
    }

    #[test]
    fn test_flag_unset_for_other_label() {
        let config = EncoderConfig {
            name: "t".into(),
            features: vec![FeatureSpec::flag("logement", "logement_neuf", "Neuf", ["Neuf", "Ancien"])],
            unknown_policy: UnknownPolicy::Reject,
            missing_numeric: MissingNumeric::Zero,
        };
        let encoder = FeatureEncoder::new(config).unwrap();
        let encoded = encoder
            .encode(&FeatureRecord::new().with("logement", "Ancien"))
            .unwrap();
        assert_eq!(encoded.get("logement_neuf"), Some(0.0));
    }

    #[test]
    fn test_wrong_type_is_invalid_input() {
        let encoder = FeatureEncoder::new(EncoderConfig::classifier()).unwrap();
        let err = encoder
            .encode(&FeatureRecord::new().with("logement", 1.0))
            .unwrap_err();
        assert!(matches!(err, DpeError::InvalidInput { .. }));

        let err = encoder
            .encode(&FeatureRecord::new().with("surface_habitable_logement", "big"))
            .unwrap_err();
        assert!(matches!(err, DpeError::InvalidInput { .. }));
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let encoder = FeatureEncoder::new(EncoderConfig::classifier()).unwrap();
        let record = dashboard_record();
        assert_eq!(encoder.encode(&record).unwrap(), encoder.encode(&record).unwrap());
    }
}
