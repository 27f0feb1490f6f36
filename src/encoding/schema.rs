//! Training column schemas and alignment of encoded features onto them.

use super::encoder::EncodedFeatures;
use crate::error::{DpeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// How alignment reports encoded columns that the schema doesn't know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignMode {
    /// Drop them silently (logged at debug).
    #[default]
    Lenient,
    /// Drop them, log a warning and surface them to the caller.
    Strict,
}

impl fmt::Display for AlignMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lenient => write!(f, "lenient"),
            Self::Strict => write!(f, "strict"),
        }
    }
}

/// Result of aligning encoded features onto a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    /// One value per schema column, in schema order
    pub values: Vec<f32>,
    /// Encoded columns with no schema counterpart
    pub dropped: Vec<String>,
    /// Schema columns nothing was written to (left at zero)
    pub unmatched: usize,
    /// Mode the alignment ran in
    pub mode: AlignMode,
}

impl Alignment {
    /// Dropped columns worth reporting back to the caller (strict mode only).
    #[must_use]
    pub fn reported_drops(&self) -> Option<&[String]> {
        (self.mode == AlignMode::Strict && !self.dropped.is_empty()).then_some(self.dropped.as_slice())
    }
}

/// The ordered column list a model was fit on.
///
/// Column positions are precomputed, so alignment is one hash lookup per
/// encoded column. Persisted as a plain JSON array of names.
///
/// # Examples
///
/// ```
/// use dpe_predict::encoding::{AlignMode, EncoderConfig, FeatureEncoder, FeatureRecord, TrainingSchema};
///
/// let schema = TrainingSchema::new(vec![
///     "surface_habitable_logement".into(),
///     "logement_Neuf".into(),
///     "logement_Ancien".into(),
/// ]).expect("distinct columns");
///
/// let encoder = FeatureEncoder::new(EncoderConfig::classifier()).expect("built-in config");
/// let record = FeatureRecord::new()
///     .with("surface_habitable_logement", 64.0)
///     .with("logement", "Ancien")
///     .with("qualite_isolation_murs", "bonne");
///
/// let aligned = schema.align(&encoder.encode(&record).expect("known labels"), AlignMode::Lenient);
/// assert_eq!(aligned.values, vec![64.0, 0.0, 1.0]);
/// assert_eq!(aligned.dropped, vec!["qualite_isolation_murs".to_string()]);
/// assert_eq!(aligned.unmatched, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct TrainingSchema {
    columns: Vec<String>,
    positions: HashMap<String, usize>,
}

impl TrainingSchema {
    /// Builds a schema from ordered column names.
    ///
    /// # Errors
    ///
    /// Returns [`DpeError::FormatError`] if the list is empty or has duplicates.
    pub fn new(columns: Vec<String>) -> Result<Self> {
        if columns.is_empty() {
            return Err(DpeError::format("training schema has no columns"));
        }
        let mut positions = HashMap::with_capacity(columns.len());
        for (idx, name) in columns.iter().enumerate() {
            if positions.insert(name.clone(), idx).is_some() {
                return Err(DpeError::format(format!(
                    "training schema lists column '{name}' twice"
                )));
            }
        }
        Ok(Self { columns, positions })
    }

    // Caller guarantees the names are distinct.
    fn from_distinct(columns: Vec<String>) -> Self {
        let positions = columns
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), idx))
            .collect();
        Self { columns, positions }
    }

    /// Loads a schema saved as a JSON array of names.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unreadable, unparsable, or invalid.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
    }

    /// Saves the schema as a JSON array of names.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(&self.columns)?)?;
        Ok(())
    }

    /// Column names in order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Always false for a constructed schema.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Position of a column.
    #[must_use]
    pub fn position(&self, column: &str) -> Option<usize> {
        self.positions.get(column).copied()
    }

    /// Maps encoded columns onto the schema.
    ///
    /// Starts from a zero vector; matching columns are copied in, the rest
    /// are returned in `dropped`. The output length always equals
    /// [`len`](Self::len).
    #[must_use]
    pub fn align(&self, encoded: &EncodedFeatures, mode: AlignMode) -> Alignment {
        let mut values = vec![0.0f32; self.columns.len()];
        let mut written = vec![false; self.columns.len()];
        let mut dropped = Vec::new();

        for (column, value) in encoded.iter() {
            match self.positions.get(column) {
                Some(&idx) => {
                    values[idx] = value;
                    written[idx] = true;
                }
                None => dropped.push(column.to_string()),
            }
        }

        let unmatched = written.iter().filter(|w| !**w).count();
        Alignment {
            values,
            dropped,
            unmatched,
            mode,
        }
    }
}

impl TryFrom<Vec<String>> for TrainingSchema {
    type Error = DpeError;

    fn try_from(columns: Vec<String>) -> Result<Self> {
        Self::new(columns)
    }
}

impl From<TrainingSchema> for Vec<String> {
    fn from(schema: TrainingSchema) -> Self {
        schema.columns
    }
}

/// Column layout of the consumption model's input.
///
/// The first block is imputed and standardized, the second passes through
/// unchanged; the model sees them concatenated in that order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressorLayout {
    standardized: Vec<String>,
    passthrough: Vec<String>,
    #[serde(skip)]
    combined: Option<TrainingSchema>,
}

impl RegressorLayout {
    /// Builds a layout from its two blocks.
    ///
    /// # Errors
    ///
    /// Returns [`DpeError::FormatError`] if the standardized block is empty or
    /// a column appears twice across both blocks.
    pub fn new(standardized: Vec<String>, passthrough: Vec<String>) -> Result<Self> {
        if standardized.is_empty() {
            return Err(DpeError::format("regressor layout has no standardized columns"));
        }
        let combined = TrainingSchema::new(
            standardized
                .iter()
                .chain(passthrough.iter())
                .cloned()
                .collect(),
        )?;
        Ok(Self {
            standardized,
            passthrough,
            combined: Some(combined),
        })
    }

    /// Layout the shipped consumption model was trained with.
    #[must_use]
    pub fn consumption() -> Self {
        let energy = [
            "Charbon",
            "Fioul",
            "Gaz (GPL/Propane/Butane)",
            "Gaz naturel",
            "Réseau de chauffage urbain",
            "Électricité",
        ];
        let mut passthrough: Vec<String> = [
            "qualite_isolation_murs",
            "etiquette_dpe",
            "periode_construction",
            "nombre_appartement_cat",
            "type_batiment_immeuble",
            "type_batiment_maison",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        for prefix in ["type_energie_principale_chauffage", "type_energie_n1"] {
            passthrough.extend(energy.iter().map(|e| format!("{prefix}_{e}")));
        }
        passthrough.push("logement_neuf".into());

        let standardized = vec![
            "hauteur_sous_plafond".to_string(),
            "surface_habitable_logement".to_string(),
        ];
        let combined = TrainingSchema::from_distinct(
            standardized.iter().chain(passthrough.iter()).cloned().collect(),
        );

        Self {
            standardized,
            passthrough,
            combined: Some(combined),
        }
    }

    /// Loads a layout from JSON (`{"standardized": [...], "passthrough": [...]}`).
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unreadable, unparsable, or invalid.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw: Self = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        Self::new(raw.standardized, raw.passthrough)
    }

    /// Saves the layout as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Columns that are imputed then scaled.
    #[must_use]
    pub fn standardized(&self) -> &[String] {
        &self.standardized
    }

    /// Columns passed through as-is.
    #[must_use]
    pub fn passthrough(&self) -> &[String] {
        &self.passthrough
    }

    /// Total model input width.
    #[must_use]
    pub fn width(&self) -> usize {
        self.standardized.len() + self.passthrough.len()
    }

    /// Aligns encoded features onto both blocks at once.
    ///
    /// `values[..standardized().len()]` is the standardized block.
    ///
    /// # Errors
    ///
    /// Returns [`DpeError::FormatError`] for a layout built without
    /// [`new`](Self::new) or [`load`](Self::load).
    pub fn align(&self, encoded: &EncodedFeatures, mode: AlignMode) -> Result<Alignment> {
        self.combined
            .as_ref()
            .map(|schema| schema.align(encoded, mode))
            .ok_or_else(|| DpeError::format("regressor layout was not initialized"))
    }
}
