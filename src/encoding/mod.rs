//! Turning raw request records into model-ready feature vectors.
//!
//! The pipeline has three steps, each in its own module:
//!
//! 1. [`FeatureRecord`] parses the JSON payload (numbers and strings only).
//! 2. [`FeatureEncoder`] applies an [`EncoderConfig`]: ordinal codes, one-hot
//!    indicators named `{feature}_{label}`, boolean flags, raw numerics.
//! 3. [`TrainingSchema::align`] places the named columns into the exact
//!    order the model was trained on, zero-filling the rest.
//!
//! The classifier and the regressor share this code and differ only in
//! their configuration ([`EncoderConfig::classifier`] and
//! [`EncoderConfig::regressor`]).

mod config;
mod encoder;
mod record;
mod schema;

pub use config::{
    EncoderConfig, FeatureRole, FeatureSpec, MissingNumeric, UnknownPolicy, Vocabulary,
    BUILDING_CATEGORIES, BUILDING_TYPES, CONSTRUCTION_PERIODS, DWELLING_AGES, ENERGY_TYPES,
    INSULATION_LEVELS,
};
pub use encoder::{EncodedFeatures, FeatureEncoder};
pub use record::{FeatureRecord, FeatureValue};
pub use schema::{AlignMode, Alignment, RegressorLayout, TrainingSchema};

#[cfg(test)]
mod proptests;
