//! Model directory layout and artifact (de)serialization.
//!
//! All artifacts are JSON files living side by side in one directory:
//!
//! | File | Contents |
//! |------|----------|
//! | `dpe_random_forest.json` | fitted [`RandomForestClassifier`] |
//! | `dpe_feature_columns.json` | classifier [`TrainingSchema`] |
//! | `conso_linear_model.json` | fitted [`LinearRegression`] |
//! | `conso_imputer.json` | fitted [`SimpleImputer`] (standardized block) |
//! | `conso_scaler.json` | fitted [`StandardScaler`] (standardized block) |
//! | `conso_feature_layout.json` | optional [`RegressorLayout`] |
//! | `encoder_classifier.json` | optional classifier [`EncoderConfig`] |
//! | `encoder_regressor.json` | optional regressor [`EncoderConfig`] |
//!
//! Optional files fall back to the built-in definitions.

use super::context::{ClassifierContext, RegressorContext};
use crate::encoding::{AlignMode, EncoderConfig, FeatureEncoder, RegressorLayout, TrainingSchema, UnknownPolicy};
use crate::error::{DpeError, Result};
use crate::linear_model::LinearRegression;
use crate::preprocessing::{SimpleImputer, StandardScaler};
use crate::tree::RandomForestClassifier;
use std::path::{Path, PathBuf};

/// Fitted random forest.
pub const CLASSIFIER_MODEL_FILE: &str = "dpe_random_forest.json";
/// Classifier training columns.
pub const CLASSIFIER_SCHEMA_FILE: &str = "dpe_feature_columns.json";
/// Classifier encoder override.
pub const CLASSIFIER_ENCODER_FILE: &str = "encoder_classifier.json";
/// Fitted linear model.
pub const REGRESSOR_MODEL_FILE: &str = "conso_linear_model.json";
/// Fitted imputer.
pub const REGRESSOR_IMPUTER_FILE: &str = "conso_imputer.json";
/// Fitted scaler.
pub const REGRESSOR_SCALER_FILE: &str = "conso_scaler.json";
/// Regressor column layout override.
pub const REGRESSOR_LAYOUT_FILE: &str = "conso_feature_layout.json";
/// Regressor encoder override.
pub const REGRESSOR_ENCODER_FILE: &str = "encoder_regressor.json";

/// Knobs applied when building contexts from disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Alignment mode for both models
    pub align_mode: AlignMode,
    /// Overrides the unknown-category policy of whatever encoder config is used
    pub unknown_policy: Option<UnknownPolicy>,
}

impl LoadOptions {
    /// Sets the alignment mode.
    #[must_use]
    pub fn with_align_mode(mut self, mode: AlignMode) -> Self {
        self.align_mode = mode;
        self
    }

    /// Forces an unknown-category policy.
    #[must_use]
    pub fn with_unknown_policy(mut self, policy: UnknownPolicy) -> Self {
        self.unknown_policy = Some(policy);
        self
    }
}

/// A model directory.
///
/// # Examples
///
/// ```no_run
/// use dpe_predict::serving::{ArtifactSet, LoadOptions};
///
/// let artifacts = ArtifactSet::new("models");
/// let classifier = artifacts.load_classifier(LoadOptions::default())?;
/// println!("{} schema columns", classifier.schema().len());
/// # Ok::<(), dpe_predict::DpeError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ArtifactSet {
    dir: PathBuf,
}

impl ArtifactSet {
    /// Points at `dir`. Nothing is read until a `load_*` call.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The model directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of an artifact file.
    #[must_use]
    pub fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    /// Reads the forest, its schema and the classifier encoder config.
    ///
    /// # Errors
    ///
    /// Returns an error naming the offending file if anything is missing,
    /// unparsable or inconsistent.
    pub fn load_classifier(&self, options: LoadOptions) -> Result<ClassifierContext> {
        tracing::info!(dir = %self.dir.display(), "loading classifier artifacts");
        let model = self.read(CLASSIFIER_MODEL_FILE, RandomForestClassifier::load)?;
        let schema = self.read(CLASSIFIER_SCHEMA_FILE, TrainingSchema::load)?;
        let config = self.encoder_config(CLASSIFIER_ENCODER_FILE, EncoderConfig::classifier, options)?;

        let context = ClassifierContext::new(FeatureEncoder::new(config)?, schema, model, options.align_mode)?;
        tracing::info!(
            trees = context.model().n_trees(),
            columns = context.schema().len(),
            mode = %options.align_mode,
            "classifier artifacts loaded"
        );
        Ok(context)
    }

    /// Reads the linear model, imputer, scaler, layout and regressor encoder
    /// config.
    ///
    /// # Errors
    ///
    /// Returns an error naming the offending file if anything is missing,
    /// unparsable or inconsistent.
    pub fn load_regressor(&self, options: LoadOptions) -> Result<RegressorContext> {
        tracing::info!(dir = %self.dir.display(), "loading regressor artifacts");
        let model = self.read(REGRESSOR_MODEL_FILE, LinearRegression::load)?;
        let imputer = self.read(REGRESSOR_IMPUTER_FILE, SimpleImputer::load)?;
        let scaler = self.read(REGRESSOR_SCALER_FILE, StandardScaler::load)?;
        let layout = if self.path(REGRESSOR_LAYOUT_FILE).exists() {
            self.read(REGRESSOR_LAYOUT_FILE, RegressorLayout::load)?
        } else {
            RegressorLayout::consumption()
        };
        let config = self.encoder_config(REGRESSOR_ENCODER_FILE, EncoderConfig::regressor, options)?;

        let context = RegressorContext::new(
            FeatureEncoder::new(config)?,
            layout,
            imputer,
            scaler,
            model,
            options.align_mode,
        )?;
        tracing::info!(
            columns = context.layout().width(),
            mode = %options.align_mode,
            "regressor artifacts loaded"
        );
        Ok(context)
    }

    /// Writes the classifier schema and forest.
    ///
    /// # Errors
    ///
    /// Returns an error if the forest doesn't match the schema or a write fails.
    pub fn save_classifier(&self, schema: &TrainingSchema, model: &RandomForestClassifier) -> Result<()> {
        use crate::traits::Classifier;
        if let Some(n) = model.n_features() {
            if n != schema.len() {
                return Err(DpeError::dimension_mismatch("classifier schema columns", schema.len(), n));
            }
        }
        std::fs::create_dir_all(&self.dir)?;
        schema.save(self.path(CLASSIFIER_SCHEMA_FILE))?;
        model.save(self.path(CLASSIFIER_MODEL_FILE))?;
        tracing::info!(dir = %self.dir.display(), "classifier artifacts saved");
        Ok(())
    }

    /// Writes the regressor imputer, scaler and linear model.
    ///
    /// # Errors
    ///
    /// Returns an error if a write fails.
    pub fn save_regressor(
        &self,
        imputer: &SimpleImputer,
        scaler: &StandardScaler,
        model: &LinearRegression,
    ) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        imputer.save(self.path(REGRESSOR_IMPUTER_FILE))?;
        scaler.save(self.path(REGRESSOR_SCALER_FILE))?;
        model.save(self.path(REGRESSOR_MODEL_FILE))?;
        tracing::info!(dir = %self.dir.display(), "regressor artifacts saved");
        Ok(())
    }

    /// Writes a custom regressor layout.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn save_regressor_layout(&self, layout: &RegressorLayout) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        layout.save(self.path(REGRESSOR_LAYOUT_FILE))
    }

    /// Writes an encoder override for the classifier (`regressor == false`)
    /// or the regressor.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the write fails.
    pub fn save_encoder_config(&self, config: &EncoderConfig, regressor: bool) -> Result<()> {
        config.validate()?;
        std::fs::create_dir_all(&self.dir)?;
        let file = if regressor {
            REGRESSOR_ENCODER_FILE
        } else {
            CLASSIFIER_ENCODER_FILE
        };
        config.save(self.path(file))
    }

    fn encoder_config(
        &self,
        file: &str,
        builtin: fn() -> EncoderConfig,
        options: LoadOptions,
    ) -> Result<EncoderConfig> {
        let config = if self.path(file).exists() {
            tracing::info!(file, "using encoder override");
            self.read(file, EncoderConfig::load)?
        } else {
            builtin()
        };
        Ok(match options.unknown_policy {
            Some(policy) => config.with_unknown_policy(policy),
            None => config,
        })
    }

    fn read<T>(&self, file: &str, load: fn(PathBuf) -> Result<T>) -> Result<T> {
        let path = self.path(file);
        load(path.clone()).map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "artifact load failed");
            match e {
                DpeError::Io(io) => DpeError::Io(std::io::Error::new(
                    io.kind(),
                    format!("{}: {io}", path.display()),
                )),
                other => DpeError::format(format!("{}: {other}", path.display())),
            }
        })
    }
}
