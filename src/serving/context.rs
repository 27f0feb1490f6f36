//! Immutable, fully-loaded prediction contexts.
//!
//! A context bundles everything one model needs at request time. Built once
//! at startup, shared behind an `Arc`, never mutated, so handlers need no
//! locks.

use crate::dpe::DpeClass;
use crate::encoding::{AlignMode, Alignment, FeatureEncoder, FeatureRecord, RegressorLayout, TrainingSchema};
use crate::error::{DpeError, Result};
use crate::linear_model::LinearRegression;
use crate::preprocessing::{SimpleImputer, StandardScaler};
use crate::traits::{Classifier, Regressor, Transformer};
use crate::tree::RandomForestClassifier;

/// Classifier output.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassPrediction {
    /// Model class index (0 = G … 6 = A)
    pub class_index: usize,
    /// Encoded columns the schema didn't know (reported in strict mode only)
    pub dropped_columns: Option<Vec<String>>,
}

impl ClassPrediction {
    /// Label for the index, `None` if the model emits indices outside `0..=6`.
    #[must_use]
    pub fn class(&self) -> Option<DpeClass> {
        DpeClass::from_index(self.class_index)
    }
}

/// Regressor output.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumptionPrediction {
    /// Clamped at zero, rounded to two decimals (kWh/year)
    pub kwh: f64,
    /// Encoded columns the layout didn't know (reported in strict mode only)
    pub dropped_columns: Option<Vec<String>>,
}

fn log_alignment(model: &'static str, alignment: &Alignment) {
    if alignment.dropped.is_empty() {
        return;
    }
    match alignment.mode {
        AlignMode::Strict => tracing::warn!(
            model,
            dropped = ?alignment.dropped,
            unmatched = alignment.unmatched,
            "encoded columns missing from training schema"
        ),
        AlignMode::Lenient => tracing::debug!(
            model,
            dropped = ?alignment.dropped,
            unmatched = alignment.unmatched,
            "encoded columns dropped during alignment"
        ),
    }
}

/// Everything the DPE class model needs at request time.
#[derive(Debug)]
pub struct ClassifierContext {
    encoder: FeatureEncoder,
    schema: TrainingSchema,
    model: RandomForestClassifier,
    mode: AlignMode,
}

impl ClassifierContext {
    /// Bundles the parts after checking the model width matches the schema.
    ///
    /// # Errors
    ///
    /// Returns [`DpeError::DimensionMismatch`] if the forest was fit on a
    /// different number of columns than the schema lists.
    pub fn new(
        encoder: FeatureEncoder,
        schema: TrainingSchema,
        model: RandomForestClassifier,
        mode: AlignMode,
    ) -> Result<Self> {
        let n_features = model
            .n_features()
            .ok_or_else(|| DpeError::format("random forest is not fitted"))?;
        if n_features != schema.len() {
            return Err(DpeError::dimension_mismatch(
                "classifier schema columns",
                schema.len(),
                n_features,
            ));
        }
        Ok(Self {
            encoder,
            schema,
            model,
            mode,
        })
    }

    /// Encodes, aligns and classifies one record.
    ///
    /// # Errors
    ///
    /// Encoding errors pass through unchanged; model failures surface as
    /// [`DpeError::Prediction`].
    pub fn predict(&self, record: &FeatureRecord) -> Result<ClassPrediction> {
        let encoded = self.encoder.encode(record)?;
        let alignment = self.schema.align(&encoded, self.mode);
        log_alignment("classifier", &alignment);

        let class_index = self
            .model
            .predict_row(&alignment.values)
            .map_err(|e| DpeError::Prediction(e.to_string()))?;
        tracing::debug!(class_index, "dpe class predicted");

        Ok(ClassPrediction {
            class_index,
            dropped_columns: alignment.reported_drops().map(<[String]>::to_vec),
        })
    }

    /// Training column schema.
    #[must_use]
    pub fn schema(&self) -> &TrainingSchema {
        &self.schema
    }

    /// The forest.
    #[must_use]
    pub fn model(&self) -> &RandomForestClassifier {
        &self.model
    }

    /// The encoder.
    #[must_use]
    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    /// Alignment mode.
    #[must_use]
    pub fn align_mode(&self) -> AlignMode {
        self.mode
    }
}

/// Everything the consumption model needs at request time.
#[derive(Debug)]
pub struct RegressorContext {
    encoder: FeatureEncoder,
    layout: RegressorLayout,
    imputer: SimpleImputer,
    scaler: StandardScaler,
    model: LinearRegression,
    mode: AlignMode,
}

impl RegressorContext {
    /// Bundles the parts after checking every width against the layout.
    ///
    /// # Errors
    ///
    /// Returns [`DpeError::DimensionMismatch`] if the imputer or scaler don't
    /// cover the standardized block, or the model doesn't cover the layout.
    pub fn new(
        encoder: FeatureEncoder,
        layout: RegressorLayout,
        imputer: SimpleImputer,
        scaler: StandardScaler,
        model: LinearRegression,
        mode: AlignMode,
    ) -> Result<Self> {
        let n_standardized = layout.standardized().len();
        let checks = [
            ("imputer columns", n_standardized, imputer.n_features()),
            ("scaler columns", n_standardized, scaler.n_features()),
            ("linear model coefficients", layout.width(), model.n_features()),
        ];
        for (what, expected, actual) in checks {
            let actual = actual.ok_or_else(|| DpeError::format(format!("{what}: not fitted")))?;
            if actual != expected {
                return Err(DpeError::dimension_mismatch(what, expected, actual));
            }
        }
        Ok(Self {
            encoder,
            layout,
            imputer,
            scaler,
            model,
            mode,
        })
    }

    /// Encodes, imputes, scales and regresses one record.
    ///
    /// The record must carry `etiquette_dpe`, the class index from the
    /// classifier; it is used as given.
    ///
    /// # Errors
    ///
    /// Encoding errors pass through unchanged; preprocessing and model
    /// failures surface as [`DpeError::Prediction`].
    pub fn predict(&self, record: &FeatureRecord) -> Result<ConsumptionPrediction> {
        let encoded = self.encoder.encode(record)?;
        let alignment = self.layout.align(&encoded, self.mode)?;
        log_alignment("regressor", &alignment);

        let (standard, passthrough) = alignment.values.split_at(self.layout.standardized().len());
        let raw = self
            .transform_and_predict(standard, passthrough)
            .map_err(|e| DpeError::Prediction(e.to_string()))?;
        if !raw.is_finite() {
            return Err(DpeError::Prediction(format!(
                "linear model produced a non-finite value ({raw})"
            )));
        }

        let kwh = (f64::from(raw).max(0.0) * 100.0).round() / 100.0;
        tracing::debug!(raw, kwh, "consumption predicted");
        Ok(ConsumptionPrediction {
            kwh,
            dropped_columns: alignment.reported_drops().map(<[String]>::to_vec),
        })
    }

    fn transform_and_predict(&self, standard: &[f32], passthrough: &[f32]) -> Result<f32> {
        let imputed = self.imputer.transform_row(standard)?;
        let mut features = self.scaler.transform_row(&imputed)?;
        // Absent passthrough values count as zero.
        features.extend(passthrough.iter().map(|v| if v.is_nan() { 0.0 } else { *v }));
        self.model.predict_row(&features)
    }

    /// Column layout.
    #[must_use]
    pub fn layout(&self) -> &RegressorLayout {
        &self.layout
    }

    /// The linear model.
    #[must_use]
    pub fn model(&self) -> &LinearRegression {
        &self.model
    }

    /// The imputer.
    #[must_use]
    pub fn imputer(&self) -> &SimpleImputer {
        &self.imputer
    }

    /// The scaler.
    #[must_use]
    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    /// The encoder.
    #[must_use]
    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    /// Alignment mode.
    #[must_use]
    pub fn align_mode(&self) -> AlignMode {
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::EncoderConfig;
    use crate::error::ErrorKind;
    use crate::preprocessing::ImputeStrategy;
    use crate::primitives::Matrix;

    fn tiny_classifier(mode: AlignMode) -> ClassifierContext {
        let schema = TrainingSchema::new(vec![
            "surface_habitable_logement".into(),
            "qualite_isolation_murs".into(),
        ])
        .unwrap();
        // big + well insulated → class 5, otherwise class 1
        let x = Matrix::from_vec(
            6,
            2,
            vec![40.0, 0.0, 50.0, 1.0, 45.0, 0.0, 150.0, 3.0, 160.0, 2.0, 170.0, 3.0],
        )
        .unwrap();
        let mut forest = RandomForestClassifier::new(5).with_random_state(11);
        forest.fit(&x, &[1, 1, 1, 5, 5, 5]).unwrap();
        let encoder = FeatureEncoder::new(EncoderConfig::classifier()).unwrap();
        ClassifierContext::new(encoder, schema, forest, mode).unwrap()
    }

    fn tiny_regressor(intercept: f32) -> RegressorContext {
        let layout = RegressorLayout::consumption();
        let mut coef = vec![0.0; layout.width()];
        coef[1] = 100.0; // surface (scaled)
        coef[3] = -10.0; // etiquette_dpe
        RegressorContext::new(
            FeatureEncoder::new(EncoderConfig::regressor()).unwrap(),
            layout,
            SimpleImputer::from_statistics(ImputeStrategy::Mean, vec![2.5, 80.0]),
            StandardScaler::from_stats(vec![2.5, 80.0], vec![0.5, 20.0]).unwrap(),
            LinearRegression::from_parts(coef, intercept),
            AlignMode::Lenient,
        )
        .unwrap()
    }

    #[test]
    fn test_classifier_predicts_class() {
        let ctx = tiny_classifier(AlignMode::Lenient);
        let record = FeatureRecord::new()
            .with("surface_habitable_logement", 165.0)
            .with("qualite_isolation_murs", "très bonne");
        let pred = ctx.predict(&record).unwrap();
        assert_eq!(pred.class_index, 5);
        assert_eq!(pred.class(), Some(DpeClass::B));
        assert!(pred.dropped_columns.is_none());
    }

    #[test]
    fn test_classifier_strict_reports_drops() {
        let ctx = tiny_classifier(AlignMode::Strict);
        let record = FeatureRecord::new()
            .with("surface_habitable_logement", 45.0)
            .with("logement", "Neuf");
        let pred = ctx.predict(&record).unwrap();
        assert_eq!(pred.dropped_columns, Some(vec!["logement_Neuf".to_string()]));
    }

    #[test]
    fn test_classifier_schema_width_checked() {
        let schema = TrainingSchema::new(vec!["a".into(), "b".into(), "c".into()]).unwrap();
        let x = Matrix::from_vec(2, 2, vec![0.0, 0.0, 1.0, 1.0]).unwrap();
        let mut forest = RandomForestClassifier::new(2).with_random_state(0);
        forest.fit(&x, &[0, 1]).unwrap();
        let encoder = FeatureEncoder::new(EncoderConfig::classifier()).unwrap();
        let err = ClassifierContext::new(encoder, schema, forest, AlignMode::Lenient).unwrap_err();
        assert!(matches!(err, DpeError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_classifier_unknown_category() {
        let ctx = tiny_classifier(AlignMode::Lenient);
        let record = FeatureRecord::new().with("qualite_isolation_murs", "excellente");
        let err = ctx.predict(&record).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnrecognizedCategory);
    }

    #[test]
    fn test_regressor_prediction_and_rounding() {
        let ctx = tiny_regressor(1000.0);
        let record = FeatureRecord::new()
            .with("surface_habitable_logement", 100.0)
            .with("etiquette_dpe", 2_i64);
        // 1000 + 100 * (100 - 80) / 20 - 10 * 2 = 1080
        let pred = ctx.predict(&record).unwrap();
        assert!((pred.kwh - 1080.0).abs() < 1e-3);
    }

    #[test]
    fn test_regressor_missing_height_is_imputed() {
        let ctx = tiny_regressor(500.0);
        let record = FeatureRecord::new().with("etiquette_dpe", 0_i64);
        // surface imputed to the mean → scaled to 0
        let pred = ctx.predict(&record).unwrap();
        assert!((pred.kwh - 500.0).abs() < 1e-3);
    }

    #[test]
    fn test_regressor_clamps_at_zero() {
        let ctx = tiny_regressor(-5000.0);
        let record = FeatureRecord::new().with("etiquette_dpe", 6_i64);
        assert_eq!(ctx.predict(&record).unwrap().kwh, 0.0);
    }

    #[test]
    fn test_regressor_requires_class() {
        let ctx = tiny_regressor(0.0);
        let err = ctx.predict(&FeatureRecord::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_regressor_width_checked() {
        let err = RegressorContext::new(
            FeatureEncoder::new(EncoderConfig::regressor()).unwrap(),
            RegressorLayout::consumption(),
            SimpleImputer::from_statistics(ImputeStrategy::Mean, vec![2.5]),
            StandardScaler::from_stats(vec![2.5, 80.0], vec![0.5, 20.0]).unwrap(),
            LinearRegression::from_parts(vec![0.0; 21], 0.0),
            AlignMode::Lenient,
        )
        .unwrap_err();
        assert!(err.to_string().contains("imputer"));
    }
}
