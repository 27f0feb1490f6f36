//! Request-level services: readiness gate + JSON parsing + prediction.

use super::context::{ClassifierContext, RegressorContext};
use super::readiness::{ModelSlot, ModelState};
use crate::encoding::FeatureRecord;
use crate::error::{DpeError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// A loaded context that can answer one request.
pub trait Predictor: Send + Sync + 'static {
    /// Success body.
    type Response: Serialize + Send + 'static;

    /// Name used in logs and readiness reports.
    const NAME: &'static str;

    /// Predicts for one parsed record.
    fn predict_record(&self, record: &FeatureRecord) -> Result<Self::Response>;

    /// Dropped columns reported in `response`.
    fn dropped_count(_response: &Self::Response) -> usize {
        0
    }
}

/// Body of a successful `/predict_dpe` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierResponse {
    /// Class index, 0 (G) to 6 (A)
    #[serde(rename = "prediction_DPE_index")]
    pub class_index: usize,
    /// Only present in strict alignment mode when something was dropped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropped_columns: Option<Vec<String>>,
}

/// Body of a successful `/predict_conso` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressorResponse {
    /// Annual consumption, kWh, two decimals, never negative
    #[serde(rename = "conso_predite_kwh")]
    pub kwh: f64,
    /// Only present in strict alignment mode when something was dropped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropped_columns: Option<Vec<String>>,
}

impl Predictor for ClassifierContext {
    type Response = ClassifierResponse;
    const NAME: &'static str = "classifier";

    fn predict_record(&self, record: &FeatureRecord) -> Result<ClassifierResponse> {
        let prediction = self.predict(record)?;
        if prediction.class().is_none() {
            return Err(DpeError::Prediction(format!(
                "classifier returned class index {} outside G..A",
                prediction.class_index
            )));
        }
        Ok(ClassifierResponse {
            class_index: prediction.class_index,
            dropped_columns: prediction.dropped_columns,
        })
    }

    fn dropped_count(response: &ClassifierResponse) -> usize {
        response.dropped_columns.as_ref().map_or(0, Vec::len)
    }
}

impl Predictor for RegressorContext {
    type Response = RegressorResponse;
    const NAME: &'static str = "regressor";

    fn predict_record(&self, record: &FeatureRecord) -> Result<RegressorResponse> {
        let prediction = self.predict(record)?;
        Ok(RegressorResponse {
            kwh: prediction.kwh,
            dropped_columns: prediction.dropped_columns,
        })
    }

    fn dropped_count(response: &RegressorResponse) -> usize {
        response.dropped_columns.as_ref().map_or(0, Vec::len)
    }
}

/// One prediction endpoint's worth of state: a shared [`ModelSlot`].
///
/// Cheap to clone; clones share the slot.
pub struct PredictionService<P> {
    slot: Arc<ModelSlot<P>>,
}

/// The DPE class endpoint.
pub type ClassifierService = PredictionService<ClassifierContext>;
/// The consumption endpoint.
pub type RegressorService = PredictionService<RegressorContext>;

impl<P> Clone for PredictionService<P> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<P: Predictor> Default for PredictionService<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Predictor> PredictionService<P> {
    /// A service whose model is not loaded yet.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: Arc::new(ModelSlot::new(P::NAME)),
        }
    }

    /// A service that is immediately ready.
    #[must_use]
    pub fn ready(context: P) -> Self {
        let service = Self::new();
        service.slot.load_with(|| Ok(context));
        service
    }

    /// The underlying slot, for the loader.
    #[must_use]
    pub fn slot(&self) -> &Arc<ModelSlot<P>> {
        &self.slot
    }

    /// Current readiness.
    #[must_use]
    pub fn state(&self) -> ModelState {
        self.slot.state()
    }

    /// True once the context is published.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.slot.is_ready()
    }

    /// Predicts for a raw JSON body.
    ///
    /// Readiness is checked before the body is looked at, so an unready
    /// service answers `ServiceUnavailable` even for malformed input.
    ///
    /// # Errors
    ///
    /// `ServiceUnavailable` when not ready, `InvalidInput` for a malformed
    /// body, otherwise whatever the context returns.
    pub fn predict_json(&self, body: &Value) -> Result<P::Response> {
        let context = self.slot.get()?;
        let record = FeatureRecord::from_json(body)?;
        context.predict_record(&record)
    }

    /// Predicts for an already-parsed record.
    ///
    /// # Errors
    ///
    /// `ServiceUnavailable` when not ready, otherwise whatever the context
    /// returns.
    pub fn predict(&self, record: &FeatureRecord) -> Result<P::Response> {
        self.slot.get()?.predict_record(record)
    }
}
