//! Classifier → regressor in one call.

use super::context::{ClassifierContext, RegressorContext};
use crate::dpe::{DpeClass, CO2_KG_PER_KWH, DISPLAY_FLOOR_KWH};
use crate::encoding::FeatureRecord;
use crate::error::{DpeError, Result};
use serde::Serialize;

/// Result of the two-stage prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainPrediction {
    /// Classifier output
    pub class_index: usize,
    /// Label for `class_index`
    pub class: DpeClass,
    /// Raw regressor output (kWh/year)
    pub consumption_kwh: f64,
    /// `consumption_kwh` rounded to one decimal, floored at 50
    pub displayed_kwh: f64,
    /// CO₂ estimate for `displayed_kwh` (kg/year, one decimal)
    pub co2_kg: f64,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Classifies `record`, feeds the class back in as `etiquette_dpe` and
/// estimates consumption.
///
/// Any `etiquette_dpe` already present in `record` is overwritten.
///
/// # Errors
///
/// Propagates either stage's error. A class index outside `0..=6` is a
/// [`DpeError::Prediction`].
pub fn predict_chain(
    classifier: &ClassifierContext,
    regressor: &RegressorContext,
    record: &FeatureRecord,
) -> Result<ChainPrediction> {
    let class_prediction = classifier.predict(record)?;
    let class = class_prediction.class().ok_or_else(|| {
        DpeError::Prediction(format!(
            "classifier returned class index {} outside G..A",
            class_prediction.class_index
        ))
    })?;

    let enriched = record
        .clone()
        .with("etiquette_dpe", class.index() as i64);
    let consumption = regressor.predict(&enriched)?;

    let displayed_kwh = round1(consumption.kwh).max(DISPLAY_FLOOR_KWH);
    let co2_kg = round1(displayed_kwh * CO2_KG_PER_KWH);
    tracing::debug!(%class, consumption = consumption.kwh, displayed_kwh, "chain prediction");

    Ok(ChainPrediction {
        class_index: class.index(),
        class,
        consumption_kwh: consumption.kwh,
        displayed_kwh,
        co2_kg,
    })
}
