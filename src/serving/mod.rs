//! Prediction serving: artifacts on disk → immutable contexts → services.
//!
//! Loading happens once, through a [`ModelSlot`]; request handlers only ever
//! read the published context, so there is no locking on the hot path.

pub mod artifacts;
pub mod chain;
mod context;
mod readiness;
mod service;

pub use artifacts::{ArtifactSet, LoadOptions};
pub use chain::{predict_chain, ChainPrediction};
pub use context::{ClassPrediction, ClassifierContext, ConsumptionPrediction, RegressorContext};
pub use readiness::{ModelSlot, ModelState};
pub use service::{
    ClassifierResponse, ClassifierService, PredictionService, Predictor, RegressorResponse,
    RegressorService,
};
