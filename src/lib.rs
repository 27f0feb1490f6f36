//! dpe-predict: feature encoding and prediction serving for DPE energy labels.
//!
//! Two models answer two questions about a dwelling:
//!
//! - a random forest predicts its DPE class (index 0 = G … 6 = A);
//! - a linear regression estimates its annual energy consumption, given the
//!   same attributes plus that class.
//!
//! Both share one encoding pipeline parameterized by an
//! [`encoding::EncoderConfig`], and both are served through immutable
//! contexts published once behind a readiness gate.
//!
//! # Quick Start
//!
//! ```
//! use dpe_predict::encoding::{AlignMode, EncoderConfig, FeatureEncoder, FeatureRecord, TrainingSchema};
//! use dpe_predict::prelude::*;
//! use dpe_predict::serving::ClassifierContext;
//!
//! let schema = TrainingSchema::new(vec![
//!     "surface_habitable_logement".to_string(),
//!     "qualite_isolation_murs".to_string(),
//! ]).unwrap();
//!
//! // Small dwellings with poor insulation are class F, large well-insulated ones B.
//! let x = Matrix::from_vec(4, 2, vec![
//!     35.0, 0.0,
//!     42.0, 1.0,
//!     160.0, 3.0,
//!     175.0, 2.0,
//! ]).unwrap();
//! let mut forest = RandomForestClassifier::new(5).with_random_state(42);
//! forest.fit(&x, &[1, 1, 5, 5]).unwrap();
//!
//! let encoder = FeatureEncoder::new(EncoderConfig::classifier()).unwrap();
//! let context = ClassifierContext::new(encoder, schema, forest, AlignMode::Lenient).unwrap();
//!
//! let record = FeatureRecord::new()
//!     .with("surface_habitable_logement", 38.0)
//!     .with("qualite_isolation_murs", "Insuffisante");
//! let prediction = context.predict(&record).unwrap();
//! assert!(prediction.class_index <= 6);
//! ```
//!
//! # Modules
//!
//! - [`encoding`]: records, vocabularies, encoder configs, schema alignment
//! - [`serving`]: artifacts, contexts, readiness, services, two-stage chain
//! - [`tree`]: decision tree and random forest classifiers
//! - [`linear_model`]: ordinary least squares (optionally ridge-penalized)
//! - [`preprocessing`]: imputer and standard scaler
//! - [`primitives`]: row-major `Matrix`
//! - [`dpe`]: DPE classes and display constants

pub mod dpe;
pub mod encoding;
pub mod error;
pub mod linear_model;
pub mod prelude;
pub mod preprocessing;
pub mod primitives;
pub mod serving;
pub mod traits;
pub mod tree;

pub use dpe::DpeClass;
pub use error::{DpeError, Result};
pub use traits::{Classifier, Regressor, Transformer};
