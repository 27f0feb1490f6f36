//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use dpe_predict::prelude::*;
//! ```

pub use crate::dpe::DpeClass;
pub use crate::error::DpeError;
pub use crate::linear_model::LinearRegression;
pub use crate::preprocessing::{ImputeStrategy, SimpleImputer, StandardScaler};
pub use crate::primitives::Matrix;
pub use crate::traits::{Classifier, Regressor, Transformer};
pub use crate::tree::{DecisionTreeClassifier, RandomForestClassifier};
