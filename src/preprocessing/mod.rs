//! Numeric preprocessing applied before the regressor.
//!
//! Missing values are filled by [`SimpleImputer`], then [`StandardScaler`]
//! rescales each column with its training mean and std. Both persist as JSON.
//!
//! # Example
//!
//! ```
//! use dpe_predict::prelude::*;
//!
//! let data = Matrix::from_vec(4, 2, vec![
//!     2.5, 60.0,
//!     f32::NAN, 80.0,
//!     2.7, 100.0,
//!     2.6, f32::NAN,
//! ]).expect("valid matrix dimensions");
//!
//! let mut imputer = SimpleImputer::new(ImputeStrategy::Median);
//! let filled = imputer.fit_transform(&data).expect("fit_transform should succeed");
//! assert!(filled.as_slice().iter().all(|v| v.is_finite()));
//!
//! let mut scaler = StandardScaler::new();
//! let scaled = scaler.fit_transform(&filled).expect("fit_transform should succeed");
//! assert!(scaled.get(0, 0).abs() < 2.0);
//! ```

mod imputer;
mod scaler;

pub use imputer::{ImputeStrategy, SimpleImputer};
pub use scaler::StandardScaler;

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

pub(crate) fn save_json<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

pub(crate) fn load_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

impl StandardScaler {
    /// Saves the fitted statistics as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        save_json(self, path)
    }

    /// Loads a scaler saved with [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unreadable, unparsable, or unfitted.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let scaler: Self = load_json(path)?;
        scaler.validate()?;
        Ok(scaler)
    }
}

impl SimpleImputer {
    /// Saves the fill values as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        save_json(self, path)
    }

    /// Loads an imputer saved with [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unreadable, unparsable, or unfitted.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let imputer: Self = load_json(path)?;
        imputer.validate()?;
        Ok(imputer)
    }
}
