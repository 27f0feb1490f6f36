use crate::error::{DpeError, Result};
use crate::primitives::Matrix;
use crate::traits::Transformer;
use serde::{Deserialize, Serialize};

/// Standardizes features by removing mean and scaling to unit variance.
///
/// The standard score of a sample x is: z = (x - mean) / std
///
/// Columns whose training std is (near) zero are only centered.
///
/// # Example
///
/// ```
/// use dpe_predict::prelude::*;
///
/// let data = Matrix::from_vec(3, 2, vec![
///     0.0, 0.0,
///     1.0, 10.0,
///     2.0, 20.0,
/// ]).expect("valid matrix dimensions");
///
/// let mut scaler = StandardScaler::new();
/// scaler.fit(&data).expect("fit should succeed");
///
/// let z = scaler.transform_row(&[1.0, 10.0]).expect("fitted");
/// assert!(z.iter().all(|v| v.abs() < 1e-6));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Mean of each feature (computed during fit).
    mean: Option<Vec<f32>>,
    /// Standard deviation of each feature (computed during fit).
    std: Option<Vec<f32>>,
    /// Whether to center the data (subtract mean).
    with_mean: bool,
    /// Whether to scale the data (divide by std).
    with_std: bool,
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self::new()
    }
}

impl StandardScaler {
    /// Creates a new `StandardScaler`; centering and scaling both enabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            mean: None,
            std: None,
            with_mean: true,
            with_std: true,
        }
    }

    /// Builds a fitted scaler from known statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the two vectors differ in length.
    pub fn from_stats(mean: Vec<f32>, std: Vec<f32>) -> Result<Self> {
        if mean.len() != std.len() {
            return Err(DpeError::dimension_mismatch("scaler std", mean.len(), std.len()));
        }
        Ok(Self {
            mean: Some(mean),
            std: Some(std),
            ..Self::new()
        })
    }

    /// Sets whether to center the data by subtracting the mean.
    #[must_use]
    pub fn with_mean(mut self, with_mean: bool) -> Self {
        self.with_mean = with_mean;
        self
    }

    /// Sets whether to scale the data by dividing by standard deviation.
    #[must_use]
    pub fn with_std(mut self, with_std: bool) -> Self {
        self.with_std = with_std;
        self
    }

    /// Per-feature means, `None` before fit.
    #[must_use]
    pub fn mean(&self) -> Option<&[f32]> {
        self.mean.as_deref()
    }

    /// Per-feature standard deviations, `None` before fit.
    #[must_use]
    pub fn std(&self) -> Option<&[f32]> {
        self.std.as_deref()
    }

    /// Number of features seen during fit.
    #[must_use]
    pub fn n_features(&self) -> Option<usize> {
        self.mean.as_ref().map(Vec::len)
    }

    /// Returns true if the scaler has been fitted.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.mean.is_some()
    }

    pub(crate) fn validate(&self) -> Result<()> {
        match (&self.mean, &self.std) {
            (Some(mean), Some(std)) if mean.len() == std.len() => {
                if mean.iter().chain(std).all(|v| v.is_finite()) {
                    Ok(())
                } else {
                    Err(DpeError::format("scaler has non-finite statistics"))
                }
            }
            (Some(_), Some(_)) => Err(DpeError::format("scaler mean and std lengths differ")),
            _ => Err(DpeError::format("scaler is not fitted")),
        }
    }
}

impl Transformer for StandardScaler {
    /// Computes the mean and population standard deviation of each feature.
    fn fit(&mut self, x: &Matrix) -> Result<()> {
        let (n_samples, n_features) = x.shape();
        if n_samples == 0 {
            return Err(DpeError::empty_input("cannot fit with zero samples"));
        }

        let n = n_samples as f32;
        let mut mean = Vec::with_capacity(n_features);
        let mut std = Vec::with_capacity(n_features);
        for j in 0..n_features {
            let column = x.column(j);
            let mu = column.iter().sum::<f32>() / n;
            let var = column.iter().map(|v| (v - mu).powi(2)).sum::<f32>() / n;
            mean.push(mu);
            std.push(var.sqrt());
        }

        self.mean = Some(mean);
        self.std = Some(std);
        Ok(())
    }

    fn transform_row(&self, row: &[f32]) -> Result<Vec<f32>> {
        let (Some(mean), Some(std)) = (&self.mean, &self.std) else {
            return Err(DpeError::Prediction("scaler is not fitted".into()));
        };
        if row.len() != mean.len() {
            return Err(DpeError::dimension_mismatch("scaler features", mean.len(), row.len()));
        }

        Ok(row
            .iter()
            .zip(mean.iter().zip(std))
            .map(|(&v, (&mu, &sigma))| {
                let mut val = v;
                if self.with_mean {
                    val -= mu;
                }
                if self.with_std && sigma > 1e-10 {
                    val /= sigma;
                }
                val
            })
            .collect())
    }
}
