use crate::error::{DpeError, Result};
use crate::primitives::Matrix;
use crate::traits::Transformer;
use serde::{Deserialize, Serialize};

/// Statistic used to fill missing values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImputeStrategy {
    /// Column mean
    #[default]
    Mean,
    /// Column median
    Median,
}

/// Replaces missing values (`NaN`) with a per-column statistic learned at fit time.
///
/// # Example
///
/// ```
/// use dpe_predict::prelude::*;
///
/// let data = Matrix::from_vec(3, 1, vec![1.0, f32::NAN, 5.0]).expect("3x1 matrix");
/// let mut imputer = SimpleImputer::new(ImputeStrategy::Mean);
/// imputer.fit(&data).expect("fit should succeed");
///
/// assert_eq!(imputer.transform_row(&[f32::NAN]).expect("fitted"), vec![3.0]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimpleImputer {
    strategy: ImputeStrategy,
    statistics: Option<Vec<f32>>,
}

impl Default for SimpleImputer {
    fn default() -> Self {
        Self::new(ImputeStrategy::default())
    }
}

impl SimpleImputer {
    /// Creates an unfitted imputer.
    #[must_use]
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            strategy,
            statistics: None,
        }
    }

    /// Builds a fitted imputer from known fill values.
    #[must_use]
    pub fn from_statistics(strategy: ImputeStrategy, statistics: Vec<f32>) -> Self {
        Self {
            strategy,
            statistics: Some(statistics),
        }
    }

    /// The configured strategy.
    #[must_use]
    pub fn strategy(&self) -> ImputeStrategy {
        self.strategy
    }

    /// Per-column fill values, `None` before fit.
    #[must_use]
    pub fn statistics(&self) -> Option<&[f32]> {
        self.statistics.as_deref()
    }

    /// Number of features seen during fit.
    #[must_use]
    pub fn n_features(&self) -> Option<usize> {
        self.statistics.as_ref().map(Vec::len)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        match &self.statistics {
            None => Err(DpeError::format("imputer is not fitted")),
            Some(stats) if stats.iter().any(|v| !v.is_finite()) => {
                Err(DpeError::format("imputer has non-finite fill values"))
            }
            Some(_) => Ok(()),
        }
    }
}

fn median(values: &mut [f32]) -> f32 {
    values.sort_by(f32::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

impl Transformer for SimpleImputer {
    /// Learns one fill value per column, ignoring `NaN`s.
    ///
    /// An all-missing column gets a fill value of zero.
    fn fit(&mut self, x: &Matrix) -> Result<()> {
        if x.n_rows() == 0 {
            return Err(DpeError::empty_input("cannot fit with zero samples"));
        }

        let mut statistics = Vec::with_capacity(x.n_cols());
        for j in 0..x.n_cols() {
            let mut observed: Vec<f32> = x.column(j).into_iter().filter(|v| !v.is_nan()).collect();
            let stat = if observed.is_empty() {
                tracing::warn!(column = j, "imputer column has no observed values, filling with 0");
                0.0
            } else {
                match self.strategy {
                    ImputeStrategy::Mean => observed.iter().sum::<f32>() / observed.len() as f32,
                    ImputeStrategy::Median => median(&mut observed),
                }
            };
            statistics.push(stat);
        }

        self.statistics = Some(statistics);
        Ok(())
    }

    fn transform_row(&self, row: &[f32]) -> Result<Vec<f32>> {
        let stats = self
            .statistics
            .as_ref()
            .ok_or_else(|| DpeError::Prediction("imputer is not fitted".into()))?;
        if row.len() != stats.len() {
            return Err(DpeError::dimension_mismatch("imputer features", stats.len(), row.len()));
        }
        Ok(row
            .iter()
            .zip(stats)
            .map(|(&v, &fill)| if v.is_nan() { fill } else { v })
            .collect())
    }
}
