//! Linear models for regression.
//!
//! Ordinary Least Squares with an optional L2 penalty, solved through the
//! normal equations.

use crate::error::{DpeError, Result};
use crate::primitives::Matrix;
use crate::traits::Regressor;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Ordinary Least Squares (OLS) linear regression.
///
/// ```text
/// y = X β + b
/// ```
///
/// # Solver
///
/// Normal equations `β = (XᵀX + αI)⁻¹ Xᵀy` via Cholesky decomposition. With
/// `α = 0` (the default) this is plain OLS; the intercept is never penalized.
///
/// # Examples
///
/// ```
/// use dpe_predict::prelude::*;
///
/// // y = 2x + 1
/// let x = Matrix::from_vec(4, 1, vec![1.0, 2.0, 3.0, 4.0]).expect("4x1 matrix");
/// let y = vec![3.0, 5.0, 7.0, 9.0];
///
/// let mut model = LinearRegression::new();
/// model.fit(&x, &y).expect("well-posed system");
///
/// let pred = model.predict_row(&[5.0]).expect("fitted");
/// assert!((pred - 11.0).abs() < 1e-3);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegression {
    /// Coefficients for features (excluding intercept).
    coefficients: Option<Vec<f32>>,
    /// Intercept (bias) term.
    intercept: f32,
    /// Whether to fit an intercept.
    fit_intercept: bool,
    /// L2 penalty added to the diagonal of `XᵀX`.
    #[serde(default)]
    alpha: f32,
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearRegression {
    /// Creates a new `LinearRegression` with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: 0.0,
            fit_intercept: true,
            alpha: 0.0,
        }
    }

    /// Builds an already-fitted model from known parameters.
    #[must_use]
    pub fn from_parts(coefficients: Vec<f32>, intercept: f32) -> Self {
        Self {
            coefficients: Some(coefficients),
            intercept,
            fit_intercept: true,
            alpha: 0.0,
        }
    }

    /// Sets whether to fit an intercept term.
    #[must_use]
    pub fn with_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    /// Sets the L2 penalty. Negative values are treated as zero.
    ///
    /// A small penalty keeps the system solvable when indicator columns
    /// are collinear (one-hot groups that always sum to one).
    #[must_use]
    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha.max(0.0);
        self
    }

    /// Returns the coefficients (excluding intercept), `None` before fit.
    #[must_use]
    pub fn coefficients(&self) -> Option<&[f32]> {
        self.coefficients.as_deref()
    }

    /// Returns the intercept term.
    #[must_use]
    pub fn intercept(&self) -> f32 {
        self.intercept
    }

    /// Returns true if the model has been fitted.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.coefficients.is_some()
    }

    /// Coefficient of determination on `(x, y)`.
    ///
    /// # Errors
    ///
    /// Returns an error if prediction fails or `y` is empty.
    pub fn score(&self, x: &Matrix, y: &[f32]) -> Result<f32> {
        if y.is_empty() {
            return Err(DpeError::empty_input("targets"));
        }
        let y_pred = self.predict(x)?;
        let mean = y.iter().sum::<f32>() / y.len() as f32;
        let ss_res: f32 = y.iter().zip(&y_pred).map(|(t, p)| (t - p).powi(2)).sum();
        let ss_tot: f32 = y.iter().map(|t| (t - mean).powi(2)).sum();
        if ss_tot == 0.0 {
            return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
        }
        Ok(1.0 - ss_res / ss_tot)
    }

    /// Saves the model as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Loads a fitted model saved with [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be read or parsed, or the model
    /// was saved before fitting.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let model: Self = serde_json::from_str(&fs::read_to_string(path)?)?;
        match &model.coefficients {
            None => Err(DpeError::format("linear model is not fitted")),
            Some(coef) if coef.iter().any(|c| !c.is_finite()) || !model.intercept.is_finite() => {
                Err(DpeError::format("linear model has non-finite parameters"))
            }
            Some(_) => Ok(model),
        }
    }

    /// Adds an intercept column of ones to the design matrix.
    fn add_intercept_column(x: &Matrix) -> Result<Matrix> {
        let (n_rows, n_cols) = x.shape();
        let mut data = Vec::with_capacity(n_rows * (n_cols + 1));
        for i in 0..n_rows {
            data.push(1.0);
            data.extend_from_slice(x.row(i));
        }
        Ok(Matrix::from_vec(n_rows, n_cols + 1, data)?)
    }
}

impl Regressor for LinearRegression {
    /// Fits the model using the normal equations.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Input dimensions don't match
    /// - Not enough samples for the number of features (underdetermined system)
    /// - `XᵀX + αI` is not positive definite
    fn fit(&mut self, x: &Matrix, y: &[f32]) -> Result<()> {
        let (n_samples, n_features) = x.shape();

        if n_samples != y.len() {
            return Err(DpeError::dimension_mismatch("samples", n_samples, y.len()));
        }
        if n_samples == 0 {
            return Err(DpeError::empty_input("cannot fit with zero samples"));
        }

        let required_samples = n_features + usize::from(self.fit_intercept);
        if self.alpha == 0.0 && n_samples < required_samples {
            return Err(DpeError::Other(format!(
                "Insufficient samples: {n_samples} samples for {required_samples} parameters; \
                 set an L2 penalty or collect more training data"
            )));
        }

        let x_design = if self.fit_intercept {
            Self::add_intercept_column(x)?
        } else {
            x.clone()
        };

        let xt = x_design.transpose();
        let mut xtx = xt.matmul(&x_design)?;
        let first_penalized = usize::from(self.fit_intercept);
        for i in first_penalized..xtx.n_rows() {
            xtx.set(i, i, xtx.get(i, i) + self.alpha);
        }
        let xty = xt.matvec(y)?;

        let beta = xtx.cholesky_solve(&xty).map_err(|e| {
            DpeError::Other(format!("{e}; the design matrix is likely collinear"))
        })?;

        if self.fit_intercept {
            self.intercept = beta[0];
            self.coefficients = Some(beta[1..].to_vec());
        } else {
            self.intercept = 0.0;
            self.coefficients = Some(beta);
        }

        tracing::debug!(n_samples, n_features, alpha = self.alpha, "linear model fitted");
        Ok(())
    }

    fn predict_row(&self, row: &[f32]) -> Result<f32> {
        let coefficients = self
            .coefficients
            .as_ref()
            .ok_or_else(|| DpeError::Prediction("linear model is not fitted".into()))?;
        if row.len() != coefficients.len() {
            return Err(DpeError::dimension_mismatch(
                "features",
                coefficients.len(),
                row.len(),
            ));
        }
        let dot: f32 = coefficients.iter().zip(row).map(|(c, v)| c * v).sum();
        Ok(dot + self.intercept)
    }

    fn n_features(&self) -> Option<usize> {
        self.coefficients.as_ref().map(Vec::len)
    }
}
