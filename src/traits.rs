//! Core traits for the models and transformers used by the services.
//!
//! Serving always works one record at a time, so every trait exposes a
//! row-level entry point; the matrix-level methods are default
//! implementations on top of it.

use crate::error::{DpeError, Result};
use crate::primitives::Matrix;

/// A fitted model that maps a feature row to a class index.
///
/// # Examples
///
/// ```
/// use dpe_predict::prelude::*;
///
/// let x = Matrix::from_vec(4, 1, vec![0.0, 1.0, 10.0, 11.0]).expect("4x1 matrix");
/// let y = vec![0, 0, 1, 1];
///
/// let mut forest = RandomForestClassifier::new(5).with_random_state(7);
/// forest.fit(&x, &y).expect("fit succeeds");
/// assert_eq!(forest.predict_row(&[10.5]).expect("fitted"), 1);
/// ```
pub trait Classifier {
    /// Fits the model to training data.
    ///
    /// # Errors
    ///
    /// Returns an error if `x` and `y` disagree on the sample count or are empty.
    fn fit(&mut self, x: &Matrix, y: &[usize]) -> Result<()>;

    /// Predicts the class index of a single row.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is not fitted or the row is too short.
    fn predict_row(&self, row: &[f32]) -> Result<usize>;

    /// Number of features seen during fit, `None` before fit.
    fn n_features(&self) -> Option<usize>;

    /// Predicts every row of `x`.
    ///
    /// # Errors
    ///
    /// Propagates the first row-level failure.
    fn predict(&self, x: &Matrix) -> Result<Vec<usize>> {
        (0..x.n_rows()).map(|i| self.predict_row(x.row(i))).collect()
    }

    /// Fraction of rows predicted correctly.
    ///
    /// # Errors
    ///
    /// Returns an error if prediction fails or `y` is empty.
    fn score(&self, x: &Matrix, y: &[usize]) -> Result<f32> {
        if y.is_empty() {
            return Err(DpeError::empty_input("labels"));
        }
        let predictions = self.predict(x)?;
        let correct = predictions
            .iter()
            .zip(y.iter())
            .filter(|(pred, truth)| pred == truth)
            .count();
        Ok(correct as f32 / y.len() as f32)
    }
}

/// A fitted model that maps a feature row to a real value.
pub trait Regressor {
    /// Fits the model to training data.
    ///
    /// # Errors
    ///
    /// Returns an error if fitting fails (dimension mismatch, singular system, etc.).
    fn fit(&mut self, x: &Matrix, y: &[f32]) -> Result<()>;

    /// Predicts the target of a single row.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is not fitted or the row has the wrong width.
    fn predict_row(&self, row: &[f32]) -> Result<f32>;

    /// Number of features seen during fit, `None` before fit.
    fn n_features(&self) -> Option<usize>;

    /// Predicts every row of `x`.
    ///
    /// # Errors
    ///
    /// Propagates the first row-level failure.
    fn predict(&self, x: &Matrix) -> Result<Vec<f32>> {
        (0..x.n_rows()).map(|i| self.predict_row(x.row(i))).collect()
    }
}

/// Trait for data transformers (imputers, scalers).
pub trait Transformer {
    /// Learns the transformation parameters from `x`.
    ///
    /// # Errors
    ///
    /// Returns an error if `x` is empty.
    fn fit(&mut self, x: &Matrix) -> Result<()>;

    /// Transforms a single row with the fitted parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if not fitted or the row has the wrong width.
    fn transform_row(&self, row: &[f32]) -> Result<Vec<f32>>;

    /// Transforms every row of `x`.
    ///
    /// # Errors
    ///
    /// Propagates the first row-level failure.
    fn transform(&self, x: &Matrix) -> Result<Matrix> {
        let mut data = Vec::with_capacity(x.n_rows() * x.n_cols());
        for i in 0..x.n_rows() {
            data.extend(self.transform_row(x.row(i))?);
        }
        Matrix::from_vec(x.n_rows(), x.n_cols(), data).map_err(DpeError::from)
    }

    /// Fits and transforms in one step.
    ///
    /// # Errors
    ///
    /// Returns an error if fitting fails.
    fn fit_transform(&mut self, x: &Matrix) -> Result<Matrix> {
        self.fit(x)?;
        self.transform(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Adds a fixed offset after fit; enough to exercise the default methods.
    struct MockTransformer {
        offset: Option<f32>,
    }

    impl Transformer for MockTransformer {
        fn fit(&mut self, x: &Matrix) -> Result<()> {
            if x.n_rows() == 0 {
                return Err(DpeError::empty_input("x"));
            }
            self.offset = Some(1.0);
            Ok(())
        }

        fn transform_row(&self, row: &[f32]) -> Result<Vec<f32>> {
            let offset = self.offset.ok_or("not fitted")?;
            Ok(row.iter().map(|v| v + offset).collect())
        }
    }

    struct Threshold;

    impl Classifier for Threshold {
        fn fit(&mut self, _x: &Matrix, _y: &[usize]) -> Result<()> {
            Ok(())
        }

        fn predict_row(&self, row: &[f32]) -> Result<usize> {
            Ok(usize::from(row[0] > 0.5))
        }

        fn n_features(&self) -> Option<usize> {
            Some(1)
        }
    }

    #[test]
    fn test_transform_before_fit_fails() {
        let t = MockTransformer { offset: None };
        let x = Matrix::from_vec(1, 2, vec![1.0, 2.0]).unwrap();
        assert!(t.transform(&x).is_err());
    }

    #[test]
    fn test_fit_transform_default() {
        let mut t = MockTransformer { offset: None };
        let x = Matrix::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let out = t.fit_transform(&x).unwrap();
        assert_eq!(out.as_slice(), &[2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_fit_empty_fails() {
        let mut t = MockTransformer { offset: None };
        assert!(t.fit(&Matrix::zeros(0, 2)).is_err());
    }

    #[test]
    fn test_classifier_score_default() {
        let x = Matrix::from_vec(4, 1, vec![0.0, 1.0, 0.2, 0.9]).unwrap();
        let score = Threshold.score(&x, &[0, 1, 1, 1]).unwrap();
        assert!((score - 0.75).abs() < 1e-6);
        assert!(Threshold.score(&x, &[]).is_err());
    }
}
