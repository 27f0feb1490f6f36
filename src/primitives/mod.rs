//! Core compute primitives.
//!
//! Prediction works on single rows (`&[f32]`); the [`Matrix`] type is only
//! needed when fitting models.

mod matrix;

pub use matrix::Matrix;
