//! Training pipeline.
//!
//! Splits the loaded dataset, fits the scaler on the training partition,
//! fits the logistic classifier on the scaled training rows, and scores the
//! held-out partition.

pub mod fit;
pub mod metrics;
pub mod split;
pub mod trainer;
