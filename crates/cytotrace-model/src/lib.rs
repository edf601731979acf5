//! Fitted artifacts and the inference pipeline for cytotrace.
//!
//! A training run produces two artifacts that are only meaningful together:
//! a [`FeatureScaler`] and a [`LogisticClassifier`]. Both are plain named
//! structs persisted as versioned JSON (see [`artifacts`]). [`Predictor`]
//! reloads the pair and reproduces the training-time scaling before calling
//! the classifier.
//!
//! # Modules
//!
//! - [`scaler`]: per-feature standardisation / min-max scaling
//! - [`classifier`]: binary logistic classifier over the scaled features
//! - [`artifacts`]: artifact envelope, persistence, and pair validation
//! - [`predictor`]: the inference entry point

pub mod artifacts;
pub mod classifier;
pub mod predictor;
pub mod scaler;

pub use artifacts::{load_artifacts, save_artifacts, ArtifactKind, ArtifactPair, FORMAT_VERSION};
pub use classifier::LogisticClassifier;
pub use predictor::Predictor;
pub use scaler::{FeatureScaler, ScalerParams};
