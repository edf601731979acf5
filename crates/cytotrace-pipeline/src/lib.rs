//! cytotrace training and evaluation pipeline
//!
//! Loads the cell-nuclei dataset, fits the feature scaler and logistic
//! classifier, reports held-out metrics, and persists the artifact pair that
//! `cytotrace-model` serves predictions from.
//!
//! # Modules
//!
//! - [`config`]: YAML configuration loading
//! - [`dataset`]: CSV dataset loader
//! - [`profile`]: per-feature ranges, input defaults, radar series
//! - [`training`]: split, classifier fitting, metrics, and the training driver
//! - [`evaluation`]: re-scoring the held-out split through persisted artifacts

pub mod config;
pub mod dataset;
pub mod evaluation;
pub mod profile;
pub mod training;

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::dataset::{Dataset, DatasetLoader, Sample};
    pub use crate::evaluation::{evaluate, EvaluationReport};
    pub use crate::profile::{FeatureProfile, RadarSeries};
    pub use crate::training::metrics::{ClassificationReport, ValidationMetrics};
    pub use crate::training::trainer::{train, train_on_dataset, TrainingOutcome};
    pub use cytotrace_core::{Diagnosis, FeatureVector, PipelineConfig, Prediction};
    pub use cytotrace_model::Predictor;
}
