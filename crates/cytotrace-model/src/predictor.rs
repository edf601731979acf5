//! Inference entry point.
//!
//! [`Predictor`] owns a validated scaler/classifier pair and is immutable
//! after construction, so one instance can be shared across threads and
//! serve any number of independent requests.

use cytotrace_core::{FeatureVector, Prediction, Result};
use std::collections::HashMap;
use std::path::Path;

use crate::artifacts::{load_artifacts, validate_compatible, ArtifactPair};
use crate::classifier::LogisticClassifier;
use crate::scaler::FeatureScaler;

/// Scales raw feature vectors and classifies them.
#[derive(Debug, Clone)]
pub struct Predictor {
    scaler: FeatureScaler,
    classifier: LogisticClassifier,
    fingerprint: Option<String>,
}

impl Predictor {
    /// Load the artifact pair persisted in `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if either artifact is missing, corrupt, or from a
    /// different training run than its partner.
    pub fn load(dir: &Path) -> Result<Self> {
        let pair = load_artifacts(dir)?;
        tracing::info!(
            dir = %dir.display(),
            fingerprint = %pair.fingerprint,
            "Predictor ready"
        );
        Self::from_pair(pair)
    }

    /// Build from an in-memory artifact pair.
    pub fn from_pair(pair: ArtifactPair) -> Result<Self> {
        validate_compatible(&pair.scaler, &pair.classifier)?;
        Ok(Self {
            scaler: pair.scaler,
            classifier: pair.classifier,
            fingerprint: Some(pair.fingerprint),
        })
    }

    /// Build from a freshly fitted scaler and classifier.
    pub fn from_parts(scaler: FeatureScaler, classifier: LogisticClassifier) -> Result<Self> {
        validate_compatible(&scaler, &classifier)?;
        Ok(Self {
            scaler,
            classifier,
            fingerprint: None,
        })
    }

    /// Classify one raw (unscaled) feature vector.
    pub fn predict(&self, features: &FeatureVector) -> Result<Prediction> {
        let scaled = self.scaler.transform(features);
        self.classifier.predict_full(&scaled)
    }

    /// Classify named raw values; every feature key must be present.
    pub fn predict_named(&self, named: &HashMap<String, f64>) -> Result<Prediction> {
        let features = FeatureVector::from_named(named)?;
        self.predict(&features)
    }

    /// Classify many raw vectors.
    pub fn predict_batch(&self, batch: &[FeatureVector]) -> Result<Vec<Prediction>> {
        batch.iter().map(|f| self.predict(f)).collect()
    }

    pub fn scaler(&self) -> &FeatureScaler {
        &self.scaler
    }

    pub fn classifier(&self) -> &LogisticClassifier {
        &self.classifier
    }

    /// Training-run fingerprint, when loaded from artifacts.
    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }
}
