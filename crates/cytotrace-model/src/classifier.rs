//! Binary logistic classifier over scaled features.
//!
//! ```text
//! z = intercept + Σ coefficients[i] · scaled[i]
//! P(malignant) = σ(z)
//! ```
//!
//! Fitting lives in the pipeline crate; this type only holds the learned
//! parameters and evaluates them.

use cytotrace_core::{
    ClassProbabilities, CytoError, Diagnosis, Prediction, Result, FEATURE_COUNT, FEATURE_NAMES,
};
use serde::{Deserialize, Serialize};

use crate::scaler::check_feature_names;

/// Fitted logistic classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticClassifier {
    /// Feature order the coefficients were fitted in.
    pub feature_names: Vec<String>,
    /// One weight per scaled feature.
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    /// Class for label 0 and label 1.
    pub classes: [Diagnosis; 2],
}

/// Numerically stable logistic function.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl LogisticClassifier {
    /// Wrap learned parameters.
    ///
    /// # Errors
    ///
    /// Returns [`CytoError::Training`] if the coefficient count is wrong or
    /// any parameter is not finite.
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Result<Self> {
        let classifier = Self {
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            coefficients,
            intercept,
            classes: Diagnosis::CLASSES,
        };
        classifier
            .check_parameters()
            .map_err(|e| CytoError::Training(e.to_string()))?;
        Ok(classifier)
    }

    /// Raw linear score `z` for one scaled sample.
    pub fn decision_function(&self, scaled: &[f64]) -> Result<f64> {
        if scaled.len() != self.coefficients.len() {
            return Err(CytoError::InvalidFeatures(format!(
                "classifier expects {} scaled values, got {}",
                self.coefficients.len(),
                scaled.len()
            )));
        }
        if let Some(idx) = scaled.iter().position(|v| !v.is_finite()) {
            return Err(CytoError::InvalidFeatures(format!(
                "scaled value for '{}' is not finite: {}",
                self.feature_names
                    .get(idx)
                    .map(String::as_str)
                    .unwrap_or("?"),
                scaled[idx]
            )));
        }
        let z = self.intercept
            + self
                .coefficients
                .iter()
                .zip(scaled.iter())
                .map(|(w, x)| w * x)
                .sum::<f64>();
        if !z.is_finite() {
            return Err(CytoError::InvalidFeatures(format!(
                "decision score is not finite: {z}"
            )));
        }
        Ok(z)
    }

    /// Class probabilities for one scaled sample.
    pub fn predict_proba(&self, scaled: &[f64]) -> Result<ClassProbabilities> {
        let z = self.decision_function(scaled)?;
        Ok(ClassProbabilities::from_malignant(sigmoid(z)))
    }

    /// Most likely class for one scaled sample.
    pub fn predict(&self, scaled: &[f64]) -> Result<Diagnosis> {
        Ok(self.predict_proba(scaled)?.most_likely())
    }

    /// Label plus probabilities for one scaled sample.
    pub fn predict_full(&self, scaled: &[f64]) -> Result<Prediction> {
        Ok(Prediction::from(self.predict_proba(scaled)?))
    }

    /// Check shape, values, feature order and class labels.
    pub fn validate(&self) -> Result<()> {
        check_feature_names("classifier", &self.feature_names)?;
        self.check_parameters()?;
        if self.classes != Diagnosis::CLASSES {
            return Err(CytoError::Artifact(format!(
                "classifier classes are {:?}, expected {:?}",
                self.classes,
                Diagnosis::CLASSES
            )));
        }
        Ok(())
    }

    fn check_parameters(&self) -> Result<()> {
        if self.coefficients.len() != FEATURE_COUNT {
            return Err(CytoError::Artifact(format!(
                "classifier has {} coefficients, expected {}",
                self.coefficients.len(),
                FEATURE_COUNT
            )));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|w| !w.is_finite()) {
            return Err(CytoError::Artifact(
                "classifier parameters contain non-finite values".to_string(),
            ));
        }
        Ok(())
    }
}
