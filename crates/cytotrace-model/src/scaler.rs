//! Feature scaling fitted on training rows and replayed at inference time.

use cytotrace_core::{
    CytoError, FeatureVector, Result, ScalingStrategy, FEATURE_COUNT, FEATURE_NAMES,
};
use serde::{Deserialize, Serialize};

/// Learned per-feature parameters, one entry per feature in canonical order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ScalerParams {
    /// `(x - mean) / std_dev`, population standard deviation.
    Standard { mean: Vec<f64>, std_dev: Vec<f64> },
    /// `(x - min) / (max - min)`.
    MinMax { min: Vec<f64>, max: Vec<f64> },
}

/// A fitted scaler. Immutable once fitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScaler {
    /// Feature order the parameters were fitted in.
    pub feature_names: Vec<String>,
    #[serde(flatten)]
    pub params: ScalerParams,
}

/// Spreads this small are treated as constant features and left unscaled.
const MIN_SPREAD: f64 = 1e-12;

fn divisor(spread: f64) -> f64 {
    if spread.abs() < MIN_SPREAD {
        1.0
    } else {
        spread
    }
}

impl FeatureScaler {
    /// Fit a scaler on training rows.
    ///
    /// # Errors
    ///
    /// Returns [`CytoError::Training`] when `rows` is empty.
    pub fn fit(strategy: ScalingStrategy, rows: &[[f64; FEATURE_COUNT]]) -> Result<Self> {
        if rows.is_empty() {
            return Err(CytoError::Training(
                "cannot fit a scaler on zero rows".to_string(),
            ));
        }
        let n = rows.len() as f64;

        let params = match strategy {
            ScalingStrategy::Standard => {
                let mut mean = vec![0.0; FEATURE_COUNT];
                for row in rows {
                    for (m, v) in mean.iter_mut().zip(row.iter()) {
                        *m += v;
                    }
                }
                mean.iter_mut().for_each(|m| *m /= n);

                let mut variance = vec![0.0; FEATURE_COUNT];
                for row in rows {
                    for ((var, v), m) in variance.iter_mut().zip(row.iter()).zip(mean.iter()) {
                        *var += (v - m) * (v - m);
                    }
                }
                let std_dev = variance.iter().map(|var| (var / n).sqrt()).collect();
                ScalerParams::Standard { mean, std_dev }
            }
            ScalingStrategy::MinMax => {
                let mut min = vec![f64::INFINITY; FEATURE_COUNT];
                let mut max = vec![f64::NEG_INFINITY; FEATURE_COUNT];
                for row in rows {
                    for (i, v) in row.iter().enumerate() {
                        min[i] = min[i].min(*v);
                        max[i] = max[i].max(*v);
                    }
                }
                ScalerParams::MinMax { min, max }
            }
        };

        Ok(Self {
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            params,
        })
    }

    /// The strategy these parameters implement.
    pub fn strategy(&self) -> ScalingStrategy {
        match self.params {
            ScalerParams::Standard { .. } => ScalingStrategy::Standard,
            ScalerParams::MinMax { .. } => ScalingStrategy::MinMax,
        }
    }

    /// Scale one validated feature vector.
    pub fn transform(&self, features: &FeatureVector) -> [f64; FEATURE_COUNT] {
        let mut out = *features.as_array();
        self.transform_in_place(&mut out);
        out
    }

    /// Scale raw training rows.
    pub fn transform_rows(&self, rows: &[[f64; FEATURE_COUNT]]) -> Vec<[f64; FEATURE_COUNT]> {
        rows.iter()
            .map(|row| {
                let mut out = *row;
                self.transform_in_place(&mut out);
                out
            })
            .collect()
    }

    fn transform_in_place(&self, values: &mut [f64; FEATURE_COUNT]) {
        match &self.params {
            ScalerParams::Standard { mean, std_dev } => {
                for (i, v) in values.iter_mut().enumerate() {
                    *v = (*v - mean[i]) / divisor(std_dev[i]);
                }
            }
            ScalerParams::MinMax { min, max } => {
                for (i, v) in values.iter_mut().enumerate() {
                    *v = (*v - min[i]) / divisor(max[i] - min[i]);
                }
            }
        }
    }

    /// Check shape and values of (possibly deserialized) parameters.
    ///
    /// # Errors
    ///
    /// Returns [`CytoError::Artifact`] on wrong lengths or non-finite values,
    /// and [`CytoError::ArtifactMismatch`] if the feature order differs from
    /// [`FEATURE_NAMES`].
    pub fn validate(&self) -> Result<()> {
        check_feature_names("scaler", &self.feature_names)?;
        let (a, b) = match &self.params {
            ScalerParams::Standard { mean, std_dev } => (mean, std_dev),
            ScalerParams::MinMax { min, max } => (min, max),
        };
        for v in [a, b] {
            if v.len() != FEATURE_COUNT {
                return Err(CytoError::Artifact(format!(
                    "scaler has {} parameters per statistic, expected {}",
                    v.len(),
                    FEATURE_COUNT
                )));
            }
            if v.iter().any(|x| !x.is_finite()) {
                return Err(CytoError::Artifact(
                    "scaler parameters contain non-finite values".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Verify an artifact's recorded feature order against the canonical one.
pub(crate) fn check_feature_names(artifact: &str, names: &[String]) -> Result<()> {
    if names.len() != FEATURE_COUNT {
        return Err(CytoError::ArtifactMismatch(format!(
            "{artifact} was fitted on {} features, expected {}",
            names.len(),
            FEATURE_COUNT
        )));
    }
    if let Some((i, (got, want))) = names
        .iter()
        .zip(FEATURE_NAMES.iter())
        .enumerate()
        .find(|(_, (got, want))| got.as_str() != **want)
    {
        return Err(CytoError::ArtifactMismatch(format!(
            "{artifact} feature #{i} is '{got}', expected '{want}'"
        )));
    }
    Ok(())
}
