//! Logistic classifier fitting on candle tensors.
//!
//! Minimises the regularised logistic objective
//!
//! ```text
//! L(w, b) = mean(softplus(z) - y·z) + ||w||² / (2·C·n),   z = X·w + b
//! ```
//!
//! with full-batch AdamW. Parameters start at zero and every step sees the
//! whole training set, so a fit is a pure function of its inputs.

use candle_core::{DType, Device, Tensor, Var};
use candle_nn::{AdamW, Optimizer, ParamsAdamW};
use cytotrace_core::{ClassifierConfig, CytoError, Result, FEATURE_COUNT};
use cytotrace_model::LogisticClassifier;
use serde::{Deserialize, Serialize};

/// How the optimisation ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitSummary {
    pub epochs: usize,
    pub final_loss: f64,
    pub converged: bool,
}

fn candle_err(context: &'static str) -> impl Fn(candle_core::Error) -> CytoError {
    move |e| CytoError::Training(format!("{context}: {e}"))
}

/// Fit a classifier on already-scaled rows and 0/1 labels.
///
/// # Errors
///
/// Returns [`CytoError::Training`] for empty or mismatched inputs, labels
/// other than 0/1, tensor failures, or a diverging loss.
pub fn fit_classifier(
    features: &[[f64; FEATURE_COUNT]],
    labels: &[u8],
    config: &ClassifierConfig,
) -> Result<(LogisticClassifier, FitSummary)> {
    if features.is_empty() {
        return Err(CytoError::Training("no training rows".to_string()));
    }
    if features.len() != labels.len() {
        return Err(CytoError::Training(format!(
            "{} feature rows but {} labels",
            features.len(),
            labels.len()
        )));
    }
    if labels.iter().any(|&l| l > 1) {
        return Err(CytoError::Training("labels must be 0 or 1".to_string()));
    }

    let device = Device::Cpu;
    let n = features.len();

    let flat: Vec<f64> = features.iter().flat_map(|r| r.iter().copied()).collect();
    let x = Tensor::from_vec(flat, (n, FEATURE_COUNT), &device)
        .map_err(candle_err("Failed to build feature tensor"))?;
    let targets: Vec<f64> = labels.iter().map(|&l| f64::from(l)).collect();
    let y = Tensor::from_vec(targets, n, &device)
        .map_err(candle_err("Failed to build label tensor"))?;

    let weights = Var::zeros((FEATURE_COUNT, 1), DType::F64, &device)
        .map_err(candle_err("Failed to create weights"))?;
    let bias =
        Var::zeros(1, DType::F64, &device).map_err(candle_err("Failed to create intercept"))?;

    let mut optimizer = AdamW::new(
        vec![weights.clone(), bias.clone()],
        ParamsAdamW {
            lr: config.learning_rate,
            weight_decay: 0.0,
            ..Default::default()
        },
    )
    .map_err(candle_err("Failed to create optimizer"))?;

    let penalty_scale = 1.0 / (2.0 * config.inverse_regularization * n as f64);
    let mut previous = f64::INFINITY;
    let mut summary = FitSummary {
        epochs: 0,
        final_loss: f64::NAN,
        converged: false,
    };

    for epoch in 0..config.max_epochs {
        let logits = x
            .matmul(weights.as_tensor())
            .and_then(|t| t.squeeze(1))
            .and_then(|t| t.broadcast_add(bias.as_tensor()))
            .map_err(candle_err("Forward pass failed"))?;
        let data_loss = logistic_loss(&logits, &y).map_err(candle_err("Loss computation failed"))?;
        let penalty = weights
            .as_tensor()
            .sqr()
            .and_then(|t| t.sum_all())
            .and_then(|t| t.affine(penalty_scale, 0.0))
            .map_err(candle_err("Penalty computation failed"))?;
        let loss = data_loss
            .add(&penalty)
            .map_err(candle_err("Loss computation failed"))?;

        let value = loss
            .to_scalar::<f64>()
            .map_err(candle_err("Loss scalar failed"))?;
        if !value.is_finite() {
            return Err(CytoError::Training(format!(
                "loss diverged at epoch {}",
                epoch + 1
            )));
        }

        optimizer
            .backward_step(&loss)
            .map_err(candle_err("Backward step failed"))?;

        summary.epochs = epoch + 1;
        summary.final_loss = value;

        if (previous - value).abs() < config.tolerance {
            summary.converged = true;
            break;
        }
        previous = value;

        if summary.epochs % 500 == 0 {
            tracing::debug!(epoch = summary.epochs, loss = value, "Fitting classifier");
        }
    }

    let coefficients: Vec<f64> = weights
        .as_tensor()
        .flatten_all()
        .and_then(|t| t.to_vec1())
        .map_err(candle_err("Failed to read coefficients"))?;
    let intercept = bias
        .as_tensor()
        .to_vec1::<f64>()
        .map_err(candle_err("Failed to read intercept"))?
        .first()
        .copied()
        .unwrap_or(0.0);

    tracing::info!(
        epochs = summary.epochs,
        loss = summary.final_loss,
        converged = summary.converged,
        "Classifier fitted"
    );

    Ok((LogisticClassifier::new(coefficients, intercept)?, summary))
}

/// Mean logistic loss in the overflow-free form
/// `max(z, 0) - z·y + ln(1 + e^{-|z|})`.
fn logistic_loss(logits: &Tensor, targets: &Tensor) -> candle_core::Result<Tensor> {
    let softplus = logits
        .relu()?
        .add(&logits.abs()?.neg()?.exp()?.affine(1.0, 1.0)?.log()?)?;
    softplus.sub(&logits.mul(targets)?)?.mean_all()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two well separated blobs along features 0 and 1.
    fn blobs() -> (Vec<[f64; FEATURE_COUNT]>, Vec<u8>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..60 {
            let label = (i % 2) as u8;
            let sign = if label == 1 { 1.0 } else { -1.0 };
            let jitter = ((i * 7) % 11) as f64 / 11.0 - 0.5;
            let mut row = [0.0; FEATURE_COUNT];
            row[0] = sign * 1.5 + jitter;
            row[1] = sign * 1.0 - jitter * 0.5;
            row[2] = jitter;
            rows.push(row);
            labels.push(label);
        }
        (rows, labels)
    }

    fn quick_config() -> ClassifierConfig {
        ClassifierConfig {
            max_epochs: 400,
            ..ClassifierConfig::default()
        }
    }

    #[test]
    fn test_fit_separates_blobs() {
        let (rows, labels) = blobs();
        let (classifier, summary) = fit_classifier(&rows, &labels, &quick_config()).unwrap();
        assert!(summary.epochs > 0);
        assert!(summary.final_loss < 0.4);
        assert!(classifier.coefficients[0] > 0.0);

        let correct = rows
            .iter()
            .zip(labels.iter())
            .filter(|(r, &l)| classifier.predict(&r[..]).unwrap().as_label() == l)
            .count();
        assert_eq!(correct, rows.len());
    }

    #[test]
    fn test_fit_is_deterministic() {
        let (rows, labels) = blobs();
        let (a, _) = fit_classifier(&rows, &labels, &quick_config()).unwrap();
        let (b, _) = fit_classifier(&rows, &labels, &quick_config()).unwrap();
        assert!((a.intercept - b.intercept).abs() < 1e-12);
        for (x, y) in a.coefficients.iter().zip(b.coefficients.iter()) {
            assert!((x - y).abs() < 1e-12);
        }
    }

    #[test]
    fn test_regularisation_shrinks_weights() {
        let (rows, labels) = blobs();
        let strong = ClassifierConfig {
            inverse_regularization: 0.01,
            ..quick_config()
        };
        let (weak_fit, _) = fit_classifier(&rows, &labels, &quick_config()).unwrap();
        let (strong_fit, _) = fit_classifier(&rows, &labels, &strong).unwrap();
        let norm = |c: &LogisticClassifier| c.coefficients.iter().map(|w| w * w).sum::<f64>();
        assert!(norm(&strong_fit) < norm(&weak_fit));
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let (rows, labels) = blobs();
        assert!(fit_classifier(&[], &[], &quick_config()).is_err());
        assert!(fit_classifier(&rows, &labels[1..], &quick_config()).is_err());
        let mut bad = labels.clone();
        bad[0] = 2;
        assert!(fit_classifier(&rows, &bad, &quick_config()).is_err());
    }
}
