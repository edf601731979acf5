//! Re-scores the held-out split through persisted artifacts.
//!
//! The split is a pure function of the dataset and configuration, so the same
//! test rows can be recovered after training and pushed through a
//! [`Predictor`] loaded from disk. A fingerprint check guards against scoring
//! artifacts against a dataset or split they were not trained on.

use cytotrace_core::{CytoError, PipelineConfig, Result};
use cytotrace_model::Predictor;
use serde::{Deserialize, Serialize};

use crate::dataset::{Dataset, DatasetLoader};
use crate::training::metrics::{
    compute_validation_metrics, ClassificationReport, ValidationMetrics,
};
use crate::training::split::train_test_split;
use crate::training::trainer::run_fingerprint;

/// Held-out metrics computed from persisted artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub fingerprint: String,
    pub test_size: usize,
    pub metrics: ValidationMetrics,
    pub classification_report: ClassificationReport,
}

/// Load the dataset and artifacts named by `config` and score the test split.
///
/// # Errors
///
/// Returns [`CytoError::ArtifactMismatch`] if the artifacts were trained on a
/// different dataset or split configuration.
pub fn evaluate(config: &PipelineConfig) -> Result<EvaluationReport> {
    config.validate()?;
    let dataset = DatasetLoader::load(&config.dataset_path)?;
    let predictor = Predictor::load(&config.artifact_dir)?;
    let report = evaluate_with(&predictor, &dataset, config)?;
    tracing::info!(
        fingerprint = %report.fingerprint,
        test_size = report.test_size,
        accuracy = report.metrics.accuracy,
        "Evaluation finished"
    );
    Ok(report)
}

/// Score `dataset`'s test split with an already-loaded predictor.
pub fn evaluate_with(
    predictor: &Predictor,
    dataset: &Dataset,
    config: &PipelineConfig,
) -> Result<EvaluationReport> {
    let expected = run_fingerprint(dataset.source_digest(), config);
    if let Some(actual) = predictor.fingerprint() {
        if actual != expected {
            return Err(CytoError::ArtifactMismatch(format!(
                "artifacts were trained with fingerprint {actual}, \
                 current dataset and split give {expected}"
            )));
        }
    }

    let split = train_test_split(
        &dataset.labels(),
        config.test_ratio,
        config.seed,
        config.stratify,
    )?;

    let samples = dataset.samples();
    let mut predictions = Vec::with_capacity(split.test.len());
    let mut labels = Vec::with_capacity(split.test.len());
    for &i in &split.test {
        let sample = &samples[i];
        let prediction = predictor.predict(&sample.features)?;
        predictions.push(prediction.diagnosis.as_label());
        labels.push(sample.diagnosis.as_label());
    }

    let metrics = compute_validation_metrics(&predictions, &labels);
    let classification_report = ClassificationReport::from_confusion(&metrics.confusion);
    Ok(EvaluationReport {
        fingerprint: expected,
        test_size: split.test.len(),
        metrics,
        classification_report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::synthetic_csv;
    use crate::training::trainer::train_on_dataset;
    use cytotrace_core::ClassifierConfig;

    fn config() -> PipelineConfig {
        PipelineConfig {
            classifier: ClassifierConfig {
                max_epochs: 500,
                ..ClassifierConfig::default()
            },
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_evaluation_matches_training_metrics() {
        let dataset = DatasetLoader::load_from_bytes(synthetic_csv(100, 3).as_bytes()).unwrap();
        let outcome = train_on_dataset(&dataset, &config()).unwrap();
        let predictor = Predictor::from_pair(outcome.artifacts.clone()).unwrap();

        let report = evaluate_with(&predictor, &dataset, &config()).unwrap();
        assert_eq!(report.fingerprint, outcome.artifacts.fingerprint);
        assert_eq!(report.test_size, outcome.split.test.len());
        assert_eq!(report.metrics, outcome.metrics);
    }

    #[test]
    fn test_evaluation_rejects_other_split() {
        let dataset = DatasetLoader::load_from_bytes(synthetic_csv(60, 3).as_bytes()).unwrap();
        let outcome = train_on_dataset(&dataset, &config()).unwrap();
        let predictor = Predictor::from_pair(outcome.artifacts).unwrap();

        let reseeded = PipelineConfig {
            seed: 1,
            ..config()
        };
        let err = evaluate_with(&predictor, &dataset, &reseeded).unwrap_err();
        assert!(matches!(err, CytoError::ArtifactMismatch(_)));
    }

    #[test]
    fn test_evaluation_rejects_other_dataset() {
        let dataset = DatasetLoader::load_from_bytes(synthetic_csv(60, 3).as_bytes()).unwrap();
        let other = DatasetLoader::load_from_bytes(synthetic_csv(60, 4).as_bytes()).unwrap();
        let outcome = train_on_dataset(&dataset, &config()).unwrap();
        let predictor = Predictor::from_pair(outcome.artifacts).unwrap();

        assert!(matches!(
            evaluate_with(&predictor, &other, &config()),
            Err(CytoError::ArtifactMismatch(_))
        ));
    }

    #[test]
    fn test_evaluate_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let data_path = dir.path().join("data.csv");
        std::fs::write(&data_path, synthetic_csv(80, 9)).unwrap();
        let config = PipelineConfig {
            dataset_path: data_path,
            artifact_dir: dir.path().join("model"),
            ..config()
        };

        let outcome = crate::training::trainer::train(&config).unwrap();
        let report = evaluate(&config).unwrap();
        assert_eq!(report.metrics, outcome.metrics);
    }
}
