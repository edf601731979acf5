//! Training driver: load, split, fit, score, persist.

use chrono::{DateTime, Utc};
use cytotrace_core::{CytoError, PipelineConfig, Result, ScalingStrategy};
use cytotrace_model::{save_artifacts, ArtifactPair, FeatureScaler, Predictor};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::dataset::{Dataset, DatasetLoader};
use crate::training::fit::{fit_classifier, FitSummary};
use crate::training::metrics::{
    compute_validation_metrics, ClassificationReport, ValidationMetrics,
};
use crate::training::split::{train_test_split, SplitIndices};

/// File name of the JSON report written next to the artifacts.
pub const REPORT_FILE: &str = "training_report.json";

/// Everything a training run produced.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub artifacts: ArtifactPair,
    pub split: SplitIndices,
    pub metrics: ValidationMetrics,
    pub report: ClassificationReport,
    pub fit: FitSummary,
}

/// Persisted summary of a training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub trained_at: DateTime<Utc>,
    pub fingerprint: String,
    pub dataset_path: PathBuf,
    pub samples: usize,
    pub benign: usize,
    pub malignant: usize,
    pub train_size: usize,
    pub test_size: usize,
    pub seed: u64,
    pub test_ratio: f64,
    pub stratify: bool,
    pub scaling: ScalingStrategy,
    pub fit: FitSummary,
    pub metrics: ValidationMetrics,
    pub classification_report: ClassificationReport,
}

/// Identifier shared by both artifacts of a run.
///
/// Covers everything that determines the fitted parameters' meaning: the
/// dataset bytes, the partition, and the scaling strategy.
pub fn run_fingerprint(dataset_digest: &str, config: &PipelineConfig) -> String {
    let mut hasher = Sha256::new();
    hasher.update(dataset_digest.as_bytes());
    hasher.update(config.seed.to_le_bytes());
    hasher.update(config.test_ratio.to_le_bytes());
    hasher.update([u8::from(config.stratify)]);
    hasher.update(config.scaling.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Run the full training pipeline: load data, split, train, save artifacts
/// and the training report.
pub fn train(config: &PipelineConfig) -> Result<TrainingOutcome> {
    config.validate()?;

    println!("Loading dataset from {}", config.dataset_path.display());
    let dataset = DatasetLoader::load(&config.dataset_path)?;
    let (benign, malignant) = dataset.class_counts();
    println!(
        "Data: {} samples ({} benign, {} malignant)",
        dataset.len(),
        benign,
        malignant,
    );

    let outcome = train_on_dataset(&dataset, config)?;

    println!("{:-<64}", "");
    println!("Accuracy of the model: {:.4}", outcome.metrics.accuracy);
    println!("Classification report:\n{}", outcome.report);
    println!("{:-<64}", "");

    save_artifacts(&config.artifact_dir, &outcome.artifacts)?;
    let report = TrainingReport {
        trained_at: Utc::now(),
        fingerprint: outcome.artifacts.fingerprint.clone(),
        dataset_path: config.dataset_path.clone(),
        samples: dataset.len(),
        benign,
        malignant,
        train_size: outcome.split.train.len(),
        test_size: outcome.split.test.len(),
        seed: config.seed,
        test_ratio: config.test_ratio,
        stratify: config.stratify,
        scaling: config.scaling,
        fit: outcome.fit.clone(),
        metrics: outcome.metrics.clone(),
        classification_report: outcome.report.clone(),
    };
    write_report(&config.artifact_dir.join(REPORT_FILE), &report)?;
    println!("Artifacts saved to: {}", config.artifact_dir.display());

    Ok(outcome)
}

/// The in-memory part of training. Writes nothing to disk.
pub fn train_on_dataset(dataset: &Dataset, config: &PipelineConfig) -> Result<TrainingOutcome> {
    let labels = dataset.labels();
    let split = train_test_split(&labels, config.test_ratio, config.seed, config.stratify)?;

    let (train_x, train_y) = dataset.select(&split.train);
    let (test_x, test_y) = dataset.select(&split.test);

    let scaler = FeatureScaler::fit(config.scaling, &train_x)?;
    let scaled_train = scaler.transform_rows(&train_x);

    tracing::info!(
        train = train_x.len(),
        test = test_x.len(),
        scaling = %config.scaling,
        lr = config.classifier.learning_rate,
        max_epochs = config.classifier.max_epochs,
        "Fitting classifier"
    );
    let (classifier, fit) = fit_classifier(&scaled_train, &train_y, &config.classifier)?;

    let scaled_test = scaler.transform_rows(&test_x);
    let predictions = scaled_test
        .iter()
        .map(|row| classifier.predict(&row[..]).map(|d| d.as_label()))
        .collect::<Result<Vec<u8>>>()?;
    let metrics = compute_validation_metrics(&predictions, &test_y);
    let report = ClassificationReport::from_confusion(&metrics.confusion);
    tracing::info!(%metrics, "Held-out evaluation");

    let artifacts = ArtifactPair {
        fingerprint: run_fingerprint(dataset.source_digest(), config),
        scaler,
        classifier,
    };
    // Fail here rather than at the first inference call.
    Predictor::from_pair(artifacts.clone())?;

    Ok(TrainingOutcome {
        artifacts,
        split,
        metrics,
        report,
        fit,
    })
}

fn write_report(path: &Path, report: &TrainingReport) -> Result<()> {
    let mut bytes = serde_json::to_vec_pretty(report)?;
    bytes.push(b'\n');
    std::fs::write(path, bytes).map_err(|e| CytoError::io(path, e))
}

/// Read a report written by [`train`].
pub fn read_report(path: &Path) -> Result<TrainingReport> {
    let bytes = std::fs::read(path).map_err(|e| CytoError::io(path, e))?;
    Ok(serde_json::from_slice(&bytes)?)
}
