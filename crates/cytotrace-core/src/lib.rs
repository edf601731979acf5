//! Core types, configuration, and errors for cytotrace
//!
//! This crate contains the foundational types shared by the model and pipeline
//! crates: the canonical feature order, validated feature vectors, diagnosis
//! labels, prediction results, pipeline configuration, and the error type.
//!
//! The scaler and classifier operate on positional arrays, so the order of
//! [`FEATURE_NAMES`] is the contract that ties training, persisted artifacts,
//! and inference together. Callers that hold named values go through
//! [`FeatureVector::from_named`], which validates the names instead of
//! trusting their order.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Feature keys
// ---------------------------------------------------------------------------

/// Number of numeric features per sample.
pub const FEATURE_COUNT: usize = 30;

/// Number of distinct nucleus measurements (each reported in three groups).
pub const MEASUREMENT_COUNT: usize = 10;

/// The ten measurements, in dataset order.
pub const MEASUREMENTS: [&str; MEASUREMENT_COUNT] = [
    "radius",
    "texture",
    "perimeter",
    "area",
    "smoothness",
    "compactness",
    "concavity",
    "concave points",
    "symmetry",
    "fractal_dimension",
];

/// Canonical feature order, identical to the dataset header order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "radius_mean",
    "texture_mean",
    "perimeter_mean",
    "area_mean",
    "smoothness_mean",
    "compactness_mean",
    "concavity_mean",
    "concave points_mean",
    "symmetry_mean",
    "fractal_dimension_mean",
    "radius_se",
    "texture_se",
    "perimeter_se",
    "area_se",
    "smoothness_se",
    "compactness_se",
    "concavity_se",
    "concave points_se",
    "symmetry_se",
    "fractal_dimension_se",
    "radius_worst",
    "texture_worst",
    "perimeter_worst",
    "area_worst",
    "smoothness_worst",
    "compactness_worst",
    "concavity_worst",
    "concave points_worst",
    "symmetry_worst",
    "fractal_dimension_worst",
];

/// Statistic group a feature belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureGroup {
    /// Mean over all nuclei in the image.
    Mean,
    /// Standard error over all nuclei in the image.
    StandardError,
    /// Mean of the three largest values.
    Worst,
}

impl FeatureGroup {
    /// All groups in dataset order.
    pub const ALL: [FeatureGroup; 3] = [
        FeatureGroup::Mean,
        FeatureGroup::StandardError,
        FeatureGroup::Worst,
    ];

    /// Column-name suffix used by the dataset.
    pub fn suffix(&self) -> &'static str {
        match self {
            FeatureGroup::Mean => "mean",
            FeatureGroup::StandardError => "se",
            FeatureGroup::Worst => "worst",
        }
    }

    /// Position of the group's first feature in [`FEATURE_NAMES`].
    pub fn offset(&self) -> usize {
        match self {
            FeatureGroup::Mean => 0,
            FeatureGroup::StandardError => MEASUREMENT_COUNT,
            FeatureGroup::Worst => 2 * MEASUREMENT_COUNT,
        }
    }
}

/// Position of `name` in the canonical feature order.
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_NAMES.iter().position(|n| *n == name)
}

/// Form label for a feature key, e.g. `"Concave points (mean)"`.
pub fn display_label(name: &str) -> Option<String> {
    let idx = feature_index(name)?;
    let group = FeatureGroup::ALL[idx / MEASUREMENT_COUNT];
    let measurement = MEASUREMENTS[idx % MEASUREMENT_COUNT].replace('_', " ");
    let mut chars = measurement.chars();
    let capitalised = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    Some(format!("{} ({})", capitalised, group.suffix()))
}

// ---------------------------------------------------------------------------
// Feature vectors
// ---------------------------------------------------------------------------

/// A validated sample: exactly [`FEATURE_COUNT`] finite values in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    /// Build a vector from a positional array.
    ///
    /// # Errors
    ///
    /// Returns [`CytoError::InvalidFeatures`] if any value is NaN or infinite.
    pub fn new(values: [f64; FEATURE_COUNT]) -> Result<Self> {
        if let Some(idx) = values.iter().position(|v| !v.is_finite()) {
            return Err(CytoError::InvalidFeatures(format!(
                "value for '{}' is not finite: {}",
                FEATURE_NAMES[idx], values[idx]
            )));
        }
        Ok(Self { values })
    }

    /// Build a vector from a positional slice, checking its length.
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        let values: [f64; FEATURE_COUNT] = values.try_into().map_err(|_| {
            CytoError::InvalidFeatures(format!(
                "expected {} values, got {}",
                FEATURE_COUNT,
                values.len()
            ))
        })?;
        Self::new(values)
    }

    /// Build a vector from named values.
    ///
    /// Every key in [`FEATURE_NAMES`] must be present and no other key is
    /// accepted; the map's iteration order is irrelevant.
    pub fn from_named(named: &HashMap<String, f64>) -> Result<Self> {
        let mut unknown: Vec<&str> = named
            .keys()
            .map(String::as_str)
            .filter(|k| feature_index(k).is_none())
            .collect();
        if !unknown.is_empty() {
            unknown.sort_unstable();
            return Err(CytoError::InvalidFeatures(format!(
                "unknown feature keys: {:?}",
                unknown
            )));
        }

        let missing: Vec<&str> = FEATURE_NAMES
            .iter()
            .copied()
            .filter(|n| !named.contains_key(*n))
            .collect();
        if !missing.is_empty() {
            return Err(CytoError::InvalidFeatures(format!(
                "missing feature keys: {:?}",
                missing
            )));
        }

        let mut values = [0.0; FEATURE_COUNT];
        for (slot, name) in values.iter_mut().zip(FEATURE_NAMES.iter()) {
            *slot = named[*name];
        }
        Self::new(values)
    }

    /// Positional values in canonical order.
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Positional values as a fixed-size array.
    pub fn as_array(&self) -> &[f64; FEATURE_COUNT] {
        &self.values
    }

    /// Value of a named feature.
    pub fn get(&self, name: &str) -> Option<f64> {
        feature_index(name).map(|i| self.values[i])
    }

    /// The ten values of one statistic group, in [`MEASUREMENTS`] order.
    pub fn group(&self, group: FeatureGroup) -> &[f64] {
        let start = group.offset();
        &self.values[start..start + MEASUREMENT_COUNT]
    }

    /// `(name, value)` pairs in canonical order.
    pub fn iter_named(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_NAMES.iter().copied().zip(self.values.iter().copied())
    }

    /// Named values, e.g. for JSON output.
    pub fn to_named(&self) -> HashMap<String, f64> {
        self.iter_named()
            .map(|(name, value)| (name.to_string(), value))
            .collect()
    }
}

impl TryFrom<Vec<f64>> for FeatureVector {
    type Error = CytoError;

    fn try_from(values: Vec<f64>) -> Result<Self> {
        Self::from_slice(&values)
    }
}

impl From<FeatureVector> for Vec<f64> {
    fn from(v: FeatureVector) -> Self {
        v.values.to_vec()
    }
}

// ---------------------------------------------------------------------------
// Labels and predictions
// ---------------------------------------------------------------------------

/// Binary diagnosis. The numeric label is what the classifier is trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Diagnosis {
    /// Source code `B`, label 0.
    Benign,
    /// Source code `M`, label 1.
    Malignant,
}

impl Diagnosis {
    /// Both classes in label order.
    pub const CLASSES: [Diagnosis; 2] = [Diagnosis::Benign, Diagnosis::Malignant];

    /// Parse the dataset's two-letter code (`M` / `B`).
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "M" => Some(Diagnosis::Malignant),
            "B" => Some(Diagnosis::Benign),
            _ => None,
        }
    }

    /// Numeric label: benign = 0, malignant = 1.
    pub fn as_label(&self) -> u8 {
        match self {
            Diagnosis::Benign => 0,
            Diagnosis::Malignant => 1,
        }
    }

    /// Inverse of [`Diagnosis::as_label`].
    pub fn from_label(label: u8) -> Option<Self> {
        match label {
            0 => Some(Diagnosis::Benign),
            1 => Some(Diagnosis::Malignant),
            _ => None,
        }
    }

    pub fn is_malignant(&self) -> bool {
        matches!(self, Diagnosis::Malignant)
    }
}

impl std::fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnosis::Benign => write!(f, "Benign"),
            Diagnosis::Malignant => write!(f, "Malignant"),
        }
    }
}

/// Probability distribution over the two classes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassProbabilities {
    pub benign: f64,
    pub malignant: f64,
}

impl ClassProbabilities {
    /// Build from the malignant-class probability.
    pub fn from_malignant(p: f64) -> Self {
        let malignant = p.clamp(0.0, 1.0);
        Self {
            benign: 1.0 - malignant,
            malignant,
        }
    }

    /// `[benign, malignant]`, in label order.
    pub fn as_pair(&self) -> [f64; 2] {
        [self.benign, self.malignant]
    }

    /// The more probable class; ties go to malignant.
    pub fn most_likely(&self) -> Diagnosis {
        if self.malignant >= 0.5 {
            Diagnosis::Malignant
        } else {
            Diagnosis::Benign
        }
    }
}

/// Result of one inference call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub diagnosis: Diagnosis,
    pub probabilities: ClassProbabilities,
}

impl From<ClassProbabilities> for Prediction {
    fn from(probabilities: ClassProbabilities) -> Self {
        Self {
            diagnosis: probabilities.most_likely(),
            probabilities,
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How raw features are normalised before reaching the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingStrategy {
    /// `(x - mean) / std`.
    #[default]
    Standard,
    /// `(x - min) / (max - min)`.
    MinMax,
}

impl std::fmt::Display for ScalingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalingStrategy::Standard => write!(f, "standard"),
            ScalingStrategy::MinMax => write!(f, "min_max"),
        }
    }
}

/// Top-level pipeline configuration.
///
/// Every field has a default, so a partial YAML file (or none at all) is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Path to the tabular dataset (CSV with header row).
    #[serde(default = "default_dataset_path")]
    pub dataset_path: PathBuf,
    /// Directory that holds `scaler.json`, `model.json` and the training report.
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,
    /// Seed for the train/test partition.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Fraction of rows held out for evaluation.
    #[serde(default = "default_test_ratio")]
    pub test_ratio: f64,
    /// Preserve the class ratio in both partitions.
    #[serde(default)]
    pub stratify: bool,
    /// Feature scaling strategy.
    #[serde(default)]
    pub scaling: ScalingStrategy,
    /// Classifier fitting parameters.
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from("data.csv")
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("model")
}

fn default_seed() -> u64 {
    42
}

fn default_test_ratio() -> f64 {
    0.2
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dataset_path: default_dataset_path(),
            artifact_dir: default_artifact_dir(),
            seed: default_seed(),
            test_ratio: default_test_ratio(),
            stratify: false,
            scaling: ScalingStrategy::default(),
            classifier: ClassifierConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Check value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`CytoError::Config`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if !(self.test_ratio > 0.0 && self.test_ratio < 1.0) {
            return Err(CytoError::Config(format!(
                "test_ratio must be in (0, 1), got {}",
                self.test_ratio
            )));
        }
        self.classifier.validate()?;
        self.logging.validate()
    }
}

/// Parameters for fitting the logistic classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Optimiser step size.
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    /// Upper bound on full-batch optimisation steps.
    #[serde(default = "default_max_epochs")]
    pub max_epochs: usize,
    /// Stop once the loss changes by less than this between steps.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Inverse L2 regularisation strength (larger = weaker penalty).
    #[serde(default = "default_inverse_regularization")]
    pub inverse_regularization: f64,
}

fn default_learning_rate() -> f64 {
    0.05
}

fn default_max_epochs() -> usize {
    3000
}

fn default_tolerance() -> f64 {
    1e-9
}

fn default_inverse_regularization() -> f64 {
    1.0
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            learning_rate: default_learning_rate(),
            max_epochs: default_max_epochs(),
            tolerance: default_tolerance(),
            inverse_regularization: default_inverse_regularization(),
        }
    }
}

impl ClassifierConfig {
    fn validate(&self) -> Result<()> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(CytoError::Config(format!(
                "classifier.learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.max_epochs == 0 {
            return Err(CytoError::Config(
                "classifier.max_epochs must be at least 1".to_string(),
            ));
        }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(CytoError::Config(format!(
                "classifier.tolerance must be non-negative, got {}",
                self.tolerance
            )));
        }
        if !(self.inverse_regularization.is_finite() && self.inverse_regularization > 0.0) {
            return Err(CytoError::Config(format!(
                "classifier.inverse_regularization must be positive, got {}",
                self.inverse_regularization
            )));
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format: `text` (human-readable) or `json` (structured).
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingConfig {
    fn validate(&self) -> Result<()> {
        match self.format.as_str() {
            "text" | "json" => Ok(()),
            other => Err(CytoError::Config(format!(
                "logging.format must be 'text' or 'json', got '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Core error types.
#[derive(thiserror::Error, Debug)]
pub enum CytoError {
    /// Malformed dataset contents.
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// A required column is absent from the dataset header.
    #[error("Missing column '{0}' in dataset header")]
    MissingColumn(String),

    /// Feature vector with the wrong shape, names, or values.
    #[error("Invalid feature vector: {0}")]
    InvalidFeatures(String),

    /// Corrupt or unsupported artifact file.
    #[error("Artifact error: {0}")]
    Artifact(String),

    /// Artifacts that were not produced together, or that disagree with the
    /// current dataset and configuration.
    #[error("Incompatible artifacts: {0}")]
    ArtifactMismatch(String),

    /// Classifier fitting failed.
    #[error("Training error: {0}")]
    Training(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system error, with the offending path.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serialization / deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CytoError {
    /// Wrap an I/O error together with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CytoError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias for `std::result::Result<T, CytoError>`.
pub type Result<T> = std::result::Result<T, CytoError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn named_values() -> HashMap<String, f64> {
        FEATURE_NAMES
            .iter()
            .enumerate()
            .map(|(i, n)| (n.to_string(), i as f64))
            .collect()
    }

    #[test]
    fn test_feature_names_are_grouped() {
        for group in FeatureGroup::ALL {
            for (i, m) in MEASUREMENTS.iter().enumerate() {
                let expected = format!("{}_{}", m, group.suffix());
                assert_eq!(FEATURE_NAMES[group.offset() + i], expected);
            }
        }
    }

    #[test]
    fn test_feature_names_unique() {
        let mut names = FEATURE_NAMES.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), FEATURE_COUNT);
    }

    #[test]
    fn test_display_label() {
        assert_eq!(
            display_label("radius_mean").as_deref(),
            Some("Radius (mean)")
        );
        assert_eq!(
            display_label("concave points_se").as_deref(),
            Some("Concave points (se)")
        );
        assert_eq!(
            display_label("fractal_dimension_worst").as_deref(),
            Some("Fractal dimension (worst)")
        );
        assert!(display_label("bogus").is_none());
    }

    #[test]
    fn test_from_named_orders_by_canonical_position() {
        let v = FeatureVector::from_named(&named_values()).unwrap();
        for (i, value) in v.as_slice().iter().enumerate() {
            assert_eq!(*value, i as f64);
        }
        assert_eq!(v.get("area_se"), Some(13.0));
        assert_eq!(v.group(FeatureGroup::Worst)[0], 20.0);
    }

    #[test]
    fn test_from_named_rejects_missing_key() {
        let mut named = named_values();
        named.remove("texture_worst");
        let err = FeatureVector::from_named(&named).unwrap_err();
        assert!(err.to_string().contains("texture_worst"));
    }

    #[test]
    fn test_from_named_rejects_unknown_key() {
        let mut named = named_values();
        named.insert("concave_points_mean".to_string(), 1.0);
        let err = FeatureVector::from_named(&named).unwrap_err();
        assert!(matches!(err, CytoError::InvalidFeatures(_)));
        assert!(err.to_string().contains("concave_points_mean"));
    }

    #[test]
    fn test_from_slice_rejects_wrong_length() {
        assert!(FeatureVector::from_slice(&[1.0; 29]).is_err());
        assert!(FeatureVector::from_slice(&[1.0; 31]).is_err());
        assert!(FeatureVector::from_slice(&[1.0; 30]).is_ok());
    }

    #[test]
    fn test_rejects_non_finite() {
        let mut values = [1.0; FEATURE_COUNT];
        values[4] = f64::NAN;
        let err = FeatureVector::new(values).unwrap_err();
        assert!(err.to_string().contains("smoothness_mean"));
    }

    #[test]
    fn test_feature_vector_serde_as_list() {
        let v = FeatureVector::new([2.5; FEATURE_COUNT]).unwrap();
        let json = serde_json::to_string(&v).unwrap();
        let back: FeatureVector = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
        assert!(serde_json::from_str::<FeatureVector>("[1.0, 2.0]").is_err());
    }

    #[test]
    fn test_diagnosis_codes() {
        assert_eq!(Diagnosis::from_code("M"), Some(Diagnosis::Malignant));
        assert_eq!(Diagnosis::from_code("B"), Some(Diagnosis::Benign));
        assert_eq!(Diagnosis::from_code("X"), None);
        assert_eq!(Diagnosis::Malignant.as_label(), 1);
        assert_eq!(Diagnosis::Benign.as_label(), 0);
        assert_eq!(Diagnosis::from_label(1), Some(Diagnosis::Malignant));
        assert_eq!(Diagnosis::from_label(2), None);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        for p in [0.0, 0.25, 0.5, 0.999, 1.0] {
            let probs = ClassProbabilities::from_malignant(p);
            assert!((probs.benign + probs.malignant - 1.0).abs() < 1e-12);
            assert!(probs.benign >= 0.0 && probs.malignant >= 0.0);
        }
        assert_eq!(
            Prediction::from(ClassProbabilities::from_malignant(0.7)).diagnosis,
            Diagnosis::Malignant
        );
        assert_eq!(
            Prediction::from(ClassProbabilities::from_malignant(0.2)).diagnosis,
            Diagnosis::Benign
        );
    }

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.seed, 42);
        assert!((config.test_ratio - 0.2).abs() < 1e-12);
        assert!(!config.stratify);
        assert_eq!(config.scaling, ScalingStrategy::Standard);
        assert_eq!(config.logging.format, "text");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_partial_json_uses_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"seed": 7, "scaling": "min_max"}"#).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.scaling, ScalingStrategy::MinMax);
        assert_eq!(config.artifact_dir, PathBuf::from("model"));
    }

    #[test]
    fn test_config_validation() {
        let mut config = PipelineConfig {
            test_ratio: 1.0,
            ..PipelineConfig::default()
        };
        assert!(matches!(config.validate(), Err(CytoError::Config(_))));

        config.test_ratio = 0.2;
        config.classifier.inverse_regularization = 0.0;
        assert!(config.validate().is_err());

        config.classifier.inverse_regularization = 1.0;
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }
}
