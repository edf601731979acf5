//! Dataset loading for the cell-nuclei table.
//!
//! The source file is a CSV with a header row:
//!
//! | Column(s) | Handling |
//! |-----------|----------|
//! | `id` | required, dropped |
//! | `diagnosis` | required, `M` → malignant (1), `B` → benign (0) |
//! | 30 feature columns | required, parsed as `f64` |
//! | trailing unnamed column | optional, dropped |
//!
//! Columns are located by header name and re-assembled in canonical feature
//! order, so the file's column order does not leak into the feature vectors.

use cytotrace_core::{CytoError, Diagnosis, FeatureVector, Result, FEATURE_COUNT, FEATURE_NAMES};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// Identifier column, required but not used.
const ID_COLUMN: &str = "id";

/// Label column.
const DIAGNOSIS_COLUMN: &str = "diagnosis";

/// One labelled row.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub features: FeatureVector,
    pub diagnosis: Diagnosis,
}

/// The loaded table.
#[derive(Debug, Clone)]
pub struct Dataset {
    samples: Vec<Sample>,
    source_digest: String,
}

impl Dataset {
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// SHA-256 (hex) of the source bytes.
    pub fn source_digest(&self) -> &str {
        &self.source_digest
    }

    /// Feature matrix, one row per sample.
    pub fn features(&self) -> Vec<[f64; FEATURE_COUNT]> {
        self.samples.iter().map(|s| *s.features.as_array()).collect()
    }

    /// Numeric labels (benign = 0, malignant = 1).
    pub fn labels(&self) -> Vec<u8> {
        self.samples.iter().map(|s| s.diagnosis.as_label()).collect()
    }

    /// Rows at `indices`, as a feature matrix and label vector.
    pub fn select(&self, indices: &[usize]) -> (Vec<[f64; FEATURE_COUNT]>, Vec<u8>) {
        indices
            .iter()
            .map(|&i| {
                let s = &self.samples[i];
                (*s.features.as_array(), s.diagnosis.as_label())
            })
            .unzip()
    }

    /// `(benign, malignant)` row counts.
    pub fn class_counts(&self) -> (usize, usize) {
        let malignant = self
            .samples
            .iter()
            .filter(|s| s.diagnosis.is_malignant())
            .count();
        (self.samples.len() - malignant, malignant)
    }
}

/// Loads the dataset from CSV.
pub struct DatasetLoader;

impl DatasetLoader {
    /// Load a dataset from a CSV file path.
    ///
    /// # Errors
    ///
    /// Returns [`CytoError::Io`] if the file cannot be read,
    /// [`CytoError::MissingColumn`] if a required header is absent, and
    /// [`CytoError::Dataset`] for malformed rows.
    pub fn load(path: &Path) -> Result<Dataset> {
        let bytes = std::fs::read(path).map_err(|e| CytoError::io(path, e))?;
        let dataset = Self::load_from_bytes(&bytes)?;
        let (benign, malignant) = dataset.class_counts();
        tracing::info!(
            path = %path.display(),
            samples = dataset.len(),
            benign,
            malignant,
            "Loaded dataset"
        );
        Ok(dataset)
    }

    /// Load a dataset from any reader, e.g. stdin.
    pub fn load_from_reader<R: Read>(mut reader: R) -> Result<Dataset> {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| CytoError::Dataset(format!("Failed to read dataset: {e}")))?;
        Self::load_from_bytes(&bytes)
    }

    /// Load a dataset from in-memory CSV bytes.
    pub fn load_from_bytes(bytes: &[u8]) -> Result<Dataset> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(bytes);

        let headers = reader
            .headers()
            .map_err(|e| CytoError::Dataset(format!("Failed to read header row: {e}")))?
            .clone();
        let layout = ColumnLayout::resolve(&headers)?;

        let mut samples = Vec::new();
        for (i, record) in reader.records().enumerate() {
            // Line 1 is the header.
            let line = i + 2;
            let record =
                record.map_err(|e| CytoError::Dataset(format!("line {line}: {e}")))?;
            samples.push(layout.parse_row(&record, line)?);
        }

        if samples.is_empty() {
            return Err(CytoError::Dataset("dataset contains no rows".to_string()));
        }

        let digest = Sha256::digest(bytes);
        Ok(Dataset {
            samples,
            source_digest: format!("{:x}", digest),
        })
    }
}

/// Header positions of the columns we keep.
struct ColumnLayout {
    diagnosis: usize,
    features: [usize; FEATURE_COUNT],
}

impl ColumnLayout {
    fn resolve(headers: &csv::StringRecord) -> Result<Self> {
        let find = |name: &str| -> Result<usize> {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| CytoError::MissingColumn(name.to_string()))
        };

        find(ID_COLUMN)?;
        let diagnosis = find(DIAGNOSIS_COLUMN)?;
        let mut features = [0usize; FEATURE_COUNT];
        for (slot, name) in features.iter_mut().zip(FEATURE_NAMES.iter()) {
            *slot = find(name)?;
        }

        let ignored: Vec<&str> = headers
            .iter()
            .filter(|h| {
                *h != ID_COLUMN
                    && *h != DIAGNOSIS_COLUMN
                    && !FEATURE_NAMES.contains(h)
                    && !is_unnamed(h)
            })
            .collect();
        if !ignored.is_empty() {
            tracing::debug!(?ignored, "Ignoring unrecognised dataset columns");
        }

        Ok(Self {
            diagnosis,
            features,
        })
    }

    fn parse_row(&self, record: &csv::StringRecord, line: usize) -> Result<Sample> {
        let code = record.get(self.diagnosis).unwrap_or_default();
        let diagnosis = Diagnosis::from_code(code).ok_or_else(|| {
            CytoError::Dataset(format!(
                "line {line}: diagnosis must be 'M' or 'B', got '{code}'"
            ))
        })?;

        let mut values = [0.0; FEATURE_COUNT];
        for ((slot, &col), name) in values
            .iter_mut()
            .zip(self.features.iter())
            .zip(FEATURE_NAMES.iter())
        {
            let cell = record.get(col).ok_or_else(|| {
                CytoError::Dataset(format!("line {line}: missing value for '{name}'"))
            })?;
            *slot = cell.parse::<f64>().map_err(|_| {
                CytoError::Dataset(format!(
                    "line {line}: cannot parse '{cell}' in column '{name}' as a number"
                ))
            })?;
        }

        let features = FeatureVector::new(values)
            .map_err(|e| CytoError::Dataset(format!("line {line}: {e}")))?;
        Ok(Sample {
            features,
            diagnosis,
        })
    }
}

/// The extraneous trailing column: empty header, or pandas' `Unnamed: N`.
fn is_unnamed(header: &str) -> bool {
    header.is_empty() || header.starts_with("Unnamed")
}
