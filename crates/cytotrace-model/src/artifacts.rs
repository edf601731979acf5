//! Versioned JSON persistence for the scaler/classifier pair.
//!
//! Each artifact is written as its own file inside an artifact directory:
//!
//! ```text
//! <dir>/scaler.json   { "format_version": 1, "kind": "scaler",     "fingerprint": "…", "payload": { … } }
//! <dir>/model.json    { "format_version": 1, "kind": "classifier", "fingerprint": "…", "payload": { … } }
//! ```
//!
//! The `fingerprint` identifies the training run (dataset digest, split
//! parameters, scaling strategy). Loading refuses pairs whose fingerprints
//! differ, so a scaler from one run can never be combined with a classifier
//! from another.

use cytotrace_core::{CytoError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::classifier::LogisticClassifier;
use crate::scaler::FeatureScaler;

/// Current on-disk format version.
pub const FORMAT_VERSION: u32 = 1;

/// File name of the persisted scaler.
pub const SCALER_FILE: &str = "scaler.json";

/// File name of the persisted classifier.
pub const MODEL_FILE: &str = "model.json";

/// What an artifact file contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Scaler,
    Classifier,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactKind::Scaler => write!(f, "scaler"),
            ArtifactKind::Classifier => write!(f, "classifier"),
        }
    }
}

/// On-disk wrapper around a single artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactEnvelope<T> {
    pub format_version: u32,
    pub kind: ArtifactKind,
    pub fingerprint: String,
    pub payload: T,
}

/// Header fields only, read before committing to a payload type.
#[derive(Deserialize)]
struct EnvelopeHeader {
    format_version: u32,
    kind: ArtifactKind,
}

/// The two artifacts of one training run.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactPair {
    pub fingerprint: String,
    pub scaler: FeatureScaler,
    pub classifier: LogisticClassifier,
}

impl ArtifactPair {
    /// Validate both artifacts and their mutual compatibility.
    pub fn validate(&self) -> Result<()> {
        validate_compatible(&self.scaler, &self.classifier)
    }
}

/// Check that a scaler and classifier can be chained.
///
/// # Errors
///
/// Returns [`CytoError::Artifact`] for malformed parameters and
/// [`CytoError::ArtifactMismatch`] when the feature orders disagree.
pub fn validate_compatible(scaler: &FeatureScaler, classifier: &LogisticClassifier) -> Result<()> {
    scaler.validate()?;
    classifier.validate()?;
    if scaler.feature_names != classifier.feature_names {
        return Err(CytoError::ArtifactMismatch(
            "scaler and classifier were fitted on different feature orders".to_string(),
        ));
    }
    Ok(())
}

/// Write both artifacts into `dir`, creating it if needed.
pub fn save_artifacts(dir: &Path, pair: &ArtifactPair) -> Result<()> {
    pair.validate()?;
    std::fs::create_dir_all(dir).map_err(|e| CytoError::io(dir, e))?;

    write_envelope(
        &dir.join(SCALER_FILE),
        ArtifactKind::Scaler,
        &pair.fingerprint,
        &pair.scaler,
    )?;
    write_envelope(
        &dir.join(MODEL_FILE),
        ArtifactKind::Classifier,
        &pair.fingerprint,
        &pair.classifier,
    )?;

    tracing::info!(
        dir = %dir.display(),
        fingerprint = %pair.fingerprint,
        "Saved scaler and classifier artifacts"
    );
    Ok(())
}

/// Read and validate both artifacts from `dir`.
///
/// # Errors
///
/// Missing files surface as [`CytoError::Io`]; unreadable JSON, an unknown
/// format version, or a wrong artifact kind as [`CytoError::Artifact`];
/// artifacts from different runs as [`CytoError::ArtifactMismatch`].
pub fn load_artifacts(dir: &Path) -> Result<ArtifactPair> {
    let scaler: ArtifactEnvelope<FeatureScaler> =
        read_envelope(&dir.join(SCALER_FILE), ArtifactKind::Scaler)?;
    let classifier: ArtifactEnvelope<LogisticClassifier> =
        read_envelope(&dir.join(MODEL_FILE), ArtifactKind::Classifier)?;

    if scaler.fingerprint != classifier.fingerprint {
        return Err(CytoError::ArtifactMismatch(format!(
            "scaler fingerprint {} does not match classifier fingerprint {}",
            scaler.fingerprint, classifier.fingerprint
        )));
    }

    let pair = ArtifactPair {
        fingerprint: scaler.fingerprint,
        scaler: scaler.payload,
        classifier: classifier.payload,
    };
    pair.validate()?;

    tracing::debug!(
        dir = %dir.display(),
        fingerprint = %pair.fingerprint,
        strategy = %pair.scaler.strategy(),
        "Loaded artifact pair"
    );
    Ok(pair)
}

fn write_envelope<T: Serialize>(
    path: &Path,
    kind: ArtifactKind,
    fingerprint: &str,
    payload: &T,
) -> Result<()> {
    let envelope = ArtifactEnvelope {
        format_version: FORMAT_VERSION,
        kind,
        fingerprint: fingerprint.to_string(),
        payload,
    };
    let mut bytes = serde_json::to_vec_pretty(&envelope)?;
    bytes.push(b'\n');
    std::fs::write(path, bytes).map_err(|e| CytoError::io(path, e))
}

fn read_envelope<T: DeserializeOwned>(
    path: &Path,
    expected: ArtifactKind,
) -> Result<ArtifactEnvelope<T>> {
    let bytes = std::fs::read(path).map_err(|e| CytoError::io(path, e))?;

    let header: EnvelopeHeader = serde_json::from_slice(&bytes).map_err(|e| {
        CytoError::Artifact(format!("{} is not a valid artifact: {e}", path.display()))
    })?;
    if header.format_version != FORMAT_VERSION {
        return Err(CytoError::Artifact(format!(
            "{} has format version {}, this build reads version {}",
            path.display(),
            header.format_version,
            FORMAT_VERSION
        )));
    }
    if header.kind != expected {
        return Err(CytoError::Artifact(format!(
            "{} holds a {} artifact, expected a {}",
            path.display(),
            header.kind,
            expected
        )));
    }

    serde_json::from_slice(&bytes).map_err(|e| {
        CytoError::Artifact(format!("{} has a corrupt {expected} payload: {e}", path.display()))
    })
}
