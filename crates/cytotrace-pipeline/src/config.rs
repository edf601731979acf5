//! YAML configuration loading for the pipeline.
//!
//! Loads [`PipelineConfig`] from a YAML file on disk, falling back to
//! defaults when no file is specified.

use cytotrace_core::{CytoError, PipelineConfig, Result};
use std::path::Path;

/// Environment variable read by the CLI when no `--config` flag is given.
pub const CONFIG_ENV_VAR: &str = "CYTOTRACE_CONFIG";

/// Load a [`PipelineConfig`] from a YAML file at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read, the YAML is invalid, or a
/// value is out of range.
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| CytoError::io(path, e))?;
    let config: PipelineConfig = serde_yaml::from_str(&contents).map_err(|e| {
        CytoError::Config(format!("Failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

/// Load `explicit` if given, otherwise fall back to defaults.
///
/// The caller resolves the path (the CLI reads `--config` or
/// [`CONFIG_ENV_VAR`]) and logs the outcome once its subscriber is up.
pub fn resolve_config(explicit: Option<&Path>) -> Result<PipelineConfig> {
    match explicit {
        Some(path) => load_config(path),
        None => Ok(PipelineConfig::default()),
    }
}
