//! File helpers for the tools.
//!
//! - `load_samples_json`: read `{heights, volumes}` sample arrays.
//! - `write_json_file`: pretty-print a serializable value to disk.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Measured profile as stored on disk.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileSamples {
    /// Fill heights in mm, strictly increasing.
    pub heights: Vec<f64>,
    /// Cumulative volumes in mm³ (µL).
    pub volumes: Vec<f64>,
}

/// Load a sample file.
pub fn load_samples_json(path: &Path) -> Result<ProfileSamples, String> {
    let data = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read samples {}: {e}", path.display()))?;
    serde_json::from_str(&data)
        .map_err(|e| format!("Failed to parse samples {}: {e}", path.display()))
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), String> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize JSON for {}: {e}", path.display()))?;
    fs::write(path, json).map_err(|e| format!("Failed to write JSON {}: {e}", path.display()))
}

fn ensure_parent_dir(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {e}", parent.display()))?;
        }
    }
    Ok(())
}
