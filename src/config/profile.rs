use crate::params::AnalyzerConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration of the `profile_segments` tool.
#[derive(Debug, Deserialize)]
pub struct ProfileToolConfig {
    /// JSON file with `heights` and `volumes` arrays.
    pub input: PathBuf,
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    pub output: ProfileOutputConfig,
}

#[derive(Debug, Deserialize)]
pub struct ProfileOutputConfig {
    #[serde(rename = "report_json")]
    pub report_json: PathBuf,
    /// Also print the per-segment summary to stdout.
    #[serde(default = "default_true")]
    pub print_summary: bool,
}

fn default_true() -> bool {
    true
}

pub fn load_config(path: &Path) -> Result<ProfileToolConfig, String> {
    let data = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    parse_config(&data).map_err(|e| format!("Failed to parse config {}: {e}", path.display()))
}

fn parse_config(data: &str) -> Result<ProfileToolConfig, serde_json::Error> {
    serde_json::from_str(data)
}
