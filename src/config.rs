//! User-facing settings.
//!
//! Settings arrive as JSON from `initializationOptions` and from
//! `workspace/didChangeConfiguration`, either flat or nested under `"elm"`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_MAX_FILES: usize = 600;
pub const DEFAULT_EXCLUDE_PATTERN: &str = "**/{node_modules,elm-stuff}/**";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// File-count ceiling for the full workspace scan.
    pub max_workspace_files_used_by_symbols: usize,
    /// Glob excluded from workspace scans. Empty disables exclusion.
    pub workspace_files_exclude_pattern_used_by_symbols: String,
    /// Project manifests, tried in order.
    pub manifest_files: Vec<String>,
    /// Manifest field listing source directories.
    pub source_directories_field: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_workspace_files_used_by_symbols: DEFAULT_MAX_FILES,
            workspace_files_exclude_pattern_used_by_symbols: DEFAULT_EXCLUDE_PATTERN.to_owned(),
            manifest_files: vec!["elm.json".to_owned(), "elm-package.json".to_owned()],
            source_directories_field: "source-directories".to_owned(),
        }
    }
}

impl Config {
    /// Read settings from a JSON payload. `null` yields the defaults.
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Object(map) => match map.get("elm") {
                Some(nested @ Value::Object(_)) => Self::deserialize(nested),
                _ => Self::deserialize(value),
            },
            other => Self::deserialize(other),
        }
    }

    pub fn exclude_pattern(&self) -> Option<&str> {
        let pattern = self.workspace_files_exclude_pattern_used_by_symbols.trim();
        (!pattern.is_empty()).then_some(pattern)
    }
}
