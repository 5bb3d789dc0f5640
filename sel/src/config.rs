//! Evaluation settings, optionally read from `sel.toml`

use crate::error::{CompileError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file names searched for, in priority order
pub const CONFIG_FILE_NAMES: &[&str] = &[".sel.toml", "sel.toml"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Fraction digits kept by division, rounded half-up
    pub decimal_scale: i64,
    /// Deepest expression nesting the engine compiles
    pub max_depth: usize,
    /// `tracing` filter used by the command line when `SEL_LOG` is unset
    pub log_filter: String,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            decimal_scale: 16,
            max_depth: 512,
            log_filter: "warn".to_string(),
        }
    }
}

impl EvalConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Read a config file; a missing or malformed file is an error
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CompileError::io_error(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Find a config file in `start_dir` or one of its ancestors
    pub fn discover(start_dir: &Path) -> Option<PathBuf> {
        let mut current = Some(start_dir);
        while let Some(dir) = current {
            for name in CONFIG_FILE_NAMES {
                let candidate = dir.join(name);
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
            current = dir.parent();
        }
        None
    }
}
