use crate::job::ConflictPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the per-workspace state directory
pub const EXTUPDATE_DIR: &str = ".extupdate";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub defaults: DefaultsConfig,

    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Extension to convert from when none is given
    #[serde(default = "default_source")]
    pub source_extension: String,

    /// Extension to convert to when none is given
    #[serde(default = "default_target")]
    pub target_extension: String,

    /// Whether to write `.backup` copies by default
    #[serde(default)]
    pub backup: bool,

    /// Whether to descend into subfolders by default
    #[serde(default)]
    pub recursive: bool,

    /// What to do when the renamed file already exists
    #[serde(default)]
    pub on_conflict: ConflictPolicy,

    /// Whether to use color output by default (None = auto-detect)
    #[serde(default)]
    pub use_color: Option<bool>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            source_extension: default_source(),
            target_extension: default_target(),
            backup: false,
            recursive: false,
            on_conflict: ConflictPolicy::Skip,
            use_color: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HistoryConfig {
    /// History file location; relative paths are resolved against the
    /// working directory. Defaults to `.extupdate/history.json`.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_source() -> String {
    ".xls".to_string()
}

fn default_target() -> String {
    ".xlsx".to_string()
}

impl Config {
    /// Load config from `<working_dir>/.extupdate/config.toml` if it exists
    pub fn load(working_dir: &Path) -> Result<Self> {
        let config_path = working_dir.join(EXTUPDATE_DIR).join("config.toml");
        if config_path.exists() {
            return Self::load_from_path(&config_path);
        }

        // Return default config if no config file exists
        Ok(Self::default())
    }

    /// Load config from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// History file location for a workspace rooted at `working_dir`
    pub fn history_path(&self, working_dir: &Path) -> PathBuf {
        match &self.history.path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => working_dir.join(path),
            None => working_dir
                .join(EXTUPDATE_DIR)
                .join(crate::history::HISTORY_FILE_NAME),
        }
    }
}
