use crate::config::{Config, EXTUPDATE_DIR};
use std::path::{Path, PathBuf};

/// Where operations keep their state: the lock file and the history log
#[derive(Debug, Clone)]
pub struct Workspace {
    pub working_dir: PathBuf,
    pub history_path: PathBuf,
}

impl Workspace {
    /// Workspace rooted at `working_dir` with the default history location
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        let working_dir = working_dir.into();
        let history_path = Config::default().history_path(&working_dir);
        Self {
            working_dir,
            history_path,
        }
    }

    /// Workspace whose history location comes from `config`
    pub fn from_config(working_dir: impl Into<PathBuf>, config: &Config) -> Self {
        let working_dir = working_dir.into();
        let history_path = config.history_path(&working_dir);
        Self {
            working_dir,
            history_path,
        }
    }

    #[must_use]
    pub fn with_history_path(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        self.history_path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        };
        self
    }

    /// The `.extupdate` directory holding the lock file
    pub fn state_dir(&self) -> PathBuf {
        self.working_dir.join(EXTUPDATE_DIR)
    }
}
