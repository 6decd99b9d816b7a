use crate::error::JobError;
use crate::extension::Extension;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// What to do when the renamed file would land on an existing path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Leave both files alone and report the candidate as failed
    #[default]
    Skip,
    /// Replace the existing destination
    Overwrite,
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => f.write_str("skip"),
            Self::Overwrite => f.write_str("overwrite"),
        }
    }
}

impl FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "overwrite" => Ok(Self::Overwrite),
            other => Err(format!("unknown conflict policy '{other}'")),
        }
    }
}

/// A single user-triggered extension swap over one folder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionJob {
    pub folder: PathBuf,
    pub source: Extension,
    pub target: Extension,
    pub recursive: bool,
    pub backup: bool,
    #[serde(default)]
    pub on_conflict: ConflictPolicy,
}

impl ConversionJob {
    pub fn new(folder: impl Into<PathBuf>, source: Extension, target: Extension) -> Self {
        Self {
            folder: folder.into(),
            source,
            target,
            recursive: false,
            backup: false,
            on_conflict: ConflictPolicy::default(),
        }
    }

    #[must_use]
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    #[must_use]
    pub fn backup(mut self, backup: bool) -> Self {
        self.backup = backup;
        self
    }

    #[must_use]
    pub fn on_conflict(mut self, policy: ConflictPolicy) -> Self {
        self.on_conflict = policy;
        self
    }

    /// Check the job before anything on disk is touched
    pub fn validate(&self) -> Result<(), JobError> {
        if self.source == self.target {
            return Err(JobError::InvalidJob {
                extension: self.source.to_string(),
            });
        }

        if !self.folder.exists() {
            return Err(JobError::FolderNotFound(self.folder.clone()));
        }

        if !self.folder.is_dir() {
            return Err(JobError::NotADirectory(self.folder.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn ext(s: &str) -> Extension {
        Extension::parse(s).unwrap()
    }

    #[test]
    fn test_identical_extensions_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let job = ConversionJob::new(temp_dir.path(), ext(".xlsx"), ext("xlsx"));

        let err = job.validate().unwrap_err();
        assert!(matches!(err, JobError::InvalidJob { ref extension } if extension == ".xlsx"));
    }

    #[test]
    fn test_identical_extensions_checked_before_folder() {
        let job = ConversionJob::new("/definitely/not/here", ext(".xls"), ext(".xls"));
        assert!(matches!(job.validate(), Err(JobError::InvalidJob { .. })));
    }

    #[test]
    fn test_missing_folder() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");
        let job = ConversionJob::new(&missing, ext(".xls"), ext(".xlsx"));

        assert!(matches!(job.validate(), Err(JobError::FolderNotFound(p)) if p == missing));
    }

    #[test]
    fn test_file_instead_of_folder() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a.xls");
        fs::write(&file, b"data").unwrap();
        let job = ConversionJob::new(&file, ext(".xls"), ext(".xlsx"));

        assert!(matches!(job.validate(), Err(JobError::NotADirectory(_))));
    }

    #[test]
    fn test_builder_defaults() {
        let job = ConversionJob::new(".", ext(".xls"), ext(".xlsx"));
        assert!(!job.recursive);
        assert!(!job.backup);
        assert_eq!(job.on_conflict, ConflictPolicy::Skip);

        let job = job
            .recursive(true)
            .backup(true)
            .on_conflict(ConflictPolicy::Overwrite);
        assert!(job.recursive);
        assert!(job.backup);
        assert_eq!(job.on_conflict, ConflictPolicy::Overwrite);
    }

    #[test]
    fn test_conflict_policy_parse() {
        assert_eq!("skip".parse::<ConflictPolicy>(), Ok(ConflictPolicy::Skip));
        assert_eq!(
            "Overwrite".parse::<ConflictPolicy>(),
            Ok(ConflictPolicy::Overwrite)
        );
        assert!("merge".parse::<ConflictPolicy>().is_err());
    }
}
