use std::path::PathBuf;
use thiserror::Error;

/// Reasons a conversion job is rejected before any file is touched
#[derive(Debug, Error)]
pub enum JobError {
    /// Source and target extensions are identical
    #[error("invalid job: source and target extensions are both '{extension}'")]
    InvalidJob { extension: String },

    #[error("invalid extension: {0}")]
    InvalidExtension(#[from] ExtensionError),

    #[error("folder not found: {}", .0.display())]
    FolderNotFound(PathBuf),

    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// The folder itself could not be listed
    #[error("failed to read folder {}: {source}", path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Problems with a user supplied extension string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtensionError {
    #[error("extension is empty")]
    Empty,

    #[error("'{0}' contains a path separator")]
    ContainsSeparator(String),

    #[error("'{0}' contains a NUL byte")]
    ContainsNul(String),
}

/// Another live process holds the workspace lock
#[derive(Debug, Error)]
#[error(
    "Another extupdate job is already running (PID: {pid}). \
     If this is incorrect, remove the lock file at: {}",
    path.display()
)]
pub struct LockHeld {
    pub pid: u32,
    pub path: PathBuf,
}
