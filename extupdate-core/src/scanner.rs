use crate::error::JobError;
use crate::extension::Extension;
use crate::job::ConversionJob;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A file selected for conversion because its name ends with the source extension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCandidate {
    /// Absolute (or job-relative, if the job folder was relative) path on disk
    pub path: PathBuf,
    /// Path relative to the job folder, used for display and reports
    pub relative_path: PathBuf,
    /// Size in bytes at scan time
    pub size: u64,
    /// Last modification time, if the platform reports one
    pub modified: Option<DateTime<Local>>,
}

impl FileCandidate {
    /// Name shown to users: the relative path with forward slashes
    pub fn display_name(&self) -> String {
        display_path(&self.relative_path)
    }
}

/// Render a relative path with `/` separators on every platform
pub fn display_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// List every regular file under the job folder whose name ends with the
/// job's source extension.
pub fn scan_candidates(job: &ConversionJob) -> Result<Vec<FileCandidate>, JobError> {
    scan_folder(&job.folder, &job.source, job.recursive)
}

/// List every regular file in `folder` whose name ends with `source`.
///
/// Only direct children are considered unless `recursive` is set. No file
/// contents are read. Entries are visited in file-name order so results are
/// stable between runs.
pub fn scan_folder(
    folder: &Path,
    source: &Extension,
    recursive: bool,
) -> Result<Vec<FileCandidate>, JobError> {
    let max_depth = if recursive { usize::MAX } else { 1 };
    let walker = WalkDir::new(folder)
        .min_depth(1)
        .max_depth(max_depth)
        .follow_links(false)
        .sort_by_file_name();

    let mut candidates = Vec::new();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                // The root itself failing to list is fatal for the job; anything
                // deeper is skipped so one unreadable subfolder does not hide the rest
                let at_root = err.depth() == 0 || err.path().is_some_and(|p| p == folder);
                if at_root {
                    let path = folder.to_path_buf();
                    let io_err = err.into_io_error().unwrap_or_else(|| {
                        std::io::Error::new(std::io::ErrorKind::Other, "filesystem loop detected")
                    });
                    return Err(JobError::Scan {
                        path,
                        source: io_err,
                    });
                }
                warn!(error = %err, "skipping unreadable entry");
                continue;
            },
        };

        if !entry.file_type().is_file() {
            continue;
        }

        if !source.matches_os(entry.file_name()) {
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(path = %entry.path().display(), error = %err, "skipping file without metadata");
                continue;
            },
        };

        let relative_path = entry
            .path()
            .strip_prefix(folder)
            .unwrap_or_else(|_| entry.path())
            .to_path_buf();

        candidates.push(FileCandidate {
            path: entry.path().to_path_buf(),
            relative_path,
            size: metadata.len(),
            modified: metadata.modified().ok().map(DateTime::<Local>::from),
        });
    }

    debug!(
        folder = %folder.display(),
        %source,
        recursive,
        found = candidates.len(),
        "scan complete"
    );

    Ok(candidates)
}
