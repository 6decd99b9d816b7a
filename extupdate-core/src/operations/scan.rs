use crate::error::JobError;
use crate::extension::Extension;
use crate::output::ScanResult;
use crate::scanner::scan_folder;
use std::path::Path;

/// Scan operation - lists the files a conversion would attempt, touching nothing
pub fn scan_operation(
    folder: &Path,
    source: &Extension,
    recursive: bool,
) -> Result<ScanResult, JobError> {
    if !folder.exists() {
        return Err(JobError::FolderNotFound(folder.to_path_buf()));
    }
    if !folder.is_dir() {
        return Err(JobError::NotADirectory(folder.to_path_buf()));
    }

    let files = scan_folder(folder, source, recursive)?;

    Ok(ScanResult {
        folder: folder.to_path_buf(),
        source: source.to_string(),
        recursive,
        files,
    })
}
