use crate::error::JobError;
use crate::extension::swap_extension_os;
use crate::history::{History, HistoryEntry, SaveStatus};
use crate::job::{ConflictPolicy, ConversionJob};
use crate::scanner::{display_path, scan_candidates, FileCandidate};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File, FileTimes};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Suffix appended to a file name to form its backup copy
pub const BACKUP_SUFFIX: &str = ".backup";

/// Whether a job found anything to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Every candidate was attempted
    Completed,
    /// No file in the folder ends with the source extension
    Empty,
}

/// A file that was renamed, with paths relative to the job folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenamedFile {
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<String>,
}

/// A candidate that could not be converted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileError {
    /// Display name (relative path) of the file
    pub name: String,
    pub message: String,
}

/// Incremental progress of a running job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
    /// Display name of the file just handled
    pub current: String,
}

impl Progress {
    /// Completion percentage, 0 to 100
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        u8::try_from(self.processed.min(self.total) * 100 / self.total).unwrap_or(100)
    }
}

/// Outcome of one conversion job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionReport {
    pub status: JobStatus,
    pub folder: PathBuf,
    pub source: String,
    pub target: String,
    pub converted: usize,
    pub attempted: usize,
    pub renamed: Vec<RenamedFile>,
    pub errors: Vec<FileError>,
    /// `None` when no history entry was written. Otherwise the first failed
    /// save, or `Saved` if every save succeeded.
    #[serde(skip_deserializing)]
    pub history: Option<SaveStatus>,
}

impl ConversionReport {
    pub(crate) fn new(job: &ConversionJob, status: JobStatus) -> Self {
        Self {
            status,
            folder: job.folder.clone(),
            source: job.source.to_string(),
            target: job.target.to_string(),
            converted: 0,
            attempted: 0,
            renamed: Vec::new(),
            errors: Vec::new(),
            history: None,
        }
    }

    pub fn is_empty_job(&self) -> bool {
        self.status == JobStatus::Empty
    }

    pub fn has_failures(&self) -> bool {
        !self.errors.is_empty()
    }

    fn record_history(&mut self, status: SaveStatus) {
        match (&self.history, &status) {
            (Some(SaveStatus::Failed(_)), _) => {},
            _ => self.history = Some(status),
        }
    }
}

/// Validate, scan and convert in one synchronous call
pub fn run_job(
    job: &ConversionJob,
    history: &mut History,
    on_progress: impl FnMut(&Progress),
) -> Result<ConversionReport, JobError> {
    job.validate()?;
    let candidates = scan_candidates(job)?;
    Ok(convert_candidates(job, &candidates, history, on_progress))
}

/// Swap the extension of every candidate.
///
/// A failure on one file is recorded in the report and the loop moves on to
/// the next candidate; the job as a whole never aborts. Each successful
/// rename is appended to `history` and persisted right away.
pub fn convert_candidates(
    job: &ConversionJob,
    candidates: &[FileCandidate],
    history: &mut History,
    mut on_progress: impl FnMut(&Progress),
) -> ConversionReport {
    if candidates.is_empty() {
        info!(folder = %job.folder.display(), source = %job.source, "no matching files");
        return ConversionReport::new(job, JobStatus::Empty);
    }

    let mut report = ConversionReport::new(job, JobStatus::Completed);
    let total = candidates.len();

    for (index, candidate) in candidates.iter().enumerate() {
        let name = candidate.display_name();
        report.attempted += 1;

        match convert_one(job, candidate) {
            Ok(converted) => {
                debug!(from = %name, to = %converted.to, "renamed");
                report.converted += 1;

                let entry = HistoryEntry::new(
                    candidate.path.clone(),
                    converted.new_path,
                    &job.source,
                    &job.target,
                );
                report.record_history(history.append(entry));

                report.renamed.push(RenamedFile {
                    from: name.clone(),
                    to: converted.to,
                    backup: converted.backup,
                });
            },
            Err(e) => {
                let message = format!("{e:#}");
                warn!(file = %name, error = %message, "conversion failed");
                report.errors.push(FileError {
                    name: name.clone(),
                    message,
                });
            },
        }

        on_progress(&Progress {
            processed: index + 1,
            total,
            current: name,
        });
    }

    info!(
        folder = %job.folder.display(),
        converted = report.converted,
        attempted = report.attempted,
        failed = report.errors.len(),
        "conversion finished"
    );

    report
}

struct Converted {
    new_path: PathBuf,
    to: String,
    backup: Option<String>,
}

fn convert_one(job: &ConversionJob, candidate: &FileCandidate) -> Result<Converted> {
    let destination = destination_path(&candidate.path, job)?;

    if job.on_conflict == ConflictPolicy::Skip
        && destination_occupied(&candidate.path, &destination)
    {
        return Err(anyhow!(
            "destination already exists: {}",
            display_path(&relative_to(&destination, &job.folder))
        ));
    }

    let backup = if job.backup {
        let backup_path = backup_file(&candidate.path)?;
        Some(display_path(&relative_to(&backup_path, &job.folder)))
    } else {
        None
    };

    fs::rename(&candidate.path, &destination).with_context(|| {
        format!(
            "Failed to rename {} to {}",
            candidate.path.display(),
            destination.display()
        )
    })?;

    Ok(Converted {
        to: display_path(&relative_to(&destination, &job.folder)),
        new_path: destination,
        backup,
    })
}

/// Path the candidate will have after its extension is swapped
pub fn destination_path(path: &Path, job: &ConversionJob) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("path has no file name: {}", path.display()))?;

    let new_name = swap_extension_os(file_name, &job.source, &job.target).ok_or_else(|| {
        if file_name.to_str().is_none() {
            anyhow!("file name is not valid Unicode: {}", path.display())
        } else {
            anyhow!("'{}' does not end with {}", file_name.to_string_lossy(), job.source)
        }
    })?;

    Ok(path.with_file_name(new_name))
}

/// Path of the backup copy for `path`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// Copy `path` to `<path>.backup`, keeping permissions and timestamps, and
/// check the copy is byte-identical before returning.
pub fn backup_file(path: &Path) -> Result<PathBuf> {
    let backup = backup_path(path);

    fs::copy(path, &backup).with_context(|| {
        format!(
            "Failed to back up {} to {}",
            path.display(),
            backup.display()
        )
    })?;

    let metadata = fs::metadata(path)
        .with_context(|| format!("Failed to read metadata for {}", path.display()))?;
    let mut times = FileTimes::new();
    if let Ok(modified) = metadata.modified() {
        times = times.set_modified(modified);
    }
    if let Ok(accessed) = metadata.accessed() {
        times = times.set_accessed(accessed);
    }
    File::options()
        .write(true)
        .open(&backup)
        .and_then(|f| f.set_times(times))
        .with_context(|| format!("Failed to copy timestamps to {}", backup.display()))?;

    let original = calculate_checksum(path)?;
    let copied = calculate_checksum(&backup)?;
    if original != copied {
        return Err(anyhow!(
            "backup {} does not match the original",
            backup.display()
        ));
    }

    Ok(backup)
}

/// SHA-256 of a file's contents as lowercase hex
pub fn calculate_checksum(path: &Path) -> Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// True if something other than `source` itself already sits at `destination`.
///
/// On case-insensitive filesystems `a.XLS -> a.xls` resolves to the same file,
/// which is not a conflict.
fn destination_occupied(source: &Path, destination: &Path) -> bool {
    if fs::symlink_metadata(destination).is_err() {
        return false;
    }
    !is_same_file(source, destination)
}

#[cfg(unix)]
fn is_same_file(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    match (fs::metadata(a), fs::metadata(b)) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn relative_to(path: &Path, root: &Path) -> PathBuf {
    path.strip_prefix(root).unwrap_or(path).to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::Extension;
    use tempfile::TempDir;

    fn ext(s: &str) -> Extension {
        Extension::parse(s).unwrap()
    }

    fn setup() -> (TempDir, History) {
        let temp_dir = TempDir::new().unwrap();
        let history = History::load_from_path(&temp_dir.path().join(".extupdate/history.json"));
        (temp_dir, history)
    }

    fn work_dir(temp_dir: &TempDir) -> PathBuf {
        let dir = temp_dir.path().join("work");
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_destination_path_swaps_suffix() {
        let job = ConversionJob::new("/data", ext(".xls"), ext(".xlsm"));
        assert_eq!(
            destination_path(Path::new("/data/a.b.xls"), &job).unwrap(),
            PathBuf::from("/data/a.b.xlsm")
        );
        assert!(destination_path(Path::new("/data/a.csv"), &job).is_err());
    }

    #[test]
    fn test_backup_path_appends_suffix() {
        assert_eq!(
            backup_path(Path::new("/data/a.xls")),
            PathBuf::from("/data/a.xls.backup")
        );
    }

    #[test]
    fn test_backup_is_identical_and_keeps_mtime() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a.xls");
        fs::write(&file, b"\xD0\xCF\x11\xE0 legacy workbook").unwrap();

        let backup = backup_file(&file).unwrap();
        assert_eq!(fs::read(&backup).unwrap(), fs::read(&file).unwrap());
        assert_eq!(
            fs::metadata(&backup).unwrap().modified().unwrap(),
            fs::metadata(&file).unwrap().modified().unwrap()
        );
    }

    #[test]
    fn test_example_folder() {
        let (temp_dir, mut history) = setup();
        let dir = work_dir(&temp_dir);
        fs::write(dir.join("a.xls"), b"a").unwrap();
        fs::write(dir.join("b.xls"), b"b").unwrap();
        fs::write(dir.join("c.xlsx"), b"c").unwrap();

        let job = ConversionJob::new(&dir, ext(".xls"), ext(".xlsx"));
        let report = run_job(&job, &mut history, |_| {}).unwrap();

        assert_eq!(report.status, JobStatus::Completed);
        assert_eq!(report.converted, 2);
        assert_eq!(report.attempted, 2);
        assert!(report.errors.is_empty());
        assert!(dir.join("a.xlsx").exists());
        assert!(dir.join("b.xlsx").exists());
        assert!(!dir.join("a.xls").exists());
        assert!(!dir.join("b.xls").exists());
        assert_eq!(fs::read(dir.join("c.xlsx")).unwrap(), b"c");
        assert!(!dir.join("a.xls.backup").exists());

        assert_eq!(history.len(), 2);
        assert_eq!(report.history, Some(SaveStatus::Saved));
        let first = &history.entries()[0];
        assert_eq!(first.old_path, dir.join("a.xls"));
        assert_eq!(first.new_path, dir.join("a.xlsx"));
        assert_eq!(first.old_ext, ".xls");
        assert_eq!(first.new_ext, ".xlsx");
    }

    #[test]
    fn test_invalid_job_touches_nothing() {
        let (temp_dir, mut history) = setup();
        let dir = work_dir(&temp_dir);
        fs::write(dir.join("c.xlsx"), b"c").unwrap();

        let job = ConversionJob::new(&dir, ext(".xlsx"), ext(".xlsx"));
        let result = run_job(&job, &mut history, |_| {});

        assert!(matches!(result, Err(JobError::InvalidJob { .. })));
        assert!(dir.join("c.xlsx").exists());
        assert!(history.is_empty());
        assert!(!temp_dir.path().join(".extupdate/history.json").exists());
    }

    #[test]
    fn test_empty_job() {
        let (temp_dir, mut history) = setup();
        let dir = work_dir(&temp_dir);
        fs::write(dir.join("c.xlsx"), b"c").unwrap();

        let job = ConversionJob::new(&dir, ext(".xls"), ext(".xlsx")).backup(true);
        let mut calls = 0;
        let report = run_job(&job, &mut history, |_| calls += 1).unwrap();

        assert!(report.is_empty_job());
        assert_eq!(report.converted, 0);
        assert_eq!(report.attempted, 0);
        assert_eq!(report.history, None);
        assert_eq!(calls, 0);
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 1);
        assert!(!temp_dir.path().join(".extupdate").exists());
    }

    #[test]
    fn test_backups_created_for_each_conversion() {
        let (temp_dir, mut history) = setup();
        let dir = work_dir(&temp_dir);
        fs::write(dir.join("a.xls"), b"alpha").unwrap();
        fs::write(dir.join("b.xls"), b"beta").unwrap();

        let job = ConversionJob::new(&dir, ext(".xls"), ext(".xlsx")).backup(true);
        let report = run_job(&job, &mut history, |_| {}).unwrap();

        assert_eq!(report.converted, 2);
        assert_eq!(fs::read(dir.join("a.xls.backup")).unwrap(), b"alpha");
        assert_eq!(fs::read(dir.join("b.xls.backup")).unwrap(), b"beta");
        assert_eq!(fs::read(dir.join("a.xlsx")).unwrap(), b"alpha");
        assert_eq!(report.renamed[0].backup.as_deref(), Some("a.xls.backup"));
    }

    #[test]
    fn test_existing_destination_is_skipped() {
        let (temp_dir, mut history) = setup();
        let dir = work_dir(&temp_dir);
        fs::write(dir.join("a.xls"), b"old").unwrap();
        fs::write(dir.join("a.xlsx"), b"keep me").unwrap();
        fs::write(dir.join("b.xls"), b"b").unwrap();

        let job = ConversionJob::new(&dir, ext(".xls"), ext(".xlsx")).backup(true);
        let report = run_job(&job, &mut history, |_| {}).unwrap();

        assert_eq!(report.converted, 1);
        assert_eq!(report.attempted, 2);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].name, "a.xls");
        assert!(report.errors[0].message.contains("already exists"));
        assert_eq!(fs::read(dir.join("a.xlsx")).unwrap(), b"keep me");
        assert_eq!(fs::read(dir.join("a.xls")).unwrap(), b"old");
        // Conflict is detected before the backup is written
        assert!(!dir.join("a.xls.backup").exists());
        assert!(dir.join("b.xlsx").exists());
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_overwrite_policy_replaces_destination() {
        let (temp_dir, mut history) = setup();
        let dir = work_dir(&temp_dir);
        fs::write(dir.join("a.xls"), b"new").unwrap();
        fs::write(dir.join("a.xlsx"), b"stale").unwrap();

        let job = ConversionJob::new(&dir, ext(".xls"), ext(".xlsx"))
            .on_conflict(ConflictPolicy::Overwrite);
        let report = run_job(&job, &mut history, |_| {}).unwrap();

        assert_eq!(report.converted, 1);
        assert_eq!(fs::read(dir.join("a.xlsx")).unwrap(), b"new");
        assert!(!dir.join("a.xls").exists());
    }

    #[test]
    fn test_failure_does_not_stop_batch() {
        let (temp_dir, mut history) = setup();
        let dir = work_dir(&temp_dir);
        fs::write(dir.join("a.xls"), b"a").unwrap();
        fs::write(dir.join("b.xls"), b"b").unwrap();
        fs::write(dir.join("c.xls"), b"c").unwrap();

        let job = ConversionJob::new(&dir, ext(".xls"), ext(".xlsx"));
        let candidates = scan_candidates(&job).unwrap();
        // b.xls disappears between scan and conversion
        fs::remove_file(dir.join("b.xls")).unwrap();

        let report = convert_candidates(&job, &candidates, &mut history, |_| {});
        assert_eq!(report.attempted, 3);
        assert_eq!(report.converted, 2);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].name, "b.xls");
        assert!(dir.join("a.xlsx").exists());
        assert!(dir.join("c.xlsx").exists());
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_recursive_reports_relative_paths() {
        let (temp_dir, mut history) = setup();
        let dir = work_dir(&temp_dir);
        fs::create_dir_all(dir.join("2023/q4")).unwrap();
        fs::write(dir.join("root.xls"), b"r").unwrap();
        fs::write(dir.join("2023/q4/sales.xls"), b"s").unwrap();

        let job = ConversionJob::new(&dir, ext(".xls"), ext(".xlsx")).recursive(true);
        let report = run_job(&job, &mut history, |_| {}).unwrap();

        assert_eq!(report.converted, 2);
        let mut moved: Vec<_> = report
            .renamed
            .iter()
            .map(|r| (r.from.as_str(), r.to.as_str()))
            .collect();
        moved.sort_unstable();
        assert_eq!(
            moved,
            vec![
                ("2023/q4/sales.xls", "2023/q4/sales.xlsx"),
                ("root.xls", "root.xlsx"),
            ]
        );
        assert!(dir.join("2023/q4/sales.xlsx").exists());
    }

    #[test]
    fn test_progress_reaches_total() {
        let (temp_dir, mut history) = setup();
        let dir = work_dir(&temp_dir);
        for name in ["a.xls", "b.xls", "c.xls", "d.xls"] {
            fs::write(dir.join(name), b"x").unwrap();
        }

        let job = ConversionJob::new(&dir, ext(".xls"), ext(".xlsb"));
        let mut seen = Vec::new();
        run_job(&job, &mut history, |p| seen.push(p.clone())).unwrap();

        assert_eq!(seen.len(), 4);
        assert_eq!(seen.iter().map(Progress::percent).collect::<Vec<_>>(), vec![25, 50, 75, 100]);
        assert_eq!(seen[0].current, "a.xls");
        assert!(seen.iter().all(|p| p.total == 4));
    }

    #[test]
    fn test_history_failure_is_surfaced() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, b"").unwrap();
        let mut history = History::load_from_path(&blocker.join("history.json"));

        let dir = work_dir(&temp_dir);
        fs::write(dir.join("a.xls"), b"a").unwrap();

        let job = ConversionJob::new(&dir, ext(".xls"), ext(".xlsx"));
        let report = run_job(&job, &mut history, |_| {}).unwrap();

        // The rename itself still counts
        assert_eq!(report.converted, 1);
        assert!(matches!(report.history, Some(SaveStatus::Failed(_))));
    }
}
