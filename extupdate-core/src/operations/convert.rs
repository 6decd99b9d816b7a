use crate::convert::{ConversionReport, JobStatus, Progress};
use crate::history::History;
use crate::job::ConversionJob;
use crate::lock::LockFile;
use crate::runner::spawn_conversion;
use crate::scanner::scan_candidates;
use crate::workspace::Workspace;
use anyhow::{Context, Result};
use tracing::info;

/// Convert operation - validates the job, then renames every candidate on a
/// background thread while `on_progress` receives updates on this one.
///
/// Rejected jobs (identical extensions, missing folder) return a
/// [`crate::JobError`] before the lock is taken or any file is touched. A job
/// with no matching files returns an empty report without writing anything,
/// not even the lock file.
pub fn convert_operation(
    job: &ConversionJob,
    workspace: &Workspace,
    on_progress: impl FnMut(&Progress),
) -> Result<ConversionReport> {
    job.validate()?;

    if scan_candidates(job)?.is_empty() {
        info!(folder = %job.folder.display(), source = %job.source, "no matching files");
        return Ok(ConversionReport::new(job, JobStatus::Empty));
    }

    let _lock = LockFile::acquire(&workspace.state_dir())
        .context("Failed to acquire lock for conversion")?;

    // Scan again under the lock; another job may have renamed files meanwhile
    let candidates = scan_candidates(job)?;
    info!(
        folder = %job.folder.display(),
        source = %job.source,
        target = %job.target,
        candidates = candidates.len(),
        backup = job.backup,
        recursive = job.recursive,
        "starting conversion"
    );

    let history = History::load_from_path(&workspace.history_path);
    let handle = spawn_conversion(job.clone(), candidates, history)?;
    let (report, _history) = handle.wait(on_progress)?;

    Ok(report)
}
