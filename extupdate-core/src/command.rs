//! One explicit command per user action.
//!
//! Front ends build a [`Command`] and hand it to [`execute`]. Scans and
//! history queries finish synchronously; a conversion runs its rename loop on
//! a background thread and streams [`Progress`] through the callback.

use crate::convert::{ConversionReport, Progress};
use crate::extension::Extension;
use crate::job::ConversionJob;
use crate::operations::{
    clear_history_operation, convert_operation, history_operation, scan_operation,
};
use crate::output::{ClearHistoryResult, HistoryResult, ScanResult};
use crate::workspace::Workspace;
use anyhow::Result;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub enum Command {
    /// List candidate files without renaming anything
    Scan {
        folder: PathBuf,
        source: Extension,
        recursive: bool,
    },
    /// Swap extensions for every candidate in the job
    Convert(ConversionJob),
    /// Show the rename log, newest first
    History { limit: Option<usize> },
    /// Wipe the rename log
    ClearHistory,
}

#[derive(Debug)]
pub enum CommandOutcome {
    Scanned(ScanResult),
    Converted(ConversionReport),
    History(HistoryResult),
    HistoryCleared(ClearHistoryResult),
}

/// Run `command` against `workspace`.
///
/// `on_progress` is only called for [`Command::Convert`].
pub fn execute(
    command: Command,
    workspace: &Workspace,
    on_progress: impl FnMut(&Progress),
) -> Result<CommandOutcome> {
    let outcome = match command {
        Command::Scan {
            folder,
            source,
            recursive,
        } => CommandOutcome::Scanned(scan_operation(&folder, &source, recursive)?),
        Command::Convert(job) => {
            CommandOutcome::Converted(convert_operation(&job, workspace, on_progress)?)
        },
        Command::History { limit } => CommandOutcome::History(history_operation(workspace, limit)),
        Command::ClearHistory => CommandOutcome::HistoryCleared(clear_history_operation(workspace)),
    };

    Ok(outcome)
}
