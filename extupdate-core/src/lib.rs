#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod command;
pub mod config;
pub mod convert;
pub mod error;
pub mod extension;
pub mod history;
pub mod job;
pub mod lock;
pub mod operations;
pub mod output;
pub mod report;
pub mod runner;
pub mod scanner;
pub mod workspace;

pub use command::{execute, Command, CommandOutcome};
pub use config::{Config, EXTUPDATE_DIR};
pub use convert::{
    backup_file, backup_path, convert_candidates, run_job, ConversionReport, FileError, JobStatus,
    Progress, RenamedFile, BACKUP_SUFFIX,
};
pub use error::{ExtensionError, JobError, LockHeld};
pub use extension::{swap_extension, swap_extension_os, Extension, EXCEL_EXTENSIONS};
pub use history::{
    History, HistoryEntry, LoadStatus, SaveStatus, HISTORY_FILE_NAME, MAX_HISTORY_ENTRIES,
};
pub use job::{ConflictPolicy, ConversionJob};
pub use lock::LockFile;
pub use operations::{
    clear_history_operation, convert_operation, history_operation, scan_operation,
};
pub use output::{
    format_extensions, ClearHistoryResult, HistoryResult, OutputFormat, OutputFormatter,
    ScanResult, VersionResult,
};
pub use report::{render_conversion, render_history, render_scan};
pub use runner::{spawn_conversion, ConversionHandle};
pub use scanner::{scan_candidates, scan_folder, FileCandidate};
pub use workspace::Workspace;
