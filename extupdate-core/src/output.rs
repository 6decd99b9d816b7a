use crate::convert::ConversionReport;
use crate::history::{HistoryEntry, LoadStatus, SaveStatus};
use crate::report;
use crate::scanner::FileCandidate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt::Write;
use std::path::PathBuf;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Summary,
    Json,
}

/// Result of a scan: the files a conversion would attempt
#[derive(Debug, Serialize, Deserialize)]
pub struct ScanResult {
    pub folder: PathBuf,
    pub source: String,
    pub recursive: bool,
    pub files: Vec<FileCandidate>,
}

impl ScanResult {
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}

/// Result of listing the rename history
#[derive(Debug, Serialize)]
pub struct HistoryResult {
    pub path: PathBuf,
    pub load_status: LoadStatus,
    /// Total entries in the log, before any limit was applied
    pub total: usize,
    /// Newest first
    pub entries: Vec<HistoryEntry>,
}

/// Result of wiping the rename history
#[derive(Debug, Serialize)]
pub struct ClearHistoryResult {
    pub path: PathBuf,
    pub removed: usize,
    pub status: SaveStatus,
}

/// Result of a version command
#[derive(Debug, Serialize, Deserialize)]
pub struct VersionResult {
    pub name: String,
    pub version: String,
}

// Paths go out lossily: JSON strings cannot carry names that are not Unicode
fn file_json(file: &FileCandidate) -> serde_json::Value {
    json!({
        "path": file.path.to_string_lossy(),
        "relative_path": file.display_name(),
        "size": file.size,
        "modified": file.modified,
    })
}

/// Trait for formatting output in different formats
pub trait OutputFormatter {
    fn format(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Json => self.format_json(),
            OutputFormat::Summary => self.format_summary(),
        }
    }
    fn format_json(&self) -> String;
    fn format_summary(&self) -> String;
}

impl OutputFormatter for ScanResult {
    fn format_json(&self) -> String {
        serde_json::to_string(&json!({
            "success": true,
            "operation": "scan",
            "folder": self.folder.to_string_lossy(),
            "source": self.source,
            "recursive": self.recursive,
            "summary": {
                "files": self.files.len(),
                "total_bytes": self.total_size(),
            },
            "files": self.files.iter().map(file_json).collect::<Vec<_>>(),
        }))
        .unwrap_or_default()
    }

    fn format_summary(&self) -> String {
        report::render_scan(self, false)
    }
}

impl OutputFormatter for ConversionReport {
    fn format_json(&self) -> String {
        serde_json::to_string(&json!({
            "success": self.errors.is_empty(),
            "operation": "convert",
            "status": self.status,
            "folder": self.folder.to_string_lossy(),
            "source": self.source,
            "target": self.target,
            "summary": {
                "converted": self.converted,
                "attempted": self.attempted,
                "failed": self.errors.len(),
            },
            "renamed": self.renamed,
            "errors": self.errors,
            "history": self.history,
        }))
        .unwrap_or_default()
    }

    fn format_summary(&self) -> String {
        report::render_conversion(self, false)
    }
}

impl OutputFormatter for HistoryResult {
    fn format_json(&self) -> String {
        serde_json::to_string(&json!({
            "path": self.path.to_string_lossy(),
            "load_status": self.load_status,
            "total": self.total,
            "entries": self.entries,
        }))
        .unwrap_or_default()
    }

    fn format_summary(&self) -> String {
        report::render_history(self, false)
    }
}

impl OutputFormatter for ClearHistoryResult {
    fn format_json(&self) -> String {
        serde_json::to_string(&json!({
            "success": self.status.is_saved(),
            "operation": "clear_history",
            "path": self.path.to_string_lossy(),
            "removed": self.removed,
            "status": self.status,
        }))
        .unwrap_or_default()
    }

    fn format_summary(&self) -> String {
        match &self.status {
            SaveStatus::Saved => format!("✓ Cleared {} history entries\n", self.removed),
            SaveStatus::Failed(reason) => {
                format!("⚠️  History cleared in memory but not saved: {reason}\n")
            },
        }
    }
}

impl OutputFormatter for VersionResult {
    fn format_json(&self) -> String {
        serde_json::to_string(&self).unwrap_or_default()
    }

    fn format_summary(&self) -> String {
        format!("{} {}", self.name, self.version)
    }
}

/// The fixed extension list, one per line, marking the given defaults
pub fn format_extensions(source: &str, target: &str) -> String {
    let mut output = String::new();
    for ext in crate::extension::EXCEL_EXTENSIONS {
        let mut marks = Vec::new();
        if ext == source {
            marks.push("default source");
        }
        if ext == target {
            marks.push("default target");
        }
        if marks.is_empty() {
            writeln!(output, "{ext}").unwrap();
        } else {
            writeln!(output, "{ext} ({})", marks.join(", ")).unwrap();
        }
    }
    output
}
