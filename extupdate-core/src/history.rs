use crate::extension::Extension;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Only the newest entries are kept on disk
pub const MAX_HISTORY_ENTRIES: usize = 1000;

/// File name used inside the `.extupdate` directory
pub const HISTORY_FILE_NAME: &str = "history.json";

/// Record of one completed rename
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// When the rename happened (RFC 3339)
    pub timestamp: String,
    pub old_path: PathBuf,
    pub new_path: PathBuf,
    pub old_ext: String,
    pub new_ext: String,
}

impl HistoryEntry {
    /// Paths that are not valid Unicode are stored lossily; the history is
    /// JSON and cannot hold raw bytes.
    pub fn new(old_path: PathBuf, new_path: PathBuf, old_ext: &Extension, new_ext: &Extension) -> Self {
        Self {
            timestamp: chrono::Local::now().to_rfc3339(),
            old_path: lossy(old_path),
            new_path: lossy(new_path),
            old_ext: old_ext.to_string(),
            new_ext: new_ext.to_string(),
        }
    }
}

fn lossy(path: PathBuf) -> PathBuf {
    match path.into_os_string().into_string() {
        Ok(path) => PathBuf::from(path),
        Err(raw) => PathBuf::from(raw.to_string_lossy().into_owned()),
    }
}

/// How the history file looked when it was loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum LoadStatus {
    /// Parsed successfully with this many entries
    Loaded(usize),
    /// No history file yet
    Missing,
    /// The file exists but is not a valid history document
    Corrupt(String),
    /// The file exists but could not be read
    Unreadable(String),
}

impl LoadStatus {
    /// True when the in-memory history does not reflect what is on disk
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Corrupt(_) | Self::Unreadable(_))
    }
}

/// Result of writing the history file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum SaveStatus {
    Saved,
    Failed(String),
}

impl SaveStatus {
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved)
    }
}

/// Append-only rename history backed by a JSON file
#[derive(Debug)]
pub struct History {
    path: PathBuf,
    entries: Vec<HistoryEntry>,
    load_status: LoadStatus,
}

impl History {
    /// Load history from the default location inside `extupdate_dir`
    pub fn load(extupdate_dir: &Path) -> Self {
        Self::load_from_path(&extupdate_dir.join(HISTORY_FILE_NAME))
    }

    /// Load history from a specific path.
    ///
    /// This never fails: a missing, unreadable or corrupt file yields an
    /// empty history, and [`History::load_status`] says which case applied.
    pub fn load_from_path(path: &Path) -> Self {
        let (entries, load_status) = match read_entries(path) {
            Ok(entries) => {
                let count = entries.len();
                (entries, LoadStatus::Loaded(count))
            },
            Err(LoadFailure::Missing) => (Vec::new(), LoadStatus::Missing),
            Err(LoadFailure::Unreadable(reason)) => {
                warn!(path = %path.display(), %reason, "history file unreadable, starting empty");
                (Vec::new(), LoadStatus::Unreadable(reason))
            },
            Err(LoadFailure::Corrupt(reason)) => {
                warn!(path = %path.display(), %reason, "history file corrupt, starting empty");
                (Vec::new(), LoadStatus::Corrupt(reason))
            },
        };

        let mut history = Self {
            path: path.to_path_buf(),
            entries,
            load_status,
        };
        history.truncate();
        history
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load_status(&self) -> &LoadStatus {
        &self.load_status
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries oldest first
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Entries newest first, optionally limited to the most recent N
    pub fn list_entries(&self, limit: Option<usize>) -> Vec<&HistoryEntry> {
        let newest_first = self.entries.iter().rev();
        match limit {
            Some(limit) => newest_first.take(limit).collect(),
            None => newest_first.collect(),
        }
    }

    /// Add an entry and persist the history
    pub fn append(&mut self, entry: HistoryEntry) -> SaveStatus {
        self.entries.push(entry);
        self.save()
    }

    /// Write the newest [`MAX_HISTORY_ENTRIES`] entries to disk
    pub fn save(&mut self) -> SaveStatus {
        self.truncate();
        match self.write() {
            Ok(()) => SaveStatus::Saved,
            Err(e) => {
                let reason = format!("{e:#}");
                warn!(path = %self.path.display(), %reason, "failed to save history");
                SaveStatus::Failed(reason)
            },
        }
    }

    /// Drop every entry and persist the empty history. There is no undo.
    pub fn clear(&mut self) -> SaveStatus {
        let removed = self.entries.len();
        self.entries.clear();
        debug!(removed, "history cleared");
        self.save()
    }

    fn truncate(&mut self) {
        if self.entries.len() > MAX_HISTORY_ENTRIES {
            let to_remove = self.entries.len() - MAX_HISTORY_ENTRIES;
            self.entries.drain(0..to_remove);
        }
    }

    fn write(&self) -> Result<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)
            .with_context(|| format!("Failed to create history directory: {}", parent.display()))?;

        // Write beside the target and rename over it so a crash never leaves
        // a half-written history behind
        let tmp = NamedTempFile::new_in(&parent)
            .with_context(|| format!("Failed to create temp file in: {}", parent.display()))?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, &self.entries).with_context(|| {
                format!("Failed to write history file: {}", self.path.display())
            })?;
            writer.flush()?;
        }
        tmp.persist(&self.path)
            .with_context(|| format!("Failed to replace history file: {}", self.path.display()))?;

        Ok(())
    }
}

enum LoadFailure {
    Missing,
    Unreadable(String),
    Corrupt(String),
}

fn read_entries(path: &Path) -> Result<Vec<HistoryEntry>, LoadFailure> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(LoadFailure::Missing),
        Err(e) => return Err(LoadFailure::Unreadable(e.to_string())),
    };

    serde_json::from_reader(BufReader::new(file)).map_err(|e| LoadFailure::Corrupt(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(n: usize) -> HistoryEntry {
        HistoryEntry::new(
            PathBuf::from(format!("/data/file{n}.xls")),
            PathBuf::from(format!("/data/file{n}.xlsx")),
            &Extension::parse(".xls").unwrap(),
            &Extension::parse(".xlsx").unwrap(),
        )
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let history = History::load(temp_dir.path());

        assert!(history.is_empty());
        assert_eq!(history.load_status(), &LoadStatus::Missing);
        assert!(!history.load_status().is_degraded());
        assert_eq!(history.path(), temp_dir.path().join(HISTORY_FILE_NAME));
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("history.json");
        fs::write(&path, "{ not json").unwrap();

        let history = History::load_from_path(&path);
        assert!(history.is_empty());
        assert!(matches!(history.load_status(), LoadStatus::Corrupt(_)));
        assert!(history.load_status().is_degraded());
    }

    #[test]
    fn test_wrong_shape_is_corrupt() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("history.json");
        fs::write(&path, r#"[{"timestamp": "x"}]"#).unwrap();

        let history = History::load_from_path(&path);
        assert!(matches!(history.load_status(), LoadStatus::Corrupt(_)));
    }

    #[test]
    fn test_directory_in_place_of_file_is_unreadable() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("history.json");
        fs::create_dir_all(&path).unwrap();

        let history = History::load_from_path(&path);
        assert!(history.is_empty());
        assert!(history.load_status().is_degraded());
    }

    #[test]
    fn test_append_persists_immediately() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("history.json");

        let mut history = History::load_from_path(&path);
        assert_eq!(history.append(entry(1)), SaveStatus::Saved);

        let reloaded = History::load_from_path(&path);
        assert_eq!(reloaded.load_status(), &LoadStatus::Loaded(1));
        assert_eq!(reloaded.entries(), history.entries());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_paths_do_not_block_saving() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("history.json");
        let old_path = PathBuf::from(OsStr::from_bytes(b"/data/r\xffport.xls"));
        let new_path = PathBuf::from(OsStr::from_bytes(b"/data/r\xffport.xlsx"));

        let mut history = History::load_from_path(&path);
        let status = history.append(HistoryEntry::new(
            old_path,
            new_path,
            &Extension::parse(".xls").unwrap(),
            &Extension::parse(".xlsx").unwrap(),
        ));
        assert_eq!(status, SaveStatus::Saved);

        let reloaded = History::load_from_path(&path);
        assert_eq!(reloaded.len(), 1);
        assert_eq!(
            reloaded.entries()[0].new_path,
            PathBuf::from("/data/r\u{fffd}port.xlsx")
        );
    }

    #[test]
    fn test_json_field_names() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("history.json");

        let mut history = History::load_from_path(&path);
        history.append(entry(7));

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let first = &raw.as_array().unwrap()[0];
        let mut keys: Vec<_> = first.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["new_ext", "new_path", "old_ext", "old_path", "timestamp"]);
        assert_eq!(first["old_ext"], ".xls");
        assert_eq!(first["new_ext"], ".xlsx");
    }

    #[test]
    fn test_round_trip_preserves_order() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("history.json");

        let mut history = History::load_from_path(&path);
        for i in 0..25 {
            history.entries.push(entry(i));
        }
        assert!(history.save().is_saved());

        let reloaded = History::load_from_path(&path);
        assert_eq!(reloaded.len(), 25);
        assert_eq!(reloaded.entries(), history.entries());
        assert_eq!(reloaded.entries()[0].old_path, PathBuf::from("/data/file0.xls"));
    }

    #[test]
    fn test_save_keeps_newest_thousand() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("history.json");

        let mut history = History::load_from_path(&path);
        for i in 0..1200 {
            history.entries.push(entry(i));
        }
        assert!(history.save().is_saved());
        assert_eq!(history.len(), MAX_HISTORY_ENTRIES);

        let reloaded = History::load_from_path(&path);
        assert_eq!(reloaded.len(), MAX_HISTORY_ENTRIES);
        assert_eq!(reloaded.entries()[0].old_path, PathBuf::from("/data/file200.xls"));
        assert_eq!(
            reloaded.entries()[MAX_HISTORY_ENTRIES - 1].old_path,
            PathBuf::from("/data/file1199.xls")
        );
    }

    #[test]
    fn test_oversized_file_is_trimmed_on_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("history.json");
        let entries: Vec<_> = (0..1005).map(entry).collect();
        fs::write(&path, serde_json::to_string(&entries).unwrap()).unwrap();

        let history = History::load_from_path(&path);
        assert_eq!(history.load_status(), &LoadStatus::Loaded(1005));
        assert_eq!(history.len(), MAX_HISTORY_ENTRIES);
        assert_eq!(history.entries()[0].old_path, PathBuf::from("/data/file5.xls"));
    }

    #[test]
    fn test_list_entries_newest_first() {
        let temp_dir = TempDir::new().unwrap();
        let mut history = History::load(temp_dir.path());
        for i in 0..5 {
            history.append(entry(i));
        }

        let all = history.list_entries(None);
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].old_path, PathBuf::from("/data/file4.xls"));

        let limited = history.list_entries(Some(2));
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[1].old_path, PathBuf::from("/data/file3.xls"));
    }

    #[test]
    fn test_clear_is_persisted() {
        let temp_dir = TempDir::new().unwrap();
        let mut history = History::load(temp_dir.path());
        history.append(entry(1));
        history.append(entry(2));

        assert!(history.clear().is_saved());
        assert!(history.is_empty());

        let reloaded = History::load(temp_dir.path());
        assert_eq!(reloaded.load_status(), &LoadStatus::Loaded(0));
        assert!(reloaded.is_empty());
    }

    #[test]
    fn test_save_failure_is_reported_not_raised() {
        let temp_dir = TempDir::new().unwrap();
        // A regular file where the parent directory should be
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, b"").unwrap();
        let path = blocker.join("history.json");

        let mut history = History::load_from_path(&path);
        let status = history.append(entry(1));

        assert!(matches!(status, SaveStatus::Failed(_)));
        // The in-memory entry is kept even though persisting failed
        assert_eq!(history.len(), 1);
    }
}
