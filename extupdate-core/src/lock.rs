use crate::error::LockHeld;
use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

const LOCK_FILE_NAME: &str = "extupdate.lock";
/// Only consulted when the holder's liveness cannot be checked
const STALE_LOCK_TIMEOUT_SECS: u64 = 3600; // 1 hour

/// Guards a workspace so only one conversion job mutates it at a time
#[derive(Debug)]
pub struct LockFile {
    path: PathBuf,
    pid: u32,
    timestamp: u64,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

impl LockFile {
    /// Acquire the lock inside `extupdate_dir`.
    ///
    /// A lock left behind by a dead process is removed and taken over. A live
    /// holder yields a [`LockHeld`] error however long its job has been
    /// running. Age only matters on platforms where liveness is unknown.
    pub fn acquire(extupdate_dir: &Path) -> Result<Self> {
        let lock_path = extupdate_dir.join(LOCK_FILE_NAME);

        if lock_path.exists() {
            let mut content = String::new();
            File::open(&lock_path)
                .context("Failed to read lock file")?
                .read_to_string(&mut content)
                .context("Failed to read lock file content")?;

            // Format: "pid:timestamp"
            match parse_lock(&content) {
                Some((pid, timestamp)) => {
                    if holder_gone(process_liveness(pid), timestamp, now_secs()) {
                        debug!(pid, "removing lock of exited process");
                        fs::remove_file(&lock_path)
                            .context("Failed to remove orphaned lock file")?;
                    } else {
                        return Err(LockHeld {
                            pid,
                            path: lock_path,
                        }
                        .into());
                    }
                },
                None => {
                    debug!("removing malformed lock");
                    fs::remove_file(&lock_path).context("Failed to remove malformed lock file")?;
                },
            }
        }

        let pid = process::id();
        let timestamp = now_secs();

        fs::create_dir_all(extupdate_dir).context("Failed to create .extupdate directory")?;

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true) // Fail if another process won the race
            .open(&lock_path)
            .context("Failed to create lock file")?;

        file.write_all(format!("{pid}:{timestamp}").as_bytes())
            .context("Failed to write lock file")?;

        Ok(Self {
            path: lock_path,
            pid,
            timestamp,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock if it is still ours
    pub fn release(self) -> Result<()> {
        self.remove_if_owned()
    }

    fn remove_if_owned(&self) -> Result<()> {
        if self.path.exists() {
            let content = fs::read_to_string(&self.path).context("Failed to read lock file")?;
            if parse_lock(&content) == Some((self.pid, self.timestamp)) {
                fs::remove_file(&self.path).context("Failed to remove lock file")?;
            }
        }
        Ok(())
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        let _ = self.remove_if_owned();
    }
}

fn parse_lock(content: &str) -> Option<(u32, u64)> {
    let (pid, timestamp) = content.trim().split_once(':')?;
    Some((pid.parse().ok()?, timestamp.parse().ok()?))
}

/// Whether the lock holder has gone away, given what is known about its
/// process
fn holder_gone(alive: Option<bool>, timestamp: u64, now: u64) -> bool {
    match alive {
        Some(alive) => !alive,
        None => now.saturating_sub(timestamp) > STALE_LOCK_TIMEOUT_SECS,
    }
}

/// Check if a process with the given PID is running. `None` when the
/// platform gives no answer.
#[cfg(unix)]
fn process_liveness(pid: u32) -> Option<bool> {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return Some(false);
    };
    // Signal 0 checks for existence without delivering anything
    if unsafe { libc::kill(pid, 0) } == 0 {
        return Some(true);
    }
    match std::io::Error::last_os_error().raw_os_error() {
        // Exists but belongs to another user
        Some(libc::EPERM) => Some(true),
        Some(libc::ESRCH) => Some(false),
        _ => None,
    }
}

#[cfg(windows)]
fn process_liveness(pid: u32) -> Option<bool> {
    use winapi::um::handleapi::CloseHandle;
    use winapi::um::processthreadsapi::OpenProcess;
    use winapi::um::winnt::PROCESS_QUERY_INFORMATION;

    const ERROR_ACCESS_DENIED: i32 = 5;
    const ERROR_INVALID_PARAMETER: i32 = 87;

    unsafe {
        let handle = OpenProcess(PROCESS_QUERY_INFORMATION, 0, pid);
        if handle.is_null() {
            match std::io::Error::last_os_error().raw_os_error() {
                Some(ERROR_ACCESS_DENIED) => Some(true),
                Some(ERROR_INVALID_PARAMETER) => Some(false),
                _ => None,
            }
        } else {
            CloseHandle(handle);
            Some(true)
        }
    }
}

#[cfg(not(any(unix, windows)))]
fn process_liveness(_pid: u32) -> Option<bool> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_acquire_and_release() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join(".extupdate");

        let lock = LockFile::acquire(&dir).unwrap();
        assert!(dir.join(LOCK_FILE_NAME).exists());
        assert_eq!(lock.pid, process::id());

        lock.release().unwrap();
        assert!(!dir.join(LOCK_FILE_NAME).exists());
    }

    #[test]
    fn test_second_acquire_reports_holder() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join(".extupdate");

        let _held = LockFile::acquire(&dir).unwrap();
        let err = LockFile::acquire(&dir).unwrap_err();

        let held = err.downcast_ref::<LockHeld>().expect("LockHeld error");
        assert_eq!(held.pid, process::id());
        assert!(err.to_string().contains("already running"));
    }

    #[test]
    fn test_long_running_holder_keeps_lock() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join(".extupdate");
        fs::create_dir_all(&dir).unwrap();

        // This process is alive, so an old timestamp alone must not free the lock
        let old = now_secs() - (STALE_LOCK_TIMEOUT_SECS * 5);
        fs::write(dir.join(LOCK_FILE_NAME), format!("{}:{old}", process::id())).unwrap();

        let err = LockFile::acquire(&dir).unwrap_err();
        assert!(err.downcast_ref::<LockHeld>().is_some());
        assert!(dir.join(LOCK_FILE_NAME).exists());
    }

    #[test]
    fn test_holder_gone() {
        let now = 1_700_000_000;
        let old = now - STALE_LOCK_TIMEOUT_SECS - 1;

        assert!(!holder_gone(Some(true), old, now));
        assert!(holder_gone(Some(false), now, now));
        assert!(holder_gone(None, old, now));
        assert!(!holder_gone(None, now - 10, now));
    }

    #[test]
    fn test_orphaned_lock_is_taken_over() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join(".extupdate");
        fs::create_dir_all(&dir).unwrap();

        fs::write(dir.join(LOCK_FILE_NAME), format!("999999:{}", now_secs() - 10)).unwrap();

        assert!(LockFile::acquire(&dir).is_ok());
    }

    #[test]
    fn test_malformed_lock_is_replaced() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join(".extupdate");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(LOCK_FILE_NAME), "invalid_format").unwrap();

        let lock = LockFile::acquire(&dir).unwrap();
        let content = fs::read_to_string(lock.path()).unwrap();
        assert_eq!(parse_lock(&content), Some((lock.pid, lock.timestamp)));
    }

    #[test]
    fn test_drop_removes_lock() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join(".extupdate");
        let lock_path = dir.join(LOCK_FILE_NAME);

        {
            let _lock = LockFile::acquire(&dir).unwrap();
            assert!(lock_path.exists());
        }

        assert!(!lock_path.exists());
    }

    #[test]
    fn test_release_leaves_foreign_lock() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join(".extupdate");

        let lock = LockFile::acquire(&dir).unwrap();
        let lock_path = dir.join(LOCK_FILE_NAME);
        fs::write(&lock_path, "1:1").unwrap();

        lock.release().unwrap();
        assert!(lock_path.exists());
    }

    #[test]
    fn test_parse_lock() {
        assert_eq!(parse_lock("42:1700000000\n"), Some((42, 1_700_000_000)));
        assert_eq!(parse_lock("42"), None);
        assert_eq!(parse_lock("x:1"), None);
    }

    #[test]
    fn test_process_running_detection() {
        assert_eq!(process_liveness(process::id()), Some(true));
        assert_eq!(process_liveness(999_999), Some(false));
    }
}
