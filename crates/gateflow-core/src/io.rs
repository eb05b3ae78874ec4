//! Atomic and lock-guarded file persistence.
//!
//! State files are shared between concurrent gateflow invocations, so every
//! read-modify-write cycle goes through an advisory lock on a sidecar
//! `.lock` file with a bounded acquisition timeout. The payload itself is
//! always replaced atomically via a tempfile rename.

use crate::error::{GateflowError, Result};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Atomically write `data` to `path` using a tempfile in the same directory.
/// Prevents partial writes from corrupting state files.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Create a directory and all parents, idempotent.
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// FileLock
// ---------------------------------------------------------------------------

/// Advisory lock held for the duration of one logical command.
///
/// Locks are cooperative: every participant must go through these helpers
/// for the exclusion to be effective. Acquisition polls up to `timeout`
/// before giving up with `LockTimeout`.
pub struct FileLock {
    file: File,
}

impl FileLock {
    pub fn exclusive(path: &Path, timeout: Duration) -> Result<Self> {
        Self::acquire(path, timeout, true)
    }

    pub fn shared(path: &Path, timeout: Duration) -> Result<Self> {
        Self::acquire(path, timeout, false)
    }

    fn acquire(path: &Path, timeout: Duration, exclusive: bool) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)?;
        let deadline = Instant::now() + timeout;
        loop {
            let attempt = if exclusive {
                FileExt::try_lock_exclusive(&file)
            } else {
                FileExt::try_lock_shared(&file)
            };
            match attempt {
                Ok(()) => return Ok(Self { file }),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    if Instant::now() >= deadline {
                        return Err(GateflowError::LockTimeout(path.display().to_string()));
                    }
                    std::thread::sleep(LOCK_POLL_INTERVAL);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".lock");
    PathBuf::from(name)
}

// ---------------------------------------------------------------------------
// Locked JSON persistence
// ---------------------------------------------------------------------------

/// Read and deserialize a JSON file under a shared lock.
pub fn read_locked_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let _lock = FileLock::shared(&lock_path(path), DEFAULT_LOCK_TIMEOUT)?;
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

/// Serialize and atomically write a JSON file under an exclusive lock.
pub fn write_locked_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let _lock = FileLock::exclusive(&lock_path(path), DEFAULT_LOCK_TIMEOUT)?;
    let data = serde_json::to_string_pretty(value)?;
    atomic_write(path, data.as_bytes())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        atomic_write(&path, b"{}").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn atomic_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/state.json");
        atomic_write(&path, b"{}").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn locked_json_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        let mut value = BTreeMap::new();
        value.insert("feature".to_string(), "auth".to_string());
        write_locked_json(&path, &value).unwrap();
        let back: BTreeMap<String, String> = read_locked_json(&path).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn exclusive_lock_blocks_second_acquirer() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json.lock");
        let _held = FileLock::exclusive(&path, Duration::from_secs(1)).unwrap();
        let second = FileLock::exclusive(&path, Duration::from_millis(120));
        assert!(matches!(second, Err(GateflowError::LockTimeout(_))));
    }

    #[test]
    fn shared_locks_coexist() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json.lock");
        let _a = FileLock::shared(&path, Duration::from_secs(1)).unwrap();
        let b = FileLock::shared(&path, Duration::from_millis(200));
        assert!(b.is_ok());
    }

    #[test]
    fn lock_released_on_drop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json.lock");
        {
            let _held = FileLock::exclusive(&path, Duration::from_secs(1)).unwrap();
        }
        let again = FileLock::exclusive(&path, Duration::from_millis(200));
        assert!(again.is_ok());
    }
}
