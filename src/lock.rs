use std::fs;
use std::path::{Path, PathBuf};

use crate::log_warn;
use crate::qg_error::QueueError;

pub const RUNTIME_DIR: &str = ".queue-golem";
const LOCK_FILE: &str = "queue.lock";
const PID_FILE: &str = "queue.pid";

/// Holds the queue lock for the duration of a load→save window.
#[must_use = "lock is released when QueueLock is dropped"]
pub struct QueueLock {
    lock: fslock::LockFile,
    pid_path: PathBuf,
}

impl std::fmt::Debug for QueueLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueLock")
            .field("pid_path", &self.pid_path)
            .finish()
    }
}

impl Drop for QueueLock {
    fn drop(&mut self) {
        if let Err(e) = self.lock.unlock() {
            log_warn!("Warning: Failed to release queue lock: {}", e);
        }
        if let Err(e) = fs::remove_file(&self.pid_path) {
            log_warn!(
                "Warning: Failed to remove PID file {}: {}",
                self.pid_path.display(),
                e
            );
        }
    }
}

/// Take the queue lock without waiting.
///
/// The file lock provides the mutual exclusion; the PID file only exists to
/// tell the loser who is holding it.
pub fn try_acquire(runtime_dir: &Path) -> Result<QueueLock, QueueError> {
    let lock_err = |reason: String| QueueError::LockHeld(reason);

    fs::create_dir_all(runtime_dir)
        .map_err(|e| lock_err(format!("Failed to create {}: {}", runtime_dir.display(), e)))?;

    let lock_path = runtime_dir.join(LOCK_FILE);
    let pid_path = runtime_dir.join(PID_FILE);

    let mut lock = fslock::LockFile::open(&lock_path).map_err(|e| {
        lock_err(format!(
            "Failed to open lock file {}: {}",
            lock_path.display(),
            e
        ))
    })?;

    let acquired = lock
        .try_lock()
        .map_err(|e| lock_err(format!("Failed to acquire lock: {}", e)))?;

    if !acquired {
        let holder = fs::read_to_string(&pid_path)
            .ok()
            .and_then(|s| s.trim().parse::<i32>().ok());

        return Err(lock_err(match holder {
            Some(pid) if is_pid_alive(pid) => {
                format!("another queue-golem instance is running (PID {})", pid)
            }
            Some(pid) => format!(
                "lock file is held but recorded PID {} is not alive; remove {} and {} to recover",
                pid,
                lock_path.display(),
                pid_path.display()
            ),
            None => format!(
                "another queue-golem instance holds the lock; if this is stale, remove {}",
                lock_path.display()
            ),
        }));
    }

    fs::write(&pid_path, std::process::id().to_string())
        .map_err(|e| lock_err(format!("Failed to write PID file: {}", e)))?;

    Ok(QueueLock { lock, pid_path })
}

fn is_pid_alive(pid: i32) -> bool {
    // signal 0 checks existence without delivering anything
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid), None).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_process_is_alive() {
        assert!(is_pid_alive(std::process::id() as i32));
    }

    #[test]
    fn absurd_pid_is_not_alive() {
        assert!(!is_pid_alive(99_999_999));
    }
}
