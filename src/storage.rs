use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::NamedTempFile;

use crate::config::PathsConfig;
use crate::qg_error::QueueError;

// --- Document keys ---

pub const QUEUE_KEY: &str = "queue";
pub const ARCHIVE_KEY: &str = "archive";
pub const BACKLOG_KEY: &str = "backlog";
pub const SESSION_HISTORY_KEY: &str = "session-history";
pub const MAINTENANCE_REPORT_KEY: &str = "maintenance-report";
pub const FRICTION_FEED_KEY: &str = "friction-feed";
pub const COMPLIANCE_LOG_KEY: &str = "compliance-log";

/// Load/save documents by key.
///
/// `load` returns `Ok(None)` when the document does not exist; that is a
/// normal state for every secondary source. Pipeline logic only talks to this
/// trait, so tests swap in `MemoryStorage`.
pub trait Storage: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, QueueError>;
    fn save(&self, key: &str, contents: &str) -> Result<(), QueueError>;
}

// --- File-backed storage ---

/// Maps document keys onto files under a base directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    paths: HashMap<String, PathBuf>,
}

impl FileStorage {
    pub fn new(base: &Path, paths: &PathsConfig) -> Self {
        let entries = [
            (QUEUE_KEY, &paths.queue),
            (ARCHIVE_KEY, &paths.archive),
            (BACKLOG_KEY, &paths.backlog),
            (SESSION_HISTORY_KEY, &paths.session_history),
            (MAINTENANCE_REPORT_KEY, &paths.maintenance_report),
            (FRICTION_FEED_KEY, &paths.friction_feed),
            (COMPLIANCE_LOG_KEY, &paths.compliance_log),
        ];
        let paths = entries
            .into_iter()
            .map(|(key, rel)| (key.to_string(), base.join(rel)))
            .collect();
        Self { paths }
    }

    pub fn path_for(&self, key: &str) -> Result<&Path, QueueError> {
        self.paths
            .get(key)
            .map(|p| p.as_path())
            .ok_or_else(|| QueueError::SourceUnavailable {
                key: key.to_string(),
                reason: "no path configured for this document".to_string(),
            })
    }
}

impl Storage for FileStorage {
    fn load(&self, key: &str) -> Result<Option<String>, QueueError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(QueueError::SourceUnavailable {
                key: key.to_string(),
                reason: format!("{}: {}", path.display(), e),
            }),
        }
    }

    /// Atomic write: temp file in the same directory, fsync, rename.
    fn save(&self, key: &str, contents: &str) -> Result<(), QueueError> {
        let path = self.path_for(key).map_err(|e| QueueError::StorageWrite {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        write_atomic(path, contents).map_err(|reason| QueueError::StorageWrite {
            key: key.to_string(),
            reason,
        })
    }
}

fn write_atomic(path: &Path, contents: &str) -> Result<(), String> {
    let parent = path
        .parent()
        .ok_or_else(|| format!("Cannot determine parent directory of {}", path.display()))?;

    fs::create_dir_all(parent)
        .map_err(|e| format!("Failed to create directory {}: {}", parent.display(), e))?;

    let temp_file = NamedTempFile::new_in(parent)
        .map_err(|e| format!("Failed to create temp file in {}: {}", parent.display(), e))?;

    fs::write(temp_file.path(), contents)
        .map_err(|e| format!("Failed to write temp file: {}", e))?;

    let file = fs::File::open(temp_file.path())
        .map_err(|e| format!("Failed to open temp file for sync: {}", e))?;
    file.sync_all()
        .map_err(|e| format!("Failed to sync temp file: {}", e))?;

    temp_file
        .persist(path)
        .map_err(|e| format!("Failed to rename temp file to {}: {}", path.display(), e))?;

    Ok(())
}

// --- In-memory storage ---

/// In-memory fake for tests and dry runs. Records how many saves hit each key.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    docs: Mutex<HashMap<String, String>>,
    saves: Mutex<HashMap<String, u32>>,
    failing: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_doc(self, key: &str, contents: &str) -> Self {
        self.put(key, contents);
        self
    }

    pub fn put(&self, key: &str, contents: &str) {
        if let Ok(mut docs) = self.docs.lock() {
            docs.insert(key.to_string(), contents.to_string());
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.docs.lock().ok().and_then(|docs| docs.get(key).cloned())
    }

    /// Make every load of `key` fail with `reason`.
    pub fn fail_reads(&self, key: &str, reason: &str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(key.to_string(), reason.to_string());
        }
    }

    pub fn save_count(&self, key: &str) -> u32 {
        self.saves
            .lock()
            .ok()
            .and_then(|saves| saves.get(key).copied())
            .unwrap_or(0)
    }
}

impl Storage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>, QueueError> {
        if let Some(reason) = self.failing.lock().ok().and_then(|f| f.get(key).cloned()) {
            return Err(QueueError::SourceUnavailable {
                key: key.to_string(),
                reason,
            });
        }
        Ok(self.get(key))
    }

    fn save(&self, key: &str, contents: &str) -> Result<(), QueueError> {
        self.put(key, contents);
        if let Ok(mut saves) = self.saves.lock() {
            *saves.entry(key.to_string()).or_insert(0) += 1;
        }
        Ok(())
    }
}
