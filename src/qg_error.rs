use std::time::Duration;

/// Error enum for queue operations.
///
/// Categories:
/// - Fatal: the invocation aborts before any write-back
/// - Soft: a secondary source or blocker check failed; the pass contributes
///   nothing and the pipeline continues
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    // Fatal -- abort the invocation
    #[error("Failed to read queue document '{key}': {reason}")]
    QueueUnreadable { key: String, reason: String },

    #[error("Malformed queue document '{key}': {reason}")]
    QueueMalformed { key: String, reason: String },

    #[error("Failed to write '{key}': {reason}")]
    StorageWrite { key: String, reason: String },

    #[error("Queue is locked: {0}")]
    LockHeld(String),

    // Soft -- record a diagnostic and continue
    #[error("Failed to read '{key}': {reason}")]
    SourceUnavailable { key: String, reason: String },

    #[error("Malformed '{key}': {reason}")]
    SourceMalformed { key: String, reason: String },

    #[error("Blocker check for {id} failed: {reason}")]
    CheckFailed { id: String, reason: String },

    #[error("Blocker check for {id} timed out after {}s", .timeout.as_secs())]
    CheckTimeout { id: String, timeout: Duration },
}

impl QueueError {
    /// Returns true if the invocation must stop without persisting anything.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            QueueError::QueueUnreadable { .. }
                | QueueError::QueueMalformed { .. }
                | QueueError::StorageWrite { .. }
                | QueueError::LockHeld(_)
        )
    }

    /// Returns true if the error should be reported as a warning only.
    pub fn is_soft(&self) -> bool {
        !self.is_fatal()
    }

    /// Re-label a soft read failure on the primary queue document as fatal.
    pub fn into_fatal(self) -> QueueError {
        match self {
            QueueError::SourceUnavailable { key, reason } => {
                QueueError::QueueUnreadable { key, reason }
            }
            QueueError::SourceMalformed { key, reason } => {
                QueueError::QueueMalformed { key, reason }
            }
            other => other,
        }
    }
}

/// Lets CLI handlers that return `Result<T, String>` use `?` on queue errors.
impl From<QueueError> for String {
    fn from(err: QueueError) -> String {
        err.to_string()
    }
}
