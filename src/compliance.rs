use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::qg_error::QueueError;
use crate::storage::{Storage, COMPLIANCE_LOG_KEY};
use crate::types::{ItemStatus, QueueItem};

/// Entries kept in `ComplianceStats::recent`.
const RECENT_ENTRIES: usize = 10;

pub const STATUS_ASSIGNED: &str = "assigned";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_INCOMPLETE: &str = "incomplete";
pub const STATUS_NO_ASSIGNMENT: &str = "no_assignment";

static ENTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(\S+)\s+s=(\d+)\s+assigned=(\S+)(?:\s+title="([^"]*)")?\s+status=(\S+)"#)
        .expect("valid compliance regex")
});

/// One build session's assignment record.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ComplianceEntry {
    pub timestamp: String,
    pub session: u32,
    pub assigned: String,
    pub title: String,
    pub status: String,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ComplianceStats {
    pub total_sessions_tracked: usize,
    pub assigned: usize,
    pub completed: usize,
    pub incomplete: usize,
    pub no_assignment: usize,
    pub compliance_rate_pct: f64,
    /// Timestamp of the first entry, or `"now"` for an empty log.
    pub tracking_started: String,
    pub recent: Vec<ComplianceEntry>,
}

/// Parse the log, skipping lines that do not match the entry format.
pub fn parse_log(log: &str) -> Vec<ComplianceEntry> {
    log.lines().filter_map(parse_entry).collect()
}

fn parse_entry(line: &str) -> Option<ComplianceEntry> {
    let caps = ENTRY_RE.captures(line.trim())?;
    Some(ComplianceEntry {
        timestamp: caps.get(1)?.as_str().to_string(),
        session: caps.get(2)?.as_str().parse().ok()?,
        assigned: caps.get(3)?.as_str().to_string(),
        title: caps.get(4).map(|m| m.as_str()).unwrap_or("").to_string(),
        status: caps.get(5)?.as_str().to_string(),
    })
}

pub fn compute_stats(entries: &[ComplianceEntry]) -> ComplianceStats {
    let count = |status: &str| entries.iter().filter(|e| e.status == status).count();

    let no_assignment = count(STATUS_NO_ASSIGNMENT);
    let assigned = entries.len() - no_assignment;
    let completed = count(STATUS_COMPLETED);
    let rate = if assigned > 0 {
        (completed as f64 / assigned as f64 * 1000.0).round() / 10.0
    } else {
        0.0
    };

    ComplianceStats {
        total_sessions_tracked: entries.len(),
        assigned,
        completed,
        incomplete: count(STATUS_INCOMPLETE),
        no_assignment,
        compliance_rate_pct: rate,
        tracking_started: entries
            .first()
            .map(|e| e.timestamp.clone())
            .unwrap_or_else(|| "now".to_string()),
        recent: entries[entries.len().saturating_sub(RECENT_ENTRIES)..].to_vec(),
    }
}

/// Format the line recorded when a build session is handed a task (or none).
pub fn assignment_line(timestamp: &str, session: u32, assigned: Option<(&str, &str)>) -> String {
    match assigned {
        Some((id, title)) => format!(
            "{} s={} assigned={} title=\"{}\" status={}",
            timestamp,
            session,
            id,
            title.replace('"', "'"),
            STATUS_ASSIGNED
        ),
        None => format!(
            "{} s={} assigned=none status={}",
            timestamp, session, STATUS_NO_ASSIGNMENT
        ),
    }
}

/// Append `line` to the compliance log through the storage port.
pub fn append(storage: &dyn Storage, line: &str) -> Result<(), QueueError> {
    let mut contents = storage.load(COMPLIANCE_LOG_KEY)?.unwrap_or_default();
    if !contents.is_empty() && !contents.ends_with('\n') {
        contents.push('\n');
    }
    contents.push_str(line);
    contents.push('\n');
    storage.save(COMPLIANCE_LOG_KEY, &contents)
}

/// Outcome of an assignment judged against the current queue: `completed`
/// when the item is done or has left the active queue, `incomplete` otherwise.
pub fn resolution_status(assigned: &str, items: &[QueueItem]) -> &'static str {
    match items.iter().find(|item| item.id == assigned) {
        None => STATUS_COMPLETED,
        Some(item) if item.status == ItemStatus::Done => STATUS_COMPLETED,
        Some(_) => STATUS_INCOMPLETE,
    }
}

/// Rewrite every `status=assigned` line of `log` to its resolved status.
///
/// Returns the new log text and the resolved entries, or `None` when nothing
/// was open. Unrecognized lines are kept as they are.
pub fn resolve_open_assignments(
    log: &str,
    items: &[QueueItem],
) -> Option<(String, Vec<ComplianceEntry>)> {
    let mut resolved = Vec::new();
    let mut out = String::with_capacity(log.len());

    for line in log.lines() {
        let trimmed = line.trim();
        let open = ENTRY_RE
            .captures(trimmed)
            .and_then(|caps| caps.get(5))
            .filter(|m| m.as_str() == STATUS_ASSIGNED);
        match (open, parse_entry(trimmed)) {
            (Some(status_match), Some(mut entry)) => {
                let status = resolution_status(&entry.assigned, items);
                out.push_str(&trimmed[..status_match.start()]);
                out.push_str(status);
                out.push_str(&trimmed[status_match.end()..]);
                entry.status = status.to_string();
                resolved.push(entry);
            }
            _ => out.push_str(line),
        }
        out.push('\n');
    }

    if resolved.is_empty() {
        None
    } else {
        Some((out, resolved))
    }
}

/// Resolve open assignments in the stored log against `items` and write the
/// log back when anything changed. Returns the entries that were resolved.
pub fn resolve_previous(
    storage: &dyn Storage,
    items: &[QueueItem],
) -> Result<Vec<ComplianceEntry>, QueueError> {
    let Some(log) = storage.load(COMPLIANCE_LOG_KEY)? else {
        return Ok(Vec::new());
    };
    match resolve_open_assignments(&log, items) {
        Some((rewritten, resolved)) => {
            storage.save(COMPLIANCE_LOG_KEY, &rewritten)?;
            Ok(resolved)
        }
        None => Ok(Vec::new()),
    }
}
