//! Turn external signals into queue items.
//!
//! Both passes are best-effort: the caller hands over whatever it could read,
//! parse failures come back as diagnostics, and nothing here can fail the
//! pipeline.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::config::SimilarityConfig;
use crate::qg_error::QueueError;
use crate::similarity::{is_duplicate, normalize};
use crate::storage::FRICTION_FEED_KEY;
use crate::store::QueueStore;
use crate::types::{Complexity, FrictionSignal, NewItem};
use crate::{log_debug, log_info, log_warn};

pub const FOLLOWUP_TAG: &str = "followup";
pub const FRICTION_TAG: &str = "friction";
pub const FOLLOWUP_SOURCE: &str = "maintenance-report";
pub const FRICTION_SOURCE: &str = "friction-signal";

const MAX_TITLE_CHARS: usize = 100;
const GENERIC_FRICTION_TITLE: &str = "Investigate recurring operational friction";

static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(TODO|FIXME|HACK|XXX)\b:?\s*(.*)$").expect("valid marker regex")
});

/// Bullet lines that are never real follow-ups.
static FALSE_POSITIVE_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // table rows
        r"^\|",
        // fenced code
        r"```",
        // code fragments
        r"=>|\bfunction\b|\b(?:const|let|var)\s+\w+\s*=",
        r"[{};]\s*$",
        r"\b(?:grep|rg)\s+-",
        // already tracked
        r"\bwq-\d+\b",
        r"(?i)\(tracked\)|\[x\]",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid false-positive regex"))
    .collect()
});

#[derive(Debug, Default, Clone, PartialEq)]
pub struct IngestOutcome {
    pub created: Vec<String>,
    pub diagnostics: Vec<String>,
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let cut: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", cut.trim_end())
}

fn strip_bullet(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))
        .map(str::trim)
}

/// Extract follow-up titles from a maintenance report, in document order.
pub fn followup_candidates(report: &str) -> Vec<String> {
    report
        .lines()
        .filter_map(strip_bullet)
        .filter(|body| !FALSE_POSITIVE_RES.iter().any(|re| re.is_match(body)))
        .filter_map(|body| {
            let caps = MARKER_RE.captures(body)?;
            let marker = caps.get(1)?.as_str();
            let text = caps.get(2).map(|m| m.as_str().trim()).unwrap_or("");
            if text.is_empty() {
                return None;
            }
            Some(truncate_chars(
                &format!("Resolve {}: {}", marker, text),
                MAX_TITLE_CHARS,
            ))
        })
        .collect()
}

fn normalized_prefix(title: &str, len: usize) -> String {
    normalize(title).chars().take(len).collect()
}

/// Create `followup` items from TODO/FIXME/HACK/XXX bullets.
///
/// Dedup is by normalized title prefix against the active queue and against
/// items created earlier in the same pass. At most `cap` items are created.
pub fn ingest_followups(
    store: &mut QueueStore<'_>,
    report: &str,
    cap: usize,
    similarity: &SimilarityConfig,
) -> IngestOutcome {
    let mut outcome = IngestOutcome::default();
    let prefix_len = similarity.prefix_len;

    for title in followup_candidates(report) {
        if outcome.created.len() >= cap {
            break;
        }
        let prefix = normalized_prefix(&title, prefix_len);
        let tracked = store
            .titles()
            .iter()
            .any(|existing| normalized_prefix(existing, prefix_len) == prefix);
        if tracked {
            log_debug!("[followup] Skipping '{}': already queued", title);
            continue;
        }

        let new = NewItem {
            title,
            tags: vec![FOLLOWUP_TAG.to_string()],
            source: Some(FOLLOWUP_SOURCE.to_string()),
            complexity: Complexity::S,
            ..Default::default()
        };
        match store.create_item(new) {
            Ok(item) => {
                log_info!("[followup] {} <- '{}'", item.id, item.title);
                outcome.created.push(item.id);
            }
            Err(e) => {
                outcome.diagnostics.push(format!("followup: {}", e));
                break;
            }
        }
    }

    outcome
}

/// The feed is either a bare list or `{"signals": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum FrictionFeed {
    List(Vec<FrictionSignal>),
    Wrapped { signals: Vec<FrictionSignal> },
}

pub fn parse_friction_feed(doc: &str) -> Result<Vec<FrictionSignal>, String> {
    if doc.trim().is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str::<FrictionFeed>(doc) {
        Ok(FrictionFeed::List(signals)) | Ok(FrictionFeed::Wrapped { signals }) => Ok(signals),
        Err(e) => Err(e.to_string()),
    }
}

fn friction_title(signal: &FrictionSignal) -> String {
    let suggestion = signal
        .suggestion
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    match suggestion {
        Some(s) => truncate_chars(s, MAX_TITLE_CHARS),
        None => match signal.kind.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            Some(kind) => format!("Reduce {} friction", kind),
            None => GENERIC_FRICTION_TITLE.to_string(),
        },
    }
}

/// Create `friction` items from the monitoring feed, at most `cap` per run.
pub fn ingest_friction(
    store: &mut QueueStore<'_>,
    feed: &str,
    cap: usize,
    similarity: &SimilarityConfig,
) -> IngestOutcome {
    let mut outcome = IngestOutcome::default();

    let signals = match parse_friction_feed(feed) {
        Ok(signals) => signals,
        Err(reason) => {
            let err = QueueError::SourceMalformed {
                key: FRICTION_FEED_KEY.to_string(),
                reason,
            };
            log_warn!("[friction] {}", err);
            outcome.diagnostics.push(err.to_string());
            return outcome;
        }
    };

    for signal in &signals {
        if outcome.created.len() >= cap {
            break;
        }
        let title = friction_title(signal);
        if is_duplicate(&title, store.titles(), similarity) {
            log_debug!("[friction] Skipping '{}': already queued", title);
            continue;
        }

        let new = NewItem {
            title,
            description: signal.reason.clone().unwrap_or_default(),
            tags: vec![FRICTION_TAG.to_string()],
            source: Some(FRICTION_SOURCE.to_string()),
            ..Default::default()
        };
        match store.create_item(new) {
            Ok(item) => {
                log_info!("[friction] {} <- '{}'", item.id, item.title);
                outcome.created.push(item.id);
            }
            Err(e) => {
                outcome.diagnostics.push(format!("friction: {}", e));
                break;
            }
        }
    }

    outcome
}
