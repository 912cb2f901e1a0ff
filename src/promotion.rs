use std::sync::LazyLock;

use regex::Regex;

use crate::config::{PromotionConfig, SimilarityConfig};
use crate::similarity::is_duplicate;
use crate::store::QueueStore;
use crate::types::{BacklogIdea, NewItem};
use crate::{log_debug, log_info};

pub const PROMOTION_SOURCE: &str = "brainstorming";

static IDEA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*-\s+\*\*(.+?)\*\*:\s*(.*?)\s*$").expect("valid backlog idea regex")
});

/// Collect `- **label**: description` lines, oldest (topmost) first.
///
/// Struck-through labels (`~~label~~`) are treated as already handled.
pub fn parse_backlog(doc: &str) -> Vec<BacklogIdea> {
    doc.lines()
        .filter_map(|line| {
            let caps = IDEA_RE.captures(line)?;
            let label = caps.get(1)?.as_str().trim();
            if label.is_empty() || label.starts_with("~~") {
                return None;
            }
            Some(BacklogIdea {
                label: label.to_string(),
                description: caps.get(2).map(|m| m.as_str()).unwrap_or("").to_string(),
                line: line.to_string(),
            })
        })
        .collect()
}

/// Drop the first exact occurrence of each line in `remove`.
///
/// Returns `None` when nothing was removed so callers can skip the rewrite.
pub fn remove_lines(doc: &str, remove: &[String]) -> Option<String> {
    let mut lines: Vec<&str> = doc.lines().collect();
    let mut removed = 0;
    for target in remove {
        if let Some(pos) = lines.iter().position(|line| line == target) {
            lines.remove(pos);
            removed += 1;
        }
    }
    if removed == 0 {
        return None;
    }
    let mut rewritten = lines.join("\n");
    if doc.ends_with('\n') && !rewritten.is_empty() {
        rewritten.push('\n');
    }
    Some(rewritten)
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct PromotionOutcome {
    pub promoted: Vec<String>,
    /// New backlog contents, present only if at least one line was removed.
    pub backlog_rewrite: Option<String>,
    pub diagnostics: Vec<String>,
}

/// How many of `available` candidates to promote for a queue at `actionable`.
///
/// The newest `max(1, floor - deficit)` candidates are held back so the
/// backlog never drains completely.
pub fn promotion_count(actionable: usize, available: usize, floor: usize) -> usize {
    if actionable >= floor {
        return 0;
    }
    let deficit = floor - actionable;
    let buffer = (floor - deficit).max(1);
    available.saturating_sub(buffer).min(deficit)
}

/// Backfill the queue from the backlog when actionable work runs low.
///
/// Candidates that duplicate an active title (or an earlier candidate) are
/// skipped. Promoted items are tagged with `config.tag`.
pub fn auto_promote(
    store: &mut QueueStore<'_>,
    backlog_doc: &str,
    config: &PromotionConfig,
    similarity: &SimilarityConfig,
) -> PromotionOutcome {
    let mut outcome = PromotionOutcome::default();

    let actionable = store.actionable_count();
    if actionable >= config.floor {
        log_debug!(
            "[promote] {} actionable >= floor {}, nothing to do",
            actionable,
            config.floor
        );
        return outcome;
    }

    let mut candidates: Vec<BacklogIdea> = Vec::new();
    for idea in parse_backlog(backlog_doc) {
        let taken: Vec<&str> = store
            .titles()
            .iter()
            .map(String::as_str)
            .chain(candidates.iter().map(|c| c.label.as_str()))
            .collect();
        if is_duplicate(&idea.label, &taken, similarity) {
            log_debug!("[promote] Skipping '{}': already queued", idea.label);
            continue;
        }
        candidates.push(idea);
    }

    let count = promotion_count(actionable, candidates.len(), config.floor);
    if count == 0 {
        log_debug!(
            "[promote] {} candidate(s) available, none promotable",
            candidates.len()
        );
        return outcome;
    }

    let mut promoted_lines = Vec::new();
    for idea in candidates.into_iter().take(count) {
        let new = NewItem {
            title: idea.label.clone(),
            description: idea.description.clone(),
            tags: vec![config.tag.clone()],
            source: Some(PROMOTION_SOURCE.to_string()),
            ..Default::default()
        };
        match store.create_item(new) {
            Ok(item) => {
                log_info!("[promote] {} <- '{}'", item.id, item.title);
                outcome.promoted.push(item.id);
                promoted_lines.push(idea.line);
            }
            Err(e) => {
                outcome.diagnostics.push(format!("promotion: {}", e));
                break;
            }
        }
    }

    outcome.backlog_rewrite = remove_lines(backlog_doc, &promoted_lines);
    outcome
}
