use serde::Serialize;

use crate::config::SelectorConfig;
use crate::types::{Complexity, ProgressNote, QueueItem};

pub const AUDIT_TAG: &str = "audit";

/// Why the selector picked what it picked.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SelectionReason {
    /// First item in audit-first order; budget did not constrain size.
    FirstInOrder,
    /// Small budget: first item that is not L.
    BudgetFit,
    /// Small budget but only L items exist.
    BudgetFallback,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Selection {
    pub item: QueueItem,
    pub reason: SelectionReason,
    /// Trailing progress notes, oldest first.
    pub context: Vec<ProgressNote>,
}

impl Selection {
    /// Progress notes as a prompt-ready block. Empty when there are none.
    pub fn render_context(&self) -> String {
        if self.context.is_empty() {
            return String::new();
        }
        let mut out = format!("Previous progress on {}:\n", self.item.id);
        for note in &self.context {
            out.push_str(&format!("  - [s{}] {}\n", note.session, note.text));
        }
        out
    }
}

/// Pick the single best actionable item for a build session.
///
/// Items are ordered by `priority` (lower first, ties keep queue order), then
/// items tagged `audit` are moved to the front. With a budget at or under
/// `small_budget_ceiling` the first non-L item wins, falling back to the first
/// item of any size. Returns `None` for an empty input, which is a normal state.
pub fn select(
    actionable: &[&QueueItem],
    budget_ceiling: f64,
    config: &SelectorConfig,
) -> Option<Selection> {
    let mut by_priority = actionable.to_vec();
    by_priority.sort_by_key(|item| item.priority);

    let (audit, rest): (Vec<&QueueItem>, Vec<&QueueItem>) = by_priority
        .into_iter()
        .partition(|item| item.has_tag(AUDIT_TAG));
    let ordered: Vec<&QueueItem> = audit.into_iter().chain(rest).collect();

    let first = *ordered.first()?;

    let (item, reason) = if budget_ceiling <= config.small_budget_ceiling {
        match ordered.iter().find(|item| item.complexity != Complexity::L) {
            Some(fit) => (*fit, SelectionReason::BudgetFit),
            None => (first, SelectionReason::BudgetFallback),
        }
    } else {
        (first, SelectionReason::FirstInOrder)
    };

    let skip = item.progress_notes.len().saturating_sub(config.context_notes);
    let context = item.progress_notes[skip..].to_vec();

    Some(Selection {
        item: item.clone(),
        reason,
        context,
    })
}
