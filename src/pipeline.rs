use std::time::Duration;

use serde::Serialize;

use crate::config::QueueGolemConfig;
use crate::dedup::{self, DedupedItem};
use crate::ingest;
use crate::promotion;
use crate::qg_error::QueueError;
use crate::selector::{self, Selection};
use crate::stall;
use crate::storage::{
    Storage, BACKLOG_KEY, FRICTION_FEED_KEY, MAINTENANCE_REPORT_KEY, SESSION_HISTORY_KEY,
};
use crate::store::QueueStore;
use crate::types::{ItemStatus, Mode};
use crate::unblock::{self, CheckRunner};
use crate::{log_debug, log_info, log_warn};

/// Parameters for one pipeline invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RunParams {
    pub mode: Mode,
    pub budget_ceiling: f64,
    /// Session number stamped on audit notes.
    pub session: u32,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueCounts {
    pub actionable: usize,
    pub pending: usize,
    pub blocked: usize,
    pub retired: usize,
    pub total: usize,
}

impl QueueCounts {
    pub fn of(store: &QueueStore<'_>) -> Self {
        Self {
            actionable: store.actionable_count(),
            pending: store.count_with_status(ItemStatus::Pending),
            blocked: store.count_with_status(ItemStatus::Blocked),
            retired: store.count_with_status(ItemStatus::Retired),
            total: store.items().len(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct IngestedIds {
    pub followup: Vec<String>,
    pub friction: Vec<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SelectedTask {
    #[serde(flatten)]
    pub selection: Selection,
    pub rendered_context: String,
}

/// Everything one invocation did, for display and for the caller's decisions.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PipelineReport {
    pub mode: Mode,
    pub counts: QueueCounts,
    pub deduped: Vec<DedupedItem>,
    pub stall_count: usize,
    pub unblocked: Vec<String>,
    pub selected: Option<SelectedTask>,
    pub promoted: Vec<String>,
    pub ingested: IngestedIds,
    pub soft_errors: Vec<String>,
    pub dirty: bool,
}

/// The mutated store plus side effects the caller may persist.
#[derive(Debug)]
pub struct PipelineOutcome<'s> {
    pub store: QueueStore<'s>,
    pub report: PipelineReport,
    /// Backlog contents with promoted lines removed.
    pub backlog_rewrite: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Persisted {
    pub queue: bool,
    pub backlog: bool,
    pub warnings: Vec<String>,
}

impl PipelineOutcome<'_> {
    /// Write the queue back if dirty, then the backlog rewrite if any.
    ///
    /// A failed queue write is fatal. A failed backlog write is only a
    /// warning: the promoted lines stay in the backlog and the next run's
    /// duplicate check keeps them from being promoted twice.
    pub fn persist(&self) -> Result<Persisted, QueueError> {
        let mut persisted = Persisted::default();
        if !self.store.is_dirty() {
            return Ok(persisted);
        }

        self.store.save()?;
        persisted.queue = true;

        if let Some(doc) = &self.backlog_rewrite {
            match self.store.storage().save(BACKLOG_KEY, doc) {
                Ok(()) => persisted.backlog = true,
                Err(e) => {
                    log_warn!("[persist] {}", e);
                    persisted.warnings.push(e.to_string());
                }
            }
        }
        Ok(persisted)
    }
}

/// Read a secondary document. Failures become soft errors; absence is normal.
fn read_source(storage: &dyn Storage, key: &str, soft_errors: &mut Vec<String>) -> Option<String> {
    match storage.load(key) {
        Ok(Some(doc)) => Some(doc),
        Ok(None) => {
            log_debug!("[source] '{}' not present", key);
            None
        }
        Err(e) => {
            log_warn!("[source] {}", e);
            soft_errors.push(e.to_string());
            None
        }
    }
}

/// Run every pass once, in order.
///
/// Only loading the queue can fail; every later pass reports trouble as a
/// soft error and the pipeline carries on. Nothing is written here.
pub async fn run<'s, R: CheckRunner>(
    storage: &'s dyn Storage,
    config: &QueueGolemConfig,
    params: &RunParams,
    runner: &R,
) -> Result<PipelineOutcome<'s>, QueueError> {
    let mut store = QueueStore::load(storage)?;
    let mut soft_errors = Vec::new();

    // Dedup
    let deduped = dedup::dedup_pending(&mut store, &config.similarity);

    let initial = QueueCounts::of(&store);
    log_info!(
        "[queue] {} actionable, {} blocked, {} retired ({} total)",
        initial.actionable,
        initial.blocked,
        initial.retired,
        initial.total
    );

    // Stall detection
    let stall_count = read_source(storage, SESSION_HISTORY_KEY, &mut soft_errors)
        .map(|log| stall::count_stalls(&log, params.mode, config.stall.window))
        .unwrap_or(0);
    if stall_count > 0 {
        log_warn!(
            "[stall] {} consecutive {} session(s) without output",
            stall_count,
            params.mode
        );
    }

    // Auto-unblock
    let unblocked = unblock::auto_unblock(
        &mut store,
        runner,
        Duration::from_secs(config.unblock.timeout_secs),
        params.session,
    )
    .await;
    soft_errors.extend(unblocked.diagnostics);

    // Selection
    let selected = if params.mode.runs_selector() {
        let actionable = store.actionable_items();
        let selection = selector::select(&actionable, params.budget_ceiling, &config.selector);
        match &selection {
            Some(s) => log_info!(
                "[select] {} ({}, {:?})",
                s.item.id,
                s.item.complexity,
                s.reason
            ),
            None => log_info!("[select] No actionable items"),
        }
        selection.map(|selection| SelectedTask {
            rendered_context: selection.render_context(),
            selection,
        })
    } else {
        None
    };

    // Auto-promotion
    let mut promoted = Vec::new();
    let mut backlog_rewrite = None;
    if store.actionable_count() < config.promotion.floor {
        if let Some(doc) = read_source(storage, BACKLOG_KEY, &mut soft_errors) {
            let outcome =
                promotion::auto_promote(&mut store, &doc, &config.promotion, &config.similarity);
            promoted = outcome.promoted;
            backlog_rewrite = outcome.backlog_rewrite;
            soft_errors.extend(outcome.diagnostics);
        }
    }

    // Ingestion
    let mut ingested = IngestedIds::default();
    if params.mode.runs_followup_ingest() {
        if let Some(report) = read_source(storage, MAINTENANCE_REPORT_KEY, &mut soft_errors) {
            let outcome = ingest::ingest_followups(
                &mut store,
                &report,
                config.ingest.followup_cap,
                &config.similarity,
            );
            ingested.followup = outcome.created;
            soft_errors.extend(outcome.diagnostics);
        }
    }
    if params.mode.runs_friction_ingest() {
        if let Some(feed) = read_source(storage, FRICTION_FEED_KEY, &mut soft_errors) {
            let outcome = ingest::ingest_friction(
                &mut store,
                &feed,
                config.ingest.friction_cap,
                &config.similarity,
            );
            ingested.friction = outcome.created;
            soft_errors.extend(outcome.diagnostics);
        }
    }

    let report = PipelineReport {
        mode: params.mode,
        counts: QueueCounts::of(&store),
        deduped,
        stall_count,
        unblocked: unblocked.unblocked,
        selected,
        promoted,
        ingested,
        soft_errors,
        dirty: store.is_dirty(),
    };

    Ok(PipelineOutcome {
        store,
        report,
        backlog_rewrite,
    })
}
