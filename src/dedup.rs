use serde::Serialize;

use crate::config::SimilarityConfig;
use crate::similarity::Signature;
use crate::store::QueueStore;
use crate::types::ItemStatus;
use crate::{log_debug, log_info};

/// An item removed as a duplicate of an earlier pending item.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct DedupedItem {
    pub id: String,
    pub title: String,
    /// Id of the earlier item it duplicated.
    pub kept: String,
}

impl std::fmt::Display for DedupedItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.id, self.title)
    }
}

/// Remove pending items whose title duplicates an earlier pending item.
///
/// Walks the queue in order. Each pending item is compared against the
/// signatures of pending items already kept; the first match marks it for
/// removal. Non-pending items neither get removed nor shadow later ones.
pub fn dedup_pending(store: &mut QueueStore<'_>, config: &SimilarityConfig) -> Vec<DedupedItem> {
    let mut kept: Vec<(String, Signature)> = Vec::new();
    let mut doomed: Vec<(usize, String)> = Vec::new();

    for (idx, item) in store.items().iter().enumerate() {
        if item.status != ItemStatus::Pending {
            continue;
        }
        let signature = Signature::of(&item.title, config);
        match kept.iter().find(|(_, prior)| signature.matches(prior, config)) {
            Some((kept_id, _)) => {
                log_debug!("[dedup] {} duplicates {}", item.id, kept_id);
                doomed.push((idx, kept_id.clone()));
            }
            None => kept.push((item.id.clone(), signature)),
        }
    }

    if doomed.is_empty() {
        return Vec::new();
    }

    let indices: Vec<usize> = doomed.iter().map(|(idx, _)| *idx).collect();
    let removed = store.remove_indices(&indices);

    let deduped: Vec<DedupedItem> = removed
        .into_iter()
        .zip(doomed.into_iter().map(|(_, kept_id)| kept_id))
        .map(|(item, kept)| DedupedItem {
            id: item.id,
            title: item.title,
            kept,
        })
        .collect();

    for d in &deduped {
        log_info!("[dedup] Removed {} (duplicate of {})", d, d.kept);
    }
    deduped
}
