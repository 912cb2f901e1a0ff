use crate::types::{ItemStatus, QueueItem};

/// Returns true if every dependency of `item` is satisfied.
///
/// A dependency is met if:
/// - The dep ID is not found in `active` (absent = archived = met)
/// - The dep ID is found with status `Done`
pub fn is_ready(item: &QueueItem, active: &[QueueItem]) -> bool {
    item.deps
        .iter()
        .all(|dep_id| match active.iter().find(|other| other.id == *dep_id) {
            Some(dep) => dep.status == ItemStatus::Done,
            None => true,
        })
}

/// A pending item whose dependencies are all met.
pub fn is_actionable(item: &QueueItem, active: &[QueueItem]) -> bool {
    item.status == ItemStatus::Pending && is_ready(item, active)
}

/// Comma-separated `"dep_id (status)"` list of unmet dependencies, or `None`
/// if everything is satisfied.
pub fn unmet_dep_summary(item: &QueueItem, active: &[QueueItem]) -> Option<String> {
    let unmet: Vec<String> = item
        .deps
        .iter()
        .filter_map(|dep_id| match active.iter().find(|i| i.id == *dep_id) {
            Some(dep) if dep.status != ItemStatus::Done => {
                Some(format!("{} ({})", dep_id, dep.status))
            }
            _ => None,
        })
        .collect();
    if unmet.is_empty() {
        None
    } else {
        Some(unmet.join(", "))
    }
}
