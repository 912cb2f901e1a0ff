mod common;

use queue_golem::deps::{is_actionable, is_ready, unmet_dep_summary};
use queue_golem::types::ItemStatus;

use common::make_item;

#[test]
fn item_without_deps_is_ready() {
    let item = make_item("wq-001", ItemStatus::Pending);
    assert!(is_ready(&item, std::slice::from_ref(&item)));
}

#[test]
fn dep_on_done_item_is_met() {
    let dep = make_item("wq-001", ItemStatus::Done);
    let mut item = make_item("wq-002", ItemStatus::Pending);
    item.deps = vec!["wq-001".to_string()];
    let active = vec![dep, item.clone()];

    assert!(is_ready(&item, &active));
    assert!(is_actionable(&item, &active));
}

#[test]
fn dep_absent_from_active_queue_is_met() {
    let mut item = make_item("wq-002", ItemStatus::Pending);
    item.deps = vec!["wq-000".to_string()];
    assert!(is_actionable(&item, std::slice::from_ref(&item)));
}

#[test]
fn dep_on_pending_item_gates_actionability() {
    let dep = make_item("wq-001", ItemStatus::Pending);
    let mut item = make_item("wq-002", ItemStatus::Pending);
    item.deps = vec!["wq-001".to_string()];
    let active = vec![dep, item.clone()];

    assert!(!is_actionable(&item, &active));
    assert_eq!(
        unmet_dep_summary(&item, &active),
        Some("wq-001 (pending)".to_string())
    );
}

#[test]
fn blocked_item_is_never_actionable() {
    let item = make_item("wq-001", ItemStatus::Blocked);
    assert!(is_ready(&item, std::slice::from_ref(&item)));
    assert!(!is_actionable(&item, std::slice::from_ref(&item)));
}

#[test]
fn summary_is_none_when_all_met() {
    let dep = make_item("wq-001", ItemStatus::Done);
    let mut item = make_item("wq-002", ItemStatus::Pending);
    item.deps = vec!["wq-001".to_string(), "wq-000".to_string()];
    assert_eq!(unmet_dep_summary(&item, &[dep]), None);
}
