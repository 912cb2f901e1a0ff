mod common;

use queue_golem::config::{PromotionConfig, SimilarityConfig};
use queue_golem::promotion::{auto_promote, parse_backlog, PROMOTION_SOURCE};
use queue_golem::store::QueueStore;
use queue_golem::types::ItemStatus;

use common::{make_item, storage_with_queue, titled};

const BACKLOG: &str = "\
# Brainstorming

Loose ideas, oldest first.

- **Cache warmup on deploy**: prefill hot keys before traffic shifts
- **Rate limiter for public API**: token bucket per client
- **Webhook retry backoff**: exponential with jitter
- **Metrics export to Prometheus**: expose queue depth
";

fn promote(store: &mut QueueStore<'_>, doc: &str) -> queue_golem::promotion::PromotionOutcome {
    auto_promote(
        store,
        doc,
        &PromotionConfig::default(),
        &SimilarityConfig::default(),
    )
}

#[test]
fn parse_backlog_reads_labelled_bullets_in_order() {
    let ideas = parse_backlog(BACKLOG);
    let labels: Vec<&str> = ideas.iter().map(|i| i.label.as_str()).collect();
    assert_eq!(
        labels,
        vec![
            "Cache warmup on deploy",
            "Rate limiter for public API",
            "Webhook retry backoff",
            "Metrics export to Prometheus"
        ]
    );
    assert_eq!(ideas[0].description, "prefill hot keys before traffic shifts");
}

#[test]
fn parse_backlog_skips_struck_and_plain_lines() {
    let doc = "- **~~Old idea~~**: done already\n- plain bullet\n- **Live idea**: yes\n";
    let ideas = parse_backlog(doc);
    assert_eq!(ideas.len(), 1);
    assert_eq!(ideas[0].label, "Live idea");
}

#[test]
fn promotes_earliest_ideas_up_to_deficit_and_keeps_buffer() {
    let storage = storage_with_queue(vec![titled("wq-001", "Write onboarding guide")]);
    let mut store = QueueStore::load(&storage).unwrap();
    assert_eq!(store.actionable_count(), 1);

    let outcome = promote(&mut store, BACKLOG);

    assert_eq!(outcome.promoted, vec!["wq-002", "wq-003"]);
    let titles: Vec<&str> = store.items()[1..].iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, vec!["Cache warmup on deploy", "Rate limiter for public API"]);
    for item in &store.items()[1..] {
        assert!(item.has_tag("brainstorming-auto"));
        assert_eq!(item.source.as_deref(), Some(PROMOTION_SOURCE));
        assert_eq!(item.status, ItemStatus::Pending);
    }

    let rewritten = outcome.backlog_rewrite.unwrap();
    assert!(!rewritten.contains("Cache warmup on deploy"));
    assert!(!rewritten.contains("Rate limiter for public API"));
    assert!(rewritten.contains("- **Webhook retry backoff**"));
    assert!(rewritten.contains("- **Metrics export to Prometheus**"));
    assert!(rewritten.starts_with("# Brainstorming\n"));
}

#[test]
fn nothing_promoted_at_or_above_floor() {
    let storage = storage_with_queue(vec![
        titled("wq-001", "Write onboarding guide"),
        titled("wq-002", "Shard the session table"),
        titled("wq-003", "Trim container image size"),
    ]);
    let mut store = QueueStore::load(&storage).unwrap();

    let outcome = promote(&mut store, BACKLOG);

    assert!(outcome.promoted.is_empty());
    assert_eq!(outcome.backlog_rewrite, None);
    assert!(!store.is_dirty());
}

#[test]
fn single_idea_is_held_back_as_buffer() {
    let storage = storage_with_queue(vec![]);
    let mut store = QueueStore::load(&storage).unwrap();

    let outcome = promote(&mut store, "- **Only idea here**: keep it\n");

    assert!(outcome.promoted.is_empty());
    assert_eq!(outcome.backlog_rewrite, None);
}

#[test]
fn empty_queue_promotes_full_floor() {
    let storage = storage_with_queue(vec![]);
    let mut store = QueueStore::load(&storage).unwrap();

    let outcome = promote(&mut store, BACKLOG);

    // deficit 3, buffer 1: three of four ideas move over
    assert_eq!(outcome.promoted.len(), 3);
    assert_eq!(store.actionable_count(), 3);
}

#[test]
fn ideas_already_queued_are_not_promoted_again() {
    let storage = storage_with_queue(vec![titled("wq-001", "Cache warmup on deploy")]);
    let mut store = QueueStore::load(&storage).unwrap();

    let outcome = promote(&mut store, BACKLOG);

    // three fresh candidates remain: deficit 2, buffer 1
    assert_eq!(outcome.promoted.len(), 2);
    let titles: Vec<&str> = store.items().iter().map(|i| i.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "Cache warmup on deploy",
            "Rate limiter for public API",
            "Webhook retry backoff"
        ]
    );
}

#[test]
fn blocked_items_do_not_count_toward_floor() {
    let storage = storage_with_queue(vec![
        make_item("wq-001", ItemStatus::Blocked),
        make_item("wq-002", ItemStatus::Blocked),
        make_item("wq-003", ItemStatus::Blocked),
    ]);
    let mut store = QueueStore::load(&storage).unwrap();

    let outcome = promote(&mut store, BACKLOG);

    assert_eq!(outcome.promoted, vec!["wq-004", "wq-005", "wq-006"]);
}
