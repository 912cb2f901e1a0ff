#![allow(dead_code)]

use queue_golem::config::QueueGolemConfig;
use queue_golem::storage::{MemoryStorage, ARCHIVE_KEY, QUEUE_KEY};
use queue_golem::types::{ArchiveFile, BlockerCheck, Complexity, ItemStatus, QueueFile, QueueItem};

/// Creates a `QueueItem` with minimal defaults.
///
/// The title is auto-generated as `"Test item {id}"`; timestamps are fixed so
/// serialized output is stable.
pub fn make_item(id: &str, status: ItemStatus) -> QueueItem {
    QueueItem {
        id: id.to_string(),
        title: format!("Test item {}", id),
        status,
        created: "2026-02-10T00:00:00+00:00".to_string(),
        updated: "2026-02-10T00:00:00+00:00".to_string(),
        ..Default::default()
    }
}

/// Creates a pending item with the given title.
pub fn titled(id: &str, title: &str) -> QueueItem {
    let mut item = make_item(id, ItemStatus::Pending);
    item.title = title.to_string();
    item
}

/// Creates a pending item with the given complexity.
pub fn sized(id: &str, complexity: Complexity) -> QueueItem {
    let mut item = make_item(id, ItemStatus::Pending);
    item.complexity = complexity;
    item
}

/// Creates a blocked item carrying `check`.
pub fn blocked_with(id: &str, check: BlockerCheck) -> QueueItem {
    let mut item = make_item(id, ItemStatus::Blocked);
    item.blocker_check = Some(check);
    item
}

pub fn queue_json(items: Vec<QueueItem>) -> String {
    serde_json::to_string_pretty(&QueueFile { queue: items }).unwrap()
}

pub fn archive_json(items: Vec<QueueItem>) -> String {
    serde_json::to_string_pretty(&ArchiveFile { archived: items }).unwrap()
}

/// In-memory storage seeded with an active queue.
pub fn storage_with_queue(items: Vec<QueueItem>) -> MemoryStorage {
    MemoryStorage::new().with_doc(QUEUE_KEY, &queue_json(items))
}

/// In-memory storage seeded with an active queue and an archive.
pub fn storage_with_archive(items: Vec<QueueItem>, archived: Vec<QueueItem>) -> MemoryStorage {
    storage_with_queue(items).with_doc(ARCHIVE_KEY, &archive_json(archived))
}

/// Parses whatever the storage currently holds for the active queue.
pub fn saved_queue(storage: &MemoryStorage) -> Vec<QueueItem> {
    let doc = storage.get(QUEUE_KEY).expect("queue document present");
    serde_json::from_str::<QueueFile>(&doc).unwrap().queue
}

pub fn default_config() -> QueueGolemConfig {
    QueueGolemConfig::default()
}
