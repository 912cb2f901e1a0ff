use std::cell::OnceCell;
use std::collections::HashSet;

use crate::deps;
use crate::log_debug;
use crate::qg_error::QueueError;
use crate::storage::{Storage, ARCHIVE_KEY, QUEUE_KEY};
use crate::types::{ArchiveFile, ItemStatus, NewItem, QueueFile, QueueItem};

pub const ID_PREFIX: &str = "wq";

/// Format a numeric suffix as a queue id. Zero-pads to 3 digits minimum.
pub fn format_id(number: u32) -> String {
    format!("{}-{:03}", ID_PREFIX, number)
}

/// Numeric suffix of a `wq-NNN` id, or `None` for anything else.
pub fn parse_id_number(id: &str) -> Option<u32> {
    let suffix = id.strip_prefix(ID_PREFIX)?.strip_prefix('-')?;
    if suffix.is_empty() || !suffix.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}

/// Highest numeric suffix across `items`; zero when none parse.
pub fn max_item_suffix(items: &[QueueItem]) -> u32 {
    items
        .iter()
        .filter_map(|item| parse_id_number(&item.id))
        .max()
        .unwrap_or(0)
}

// --- Identity allocator ---

/// Memoized high-water mark for id allocation.
///
/// The mark is computed on first use by a caller-supplied scan over active
/// and archived items, then advanced in place by every reservation so ids
/// stay strictly increasing for the lifetime of the allocator.
#[derive(Debug, Default)]
pub struct IdAllocator {
    high_water: Option<u32>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_primed(&self) -> bool {
        self.high_water.is_some()
    }

    pub fn high_water<F>(&mut self, scan: F) -> Result<u32, QueueError>
    where
        F: FnOnce() -> Result<u32, QueueError>,
    {
        match self.high_water {
            Some(mark) => Ok(mark),
            None => {
                let mark = scan()?;
                self.high_water = Some(mark);
                Ok(mark)
            }
        }
    }

    /// Reserve a contiguous block of `count` ids.
    pub fn reserve<F>(&mut self, count: u32, scan: F) -> Result<Vec<String>, QueueError>
    where
        F: FnOnce() -> Result<u32, QueueError>,
    {
        let start = self.high_water(scan)? + 1;
        let ids = (start..start + count).map(format_id).collect();
        if count > 0 {
            self.high_water = Some(start + count - 1);
        }
        Ok(ids)
    }

    /// Forget the mark; the next allocation rescans.
    pub fn invalidate(&mut self) {
        self.high_water = None;
    }
}

// --- Queue store ---

/// Per-invocation view of the active queue.
///
/// Loaded once, mutated in place by the pipeline passes, written back by the
/// caller only when `is_dirty()`. Derived values (`titles`,
/// `actionable_count`) are memoized and dropped on every mutation.
pub struct QueueStore<'s> {
    storage: &'s dyn Storage,
    items: Vec<QueueItem>,
    ids: IdAllocator,
    dirty: bool,
    titles: OnceCell<Vec<String>>,
    actionable_count: OnceCell<usize>,
}

impl std::fmt::Debug for QueueStore<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueStore")
            .field("items", &self.items.len())
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl<'s> QueueStore<'s> {
    /// Load the active queue. Any failure here is fatal for the invocation.
    pub fn load(storage: &'s dyn Storage) -> Result<Self, QueueError> {
        let contents = storage
            .load(QUEUE_KEY)
            .map_err(QueueError::into_fatal)?
            .ok_or_else(|| QueueError::QueueUnreadable {
                key: QUEUE_KEY.to_string(),
                reason: "document not found (run `queue-golem init`)".to_string(),
            })?;

        let file: QueueFile =
            serde_json::from_str(&contents).map_err(|e| QueueError::QueueMalformed {
                key: QUEUE_KEY.to_string(),
                reason: e.to_string(),
            })?;

        let mut seen = HashSet::new();
        for item in &file.queue {
            if !seen.insert(item.id.as_str()) {
                return Err(QueueError::QueueMalformed {
                    key: QUEUE_KEY.to_string(),
                    reason: format!("duplicate id {}", item.id),
                });
            }
        }

        log_debug!("[store] Loaded {} item(s)", file.queue.len());
        Ok(Self::from_items(storage, file.queue))
    }

    pub fn from_items(storage: &'s dyn Storage, items: Vec<QueueItem>) -> Self {
        Self {
            storage,
            items,
            ids: IdAllocator::new(),
            dirty: false,
            titles: OnceCell::new(),
            actionable_count: OnceCell::new(),
        }
    }

    pub fn storage(&self) -> &'s dyn Storage {
        self.storage
    }

    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&QueueItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Titles of every active item, in queue order.
    pub fn titles(&self) -> &[String] {
        self.titles
            .get_or_init(|| self.items.iter().map(|item| item.title.clone()).collect())
    }

    pub fn actionable_count(&self) -> usize {
        *self.actionable_count.get_or_init(|| {
            self.items
                .iter()
                .filter(|item| deps::is_actionable(item, &self.items))
                .count()
        })
    }

    /// Pending items with satisfied dependencies, in queue order.
    pub fn actionable_items(&self) -> Vec<&QueueItem> {
        self.items
            .iter()
            .filter(|item| deps::is_actionable(item, &self.items))
            .collect()
    }

    pub fn count_with_status(&self, status: ItemStatus) -> usize {
        self.items.iter().filter(|item| item.status == status).count()
    }

    // --- Identity ---

    /// The id the next `create_item` would receive. Does not reserve it.
    pub fn next_id(&mut self) -> Result<String, QueueError> {
        let items = &self.items;
        let storage = self.storage;
        let mark = self.ids.high_water(|| scan_high_water(items, storage))?;
        Ok(format_id(mark + 1))
    }

    /// Reserve `count` contiguous ids.
    pub fn allocate(&mut self, count: u32) -> Result<Vec<String>, QueueError> {
        let items = &self.items;
        let storage = self.storage;
        self.ids.reserve(count, || scan_high_water(items, storage))
    }

    pub fn invalidate_ids(&mut self) {
        self.ids.invalidate();
    }

    // --- Mutation ---

    /// Allocate an id, build a default-filled pending item, append it.
    pub fn create_item(&mut self, new: NewItem) -> Result<QueueItem, QueueError> {
        let id = self
            .allocate(1)?
            .pop()
            .ok_or_else(|| QueueError::StorageWrite {
                key: QUEUE_KEY.to_string(),
                reason: "id allocation returned nothing".to_string(),
            })?;
        let now = chrono::Utc::now().to_rfc3339();

        let item = QueueItem {
            priority: parse_id_number(&id).unwrap_or(0),
            id,
            title: new.title,
            description: new.description,
            status: ItemStatus::Pending,
            deps: new.deps,
            tags: new.tags,
            source: new.source,
            complexity: new.complexity,
            created: now.clone(),
            updated: now,
            ..Default::default()
        };

        self.items.push(item.clone());
        self.touch();
        Ok(item)
    }

    /// Apply `f` to the item with `id`. Returns false if no such item.
    pub fn update<F>(&mut self, id: &str, f: F) -> bool
    where
        F: FnOnce(&mut QueueItem),
    {
        let Some(item) = self.items.iter_mut().find(|item| item.id == id) else {
            return false;
        };
        f(item);
        item.updated = chrono::Utc::now().to_rfc3339();
        self.touch();
        true
    }

    /// Remove the items at `indices`, highest index first so earlier indices
    /// stay valid. Returns the removed items in queue order.
    pub fn remove_indices(&mut self, indices: &[usize]) -> Vec<QueueItem> {
        let mut sorted: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&idx| idx < self.items.len())
            .collect();
        sorted.sort_unstable();
        sorted.dedup();

        let mut removed: Vec<QueueItem> = sorted
            .iter()
            .rev()
            .map(|&idx| self.items.remove(idx))
            .collect();
        removed.reverse();

        if !removed.is_empty() {
            self.touch();
        }
        removed
    }

    fn touch(&mut self) {
        self.dirty = true;
        self.titles.take();
        self.actionable_count.take();
    }

    // --- Persistence ---

    pub fn to_json(&self) -> Result<String, QueueError> {
        let file = QueueFile {
            queue: self.items.clone(),
        };
        serde_json::to_string_pretty(&file)
            .map(|mut s| {
                s.push('\n');
                s
            })
            .map_err(|e| QueueError::StorageWrite {
                key: QUEUE_KEY.to_string(),
                reason: e.to_string(),
            })
    }

    /// Write the queue back. Callers decide whether that is warranted.
    pub fn save(&self) -> Result<(), QueueError> {
        let json = self.to_json()?;
        self.storage.save(QUEUE_KEY, &json)
    }
}

/// Write an empty queue document unless one already exists. Returns whether
/// anything was written.
pub fn init_queue(storage: &dyn Storage) -> Result<bool, QueueError> {
    if storage.load(QUEUE_KEY)?.is_some() {
        return Ok(false);
    }
    QueueStore::from_items(storage, Vec::new()).save()?;
    Ok(true)
}

/// `max(active ∪ archived)`. A corrupt archive is fatal: allocating blind
/// could reuse a retired id.
fn scan_high_water(items: &[QueueItem], storage: &dyn Storage) -> Result<u32, QueueError> {
    let active_max = max_item_suffix(items);
    let archived_max = match storage.load(ARCHIVE_KEY).map_err(QueueError::into_fatal)? {
        None => 0,
        Some(contents) if contents.trim().is_empty() => 0,
        Some(contents) => {
            let archive: ArchiveFile =
                serde_json::from_str(&contents).map_err(|e| QueueError::QueueMalformed {
                    key: ARCHIVE_KEY.to_string(),
                    reason: e.to_string(),
                })?;
            max_item_suffix(&archive.archived)
        }
    };
    log_debug!(
        "[ids] High-water mark: active={}, archived={}",
        active_max,
        archived_max
    );
    Ok(active_max.max(archived_max))
}
