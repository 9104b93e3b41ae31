//! Upload queue: item records in insertion order.
//!
//! Insertion order is admission priority among pending items. Items are never
//! removed; status changes go through the scheduler.

mod item;
mod payload;
mod source;
mod stats;

pub use item::{ItemId, UploadItem, UploadStatus};
pub use payload::ResponsePayload;
pub use source::{FileSource, SourceBody};
pub use stats::QueueStats;

use serde::Serialize;
use tokio::time::Instant;

#[derive(Debug, Default)]
pub struct Queue {
    items: Vec<UploadItem>,
    next_id: u64,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one pending record per source; returns their ids in order.
    pub(crate) fn push_files(
        &mut self,
        sources: impl IntoIterator<Item = FileSource>,
        now: Instant,
    ) -> Vec<ItemId> {
        let mut ids = Vec::new();
        for source in sources {
            let id = ItemId(self.next_id);
            self.next_id += 1;
            self.items.push(UploadItem::new(id, source, now));
            ids.push(id);
        }
        ids
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UploadItem> {
        self.items.iter()
    }

    pub fn get(&self, id: ItemId) -> Option<&UploadItem> {
        let i = self.index_of(id)?;
        self.items.get(i)
    }

    pub(crate) fn get_mut(&mut self, id: ItemId) -> Option<&mut UploadItem> {
        let i = self.index_of(id)?;
        self.items.get_mut(i)
    }

    // Ids are assigned increasing and nothing is removed, so items stay sorted by id.
    fn index_of(&self, id: ItemId) -> Option<usize> {
        self.items.binary_search_by_key(&id, |it| it.id()).ok()
    }

    pub fn count(&self, status: UploadStatus) -> usize {
        self.items.iter().filter(|it| it.status() == status).count()
    }

    /// Ids with the given status, in queue order.
    pub fn ids_with_status(&self, status: UploadStatus) -> Vec<ItemId> {
        self.items
            .iter()
            .filter(|it| it.status() == status)
            .map(|it| it.id())
            .collect()
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats::from_items(&self.items)
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            items: self.items.iter().map(ItemSnapshot::from).collect(),
            stats: self.stats(),
        }
    }
}

/// Owned, serializable view of one item for observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemSnapshot {
    pub id: ItemId,
    pub name: String,
    pub status: UploadStatus,
    pub progress: f64,
    pub loaded: u64,
    pub total: u64,
    pub speed: String,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponsePayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&UploadItem> for ItemSnapshot {
    fn from(it: &UploadItem) -> Self {
        Self {
            id: it.id(),
            name: it.name().to_string(),
            status: it.status(),
            progress: it.progress(),
            loaded: it.loaded(),
            total: it.total(),
            speed: it.speed_label().to_string(),
            attempts: it.attempts(),
            response: it.response().cloned(),
            error: it
                .error_body()
                .filter(|b| !b.is_empty())
                .or(it.error_message())
                .map(str::to_string),
        }
    }
}

/// Whole-queue view published to observers after every applied event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueSnapshot {
    pub items: Vec<ItemSnapshot>,
    pub stats: QueueStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sources(names: &[&str]) -> Vec<FileSource> {
        names
            .iter()
            .map(|n| FileSource::from_bytes(*n, vec![1u8; 10]))
            .collect()
    }

    #[test]
    fn push_files_keeps_order_and_allows_duplicate_names() {
        let mut q = Queue::new();
        let ids = q.push_files(sources(&["a", "b", "a"]), Instant::now());
        assert_eq!(ids.len(), 3);
        let names: Vec<_> = q.iter().map(|it| it.name().to_string()).collect();
        assert_eq!(names, ["a", "b", "a"]);
        assert_ne!(ids[0], ids[2]);
        assert!(q.iter().all(|it| it.status() == UploadStatus::Pending));
        assert!(q.iter().all(|it| it.total() == 10 && it.loaded() == 0));
    }

    #[test]
    fn ids_continue_across_batches() {
        let mut q = Queue::new();
        let first = q.push_files(sources(&["a"]), Instant::now());
        let second = q.push_files(sources(&["b", "c"]), Instant::now());
        assert!(first[0] < second[0] && second[0] < second[1]);
        assert_eq!(q.get(second[1]).unwrap().name(), "c");
        assert!(q.get(ItemId(99)).is_none());
    }

    #[test]
    fn filtered_views_by_status() {
        let mut q = Queue::new();
        let ids = q.push_files(sources(&["a", "b", "c"]), Instant::now());
        q.get_mut(ids[1]).unwrap().activate(Instant::now());
        assert_eq!(q.count(UploadStatus::Active), 1);
        assert_eq!(q.ids_with_status(UploadStatus::Pending), vec![ids[0], ids[2]]);
        let stats = q.stats();
        assert_eq!((stats.pending, stats.active), (2, 1));
        assert_eq!(stats.item_count(), 3);
        assert_eq!(stats.total_bytes, 30);
    }

    #[test]
    fn snapshot_serializes_lowercase_status() {
        let mut q = Queue::new();
        q.push_files(sources(&["pic.png"]), Instant::now());
        let json = serde_json::to_value(q.snapshot()).unwrap();
        assert_eq!(json["items"][0]["status"], "pending");
        assert_eq!(json["items"][0]["name"], "pic.png");
        assert!(json["items"][0].get("response").is_none());
        assert_eq!(json["stats"]["pending"], 1);
    }
}
