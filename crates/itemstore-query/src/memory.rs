//! In-memory search executor.
//!
//! [`MemoryExecutor`] holds a list of items and answers search requests by
//! evaluating the compiled restriction locally. It records every request it
//! receives, which makes it the test double of choice for asserting how the
//! engine pages, and it can inject per-item and page-level failures.

use std::sync::{Mutex, MutexGuard, PoisonError};

use itemstore_api_rs::error::RemoteError;
use itemstore_api_rs::models::{EntityShape, Item, ItemId};
use tracing::debug;

use crate::executor::{Page, SearchExecutor, SearchRequest};

/// A store held in memory.
///
/// # Example
///
/// ```
/// use itemstore_query_rs::memory::MemoryExecutor;
///
/// let executor = MemoryExecutor::from_json(r#"[
///     {"id": "1", "fields": {"subject": {"type": "text", "value": "Hi"}}},
///     {"id": "2", "fields": {"subject": {"type": "text", "value": "Bye"}}}
/// ]"#).unwrap();
/// assert_eq!(executor.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct MemoryExecutor {
    entries: Mutex<Vec<Result<Item, RemoteError>>>,
    requests: Mutex<Vec<SearchRequest>>,
    deletes: Mutex<Vec<Vec<ItemId>>>,
    page_failure: Mutex<Option<(usize, RemoteError)>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryExecutor {
    /// Creates an executor holding `items`, in order.
    pub fn new(items: impl IntoIterator<Item = Item>) -> Self {
        Self {
            entries: Mutex::new(items.into_iter().map(Ok).collect()),
            ..Self::default()
        }
    }

    /// Loads items from a JSON array.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let items: Vec<Item> = serde_json::from_str(json)?;
        Ok(Self::new(items))
    }

    /// Inserts a per-item failure at `position` (clamped to the end).
    pub fn with_item_error(self, position: usize, error: RemoteError) -> Self {
        {
            let mut entries = lock(&self.entries);
            let position = position.min(entries.len());
            entries.insert(position, Err(error));
        }
        self
    }

    /// Fails every page request whose offset is at least `offset`.
    pub fn with_page_failure(self, offset: usize, error: RemoteError) -> Self {
        *lock(&self.page_failure) = Some((offset, error));
        self
    }

    /// Number of stored entries, failures included.
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every search request received so far.
    pub fn requests(&self) -> Vec<SearchRequest> {
        lock(&self.requests).clone()
    }

    /// Every delete call received so far.
    pub fn deletes(&self) -> Vec<Vec<ItemId>> {
        lock(&self.deletes).clone()
    }

    /// Ids of the stored items, in order.
    pub fn item_ids(&self) -> Vec<ItemId> {
        lock(&self.entries)
            .iter()
            .filter_map(|e| e.as_ref().ok().map(|item| item.id.clone()))
            .collect()
    }

    fn search(&self, request: &SearchRequest) -> Result<Page, RemoteError> {
        lock(&self.requests).push(request.clone());
        if let Some((offset, error)) = lock(&self.page_failure).as_ref() {
            if request.offset >= *offset {
                return Err(error.clone());
            }
        }

        let entries = lock(&self.entries);
        let matching: Vec<&Result<Item, RemoteError>> = entries
            .iter()
            .filter(|entry| match (entry, &request.restriction) {
                (Ok(item), Some(restriction)) => restriction.matches(item),
                _ => true,
            })
            .collect();
        let total = matching.len();
        let items: Vec<Result<Item, RemoteError>> = matching
            .into_iter()
            .skip(request.offset)
            .take(request.limit())
            .map(|entry| entry.clone().map(|item| shaped(item, request)))
            .collect();
        let end = request.offset + items.len();
        debug!(
            offset = request.offset,
            returned = items.len(),
            total,
            "Memory search"
        );
        Ok(Page {
            next_offset: (end < total && !items.is_empty()).then_some(end),
            items,
        })
    }

    fn delete(&self, ids: &[ItemId]) -> Vec<Result<(), RemoteError>> {
        lock(&self.deletes).push(ids.to_vec());
        let mut entries = lock(&self.entries);
        ids.iter()
            .map(|id| {
                let position = entries
                    .iter()
                    .position(|e| matches!(e, Ok(item) if item.id.id == id.id));
                match position {
                    Some(position) => entries.remove(position).map(|_| ()),
                    None => Err(RemoteError::item_not_found(&id.id)),
                }
            })
            .collect()
    }
}

/// Drops the fields the request did not ask for.
fn shaped(mut item: Item, request: &SearchRequest) -> Item {
    if request.shape != EntityShape::IdOnly {
        return item;
    }
    let keep: Vec<&str> = request
        .projection
        .iter()
        .flatten()
        .map(|path| path.field.as_str())
        .collect();
    item.retain_fields(&keep);
    item
}

impl SearchExecutor for MemoryExecutor {
    async fn find_items(&self, request: &SearchRequest) -> Result<Page, RemoteError> {
        self.search(request)
    }

    async fn delete_items(&self, ids: &[ItemId]) -> Vec<Result<(), RemoteError>> {
        self.delete(ids)
    }
}
