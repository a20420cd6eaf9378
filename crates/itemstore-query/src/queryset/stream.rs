//! Paging and streaming of search results.

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::sync::Arc;
use std::vec;

use itemstore_api_rs::error::RemoteError;
use itemstore_api_rs::models::{Item, Value};
use tracing::{debug, warn};

use super::shape::{Row, Shaper};
use crate::executor::{SearchExecutor, SearchRequest};
use crate::resolve::FieldOrder;

/// Drives one search through as many pages as needed.
///
/// The offset advances by what each page reports. The pass ends on the last
/// page, on an empty page, once `max_items` entries have been returned, or on
/// a page failure, which is yielded as a final `Err` entry.
pub(crate) struct PageCursor<E> {
    executor: Arc<E>,
    request: SearchRequest,
    offset: usize,
    fetched: usize,
    buffer: VecDeque<Result<Item, RemoteError>>,
    done: bool,
}

impl<E: SearchExecutor> PageCursor<E> {
    pub fn new(executor: Arc<E>, request: SearchRequest) -> Self {
        Self {
            offset: request.offset,
            executor,
            request,
            fetched: 0,
            buffer: VecDeque::new(),
            done: false,
        }
    }

    pub async fn next(&mut self) -> Option<Result<Item, RemoteError>> {
        while self.buffer.is_empty() && !self.done {
            self.fetch_page().await;
        }
        self.buffer.pop_front()
    }

    pub async fn drain(mut self) -> Vec<Result<Item, RemoteError>> {
        let mut entries = Vec::new();
        while let Some(entry) = self.next().await {
            entries.push(entry);
        }
        entries
    }

    async fn fetch_page(&mut self) {
        let remaining = self.request.max_items.map(|max| max.saturating_sub(self.fetched));
        if remaining == Some(0) {
            self.done = true;
            return;
        }
        let request = SearchRequest {
            offset: self.offset,
            max_items: remaining,
            ..self.request.clone()
        };
        debug!(
            offset = request.offset,
            page_size = request.page_size,
            max_items = ?request.max_items,
            "Requesting page"
        );

        match self.executor.find_items(&request).await {
            Ok(page) => {
                let mut items = page.items;
                if let Some(remaining) = remaining {
                    items.truncate(remaining);
                }
                for error in items.iter().filter_map(|e| e.as_ref().err()) {
                    warn!(error = %error, "Item failed in search result");
                }
                self.fetched += items.len();
                match page.next_offset {
                    Some(next) if !items.is_empty() && next > self.offset => self.offset = next,
                    _ => self.done = true,
                }
                self.buffer.extend(items);
            }
            Err(error) => {
                warn!(error = %error, offset = self.offset, "Search page failed");
                self.buffer.push_back(Err(error));
                self.done = true;
            }
        }
    }
}

/// Sorts entries by the given keys, keeping the store's order for ties.
///
/// A missing value sorts first in ascending order and last in descending
/// order. Failed entries have no values.
pub(crate) fn sort_entries(entries: &mut [Result<Item, RemoteError>], ordering: &[FieldOrder]) {
    let keys = |entry: &Result<Item, RemoteError>| -> Vec<Option<Value>> {
        ordering
            .iter()
            .map(|order| {
                entry
                    .as_ref()
                    .ok()
                    .and_then(|item| item.value_at(&order.path))
                    .filter(|value| !value.is_null())
            })
            .collect()
    };
    let mut keyed: Vec<(Vec<Option<Value>>, Result<Item, RemoteError>)> = Vec::with_capacity(entries.len());
    for entry in entries.iter() {
        keyed.push((keys(entry), entry.clone()));
    }
    keyed.sort_by(|(a, _), (b, _)| compare_keys(a, b, ordering));
    for (slot, (_, entry)) in entries.iter_mut().zip(keyed) {
        *slot = entry;
    }
}

fn compare_keys(a: &[Option<Value>], b: &[Option<Value>], ordering: &[FieldOrder]) -> Ordering {
    for ((x, y), order) in a.iter().zip(b).zip(ordering) {
        let cmp = match (x, y) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(x), Some(y)) => x.sort_cmp(y),
        };
        let cmp = if order.descending { cmp.reverse() } else { cmp };
        if cmp != Ordering::Equal {
            return cmp;
        }
    }
    Ordering::Equal
}

enum Source<E> {
    Empty,
    Pages(PageCursor<E>),
    Ordered {
        cursor: Option<PageCursor<E>>,
        ordering: Vec<FieldOrder>,
        sorted: vec::IntoIter<Result<Item, RemoteError>>,
    },
}

/// A single streaming pass over a query's results.
///
/// Rows are produced page by page as they are consumed. When the query is
/// ordered, every page is fetched on the first call to [`next`](Self::next)
/// and sorted before the first row is returned. A stream never fills the
/// query's result cache.
pub struct ResultStream<E> {
    source: Source<E>,
    shaper: Shaper,
}

impl<E: SearchExecutor> ResultStream<E> {
    pub(crate) fn empty() -> Self {
        Self {
            source: Source::Empty,
            shaper: Shaper::default(),
        }
    }

    pub(crate) fn new(cursor: PageCursor<E>, ordering: Vec<FieldOrder>, shaper: Shaper) -> Self {
        let source = if ordering.is_empty() {
            Source::Pages(cursor)
        } else {
            Source::Ordered {
                cursor: Some(cursor),
                ordering,
                sorted: Vec::new().into_iter(),
            }
        };
        Self { source, shaper }
    }

    /// Returns the next row, or `None` once the pass is over.
    ///
    /// A failed item or page is returned as an `Err` in its position.
    pub async fn next(&mut self) -> Option<Result<Row, RemoteError>> {
        let entry = match &mut self.source {
            Source::Empty => None,
            Source::Pages(cursor) => cursor.next().await,
            Source::Ordered {
                cursor,
                ordering,
                sorted,
            } => {
                if let Some(cursor) = cursor.take() {
                    let mut entries = cursor.drain().await;
                    debug!(count = entries.len(), "Sorting results client-side");
                    sort_entries(&mut entries, ordering);
                    *sorted = entries.into_iter();
                }
                sorted.next()
            }
        }?;
        Some(entry.map(|item| self.shaper.apply(item)))
    }

    /// Consumes the rest of the stream.
    pub async fn collect_all(mut self) -> Vec<Result<Row, RemoteError>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next().await {
            rows.push(row);
        }
        rows
    }
}
