//! The search executor boundary.
//!
//! The engine never talks to the store directly. It hands a [`SearchRequest`]
//! to a [`SearchExecutor`], which owns transport, authentication and retry
//! policy, and gets back one [`Page`] of raw items per call. Paging is driven
//! by the engine.

use std::future::Future;

use itemstore_api_rs::error::RemoteError;
use itemstore_api_rs::fields::FieldPath;
use itemstore_api_rs::models::{EntityShape, FolderId, Item, ItemId, TraversalDepth};

use crate::restriction::CompiledRestriction;

/// One page request of a search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub folders: Vec<FolderId>,
    /// `None` matches every item in the folders.
    pub restriction: Option<CompiledRestriction>,
    pub shape: EntityShape,
    /// Extra fields to return on top of `shape`.
    pub projection: Option<Vec<FieldPath>>,
    /// Requested order. Executors may ignore it; the engine sorts client-side.
    pub order_hint: Option<Vec<FieldPath>>,
    pub depth: TraversalDepth,
    /// Maximum number of items to return in this page.
    pub page_size: usize,
    /// Index of the first item to return.
    pub offset: usize,
    /// Maximum number of items left to return over all pages.
    pub max_items: Option<usize>,
}

impl SearchRequest {
    /// Number of items this page may contain.
    pub fn limit(&self) -> usize {
        self.max_items
            .map_or(self.page_size, |max| max.min(self.page_size))
    }
}

/// One page of search results.
///
/// Entries that failed on the store side appear as `Err` at their position.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<Result<Item, RemoteError>>,
    /// Offset of the next page, or `None` if this was the last one.
    pub next_offset: Option<usize>,
}

impl Page {
    /// A final page.
    pub fn last(items: Vec<Result<Item, RemoteError>>) -> Self {
        Self {
            items,
            next_offset: None,
        }
    }
}

/// Runs searches and deletes against the store.
///
/// Returned errors are final: retries have already been applied.
pub trait SearchExecutor {
    /// Fetches one page of items.
    ///
    /// An `Err` means the whole page failed; per-item failures are reported
    /// inside [`Page::items`].
    fn find_items(
        &self,
        request: &SearchRequest,
    ) -> impl Future<Output = Result<Page, RemoteError>> + Send;

    /// Deletes items, returning one outcome per id in input order.
    fn delete_items(
        &self,
        ids: &[ItemId],
    ) -> impl Future<Output = Vec<Result<(), RemoteError>>> + Send;
}
