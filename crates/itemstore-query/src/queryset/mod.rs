//! Lazy, chainable queries over one or more folders.
//!
//! A [`QuerySet`] describes a search: a predicate, an optional projection, an
//! ordering and a result shape. Building one never touches the store. Each
//! chaining call returns a new, uncached query set and leaves the receiver
//! unchanged.
//!
//! Terminal calls run the search. [`QuerySet::fetch`], [`count`](QuerySet::count),
//! [`get`](QuerySet::get) and negative or ordered slicing fetch the full result
//! once and cache it; later terminal calls on the same query set are answered
//! from the cache. [`QuerySet::iterator`] streams a fresh pass and never
//! caches.
//!
//! Failures the store reports for single items stay in the result as `Err`
//! entries at their position.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use itemstore_api_rs::prelude::*;
//! use itemstore_query_rs::memory::MemoryExecutor;
//! use itemstore_query_rs::predicate::Q;
//! use itemstore_query_rs::queryset::QuerySet;
//!
//! # tokio_test_block(async {
//! let executor = MemoryExecutor::new([
//!     Item::new(ItemId::new("1")).with_field("subject", "Hi"),
//!     Item::new(ItemId::new("2")).with_field("subject", "Bye"),
//! ]);
//! let qs = QuerySet::new(
//!     Arc::new(executor),
//!     Arc::new(FieldCatalog::standard()),
//!     [FolderId::distinguished("inbox")],
//! );
//! let mut hi = qs.filter(Q::kw("subject", "Hi").unwrap()).unwrap();
//! assert_eq!(hi.count().await.unwrap(), 1);
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

mod shape;
mod slice;
mod stream;

use std::fmt;
use std::sync::Arc;

use itemstore_api_rs::error::RemoteError;
use itemstore_api_rs::fields::{FieldCatalog, FieldPath};
use itemstore_api_rs::models::{EntityShape, FolderId, ItemId, TraversalDepth};
use tracing::{debug, warn};

pub use shape::{ResultShape, Row};
pub use slice::Slice;
pub use stream::ResultStream;

use self::shape::Shaper;
use self::slice::resolve_index;
use self::stream::PageCursor;
use crate::config::QueryConfig;
use crate::error::{QueryError, Result};
use crate::executor::{SearchExecutor, SearchRequest};
use crate::predicate::Q;
use crate::resolve::{FieldOrder, Resolver};
use crate::restriction::{compile, CompiledRestriction};

/// One result element: a row, or the failure the store reported for it.
pub type Entry = std::result::Result<Row, RemoteError>;

#[derive(Debug, Clone)]
enum State {
    Unmaterialized,
    Materialized(Vec<Entry>),
}

/// A lazy query against a search executor.
pub struct QuerySet<E> {
    executor: Arc<E>,
    catalog: Arc<FieldCatalog>,
    folders: Vec<FolderId>,
    /// `None` after [`none`](QuerySet::none): matches nothing.
    predicate: Option<Q>,
    projection: Option<Vec<FieldPath>>,
    ordering: Vec<FieldOrder>,
    reversed: bool,
    shape: ResultShape,
    page_size: usize,
    id_page_size: usize,
    depth: TraversalDepth,
    state: State,
}

impl<E> Clone for QuerySet<E> {
    fn clone(&self) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
            catalog: Arc::clone(&self.catalog),
            folders: self.folders.clone(),
            predicate: self.predicate.clone(),
            projection: self.projection.clone(),
            ordering: self.ordering.clone(),
            reversed: self.reversed,
            shape: self.shape,
            page_size: self.page_size,
            id_page_size: self.id_page_size,
            depth: self.depth,
            state: self.state.clone(),
        }
    }
}

impl<E: SearchExecutor> QuerySet<E> {
    /// Creates a query set matching every item in `folders`, with the
    /// default configuration.
    pub fn new(
        executor: Arc<E>,
        catalog: Arc<FieldCatalog>,
        folders: impl IntoIterator<Item = FolderId>,
    ) -> Self {
        let config = QueryConfig::default();
        Self {
            executor,
            catalog,
            folders: folders.into_iter().collect(),
            predicate: Some(Q::all()),
            projection: None,
            ordering: Vec::new(),
            reversed: false,
            shape: ResultShape::Entities,
            page_size: config.page_size,
            id_page_size: config.count_page_size,
            depth: config.depth,
            state: State::Unmaterialized,
        }
    }

    /// Applies page sizes and traversal depth from a config.
    pub fn with_config(mut self, config: &QueryConfig) -> Self {
        self.page_size = config.page_size;
        self.id_page_size = config.count_page_size;
        self.depth = config.depth;
        self.state = State::Unmaterialized;
        self
    }

    fn chained(&self) -> Self {
        let mut qs = self.clone();
        qs.state = State::Unmaterialized;
        qs
    }

    fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.catalog)
    }

    // ==================== Chaining ====================

    /// Returns an uncached copy.
    pub fn all(&self) -> Self {
        self.chained()
    }

    /// Returns a query set that matches nothing and never calls the store.
    pub fn none(&self) -> Self {
        let mut qs = self.chained();
        qs.predicate = None;
        qs
    }

    /// Narrows the query to items matching `q` as well.
    ///
    /// # Errors
    ///
    /// Returns the resolution error for an invalid lookup.
    pub fn filter(&self, q: Q) -> Result<Self> {
        let resolved = self.resolver().resolve(q)?;
        let mut qs = self.chained();
        qs.predicate = qs.predicate.take().map(|p| p & resolved);
        Ok(qs)
    }

    /// Narrows the query to items not matching `q`.
    pub fn exclude(&self, q: Q) -> Result<Self> {
        let resolved = self.resolver().resolve(q)?;
        let mut qs = self.chained();
        qs.predicate = qs.predicate.take().map(|p| p & !resolved);
        Ok(qs)
    }

    /// Fetches only the given fields. Entity rows carry no other fields.
    pub fn only(&self, fields: &[&str]) -> Result<Self> {
        let paths = self.projected_paths("only", fields)?;
        let mut qs = self.chained();
        qs.projection = Some(paths);
        qs.shape = ResultShape::Entities;
        Ok(qs)
    }

    /// Returns rows of field path to value pairs instead of items.
    pub fn values(&self, fields: &[&str]) -> Result<Self> {
        let paths = self.projected_paths("values", fields)?;
        let mut qs = self.chained();
        qs.projection = Some(paths);
        qs.shape = ResultShape::ValuesDict;
        Ok(qs)
    }

    /// Returns rows of bare values, or single values when `flat` is set.
    ///
    /// # Errors
    ///
    /// `flat` requires exactly one field.
    pub fn values_list(&self, fields: &[&str], flat: bool) -> Result<Self> {
        if flat && fields.len() != 1 {
            return Err(QueryError::invalid_arguments(format!(
                "flat=true requires exactly one field, got {}",
                fields.len()
            )));
        }
        let paths = self.projected_paths("values_list", fields)?;
        let mut qs = self.chained();
        qs.projection = Some(paths);
        qs.shape = if flat {
            ResultShape::Flat
        } else {
            ResultShape::ValuesTuple
        };
        Ok(qs)
    }

    fn projected_paths(&self, call: &str, fields: &[&str]) -> Result<Vec<FieldPath>> {
        if fields.is_empty() {
            return Err(QueryError::invalid_arguments(format!(
                "{}() requires at least one field",
                call
            )));
        }
        let resolver = self.resolver();
        fields.iter().map(|f| resolver.field_path(f)).collect()
    }

    /// Sorts the result client-side by the given keys. A leading `-` sorts
    /// descending. No keys clears the ordering.
    pub fn order_by(&self, fields: &[&str]) -> Result<Self> {
        let resolver = self.resolver();
        let ordering = fields
            .iter()
            .map(|f| resolver.order(f))
            .collect::<Result<Vec<_>>>()?;
        let mut qs = self.chained();
        qs.ordering = ordering;
        qs.reversed = false;
        Ok(qs)
    }

    /// Flips the direction of every sort key.
    ///
    /// # Errors
    ///
    /// Fails when no ordering is set.
    pub fn reverse(&self) -> Result<Self> {
        if self.ordering.is_empty() {
            return Err(QueryError::invalid_arguments(
                "reverse() requires an ordering, call order_by() first",
            ));
        }
        let mut qs = self.chained();
        qs.reversed = !qs.reversed;
        Ok(qs)
    }

    /// Sets the number of items requested per page.
    pub fn page_size(&self, page_size: usize) -> Result<Self> {
        if page_size == 0 {
            return Err(QueryError::invalid_arguments("page size must be at least 1"));
        }
        let mut qs = self.chained();
        qs.page_size = page_size;
        Ok(qs)
    }

    /// Sets the folder traversal depth.
    pub fn depth(&self, depth: TraversalDepth) -> Self {
        let mut qs = self.chained();
        qs.depth = depth;
        qs
    }

    // ==================== Inspection ====================

    /// The accumulated predicate, or `None` for an empty query set.
    pub fn predicate(&self) -> Option<&Q> {
        self.predicate.as_ref()
    }

    /// The restriction that would be sent to the store.
    pub fn restriction(&self) -> Result<Option<CompiledRestriction>> {
        match &self.predicate {
            Some(q) => compile(q, &self.catalog),
            None => Ok(None),
        }
    }

    /// The sort keys in effect, with [`reverse`](Self::reverse) applied.
    pub fn ordering(&self) -> Vec<FieldOrder> {
        self.ordering
            .iter()
            .map(|order| FieldOrder {
                path: order.path.clone(),
                descending: order.descending != self.reversed,
            })
            .collect()
    }

    pub fn shape(&self) -> ResultShape {
        self.shape
    }

    pub fn is_cached(&self) -> bool {
        matches!(self.state, State::Materialized(_))
    }

    /// The cached result, if the query set has been materialized.
    pub fn cached(&self) -> Option<&[Entry]> {
        match &self.state {
            State::Materialized(rows) => Some(rows),
            State::Unmaterialized => None,
        }
    }

    // ==================== Execution ====================

    fn plan(&self, ordering: &[FieldOrder]) -> (EntityShape, Option<Vec<FieldPath>>, Shaper) {
        let Some(fields) = &self.projection else {
            return (
                EntityShape::AllProperties,
                None,
                Shaper {
                    shape: self.shape,
                    ..Shaper::default()
                },
            );
        };

        let is_attribute =
            |path: &FieldPath| self.catalog.get(&path.field).is_some_and(|d| d.is_attribute);
        let mut projection: Vec<FieldPath> =
            fields.iter().filter(|p| !is_attribute(*p)).cloned().collect();
        let mut strip = Vec::new();
        for order in ordering {
            if is_attribute(&order.path) || fields.iter().any(|p| p.field == order.path.field) {
                continue;
            }
            if !projection.contains(&order.path) {
                projection.push(order.path.clone());
            }
            if !strip.contains(&order.path.field) {
                strip.push(order.path.field.clone());
            }
        }

        let shaper = Shaper {
            shape: self.shape,
            fields: fields.clone(),
            strip,
        };
        let projection = (!projection.is_empty()).then_some(projection);
        (EntityShape::IdOnly, projection, shaper)
    }

    fn stream(
        &self,
        offset: usize,
        max_items: Option<usize>,
        page_size: usize,
    ) -> Result<ResultStream<E>> {
        let Some(predicate) = &self.predicate else {
            return Ok(ResultStream::empty());
        };
        let restriction = compile(predicate, &self.catalog)?;
        let ordering = self.ordering();
        let (shape, projection, shaper) = self.plan(&ordering);
        let order_hint =
            (!ordering.is_empty()).then(|| ordering.iter().map(|o| o.path.clone()).collect());
        let request = SearchRequest {
            folders: self.folders.clone(),
            restriction,
            shape,
            projection,
            order_hint,
            depth: self.depth,
            page_size,
            offset,
            max_items,
        };
        let cursor = PageCursor::new(Arc::clone(&self.executor), request);
        Ok(ResultStream::new(cursor, ordering, shaper))
    }

    /// Streams a fresh pass over the result without filling the cache.
    pub fn iterator(&self) -> Result<ResultStream<E>> {
        self.stream(0, None, self.page_size)
    }

    /// Returns the full result, fetching and caching it on first use.
    pub async fn fetch(&mut self) -> Result<&[Entry]> {
        if !self.is_cached() {
            debug!(query = %self, "Initializing cache");
            let rows = self.stream(0, None, self.page_size)?.collect_all().await;
            self.state = State::Materialized(rows);
        }
        Ok(self.cached().unwrap_or_default())
    }

    /// Number of entries in the result, failures included.
    pub async fn count(&mut self) -> Result<usize> {
        Ok(self.fetch().await?.len())
    }

    pub async fn exists(&mut self) -> Result<bool> {
        Ok(self.count().await? > 0)
    }

    /// Returns the single item matching this query and `q`.
    ///
    /// An empty `q` uses this query set as is, answering from the cache when
    /// it is filled.
    ///
    /// # Errors
    ///
    /// `DoesNotExist` or `MultipleObjectsReturned` unless exactly one entry
    /// matches, and `Remote` when that entry is a failure.
    pub async fn get(&mut self, q: Q) -> Result<Row> {
        if q.is_empty() {
            return exactly_one(self.fetch().await?);
        }
        let mut filtered = self.filter(q)?;
        exactly_one(filtered.fetch().await?)
    }

    /// Returns the entry at `index`; negative indices count from the end.
    ///
    /// Without an ordering, a non-negative index on an uncached query set
    /// fetches just that one item.
    pub async fn index(&mut self, index: isize) -> Result<Row> {
        if let Some(rows) = self.cached() {
            let i = resolve_index(index, rows.len())?;
            return rows[i].clone().map_err(QueryError::from);
        }
        if self.predicate.is_none() {
            return Err(QueryError::IndexOutOfRange { index });
        }
        if index >= 0 && self.ordering.is_empty() {
            let mut stream = self.stream(index as usize, Some(1), 1)?;
            return match stream.next().await {
                Some(entry) => entry.map_err(QueryError::from),
                None => Err(QueryError::IndexOutOfRange { index }),
            };
        }
        let rows = self.fetch().await?;
        let i = resolve_index(index, rows.len())?;
        rows[i].clone().map_err(QueryError::from)
    }

    /// Returns the entries selected by a slice.
    ///
    /// A forward slice of an unordered, uncached query set is sent to the
    /// store as an offset and item limit, and does not fill the cache. Any
    /// other slice fetches and caches the full result first.
    pub async fn slice(&mut self, slice: impl Into<Slice>) -> Result<Vec<Entry>> {
        let slice = slice.into();
        slice.validate()?;
        if let Some(rows) = self.cached() {
            return Ok(slice.apply(rows));
        }
        if self.predicate.is_none() {
            return Ok(Vec::new());
        }
        if slice.is_forward() && self.ordering.is_empty() {
            let start = slice.start.unwrap_or(0) as usize;
            let max_items = slice.stop.map(|stop| (stop as usize).saturating_sub(start));
            if max_items == Some(0) {
                return Ok(Vec::new());
            }
            let page_size = max_items.map_or(self.page_size, |max| max.min(self.page_size));
            let rows = self.stream(start, max_items, page_size)?.collect_all().await;
            return Ok(rows.into_iter().step_by(slice.step as usize).collect());
        }
        let rows = self.fetch().await?;
        Ok(slice.apply(rows))
    }

    /// Deletes every matching item, returning one outcome per item.
    ///
    /// Uses the cached items when available, otherwise runs an id-only pass.
    /// Entries that failed to load, including a failed page, keep their
    /// position in the outcomes as errors. The cache is cleared afterwards.
    pub async fn delete(&mut self) -> Result<Vec<std::result::Result<(), RemoteError>>> {
        let targets = match (&self.state, self.shape) {
            (State::Materialized(rows), ResultShape::Entities) => rows
                .iter()
                .filter_map(|row| match row {
                    Ok(row) => row.as_item().map(|item| Ok(item.id.clone())),
                    Err(err) => Some(Err(err.clone())),
                })
                .collect(),
            _ => self.fetch_ids().await?,
        };
        self.state = State::Unmaterialized;

        let ids: Vec<ItemId> = targets
            .iter()
            .filter_map(|target| target.as_ref().ok().cloned())
            .collect();
        let failed = targets.len() - ids.len();
        if failed > 0 {
            warn!(failed, "Skipping entries that failed to load");
        }
        let mut outcomes = if ids.is_empty() {
            Vec::new().into_iter()
        } else {
            debug!(count = ids.len(), "Deleting items");
            self.executor.delete_items(&ids).await.into_iter()
        };
        Ok(targets
            .into_iter()
            .map(|target| match target {
                Ok(id) => outcomes
                    .next()
                    .unwrap_or_else(|| Err(RemoteError::item_not_found(&id.id))),
                Err(err) => Err(err),
            })
            .collect())
    }

    async fn fetch_ids(&self) -> Result<Vec<std::result::Result<ItemId, RemoteError>>> {
        let Some(predicate) = &self.predicate else {
            return Ok(Vec::new());
        };
        let request = SearchRequest {
            folders: self.folders.clone(),
            restriction: compile(predicate, &self.catalog)?,
            shape: EntityShape::IdOnly,
            projection: None,
            order_hint: None,
            depth: self.depth,
            page_size: self.id_page_size,
            offset: 0,
            max_items: None,
        };
        let entries = PageCursor::new(Arc::clone(&self.executor), request)
            .drain()
            .await;
        Ok(entries
            .into_iter()
            .map(|entry| entry.map(|item| item.id))
            .collect())
    }
}

fn exactly_one(rows: &[Entry]) -> Result<Row> {
    match rows {
        [] => Err(QueryError::DoesNotExist),
        [row] => row.clone().map_err(QueryError::from),
        _ => Err(QueryError::MultipleObjectsReturned { count: rows.len() }),
    }
}

impl<E> fmt::Display for QuerySet<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuerySet(q=")?;
        match &self.predicate {
            Some(q) => write!(f, "{}", q)?,
            None => write!(f, "<none>")?,
        }
        let folders: Vec<&str> = self.folders.iter().map(|f| f.id.as_str()).collect();
        write!(f, ", folders=[{}]", folders.join(", "))?;
        if let State::Materialized(rows) = &self.state {
            write!(f, ", len={}", rows.len())?;
        }
        write!(f, ")")
    }
}

impl<E> fmt::Debug for QuerySet<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySet")
            .field("folders", &self.folders)
            .field("predicate", &self.predicate)
            .field("projection", &self.projection)
            .field("ordering", &self.ordering)
            .field("reversed", &self.reversed)
            .field("shape", &self.shape)
            .field("page_size", &self.page_size)
            .field("cached", &self.cached_len())
            .finish()
    }
}

impl<E> QuerySet<E> {
    fn cached_len(&self) -> Option<usize> {
        match &self.state {
            State::Materialized(rows) => Some(rows.len()),
            State::Unmaterialized => None,
        }
    }
}

#[cfg(test)]
mod tests;
