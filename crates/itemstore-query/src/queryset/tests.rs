//! Tests for query set chaining, planning and execution.

use super::*;
use itemstore_api_rs::models::{Item, Value};

use crate::memory::MemoryExecutor;

fn messages() -> Vec<Item> {
    (0..6)
        .map(|i| {
            Item::new(ItemId::new(i.to_string()))
                .with_field("subject", format!("message {}", i))
                .with_field("size", (i % 3) as i64)
                .with_field("body", "text")
        })
        .collect()
}

fn query_set(items: Vec<Item>) -> (Arc<MemoryExecutor>, QuerySet<MemoryExecutor>) {
    let executor = Arc::new(MemoryExecutor::new(items));
    let qs = QuerySet::new(
        Arc::clone(&executor),
        Arc::new(FieldCatalog::standard()),
        [FolderId::distinguished("inbox")],
    );
    (executor, qs)
}

fn kw(key: &str, value: impl Into<Value>) -> Q {
    Q::kw(key, value).unwrap()
}

fn ids(entries: &[Entry]) -> Vec<String> {
    entries
        .iter()
        .map(|e| match e {
            Ok(Row::Item(item)) => item.id.id.clone(),
            Ok(_) => "?".to_string(),
            Err(_) => "!".to_string(),
        })
        .collect()
}

// ==================== Chaining Tests ====================

#[test]
fn test_chaining_leaves_receiver_unchanged() {
    let (_, qs) = query_set(messages());
    let filtered = qs.filter(kw("size", 1)).unwrap();
    assert!(qs.predicate().unwrap().is_empty());
    assert!(!filtered.predicate().unwrap().is_empty());

    let ordered = filtered.order_by(&["-size"]).unwrap();
    assert!(filtered.ordering().is_empty());
    assert_eq!(ordered.ordering()[0].to_string(), "-size");
}

#[test]
fn test_filter_errors_are_raised_immediately() {
    let (executor, qs) = query_set(messages());
    assert!(matches!(
        qs.filter(kw("subjet", "x")).unwrap_err(),
        QueryError::UnknownField { .. }
    ));
    assert!(matches!(
        qs.exclude(kw("size__icontains", 1)).unwrap_err(),
        QueryError::UnsupportedLookup { .. }
    ));
    assert!(executor.requests().is_empty());
}

#[test]
fn test_exclude_negates() {
    let (_, qs) = query_set(messages());
    let excluded = qs.exclude(kw("size", 1)).unwrap();
    let expected = qs.filter(kw("size__not", 1)).unwrap();
    assert_eq!(excluded.restriction().unwrap(), expected.restriction().unwrap());
}

#[test]
fn test_identity_filter_sends_no_restriction() {
    let (_, qs) = query_set(messages());
    assert_eq!(qs.filter(Q::all()).unwrap().restriction().unwrap(), None);
}

#[test]
fn test_reverse_requires_ordering() {
    let (_, qs) = query_set(messages());
    assert!(matches!(
        qs.reverse().unwrap_err(),
        QueryError::InvalidSliceArguments { .. }
    ));
    let reversed = qs.order_by(&["size", "-subject"]).unwrap().reverse().unwrap();
    let keys: Vec<String> = reversed.ordering().iter().map(|o| o.to_string()).collect();
    assert_eq!(keys, vec!["-size", "subject"]);
    assert_eq!(reversed.reverse().unwrap().ordering()[0].to_string(), "size");
}

#[test]
fn test_projection_arguments_validated() {
    let (_, qs) = query_set(messages());
    assert_eq!(
        qs.values_list(&["subject", "size"], true).unwrap_err().to_string(),
        "flat=true requires exactly one field, got 2"
    );
    assert_eq!(
        qs.values(&[]).unwrap_err().to_string(),
        "values() requires at least one field"
    );
    assert!(matches!(
        qs.only(&["nope"]).unwrap_err(),
        QueryError::UnknownField { .. }
    ));
    assert!(matches!(
        qs.only(&["subject__Home"]).unwrap_err(),
        QueryError::AmbiguousFieldPath { .. }
    ));
    assert!(qs.page_size(0).is_err());
}

#[test]
fn test_display() {
    let (_, qs) = query_set(messages());
    assert_eq!(qs.to_string(), "QuerySet(q=Q(), folders=[inbox])");
    assert_eq!(qs.none().to_string(), "QuerySet(q=<none>, folders=[inbox])");
}

// ==================== Planning Tests ====================

#[tokio::test]
async fn test_full_fetch_request() {
    let (executor, mut qs) = query_set(messages());
    qs.fetch().await.unwrap();
    let requests = executor.requests();
    let request = &requests[0];
    assert_eq!(request.shape, EntityShape::AllProperties);
    assert_eq!(request.projection, None);
    assert_eq!(request.page_size, 100);
    assert_eq!(request.folders, vec![FolderId::distinguished("inbox")]);
}

#[tokio::test]
async fn test_projection_excludes_attributes_and_adds_sort_fields() {
    let (executor, qs) = query_set(messages());
    let mut qs = qs
        .only(&["item_id", "subject"])
        .unwrap()
        .order_by(&["-size"])
        .unwrap();
    let rows = qs.fetch().await.unwrap().to_vec();
    let requests = executor.requests();
    let request = &requests[0];
    assert_eq!(request.shape, EntityShape::IdOnly);
    assert_eq!(
        request.projection,
        Some(vec![FieldPath::new("subject"), FieldPath::new("size")])
    );
    assert_eq!(request.order_hint, Some(vec![FieldPath::new("size")]));

    let first = rows[0].as_ref().unwrap().as_item().unwrap();
    assert!(first.get("size").is_none());
    assert!(first.get("subject").is_some());
    assert!(first.get("body").is_none());
    assert_eq!(ids(&rows), vec!["2", "5", "1", "4", "0", "3"]);
}

#[tokio::test]
async fn test_attribute_only_projection_requests_no_fields() {
    let (executor, qs) = query_set(messages());
    let mut qs = qs.values_list(&["item_id"], true).unwrap();
    let rows = qs.fetch().await.unwrap().to_vec();
    assert_eq!(executor.requests()[0].projection, None);
    assert_eq!(rows[0], Ok(Row::Flat(Value::from("0"))));
}

#[tokio::test]
async fn test_values_rows() {
    let (_, qs) = query_set(messages());
    let mut qs = qs
        .filter(kw("size", 2))
        .unwrap()
        .values(&["subject", "size"])
        .unwrap();
    let rows = qs.fetch().await.unwrap().to_vec();
    assert_eq!(rows.len(), 2);
    let row = rows[0].as_ref().unwrap();
    assert_eq!(row.get("subject"), Some(&Value::from("message 2")));
    assert_eq!(row.get("size"), Some(&Value::Int(2)));
}

// ==================== Cache Tests ====================

#[tokio::test]
async fn test_cache_is_reused() {
    let (executor, qs) = query_set(messages());
    let mut qs = qs.page_size(4).unwrap();
    assert_eq!(qs.count().await.unwrap(), 6);
    assert_eq!(executor.requests().len(), 2);
    assert!(qs.is_cached());

    assert!(qs.exists().await.unwrap());
    assert_eq!(qs.slice(1..3).await.unwrap().len(), 2);
    assert_eq!(qs.index(-1).await.unwrap().as_item().unwrap().id.id, "5");
    qs.get(Q::all()).await.unwrap_err();
    assert_eq!(executor.requests().len(), 2);
    assert!(qs.to_string().ends_with(", len=6)"));
}

#[tokio::test]
async fn test_chained_copy_is_uncached() {
    let (executor, mut qs) = query_set(messages());
    qs.fetch().await.unwrap();
    let mut copy = qs.all();
    assert!(!copy.is_cached());
    copy.fetch().await.unwrap();
    assert_eq!(executor.requests().len(), 2);
}

#[tokio::test]
async fn test_iterator_bypasses_cache() {
    let (executor, qs) = query_set(messages());
    let mut stream = qs.iterator().unwrap();
    assert!(stream.next().await.is_some());
    drop(stream);
    assert!(!qs.is_cached());

    let rows = qs.iterator().unwrap().collect_all().await;
    assert_eq!(rows.len(), 6);
    assert_eq!(executor.requests().len(), 2);
    assert!(!qs.is_cached());
}

// ==================== Slicing Tests ====================

#[tokio::test]
async fn test_forward_slice_is_bounded_request() {
    let (executor, mut qs) = query_set(messages());
    let rows = qs.slice(Slice::from(1..5).step(2)).await.unwrap();
    assert_eq!(ids(&rows), vec!["1", "3"]);
    let requests = executor.requests();
    let request = &requests[0];
    assert_eq!(request.offset, 1);
    assert_eq!(request.max_items, Some(4));
    assert_eq!(request.page_size, 4);
    assert!(!qs.is_cached());
}

#[tokio::test]
async fn test_empty_slice_makes_no_request() {
    let (executor, mut qs) = query_set(messages());
    assert!(qs.slice(3..3).await.unwrap().is_empty());
    assert!(executor.requests().is_empty());
}

#[tokio::test]
async fn test_negative_slice_materializes() {
    let (executor, mut qs) = query_set(messages());
    let rows = qs.slice(Slice::new(Some(-2), None, 1)).await.unwrap();
    assert_eq!(ids(&rows), vec!["4", "5"]);
    assert_eq!(executor.requests()[0].max_items, None);
    assert!(qs.is_cached());
}

#[tokio::test]
async fn test_ordered_slice_materializes() {
    let (executor, qs) = query_set(messages());
    let mut qs = qs.order_by(&["size"]).unwrap();
    let rows = qs.slice(0..2).await.unwrap();
    assert_eq!(ids(&rows), vec!["0", "3"]);
    assert_eq!(executor.requests()[0].offset, 0);
    assert_eq!(executor.requests()[0].max_items, None);
}

#[tokio::test]
async fn test_zero_step_rejected() {
    let (_, mut qs) = query_set(messages());
    assert!(matches!(
        qs.slice(Slice::from(..).step(0)).await.unwrap_err(),
        QueryError::InvalidSliceArguments { .. }
    ));
}

#[tokio::test]
async fn test_index_fetches_one_item() {
    let (executor, mut qs) = query_set(messages());
    let row = qs.index(4).await.unwrap();
    assert_eq!(row.as_item().unwrap().id.id, "4");
    let requests = executor.requests();
    let request = &requests[0];
    assert_eq!((request.offset, request.max_items), (4, Some(1)));

    assert_eq!(
        qs.index(6).await.unwrap_err(),
        QueryError::IndexOutOfRange { index: 6 }
    );
    assert_eq!(
        qs.index(-7).await.unwrap_err(),
        QueryError::IndexOutOfRange { index: -7 }
    );
}

// ==================== Terminal Tests ====================

#[tokio::test]
async fn test_get() {
    let (_, mut qs) = query_set(messages());
    let row = qs.get(kw("subject", "message 3")).await.unwrap();
    assert_eq!(row.as_item().unwrap().id.id, "3");
    assert_eq!(
        qs.get(kw("subject", "nothing")).await.unwrap_err(),
        QueryError::DoesNotExist
    );
    assert_eq!(
        qs.get(kw("size", 0)).await.unwrap_err(),
        QueryError::MultipleObjectsReturned { count: 2 }
    );
    assert!(!qs.is_cached());
}

#[tokio::test]
async fn test_get_failed_item_is_remote_error() {
    let executor = Arc::new(
        MemoryExecutor::new(Vec::new())
            .with_item_error(0, RemoteError::item("ErrorItemCorrupt", "corrupt")),
    );
    let mut qs = QuerySet::new(executor, Arc::new(FieldCatalog::standard()), Vec::new());
    assert!(matches!(
        qs.get(Q::all()).await.unwrap_err(),
        QueryError::Remote(_)
    ));
}

#[tokio::test]
async fn test_none_never_calls_store() {
    let (executor, qs) = query_set(messages());
    let mut none = qs.none().filter(kw("size", 1)).unwrap();
    assert!(none.predicate().is_none());
    assert_eq!(none.count().await.unwrap(), 0);
    assert!(!none.exists().await.unwrap());
    assert!(none.slice(..).await.unwrap().is_empty());
    assert!(none.iterator().unwrap().collect_all().await.is_empty());
    assert_eq!(
        none.get(Q::all()).await.unwrap_err(),
        QueryError::DoesNotExist
    );
    assert!(none.none().delete().await.unwrap().is_empty());
    assert!(executor.requests().is_empty());
}

#[tokio::test]
async fn test_delete_uses_id_only_pass() {
    let (executor, qs) = query_set(messages());
    let mut qs = qs.filter(kw("size", 1)).unwrap();
    let outcomes = qs.delete().await.unwrap();
    assert_eq!(outcomes, vec![Ok(()), Ok(())]);
    let requests = executor.requests();
    let request = &requests[0];
    assert_eq!(request.shape, EntityShape::IdOnly);
    assert_eq!(request.page_size, 1000);
    assert_eq!(
        executor.deletes(),
        vec![vec![ItemId::new("1"), ItemId::new("4")]]
    );
    assert_eq!(executor.len(), 4);
    assert!(!qs.is_cached());
}

#[tokio::test]
async fn test_delete_uses_cache() {
    let (executor, qs) = query_set(messages());
    let mut qs = qs.filter(kw("size", 2)).unwrap();
    qs.fetch().await.unwrap();
    qs.delete().await.unwrap();
    assert_eq!(executor.requests().len(), 1);
    assert_eq!(executor.deletes()[0].len(), 2);
    assert!(!qs.is_cached());
    assert_eq!(qs.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_delete_keeps_cached_failures_in_position() {
    let corrupt = RemoteError::item("ErrorItemCorrupt", "cannot read item");
    let executor = Arc::new(MemoryExecutor::new(messages()).with_item_error(2, corrupt.clone()));
    let mut qs = QuerySet::new(
        Arc::clone(&executor),
        Arc::new(FieldCatalog::standard()),
        [FolderId::distinguished("inbox")],
    );
    assert_eq!(qs.count().await.unwrap(), 7);

    let outcomes = qs.delete().await.unwrap();
    assert_eq!(outcomes.len(), 7);
    assert_eq!(outcomes[2], Err(corrupt));
    assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 6);
    assert_eq!(executor.deletes()[0].len(), 6);
    assert_eq!(executor.item_ids(), Vec::<ItemId>::new());
}

#[tokio::test]
async fn test_delete_reports_failed_id_page() {
    let reset = RemoteError::Network {
        message: "connection reset".to_string(),
    };
    let executor = Arc::new(MemoryExecutor::new(messages()).with_page_failure(2, reset.clone()));
    let config = QueryConfig {
        count_page_size: 2,
        ..QueryConfig::default()
    };
    let mut qs = QuerySet::new(
        Arc::clone(&executor),
        Arc::new(FieldCatalog::standard()),
        [FolderId::distinguished("inbox")],
    )
    .with_config(&config);

    let outcomes = qs.delete().await.unwrap();
    assert_eq!(outcomes, vec![Ok(()), Ok(()), Err(reset)]);
    assert_eq!(executor.deletes(), vec![vec![ItemId::new("0"), ItemId::new("1")]]);
    assert_eq!(executor.len(), 4);
}

#[tokio::test]
async fn test_config_applied() {
    let (executor, qs) = query_set(messages());
    let config = QueryConfig {
        page_size: 5,
        depth: TraversalDepth::Deep,
        ..QueryConfig::default()
    };
    let mut qs = qs.with_config(&config);
    qs.fetch().await.unwrap();
    let requests = executor.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].page_size, 5);
    assert_eq!(requests[0].depth, TraversalDepth::Deep);
}
