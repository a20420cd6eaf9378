//! Integration tests for query sets running against executors.
//!
//! Most tests use the in-memory executor, loaded from JSON fixtures. A few use
//! a scripted executor to check how the engine drives paging.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use itemstore_api_rs::prelude::*;
use itemstore_query_rs::error::QueryError;
use itemstore_query_rs::executor::{Page, SearchExecutor, SearchRequest};
use itemstore_query_rs::memory::MemoryExecutor;
use itemstore_query_rs::predicate::Q;
use itemstore_query_rs::queryset::{QuerySet, Row, Slice};

fn inbox<E: SearchExecutor>(executor: Arc<E>) -> QuerySet<E> {
    QuerySet::new(
        executor,
        Arc::new(FieldCatalog::standard()),
        [FolderId::distinguished("inbox")],
    )
}

fn kw(key: &str, value: impl Into<Value>) -> Q {
    Q::kw(key, value).unwrap()
}

fn greetings() -> Arc<MemoryExecutor> {
    let json = serde_json::json!([
        {
            "id": "msg-1",
            "changekey": "ck-1",
            "fields": {
                "subject": {"type": "text", "value": "Hi"},
                "size": {"type": "int", "value": 120},
                "categories": {"type": "list", "value": [
                    {"type": "text", "value": "greeting"},
                    {"type": "text", "value": "short"}
                ]},
                "datetime_received": {"type": "date_time", "value": "2024-05-01T09:00:00Z"}
            }
        },
        {
            "id": "msg-2",
            "changekey": "ck-2",
            "fields": {
                "subject": {"type": "text", "value": "Bye"},
                "size": {"type": "int", "value": 80},
                "categories": {"type": "list", "value": [
                    {"type": "text", "value": "farewell"}
                ]},
                "datetime_received": {"type": "date_time", "value": "2024-05-02T18:30:00Z"}
            }
        }
    ]);
    Arc::new(MemoryExecutor::from_json(&json.to_string()).unwrap())
}

fn numbered(n: usize) -> Arc<MemoryExecutor> {
    Arc::new(MemoryExecutor::new((0..n).map(|i| {
        Item::new(ItemId::new(format!("item-{}", i)))
            .with_field("subject", format!("Subject {}", i))
            .with_field("size", i as i64)
    })))
}

fn text(value: Option<&Value>) -> String {
    value.and_then(Value::as_str).unwrap_or_default().to_string()
}

fn subjects(entries: &[Result<Row, RemoteError>]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| match entry {
            Ok(Row::Item(item)) => text(item.get("subject")),
            Ok(Row::Flat(value)) => text(Some(value)),
            Ok(other) => format!("{:?}", other),
            Err(error) => format!("error: {}", error.code().unwrap_or("-")),
        })
        .collect()
}

/// Test: Filtering, counting and fetching a single item
#[tokio::test]
async fn test_filter_count_get_exists() {
    let qs = inbox(greetings());

    let mut hi = qs.filter(kw("subject", "Hi")).unwrap();
    assert_eq!(hi.count().await.unwrap(), 1);
    assert!(hi.exists().await.unwrap());

    let mut all = qs.all();
    let row = all.get(kw("subject", "Bye")).await.unwrap();
    let item = row.into_item().unwrap();
    assert_eq!(item.id, ItemId::with_changekey("msg-2", "ck-2"));

    let mut neither = qs
        .filter(kw("subject", "Hi"))
        .unwrap()
        .filter(kw("subject", "Bye"))
        .unwrap();
    assert!(!neither.exists().await.unwrap());
}

/// Test: Filtering with a negated predicate, then counting, getting and excluding
#[tokio::test]
async fn test_hi_not_bye_scenario() {
    let executor = Arc::new(MemoryExecutor::new(["Hi", "Bye", "Bye"].iter().enumerate().map(
        |(i, subject)| Item::new(ItemId::new(i.to_string())).with_field("subject", *subject),
    )));
    let mut qs = inbox(Arc::clone(&executor))
        .filter(kw("subject", "Hi") & !kw("subject", "Bye"))
        .unwrap();

    assert_eq!(qs.fetch().await.unwrap().len(), 1);
    assert_eq!(qs.count().await.unwrap(), 1);
    let item = qs.get(Q::all()).await.unwrap().into_item().unwrap();
    assert_eq!(item.id.id, "0");
    assert!(!qs.exclude(kw("subject", "Hi")).unwrap().exists().await.unwrap());
    assert_eq!(executor.requests().len(), 2);
}

/// Test: A flat id projection yields bare ids
#[tokio::test]
async fn test_flat_ids() {
    let mut ids = inbox(numbered(3)).values_list(&["item_id"], true).unwrap();
    let rows: Vec<Row> = ids
        .fetch()
        .await
        .unwrap()
        .iter()
        .map(|e| e.clone().unwrap())
        .collect();
    assert_eq!(
        rows,
        vec![
            Row::Flat(Value::from("item-0")),
            Row::Flat(Value::from("item-1")),
            Row::Flat(Value::from("item-2")),
        ]
    );
}

/// Test: Combining predicates with OR and NOT
#[tokio::test]
async fn test_boolean_combinations() {
    let qs = inbox(greetings());

    let mut either = qs.filter(kw("subject", "Hi") | kw("subject", "Bye")).unwrap();
    assert_eq!(either.count().await.unwrap(), 2);

    let mut not_hi = qs.exclude(kw("subject", "Hi")).unwrap();
    assert_eq!(subjects(not_hi.fetch().await.unwrap()), vec!["Bye"]);

    let mut small_or_greeting = qs
        .filter(kw("size__lt", 100) | kw("categories__contains", "greeting"))
        .unwrap();
    assert_eq!(small_or_greeting.count().await.unwrap(), 2);
}

/// Test: The identity predicate behaves like no filter at all
#[tokio::test]
async fn test_identity_predicate() {
    let qs = inbox(greetings());
    let mut unfiltered = qs.all();
    let mut identity = qs.filter(Q::all()).unwrap();
    let mut negated_identity = qs.filter(!Q::all()).unwrap();

    let expected = unfiltered.fetch().await.unwrap().to_vec();
    assert_eq!(identity.fetch().await.unwrap(), expected.as_slice());
    assert_eq!(negated_identity.fetch().await.unwrap(), expected.as_slice());
}

/// Test: List-field membership lookups
#[tokio::test]
async fn test_list_field_membership() {
    let qs = inbox(greetings());

    let mut both = qs
        .filter(kw("categories__contains", vec!["greeting", "short"]))
        .unwrap();
    assert_eq!(both.count().await.unwrap(), 1);

    let mut any = qs
        .filter(kw("categories__in", vec!["short", "farewell"]))
        .unwrap();
    assert_eq!(any.count().await.unwrap(), 2);

    let err = qs.filter(kw("categories__gt", "a")).unwrap_err();
    assert!(matches!(err, QueryError::UnsupportedLookup { .. }));
}

/// Test: Zone-aware timestamps are compared by instant
#[tokio::test]
async fn test_datetime_filter_with_time_zone() {
    use chrono::TimeZone;

    let qs = inbox(greetings());
    let cutoff = chrono_tz::America::New_York
        .with_ymd_and_hms(2024, 5, 2, 10, 0, 0)
        .unwrap()
        .fixed_offset();
    let mut later = qs.filter(kw("datetime_received__gt", cutoff)).unwrap();
    assert_eq!(subjects(later.fetch().await.unwrap()), vec!["Bye"]);

    let naive = chrono::NaiveDate::from_ymd_opt(2024, 5, 2)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap();
    let err = qs.filter(kw("datetime_received__gt", naive)).unwrap_err();
    assert!(matches!(err, QueryError::InvalidLiteral { .. }));
}

/// Test: values_list with flat returns bare values
#[tokio::test]
async fn test_values_list_flat() {
    let qs = inbox(greetings());
    let mut flat = qs
        .order_by(&["subject"])
        .unwrap()
        .values_list(&["subject"], true)
        .unwrap();
    let rows: Vec<Row> = flat
        .fetch()
        .await
        .unwrap()
        .iter()
        .map(|e| e.clone().unwrap())
        .collect();
    assert_eq!(
        rows,
        vec![Row::Flat(Value::from("Bye")), Row::Flat(Value::from("Hi"))]
    );

    let err = qs.values_list(&["subject", "size"], true).unwrap_err();
    assert!(matches!(err, QueryError::InvalidSliceArguments { .. }));
}

/// Test: values returns field to value rows with nulls for missing fields
#[tokio::test]
async fn test_values_rows() {
    let qs = inbox(greetings());
    let mut rows = qs
        .filter(kw("subject", "Hi"))
        .unwrap()
        .values(&["subject", "body", "item_id"])
        .unwrap();
    let row = rows.get(Q::all()).await.unwrap();
    assert_eq!(row.get("subject"), Some(&Value::from("Hi")));
    assert_eq!(row.get("body"), Some(&Value::Null));
    assert_eq!(row.get("item_id"), Some(&Value::from("msg-1")));
}

/// Test: A forward slice becomes one bounded request
#[tokio::test]
async fn test_slice_translates_to_offset_and_limit() {
    let executor = numbered(50);
    let mut qs = inbox(Arc::clone(&executor));

    let rows = qs.slice(10..20).await.unwrap();
    assert_eq!(rows.len(), 10);
    assert_eq!(subjects(&rows)[0], "Subject 10");

    let requests = executor.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].offset, 10);
    assert_eq!(requests[0].max_items, Some(10));
    assert!(!qs.is_cached());
}

/// Test: Ordering forces a full fetch and sorts client-side
#[tokio::test]
async fn test_order_by_fetches_everything() {
    let executor = numbered(25);
    let mut qs = inbox(Arc::clone(&executor))
        .page_size(10)
        .unwrap()
        .order_by(&["-size"])
        .unwrap();

    let rows = qs.slice(0..3).await.unwrap();
    assert_eq!(subjects(&rows), vec!["Subject 24", "Subject 23", "Subject 22"]);

    let offsets: Vec<usize> = executor.requests().iter().map(|r| r.offset).collect();
    assert_eq!(offsets, vec![0, 10, 20]);
    assert!(executor.requests().iter().all(|r| r.max_items.is_none()));

    let mut reversed = qs.reverse().unwrap();
    assert_eq!(
        subjects(&reversed.slice(..2).await.unwrap()),
        vec!["Subject 0", "Subject 1"]
    );
}

/// Test: reverse without ordering is rejected
#[test]
fn test_reverse_without_ordering() {
    let qs = inbox(greetings());
    let err = qs.reverse().unwrap_err();
    assert!(matches!(err, QueryError::InvalidSliceArguments { .. }));
}

/// Test: Failed items stay in the result at their position
#[tokio::test]
async fn test_item_errors_are_inline() {
    let executor = Arc::new(
        MemoryExecutor::new((0..3).map(|i| {
            Item::new(ItemId::new(i.to_string())).with_field("subject", format!("s{}", i))
        }))
        .with_item_error(1, RemoteError::item("ErrorItemCorrupt", "cannot read item")),
    );
    let mut qs = inbox(executor);
    let rows = qs.fetch().await.unwrap();
    assert_eq!(
        subjects(rows),
        vec!["s0", "error: ErrorItemCorrupt", "s1", "s2"]
    );

    let err = qs.index(1).await.unwrap_err();
    assert!(matches!(err, QueryError::Remote(RemoteError::Item { .. })));
}

/// Test: Deleting matching items
#[tokio::test]
async fn test_delete() {
    let executor = numbered(5);
    let mut big = inbox(Arc::clone(&executor))
        .filter(kw("size__gte", 3))
        .unwrap();
    let outcomes = big.delete().await.unwrap();
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(Result::is_ok));
    assert_eq!(executor.len(), 3);
    assert_eq!(big.count().await.unwrap(), 0);
}

/// Test: none() never reaches the store
#[tokio::test]
async fn test_none() {
    let executor = greetings();
    let mut none = inbox(Arc::clone(&executor)).none();
    assert_eq!(none.count().await.unwrap(), 0);
    assert!(none.slice(Slice::from(..)).await.unwrap().is_empty());
    assert!(executor.requests().is_empty());
}

/// A store that serves fixed-size pages, ignoring `max_items`, and fails
/// after a number of pages.
struct ScriptedExecutor {
    total: usize,
    page_size: usize,
    fail_after: Option<u32>,
    calls: AtomicU32,
    seen: Mutex<Vec<(usize, Option<usize>)>>,
}

impl ScriptedExecutor {
    fn new(total: usize, page_size: usize) -> Self {
        Self {
            total,
            page_size,
            fail_after: None,
            calls: AtomicU32::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl SearchExecutor for ScriptedExecutor {
    async fn find_items(&self, request: &SearchRequest) -> Result<Page, RemoteError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap()
            .push((request.offset, request.max_items));
        if self.fail_after.is_some_and(|n| call >= n) {
            return Err(RemoteError::Server {
                code: "ErrorServerBusy".to_string(),
                message: "try again later".to_string(),
            });
        }
        let end = (request.offset + self.page_size).min(self.total);
        let items = (request.offset..end)
            .map(|i| Ok(Item::new(ItemId::new(i.to_string())).with_field("subject", format!("#{}", i))))
            .collect();
        Ok(Page {
            items,
            next_offset: (end < self.total).then_some(end),
        })
    }

    async fn delete_items(&self, ids: &[ItemId]) -> Vec<Result<(), RemoteError>> {
        ids.iter().map(|_| Ok(())).collect()
    }
}

/// Test: The engine stops at max_items even when the store returns more
#[tokio::test]
async fn test_paging_respects_limit_when_store_ignores_it() {
    let executor = Arc::new(ScriptedExecutor::new(100, 8));
    let mut qs = inbox(Arc::clone(&executor));

    let rows = qs.slice(5..15).await.unwrap();
    assert_eq!(rows.len(), 10);
    assert_eq!(subjects(&rows).first().map(String::as_str), Some("#5"));
    assert_eq!(
        *executor.seen.lock().unwrap(),
        vec![(5, Some(10)), (13, Some(2))]
    );
}

/// Test: A failed page ends the pass with an inline error
#[tokio::test]
async fn test_page_failure_is_inline() {
    let executor = Arc::new(ScriptedExecutor {
        fail_after: Some(1),
        ..ScriptedExecutor::new(20, 8)
    });
    let mut qs = inbox(Arc::clone(&executor));

    let rows = qs.fetch().await.unwrap();
    assert_eq!(rows.len(), 9);
    assert_eq!(
        rows.last().and_then(|r| r.as_ref().err()).and_then(|e| e.code()),
        Some("ErrorServerBusy")
    );
    assert_eq!(executor.calls.load(Ordering::SeqCst), 2);
}

/// Test: Streaming stops fetching when the consumer stops
#[tokio::test]
async fn test_iterator_is_lazy() {
    let executor = Arc::new(ScriptedExecutor::new(100, 10));
    let qs = inbox(Arc::clone(&executor));

    let mut stream = qs.iterator().unwrap();
    for _ in 0..15 {
        assert!(stream.next().await.unwrap().is_ok());
    }
    assert_eq!(executor.calls.load(Ordering::SeqCst), 2);
}
