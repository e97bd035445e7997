//! Integration tests for `CacheService` across consistency modes.

mod support;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use cachefront_common::time::SystemClock;
use cachefront_core::{CacheService, PersistenceService};
use cachefront_domain::constants::LOCK_CACHE_NAME;
use cachefront_domain::{BackendError, CacheSettings, ConsistencyMode, LockOwner, QueueSettings, SearchQuery};
use serde_json::json;
use serde::{Deserialize, Serialize};
use support::{Account, MemoryProvider, MemoryStore, RecordingQueue};

/// Narrow view over account rows; serde drops every other field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct OwnerView {
    owner: String,
}

cachefront_domain::impl_cacheable!(OwnerView);

struct Fixture {
    service: CacheService,
    provider: Arc<MemoryProvider>,
    store: Arc<MemoryStore>,
    queue: Arc<RecordingQueue>,
}

fn fixture(mode: ConsistencyMode) -> Fixture {
    let provider = Arc::new(MemoryProvider::default());
    let store = Arc::new(MemoryStore::default());
    let queue = Arc::new(RecordingQueue::default());

    let mut settings = CacheSettings::new("accounts", mode);
    if mode == ConsistencyMode::WriteBehind {
        settings = settings.with_queue(QueueSettings::default());
    }

    let service = CacheService::new(
        &settings,
        provider.clone(),
        Some(store.clone()),
        Some(queue.clone()),
        Arc::new(SystemClock),
    )
    .unwrap();

    Fixture { service, provider, store, queue }
}

/// Validates the create-then-read path without a store.
///
/// Assertions:
/// - Put-if-absent on a missing key returns `None`.
/// - The value reads back with an etag assigned on create.
/// - A second put-if-absent returns the existing value and writes nothing.
#[tokio::test]
async fn test_put_if_absent_then_get() {
    let fx = fixture(ConsistencyMode::NonPersistent);

    let prior = fx.service.get_and_put_if_absent("k1", Account::new("ada", 10)).await.unwrap();
    assert!(prior.is_none());

    let stored: Account = fx.service.get("k1").await.unwrap().unwrap();
    assert_eq!(stored.balance, 10);
    assert!(stored.etag.is_some());

    let existing = fx.service.get_and_put_if_absent("k1", Account::new("bob", 99)).await.unwrap();
    assert_eq!(existing.as_ref(), Some(&stored));
    assert_eq!(fx.service.get::<Account>("k1").await.unwrap(), Some(stored));
    assert_eq!(fx.store.write_count(), 0);
}

#[tokio::test]
async fn test_plain_values_round_trip_without_etag() {
    let fx = fixture(ConsistencyMode::NonPersistent);

    fx.service.get_and_put("greeting", "hello".to_string()).await.unwrap();
    let prior = fx.service.get_and_put("greeting", "hi".to_string()).await.unwrap();

    assert_eq!(prior.as_deref(), Some("hello"));
    assert_eq!(fx.service.get::<String>("greeting").await.unwrap().as_deref(), Some("hi"));
}

/// Validates optimistic concurrency on replace.
///
/// Assertions:
/// - A stale etag raises a concurrency error, not an I/O error.
/// - The stored value and etag are unchanged after the rejection.
/// - A current etag replaces, returns the prior value, and stamps a new etag.
#[tokio::test]
async fn test_replace_checks_etag() {
    let fx = fixture(ConsistencyMode::WriteThrough);
    fx.service.get_and_put_if_absent("k1", Account::new("ada", 10)).await.unwrap();
    let a: Account = fx.service.get("k1").await.unwrap().unwrap();

    let stale = Account { balance: 20, etag: Some("stale".into()), ..a.clone() };
    let err = fx.service.get_and_replace("k1", stale).await.unwrap_err();
    assert!(err.is_concurrency());
    assert!(err.backend_source().is_none());
    assert_eq!(fx.service.get::<Account>("k1").await.unwrap().as_ref(), Some(&a));
    assert_eq!(fx.store.write_count(), 1);

    let fresh = Account { balance: 30, ..a.clone() };
    let prior = fx.service.get_and_replace("k1", fresh).await.unwrap();
    assert_eq!(prior.as_ref(), Some(&a));

    let b: Account = fx.service.get("k1").await.unwrap().unwrap();
    assert_eq!(b.balance, 30);
    assert_ne!(b.etag, a.etag);
    assert_eq!(fx.store.row("k1").unwrap()["balance"], json!(30));
}

#[tokio::test]
async fn test_replace_absent_key_is_noop() {
    let fx = fixture(ConsistencyMode::WriteThrough);

    let prior = fx.service.get_and_replace("missing", Account::new("ada", 1)).await.unwrap();

    assert!(prior.is_none());
    assert!(fx.provider.snapshot("missing").is_none());
    assert_eq!(fx.store.write_count(), 0);
}

/// Validates remove in write-through mode.
///
/// Assertions:
/// - Remove returns the last stored value.
/// - Both the provider and the store forget the key.
/// - Removing again returns `None`.
#[tokio::test]
async fn test_remove_then_get() {
    let fx = fixture(ConsistencyMode::WriteThrough);
    fx.service.get_and_put_if_absent("k1", Account::new("ada", 10)).await.unwrap();

    let removed: Account = fx.service.remove("k1").await.unwrap().unwrap();
    assert_eq!(removed.balance, 10);

    assert!(fx.service.get::<Account>("k1").await.unwrap().is_none());
    assert!(fx.store.row("k1").is_none());
    assert!(fx.service.remove::<Account>("k1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_get_backfills_from_store() {
    let fx = fixture(ConsistencyMode::WriteThrough);
    fx.store.seed("k9", json!({ "owner": "eve", "balance": 5, "etag": "v1" }));

    let loaded: Account = fx.service.get("k9").await.unwrap().unwrap();

    assert_eq!(loaded.etag.as_deref(), Some("v1"));
    assert_eq!(fx.provider.snapshot("k9"), fx.store.row("k9"));
}

#[tokio::test]
async fn test_non_persistent_get_ignores_store() {
    let fx = fixture(ConsistencyMode::NonPersistent);
    fx.store.seed("k9", json!("from store"));

    assert!(fx.service.get::<String>("k9").await.unwrap().is_none());
}

/// Validates rollback when the synchronous store write fails.
///
/// Assertions:
/// - A failed create surfaces as an I/O error carrying the backend cause.
/// - The provider no longer holds the key afterwards.
/// - A failed update restores the prior cached value.
/// - A failed remove puts the removed value back.
#[tokio::test]
async fn test_write_through_failure_rolls_back_provider() {
    let fx = fixture(ConsistencyMode::WriteThrough);
    fx.store.fail_writes.store(true, Ordering::SeqCst);

    let err = fx.service.get_and_put_if_absent("k1", Account::new("ada", 10)).await.unwrap_err();
    assert!(matches!(err.backend_source(), Some(BackendError::Database(_))));
    assert!(fx.provider.snapshot("k1").is_none());

    fx.store.fail_writes.store(false, Ordering::SeqCst);
    fx.service.get_and_put_if_absent("k1", Account::new("ada", 10)).await.unwrap();
    let before = fx.provider.snapshot("k1").unwrap();

    fx.store.fail_writes.store(true, Ordering::SeqCst);
    let current: Account = fx.service.get("k1").await.unwrap().unwrap();
    let update = Account { balance: 11, ..current };
    fx.service.get_and_replace("k1", update).await.unwrap_err();
    assert_eq!(fx.provider.snapshot("k1"), Some(before.clone()));

    fx.service.remove::<Account>("k1").await.unwrap_err();
    assert_eq!(fx.provider.snapshot("k1"), Some(before));
}

#[tokio::test]
async fn test_provider_failure_is_io_error() {
    let fx = fixture(ConsistencyMode::NonPersistent);
    fx.provider.fail_puts.store(true, Ordering::SeqCst);

    let err = fx.service.get_and_put_if_absent("k1", 1_i64).await.unwrap_err();

    assert!(matches!(err.backend_source(), Some(BackendError::Unavailable(_))));
    assert!(fx.provider.snapshot("k1").is_none());
}

/// Validates write-behind enqueueing.
///
/// Assertions:
/// - Writes land in the provider immediately but not in the store.
/// - Each mutation enqueues its key.
/// - A failed enqueue rolls the provider back.
#[tokio::test]
async fn test_write_behind_enqueues_keys() {
    let fx = fixture(ConsistencyMode::WriteBehind);

    fx.service.get_and_put_if_absent("k1", Account::new("ada", 10)).await.unwrap();
    fx.service.remove::<Account>("k1").await.unwrap();
    fx.service.get_and_put_if_absent("k2", Account::new("bob", 3)).await.unwrap();

    assert_eq!(fx.queue.pending(), vec!["k1", "k1", "k2"]);
    assert_eq!(fx.store.write_count(), 0);
    assert!(fx.provider.snapshot("k2").is_some());

    fx.queue.fail_enqueue.store(true, Ordering::SeqCst);
    let err = fx.service.get_and_put_if_absent("k3", Account::new("cy", 1)).await.unwrap_err();
    assert!(matches!(err.backend_source(), Some(BackendError::Queue(_))));
    assert!(fx.provider.snapshot("k3").is_none());
}

/// Validates paged search resolved through the cache.
///
/// Assertions:
/// - Non-persistent caches reject search as not supported.
/// - Items follow the store's id order and fill the provider.
/// - Page metadata and totals are echoed.
#[tokio::test]
async fn test_search_by_query() {
    let volatile = fixture(ConsistencyMode::NonPersistent);
    let err = volatile.service.search_by_query::<Account>(&SearchQuery::all(), 1, 10, false).await.unwrap_err();
    assert!(matches!(err, cachefront_domain::CacheError::NotSupported(_)));

    let fx = fixture(ConsistencyMode::WriteThrough);
    for (id, owner) in [("acct-1", "ada"), ("acct-2", "bob"), ("acct-3", "ada"), ("user-1", "ada")] {
        fx.store.seed(id, json!({ "owner": owner, "balance": 1, "etag": null }));
    }

    let query = SearchQuery::all().with_id_prefix("acct-").with_field("owner", json!("ada"));
    let page = fx.service.search_by_query::<Account>(&query, 1, 10, true).await.unwrap();

    assert_eq!(page.page_num, 1);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.total.unwrap().total_results, 2);
    assert!(fx.provider.snapshot("acct-1").is_some());
    assert!(fx.provider.snapshot("acct-2").is_none());

    let beyond = fx.service.search_by_query::<Account>(&query, 5, 10, false).await.unwrap();
    assert_eq!(beyond.page_num, 5);
    assert!(beyond.items.is_empty());
    assert!(beyond.total.is_none());
}

#[tokio::test]
async fn test_flush_leaves_store_untouched() {
    let fx = fixture(ConsistencyMode::WriteThrough);
    fx.service.get_and_put_if_absent("k1", 1_i64).await.unwrap();
    fx.service.get_and_put_if_absent("k2", 2_i64).await.unwrap();

    assert!(fx.service.flush_key("k1").await.unwrap());
    assert!(fx.provider.snapshot("k1").is_none());
    assert_eq!(fx.provider.len(), 1);

    assert!(fx.service.flush(None).await.unwrap());
    assert_eq!(fx.provider.len(), 0);
    assert_eq!(fx.store.rows().len(), 2);
    assert_eq!(fx.store.get_by_id("k2").await.unwrap(), Some(json!(2)));
}

/// Validates that same-operation callers on one key are serialized.
///
/// Assertions:
/// - Of 16 concurrent put-if-absent calls exactly one creates.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_put_if_absent_creates_once() {
    let fx = Arc::new(fixture(ConsistencyMode::WriteThrough));

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let fx = Arc::clone(&fx);
            tokio::spawn(async move { fx.service.get_and_put_if_absent("k1", i64::from(i)).await })
        })
        .collect();

    let mut created = 0;
    for task in tasks {
        if task.await.unwrap().unwrap().is_none() {
            created += 1;
        }
    }

    assert_eq!(created, 1);
    assert_eq!(fx.store.write_count(), 1);
}

/// Validates that concurrent get-and-put callers each land their value.
///
/// Assertions:
/// - Every caller succeeds; exactly one creates and the rest replace.
/// - The store sees one write per caller.
/// - The returned priors plus the final value are exactly the values put.
/// - Provider and store agree on the final value.
#[tokio::test]
async fn test_concurrent_get_and_put_writes_every_value() {
    for round in 0..5 {
        let fx = Arc::new(fixture(ConsistencyMode::WriteThrough));
        fx.provider.put_delay_ms.store(20, Ordering::SeqCst);
        let key = format!("k{round}");

        let tasks: Vec<_> = (0..4_i64)
            .map(|i| {
                let fx = Arc::clone(&fx);
                let key = key.clone();
                tokio::spawn(async move { fx.service.get_and_put(&key, i).await })
            })
            .collect();

        let mut priors = Vec::new();
        for task in tasks {
            priors.push(task.await.unwrap().unwrap());
        }

        assert_eq!(priors.iter().filter(|prior| prior.is_none()).count(), 1);
        assert_eq!(fx.store.write_count(), 4);

        let last: i64 = fx.service.get(&key).await.unwrap().unwrap();
        let mut seen: Vec<i64> = priors.into_iter().flatten().chain([last]).collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3]);
        assert_eq!(fx.store.row(&key), Some(json!(last)));
    }
}

/// Validates get-and-put against a create that lands after its first read.
///
/// Assertions:
/// - The caller reports the concurrently created value as its prior.
/// - Its own value replaces it in provider and store.
#[tokio::test]
async fn test_get_and_put_retries_as_replace_after_racing_create() {
    let fx = fixture(ConsistencyMode::WriteThrough);
    fx.provider.put_delay_ms.store(40, Ordering::SeqCst);

    let racer = fx.service.get_and_put_if_absent("k1", 100_i64);
    let caller = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        fx.service.get_and_put("k1", 1_i64).await
    };
    let (created, prior) = tokio::join!(racer, caller);

    assert_eq!(created.unwrap(), None);
    assert_eq!(prior.unwrap(), Some(100));
    assert_eq!(fx.provider.snapshot("k1"), Some(json!(1)));
    assert_eq!(fx.store.row("k1"), Some(json!(1)));
    assert_eq!(fx.store.write_count(), 2);
}

/// Validates that rollback restores the provider's raw value.
///
/// Assertions:
/// - A failed replace through a narrower type leaves unknown fields intact.
/// - A failed remove through the same type puts the full value back.
#[tokio::test]
async fn test_rollback_keeps_fields_the_caller_type_drops() {
    let fx = fixture(ConsistencyMode::WriteThrough);
    let raw = json!({ "owner": "ada", "balance": 10, "etag": "e1" });
    fx.provider.insert_raw("k1", raw.clone());
    fx.store.fail_writes.store(true, Ordering::SeqCst);

    let prior = fx.service.get::<OwnerView>("k1").await.unwrap();
    assert_eq!(prior, Some(OwnerView { owner: "ada".to_string() }));

    fx.service.get_and_replace("k1", OwnerView { owner: "bob".to_string() }).await.unwrap_err();
    assert_eq!(fx.provider.snapshot("k1"), Some(raw.clone()));

    fx.service.remove::<OwnerView>("k1").await.unwrap_err();
    assert_eq!(fx.provider.snapshot("k1"), Some(raw));
}

#[tokio::test]
async fn test_acquire_lock_times_out_for_second_owner() {
    let fx = fixture(ConsistencyMode::NonPersistent);
    let lease = Duration::from_secs(5);

    let guard = fx.service.acquire_lock("report", LockOwner::new(), Duration::from_millis(10), lease).await.unwrap();
    assert!(guard.is_held());

    let err = fx.service.acquire_lock("report", LockOwner::new(), Duration::from_millis(20), lease).await.unwrap_err();
    assert!(err.is_timeout());

    drop(guard);
    fx.service.acquire_lock("report", LockOwner::new(), Duration::from_millis(20), lease).await.unwrap();
}

#[tokio::test]
async fn test_lock_cache_takes_no_locks() {
    let settings = CacheSettings::new(LOCK_CACHE_NAME, ConsistencyMode::NonPersistent);
    let service = CacheService::new(
        &settings,
        Arc::new(MemoryProvider::default()),
        None,
        None,
        Arc::new(SystemClock),
    )
    .unwrap();

    let owner = LockOwner::new();
    let first = service.acquire_lock("x", owner, Duration::ZERO, Duration::from_secs(1)).await.unwrap();
    let second = service.acquire_lock("x", LockOwner::new(), Duration::ZERO, Duration::from_secs(1)).await.unwrap();

    assert!(!first.is_held());
    assert!(!second.is_held());
}

#[test]
fn test_persistent_mode_without_store_is_rejected() {
    let settings = CacheSettings::new("accounts", ConsistencyMode::WriteThrough);
    let err = CacheService::new(&settings, Arc::new(MemoryProvider::default()), None, None, Arc::new(SystemClock))
        .unwrap_err();
    assert!(err.is_configuration());
}
