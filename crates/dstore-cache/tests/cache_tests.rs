use dstore_cache::{CacheManager, CachedAccessor, FetchStatus};
use dstore_core::{RecordError, StoreConfig, TransportError};
use dstore_test_utils::{seeded_store, todos_address, todos_value, InstrumentedStore};
use futures::future::join_all;
use pretty_assertions::assert_eq;
use std::time::Duration;

fn slow_store(items: &[&str]) -> InstrumentedStore {
    seeded_store(items).with_latency(Duration::from_millis(20))
}

#[tokio::test]
async fn concurrent_reads_share_one_fetch() {
    let store = slow_store(&["buy milk"]);
    let cached = CachedAccessor::new(store.clone(), &CacheManager::default());
    let address = todos_address();

    let reads = join_all((0..8).map(|_| cached.read(&address))).await;

    for read in reads {
        assert_eq!(read.unwrap(), Some(todos_value(&["buy milk"])));
    }
    assert_eq!(store.get_count(), 1);
}

#[tokio::test]
async fn accessors_sharing_a_manager_share_entries() {
    let store = seeded_store(&["buy milk"]);
    let cache = CacheManager::default();
    let first = CachedAccessor::new(store.clone(), &cache);
    let second = CachedAccessor::new(store.clone(), &cache);

    first.read(&todos_address()).await.unwrap();
    second.read(&todos_address()).await.unwrap();

    assert_eq!(store.get_count(), 1);
}

#[tokio::test]
async fn separate_managers_do_not_share() {
    let store = seeded_store(&["buy milk"]);
    let first = CachedAccessor::new(store.clone(), &CacheManager::default());
    let second = CachedAccessor::new(store.clone(), &CacheManager::default());

    first.read(&todos_address()).await.unwrap();
    second.read(&todos_address()).await.unwrap();

    assert_eq!(store.get_count(), 2);
}

#[tokio::test]
async fn failed_read_is_reported_and_not_cached() {
    let store = seeded_store(&["buy milk"]);
    let cached = CachedAccessor::new(store.clone(), &CacheManager::default());
    let address = todos_address();
    let _observer = cached.subscribe(&address);
    store.fail_next_gets(1);

    let err = cached.read(&address).await.unwrap_err();
    assert!(matches!(
        err,
        RecordError::Transport(TransportError::Unavailable { .. })
    ));
    let snapshot = cached.cache().snapshot(&address).unwrap();
    assert_eq!(snapshot.status, FetchStatus::Error);
    assert_eq!(snapshot.error, Some(err));

    // No retry happened inside the failed read; the next read fetches again
    assert_eq!(store.get_count(), 1);
    let value = cached.read(&address).await.unwrap();
    assert_eq!(value, Some(todos_value(&["buy milk"])));
    assert_eq!(store.get_count(), 2);
    assert_eq!(cached.cache().snapshot(&address).unwrap().error, None);
}

#[tokio::test]
async fn failed_write_keeps_cached_value() {
    let store = seeded_store(&["buy milk"]);
    let cached = CachedAccessor::new(store.clone(), &CacheManager::default());
    let address = todos_address();
    let _observer = cached.subscribe(&address);
    cached.read(&address).await.unwrap();
    store.fail_next_puts(1);

    let err = cached
        .write(&address, todos_value(&["buy milk", "walk dog"]))
        .await
        .unwrap_err();
    assert!(err.is_transport());

    let snapshot = cached.cache().snapshot(&address).unwrap();
    assert!(!snapshot.stale);
    assert!(!snapshot.is_writing());
    assert_eq!(snapshot.pending_write, None);
    assert_eq!(snapshot.value, Some(todos_value(&["buy milk"])));

    // Still served from cache
    cached.read(&address).await.unwrap();
    assert_eq!(store.get_count(), 1);
}

#[tokio::test]
async fn pending_write_is_visible_while_in_flight() {
    let store = slow_store(&["buy milk"]);
    let cached = CachedAccessor::new(store.clone(), &CacheManager::default());
    let address = todos_address();
    let mut observer = cached.subscribe(&address);

    let writer = {
        let cached = cached.clone();
        let address = address.clone();
        tokio::spawn(async move {
            cached
                .write(&address, todos_value(&["buy milk", "walk dog"]))
                .await
        })
    };

    let in_flight = observer.wait_for(|s| s.is_writing()).await.unwrap();
    assert_eq!(
        in_flight.pending_write,
        Some(todos_value(&["buy milk", "walk dog"]))
    );

    writer.await.unwrap().unwrap();
    let settled = observer.wait_for(|s| !s.is_writing()).await.unwrap();
    assert_eq!(settled.pending_write, None);
}

#[tokio::test]
async fn observed_entry_is_refetched_after_write() {
    let store = seeded_store(&["buy milk"]);
    let cached = CachedAccessor::new(store.clone(), &CacheManager::default());
    let address = todos_address();
    let mut observer = cached.subscribe(&address);
    cached.read(&address).await.unwrap();

    cached
        .write(&address, todos_value(&["buy milk", "walk dog"]))
        .await
        .unwrap();

    let refreshed = observer
        .wait_for(|s| !s.stale && s.value == Some(todos_value(&["buy milk", "walk dog"])))
        .await
        .unwrap();
    assert_eq!(refreshed.status, FetchStatus::Idle);
    assert_eq!(store.get_count(), 2);
}

#[tokio::test]
async fn unobserved_entry_is_not_refetched_after_write() {
    let store = seeded_store(&["buy milk"]);
    let cached = CachedAccessor::new(store.clone(), &CacheManager::default());
    let address = todos_address();
    cached.read(&address).await.unwrap();

    cached.write(&address, todos_value(&[])).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(store.get_count(), 1);
    assert!(cached.cache().snapshot(&address).is_none());

    // The next read goes to the store
    assert_eq!(cached.read(&address).await.unwrap(), Some(todos_value(&[])));
    assert_eq!(store.get_count(), 2);
}

#[tokio::test]
async fn read_after_write_never_joins_an_older_fetch() {
    let store = seeded_store(&["old"]).with_get_response_delay(Duration::from_millis(60));
    let cached = CachedAccessor::new(store.clone(), &CacheManager::default());
    let address = todos_address();
    let observer = cached.subscribe(&address);

    let early = {
        let cached = cached.clone();
        let address = address.clone();
        tokio::spawn(async move { cached.read(&address).await })
    };
    // Early fetch has read the old document and is waiting to answer
    tokio::time::sleep(Duration::from_millis(10)).await;

    cached.write(&address, todos_value(&["new"])).await.unwrap();
    assert_eq!(
        cached.read(&address).await.unwrap(),
        Some(todos_value(&["new"]))
    );

    early.await.unwrap().unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let settled = observer.current();
    assert_eq!(settled.value, Some(todos_value(&["new"])));
    assert!(!settled.stale);
    assert_eq!(settled.status, FetchStatus::Idle);
    assert_eq!(
        cached.read(&address).await.unwrap(),
        Some(todos_value(&["new"]))
    );
}

#[tokio::test]
async fn many_unobserved_addresses_leave_no_entries() {
    let store = InstrumentedStore::new();
    let cache = CacheManager::default();
    let cached = CachedAccessor::new(store.clone(), &cache);

    for i in 0..1000 {
        let address = dstore_core::RecordAddress::new("maintenance", format!("list-{i}")).unwrap();
        cached.read(&address).await.unwrap();
    }

    assert_eq!(cache.stats().tracked_entries, 0);
}

#[tokio::test]
async fn refetch_can_be_disabled() {
    let store = seeded_store(&["buy milk"]);
    let cache = CacheManager::new(StoreConfig::new().with_refetch_on_write(false));
    let cached = CachedAccessor::new(store.clone(), &cache);
    let address = todos_address();
    let _observer = cached.subscribe(&address);
    cached.read(&address).await.unwrap();

    cached.write(&address, todos_value(&[])).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(store.get_count(), 1);
}

#[tokio::test]
async fn write_during_fetch_leaves_new_value_readable() {
    let store = slow_store(&["buy milk"]);
    let cached = CachedAccessor::new(store.clone(), &CacheManager::default());
    let address = todos_address();

    let (read, write) = tokio::join!(
        cached.read(&address),
        cached.write(&address, todos_value(&["walk dog"]))
    );
    read.unwrap();
    write.unwrap();

    assert_eq!(
        cached.read(&address).await.unwrap(),
        Some(todos_value(&["walk dog"]))
    );
}

#[tokio::test]
async fn dropping_last_observer_discards_entry() {
    let store = seeded_store(&["buy milk"]);
    let cached = CachedAccessor::new(store.clone(), &CacheManager::default());
    let address = todos_address();

    let observer = cached.subscribe(&address);
    cached.read(&address).await.unwrap();
    assert!(cached.cache().snapshot(&address).is_some());

    drop(observer);
    assert!(cached.cache().snapshot(&address).is_none());
}
