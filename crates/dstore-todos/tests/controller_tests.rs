use dstore_cache::{CacheManager, CachedAccessor, FetchStatus};
use dstore_core::{RecordError, StoreConfig, TransportError};
use dstore_schema::{JsonSchemaValidator, ValidatedAccessor};
use dstore_test_utils::{seeded_store, todos_address, todos_value, InstrumentedStore};
use dstore_todos::{ListController, Mutation, TodosController, TodosRecord};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;
use std::time::Duration;

fn controller(store: &InstrumentedStore) -> TodosController<InstrumentedStore> {
    TodosController::todos(store.clone(), &CacheManager::default())
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

#[tokio::test]
async fn add_then_remove_scenario() {
    let store = seeded_store(&["buy milk"]);
    let todos = controller(&store);

    todos.add_item("walk dog").await.unwrap();
    assert_eq!(
        store.current(&todos_address()),
        Some(todos_value(&["buy milk", "walk dog"]))
    );

    todos.remove_item_at(0).await.unwrap();
    assert_eq!(
        store.current(&todos_address()),
        Some(todos_value(&["walk dog"]))
    );
    assert_eq!(todos.items().await.unwrap(), vec!["walk dog"]);
}

#[tokio::test]
async fn add_after_cached_read_sees_its_own_write() {
    let store = seeded_store(&[]);
    let cache = CacheManager::new(
        StoreConfig::new().with_write_policy(dstore_core::WritePolicy::LastWriteWins),
    );
    let todos = TodosController::todos(store.clone(), &cache);

    todos.items().await.unwrap();
    todos.add_item("a").await.unwrap();
    todos.add_item("b").await.unwrap();

    assert_eq!(store.current(&todos_address()), Some(todos_value(&["a", "b"])));
}

#[tokio::test]
async fn empty_input_touches_nothing() {
    let store = seeded_store(&["buy milk"]);
    let todos = controller(&store);

    let mutation = todos.add_item(String::new()).await.unwrap();

    assert_eq!(mutation, Mutation::Skipped);
    assert_eq!(store.get_count(), 0);
    assert_eq!(store.put_count(), 0);
}

#[tokio::test]
async fn out_of_range_removal_is_rejected_and_writes_nothing() {
    let store = seeded_store(&["buy milk", "walk dog"]);
    let todos = controller(&store);

    let err = todos.remove_item_at(2).await.unwrap_err();

    assert_eq!(err, RecordError::IndexOutOfRange { index: 2, len: 2 });
    assert_eq!(store.put_count(), 0);
    assert_eq!(
        store.current(&todos_address()),
        Some(todos_value(&["buy milk", "walk dog"]))
    );
}

#[tokio::test]
async fn nonconforming_record_surfaces_schema_error() {
    let store = InstrumentedStore::new().seeded(&todos_address(), json!({ "todos": ["a", 2] }));
    let todos = controller(&store);
    let _observer = todos.subscribe();

    let err = todos.items().await.unwrap_err();
    assert!(err.is_schema());

    // Mutations refuse to merge into it as well
    assert!(todos.add_item("b").await.unwrap_err().is_schema());
    assert_eq!(store.put_count(), 0);

    let state = todos.state();
    assert_eq!(state.items, None);
    assert!(matches!(state.error, Some(RecordError::Schema(_))));
}

#[tokio::test]
async fn transport_error_is_distinct_from_schema_error() {
    let store = seeded_store(&["buy milk"]);
    let todos = controller(&store);
    let _observer = todos.subscribe();
    store.fail_next_gets(1);

    let err = todos.items().await.unwrap_err();
    assert!(matches!(
        err,
        RecordError::Transport(TransportError::Unavailable { .. })
    ));
    assert_eq!(todos.state().status, FetchStatus::Error);

    assert_eq!(todos.items().await.unwrap(), vec!["buy milk"]);
}

#[tokio::test]
async fn failed_write_is_reported() {
    let store = seeded_store(&["buy milk"]);
    let todos = controller(&store);
    store.fail_next_puts(1);

    let err = todos.add_item("walk dog").await.unwrap_err();

    assert!(err.is_transport());
    assert_eq!(store.current(&todos_address()), Some(todos_value(&["buy milk"])));
    assert!(!todos.state().is_writing);
}

#[tokio::test]
async fn state_exposes_pending_item_while_appending() {
    let store = seeded_store(&["buy milk"]).with_latency(Duration::from_millis(20));
    let todos = controller(&store);
    todos.items().await.unwrap();
    let mut observer = todos.subscribe();

    let adding = {
        let todos = todos.clone();
        tokio::spawn(async move { todos.add_item("walk dog").await })
    };

    observer.wait_for(|s| s.is_writing()).await.unwrap();
    let state = todos.state();
    assert!(state.is_writing);
    assert_eq!(state.items, Some(vec!["buy milk".to_string()]));
    assert_eq!(state.pending_item.as_deref(), Some("walk dog"));

    adding.await.unwrap().unwrap();
    let settled = observer
        .wait_for(|s| !s.is_writing() && !s.stale)
        .await
        .unwrap();
    assert_eq!(settled.value, Some(todos_value(&["buy milk", "walk dog"])));

    let state = todos.state();
    assert_eq!(state.pending_item, None);
    assert_eq!(
        state.items,
        Some(vec!["buy milk".to_string(), "walk dog".to_string()])
    );
}

#[tokio::test]
async fn removal_has_no_pending_item() {
    let store = seeded_store(&["buy milk", "walk dog"]).with_latency(Duration::from_millis(20));
    let todos = controller(&store);
    todos.items().await.unwrap();
    let mut observer = todos.subscribe();

    let removing = {
        let todos = todos.clone();
        tokio::spawn(async move { todos.remove_item_at(1).await })
    };

    observer.wait_for(|s| s.is_writing()).await.unwrap();
    let state = todos.state();
    assert!(state.is_writing);
    assert_eq!(state.pending_item, None);

    removing.await.unwrap().unwrap();
}

#[tokio::test]
async fn controller_with_json_schema_validator() {
    let store = seeded_store(&["buy milk"]);
    let cached = CachedAccessor::new(store.clone(), &CacheManager::default());
    let validator = JsonSchemaValidator::<TodosRecord>::for_type().unwrap();
    let todos = ListController::new(todos_address(), ValidatedAccessor::new(cached, validator));

    todos.add_item("walk dog").await.unwrap();
    assert_eq!(todos.items().await.unwrap(), vec!["buy milk", "walk dog"]);

    store
        .memory()
        .seed(todos_address(), json!({ "todos": [true] }));
    let err = todos.refresh().await.unwrap_err();
    assert!(err.is_schema());
}

#[tokio::test]
async fn read_then_write_back_is_a_noop() {
    let store = InstrumentedStore::new().seeded(
        &todos_address(),
        json!({ "todos": ["buy milk"], "owner": "admin" }),
    );
    let todos = controller(&store);

    let record = todos
        .accessor()
        .read(&todos_address())
        .await
        .unwrap()
        .unwrap();
    todos.accessor().write(&todos_address(), &record).await.unwrap();

    assert_eq!(
        store.current(&todos_address()),
        Some(json!({ "todos": ["buy milk"], "owner": "admin" }))
    );
}

proptest! {
    #[test]
    fn sequential_adds_persist_in_call_order(
        values in prop::collection::vec("[a-z ]{1,12}", 0..12)
    ) {
        let store = InstrumentedStore::new();
        let todos = controller(&store);

        runtime().block_on(async {
            for value in &values {
                todos.add_item(value.clone()).await.unwrap();
            }
        });

        let expected = if values.is_empty() {
            None
        } else {
            Some(json!({ "todos": values }))
        };
        prop_assert_eq!(store.current(&todos_address()), expected);
    }

    #[test]
    fn removal_drops_exactly_one_item(
        (items, index) in prop::collection::vec("[a-z]{1,8}", 1..10)
            .prop_flat_map(|items| {
                let len = items.len();
                (Just(items), 0..len)
            })
    ) {
        let refs: Vec<&str> = items.iter().map(String::as_str).collect();
        let store = seeded_store(&refs);
        let todos = controller(&store);

        let remaining = runtime().block_on(async {
            todos.remove_item_at(index).await.unwrap();
            todos.refresh().await.unwrap()
        });

        let mut expected = items.clone();
        expected.remove(index);
        prop_assert_eq!(remaining.len(), items.len() - 1);
        prop_assert_eq!(remaining, expected);
    }
}
