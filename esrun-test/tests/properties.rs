//! Universal properties every `Store`/`Supervisor`/projection combination
//! must satisfy, checked here against the in-memory reference adapters.

use std::time::Duration;

use esrun::{AggregateOptions, ExpectedVersion, ResolvedAggregateOptions, Store, Supervisor, ALL};
use esrun_core::aggregate::{Aggregate, AggregateExt};
use esrun_core::event::AggregateRef;
use esrun_demo_cart::{Cart, CartCommand, CartsProjection};
use esrun_demo_counter::{Counter, CounterCommand, CounterState};
use esrun_memory::{InMemoryStore, LocalPubSub};

const TIMEOUT: Duration = Duration::from_secs(1);

/// 1. Determinism of replay: folding a fresh aggregate's full stream from
/// scratch must equal the state the running instance reports.
#[tokio::test]
async fn determinism_of_replay() {
    let store = InMemoryStore::new();
    let supervisor: Supervisor<Counter, _, _> =
        Supervisor::new(Counter, store.clone(), LocalPubSub::new(), AggregateOptions::default());

    supervisor.command("1".to_string(), CounterCommand::Create, TIMEOUT).await.unwrap();
    supervisor
        .command("1".to_string(), CounterCommand::Increment { by: 3 }, TIMEOUT)
        .await
        .unwrap();
    supervisor
        .command("1".to_string(), CounterCommand::Increment { by: 7 }, TIMEOUT)
        .await
        .unwrap();

    let live_state = supervisor.state("1".to_string(), TIMEOUT).await.unwrap();

    let aggregate_ref = AggregateRef::new(Counter::TYPE_NAME, "1");
    let records = store.fetch_by_aggregate(&aggregate_ref, ALL).await.unwrap();
    let replayed_state = Counter::fold(CounterState::default(), records.into_iter().map(|r| r.event));

    assert_eq!(live_state, replayed_state);
    assert_eq!(live_state, CounterState::Active { count: 10 });
}

/// 2. Snapshot equivalence: hydrating from a mid-stream snapshot plus the
/// remaining tail must equal replaying the whole stream unsnapshotted.
#[tokio::test]
async fn snapshot_equivalence() {
    let store = InMemoryStore::new();
    let aggregate_ref = AggregateRef::new(Counter::TYPE_NAME, "1");

    let append = |events: Vec<esrun_demo_counter::CounterEvent>, expected: ExpectedVersion| {
        let store = store.clone();
        let aggregate_ref = aggregate_ref.clone();
        async move { store.append(&aggregate_ref, events, expected).await.unwrap() }
    };

    append(vec![esrun_demo_counter::CounterEvent::Created], ExpectedVersion::NoStream).await;
    append(vec![esrun_demo_counter::CounterEvent::Incremented { by: 1 }], ExpectedVersion::Exact(1)).await;
    append(vec![esrun_demo_counter::CounterEvent::Incremented { by: 2 }], ExpectedVersion::Exact(2)).await;
    append(vec![esrun_demo_counter::CounterEvent::Incremented { by: 3 }], ExpectedVersion::Exact(3)).await;

    let full_replay = {
        let records = store.fetch_by_aggregate(&aggregate_ref, ALL).await.unwrap();
        Counter::fold(CounterState::default(), records.into_iter().map(|r| r.event))
    };

    // Snapshot taken after the 2nd event (stream_version 2), then replay
    // only what comes after.
    let snapshot_state = {
        let records = store.fetch_by_aggregate(&aggregate_ref, ALL).await.unwrap();
        Counter::fold(
            CounterState::default(),
            records.iter().take(2).map(|r| r.event.clone()),
        )
    };
    store.snapshot(&aggregate_ref, snapshot_state.clone(), 2).await.unwrap();

    let from_snapshot = {
        let snapshot = store.get_snapshot(&aggregate_ref).await.unwrap().unwrap();
        let tail = store.fetch_by_aggregate(&aggregate_ref, snapshot.version).await.unwrap();
        Counter::fold(snapshot.state, tail.into_iter().map(|r| r.event))
    };

    assert_eq!(full_replay, from_snapshot);
}

/// 3. Per-stream ordering: `stream_version`s are contiguous starting at 1.
#[tokio::test]
async fn per_stream_ordering_is_contiguous() {
    let store = InMemoryStore::<esrun_demo_counter::CounterEvent, CounterState>::new();
    let aggregate_ref = AggregateRef::new(Counter::TYPE_NAME, "1");

    store
        .append(
            &aggregate_ref,
            vec![
                esrun_demo_counter::CounterEvent::Created,
                esrun_demo_counter::CounterEvent::Incremented { by: 1 },
                esrun_demo_counter::CounterEvent::Incremented { by: 1 },
            ],
            ExpectedVersion::NoStream,
        )
        .await
        .unwrap();

    let records = store.fetch_by_aggregate(&aggregate_ref, ALL).await.unwrap();
    let versions: Vec<_> = records.iter().map(|r| r.stream_version).collect();
    assert_eq!(versions, vec![1, 2, 3]);
}

/// 4. Optimistic concurrency: of two concurrent appends expecting the same
/// version, exactly one succeeds.
#[tokio::test]
async fn optimistic_concurrency_allows_exactly_one_winner() {
    let store = InMemoryStore::<esrun_demo_counter::CounterEvent, CounterState>::new();
    let aggregate_ref = AggregateRef::new(Counter::TYPE_NAME, "1");

    store
        .append(&aggregate_ref, vec![esrun_demo_counter::CounterEvent::Created], ExpectedVersion::NoStream)
        .await
        .unwrap();

    let first = {
        let store = store.clone();
        let aggregate_ref = aggregate_ref.clone();
        tokio::spawn(async move {
            store
                .append(
                    &aggregate_ref,
                    vec![esrun_demo_counter::CounterEvent::Incremented { by: 1 }],
                    ExpectedVersion::Exact(1),
                )
                .await
        })
    };
    let second = {
        let store = store.clone();
        let aggregate_ref = aggregate_ref.clone();
        tokio::spawn(async move {
            store
                .append(
                    &aggregate_ref,
                    vec![esrun_demo_counter::CounterEvent::Incremented { by: 2 }],
                    ExpectedVersion::Exact(1),
                )
                .await
        })
    };

    let (first, second) = tokio::join!(first, second);
    let outcomes = [first.unwrap(), second.unwrap()];

    let successes = outcomes.iter().filter(|r| r.is_ok()).count();
    let failures = outcomes.iter().filter(|r| r.is_err()).count();

    assert_eq!(successes, 1);
    assert_eq!(failures, 1);
}

/// 5. Projection idempotence under duplicates: redelivering the same
/// records over the bus must not move the projection's state further.
#[tokio::test]
async fn projection_is_idempotent_under_duplicate_delivery() {
    let store = InMemoryStore::new();
    let pubsub = LocalPubSub::new();

    let supervisor: Supervisor<Cart, _, _> =
        Supervisor::new(Cart, store.clone(), pubsub.clone(), AggregateOptions::default());
    let projection = esrun::projection_runtime::spawn(CartsProjection, store.clone(), pubsub.clone());

    supervisor
        .command("cart-1".to_string(), CartCommand::AddItem { sku: "sku-1".into(), quantity: 4 }, TIMEOUT)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(30)).await;
    let after_first_delivery = projection.get().await;

    // Re-broadcast the same, already-applied records a few times.
    let (records, _head) = store.fetch(ALL).await.unwrap();
    for _ in 0..3 {
        pubsub.broadcast(records.clone()).await.unwrap();
    }

    tokio::time::sleep(Duration::from_millis(30)).await;
    let after_duplicate_delivery = projection.get().await;

    assert_eq!(after_first_delivery, after_duplicate_delivery);
}

/// 6. Gap repair: if the bus drops a middle record, the projection's
/// final state still matches a full store fetch.
#[tokio::test]
async fn projection_repairs_a_dropped_middle_record() {
    let store = InMemoryStore::new();
    let pubsub = LocalPubSub::new();
    let aggregate_ref = AggregateRef::new(Cart::TYPE_NAME, "cart-1");

    // Projection subscribes before any records exist.
    let projection = esrun::projection_runtime::spawn(CartsProjection, store.clone(), pubsub.clone());
    tokio::time::sleep(Duration::from_millis(10)).await;

    let first = store
        .append(
            &aggregate_ref,
            vec![esrun_demo_cart::CartEvent::ItemAdded { sku: "sku-1".into(), quantity: 1 }],
            ExpectedVersion::NoStream,
        )
        .await
        .unwrap();
    let second = store
        .append(
            &aggregate_ref,
            vec![esrun_demo_cart::CartEvent::ItemAdded { sku: "sku-1".into(), quantity: 2 }],
            ExpectedVersion::Exact(1),
        )
        .await
        .unwrap();
    let third = store
        .append(
            &aggregate_ref,
            vec![esrun_demo_cart::CartEvent::ItemAdded { sku: "sku-1".into(), quantity: 4 }],
            ExpectedVersion::Exact(2),
        )
        .await
        .unwrap();

    // Broadcast only the first and third records: the second is "dropped"
    // by the bus and must be recovered through `fetch`.
    pubsub.broadcast(first.records).await.unwrap();
    pubsub.broadcast(third.records).await.unwrap();
    let _ = second;

    tokio::time::sleep(Duration::from_millis(50)).await;

    let projected = projection.get().await;
    assert_eq!(projected.totals.get("cart-1").and_then(|skus| skus.get("sku-1")), Some(&7));
}

/// 7. Idle shutdown: after the idle timer elapses the instance is torn
/// down, but the next command transparently respawns and reflects the
/// stream's full prior history.
#[tokio::test]
async fn idle_shutdown_is_transparent_to_the_caller() {
    let options = ResolvedAggregateOptions {
        shutdown_timeout: Duration::from_millis(30),
        snapshot_every: u32::MAX,
        snapshot_on_shutdown: false,
    };

    let supervisor: Supervisor<Counter, _, _> =
        Supervisor::with_options(Counter, InMemoryStore::new(), LocalPubSub::new(), options);

    supervisor.command("1".to_string(), CounterCommand::Create, TIMEOUT).await.unwrap();
    supervisor
        .command("1".to_string(), CounterCommand::Increment { by: 4 }, TIMEOUT)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(80)).await;

    supervisor
        .command("1".to_string(), CounterCommand::Increment { by: 6 }, TIMEOUT)
        .await
        .unwrap();

    let state = supervisor.state("1".to_string(), TIMEOUT).await.unwrap();
    assert_eq!(state, CounterState::Active { count: 10 });
}
