//! Concurrent dispatch properties: exclusive instance possession,
//! unique invocation numbers, and consistent pool accounting under
//! contention.

use foundry_component::testing::FixtureDefinition;
use foundry_component::MethodTable;
use foundry_envelope::{FailureCategory, Request};
use foundry_runtime::{
    DispatchListener, Dispatcher, InvocationCounter, Notifier, PoolConfig,
};
use foundry_types::{ComponentId, InvocationNumber, MethodKey};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const THREADS: usize = 8;
const CALLS_PER_THREAD: usize = 25;
const POOL_SIZE: usize = 4;

/// Worker whose method detects concurrent entry on the same instance.
struct Worker {
    in_call: Arc<AtomicUsize>,
    violations: Arc<AtomicUsize>,
}

fn worker_table() -> MethodTable {
    MethodTable::builder()
        .typed_method::<Worker, _>("work", 0, |worker, _args| {
            let concurrent = worker.in_call.fetch_add(1, Ordering::SeqCst) + 1;
            if concurrent > 1 {
                worker.violations.fetch_add(1, Ordering::SeqCst);
            }
            std::thread::sleep(Duration::from_millis(1));
            worker.in_call.fetch_sub(1, Ordering::SeqCst);
            Ok(Value::Null)
        })
        .build()
}

fn worker_definition(violations: Arc<AtomicUsize>) -> Arc<FixtureDefinition> {
    Arc::new(FixtureDefinition::new("worker", move || {
        Box::new(Worker {
            in_call: Arc::new(AtomicUsize::new(0)),
            violations: Arc::clone(&violations),
        })
    }))
}

#[derive(Default)]
struct NumberLog {
    begins: Mutex<Vec<InvocationNumber>>,
}

impl DispatchListener for NumberLog {
    fn on_begin(&self, _component: &ComponentId, number: InvocationNumber, _args: &[Value]) {
        self.begins.lock().push(number);
    }
}

fn work_request() -> Request {
    Request::local(ComponentId::named("worker"), MethodKey::new("work", 0), vec![])
}

#[test]
fn no_two_threads_share_an_instance() {
    let violations = Arc::new(AtomicUsize::new(0));
    let dispatcher = Arc::new(Dispatcher::new(Notifier::new(Arc::new(
        InvocationCounter::new(),
    ))));
    dispatcher
        .register(
            worker_definition(Arc::clone(&violations)) as _,
            worker_table(),
            PoolConfig::new(POOL_SIZE).with_max_wait(Some(Duration::from_secs(10))),
        )
        .expect("deploy");

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let dispatcher = Arc::clone(&dispatcher);
            std::thread::spawn(move || {
                for _ in 0..CALLS_PER_THREAD {
                    let response = dispatcher.dispatch(&work_request());
                    assert!(response.is_success(), "dispatch failed: {response:?}");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker thread");
    }

    assert_eq!(violations.load(Ordering::SeqCst), 0);

    let stats = dispatcher
        .pool_stats(&ComponentId::named("worker"))
        .expect("stats");
    assert_eq!(stats.on_loan, 0);
    assert!(stats.created <= POOL_SIZE);
    assert_eq!(stats.free, stats.created);
}

#[test]
fn concurrent_dispatches_get_unique_invocation_numbers() {
    let log = Arc::new(NumberLog::default());
    let notifier =
        Notifier::new(Arc::new(InvocationCounter::new())).with_listener(Arc::clone(&log) as _);
    let dispatcher = Arc::new(Dispatcher::new(notifier));
    dispatcher
        .register(
            worker_definition(Arc::new(AtomicUsize::new(0))) as _,
            worker_table(),
            PoolConfig::new(POOL_SIZE).with_max_wait(Some(Duration::from_secs(10))),
        )
        .expect("deploy");

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let dispatcher = Arc::clone(&dispatcher);
            std::thread::spawn(move || {
                for _ in 0..CALLS_PER_THREAD {
                    assert!(dispatcher.dispatch(&work_request()).is_success());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker thread");
    }

    let mut begins = log.begins.lock().clone();
    assert_eq!(begins.len(), THREADS * CALLS_PER_THREAD);
    begins.sort_unstable();
    begins.dedup();
    assert_eq!(begins.len(), THREADS * CALLS_PER_THREAD);
}

#[test]
fn accounting_stays_consistent_under_mixed_outcomes() {
    struct Flaky;
    let table = MethodTable::builder()
        .typed_method::<Flaky, _>("maybe", 1, |_f, args| {
            if args[0].as_bool().unwrap_or(false) {
                panic!("unrecoverable state");
            }
            Ok(json!("fine"))
        })
        .build();

    let definition = Arc::new(FixtureDefinition::new("flaky", || Box::new(Flaky)));
    let dispatcher = Arc::new(Dispatcher::new(Notifier::new(Arc::new(
        InvocationCounter::new(),
    ))));
    dispatcher
        .register(
            Arc::clone(&definition) as _,
            table,
            PoolConfig::new(POOL_SIZE).with_max_wait(Some(Duration::from_secs(10))),
        )
        .expect("deploy");

    let discards = Arc::new(AtomicUsize::new(0));
    let handles: Vec<_> = (0..THREADS)
        .map(|thread| {
            let dispatcher = Arc::clone(&dispatcher);
            let discards = Arc::clone(&discards);
            std::thread::spawn(move || {
                for call in 0..CALLS_PER_THREAD {
                    // Every fifth call on odd threads blows up.
                    let explode = thread % 2 == 1 && call % 5 == 0;
                    let response = dispatcher.dispatch(&Request::local(
                        ComponentId::named("flaky"),
                        MethodKey::new("maybe", 1),
                        vec![json!(explode)],
                    ));
                    if explode {
                        assert_eq!(
                            response.failure().expect("failure").category(),
                            FailureCategory::System
                        );
                        assert!(response.removed());
                        discards.fetch_add(1, Ordering::SeqCst);
                    } else {
                        assert_eq!(response.value(), Some(&json!("fine")));
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker thread");
    }

    let stats = dispatcher
        .pool_stats(&ComponentId::named("flaky"))
        .expect("stats");
    assert_eq!(stats.on_loan, 0);
    assert_eq!(stats.free, stats.created);
    assert_eq!(stats.discarded, discards.load(Ordering::SeqCst));
    // Every discard ran its teardown hook exactly once.
    assert_eq!(definition.teardown_count(), stats.discarded);
}
