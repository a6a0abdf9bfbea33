//! End-to-end dispatch behavior: envelope sealing, event pairing,
//! failure classification, context and correlation restoration.

use foundry_component::testing::FixtureDefinition;
use foundry_component::MethodTable;
use foundry_envelope::{BusinessError, Failure, FailureCategory, JsonCodec, Request};
use foundry_runtime::context;
use foundry_runtime::{
    CorrelationProvider, DispatchListener, Dispatcher, InvocationCounter, Notifier, PoolConfig,
    ThreadCorrelation,
};
use foundry_types::{ComponentId, CorrelationId, InvocationNumber, MethodKey};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

struct Calculator;

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Begin(InvocationNumber, Vec<Value>),
    End(InvocationNumber, Option<Value>),
    Error(InvocationNumber, String),
}

#[derive(Default)]
struct Recording {
    events: Mutex<Vec<Event>>,
}

impl Recording {
    fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }
}

impl DispatchListener for Recording {
    fn on_begin(&self, _component: &ComponentId, number: InvocationNumber, args: &[Value]) {
        self.events.lock().push(Event::Begin(number, args.to_vec()));
    }

    fn on_end(&self, _component: &ComponentId, number: InvocationNumber, result: Option<&Value>) {
        self.events.lock().push(Event::End(number, result.cloned()));
    }

    fn on_error(&self, _component: &ComponentId, number: InvocationNumber, failure: &Failure) {
        self.events
            .lock()
            .push(Event::Error(number, failure.to_string()));
    }
}

fn calculator_table() -> MethodTable {
    MethodTable::builder()
        .typed_method::<Calculator, _>("add", 2, |_calc, args| {
            Ok(json!(
                args[0].as_i64().unwrap_or(0) + args[1].as_i64().unwrap_or(0)
            ))
        })
        .typed_method::<Calculator, _>("divide", 2, |_calc, args| {
            let dividend = args[0].as_i64().unwrap_or(0);
            let divisor = args[1].as_i64().unwrap_or(0);
            // Undeclared failure path: divisor 0 unwinds.
            Ok(json!(dividend / divisor))
        })
        .build()
}

fn calculator_definition() -> Arc<FixtureDefinition> {
    Arc::new(FixtureDefinition::new("calculator", || Box::new(Calculator)))
}

struct Harness {
    dispatcher: Dispatcher,
    definition: Arc<FixtureDefinition>,
    recording: Arc<Recording>,
}

fn calculator_harness(pool_size: usize) -> Harness {
    let recording = Arc::new(Recording::default());
    let notifier = Notifier::new(Arc::new(InvocationCounter::new()))
        .with_listener(Arc::clone(&recording) as _);
    let dispatcher = Dispatcher::new(notifier);
    let definition = calculator_definition();
    dispatcher
        .register(
            Arc::clone(&definition) as _,
            calculator_table(),
            PoolConfig::new(pool_size).with_max_wait(Some(Duration::from_millis(50))),
        )
        .expect("deploy calculator");
    Harness {
        dispatcher,
        definition,
        recording,
    }
}

fn calculator() -> ComponentId {
    ComponentId::named("calculator")
}

fn add_request(a: i64, b: i64) -> Request {
    Request::local(calculator(), MethodKey::new("add", 2), vec![json!(a), json!(b)])
}

#[test]
fn successful_dispatch_seals_value_and_repools() {
    let harness = calculator_harness(1);

    let response = harness.dispatcher.dispatch(&add_request(2, 3));

    assert_eq!(response.value(), Some(&json!(5)));
    assert!(response.failure().is_none());
    assert!(!response.removed());

    let stats = harness.dispatcher.pool_stats(&calculator()).expect("stats");
    assert_eq!(stats.free, 1);
    assert_eq!(stats.on_loan, 0);
}

#[test]
fn success_emits_one_begin_end_pair_with_matching_number() {
    let harness = calculator_harness(1);
    harness.dispatcher.dispatch(&add_request(2, 3));

    let events = harness.recording.events();
    assert_eq!(
        events,
        vec![
            Event::Begin(InvocationNumber::from(1), vec![json!(2), json!(3)]),
            Event::End(InvocationNumber::from(1), Some(json!(5))),
        ]
    );
}

#[test]
fn application_failure_keeps_identity_and_releases_instance() {
    let harness = calculator_harness(1);
    let table = MethodTable::builder()
        .typed_method::<(), _>("withdraw", 1, |_account, args| {
            Err(BusinessError::new("INSUFFICIENT_FUNDS", "balance is 12.50")
                .with_detail(json!({"requested": args[0]})))
        })
        .build();
    let definition = Arc::new(FixtureDefinition::new("account", || Box::new(())));
    harness
        .dispatcher
        .register(Arc::clone(&definition) as _, table, PoolConfig::new(1))
        .expect("deploy account");

    let request = Request::local(
        ComponentId::named("account"),
        MethodKey::new("withdraw", 1),
        vec![json!(40)],
    );
    let response = harness.dispatcher.dispatch(&request);

    let failure = response.failure().expect("failure");
    assert_eq!(failure.category(), FailureCategory::Application);
    let business = failure.as_business().expect("business error");
    assert_eq!(business.code, "INSUFFICIENT_FUNDS");
    assert_eq!(business.message, "balance is 12.50");
    assert_eq!(business.detail, Some(json!({"requested": 40})));

    // Released, not discarded.
    assert!(!response.removed());
    assert_eq!(definition.teardown_count(), 0);
    let stats = harness
        .dispatcher
        .pool_stats(&ComponentId::named("account"))
        .expect("stats");
    assert_eq!(stats.free, 1);
    assert_eq!(stats.discarded, 0);
}

#[test]
fn failed_dispatch_emits_error_event_with_begin_number() {
    let harness = calculator_harness(1);
    let response = harness.dispatcher.dispatch(&Request::local(
        calculator(),
        MethodKey::new("divide", 2),
        vec![json!(1), json!(0)],
    ));
    assert!(response.failure().is_some());

    let events = harness.recording.events();
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], Event::Begin(n, _) if n == InvocationNumber::from(1)));
    assert!(matches!(&events[1], Event::Error(n, _) if *n == InvocationNumber::from(1)));
}

#[test]
fn undeclared_panic_discards_the_instance() {
    let harness = calculator_harness(1);

    let response = harness.dispatcher.dispatch(&Request::local(
        calculator(),
        MethodKey::new("divide", 2),
        vec![json!(1), json!(0)],
    ));

    let failure = response.failure().expect("failure");
    assert_eq!(failure.category(), FailureCategory::System);
    assert!(response.removed());
    assert_eq!(harness.definition.teardown_count(), 1);

    let stats = harness.dispatcher.pool_stats(&calculator()).expect("stats");
    assert_eq!(stats.created, 0);
    assert_eq!(stats.discarded, 1);
    assert_eq!(stats.free, 0);

    // The discarded instance never comes back: the next dispatch gets
    // a fresh one and succeeds.
    let discarded = response.instance().expect("serving instance recorded");
    let response = harness.dispatcher.dispatch(&add_request(2, 3));
    assert_eq!(response.value(), Some(&json!(5)));
    assert_ne!(response.instance(), Some(discarded));
}

#[test]
fn stale_reference_to_discarded_instance_fails_target_removed() {
    let harness = calculator_harness(1);

    let response = harness.dispatcher.dispatch(&Request::local(
        calculator(),
        MethodKey::new("divide", 2),
        vec![json!(1), json!(0)],
    ));
    let stale = response.instance().expect("instance recorded");
    let stats_before = harness.dispatcher.pool_stats(&calculator()).expect("stats");

    let response = harness
        .dispatcher
        .dispatch(&add_request(2, 3).with_instance(stale));

    assert_eq!(
        response.failure(),
        Some(&Failure::TargetRemoved(stale))
    );
    // Reported without consulting the pool for an instance.
    let stats_after = harness.dispatcher.pool_stats(&calculator()).expect("stats");
    assert_eq!(stats_before, stats_after);
}

#[test]
fn unknown_method_is_loud_and_leaves_pool_untouched() {
    let harness = calculator_harness(1);

    let response = harness.dispatcher.dispatch(&Request::local(
        calculator(),
        MethodKey::new("subtract", 2),
        vec![json!(5), json!(3)],
    ));

    assert_eq!(
        response.failure(),
        Some(&Failure::MethodNotFound {
            component: calculator(),
            method: MethodKey::new("subtract", 2),
        })
    );
    let stats = harness.dispatcher.pool_stats(&calculator()).expect("stats");
    assert_eq!(stats.created, 0);
    assert!(harness.recording.events().is_empty());
}

#[test]
fn wire_decode_failure_is_a_system_failure_before_the_pool() {
    let harness = calculator_harness(1);

    let request = Request::from_wire(
        calculator(),
        MethodKey::new("add", 2),
        b"corrupt payload".to_vec(),
        Arc::new(JsonCodec),
    );
    let response = harness.dispatcher.dispatch(&request);

    assert_eq!(
        response.failure().expect("failure").category(),
        FailureCategory::System
    );
    let stats = harness.dispatcher.pool_stats(&calculator()).expect("stats");
    assert_eq!(stats.created, 0);
    assert!(harness.recording.events().is_empty());
}

#[test]
fn pool_exhaustion_surfaces_as_pool_failure() {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Instant;

    let entered = Arc::new(AtomicBool::new(false));
    let dispatcher = Arc::new(Dispatcher::new(Notifier::new(Arc::new(
        InvocationCounter::new(),
    ))));

    let flag = Arc::clone(&entered);
    let table = MethodTable::builder()
        .typed_method::<Calculator, _>("stall", 0, move |_calc, _args| {
            flag.store(true, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(400));
            Ok(Value::Null)
        })
        .build();
    dispatcher
        .register(
            calculator_definition() as _,
            table,
            PoolConfig::new(1).with_max_wait(Some(Duration::from_millis(30))),
        )
        .expect("deploy");

    let background = {
        let dispatcher = Arc::clone(&dispatcher);
        std::thread::spawn(move || {
            dispatcher.dispatch(&Request::local(
                calculator(),
                MethodKey::new("stall", 0),
                vec![],
            ))
        })
    };
    let deadline = Instant::now() + Duration::from_secs(5);
    while !entered.load(Ordering::SeqCst) {
        assert!(Instant::now() < deadline, "stall never entered");
        std::thread::sleep(Duration::from_millis(1));
    }

    let response = dispatcher.dispatch(&Request::local(
        calculator(),
        MethodKey::new("stall", 0),
        vec![],
    ));
    match response.failure().expect("failure") {
        Failure::Pool { code, .. } => assert_eq!(code, "POOL_EXHAUSTED"),
        other => panic!("expected pool failure, got {other:?}"),
    }

    assert!(background.join().expect("join").is_success());
}

#[test]
fn local_tail_dispatch_suppresses_events() {
    let harness = calculator_harness(1);

    let response = harness.dispatcher.dispatch_local_tail(&add_request(2, 3));

    assert_eq!(response.value(), Some(&json!(5)));
    assert!(harness.recording.events().is_empty());

    // A regular dispatch afterwards still gets a fresh number 1: the
    // tail call never consumed one.
    harness.dispatcher.dispatch(&add_request(1, 1));
    assert!(matches!(
        harness.recording.events()[0],
        Event::Begin(n, _) if n == InvocationNumber::from(1)
    ));
}

#[test]
fn listener_panic_does_not_change_the_outcome() {
    struct Exploding;
    impl DispatchListener for Exploding {
        fn on_begin(&self, _c: &ComponentId, _n: InvocationNumber, _a: &[Value]) {
            panic!("listener defect");
        }
        fn on_end(&self, _c: &ComponentId, _n: InvocationNumber, _r: Option<&Value>) {
            panic!("listener defect");
        }
    }

    let recording = Arc::new(Recording::default());
    let notifier = Notifier::new(Arc::new(InvocationCounter::new()))
        .with_listener(Arc::new(Exploding))
        .with_listener(Arc::clone(&recording) as _);
    let dispatcher = Dispatcher::new(notifier);
    dispatcher
        .register(
            calculator_definition() as _,
            calculator_table(),
            PoolConfig::new(1),
        )
        .expect("deploy");

    let response = dispatcher.dispatch(&add_request(2, 3));
    assert_eq!(response.value(), Some(&json!(5)));
    // Later listeners still observed the full pair.
    assert_eq!(recording.events().len(), 2);
}

#[test]
fn context_is_installed_during_the_call_and_restored_after() {
    let observed = Arc::new(Mutex::new(None));
    let seen = Arc::clone(&observed);
    let table = MethodTable::builder()
        .typed_method::<Calculator, _>("observe", 0, move |_calc, _args| {
            *seen.lock() = Some(context::current());
            Ok(Value::Null)
        })
        .build();

    let dispatcher = Dispatcher::new(Notifier::new(Arc::new(InvocationCounter::new())));
    dispatcher
        .register(calculator_definition() as _, table, PoolConfig::new(1))
        .expect("deploy");

    let before = context::current();
    let request = Request::local(calculator(), MethodKey::new("observe", 0), vec![])
        .with_invoked_interface("Calculator");
    let response = dispatcher.dispatch(&request);
    assert!(response.is_success());

    let inside = observed.lock().clone().expect("method observed context");
    assert_eq!(inside.component, Some(calculator()));
    assert_eq!(inside.invoked_interface.as_deref(), Some("Calculator"));
    assert!(inside.state.is_business());

    assert_eq!(context::current(), before);
}

#[test]
fn context_is_restored_even_when_the_call_panics() {
    let harness = calculator_harness(1);

    let before = context::current();
    let response = harness.dispatcher.dispatch(&Request::local(
        calculator(),
        MethodKey::new("divide", 2),
        vec![json!(1), json!(0)],
    ));
    assert!(response.failure().is_some());
    assert_eq!(context::current(), before);
    assert!(context::operation_state().is_idle());
}

#[test]
fn sequential_dispatches_mint_distinct_children_and_restore_parent() {
    let provider = Arc::new(ThreadCorrelation);
    let observed: Arc<Mutex<Vec<Option<CorrelationId>>>> = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&observed);
    let table = MethodTable::builder()
        .typed_method::<Calculator, _>("observe", 0, move |_calc, _args| {
            seen.lock().push(context::current().correlation);
            Ok(Value::Null)
        })
        .build();

    let dispatcher = Dispatcher::new(Notifier::new(Arc::new(InvocationCounter::new())))
        .with_correlation(Arc::clone(&provider) as _);
    dispatcher
        .register(calculator_definition() as _, table, PoolConfig::new(1))
        .expect("deploy");

    let parent = CorrelationId::new();
    provider.restore(Some(parent));

    let request = Request::local(calculator(), MethodKey::new("observe", 0), vec![]);
    assert!(dispatcher.dispatch(&request).is_success());
    assert!(dispatcher.dispatch(&request).is_success());

    let children = observed.lock().clone();
    let first = children[0].expect("first child id");
    let second = children[1].expect("second child id");
    assert_ne!(first, parent);
    assert_ne!(second, parent);
    assert_ne!(first, second);

    // The parent is current again once both dispatches completed.
    assert_eq!(provider.current(), Some(parent));
    provider.restore(None);
}

#[test]
fn nested_dispatch_stacks_context_and_correlation() {
    let provider = Arc::new(ThreadCorrelation);
    let dispatcher = Arc::new(
        Dispatcher::new(Notifier::new(Arc::new(InvocationCounter::new())))
            .with_correlation(Arc::clone(&provider) as _),
    );

    let inner_observed: Arc<Mutex<Option<(Option<ComponentId>, Option<CorrelationId>)>>> =
        Arc::new(Mutex::new(None));
    let seen = Arc::clone(&inner_observed);
    let inner_table = MethodTable::builder()
        .typed_method::<Calculator, _>("inner", 0, move |_calc, _args| {
            let frame = context::current();
            *seen.lock() = Some((frame.component, frame.correlation));
            Ok(json!("inner done"))
        })
        .build();
    dispatcher
        .register(
            Arc::new(FixtureDefinition::new("inner", || Box::new(Calculator))) as _,
            inner_table,
            PoolConfig::new(1),
        )
        .expect("deploy inner");

    let outer_observed: Arc<Mutex<Vec<(Option<ComponentId>, Option<CorrelationId>)>>> =
        Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&outer_observed);
    let nested_dispatcher = Arc::clone(&dispatcher);
    let outer_table = MethodTable::builder()
        .typed_method::<Calculator, _>("outer", 0, move |_calc, _args| {
            let frame = context::current();
            seen.lock().push((frame.component, frame.correlation));

            let nested = nested_dispatcher.dispatch(&Request::local(
                ComponentId::named("inner"),
                MethodKey::new("inner", 0),
                vec![],
            ));
            assert!(nested.is_success());

            let frame = context::current();
            seen.lock().push((frame.component, frame.correlation));
            Ok(json!("outer done"))
        })
        .build();
    dispatcher
        .register(
            Arc::new(FixtureDefinition::new("outer", || Box::new(Calculator))) as _,
            outer_table,
            PoolConfig::new(1),
        )
        .expect("deploy outer");

    let response = dispatcher.dispatch(&Request::local(
        ComponentId::named("outer"),
        MethodKey::new("outer", 0),
        vec![],
    ));
    assert_eq!(response.value(), Some(&json!("outer done")));

    let outer_frames = outer_observed.lock().clone();
    let (outer_component, outer_correlation) = outer_frames[0].clone();
    assert_eq!(outer_component, Some(ComponentId::named("outer")));
    // The outer frame is restored exactly after the nested call.
    assert_eq!(outer_frames[1], outer_frames[0]);

    let (inner_component, inner_correlation) =
        inner_observed.lock().clone().expect("inner observed");
    assert_eq!(inner_component, Some(ComponentId::named("inner")));
    // The nested call got its own child id, not the outer one.
    assert_ne!(inner_correlation, outer_correlation);

    assert_eq!(provider.current(), None);
    assert!(context::operation_state().is_idle());
}
