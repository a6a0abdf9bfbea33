//! Testing harnesses for component definitions.
//!
//! Drives a definition's method table directly — create, invoke,
//! teardown — without the runtime's pool, context, or notifier. Use
//! this to unit-test component logic deterministically; integration
//! with the dispatcher belongs in runtime-level tests.
//!
//! # Example
//!
//! ```
//! use foundry_component::testing::{DefinitionTestHarness, FixtureDefinition};
//! use foundry_component::MethodTable;
//! use serde_json::json;
//!
//! struct Counter {
//!     count: i64,
//! }
//!
//! let definition = FixtureDefinition::new("counter", || Box::new(Counter { count: 0 }));
//! let table = MethodTable::builder()
//!     .typed_method::<Counter, _>("increment", 0, |c, _args| {
//!         c.count += 1;
//!         Ok(json!(c.count))
//!     })
//!     .build();
//!
//! let mut harness = DefinitionTestHarness::new(definition, table);
//! assert_eq!(harness.invoke("increment", vec![]).expect("ok"), json!(1));
//! assert_eq!(harness.invoke("increment", vec![]).expect("ok"), json!(2));
//! assert_eq!(harness.invocation_log().len(), 2);
//! ```

use crate::{BoxedInstance, ComponentDefinition, DefinitionError, MethodTable};
use foundry_envelope::BusinessError;
use foundry_types::{ComponentId, MethodKey};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A closure-built definition for tests.
///
/// Counts teardowns so tests can assert the exactly-once teardown
/// contract. Share it with a pool via `Arc` and query
/// [`teardown_count`](Self::teardown_count) afterward.
pub struct FixtureDefinition {
    component: ComponentId,
    factory: Box<dyn Fn() -> Result<BoxedInstance, DefinitionError> + Send + Sync>,
    teardowns: AtomicUsize,
}

impl FixtureDefinition {
    /// Creates a fixture whose factory always succeeds.
    #[must_use]
    pub fn new(
        name: &str,
        factory: impl Fn() -> BoxedInstance + Send + Sync + 'static,
    ) -> Self {
        Self {
            component: ComponentId::named(name),
            factory: Box::new(move || Ok(factory())),
            teardowns: AtomicUsize::new(0),
        }
    }

    /// Creates a fixture whose factory always fails.
    ///
    /// Useful for exercising instantiation-failure paths.
    #[must_use]
    pub fn failing(name: &str, reason: &str) -> Self {
        let reason = reason.to_string();
        Self {
            component: ComponentId::named(name),
            factory: Box::new(move || Err(DefinitionError::CreateFailed(reason.clone()))),
            teardowns: AtomicUsize::new(0),
        }
    }

    /// Returns how many instances have been torn down.
    #[must_use]
    pub fn teardown_count(&self) -> usize {
        self.teardowns.load(Ordering::SeqCst)
    }
}

impl ComponentDefinition for FixtureDefinition {
    fn component(&self) -> &ComponentId {
        &self.component
    }

    fn create(&self) -> Result<BoxedInstance, DefinitionError> {
        (self.factory)()
    }

    fn teardown(&self, instance: BoxedInstance) {
        self.teardowns.fetch_add(1, Ordering::SeqCst);
        drop(instance);
    }
}

impl std::fmt::Debug for FixtureDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixtureDefinition")
            .field("component", &self.component)
            .field("teardowns", &self.teardown_count())
            .finish_non_exhaustive()
    }
}

/// One recorded harness invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationRecord {
    /// Resolved method identity.
    pub method: MethodKey,
    /// Argument snapshot.
    pub args: Vec<Value>,
}

/// Engine-independent harness for one definition + method table.
///
/// Creates a single instance up front and invokes methods against it
/// synchronously. Teardown runs exactly once, on drop (or via
/// [`finish`](Self::finish) to make it explicit).
pub struct DefinitionTestHarness<D: ComponentDefinition> {
    definition: D,
    table: MethodTable,
    instance: Option<BoxedInstance>,
    log: Vec<InvocationRecord>,
}

impl<D: ComponentDefinition> DefinitionTestHarness<D> {
    /// Creates the harness and one worker instance.
    ///
    /// # Panics
    ///
    /// Panics if the definition cannot create an instance — a broken
    /// fixture, not a test outcome.
    #[must_use]
    pub fn new(definition: D, table: MethodTable) -> Self {
        let instance = definition
            .create()
            .expect("definition must create an instance");
        Self {
            definition,
            table,
            instance: Some(instance),
            log: Vec::new(),
        }
    }

    /// Invokes a method by name, deriving the key from the argument
    /// count.
    ///
    /// # Errors
    ///
    /// The method's declared [`BusinessError`].
    ///
    /// # Panics
    ///
    /// Panics if the table has no descriptor for `name/arity` — in a
    /// harness that is a fixture defect, not a scenario under test.
    pub fn invoke(&mut self, name: &str, args: Vec<Value>) -> Result<Value, BusinessError> {
        let key = MethodKey::new(name, args.len());
        let descriptor = self
            .table
            .resolve(&key)
            .cloned()
            .unwrap_or_else(|| panic!("no descriptor for {key}"));

        self.log.push(InvocationRecord {
            method: key,
            args: args.clone(),
        });

        let instance = self.instance.as_mut().expect("instance already torn down");
        descriptor.invoke(instance.as_mut(), &args)
    }

    /// Returns all invocations recorded so far.
    #[must_use]
    pub fn invocation_log(&self) -> &[InvocationRecord] {
        &self.log
    }

    /// Returns the component identity under test.
    #[must_use]
    pub fn component(&self) -> &ComponentId {
        self.definition.component()
    }

    /// Tears down the instance explicitly.
    ///
    /// Equivalent to dropping the harness; provided so tests can mark
    /// the teardown point.
    pub fn finish(self) {}
}

impl<D: ComponentDefinition> Drop for DefinitionTestHarness<D> {
    fn drop(&mut self) {
        if let Some(instance) = self.instance.take() {
            self.definition.teardown(instance);
        }
    }
}
