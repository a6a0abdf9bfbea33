//! Invocation dispatcher: the central dispatch state machine.
//!
//! The dispatcher owns one deployment (definition + method table +
//! pool) per registered component and turns every [`Request`] into a
//! sealed [`Response`]:
//!
//! ```text
//! dispatch(Request)
//!   ├─ 1. resolve method ──────────── miss ► MethodNotFound
//!   ├─ 2. retired target? ─────────── yes ─► TargetRemoved
//!   │     pool.acquire() ──────────── err ─► Pool failure
//!   ├─ 3. swap call context (component, interface, BusinessMethod,
//!   │     child correlation id)
//!   ├─ 4. notifier.begin ──► #n
//!   ├─ 5. invoke descriptor against the leased instance
//!   ├─ 6. classify: value | Application | System
//!   ├─ 7. notifier.end / notifier.error (#n), parent id restored
//!   ├─ 8. restore prior context (guard drop, every exit path)
//!   ├─ 9. pool.release / pool.discard (+ removed flag)
//!   └─ 10. sealed Response
//! ```
//!
//! Nothing escapes the boundary raw: a panic in user code, a binding
//! mismatch, or an infrastructure fault all arrive at the caller as a
//! classified failure inside the envelope. A system failure discards
//! the backing instance so corrupted state is never reused; an
//! application failure releases it.

use crate::context::{self, CallContext};
use crate::correlation::CorrelationProvider;
use crate::error::RuntimeError;
use crate::notifier::{panic_message, Notifier};
use crate::pool::{InstancePool, PoolConfig, PoolLease, PoolStats};
use foundry_component::{ComponentDefinition, MethodDescriptor, MethodTable};
use foundry_envelope::{Failure, Request, Response};
use foundry_types::{ComponentId, ErrorCode};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// One registered component: its definition, resolved method table,
/// and instance pool.
struct Deployment {
    definition: Arc<dyn ComponentDefinition>,
    table: MethodTable,
    pool: InstancePool,
}

/// Outcome of the invocation step, before sealing.
enum Invoked {
    Value(Option<Value>),
    Failed { failure: Failure, discard: bool },
}

/// Registry of deployed components plus the per-call dispatch engine.
///
/// # Example
///
/// ```
/// use foundry_component::testing::FixtureDefinition;
/// use foundry_component::MethodTable;
/// use foundry_envelope::Request;
/// use foundry_runtime::{Dispatcher, InvocationCounter, Notifier, PoolConfig};
/// use foundry_types::{ComponentId, MethodKey};
/// use serde_json::json;
/// use std::sync::Arc;
///
/// struct Calculator;
///
/// let dispatcher = Dispatcher::new(Notifier::new(Arc::new(InvocationCounter::new())));
/// let table = MethodTable::builder()
///     .typed_method::<Calculator, _>("add", 2, |_calc, args| {
///         Ok(json!(args[0].as_i64().unwrap_or(0) + args[1].as_i64().unwrap_or(0)))
///     })
///     .build();
/// dispatcher
///     .register(
///         Arc::new(FixtureDefinition::new("calculator", || Box::new(Calculator))),
///         table,
///         PoolConfig::new(1),
///     )
///     .expect("deploy");
///
/// let request = Request::local(
///     ComponentId::named("calculator"),
///     MethodKey::new("add", 2),
///     vec![json!(2), json!(3)],
/// );
/// let response = dispatcher.dispatch(&request);
/// assert_eq!(response.value(), Some(&json!(5)));
/// ```
pub struct Dispatcher {
    deployments: RwLock<HashMap<Uuid, Arc<Deployment>>>,
    notifier: Notifier,
    correlation: Option<Arc<dyn CorrelationProvider>>,
}

impl Dispatcher {
    /// Creates a dispatcher emitting events through `notifier`, with
    /// no correlation provider.
    #[must_use]
    pub fn new(notifier: Notifier) -> Self {
        Self {
            deployments: RwLock::new(HashMap::new()),
            notifier,
            correlation: None,
        }
    }

    /// Attaches a correlation-id provider.
    ///
    /// Without one, dispatches carry no correlation ids; everything
    /// else behaves identically.
    #[must_use]
    pub fn with_correlation(mut self, provider: Arc<dyn CorrelationProvider>) -> Self {
        self.correlation = Some(provider);
        self
    }

    /// Deploys a component: builds its pool and registers its method
    /// table under the definition's identity.
    ///
    /// # Errors
    ///
    /// - [`RuntimeError::AlreadyDeployed`] if the identity is taken
    /// - [`RuntimeError::DeploymentFailed`] if eager pool construction
    ///   fails
    pub fn register(
        &self,
        definition: Arc<dyn ComponentDefinition>,
        table: MethodTable,
        config: PoolConfig,
    ) -> Result<(), RuntimeError> {
        let component = definition.component().clone();
        if self.deployments.read().contains_key(&component.uuid) {
            return Err(RuntimeError::AlreadyDeployed(component));
        }

        let pool = InstancePool::new(Arc::clone(&definition), config).map_err(|source| {
            RuntimeError::DeploymentFailed {
                component: component.clone(),
                source,
            }
        })?;

        let deployment = Arc::new(Deployment {
            definition,
            table,
            pool,
        });
        // Racing registrations of the same identity resolve here.
        let mut deployments = self.deployments.write();
        if deployments.contains_key(&component.uuid) {
            deployment.pool.shutdown();
            return Err(RuntimeError::AlreadyDeployed(component));
        }
        deployments.insert(component.uuid, deployment);
        debug!(%component, "component deployed");
        Ok(())
    }

    /// Dispatches a request with event emission enabled.
    ///
    /// Never panics and never returns a raw error: the response always
    /// comes back sealed, with either a value or a classified failure.
    pub fn dispatch(&self, request: &Request) -> Response {
        self.run(request, true)
    }

    /// Dispatches the local tail of an already-notified remote call.
    ///
    /// The transport that delivered the remote call has already
    /// emitted its begin event; emitting again here would double-count
    /// the invocation, so event emission is suppressed. Everything
    /// else — pooling, context, classification — is identical.
    pub fn dispatch_local_tail(&self, request: &Request) -> Response {
        self.run(request, false)
    }

    /// Returns pool accounting for a deployed component.
    #[must_use]
    pub fn pool_stats(&self, component: &ComponentId) -> Option<PoolStats> {
        self.deployments
            .read()
            .get(&component.uuid)
            .map(|deployment| deployment.pool.stats())
    }

    /// Shuts down every deployment's pool.
    pub fn shutdown(&self) {
        let deployments: Vec<Arc<Deployment>> =
            self.deployments.read().values().cloned().collect();
        for deployment in deployments {
            deployment.pool.shutdown();
        }
    }

    fn run(&self, request: &Request, notify: bool) -> Response {
        let component = request.target();
        let mut response = Response::new();
        debug!(%component, method = %request.method(), notify, "dispatching");

        let deployment = self.deployments.read().get(&component.uuid).cloned();
        let Some(deployment) = deployment else {
            error!(%component, method = %request.method(), "dispatch to unknown component");
            response.set_failure(Failure::MethodNotFound {
                component: component.clone(),
                method: request.method().clone(),
            });
            return response;
        };

        // Step 1: resolve the method identity.
        let Some(descriptor) = deployment.table.resolve(request.method()) else {
            error!(%component, method = %request.method(), "no descriptor for method");
            response.set_failure(Failure::MethodNotFound {
                component: component.clone(),
                method: request.method().clone(),
            });
            return response;
        };

        // Materialize arguments before anything is leased: a wire
        // decode failure must not cost an instance.
        let args = match request.args() {
            Ok(args) => args.to_vec(),
            Err(err) => {
                warn!(%component, method = %request.method(), %err, "argument decode failed");
                response.set_failure(Failure::System {
                    message: err.to_string(),
                });
                return response;
            }
        };

        // A binding mismatch is a metadata defect upstream; it never
        // reaches user code and never needs an instance.
        if args.len() != descriptor.arity() {
            response.set_failure(Failure::System {
                message: format!(
                    "binding mismatch: {} expects {} arguments, got {}",
                    descriptor.key(),
                    descriptor.arity(),
                    args.len()
                ),
            });
            return response;
        }

        // Step 2: a retired target fails before the pool is consulted.
        if let Some(instance) = request.instance() {
            if deployment.pool.is_retired(&instance) {
                response.set_failure(Failure::TargetRemoved(instance));
                return response;
            }
        }

        let lease = match deployment.pool.acquire() {
            Ok(lease) => lease,
            Err(err) => {
                warn!(%component, method = %request.method(), %err, "pool acquire failed");
                response.set_failure(Failure::Pool {
                    code: err.code().to_string(),
                    message: err.to_string(),
                });
                return response;
            }
        };
        response.set_instance(Some(lease.id()));

        // Steps 3-8: context swap, events, and the call itself. The
        // guard restores the prior frame on every exit path.
        let (outcome, lease) =
            self.invoke_in_context(request, descriptor, lease, args, notify);

        // Step 9: release on success or application failure, discard
        // on container-detected corruption.
        match outcome {
            Invoked::Value(value) => {
                response.set_value(value);
                self.give_back(&deployment, lease, &mut response, false);
            }
            Invoked::Failed { failure, discard } => {
                response.set_failure(failure);
                self.give_back(&deployment, lease, &mut response, discard);
            }
        }
        response
    }

    /// Steps 3-8: runs the resolved callable under the call context,
    /// emitting events when `notify` is set.
    fn invoke_in_context(
        &self,
        request: &Request,
        descriptor: &MethodDescriptor,
        mut lease: PoolLease,
        args: Vec<Value>,
        notify: bool,
    ) -> (Invoked, PoolLease) {
        let component = request.target();
        let provider = self.correlation.as_deref();

        // Step 3: save the parent correlation id and install a child,
        // then swap the thread's call frame.
        let parent_correlation = provider.and_then(CorrelationProvider::current);
        let call_correlation = provider.map(|p| {
            let child = p.new_child();
            p.restore(Some(child));
            child
        });
        let context_guard = context::enter(CallContext::business(
            component.clone(),
            request.invoked_interface().map(str::to_string),
            call_correlation,
        ));

        // Step 4: begin event, fresh invocation number.
        let number = notify.then(|| self.notifier.begin(component, &args));

        // Step 5: the call. A panic is contained here and classified.
        let called = catch_unwind(AssertUnwindSafe(|| {
            descriptor.invoke(lease.instance_mut(), &args)
        }));

        // Steps 6-7: classify, then emit exactly one of end or error.
        let outcome = match called {
            Ok(Ok(value)) => {
                let value = (!value.is_null()).then_some(value);
                if let Some(number) = number {
                    self.notifier.end(component, number, value.as_ref());
                }
                Invoked::Value(value)
            }
            Ok(Err(business)) => {
                let failure = Failure::Application(business);
                if let Some(number) = number {
                    self.notifier.error(component, number, &failure);
                }
                Invoked::Failed {
                    failure,
                    discard: false,
                }
            }
            Err(payload) => {
                let cause = panic_message(payload.as_ref());
                error!(%component, method = %request.method(), %cause, "invocation panicked");
                let failure = Failure::System {
                    message: format!("invocation panicked: {cause}"),
                };
                if let Some(number) = number {
                    self.notifier.error(component, number, &failure);
                }
                Invoked::Failed {
                    failure,
                    discard: true,
                }
            }
        };

        // Step 7, tail: the parent correlation id becomes current
        // again before the caller's frame is restored.
        if let Some(p) = provider {
            p.restore(parent_correlation);
        }

        // Step 8: reinstall the caller's frame.
        drop(context_guard);
        (outcome, lease)
    }

    /// Step 9: returns the lease to the pool, or retires it.
    fn give_back(
        &self,
        deployment: &Deployment,
        lease: PoolLease,
        response: &mut Response,
        discard: bool,
    ) {
        let component = deployment.definition.component();
        if discard {
            response.mark_removed();
            // Teardown hooks run user code; contain them like the
            // business call.
            let discarded = catch_unwind(AssertUnwindSafe(|| deployment.pool.discard(lease)));
            match discarded {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!(%component, %err, "discard failed"),
                Err(payload) => {
                    error!(
                        %component,
                        cause = %panic_message(payload.as_ref()),
                        "teardown panicked during discard"
                    );
                }
            }
        } else if let Err(err) = deployment.pool.release(lease) {
            warn!(%component, %err, "release failed");
            // A successful call with a failed release is still a
            // dispatch failure; a failed call keeps its own failure.
            if response.is_success() {
                response.set_failure(Failure::Pool {
                    code: err.code().to_string(),
                    message: err.to_string(),
                });
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("deployments", &self.deployments.read().len())
            .field("notifier", &self.notifier)
            .field("correlation", &self.correlation.is_some())
            .finish()
    }
}
