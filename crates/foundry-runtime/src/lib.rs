//! Foundry runtime: instance pooling, call-context propagation and
//! invocation dispatch.
//!
//! This crate is the engine behind the Deployment SDK crates — it
//! instantiates, pools, and invokes the components that
//! `foundry-component` describes, on behalf of local and remote
//! callers, and translates every user-code failure into the sealed
//! envelope `foundry-envelope` defines.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Deployment SDK Layer                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  foundry-types     : ID types, ErrorCode                    │
//! │  foundry-envelope  : Request, Response, Failure             │
//! │  foundry-component : definitions, method tables             │
//! ├─────────────────────────────────────────────────────────────┤
//! │                      Runtime Layer                           │
//! │  foundry-runtime   : pool, context, dispatch     ◄── HERE   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Dispatch Data Flow
//!
//! ```text
//! caller ──Request──► Dispatcher ──► InstancePool.acquire()
//!                         │              │
//!                         │         context::enter (swap frame)
//!                         │              │
//!                         │         Notifier.begin ──► listeners
//!                         │              │                (AuditTrail, …)
//!                         │         descriptor.invoke
//!                         │              │
//!                         │         Notifier.end / error
//!                         │              │
//!                         │         guard drop (restore frame)
//!                         │              │
//!                         │         release / discard
//! caller ◄──Response──────┘
//! ```
//!
//! # Threading Model
//!
//! Fully synchronous, thread-per-request: every dispatch runs on the
//! calling thread, and the only blocking point is pool acquisition
//! under exhaustion (bounded by the pool's wait policy). The pool is
//! the only shared mutable resource; the call context is thread-local
//! by construction.
//!
//! # Usage
//!
//! ```
//! use foundry_component::testing::FixtureDefinition;
//! use foundry_component::MethodTable;
//! use foundry_envelope::Request;
//! use foundry_runtime::{AuditTrail, Dispatcher, InvocationCounter, Notifier, PoolConfig};
//! use foundry_types::{ComponentId, MethodKey};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! struct Calculator;
//!
//! let trail = Arc::new(AuditTrail::new());
//! let notifier =
//!     Notifier::new(Arc::new(InvocationCounter::new())).with_listener(Arc::clone(&trail) as _);
//! let dispatcher = Dispatcher::new(notifier);
//!
//! dispatcher
//!     .register(
//!         Arc::new(FixtureDefinition::new("calculator", || Box::new(Calculator))),
//!         MethodTable::builder()
//!             .typed_method::<Calculator, _>("add", 2, |_calc, args| {
//!                 Ok(json!(args[0].as_i64().unwrap_or(0) + args[1].as_i64().unwrap_or(0)))
//!             })
//!             .build(),
//!         PoolConfig::new(4),
//!     )
//!     .expect("deploy");
//!
//! let response = dispatcher.dispatch(&Request::local(
//!     ComponentId::named("calculator"),
//!     MethodKey::new("add", 2),
//!     vec![json!(2), json!(3)],
//! ));
//! assert_eq!(response.value(), Some(&json!(5)));
//! assert_eq!(trail.recent(1).len(), 1);
//! ```

mod audit;
pub mod context;
mod correlation;
mod dispatcher;
mod error;
mod notifier;
mod pool;

pub use audit::{AuditOutcome, AuditRecord, AuditTrail};
pub use correlation::{CorrelationProvider, ThreadCorrelation};
pub use dispatcher::Dispatcher;
pub use error::RuntimeError;
pub use notifier::{DispatchListener, InvocationCounter, Notifier};
pub use pool::{
    EvictionHook, InstancePool, PoolConfig, PoolError, PoolLease, PoolStats, DEFAULT_MAX_WAIT,
};
