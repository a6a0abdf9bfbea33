//! Component abstraction layer for Foundry.
//!
//! This crate defines what a deployed component *is* to the runtime:
//! an identity, a factory/teardown pair for opaque worker instances,
//! and an immutable deployment-time method table the dispatcher
//! resolves against.
//!
//! # Crate Architecture
//!
//! This crate is part of the **Deployment SDK** layer:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Deployment SDK Layer                       │
//! │  (External, SemVer stable, safe to depend on)               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  foundry-types     : ID types, ErrorCode                    │
//! │  foundry-envelope  : Request, Response, Failure             │
//! │  foundry-component : definitions, method tables   ◄── HERE  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Component Model
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     foundry-runtime                      │
//! │   pool ──create/teardown──► ComponentDefinition          │
//! │   dispatcher ──resolve────► MethodTable                  │
//! │                └──invoke──► MethodDescriptor ──► &mut T  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Instances are `Box<dyn Any + Send>` to the runtime; only the
//! component's own descriptors downcast to the concrete type. The
//! runtime pools instances, installs the per-call
//! [`OperationState`], and classifies every failure — a descriptor
//! has exactly two failure channels (declared
//! [`BusinessError`](foundry_envelope::BusinessError), or a panic
//! classified as a system failure).
//!
//! # Example: deploying a calculator
//!
//! ```
//! use foundry_component::{ComponentDefinition, MethodTable};
//! use foundry_component::testing::FixtureDefinition;
//! use serde_json::json;
//!
//! struct Calculator;
//!
//! let definition = FixtureDefinition::new("calculator", || Box::new(Calculator));
//! let table = MethodTable::builder()
//!     .typed_method::<Calculator, _>("add", 2, |_calc, args| {
//!         let a = args[0].as_i64().unwrap_or(0);
//!         let b = args[1].as_i64().unwrap_or(0);
//!         Ok(json!(a + b))
//!     })
//!     .build();
//!
//! assert_eq!(definition.component().name, "calculator");
//! assert_eq!(table.len(), 1);
//! ```

mod definition;
mod method;
mod state;
pub mod testing;

pub use definition::{BoxedInstance, ComponentDefinition, DefinitionError};
pub use method::{MethodDescriptor, MethodFn, MethodTable, MethodTableBuilder};
pub use state::OperationState;
