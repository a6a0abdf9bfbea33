//! Core types for Foundry.
//!
//! This crate provides the foundational identifier types for the
//! Foundry managed-component runtime.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Deployment SDK Layer                       │
//! │  (External, SemVer stable, safe to depend on)               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  foundry-types     : ID types, ErrorCode          ◄── HERE  │
//! │  foundry-envelope  : Request, Response, Failure             │
//! │  foundry-component : definitions, method tables             │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Runtime Layer                            │
//! │  (Internal implementation, NOT for components)               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  foundry-runtime   : pool, context, dispatcher, notifier    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Why an SDK split?
//!
//! Component authors and transport integrations depend only on the
//! SDK crates. The runtime crate can change its pooling strategy or
//! dispatch internals without breaking deployed components.
//!
//! # Identifier Design
//!
//! All identifiers are UUID-based for:
//!
//! - **Network compatibility**: Safe to transmit across processes
//! - **Determinism where it matters**: Named components resolve to
//!   the same UUID everywhere (v5); per-instance ids are random (v4)
//! - **Serialization**: First-class serde support
//!
//! # Example
//!
//! ```
//! use foundry_types::{ComponentId, InstanceId, CorrelationId, MethodKey};
//!
//! // Named components have deterministic UUIDs
//! let calc = ComponentId::named("calculator");
//! assert_eq!(calc, ComponentId::named("calculator"));
//!
//! // Per-instance ids are random
//! let instance = InstanceId::new();
//!
//! // Correlation ids tie call chains together for tracing
//! let correlation = CorrelationId::new();
//!
//! // Method identity is a signature key, not a reflective handle
//! let add = MethodKey::new("add", 2);
//! assert_eq!(add.signature(), "add/2");
//! # let _ = (instance, correlation);
//! ```

mod error;
mod id;

pub use error::{assert_error_code, assert_error_codes, ErrorCode};
pub use id::{ComponentId, CorrelationId, InstanceId, InvocationNumber, MethodKey};
