//! Envelope model for Foundry.
//!
//! This crate provides the request/response envelope and the failure
//! taxonomy used uniformly for local and remote calls in the Foundry
//! managed-component runtime.
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
//! │  foundry-envelope  : Request, Response, Failure  ◄── HERE   │
//! │  foundry-component : definitions, method tables             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Dispatch Data Flow
//!
//! ```text
//! caller ──Request──► Dispatcher ──► pool / context / invoke
//!                          │
//! caller ◄──Response───────┘  (value | Failure, removed flag)
//! ```
//!
//! The dispatcher never throws past its boundary: every outcome,
//! including panics in user code, arrives here as a sealed
//! [`Response`] whose [`Failure`] is one of five categories
//! (application, system, pool, target-removed, method-not-found).
//!
//! # Local vs Remote
//!
//! One envelope shape serves both origins. Local requests carry
//! arguments in memory; remote requests additionally carry the eagerly
//! encoded wire form, and wire-origin requests decode lazily on first
//! access. See [`Request`] for the exact matrix.
//!
//! # Usage
//!
//! ```
//! use foundry_envelope::{JsonCodec, Request};
//! use foundry_types::{ComponentId, MethodKey};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! // Local call: no encoding cost
//! let local = Request::local(
//!     ComponentId::named("calculator"),
//!     MethodKey::new("add", 2),
//!     vec![json!(2), json!(3)],
//! );
//!
//! // Remote call: arguments encoded at construction, or the
//! // request is never created
//! let remote = Request::remote(
//!     ComponentId::named("calculator"),
//!     MethodKey::new("add", 2),
//!     vec![json!(2), json!(3)],
//!     Arc::new(JsonCodec),
//! )
//! .expect("encodable args");
//! # let _ = (local, remote);
//! ```

mod codec;
mod error;
mod failure;
mod request;
mod response;

pub use codec::{ArgCodec, JsonCodec};
pub use error::EnvelopeError;
pub use failure::{BusinessError, Failure, FailureCategory};
pub use request::Request;
pub use response::Response;
