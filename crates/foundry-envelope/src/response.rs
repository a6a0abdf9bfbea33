//! Response envelope, built incrementally by the dispatcher.
//!
//! A [`Response`] is shared by reference while the dispatcher works
//! through the call and returned by value to the caller once dispatch
//! completes. Setters are order-independent and last-write-wins; the
//! dispatcher guarantees the envelope is fully populated before it
//! leaves the dispatch boundary, and nothing mutates it afterward.

use crate::Failure;
use foundry_types::InstanceId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result envelope for a single dispatch.
///
/// Exactly one of `value`/`failure` is meaningful after dispatch
/// completes: a populated failure means the value is absent, and a
/// successful void method leaves both unset.
///
/// # Example
///
/// ```
/// use foundry_envelope::Response;
/// use serde_json::json;
///
/// let mut response = Response::new();
/// response.set_value(Some(json!(5)));
/// assert!(response.is_success());
/// assert_eq!(response.into_result().expect("success"), Some(json!(5)));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Response {
    value: Option<Value>,
    instance: Option<InstanceId>,
    removed: bool,
    failure: Option<Failure>,
}

impl Response {
    /// Creates an empty response envelope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the return value. `None` for void methods.
    pub fn set_value(&mut self, value: Option<Value>) {
        self.value = value;
    }

    /// Records which pooled instance served the call.
    pub fn set_instance(&mut self, instance: Option<InstanceId>) {
        self.instance = instance;
    }

    /// Marks that the backing instance was destroyed as a side effect
    /// of this call.
    pub fn mark_removed(&mut self) {
        self.removed = true;
    }

    /// Records the classified failure.
    pub fn set_failure(&mut self, failure: Failure) {
        self.failure = Some(failure);
    }

    /// Returns the return value, if any.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Returns the serving instance id, if recorded.
    #[must_use]
    pub fn instance(&self) -> Option<InstanceId> {
        self.instance
    }

    /// Returns `true` if the backing instance was destroyed.
    #[must_use]
    pub fn removed(&self) -> bool {
        self.removed
    }

    /// Returns the classified failure, if the dispatch failed.
    #[must_use]
    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    /// Returns `true` when no failure is recorded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Collapses the envelope into a plain result.
    ///
    /// # Errors
    ///
    /// The recorded [`Failure`], if the dispatch failed.
    pub fn into_result(self) -> Result<Option<Value>, Failure> {
        match self.failure {
            Some(failure) => Err(failure),
            None => Ok(self.value),
        }
    }
}
