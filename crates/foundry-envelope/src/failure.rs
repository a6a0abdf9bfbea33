//! Dispatch failure taxonomy.
//!
//! The dispatcher is the single point where raw failures from user
//! code and infrastructure are caught and classified. Nothing above it
//! ever sees a panic or a concrete error type — only a sealed
//! [`Response`](crate::Response) carrying one of these categories.
//!
//! # Categories
//!
//! | Variant | Code | Recoverable | Instance |
//! |---------|------|-------------|----------|
//! | [`Failure::Application`] | `FAILURE_APPLICATION` | Yes | released |
//! | [`Failure::System`] | `FAILURE_SYSTEM` | No | discarded |
//! | [`Failure::Pool`] | `FAILURE_POOL` | Yes | n/a (never leased) |
//! | [`Failure::TargetRemoved`] | `FAILURE_TARGET_REMOVED` | No | already gone |
//! | [`Failure::MethodNotFound`] | `FAILURE_METHOD_NOT_FOUND` | No | n/a |
//!
//! # Application vs System
//!
//! An application failure is a *declared* business outcome: the method
//! returned its error type. It is re-raised to the caller with its
//! identity intact and the instance goes back to the pool. A system
//! failure is everything else — a panic, a binding mismatch, corrupted
//! state — and the instance that produced it is discarded so the
//! corruption cannot be reused.

use foundry_types::{ComponentId, ErrorCode, InstanceId, MethodKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A declared business failure, re-raisable with full fidelity.
///
/// This is the error type component methods return on expected
/// business outcomes (insufficient funds, version conflict). It is
/// serializable end to end so a remote caller re-raises exactly what
/// the method produced.
///
/// # Example
///
/// ```
/// use foundry_envelope::BusinessError;
/// use serde_json::json;
///
/// let err = BusinessError::new("INSUFFICIENT_FUNDS", "balance is 12.50")
///     .with_detail(json!({"balance": 12.50, "requested": 40.00}));
/// assert_eq!(err.code, "INSUFFICIENT_FUNDS");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{code}: {message}")]
pub struct BusinessError {
    /// Stable business error code, chosen by the component author.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Optional structured detail for the caller.
    pub detail: Option<Value>,
}

impl BusinessError {
    /// Creates a new business error.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            detail: None,
        }
    }

    /// Attaches structured detail.
    #[must_use]
    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

/// Coarse failure category, for callers that only branch on kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureCategory {
    /// Declared business failure.
    Application,
    /// Undeclared failure; the backing instance was discarded.
    System,
    /// Pool acquisition/release infrastructure failure.
    Pool,
    /// The addressed instance no longer exists.
    TargetRemoved,
    /// No descriptor for the requested method.
    MethodNotFound,
}

/// Classified dispatch failure.
///
/// Constructed only by the dispatcher's classification step, never by
/// catching concrete error types downstream.
///
/// # Example
///
/// ```
/// use foundry_envelope::{BusinessError, Failure, FailureCategory};
///
/// let failure = Failure::Application(BusinessError::new("CONFLICT", "stale version"));
/// assert_eq!(failure.category(), FailureCategory::Application);
/// assert!(failure.is_application());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum Failure {
    /// The method ran and returned its declared error type.
    #[error("application failure: {0}")]
    Application(BusinessError),

    /// Undeclared failure: panic in user code, argument binding
    /// mismatch, or container-detected corruption. Reported
    /// generically with the cause attached for diagnostics.
    #[error("system failure: {message}")]
    System {
        /// Diagnostic cause. Not a stable contract.
        message: String,
    },

    /// Instance acquisition or release could not complete.
    ///
    /// Carries the pool error's code and message; the target's
    /// logical state is not affected.
    #[error("pool failure: {code}: {message}")]
    Pool {
        /// The pool error's [`ErrorCode`] code.
        code: String,
        /// The pool error's message.
        message: String,
    },

    /// The caller addressed an instance that was already destroyed.
    ///
    /// Reported distinctly so callers can tell "already gone" from
    /// "call failed".
    #[error("target removed: {0}")]
    TargetRemoved(InstanceId),

    /// The method table had no descriptor for the requested key.
    ///
    /// A deployment/metadata defect: rare, and loud at the dispatch
    /// boundary.
    #[error("no descriptor for {method} on {component}")]
    MethodNotFound {
        /// Component the request addressed.
        component: ComponentId,
        /// Method key that failed to resolve.
        method: MethodKey,
    },
}

impl Failure {
    /// Returns the coarse category of this failure.
    #[must_use]
    pub fn category(&self) -> FailureCategory {
        match self {
            Self::Application(_) => FailureCategory::Application,
            Self::System { .. } => FailureCategory::System,
            Self::Pool { .. } => FailureCategory::Pool,
            Self::TargetRemoved(_) => FailureCategory::TargetRemoved,
            Self::MethodNotFound { .. } => FailureCategory::MethodNotFound,
        }
    }

    /// Returns `true` for a declared business failure.
    #[must_use]
    pub fn is_application(&self) -> bool {
        matches!(self, Self::Application(_))
    }

    /// Returns `true` for an undeclared (instance-discarding) failure.
    #[must_use]
    pub fn is_system(&self) -> bool {
        matches!(self, Self::System { .. })
    }

    /// Returns `true` for a pool infrastructure failure.
    #[must_use]
    pub fn is_pool(&self) -> bool {
        matches!(self, Self::Pool { .. })
    }

    /// Returns `true` if the addressed target was already destroyed.
    #[must_use]
    pub fn is_target_removed(&self) -> bool {
        matches!(self, Self::TargetRemoved(_))
    }

    /// Returns the business error, if this is an application failure.
    #[must_use]
    pub fn as_business(&self) -> Option<&BusinessError> {
        match self {
            Self::Application(err) => Some(err),
            _ => None,
        }
    }
}

impl ErrorCode for Failure {
    fn code(&self) -> &'static str {
        match self {
            Self::Application(_) => "FAILURE_APPLICATION",
            Self::System { .. } => "FAILURE_SYSTEM",
            Self::Pool { .. } => "FAILURE_POOL",
            Self::TargetRemoved(_) => "FAILURE_TARGET_REMOVED",
            Self::MethodNotFound { .. } => "FAILURE_METHOD_NOT_FOUND",
        }
    }

    fn is_recoverable(&self) -> bool {
        // Business outcomes can be compensated for; a momentarily
        // exhausted pool can be retried. The rest need a fix upstream.
        matches!(self, Self::Application(_) | Self::Pool { .. })
    }
}
