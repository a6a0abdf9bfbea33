//! Runtime layer errors.
//!
//! Errors raised while deploying components into a dispatcher. Failures
//! of individual dispatches never surface here — those are classified
//! into the response envelope's failure taxonomy.
//!
//! # Error Codes
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`RuntimeError::AlreadyDeployed`] | `RUNTIME_ALREADY_DEPLOYED` | No |
//! | [`RuntimeError::DeploymentFailed`] | `RUNTIME_DEPLOYMENT_FAILED` | Yes |

use crate::pool::PoolError;
use foundry_types::{ComponentId, ErrorCode};
use thiserror::Error;

/// Runtime layer error.
///
/// # Example
///
/// ```
/// use foundry_runtime::RuntimeError;
/// use foundry_types::{ComponentId, ErrorCode};
///
/// let err = RuntimeError::AlreadyDeployed(ComponentId::named("account"));
/// assert_eq!(err.code(), "RUNTIME_ALREADY_DEPLOYED");
/// assert!(!err.is_recoverable());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// A component with this identity is already deployed.
    #[error("component already deployed: {0}")]
    AlreadyDeployed(ComponentId),

    /// The component's pool could not be built.
    ///
    /// Carries the underlying pool error; eager instance creation is
    /// the usual culprit and may succeed on retry.
    #[error("deploying {component} failed: {source}")]
    DeploymentFailed {
        /// Component that failed to deploy.
        component: ComponentId,
        /// Pool construction error.
        source: PoolError,
    },
}

impl ErrorCode for RuntimeError {
    fn code(&self) -> &'static str {
        match self {
            Self::AlreadyDeployed(_) => "RUNTIME_ALREADY_DEPLOYED",
            Self::DeploymentFailed { .. } => "RUNTIME_DEPLOYMENT_FAILED",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::AlreadyDeployed(_) => false,
            Self::DeploymentFailed { source, .. } => source.is_recoverable(),
        }
    }
}
