//! Operation state for the per-call context.
//!
//! The operation state records which phase of the component lifecycle
//! the current thread is executing in. It governs which container
//! services are legal to call from that point: user business code
//! always observes [`BusinessMethod`](OperationState::BusinessMethod);
//! the completion phases are installed only by container-privileged
//! runtime paths around transaction synchronization.
//!
//! # Phases
//!
//! | State | Installed by | Nested dispatch legal |
//! |-------|--------------|----------------------|
//! | `Idle` | default (no call active) | No |
//! | `DependencyInjection` | runtime, during wiring | No |
//! | `LifecycleCallback` | runtime, around create/destroy hooks | Yes |
//! | `BusinessMethod` | dispatcher, around every business call | Yes |
//! | `BeforeCompletion` | runtime only, pre-commit sync | No |
//! | `AfterCompletion` | runtime only, post-commit sync | No |

use serde::{Deserialize, Serialize};

/// Lifecycle phase of the current call, as observed on the calling
/// thread.
///
/// # Example
///
/// ```
/// use foundry_component::OperationState;
///
/// assert!(OperationState::BusinessMethod.allows_dispatch());
/// assert!(!OperationState::BeforeCompletion.allows_dispatch());
/// assert!(OperationState::AfterCompletion.is_completion_phase());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OperationState {
    /// No call is active on this thread.
    #[default]
    Idle,

    /// The runtime is wiring a fresh instance.
    ///
    /// Container services that assume an active call are not yet
    /// available.
    DependencyInjection,

    /// A lifecycle hook (post-create, pre-destroy) is running.
    LifecycleCallback,

    /// A business method is running. This is the only state user
    /// code ever observes from inside a method body.
    BusinessMethod,

    /// Pre-commit transaction synchronization. Container-privileged.
    BeforeCompletion,

    /// Post-commit transaction synchronization. Container-privileged.
    AfterCompletion,
}

impl OperationState {
    /// Returns `true` if no call is active.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Returns `true` while a business method runs.
    #[must_use]
    pub fn is_business(&self) -> bool {
        matches!(self, Self::BusinessMethod)
    }

    /// Returns `true` for the transaction-synchronization phases.
    #[must_use]
    pub fn is_completion_phase(&self) -> bool {
        matches!(self, Self::BeforeCompletion | Self::AfterCompletion)
    }

    /// Returns `true` if starting a nested dispatch is legal in this
    /// phase.
    ///
    /// Business methods and lifecycle callbacks may call into other
    /// components; injection and the completion phases may not.
    #[must_use]
    pub fn allows_dispatch(&self) -> bool {
        matches!(self, Self::BusinessMethod | Self::LifecycleCallback)
    }
}

impl std::fmt::Display for OperationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::DependencyInjection => "dependency-injection",
            Self::LifecycleCallback => "lifecycle-callback",
            Self::BusinessMethod => "business-method",
            Self::BeforeCompletion => "before-completion",
            Self::AfterCompletion => "after-completion",
        };
        f.write_str(name)
    }
}
