//! Per-call, thread-scoped invocation context.
//!
//! Every dispatch swaps a [`CallContext`] onto the calling thread for
//! the duration of the business call and restores the previous one on
//! the way out — on every exit path, including panics. The swap is a
//! token-based scoped acquisition: [`enter`] returns a [`ContextGuard`]
//! holding the saved frame, and dropping the guard reinstalls it.
//!
//! ```text
//! frame A (caller)
//!   └─ enter(B) ──► frame B active        ┐
//!        └─ enter(C) ──► frame C active   │ nested dispatch
//!        ◄─ drop guard ── frame B again   │ stacks and unstacks
//!   ◄─ drop guard ──── frame A again      ┘
//! ```
//!
//! A single thread may host multiple logical call frames (a local call
//! chained from a remote call), which is why the guard carries the
//! saved frame explicitly instead of relying on ambient thread-local
//! nesting.
//!
//! # Operation-State Discipline
//!
//! The dispatcher installs [`OperationState::BusinessMethod`] around
//! every business call; user code never observes anything else from
//! inside a method body. The completion phases are reserved for
//! transaction-synchronization integration via
//! [`enter_completion_phase`], which rejects non-completion states.

use foundry_component::OperationState;
use foundry_types::{ComponentId, CorrelationId};
use std::cell::RefCell;
use std::marker::PhantomData;

thread_local! {
    static CURRENT: RefCell<CallContext> = RefCell::new(CallContext::default());
}

/// The thread-scoped state one call observes.
///
/// The default frame (no call active) has no component, no interface,
/// [`OperationState::Idle`], and no correlation id.
///
/// # Example
///
/// ```
/// use foundry_runtime::context::{self, CallContext};
/// use foundry_component::OperationState;
/// use foundry_types::ComponentId;
///
/// let frame = CallContext {
///     component: Some(ComponentId::named("account")),
///     invoked_interface: Some("Account".into()),
///     state: OperationState::BusinessMethod,
///     correlation: None,
/// };
///
/// let guard = context::enter(frame);
/// assert!(context::operation_state().is_business());
/// drop(guard);
/// assert!(context::operation_state().is_idle());
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CallContext {
    /// Component whose environment is installed for this call.
    ///
    /// This is the call's classloader-equivalent: it names whose
    /// deployment the thread is currently executing inside.
    pub component: Option<ComponentId>,
    /// Business interface the caller invoked through, if any.
    pub invoked_interface: Option<String>,
    /// Lifecycle phase governing which container services are legal.
    pub state: OperationState,
    /// Correlation id active for this call, when tracing is on.
    pub correlation: Option<CorrelationId>,
}

impl CallContext {
    /// Builds the frame the dispatcher installs around a business call.
    #[must_use]
    pub fn business(
        component: ComponentId,
        invoked_interface: Option<String>,
        correlation: Option<CorrelationId>,
    ) -> Self {
        Self {
            component: Some(component),
            invoked_interface,
            state: OperationState::BusinessMethod,
            correlation,
        }
    }
}

/// Token holding the frame saved by [`enter`].
///
/// Dropping the guard reinstalls the saved frame. Guards must be
/// dropped in reverse order of creation (scope them, as the dispatcher
/// does); the type is `!Send` so a frame cannot be restored onto a
/// different thread than it was saved from.
#[derive(Debug)]
pub struct ContextGuard {
    saved: Option<CallContext>,
    // Pins the guard to the thread whose frame it saved.
    _not_send: PhantomData<*const ()>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            CURRENT.with(|current| *current.borrow_mut() = saved);
        }
    }
}

/// Saves the current frame, installs `frame`, and returns the token
/// that restores the saved one.
#[must_use]
pub fn enter(frame: CallContext) -> ContextGuard {
    let saved = CURRENT.with(|current| current.replace(frame));
    ContextGuard {
        saved: Some(saved),
        _not_send: PhantomData,
    }
}

/// Moves the current frame into a completion phase, keeping every
/// other field.
///
/// This is the seam for transaction-manager synchronization callbacks:
/// the integration installs [`OperationState::BeforeCompletion`] /
/// [`OperationState::AfterCompletion`] around its callbacks so
/// components can tell the phases apart. Business code never runs
/// under a completion phase — the dispatcher always installs
/// [`OperationState::BusinessMethod`].
///
/// # Panics
///
/// Panics if `state` is not a completion phase; moving the thread into
/// any other state bypasses the dispatcher's discipline.
#[must_use]
pub fn enter_completion_phase(state: OperationState) -> ContextGuard {
    assert!(
        state.is_completion_phase(),
        "only completion phases may be entered directly, got {state}"
    );
    let mut frame = current();
    frame.state = state;
    enter(frame)
}

/// Returns a snapshot of the current thread's frame.
#[must_use]
pub fn current() -> CallContext {
    CURRENT.with(|current| current.borrow().clone())
}

/// Returns the current thread's operation state.
#[must_use]
pub fn operation_state() -> OperationState {
    CURRENT.with(|current| current.borrow().state)
}
