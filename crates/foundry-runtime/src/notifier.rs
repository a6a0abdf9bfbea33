//! Begin/end/error event emission.
//!
//! The notifier sits beside the dispatcher and tells auditing and
//! monitoring collaborators about every notified dispatch:
//!
//! ```text
//! begin(component, args) ──► fresh InvocationNumber
//!     └─ success ──► end(component, #n, result)
//!     └─ failure ──► error(component, #n, failure)
//! ```
//!
//! Exactly one begin is followed by exactly one of end or error,
//! sharing the same number, for every dispatch that has events
//! enabled. Listeners run synchronously in registration order; a
//! panicking listener is isolated and logged, never allowed to mask
//! the dispatch outcome.
//!
//! The number source is an injected [`InvocationCounter`] service, not
//! a static: tests construct their own counter and reset it without
//! bleeding state across each other.

use foundry_envelope::Failure;
use foundry_types::{ComponentId, InvocationNumber};
use serde_json::Value;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Process-wide monotone source of invocation numbers.
///
/// One `next()` per begin event; numbers are unique even under
/// concurrent callers. Share one counter per process (per dispatcher
/// is typical) by `Arc`.
///
/// # Example
///
/// ```
/// use foundry_runtime::InvocationCounter;
///
/// let counter = InvocationCounter::new();
/// let first = counter.next();
/// let second = counter.next();
/// assert!(first < second);
/// assert_eq!(first.value(), 1);
/// ```
#[derive(Debug, Default)]
pub struct InvocationCounter {
    last: AtomicU64,
}

impl InvocationCounter {
    /// Creates a counter starting at zero; the first number is `#1`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints the next invocation number.
    #[must_use]
    pub fn next(&self) -> InvocationNumber {
        InvocationNumber::from(self.last.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Rewinds to zero. Test isolation only.
    pub fn reset(&self) {
        self.last.store(0, Ordering::Relaxed);
    }
}

/// Consumer of dispatch begin/end/error notifications.
///
/// All methods default to no-ops so a listener implements only the
/// events it cares about. Implementations must tolerate being called
/// from any number of dispatch threads at once.
pub trait DispatchListener: Send + Sync {
    /// A notified dispatch started; `args` is the argument snapshot.
    fn on_begin(&self, component: &ComponentId, number: InvocationNumber, args: &[Value]) {
        let _ = (component, number, args);
    }

    /// The dispatch carrying `number` completed successfully.
    fn on_end(&self, component: &ComponentId, number: InvocationNumber, result: Option<&Value>) {
        let _ = (component, number, result);
    }

    /// The dispatch carrying `number` failed with `failure`.
    fn on_error(&self, component: &ComponentId, number: InvocationNumber, failure: &Failure) {
        let _ = (component, number, failure);
    }
}

/// Synchronous, ordered begin/end/error emitter.
///
/// # Example
///
/// ```
/// use foundry_runtime::{AuditTrail, InvocationCounter, Notifier};
/// use foundry_types::ComponentId;
/// use std::sync::Arc;
///
/// let trail = Arc::new(AuditTrail::new());
/// let notifier =
///     Notifier::new(Arc::new(InvocationCounter::new())).with_listener(Arc::clone(&trail) as _);
///
/// let component = ComponentId::named("account");
/// let number = notifier.begin(&component, &[]);
/// notifier.end(&component, number, None);
/// assert_eq!(trail.pending_count(), 0);
/// ```
pub struct Notifier {
    counter: Arc<InvocationCounter>,
    listeners: Vec<Arc<dyn DispatchListener>>,
}

impl Notifier {
    /// Creates a notifier around an injected counter service.
    #[must_use]
    pub fn new(counter: Arc<InvocationCounter>) -> Self {
        Self {
            counter,
            listeners: Vec::new(),
        }
    }

    /// Appends a listener. Listeners fire in registration order.
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn DispatchListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Returns the injected counter service.
    #[must_use]
    pub fn counter(&self) -> &Arc<InvocationCounter> {
        &self.counter
    }

    /// Mints a fresh invocation number and emits the begin event.
    #[must_use]
    pub fn begin(&self, component: &ComponentId, args: &[Value]) -> InvocationNumber {
        let number = self.counter.next();
        debug!(%component, %number, "dispatch begin");
        self.emit("begin", |listener| {
            listener.on_begin(component, number, args);
        });
        number
    }

    /// Emits the end event for a successful dispatch.
    pub fn end(&self, component: &ComponentId, number: InvocationNumber, result: Option<&Value>) {
        debug!(%component, %number, "dispatch end");
        self.emit("end", |listener| {
            listener.on_end(component, number, result);
        });
    }

    /// Emits the error event for a failed dispatch.
    pub fn error(&self, component: &ComponentId, number: InvocationNumber, failure: &Failure) {
        debug!(%component, %number, %failure, "dispatch error");
        self.emit("error", |listener| {
            listener.on_error(component, number, failure);
        });
    }

    fn emit(&self, event: &str, deliver: impl Fn(&dyn DispatchListener)) {
        for listener in &self.listeners {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| deliver(listener.as_ref()))) {
                warn!(
                    event,
                    cause = %panic_message(&payload),
                    "dispatch listener panicked; continuing"
                );
            }
        }
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

/// Renders a panic payload for logs and failure messages.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
