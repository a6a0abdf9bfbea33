//! Correlation-id propagation seam.
//!
//! The correlation id ties a whole chain of calls together for audit
//! and tracing — distinct from the invocation number, which pairs one
//! begin event with its end/error event. An external audit/tracing
//! component supplies the provider; the dispatcher treats it as
//! optional and works null-safely without one.
//!
//! Propagation is explicit: the dispatcher reads the parent id, mints
//! a child, installs it for the duration of the call, and restores the
//! parent afterward. Passing the parent through the provider rather
//! than relying on ambient nesting is what keeps chains correct when a
//! single thread hosts multiple logical frames (a local call chained
//! from a remote call).

use foundry_types::CorrelationId;
use std::cell::Cell;
use tracing::debug;

/// External correlation-id service consumed by the dispatcher.
///
/// All three operations refer to the calling thread's notion of
/// "current". Implementations decide how lineage between a parent and
/// the child minted under it is recorded; the core only moves ids
/// around.
pub trait CorrelationProvider: Send + Sync {
    /// Returns the id active on the calling thread, if any.
    fn current(&self) -> Option<CorrelationId>;

    /// Mints a child id under the currently active one.
    ///
    /// Called once per dispatch; the dispatcher installs the child via
    /// [`restore`](Self::restore) and puts the parent back when the
    /// call completes.
    fn new_child(&self) -> CorrelationId;

    /// Installs `id` as the calling thread's current id.
    ///
    /// `None` clears it.
    fn restore(&self, id: Option<CorrelationId>);
}

thread_local! {
    static CURRENT: Cell<Option<CorrelationId>> = const { Cell::new(None) };
}

/// Thread-local [`CorrelationProvider`] shipped with the runtime.
///
/// Mints random UUID ids and records parent→child lineage in the
/// trace log only. Deployments with a real tracing backend register
/// their own provider instead.
///
/// # Example
///
/// ```
/// use foundry_runtime::{CorrelationProvider, ThreadCorrelation};
///
/// let provider = ThreadCorrelation;
/// assert_eq!(provider.current(), None);
///
/// let child = provider.new_child();
/// provider.restore(Some(child));
/// assert_eq!(provider.current(), Some(child));
///
/// provider.restore(None);
/// assert_eq!(provider.current(), None);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadCorrelation;

impl CorrelationProvider for ThreadCorrelation {
    fn current(&self) -> Option<CorrelationId> {
        CURRENT.with(Cell::get)
    }

    fn new_child(&self) -> CorrelationId {
        let child = CorrelationId::new();
        match self.current() {
            Some(parent) => debug!(%parent, %child, "minted child correlation id"),
            None => debug!(%child, "minted root correlation id"),
        }
        child
    }

    fn restore(&self, id: Option<CorrelationId>) {
        CURRENT.with(|current| current.set(id));
    }
}
