//! In-flight and recent-history audit trail.
//!
//! An [`AuditTrail`] is a [`DispatchListener`] that keeps one pending
//! entry per begin event, keyed by invocation number, and moves it to
//! a bounded completed log when the matching end or error arrives:
//!
//! ```text
//! on_begin(#n)  ──► pending[#n] = { component, args, begun_at }
//! on_end(#n)    ──┐
//! on_error(#n)  ──┴► completed.push({ ..pending.remove(#n), outcome })
//! ```
//!
//! The completed log is a rolling buffer: once full, the oldest record
//! is dropped. Anything still pending is a dispatch that began and has
//! not completed yet — a live call, or a leak if it stays there.

use crate::notifier::DispatchListener;
use chrono::{DateTime, Utc};
use foundry_envelope::Failure;
use foundry_types::{ComponentId, ErrorCode, InvocationNumber};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use tracing::warn;

/// Default bound on the completed log.
const DEFAULT_MAX_RECORDS: usize = 1000;

/// How an audited dispatch ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AuditOutcome {
    /// The dispatch completed; `result` is the (possibly void) value.
    Succeeded {
        /// Return value, `None` for void methods.
        result: Option<Value>,
    },
    /// The dispatch failed with the recorded failure code.
    Failed {
        /// The failure's [`ErrorCode`] code.
        code: String,
        /// The failure's rendered message.
        message: String,
    },
}

/// One completed, timestamped dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Component the dispatch addressed.
    pub component: ComponentId,
    /// Number correlating this record's begin with its completion.
    pub number: InvocationNumber,
    /// Argument snapshot taken at begin.
    pub args: Vec<Value>,
    /// When the begin event fired.
    pub begun_at: DateTime<Utc>,
    /// When the end or error event fired.
    pub completed_at: DateTime<Utc>,
    /// Success or failure.
    pub outcome: AuditOutcome,
}

#[derive(Debug, Clone)]
struct Pending {
    component: ComponentId,
    args: Vec<Value>,
    begun_at: DateTime<Utc>,
}

#[derive(Default)]
struct TrailInner {
    pending: HashMap<InvocationNumber, Pending>,
    completed: VecDeque<AuditRecord>,
}

/// Dispatch listener recording in-flight calls and a bounded history.
///
/// # Example
///
/// ```
/// use foundry_runtime::{AuditOutcome, AuditTrail, InvocationCounter, Notifier};
/// use foundry_types::ComponentId;
/// use serde_json::json;
/// use std::sync::Arc;
///
/// let trail = Arc::new(AuditTrail::new());
/// let notifier =
///     Notifier::new(Arc::new(InvocationCounter::new())).with_listener(Arc::clone(&trail) as _);
///
/// let component = ComponentId::named("calculator");
/// let number = notifier.begin(&component, &[json!(2), json!(3)]);
/// assert_eq!(trail.pending_count(), 1);
///
/// notifier.end(&component, number, Some(&json!(5)));
/// let record = &trail.recent(1)[0];
/// assert_eq!(record.number, number);
/// assert_eq!(
///     record.outcome,
///     AuditOutcome::Succeeded { result: Some(json!(5)) }
/// );
/// ```
pub struct AuditTrail {
    max_records: usize,
    inner: Mutex<TrailInner>,
}

impl AuditTrail {
    /// Creates a trail keeping the default number of completed records.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_RECORDS)
    }

    /// Creates a trail keeping at most `max_records` completed records.
    #[must_use]
    pub fn with_capacity(max_records: usize) -> Self {
        Self {
            max_records,
            inner: Mutex::new(TrailInner::default()),
        }
    }

    /// Returns how many dispatches have begun but not completed.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.lock().pending.len()
    }

    /// Returns the most recent completed records, newest last.
    #[must_use]
    pub fn recent(&self, count: usize) -> Vec<AuditRecord> {
        let inner = self.inner.lock();
        let skip = inner.completed.len().saturating_sub(count);
        inner.completed.iter().skip(skip).cloned().collect()
    }

    fn complete(&self, number: InvocationNumber, event: &str, outcome: AuditOutcome) {
        let mut inner = self.inner.lock();
        let Some(pending) = inner.pending.remove(&number) else {
            // A listener registered mid-flight sees completions for
            // begins it never observed.
            warn!(%number, event, "audit completion without a pending entry");
            return;
        };
        if inner.completed.len() >= self.max_records {
            inner.completed.pop_front();
        }
        inner.completed.push_back(AuditRecord {
            component: pending.component,
            number,
            args: pending.args,
            begun_at: pending.begun_at,
            completed_at: Utc::now(),
            outcome,
        });
    }
}

impl Default for AuditTrail {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchListener for AuditTrail {
    fn on_begin(&self, component: &ComponentId, number: InvocationNumber, args: &[Value]) {
        self.inner.lock().pending.insert(
            number,
            Pending {
                component: component.clone(),
                args: args.to_vec(),
                begun_at: Utc::now(),
            },
        );
    }

    fn on_end(&self, _component: &ComponentId, number: InvocationNumber, result: Option<&Value>) {
        self.complete(
            number,
            "end",
            AuditOutcome::Succeeded {
                result: result.cloned(),
            },
        );
    }

    fn on_error(&self, _component: &ComponentId, number: InvocationNumber, failure: &Failure) {
        self.complete(
            number,
            "error",
            AuditOutcome::Failed {
                code: failure.code().to_string(),
                message: failure.to_string(),
            },
        );
    }
}

impl std::fmt::Debug for AuditTrail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("AuditTrail")
            .field("pending", &inner.pending.len())
            .field("completed", &inner.completed.len())
            .field("max_records", &self.max_records)
            .finish()
    }
}
