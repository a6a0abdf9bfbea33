//! Bounded instance pool for one component type.
//!
//! The pool owns every worker instance of a deployed component and is
//! the only mutable shared resource in the dispatch core. Its whole
//! contract is three operations:
//!
//! ```text
//! acquire ──► exclusive lease ──► release (back to the free list)
//!                              └► discard (teardown, id retired)
//! ```
//!
//! # Possession Invariant
//!
//! An instance handed out by [`acquire`](InstancePool::acquire) is
//! never handed to a second caller until it comes back through
//! `release` or `discard`. The lease is consumed by value on the way
//! back, so holding on to one after returning it does not compile;
//! the pool additionally fail-fast-checks loan membership in case a
//! lease from another pool is handed in.
//!
//! # Sizing
//!
//! The pool grows lazily up to `max_size`, with `min_idle` instances
//! created eagerly at construction. When full and empty-handed,
//! `acquire` blocks on a condvar up to `max_wait`, then fails with
//! [`PoolError::Exhausted`] rather than blocking forever.
//!
//! # Discard vs Release
//!
//! Discard permanently removes an instance: the teardown hook runs
//! exactly once, the eviction callback (if registered) fires, and the
//! instance id is retired. Callers holding a stale reference to a
//! retired id fail deterministically with a target-removed failure
//! instead of silently landing on a different worker.

use foundry_component::{BoxedInstance, ComponentDefinition};
use foundry_types::{ComponentId, ErrorCode, InstanceId};
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

/// Default bound on a blocking acquire.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(30);

/// Pool sizing and wait policy.
///
/// # Example
///
/// ```
/// use foundry_runtime::PoolConfig;
/// use std::time::Duration;
///
/// let config = PoolConfig::new(4)
///     .with_min_idle(1)
///     .with_max_wait(Some(Duration::from_millis(50)));
/// assert_eq!(config.max_size(), 4);
/// assert_eq!(config.min_idle(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    max_size: usize,
    min_idle: usize,
    max_wait: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 16,
            min_idle: 0,
            max_wait: Some(DEFAULT_MAX_WAIT),
        }
    }
}

impl PoolConfig {
    /// Creates a config with the given maximum size.
    ///
    /// # Panics
    ///
    /// Panics if `max_size` is zero — a pool that can never hold an
    /// instance is a configuration defect.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        assert!(max_size >= 1, "pool max_size must be at least 1");
        Self {
            max_size,
            ..Self::default()
        }
    }

    /// Sets how many instances are created eagerly at construction.
    ///
    /// # Panics
    ///
    /// Panics if `min_idle` exceeds `max_size`.
    #[must_use]
    pub fn with_min_idle(mut self, min_idle: usize) -> Self {
        assert!(
            min_idle <= self.max_size,
            "min_idle must not exceed max_size"
        );
        self.min_idle = min_idle;
        self
    }

    /// Sets the acquire wait bound. `None` blocks without limit.
    #[must_use]
    pub fn with_max_wait(mut self, max_wait: Option<Duration>) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Returns the maximum number of live instances.
    #[must_use]
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Returns the eager-creation floor.
    #[must_use]
    pub fn min_idle(&self) -> usize {
        self.min_idle
    }

    /// Returns the acquire wait bound.
    #[must_use]
    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait
    }
}

/// Pool layer error.
///
/// # Error Codes
///
/// | Variant | Code | Recoverable |
/// |---------|------|-------------|
/// | [`PoolError::Exhausted`] | `POOL_EXHAUSTED` | Yes |
/// | [`PoolError::InstantiationFailed`] | `POOL_INSTANTIATION_FAILED` | Yes |
/// | [`PoolError::NotOnLoan`] | `POOL_NOT_ON_LOAN` | No |
/// | [`PoolError::ShutDown`] | `POOL_SHUT_DOWN` | No |
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// Every instance was on loan for the full wait bound.
    #[error("pool exhausted for {0}")]
    Exhausted(ComponentId),

    /// The definition failed to construct a fresh instance.
    #[error("instance construction failed: {0}")]
    InstantiationFailed(String),

    /// The returned lease is not an outstanding loan of this pool.
    ///
    /// A programming error in the caller; reported fast instead of
    /// corrupting the free list.
    #[error("instance not on loan: {0}")]
    NotOnLoan(InstanceId),

    /// The pool has been shut down.
    #[error("pool is shut down")]
    ShutDown,
}

impl ErrorCode for PoolError {
    fn code(&self) -> &'static str {
        match self {
            Self::Exhausted(_) => "POOL_EXHAUSTED",
            Self::InstantiationFailed(_) => "POOL_INSTANTIATION_FAILED",
            Self::NotOnLoan(_) => "POOL_NOT_ON_LOAN",
            Self::ShutDown => "POOL_SHUT_DOWN",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Exhausted(_) | Self::InstantiationFailed(_))
    }
}

/// Point-in-time pool accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Live instances (free + on loan).
    pub created: usize,
    /// Instances in the free list.
    pub free: usize,
    /// Instances currently leased out.
    pub on_loan: usize,
    /// Instances permanently removed so far.
    pub discarded: usize,
    /// Acquire calls that had to wait for capacity.
    pub acquire_waits: usize,
}

/// Exclusive loan of one pooled instance.
///
/// Returned by [`InstancePool::acquire`]; handed back by value to
/// [`release`](InstancePool::release) or
/// [`discard`](InstancePool::discard).
pub struct PoolLease {
    id: InstanceId,
    instance: BoxedInstance,
}

impl PoolLease {
    /// Returns the leased instance id.
    #[must_use]
    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// Returns the instance for invocation.
    pub fn instance_mut(&mut self) -> &mut (dyn Any + Send) {
        self.instance.as_mut()
    }
}

impl std::fmt::Debug for PoolLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolLease")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Eviction callback, registered at construction.
pub type EvictionHook = Box<dyn Fn(InstanceId) + Send + Sync>;

#[derive(Default)]
struct PoolInner {
    free: Vec<(InstanceId, BoxedInstance)>,
    on_loan: HashSet<InstanceId>,
    retired: HashSet<InstanceId>,
    created: usize,
    discarded: usize,
    acquire_waits: usize,
    shut_down: bool,
}

/// Bounded worker-instance pool for one component type.
///
/// # Example
///
/// ```
/// use foundry_component::testing::FixtureDefinition;
/// use foundry_runtime::{InstancePool, PoolConfig};
/// use std::sync::Arc;
///
/// let definition = Arc::new(FixtureDefinition::new("echo", || Box::new(())));
/// let pool = InstancePool::new(definition, PoolConfig::new(2)).expect("pool");
///
/// let lease = pool.acquire().expect("acquire");
/// assert_eq!(pool.stats().on_loan, 1);
/// pool.release(lease).expect("release");
/// assert_eq!(pool.stats().free, 1);
/// ```
pub struct InstancePool {
    definition: Arc<dyn ComponentDefinition>,
    config: PoolConfig,
    inner: Mutex<PoolInner>,
    available: Condvar,
    on_evict: Option<EvictionHook>,
}

impl InstancePool {
    /// Creates a pool, eagerly constructing `min_idle` instances.
    ///
    /// # Errors
    ///
    /// [`PoolError::InstantiationFailed`] if eager construction fails;
    /// instances already created are torn down before returning.
    pub fn new(
        definition: Arc<dyn ComponentDefinition>,
        config: PoolConfig,
    ) -> Result<Self, PoolError> {
        Self::build(definition, config, None)
    }

    /// Creates a pool with an eviction callback.
    ///
    /// The callback fires once per instance leaving the pool
    /// permanently (discard or shutdown drain), before its teardown.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn with_eviction_hook(
        definition: Arc<dyn ComponentDefinition>,
        config: PoolConfig,
        hook: impl Fn(InstanceId) + Send + Sync + 'static,
    ) -> Result<Self, PoolError> {
        Self::build(definition, config, Some(Box::new(hook)))
    }

    fn build(
        definition: Arc<dyn ComponentDefinition>,
        config: PoolConfig,
        on_evict: Option<EvictionHook>,
    ) -> Result<Self, PoolError> {
        let pool = Self {
            definition,
            config,
            inner: Mutex::new(PoolInner::default()),
            available: Condvar::new(),
            on_evict,
        };

        for _ in 0..config.min_idle() {
            match pool.definition.create() {
                Ok(instance) => {
                    let mut inner = pool.inner.lock();
                    inner.free.push((InstanceId::new(), instance));
                    inner.created += 1;
                }
                Err(err) => {
                    // Unwind the eager part before reporting.
                    let drained: Vec<_> = {
                        let mut inner = pool.inner.lock();
                        inner.free.drain(..).collect()
                    };
                    for (id, instance) in drained {
                        pool.run_eviction(id, instance);
                    }
                    return Err(PoolError::InstantiationFailed(err.to_string()));
                }
            }
        }

        debug!(
            component = %pool.definition.component(),
            max_size = config.max_size(),
            min_idle = config.min_idle(),
            "instance pool ready"
        );
        Ok(pool)
    }

    /// Returns the component this pool serves.
    #[must_use]
    pub fn component(&self) -> &ComponentId {
        self.definition.component()
    }

    /// Acquires an exclusive lease on an instance.
    ///
    /// Pops the free list, grows up to `max_size`, or blocks up to
    /// `max_wait` for a release.
    ///
    /// # Errors
    ///
    /// - [`PoolError::Exhausted`] after the full wait bound
    /// - [`PoolError::InstantiationFailed`] if growth fails
    /// - [`PoolError::ShutDown`] once the pool is shut down
    pub fn acquire(&self) -> Result<PoolLease, PoolError> {
        let deadline = self.config.max_wait().map(|wait| Instant::now() + wait);
        let mut waited = false;
        let mut inner = self.inner.lock();
        loop {
            if inner.shut_down {
                return Err(PoolError::ShutDown);
            }

            if let Some((id, instance)) = inner.free.pop() {
                inner.on_loan.insert(id);
                return Ok(PoolLease { id, instance });
            }

            if inner.created < self.config.max_size() {
                // Reserve the slot, then construct outside the lock.
                inner.created += 1;
                drop(inner);
                return match self.definition.create() {
                    Ok(instance) => {
                        let id = InstanceId::new();
                        let mut inner = self.inner.lock();
                        if inner.shut_down {
                            inner.created -= 1;
                            drop(inner);
                            self.run_eviction(id, instance);
                            return Err(PoolError::ShutDown);
                        }
                        inner.on_loan.insert(id);
                        debug!(component = %self.component(), %id, "created pool instance");
                        Ok(PoolLease { id, instance })
                    }
                    Err(err) => {
                        self.inner.lock().created -= 1;
                        self.available.notify_one();
                        Err(PoolError::InstantiationFailed(err.to_string()))
                    }
                };
            }

            if !waited {
                waited = true;
                inner.acquire_waits += 1;
            }
            match deadline {
                Some(deadline) => {
                    if self.available.wait_until(&mut inner, deadline).timed_out() {
                        return Err(PoolError::Exhausted(self.component().clone()));
                    }
                }
                None => self.available.wait(&mut inner),
            }
        }
    }

    /// Returns a leased instance to the free list.
    ///
    /// After shutdown the instance is torn down instead of re-pooled.
    ///
    /// # Errors
    ///
    /// [`PoolError::NotOnLoan`] if the lease is not an outstanding
    /// loan of this pool.
    pub fn release(&self, lease: PoolLease) -> Result<(), PoolError> {
        let PoolLease { id, instance } = lease;
        let mut inner = self.inner.lock();
        if !inner.on_loan.remove(&id) {
            return Err(PoolError::NotOnLoan(id));
        }
        if inner.shut_down {
            inner.created -= 1;
            inner.retired.insert(id);
            drop(inner);
            self.run_eviction(id, instance);
            return Ok(());
        }
        inner.free.push((id, instance));
        drop(inner);
        self.available.notify_one();
        Ok(())
    }

    /// Permanently removes a leased instance.
    ///
    /// Runs the eviction callback and the definition's teardown hook
    /// exactly once, retires the id, and frees the capacity slot.
    ///
    /// # Errors
    ///
    /// [`PoolError::NotOnLoan`] if the lease is not an outstanding
    /// loan of this pool.
    pub fn discard(&self, lease: PoolLease) -> Result<(), PoolError> {
        let PoolLease { id, instance } = lease;
        let mut inner = self.inner.lock();
        if !inner.on_loan.remove(&id) {
            return Err(PoolError::NotOnLoan(id));
        }
        inner.retired.insert(id);
        inner.created -= 1;
        inner.discarded += 1;
        drop(inner);
        warn!(component = %self.component(), %id, "discarded pool instance");
        self.run_eviction(id, instance);
        self.available.notify_one();
        Ok(())
    }

    /// Returns `true` if the id belonged to an instance that was
    /// permanently removed.
    #[must_use]
    pub fn is_retired(&self, id: &InstanceId) -> bool {
        self.inner.lock().retired.contains(id)
    }

    /// Shuts the pool down: fails waiting and future acquires, and
    /// tears down every free instance. Instances still on loan are
    /// torn down when released.
    pub fn shutdown(&self) {
        let drained = {
            let mut inner = self.inner.lock();
            if inner.shut_down {
                return;
            }
            inner.shut_down = true;
            let drained: Vec<(InstanceId, BoxedInstance)> = inner.free.drain(..).collect();
            inner.created -= drained.len();
            for (id, _) in &drained {
                inner.retired.insert(*id);
            }
            drained
        };
        self.available.notify_all();
        for (id, instance) in drained {
            self.run_eviction(id, instance);
        }
        debug!(component = %self.component(), "instance pool shut down");
    }

    /// Returns a point-in-time accounting snapshot.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let inner = self.inner.lock();
        PoolStats {
            created: inner.created,
            free: inner.free.len(),
            on_loan: inner.on_loan.len(),
            discarded: inner.discarded,
            acquire_waits: inner.acquire_waits,
        }
    }

    fn run_eviction(&self, id: InstanceId, instance: BoxedInstance) {
        if let Some(hook) = &self.on_evict {
            hook(id);
        }
        self.definition.teardown(instance);
    }
}

impl std::fmt::Debug for InstancePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstancePool")
            .field("component", self.component())
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
