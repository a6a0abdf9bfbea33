//! Component definition: the factory/teardown seam the pool consumes.
//!
//! A definition describes one deployed component type: its identity,
//! how to construct a worker instance, and how to tear one down. The
//! runtime's instance pool calls [`create`](ComponentDefinition::create)
//! to grow and [`teardown`](ComponentDefinition::teardown) exactly once
//! per discarded instance.
//!
//! Instances are opaque to the runtime — `Box<dyn Any + Send>`. Only
//! the component's own method descriptors know the concrete type and
//! downcast it at invocation time.

use foundry_types::{ComponentId, ErrorCode};
use std::any::Any;
use thiserror::Error;

/// An opaque pooled worker instance.
///
/// The runtime never looks inside; method descriptors downcast.
pub type BoxedInstance = Box<dyn Any + Send>;

/// One deployed component type: identity plus instance lifecycle.
///
/// # Contract
///
/// - `create` may be called concurrently from any number of threads
///   (the pool grows under load)
/// - `teardown` is called exactly once per instance that leaves the
///   pool permanently (discard or pool shutdown), never for released
///   instances
///
/// # Example
///
/// ```
/// use foundry_component::{BoxedInstance, ComponentDefinition, DefinitionError};
/// use foundry_types::ComponentId;
///
/// struct Counter {
///     component: ComponentId,
/// }
///
/// impl ComponentDefinition for Counter {
///     fn component(&self) -> &ComponentId {
///         &self.component
///     }
///
///     fn create(&self) -> Result<BoxedInstance, DefinitionError> {
///         Ok(Box::new(0u64))
///     }
/// }
///
/// let def = Counter { component: ComponentId::named("counter") };
/// let instance = def.create().expect("create");
/// def.teardown(instance);
/// ```
pub trait ComponentDefinition: Send + Sync {
    /// Returns the component identity this definition deploys.
    fn component(&self) -> &ComponentId;

    /// Constructs a fresh worker instance.
    ///
    /// # Errors
    ///
    /// [`DefinitionError::CreateFailed`] if construction fails; the
    /// pool surfaces this to the caller as an instantiation failure.
    fn create(&self) -> Result<BoxedInstance, DefinitionError>;

    /// Tears down an instance leaving the pool permanently.
    ///
    /// The default drops the instance. Override to release external
    /// resources.
    fn teardown(&self, instance: BoxedInstance) {
        drop(instance);
    }
}

// Pools and harnesses share definitions by Arc.
impl<T: ComponentDefinition + ?Sized> ComponentDefinition for std::sync::Arc<T> {
    fn component(&self) -> &ComponentId {
        (**self).component()
    }

    fn create(&self) -> Result<BoxedInstance, DefinitionError> {
        (**self).create()
    }

    fn teardown(&self, instance: BoxedInstance) {
        (**self).teardown(instance);
    }
}

/// Definition layer error.
///
/// # Example
///
/// ```
/// use foundry_component::DefinitionError;
/// use foundry_types::ErrorCode;
///
/// let err = DefinitionError::CreateFailed("datasource offline".into());
/// assert_eq!(err.code(), "DEFINITION_CREATE_FAILED");
/// assert!(err.is_recoverable());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    /// Instance construction failed.
    ///
    /// Often transient (an exhausted backing resource), so retry may
    /// succeed.
    #[error("instance construction failed: {0}")]
    CreateFailed(String),
}

impl ErrorCode for DefinitionError {
    fn code(&self) -> &'static str {
        match self {
            Self::CreateFailed(_) => "DEFINITION_CREATE_FAILED",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::CreateFailed(_))
    }
}
