//! Deployment-time method tables.
//!
//! The dispatcher never performs reflective lookup. Metadata analysis
//! (out of scope here) runs ahead of time and produces one immutable
//! [`MethodTable`] per component: a map from [`MethodKey`] to a
//! [`MethodDescriptor`] holding the concrete callable. At dispatch
//! time resolution is a plain map lookup; a miss is a deployment
//! defect, not a fallback path.
//!
//! # Failure Channels
//!
//! A callable has exactly two ways to fail:
//!
//! - **Declared**: return [`BusinessError`] — the expected business
//!   outcome, re-raised faithfully to the caller
//! - **Undeclared**: panic — classified by the dispatcher as a system
//!   failure, discarding the instance
//!
//! [`MethodDescriptor::typed`] panics on an instance-type mismatch for
//! the same reason: a wrong downcast means the deployment metadata is
//! wrong, and the dispatcher surfaces it as a system failure.

use foundry_envelope::BusinessError;
use foundry_types::MethodKey;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Boxed callable bound to a resolved method.
pub type MethodFn =
    Arc<dyn Fn(&mut (dyn Any + Send), &[Value]) -> Result<Value, BusinessError> + Send + Sync>;

/// A resolved callable descriptor for one method.
///
/// # Example
///
/// ```
/// use foundry_component::MethodDescriptor;
/// use serde_json::{json, Value};
///
/// let add = MethodDescriptor::typed::<(), _>("noop", 0, |_state, _args| Ok(Value::Null));
/// assert_eq!(add.key().signature(), "noop/0");
/// # let _ = json!(null);
/// ```
#[derive(Clone)]
pub struct MethodDescriptor {
    key: MethodKey,
    callable: MethodFn,
}

impl MethodDescriptor {
    /// Creates a descriptor from a type-erased callable.
    #[must_use]
    pub fn new(
        key: MethodKey,
        callable: impl Fn(&mut (dyn Any + Send), &[Value]) -> Result<Value, BusinessError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            key,
            callable: Arc::new(callable),
        }
    }

    /// Creates a descriptor over a concrete instance type.
    ///
    /// The callable receives `&mut T` after downcasting the opaque
    /// pooled instance.
    ///
    /// # Panics
    ///
    /// The returned callable panics if the instance is not a `T`.
    /// That is a binding mismatch — a metadata defect — and the
    /// dispatcher classifies the unwind as a system failure.
    ///
    /// # Example
    ///
    /// ```
    /// use foundry_component::MethodDescriptor;
    /// use serde_json::json;
    ///
    /// struct Calculator;
    ///
    /// let add = MethodDescriptor::typed::<Calculator, _>("add", 2, |_calc, args| {
    ///     let a = args[0].as_i64().unwrap_or(0);
    ///     let b = args[1].as_i64().unwrap_or(0);
    ///     Ok(json!(a + b))
    /// });
    /// assert_eq!(add.arity(), 2);
    /// ```
    #[must_use]
    pub fn typed<T, F>(name: impl Into<String>, arity: usize, f: F) -> Self
    where
        T: Send + 'static,
        F: Fn(&mut T, &[Value]) -> Result<Value, BusinessError> + Send + Sync + 'static,
    {
        let key = MethodKey::new(name, arity);
        let label = key.signature();
        Self {
            key,
            callable: Arc::new(move |instance, args| {
                let state = instance
                    .downcast_mut::<T>()
                    .unwrap_or_else(|| panic!("instance type mismatch invoking {label}"));
                f(state, args)
            }),
        }
    }

    /// Returns the method identity.
    #[must_use]
    pub fn key(&self) -> &MethodKey {
        &self.key
    }

    /// Returns the declared arity.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.key.arity
    }

    /// Invokes the callable against an instance.
    ///
    /// # Errors
    ///
    /// The method's declared [`BusinessError`], if it returns one.
    pub fn invoke(
        &self,
        instance: &mut (dyn Any + Send),
        args: &[Value],
    ) -> Result<Value, BusinessError> {
        (self.callable)(instance, args)
    }
}

impl std::fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// Immutable method-identity → descriptor table for one component.
///
/// Built once at deployment time, read-only afterward. The dispatcher
/// treats a resolution miss as [`MethodNotFound`] — tables are never
/// extended at runtime.
///
/// [`MethodNotFound`]: foundry_envelope::Failure::MethodNotFound
///
/// # Example
///
/// ```
/// use foundry_component::MethodTable;
/// use foundry_types::MethodKey;
/// use serde_json::json;
///
/// struct Calculator;
///
/// let table = MethodTable::builder()
///     .typed_method::<Calculator, _>("add", 2, |_c, args| {
///         Ok(json!(args[0].as_i64().unwrap_or(0) + args[1].as_i64().unwrap_or(0)))
///     })
///     .build();
///
/// assert!(table.resolve(&MethodKey::new("add", 2)).is_some());
/// assert!(table.resolve(&MethodKey::new("add", 3)).is_none());
/// ```
#[derive(Debug, Default)]
pub struct MethodTable {
    methods: HashMap<MethodKey, MethodDescriptor>,
}

impl MethodTable {
    /// Starts a new table builder.
    #[must_use]
    pub fn builder() -> MethodTableBuilder {
        MethodTableBuilder::default()
    }

    /// Resolves a method identity to its descriptor.
    #[must_use]
    pub fn resolve(&self, key: &MethodKey) -> Option<&MethodDescriptor> {
        self.methods.get(key)
    }

    /// Returns the number of registered methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Returns `true` if no methods are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Iterates over the registered method keys.
    pub fn keys(&self) -> impl Iterator<Item = &MethodKey> {
        self.methods.keys()
    }
}

/// Builder for [`MethodTable`].
///
/// Registering the same [`MethodKey`] twice keeps the last descriptor,
/// mirroring how a rebuilt deployment descriptor shadows an older one.
#[derive(Debug, Default)]
pub struct MethodTableBuilder {
    methods: HashMap<MethodKey, MethodDescriptor>,
}

impl MethodTableBuilder {
    /// Registers a prebuilt descriptor.
    #[must_use]
    pub fn descriptor(mut self, descriptor: MethodDescriptor) -> Self {
        self.methods.insert(descriptor.key().clone(), descriptor);
        self
    }

    /// Registers a typed method over a concrete instance type.
    #[must_use]
    pub fn typed_method<T, F>(self, name: impl Into<String>, arity: usize, f: F) -> Self
    where
        T: Send + 'static,
        F: Fn(&mut T, &[Value]) -> Result<Value, BusinessError> + Send + Sync + 'static,
    {
        self.descriptor(MethodDescriptor::typed::<T, F>(name, arity, f))
    }

    /// Freezes the table.
    #[must_use]
    pub fn build(self) -> MethodTable {
        MethodTable {
            methods: self.methods,
        }
    }
}
