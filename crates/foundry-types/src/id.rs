//! Identifier types for Foundry.
//!
//! All identifiers are UUID-based for network compatibility: a
//! component deployed on one node resolves to the same identity on
//! every node that knows its name.

use serde::{Deserialize, Serialize};
use uuid::{uuid, Uuid};

/// Foundry namespace UUID for deterministic UUID v5 generation.
///
/// Used as the namespace for deriving stable UUIDs for named
/// (deployment-descriptor) components via UUID v5 (SHA-1 based).
const FOUNDRY_NAMESPACE: Uuid = uuid!("a3c95d1e-64f0-4f7b-9c2e-0d8b6a5c4e21");

/// Identifier for a managed component.
///
/// A component is a server-managed unit of business logic,
/// instantiated and pooled by the runtime rather than by the caller.
/// Callers address it by identity; the runtime owns its instances.
///
/// # UUID Strategy
///
/// - **Named components** (registered from a deployment descriptor):
///   UUID v5, deterministic from the name
/// - **Ad-hoc components**: UUID v4, random per construction
///
/// Deterministic UUIDs mean the same descriptor name resolves to the
/// same identity across processes and machines, which is what makes
/// remote-origin requests routable.
///
/// # Equality Semantics
///
/// `PartialEq` compares all fields including UUID. For FQN-only
/// comparison (ignoring UUID), use [`fqn_eq`](Self::fqn_eq).
///
/// # Example
///
/// ```
/// use foundry_types::ComponentId;
///
/// // Named: deterministic UUID
/// let a = ComponentId::named("calculator");
/// let b = ComponentId::named("calculator");
/// assert_eq!(a, b);        // Same UUID, same component
///
/// // Ad-hoc: random UUID per instance
/// let p1 = ComponentId::new("test", "calculator");
/// let p2 = ComponentId::new("test", "calculator");
/// assert_ne!(p1, p2);      // Different UUIDs
/// assert!(p1.fqn_eq(&p2)); // But same FQN
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentId {
    /// Globally unique identifier.
    pub uuid: Uuid,
    /// Namespace (e.g., "component", "test").
    pub namespace: String,
    /// Component name within namespace.
    pub name: String,
}

impl ComponentId {
    /// Creates a new [`ComponentId`] with a random UUID v4.
    ///
    /// Use this for ad-hoc components where each construction should
    /// have a unique identity.
    ///
    /// # Example
    ///
    /// ```
    /// use foundry_types::ComponentId;
    ///
    /// let id = ComponentId::new("test", "echo");
    /// assert_eq!(id.namespace, "test");
    /// assert_eq!(id.name, "echo");
    /// assert_eq!(id.fqn(), "test::echo");
    /// ```
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Creates a named component ID with a deterministic UUID v5.
    ///
    /// The UUID is derived from the Foundry namespace UUID and the
    /// component name using SHA-1. This ensures:
    ///
    /// - Same name always produces same UUID
    /// - Different names produce different UUIDs
    /// - UUIDs are consistent across processes/machines
    ///
    /// # Example
    ///
    /// ```
    /// use foundry_types::ComponentId;
    ///
    /// let calc1 = ComponentId::named("calculator");
    /// let calc2 = ComponentId::named("calculator");
    /// let bank = ComponentId::named("account");
    ///
    /// assert_eq!(calc1.uuid, calc2.uuid);  // Same name = same UUID
    /// assert_ne!(calc1.uuid, bank.uuid);   // Different name = different UUID
    /// assert!(calc1.is_named());
    /// ```
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            uuid: Uuid::new_v5(&FOUNDRY_NAMESPACE, name.as_bytes()),
            namespace: "component".to_string(),
            name,
        }
    }

    /// Returns the fully qualified name in `namespace::name` format.
    ///
    /// # Example
    ///
    /// ```
    /// use foundry_types::ComponentId;
    ///
    /// let id = ComponentId::named("calculator");
    /// assert_eq!(id.fqn(), "component::calculator");
    /// ```
    #[must_use]
    pub fn fqn(&self) -> String {
        format!("{}::{}", self.namespace, self.name)
    }

    /// Compares two [`ComponentId`]s by FQN only, ignoring UUID.
    ///
    /// Useful when checking whether two ids refer to the same logical
    /// component even if they were constructed separately.
    #[must_use]
    pub fn fqn_eq(&self, other: &Self) -> bool {
        self.namespace == other.namespace && self.name == other.name
    }

    /// Returns `true` if this id was registered from a deployment name.
    #[must_use]
    pub fn is_named(&self) -> bool {
        self.namespace == "component"
    }
}

impl std::fmt::Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}@{}", self.namespace, self.name, self.uuid)
    }
}

/// Identifier for a single pooled worker instance.
///
/// The pool mints one per created instance; stateful callers carry it
/// in the request's target identity to address a specific instance.
/// After a discard the id is retired and never reused, which is what
/// lets stale references fail deterministically instead of silently
/// landing on a different worker.
///
/// # Example
///
/// ```
/// use foundry_types::InstanceId;
///
/// let a = InstanceId::new();
/// let b = InstanceId::new();
/// assert_ne!(a, b);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId(pub Uuid);

impl InstanceId {
    /// Creates a new [`InstanceId`] with a random UUID v4.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "instance:{}", self.0)
    }
}

/// Correlation identifier propagated across nested and remote calls.
///
/// Distinct from [`InvocationNumber`]: the invocation number pairs one
/// begin event with its end/error event, while the correlation id ties
/// a whole chain of calls (local business method → nested component →
/// remote hop) together for audit and tracing.
///
/// The id itself records no parent linkage; lineage is the correlation
/// provider's concern.
///
/// # Example
///
/// ```
/// use foundry_types::CorrelationId;
///
/// let parent = CorrelationId::new();
/// let child = CorrelationId::new();
/// assert_ne!(parent, child);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(pub Uuid);

impl CorrelationId {
    /// Creates a new [`CorrelationId`] with a random UUID v4.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "correlation:{}", self.0)
    }
}

/// Process-wide monotone counter value correlating dispatch events.
///
/// One number is minted per begin event; the matching end or error
/// event carries the same number. Numbers are unique per dispatch even
/// under concurrent callers, and serve as the key for any in-flight
/// bookkeeping (pending audit entries).
///
/// # Example
///
/// ```
/// use foundry_types::InvocationNumber;
///
/// let n = InvocationNumber::from(42);
/// assert_eq!(n.value(), 42);
/// assert_eq!(n.to_string(), "#42");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct InvocationNumber(u64);

impl InvocationNumber {
    /// Returns the raw counter value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for InvocationNumber {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for InvocationNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Stable method identity: name plus arity.
///
/// This is a signature key, not a reflective handle. The dispatcher
/// resolves it against an immutable deployment-time method table; the
/// key stays meaningful across the wire because it carries no process
/// addresses.
///
/// # Example
///
/// ```
/// use foundry_types::MethodKey;
///
/// let add = MethodKey::new("add", 2);
/// assert_eq!(add.signature(), "add/2");
/// assert_ne!(add, MethodKey::new("add", 3)); // arity is identity
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodKey {
    /// Method name as declared in the component's business interface.
    pub name: String,
    /// Number of arguments the method accepts.
    pub arity: usize,
}

impl MethodKey {
    /// Creates a new [`MethodKey`].
    ///
    /// # Example
    ///
    /// ```
    /// use foundry_types::MethodKey;
    ///
    /// let key = MethodKey::new("divide", 2);
    /// assert_eq!(key.name, "divide");
    /// assert_eq!(key.arity, 2);
    /// ```
    #[must_use]
    pub fn new(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity,
        }
    }

    /// Renders the `name/arity` signature form.
    #[must_use]
    pub fn signature(&self) -> String {
        format!("{}/{}", self.name, self.arity)
    }
}

impl std::fmt::Display for MethodKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_component_is_deterministic() {
        let a = ComponentId::named("calculator");
        let b = ComponentId::named("calculator");
        assert_eq!(a, b);
        assert_eq!(a.uuid, b.uuid);
    }

    #[test]
    fn adhoc_component_is_unique() {
        let a = ComponentId::new("test", "echo");
        let b = ComponentId::new("test", "echo");
        assert_ne!(a, b);
        assert!(a.fqn_eq(&b));
    }

    #[test]
    fn fqn_format() {
        let id = ComponentId::named("account");
        assert_eq!(id.fqn(), "component::account");
    }

    #[test]
    fn instance_ids_are_unique() {
        let a = InstanceId::new();
        let b = InstanceId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn invocation_number_ordering() {
        let a = InvocationNumber::from(1);
        let b = InvocationNumber::from(2);
        assert!(a < b);
        assert_eq!(b.value(), 2);
    }

    #[test]
    fn method_key_identity_includes_arity() {
        let two = MethodKey::new("add", 2);
        let three = MethodKey::new("add", 3);
        assert_ne!(two, three);
        assert_eq!(two.signature(), "add/2");
    }

    #[test]
    fn ids_round_trip_through_serde() {
        let id = ComponentId::named("calculator");
        let json = serde_json::to_string(&id).expect("serialize");
        let back: ComponentId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(id, back);

        let key = MethodKey::new("add", 2);
        let json = serde_json::to_string(&key).expect("serialize");
        let back: MethodKey = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(key, back);
    }
}
