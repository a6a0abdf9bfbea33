//! Immutable request envelope.
//!
//! A [`Request`] carries one call's input across the dispatch
//! boundary: target identity, method identity, and the argument
//! vector. The same envelope shape serves local and remote callers;
//! only the argument representation differs.
//!
//! # Argument Representations
//!
//! | Origin | In-memory args | Wire bytes | Decode |
//! |--------|----------------|------------|--------|
//! | [`Request::local`] | yes | no | n/a |
//! | [`Request::remote`] | yes (cached) | yes, encoded eagerly | pre-filled |
//! | [`Request::from_wire`] | on first access | yes | lazy, cached |
//!
//! Remote construction encodes eagerly so an unencodable argument
//! vector fails at the call site, before anything crosses a boundary.
//! Wire-origin requests decode lazily so a transport can route an
//! envelope it never needs to open; a decode failure is cached and
//! every later access observes the same hard state error.

use crate::{ArgCodec, EnvelopeError};
use foundry_types::{ComponentId, InstanceId, MethodKey};
use serde_json::Value;
use std::sync::{Arc, OnceLock};

/// Argument storage, by origin.
#[derive(Debug)]
enum Args {
    /// Local call: in-memory only, no encoding cost.
    Local(Vec<Value>),
    /// Remote or wire origin: encoded form plus a decode cache.
    Remote {
        bytes: Vec<u8>,
        codec: Arc<dyn ArgCodec>,
        decoded: OnceLock<Result<Vec<Value>, EnvelopeError>>,
    },
}

impl Clone for Args {
    fn clone(&self) -> Self {
        match self {
            Self::Local(values) => Self::Local(values.clone()),
            Self::Remote {
                bytes,
                codec,
                decoded,
            } => {
                let cache = OnceLock::new();
                if let Some(result) = decoded.get() {
                    let _ = cache.set(result.clone());
                }
                Self::Remote {
                    bytes: bytes.clone(),
                    codec: Arc::clone(codec),
                    decoded: cache,
                }
            }
        }
    }
}

/// Immutable request envelope for a single dispatch.
///
/// Construction freezes the envelope; there are no setters. The
/// `with_*` methods are consuming builders used before the request is
/// handed to the dispatcher.
///
/// # Example
///
/// ```
/// use foundry_envelope::Request;
/// use foundry_types::{ComponentId, MethodKey};
/// use serde_json::json;
///
/// let request = Request::local(
///     ComponentId::named("calculator"),
///     MethodKey::new("add", 2),
///     vec![json!(2), json!(3)],
/// )
/// .with_invoked_interface("Calculator");
///
/// assert!(!request.is_remote());
/// assert_eq!(request.args().expect("local args"), &[json!(2), json!(3)]);
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    target: ComponentId,
    instance: Option<InstanceId>,
    method: MethodKey,
    invoked_interface: Option<String>,
    args: Args,
}

impl Request {
    /// Creates a local-origin request with in-memory arguments.
    ///
    /// No encoding happens; this is the fast path for in-process
    /// callers.
    #[must_use]
    pub fn local(target: ComponentId, method: MethodKey, args: Vec<Value>) -> Self {
        Self {
            target,
            instance: None,
            method,
            invoked_interface: None,
            args: Args::Local(args),
        }
    }

    /// Creates a remote-origin request, encoding arguments eagerly.
    ///
    /// The encoded form is stored for the transport; the in-memory
    /// vector is kept as a pre-filled decode cache so local access
    /// pays no decode cost.
    ///
    /// # Errors
    ///
    /// [`EnvelopeError::EncodeFailed`] if the codec rejects the
    /// argument vector — the request is never constructed.
    ///
    /// # Example
    ///
    /// ```
    /// use foundry_envelope::{JsonCodec, Request};
    /// use foundry_types::{ComponentId, MethodKey};
    /// use serde_json::json;
    /// use std::sync::Arc;
    ///
    /// let request = Request::remote(
    ///     ComponentId::named("calculator"),
    ///     MethodKey::new("add", 2),
    ///     vec![json!(2), json!(3)],
    ///     Arc::new(JsonCodec),
    /// )
    /// .expect("encodable args");
    ///
    /// assert!(request.is_remote());
    /// assert!(request.encoded_args().is_some());
    /// ```
    pub fn remote(
        target: ComponentId,
        method: MethodKey,
        args: Vec<Value>,
        codec: Arc<dyn ArgCodec>,
    ) -> Result<Self, EnvelopeError> {
        let bytes = codec.encode(&args)?;
        let decoded = OnceLock::new();
        let _ = decoded.set(Ok(args));
        Ok(Self {
            target,
            instance: None,
            method,
            invoked_interface: None,
            args: Args::Remote {
                bytes,
                codec,
                decoded,
            },
        })
    }

    /// Creates a remote-origin request from received wire bytes.
    ///
    /// Arguments are decoded lazily on first [`args`](Self::args)
    /// access; a transport that only routes the envelope never pays
    /// the decode.
    #[must_use]
    pub fn from_wire(
        target: ComponentId,
        method: MethodKey,
        bytes: Vec<u8>,
        codec: Arc<dyn ArgCodec>,
    ) -> Self {
        Self {
            target,
            instance: None,
            method,
            invoked_interface: None,
            args: Args::Remote {
                bytes,
                codec,
                decoded: OnceLock::new(),
            },
        }
    }

    /// Targets a specific instance (stateful components).
    #[must_use]
    pub fn with_instance(mut self, instance: InstanceId) -> Self {
        self.instance = Some(instance);
        self
    }

    /// Records the business interface the caller invoked through.
    #[must_use]
    pub fn with_invoked_interface(mut self, interface: impl Into<String>) -> Self {
        self.invoked_interface = Some(interface.into());
        self
    }

    /// Returns the target component identity.
    #[must_use]
    pub fn target(&self) -> &ComponentId {
        &self.target
    }

    /// Returns the addressed instance, if the caller pinned one.
    #[must_use]
    pub fn instance(&self) -> Option<InstanceId> {
        self.instance
    }

    /// Returns the method identity.
    #[must_use]
    pub fn method(&self) -> &MethodKey {
        &self.method
    }

    /// Returns the invoked business interface name, if recorded.
    #[must_use]
    pub fn invoked_interface(&self) -> Option<&str> {
        self.invoked_interface.as_deref()
    }

    /// Returns `true` for remote/wire-origin requests.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self.args, Args::Remote { .. })
    }

    /// Returns the argument vector, decoding on first access for
    /// wire-origin requests.
    ///
    /// # Errors
    ///
    /// [`EnvelopeError::DecodeFailed`] if the wire bytes do not decode.
    /// The failure is cached: this is a hard state error and every
    /// subsequent access observes it again.
    pub fn args(&self) -> Result<&[Value], EnvelopeError> {
        match &self.args {
            Args::Local(values) => Ok(values),
            Args::Remote {
                bytes,
                codec,
                decoded,
            } => match decoded.get_or_init(|| codec.decode(bytes)) {
                Ok(values) => Ok(values),
                Err(err) => Err(err.clone()),
            },
        }
    }

    /// Returns the encoded argument bytes for transports.
    ///
    /// `None` for local-origin requests, which never encode.
    #[must_use]
    pub fn encoded_args(&self) -> Option<&[u8]> {
        match &self.args {
            Args::Local(_) => None,
            Args::Remote { bytes, .. } => Some(bytes),
        }
    }
}
