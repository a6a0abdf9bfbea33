//! Argument codec seam for remote-origin envelopes.
//!
//! The core never frames or transports bytes itself; it only needs a
//! way to turn an argument vector into bytes at remote-request
//! construction time and back on first access. Transports supply the
//! codec; [`JsonCodec`] is the default.

use crate::EnvelopeError;
use serde_json::Value;
use std::fmt::Debug;

/// Encodes and decodes argument vectors for the wire.
///
/// Implementations must be deterministic enough that a vector encoded
/// on one node decodes to an equal vector on another; beyond that the
/// byte format is the transport's business.
///
/// # Example
///
/// ```
/// use foundry_envelope::{ArgCodec, JsonCodec};
/// use serde_json::json;
///
/// let codec = JsonCodec;
/// let args = vec![json!(2), json!(3)];
/// let bytes = codec.encode(&args).expect("encode");
/// assert_eq!(codec.decode(&bytes).expect("decode"), args);
/// ```
pub trait ArgCodec: Send + Sync + Debug {
    /// Encodes an argument vector into wire bytes.
    fn encode(&self, args: &[Value]) -> Result<Vec<u8>, EnvelopeError>;

    /// Decodes wire bytes back into an argument vector.
    fn decode(&self, bytes: &[u8]) -> Result<Vec<Value>, EnvelopeError>;
}

/// JSON codec, the default wire form for argument vectors.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl ArgCodec for JsonCodec {
    fn encode(&self, args: &[Value]) -> Result<Vec<u8>, EnvelopeError> {
        serde_json::to_vec(args).map_err(|e| EnvelopeError::EncodeFailed(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<Value>, EnvelopeError> {
        serde_json::from_slice(bytes).map_err(|e| EnvelopeError::DecodeFailed(e.to_string()))
    }
}
