//! Envelope layer errors.
//!
//! Errors raised while building or reading a request envelope.
//! All errors implement [`ErrorCode`] for unified handling.
//!
//! # Error Codes
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`EnvelopeError::EncodeFailed`] | `ENVELOPE_ENCODE_FAILED` | No |
//! | [`EnvelopeError::DecodeFailed`] | `ENVELOPE_DECODE_FAILED` | No |
//!
//! Neither is recoverable: an argument vector that failed to encode
//! will fail again, and a wire form that failed to decode is corrupt.
//! Decode failure in particular is a hard state error — the request
//! caches it and every later read observes the same failure.

use foundry_types::ErrorCode;
use thiserror::Error;

/// Envelope layer error.
///
/// # Example
///
/// ```
/// use foundry_envelope::EnvelopeError;
/// use foundry_types::ErrorCode;
///
/// let err = EnvelopeError::DecodeFailed("truncated input".into());
/// assert_eq!(err.code(), "ENVELOPE_DECODE_FAILED");
/// assert!(!err.is_recoverable());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// Argument vector could not be encoded for the wire.
    ///
    /// Raised at remote-request construction time; the request is
    /// never created.
    #[error("argument encoding failed: {0}")]
    EncodeFailed(String),

    /// Wire bytes could not be decoded back into arguments.
    ///
    /// Raised on first argument access of a wire-origin request and
    /// cached; this is a state error, not retried.
    #[error("argument decoding failed: {0}")]
    DecodeFailed(String),
}

impl ErrorCode for EnvelopeError {
    fn code(&self) -> &'static str {
        match self {
            Self::EncodeFailed(_) => "ENVELOPE_ENCODE_FAILED",
            Self::DecodeFailed(_) => "ENVELOPE_DECODE_FAILED",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}
