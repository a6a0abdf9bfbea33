//! Unified error interface for Foundry.
//!
//! Every error type in the workspace implements [`ErrorCode`] so that
//! callers sitting above the dispatch boundary can branch on stable
//! machine-readable codes instead of downcasting concrete types.
//!
//! # Design
//!
//! Implementing [`ErrorCode`] gives an error:
//!
//! - **A stable code**: `UPPER_SNAKE_CASE`, crate-prefixed, never
//!   changed once published
//! - **Recoverability info**: whether retrying the operation can
//!   plausibly succeed
//!
//! # Example
//!
//! ```
//! use foundry_types::ErrorCode;
//!
//! #[derive(Debug)]
//! enum AcquireError {
//!     Exhausted,
//!     Corrupt(String),
//! }
//!
//! impl ErrorCode for AcquireError {
//!     fn code(&self) -> &'static str {
//!         match self {
//!             Self::Exhausted => "ACQUIRE_EXHAUSTED",
//!             Self::Corrupt(_) => "ACQUIRE_CORRUPT",
//!         }
//!     }
//!
//!     fn is_recoverable(&self) -> bool {
//!         matches!(self, Self::Exhausted)
//!     }
//! }
//!
//! let err = AcquireError::Exhausted;
//! assert_eq!(err.code(), "ACQUIRE_EXHAUSTED");
//! assert!(err.is_recoverable());
//! ```

/// Unified error code interface for Foundry errors.
///
/// # Code Format
///
/// Error codes should be:
///
/// - **UPPER_SNAKE_CASE**: e.g., `"POOL_EXHAUSTED"`
/// - **Prefixed by layer**: e.g., `"POOL_"`, `"ENVELOPE_"`, `"FAILURE_"`
/// - **Stable**: codes are an API contract; changing one is a breaking
///   change
///
/// # Recoverability
///
/// An error is recoverable when retrying may succeed without a code or
/// configuration change: a pool that is momentarily exhausted, a
/// declared business failure the caller can compensate for. Binding
/// mismatches, missing descriptors, and retired targets are not — no
/// number of retries makes a missing method appear.
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    ///
    /// # Examples
    ///
    /// - `"POOL_EXHAUSTED"`
    /// - `"ENVELOPE_DECODE_FAILED"`
    /// - `"FAILURE_TARGET_REMOVED"`
    fn code(&self) -> &'static str;

    /// Returns whether the error is recoverable.
    ///
    /// # Returns
    ///
    /// - `true`: retry may succeed, or the caller can compensate
    /// - `false`: retry will not help; requires a code/config change
    fn is_recoverable(&self) -> bool;
}

/// Validates that an error code follows Foundry conventions.
///
/// # Checks
///
/// 1. Code is non-empty
/// 2. Code starts with the expected prefix
/// 3. Code is UPPER_SNAKE_CASE
///
/// # Panics
///
/// Panics with a descriptive message if validation fails.
///
/// # Example
///
/// ```
/// use foundry_types::{ErrorCode, assert_error_code};
///
/// #[derive(Debug)]
/// enum LeaseError { Expired }
///
/// impl ErrorCode for LeaseError {
///     fn code(&self) -> &'static str { "LEASE_EXPIRED" }
///     fn is_recoverable(&self) -> bool { false }
/// }
///
/// assert_error_code(&LeaseError::Expired, "LEASE_");
/// ```
pub fn assert_error_code<E: ErrorCode>(err: &E, expected_prefix: &str) {
    let code = err.code();

    assert!(!code.is_empty(), "Error code must not be empty");

    assert!(
        code.starts_with(expected_prefix),
        "Error code '{}' must start with prefix '{}'",
        code,
        expected_prefix
    );

    assert!(
        is_upper_snake_case(code),
        "Error code '{}' must be UPPER_SNAKE_CASE",
        code
    );
}

/// Validates multiple error codes at once.
///
/// Use this to verify all variants of an error enum in one test.
///
/// # Example
///
/// ```
/// use foundry_types::{ErrorCode, assert_error_codes};
///
/// #[derive(Debug)]
/// enum LeaseError { Expired, Revoked }
///
/// impl ErrorCode for LeaseError {
///     fn code(&self) -> &'static str {
///         match self {
///             Self::Expired => "LEASE_EXPIRED",
///             Self::Revoked => "LEASE_REVOKED",
///         }
///     }
///     fn is_recoverable(&self) -> bool { false }
/// }
///
/// assert_error_codes(&[LeaseError::Expired, LeaseError::Revoked], "LEASE_");
/// ```
pub fn assert_error_codes<E: ErrorCode>(errors: &[E], expected_prefix: &str) {
    for err in errors {
        assert_error_code(err, expected_prefix);
    }
}

/// Checks if a string is UPPER_SNAKE_CASE.
fn is_upper_snake_case(s: &str) -> bool {
    if s.is_empty() || s.starts_with('_') || s.ends_with('_') || s.contains("__") {
        return false;
    }
    s.chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    enum TestError {
        Transient,
        Fatal,
    }

    impl ErrorCode for TestError {
        fn code(&self) -> &'static str {
            match self {
                Self::Transient => "TEST_TRANSIENT",
                Self::Fatal => "TEST_FATAL",
            }
        }

        fn is_recoverable(&self) -> bool {
            matches!(self, Self::Transient)
        }
    }

    #[test]
    fn error_code_trait() {
        assert_eq!(TestError::Transient.code(), "TEST_TRANSIENT");
        assert!(TestError::Transient.is_recoverable());
        assert_eq!(TestError::Fatal.code(), "TEST_FATAL");
        assert!(!TestError::Fatal.is_recoverable());
    }

    #[test]
    fn assert_error_code_accepts_valid() {
        assert_error_code(&TestError::Transient, "TEST_");
        assert_error_codes(&[TestError::Transient, TestError::Fatal], "TEST_");
    }

    #[test]
    #[should_panic(expected = "must start with prefix")]
    fn assert_error_code_rejects_wrong_prefix() {
        assert_error_code(&TestError::Transient, "OTHER_");
    }

    #[test]
    fn upper_snake_case_rules() {
        assert!(is_upper_snake_case("POOL_EXHAUSTED"));
        assert!(is_upper_snake_case("A_B_2"));
        assert!(!is_upper_snake_case(""));
        assert!(!is_upper_snake_case("pool_exhausted"));
        assert!(!is_upper_snake_case("_POOL"));
        assert!(!is_upper_snake_case("POOL_"));
        assert!(!is_upper_snake_case("POOL__X"));
    }
}
