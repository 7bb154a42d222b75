//! Unified error interface for warden.
//!
//! Every layer of the workspace defines its own error enum and implements
//! [`ErrorCode`] on it, so that callers get:
//!
//! - **Machine-readable codes** for programmatic handling and log filtering
//! - **Recoverability info** for deciding between retry and giving up
//!
//! # Code Convention
//!
//! Codes are UPPER_SNAKE_CASE and prefixed with the owning layer:
//! `EVENT_`, `COMMAND_`, `RUNTIME_`. A code is part of the API contract and
//! must not change once published.
//!
//! # Example
//!
//! ```
//! use warden_types::ErrorCode;
//!
//! #[derive(Debug)]
//! enum StoreError {
//!     Busy,
//!     Corrupt(String),
//! }
//!
//! impl ErrorCode for StoreError {
//!     fn code(&self) -> &'static str {
//!         match self {
//!             Self::Busy => "STORE_BUSY",
//!             Self::Corrupt(_) => "STORE_CORRUPT",
//!         }
//!     }
//!
//!     fn is_recoverable(&self) -> bool {
//!         matches!(self, Self::Busy)
//!     }
//! }
//!
//! let err = StoreError::Busy;
//! assert_eq!(err.code(), "STORE_BUSY");
//! assert!(err.is_recoverable());
//! ```

/// Unified error code interface.
///
/// An error is **recoverable** when retrying the operation may succeed or
/// the user can take a corrective action (transient I/O, busy resource).
/// It is **not recoverable** when a retry cannot change the outcome
/// (invalid input, a missing command, a one-shot gate already fired).
pub trait ErrorCode {
    /// Returns the machine-readable error code.
    ///
    /// UPPER_SNAKE_CASE, prefixed with the owning layer, stable across
    /// versions.
    fn code(&self) -> &'static str;

    /// Returns whether retrying the failed operation may succeed.
    fn is_recoverable(&self) -> bool;
}

/// Validates that an error code follows the workspace conventions.
///
/// Checks that the code is non-empty, UPPER_SNAKE_CASE, and carries the
/// expected layer prefix.
///
/// # Panics
///
/// Panics with a descriptive message if any check fails. Intended for use
/// in each layer's error tests.
pub fn assert_error_code<E: ErrorCode>(err: &E, expected_prefix: &str) {
    let code = err.code();

    assert!(!code.is_empty(), "error code must not be empty");
    assert!(
        code.starts_with(expected_prefix),
        "error code '{}' must start with prefix '{}'",
        code,
        expected_prefix
    );
    assert!(
        is_upper_snake_case(code),
        "error code '{}' must be UPPER_SNAKE_CASE",
        code
    );
}

/// Validates every variant of an error enum at once.
///
/// # Example
///
/// ```
/// use warden_types::{assert_error_codes, ErrorCode};
///
/// #[derive(Debug)]
/// enum MyError { A, B }
///
/// impl ErrorCode for MyError {
///     fn code(&self) -> &'static str {
///         match self {
///             Self::A => "MY_A",
///             Self::B => "MY_B",
///         }
///     }
///     fn is_recoverable(&self) -> bool { false }
/// }
///
/// assert_error_codes(&[MyError::A, MyError::B], "MY_");
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
