//! Unified error interface for the sower crates.
//!
//! Every error enum in the workspace implements [`ErrorCode`] so callers
//! (and the host framework embedding the service) can dispatch on stable
//! machine-readable codes instead of matching display strings.
//!
//! Seed misconfiguration is fatal by design: running a job with a wrong
//! seed silently would destroy reproducibility, so almost nothing here is
//! recoverable. The flag exists for the few cases where fixing the
//! configuration and resubmitting is the expected remedy.

/// Stable machine-readable code for an error.
///
/// # Code format
///
/// - UPPER_SNAKE_CASE
/// - prefixed with the originating layer (`POLICY_`, `SERVICE_`)
/// - stable once published; changing a code is a breaking change
///
/// # Example
///
/// ```
/// use sower_types::ErrorCode;
///
/// #[derive(Debug)]
/// enum SetupError {
///     MissingKey(String),
/// }
///
/// impl ErrorCode for SetupError {
///     fn code(&self) -> &'static str {
///         "SETUP_MISSING_KEY"
///     }
///     fn is_recoverable(&self) -> bool {
///         true // fix the configuration and resubmit
///     }
/// }
///
/// let err = SetupError::MissingKey("baseSeed".into());
/// assert_eq!(err.code(), "SETUP_MISSING_KEY");
/// ```
pub trait ErrorCode {
    /// Returns the machine-readable code for this error.
    fn code(&self) -> &'static str;

    /// Returns whether a corrected retry of the job can succeed.
    ///
    /// `true` for configuration mistakes the user can fix; `false` for
    /// logic errors in the calling code.
    fn is_recoverable(&self) -> bool;
}

/// Asserts that an error code follows the workspace conventions.
///
/// Checks the code is non-empty, UPPER_SNAKE_CASE, and carries the
/// expected layer prefix. Panics with a descriptive message otherwise.
pub fn assert_error_code<E: ErrorCode>(err: &E, expected_prefix: &str) {
    let code = err.code();
    assert!(!code.is_empty(), "error code must not be empty");
    assert!(
        code.starts_with(expected_prefix),
        "error code '{code}' must start with prefix '{expected_prefix}'"
    );
    assert!(
        is_upper_snake_case(code),
        "error code '{code}' must be UPPER_SNAKE_CASE"
    );
}

/// Asserts [`assert_error_code`] over every variant of an error enum.
pub fn assert_error_codes<E: ErrorCode>(errors: &[E], expected_prefix: &str) {
    for err in errors {
        assert_error_code(err, expected_prefix);
    }
}

fn is_upper_snake_case(s: &str) -> bool {
    !s.is_empty()
        && !s.starts_with('_')
        && !s.ends_with('_')
        && !s.contains("__")
        && s.chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    enum TestError {
        Fixable,
        Fatal,
    }

    impl ErrorCode for TestError {
        fn code(&self) -> &'static str {
            match self {
                Self::Fixable => "TEST_FIXABLE",
                Self::Fatal => "TEST_FATAL",
            }
        }

        fn is_recoverable(&self) -> bool {
            matches!(self, Self::Fixable)
        }
    }

    #[test]
    fn codes_and_recoverability() {
        assert_eq!(TestError::Fixable.code(), "TEST_FIXABLE");
        assert!(TestError::Fixable.is_recoverable());
        assert!(!TestError::Fatal.is_recoverable());
    }

    #[test]
    fn assert_helpers_accept_valid_codes() {
        assert_error_codes(&[TestError::Fixable, TestError::Fatal], "TEST_");
    }

    #[test]
    #[should_panic(expected = "must start with prefix")]
    fn assert_helper_rejects_wrong_prefix() {
        assert_error_code(&TestError::Fatal, "OTHER_");
    }

    #[test]
    fn snake_case_check() {
        assert!(is_upper_snake_case("POLICY_UNKNOWN"));
        assert!(is_upper_snake_case("A_1"));
        assert!(!is_upper_snake_case(""));
        assert!(!is_upper_snake_case("_X"));
        assert!(!is_upper_snake_case("X_"));
        assert!(!is_upper_snake_case("A__B"));
        assert!(!is_upper_snake_case("lower"));
    }
}
