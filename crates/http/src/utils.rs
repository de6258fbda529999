//! Utility macros shared across the crate.

/// Early-return with an error when a condition does not hold.
///
/// Like `assert!`, but produces an `Err` instead of panicking, which keeps
/// validation checks on the non-panicking path the rest of the crate uses.
///
/// # Example
///
/// ```ignore
/// ensure!(head_size <= MAX_HEAD_BYTES, ParseError::header_too_large(head_size, MAX_HEAD_BYTES));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
