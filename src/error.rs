//! Error types for pool construction and the handful of fallible pool operations.
use std::fmt;

/// Errors raised by a pool's fallible entry points.
///
/// All three variants are precondition violations: the pool never returns
/// one of these because of contention, because it is temporarily empty, or
/// because of anything else a caller should retry. Contention is handled
/// internally (see the crate-level docs); these are bugs in the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierpoolError {
    /// A null/absent element was supplied to `return_obj`.
    NullElement,
    /// An array returned to an [`crate::array::ArrayPool`] did not match the
    /// length it was rented at.
    LengthMismatch { expected: usize, found: usize },
    /// A capacity or tier-count parameter given to a pool constructor was
    /// out of range (e.g. zero).
    InvalidCapacity { what: &'static str, value: usize },
}

impl fmt::Display for TierpoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NullElement => write!(f, "null element supplied to return_obj"),
            Self::LengthMismatch { expected, found } => write!(
                f,
                "array length mismatch: pool holds length {expected}, got {found}"
            ),
            Self::InvalidCapacity { what, value } => {
                write!(f, "invalid {what}: {value}")
            }
        }
    }
}

impl std::error::Error for TierpoolError {}

/// Result alias for this crate's fallible operations.
pub type Result<T> = std::result::Result<T, TierpoolError>;
