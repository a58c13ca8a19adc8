//! Error types for list, cursor and queue operations.

use std::fmt;

use chain_pool::AllocError;

/// Error from a positional list operation.
///
/// Either way the list is left exactly as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListError {
    /// Index outside the valid range for the operation.
    OutOfBounds {
        /// The index that was passed.
        index: usize,
        /// List length at the time of the call.
        len: usize,
    },
    /// The pool could not grow.
    Alloc(AllocError),
}

impl fmt::Display for ListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListError::OutOfBounds { index, len } => {
                write!(f, "index {index} out of bounds for list of length {len}")
            }
            ListError::Alloc(e) => write!(f, "node allocation failed: {e}"),
        }
    }
}

impl std::error::Error for ListError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ListError::OutOfBounds { .. } => None,
            ListError::Alloc(e) => Some(e),
        }
    }
}

impl From<AllocError> for ListError {
    fn from(e: AllocError) -> Self {
        ListError::Alloc(e)
    }
}

/// A [`Cursor`](crate::Cursor) was used after its list mutated, or with a
/// list it was not created from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaleCursor;

impl fmt::Display for StaleCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cursor is stale: list was mutated or is not the one it was created from")
    }
}

impl std::error::Error for StaleCursor {}
