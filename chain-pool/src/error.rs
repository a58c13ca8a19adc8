//! Error types for pool allocation and construction.

use std::alloc::Layout;
use std::fmt;

/// The backend could not supply a block.
///
/// Carries the size and alignment of the failed request. Nothing in the pool
/// changes when this is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocError {
    size: usize,
    align: usize,
}

impl AllocError {
    /// Creates an error for a failed request of `layout`.
    #[inline]
    pub const fn new(layout: Layout) -> Self {
        Self {
            size: layout.size(),
            align: layout.align(),
        }
    }

    /// Error for a block whose byte size cannot be represented.
    #[inline]
    pub(crate) const fn overflow() -> Self {
        Self {
            size: usize::MAX,
            align: 1,
        }
    }

    /// Requested size in bytes.
    #[inline]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Requested alignment in bytes.
    #[inline]
    pub const fn align(&self) -> usize {
        self.align
    }
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.size == usize::MAX {
            write!(f, "block size overflows the address space")
        } else {
            write!(
                f,
                "failed to allocate {} bytes (align {})",
                self.size, self.align
            )
        }
    }
}

impl std::error::Error for AllocError {}

/// Error during pool construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildError {
    /// Baseline block size is zero.
    ZeroBaseline,
    /// Pre-allocating the requested capacity failed.
    Alloc(AllocError),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::ZeroBaseline => write!(f, "baseline block size cannot be zero"),
            BuildError::Alloc(e) => write!(f, "pre-allocation failed: {e}"),
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BuildError::ZeroBaseline => None,
            BuildError::Alloc(e) => Some(e),
        }
    }
}

impl From<AllocError> for BuildError {
    fn from(e: AllocError) -> Self {
        BuildError::Alloc(e)
    }
}
