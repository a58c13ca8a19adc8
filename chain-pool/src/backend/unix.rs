//! Unix backend using mmap.

use std::alloc::Layout;
use std::ptr::NonNull;

use super::Backend;
use crate::AllocError;

// =============================================================================
// Page Size Helpers
// =============================================================================

fn page_size() -> usize {
    #[cfg(miri)]
    {
        4096
    }

    #[cfg(not(miri))]
    {
        static PAGE_SIZE: std::sync::OnceLock<usize> = std::sync::OnceLock::new();
        *PAGE_SIZE.get_or_init(|| {
            let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
            assert!(size > 0, "failed to get page size");
            size as usize
        })
    }
}

#[inline]
fn round_to_pages(size: usize) -> Option<usize> {
    let page = page_size();
    size.checked_add(page - 1).map(|s| s & !(page - 1))
}

// =============================================================================
// Pages
// =============================================================================

/// Backend that maps every block directly from the OS.
///
/// Blocks are page-aligned and prefaulted at allocation time, so the first
/// walk over a fresh block does not take page faults. Blocks of 2MB or more
/// are advised for transparent huge pages on Linux.
///
/// # Example
///
/// ```
/// use chain_pool::{Pages, PoolBuilder};
///
/// let pool = PoolBuilder::default()
///     .backend(Pages::new())
///     .capacity(1024)
///     .build()
///     .unwrap();
/// assert!(pool.capacity() >= 1024);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct Pages {
    mlock: bool,
}

impl Pages {
    /// Creates a backend with default settings (no mlock).
    pub const fn new() -> Self {
        Self { mlock: false }
    }

    /// Lock every block in physical RAM. Allocation fails if `mlock` fails
    /// (usually `RLIMIT_MEMLOCK`).
    pub const fn mlock(mut self, enabled: bool) -> Self {
        self.mlock = enabled;
        self
    }
}

// Safety: blocks are fresh page-aligned mappings at least `layout.size()`
// bytes long, unmapped only by `release`
unsafe impl Backend for Pages {
    #[cfg(miri)]
    fn allocate(&mut self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        assert!(layout.size() > 0, "allocation size must be non-zero");
        if layout.align() > page_size() {
            return Err(AllocError::new(layout));
        }

        let size = round_to_pages(layout.size()).ok_or(AllocError::new(layout))?;
        let mapped = Layout::from_size_align(size, page_size().max(layout.align()))
            .map_err(|_| AllocError::new(layout))?;
        let ptr = unsafe { std::alloc::alloc_zeroed(mapped) };
        NonNull::new(ptr).ok_or(AllocError::new(layout))
    }

    #[cfg(not(miri))]
    fn allocate(&mut self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        assert!(layout.size() > 0, "allocation size must be non-zero");

        // mmap only guarantees page alignment
        let page_size = page_size();
        if layout.align() > page_size {
            return Err(AllocError::new(layout));
        }

        let size = round_to_pages(layout.size()).ok_or(AllocError::new(layout))?;

        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };

        if ptr == libc::MAP_FAILED {
            return Err(AllocError::new(layout));
        }

        let ptr = NonNull::new(ptr.cast::<u8>()).ok_or(AllocError::new(layout))?;

        // Request THP for large blocks
        #[cfg(target_os = "linux")]
        if size >= 2 * 1024 * 1024 {
            unsafe {
                libc::madvise(ptr.as_ptr().cast(), size, libc::MADV_HUGEPAGE);
            }
        }

        // Prefault all pages
        for offset in (0..size).step_by(page_size) {
            unsafe {
                std::ptr::write_volatile(ptr.as_ptr().add(offset), 0);
            }
        }

        if self.mlock {
            let result = unsafe { libc::mlock(ptr.as_ptr().cast(), size) };
            if result != 0 {
                unsafe {
                    libc::munmap(ptr.as_ptr().cast(), size);
                }
                return Err(AllocError::new(layout));
            }
        }

        Ok(ptr)
    }

    #[cfg(miri)]
    unsafe fn release(&mut self, ptr: NonNull<u8>, layout: Layout) {
        let size = round_to_pages(layout.size()).expect("invalid layout");
        let mapped = Layout::from_size_align(size, page_size().max(layout.align()))
            .expect("invalid layout");
        unsafe { std::alloc::dealloc(ptr.as_ptr(), mapped) }
    }

    #[cfg(not(miri))]
    unsafe fn release(&mut self, ptr: NonNull<u8>, layout: Layout) {
        let size = round_to_pages(layout.size()).expect("invalid layout");
        unsafe {
            libc::munmap(ptr.as_ptr().cast(), size);
        }
    }
}
