//! Allocation backends.
//!
//! A [`Backend`] is the only source of memory for a [`Pool`](crate::Pool).
//! It is passed in at construction, so independent pools in one process can
//! use different strategies (or wrap the same one for instrumentation).
//!
//! | Backend | Source | Notes |
//! |---------|--------|-------|
//! | [`System`] | `std::alloc` | Default |
//! | [`Pages`] | `mmap` (unix) | Page-aligned, prefaulted, optional `mlock` |
//! | [`Counting`] | wraps another backend | Call counts, live bytes, time spent |

mod counting;
#[cfg(unix)]
mod unix;

use std::alloc::Layout;
use std::ptr::NonNull;

use crate::AllocError;

pub use counting::{AllocStats, Counting};
#[cfg(unix)]
pub use unix::Pages;

/// Source of block memory for a pool.
///
/// The pool calls [`allocate`](Backend::allocate) once per grown block and
/// [`release`](Backend::release) once per block, through the block head,
/// when the pool is cleared or dropped.
///
/// # Safety
///
/// The pool writes nodes through every pointer `allocate` returns, so
/// implementors must uphold the same contract as
/// [`GlobalAlloc`](std::alloc::GlobalAlloc):
///
/// - An `Ok(ptr)` from `allocate(layout)` is valid for reads and writes of
///   `layout.size()` bytes and aligned to `layout.align()`.
/// - That memory does not overlap any other live block and stays valid
///   until `release` is called on it, even if the backend is moved.
/// - On failure, return `Err`; never a dangling or undersized pointer.
///
/// A backend that cannot meet this must not be written with safe code:
///
/// ```compile_fail
/// use std::alloc::Layout;
/// use std::ptr::NonNull;
/// use chain_pool::{AllocError, Backend};
///
/// struct Dangling;
///
/// impl Backend for Dangling {
///     fn allocate(&mut self, _layout: Layout) -> Result<NonNull<u8>, AllocError> {
///         Ok(NonNull::dangling())
///     }
///     unsafe fn release(&mut self, _ptr: NonNull<u8>, _layout: Layout) {}
/// }
/// ```
pub unsafe trait Backend {
    /// Allocates a block of at least `layout.size()` bytes aligned to
    /// `layout.align()`.
    ///
    /// The returned memory may be uninitialized.
    fn allocate(&mut self, layout: Layout) -> Result<NonNull<u8>, AllocError>;

    /// Releases a block.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate` on this backend with the
    /// same `layout`, and must not have been released already.
    unsafe fn release(&mut self, ptr: NonNull<u8>, layout: Layout);
}

// Safety: forwards to the boxed backend, which upholds the contract
unsafe impl<B: Backend + ?Sized> Backend for Box<B> {
    #[inline]
    fn allocate(&mut self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        (**self).allocate(layout)
    }

    #[inline]
    unsafe fn release(&mut self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { (**self).release(ptr, layout) }
    }
}

/// Backend using the global allocator.
#[derive(Clone, Copy, Debug, Default)]
pub struct System;

// Safety: `std::alloc::alloc` returns memory valid for `layout` until `dealloc`
unsafe impl Backend for System {
    fn allocate(&mut self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        assert!(layout.size() > 0, "allocation size must be non-zero");

        let ptr = unsafe { std::alloc::alloc(layout) };
        NonNull::new(ptr).ok_or(AllocError::new(layout))
    }

    unsafe fn release(&mut self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(size: usize) -> Layout {
        Layout::from_size_align(size, 8).unwrap()
    }

    #[test]
    fn system_alloc_small() {
        let mut backend = System;
        let l = layout(16);
        let ptr = backend.allocate(l).unwrap();
        assert_eq!(ptr.as_ptr() as usize % 8, 0);
        unsafe { backend.release(ptr, l) };
    }

    #[test]
    fn system_can_write_entire_block() {
        let mut backend = System;
        let size = 16 * 1024;
        let l = layout(size);
        let ptr = backend.allocate(l).unwrap();
        unsafe {
            std::ptr::write_bytes(ptr.as_ptr(), 0xAB, size);
            assert_eq!(*ptr.as_ptr(), 0xAB);
            assert_eq!(*ptr.as_ptr().add(size - 1), 0xAB);
            backend.release(ptr, l);
        }
    }

    #[test]
    #[should_panic(expected = "non-zero")]
    fn system_zero_size_panics() {
        let _ = System.allocate(layout(0));
    }

    #[test]
    fn boxed_dyn_backend() {
        let mut backend: Box<dyn Backend> = Box::new(System);
        let l = layout(64);
        let ptr = backend.allocate(l).unwrap();
        unsafe { backend.release(ptr, l) };
    }

    #[test]
    fn distinct_allocations() {
        let mut backend = System;
        let l = layout(256);
        let ptrs: Vec<_> = (0..10).map(|_| backend.allocate(l).unwrap()).collect();
        for i in 0..ptrs.len() {
            for j in (i + 1)..ptrs.len() {
                assert_ne!(ptrs[i], ptrs[j]);
            }
        }
        for ptr in ptrs {
            unsafe { backend.release(ptr, l) };
        }
    }

    /// Forwards to `System` and checks every block it hands the pool.
    struct Checked {
        blocks: usize,
    }

    // Safety: forwards to `System`
    unsafe impl Backend for Checked {
        fn allocate(&mut self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
            let ptr = System.allocate(layout)?;
            assert_eq!(ptr.as_ptr() as usize % layout.align(), 0);
            self.blocks += 1;
            Ok(ptr)
        }

        unsafe fn release(&mut self, ptr: NonNull<u8>, layout: Layout) {
            self.blocks -= 1;
            unsafe { System.release(ptr, layout) }
        }
    }

    #[test]
    fn user_backend_drives_list_sized_pool() {
        let mut pool = crate::PoolBuilder::default()
            .baseline(4)
            .backend(Checked { blocks: 0 })
            .build()
            .unwrap();

        let ids: Vec<_> = (0..10).map(|live| pool.get_node(live).unwrap()).collect();
        for (i, &id) in ids.iter().enumerate() {
            pool.get_mut(id).value = i as u32;
        }
        for (i, &id) in ids.iter().enumerate() {
            assert_eq!(pool.get(id).value, i as u32);
        }
        assert_eq!(pool.backend().blocks, 3);

        for id in ids {
            pool.put_node(id);
        }
        pool.release_blocks();
        assert_eq!(pool.backend().blocks, 0);
    }
}
