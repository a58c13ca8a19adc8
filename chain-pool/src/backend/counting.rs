//! Instrumented backend wrapper.

use std::alloc::Layout;
use std::ptr::NonNull;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use super::{Backend, System};
use crate::AllocError;

/// Counters shared between a [`Counting`] backend and its observers.
///
/// Read them while the pool is alive or after it has been dropped.
#[derive(Debug, Default)]
pub struct AllocStats {
    allocations: AtomicUsize,
    failures: AtomicUsize,
    releases: AtomicUsize,
    live_bytes: AtomicUsize,
    peak_bytes: AtomicUsize,
    allocate_nanos: AtomicU64,
    release_nanos: AtomicU64,
}

impl AllocStats {
    /// Successful `allocate` calls.
    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::Relaxed)
    }

    /// Failed `allocate` calls.
    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }

    /// `release` calls.
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::Relaxed)
    }

    /// Blocks allocated and not yet released.
    pub fn outstanding(&self) -> usize {
        self.allocations().saturating_sub(self.releases())
    }

    /// Bytes allocated and not yet released.
    pub fn live_bytes(&self) -> usize {
        self.live_bytes.load(Ordering::Relaxed)
    }

    /// High-water mark of `live_bytes`.
    pub fn peak_bytes(&self) -> usize {
        self.peak_bytes.load(Ordering::Relaxed)
    }

    /// Total time spent inside the wrapped backend's `allocate`.
    pub fn allocate_time(&self) -> Duration {
        Duration::from_nanos(self.allocate_nanos.load(Ordering::Relaxed))
    }

    /// Total time spent inside the wrapped backend's `release`.
    pub fn release_time(&self) -> Duration {
        Duration::from_nanos(self.release_nanos.load(Ordering::Relaxed))
    }

    fn record_allocate(&self, bytes: usize, elapsed: Duration, ok: bool) {
        self.allocate_nanos
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
        if !ok {
            self.failures.fetch_add(1, Ordering::Relaxed);
            return;
        }
        self.allocations.fetch_add(1, Ordering::Relaxed);
        let live = self.live_bytes.fetch_add(bytes, Ordering::Relaxed) + bytes;
        self.peak_bytes.fetch_max(live, Ordering::Relaxed);
    }

    fn record_release(&self, bytes: usize, elapsed: Duration) {
        self.release_nanos
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
        self.releases.fetch_add(1, Ordering::Relaxed);
        self.live_bytes.fetch_sub(bytes, Ordering::Relaxed);
    }
}

/// Backend wrapper that counts and times every call to the inner backend.
///
/// # Example
///
/// ```
/// use chain_pool::{Counting, Pool};
///
/// let backend = Counting::default();
/// let stats = backend.stats();
///
/// let mut pool = Pool::with_backend(backend);
/// let id = pool.get_node(0).unwrap();
/// pool.put_node(id);
/// assert_eq!(stats.allocations(), 1);
///
/// drop(pool);
/// assert_eq!(stats.releases(), 1);
/// ```
#[derive(Debug)]
pub struct Counting<B = System> {
    inner: B,
    stats: Arc<AllocStats>,
}

impl<B> Counting<B> {
    /// Wraps `inner` with fresh counters.
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            stats: Arc::new(AllocStats::default()),
        }
    }

    /// Handle to the counters.
    pub fn stats(&self) -> Arc<AllocStats> {
        Arc::clone(&self.stats)
    }

    /// The wrapped backend.
    pub fn inner(&self) -> &B {
        &self.inner
    }
}

impl Default for Counting<System> {
    fn default() -> Self {
        Self::new(System)
    }
}

// Safety: every call is forwarded unchanged to `inner`
unsafe impl<B: Backend> Backend for Counting<B> {
    fn allocate(&mut self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        let start = Instant::now();
        let result = self.inner.allocate(layout);
        self.stats
            .record_allocate(layout.size(), start.elapsed(), result.is_ok());
        result
    }

    unsafe fn release(&mut self, ptr: NonNull<u8>, layout: Layout) {
        let start = Instant::now();
        unsafe { self.inner.release(ptr, layout) };
        self.stats.record_release(layout.size(), start.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Backend that always fails.
    struct Exhausted;

    unsafe impl Backend for Exhausted {
        fn allocate(&mut self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
            Err(AllocError::new(layout))
        }

        unsafe fn release(&mut self, _ptr: NonNull<u8>, _layout: Layout) {
            unreachable!("nothing was allocated")
        }
    }

    #[test]
    fn counts_allocate_and_release() {
        let mut backend = Counting::default();
        let stats = backend.stats();
        let l = Layout::from_size_align(128, 8).unwrap();

        let a = backend.allocate(l).unwrap();
        let b = backend.allocate(l).unwrap();
        assert_eq!(stats.allocations(), 2);
        assert_eq!(stats.live_bytes(), 256);
        assert_eq!(stats.outstanding(), 2);

        unsafe { backend.release(a, l) };
        assert_eq!(stats.releases(), 1);
        assert_eq!(stats.live_bytes(), 128);
        assert_eq!(stats.peak_bytes(), 256);

        unsafe { backend.release(b, l) };
        assert_eq!(stats.outstanding(), 0);
        assert_eq!(stats.live_bytes(), 0);
    }

    #[test]
    fn counts_failures_separately() {
        let mut backend = Counting::new(Exhausted);
        let stats = backend.stats();
        let l = Layout::from_size_align(64, 8).unwrap();

        assert!(backend.allocate(l).is_err());
        assert_eq!(stats.allocations(), 0);
        assert_eq!(stats.failures(), 1);
        assert_eq!(stats.live_bytes(), 0);
    }

    #[test]
    fn stats_outlive_backend() {
        let stats = {
            let mut backend = Counting::default();
            let l = Layout::from_size_align(32, 8).unwrap();
            let ptr = backend.allocate(l).unwrap();
            unsafe { backend.release(ptr, l) };
            backend.stats()
        };
        assert_eq!(stats.allocations(), 1);
        assert_eq!(stats.releases(), 1);
    }
}
