//! FIFO queue over a [`List`].

use chain_pool::{AllocError, Backend, Pool, System};

use crate::List;

/// FIFO queue of `u32`: push at the tail, pop at the head.
///
/// ```
/// use chain_list::Queue;
///
/// let mut queue = Queue::new();
/// queue.push(1).unwrap();
/// queue.push(2).unwrap();
///
/// assert_eq!(queue.peek(), Some(1));
/// assert_eq!(queue.pop(), Some(1));
/// assert_eq!(queue.pop(), Some(2));
/// assert!(!queue.has_next());
/// ```
pub struct Queue<B: Backend = System> {
    list: List<B>,
}

impl Queue<System> {
    /// Creates an empty queue over the global allocator.
    pub fn new() -> Self {
        Self { list: List::new() }
    }

    /// Creates an empty queue with room for at least `capacity` values.
    pub fn with_capacity(capacity: usize) -> Result<Self, AllocError> {
        Ok(Self {
            list: List::with_capacity(capacity)?,
        })
    }
}

impl Default for Queue<System> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> Queue<B> {
    /// Creates an empty queue that takes ownership of `pool`.
    ///
    /// # Panics
    ///
    /// Panics if `pool` has nodes checked out.
    pub fn with_pool(pool: Pool<B>) -> Self {
        Self {
            list: List::with_pool(pool),
        }
    }

    /// Enqueue `value` at the tail.
    #[inline]
    pub fn push(&mut self, value: u32) -> Result<(), AllocError> {
        self.list.push_back(value)
    }

    /// Dequeue the head value.
    #[inline]
    pub fn pop(&mut self) -> Option<u32> {
        self.list.remove(0).ok()
    }

    /// Head value without removing it.
    #[inline]
    pub fn peek(&self) -> Option<u32> {
        self.list.front()
    }

    /// Number of queued values.
    #[inline]
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Returns `true` if nothing is queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Returns `true` if a `pop` would return a value.
    #[inline]
    pub fn has_next(&self) -> bool {
        !self.list.is_empty()
    }

    /// Drop every queued value and release the pool's blocks.
    pub fn clear(&mut self) {
        self.list.remove_all();
    }

    /// The underlying list, for iteration and inspection.
    #[inline]
    pub fn as_list(&self) -> &List<B> {
        &self.list
    }
}

impl<B: Backend> std::fmt::Debug for Queue<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue").field("items", &self.list).finish()
    }
}
