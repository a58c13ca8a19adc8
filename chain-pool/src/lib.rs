//! chain-pool - block-allocating node pool with a LIFO free-stack.
//!
//! Nodes are carved out of large blocks obtained from a pluggable
//! [`Backend`]. Freed nodes go onto a free-stack and are handed out again
//! before any new block is grown, so steady-state insert/remove churn never
//! touches the backend.
//!
//! Nodes are addressed by [`NodeId`] (block index + slot index), not by
//! address. Slot 0 of every block is its *block head*; blocks are released
//! once each, through their head, and only when every slot is back on the
//! free-stack.
//!
//! # Example
//!
//! ```
//! use chain_pool::{Growth, PoolBuilder};
//!
//! let mut pool = PoolBuilder::default()
//!     .baseline(1024)
//!     .growth(Growth::Proportional)
//!     .build()
//!     .unwrap();
//!
//! let id = pool.get_node(0).unwrap();
//! assert!(id.is_block_head());
//! pool.get_mut(id).value = 42;
//!
//! pool.put_node(id);
//! assert_eq!(pool.get_node(0).unwrap(), id); // LIFO reuse
//! ```
//!
//! # Growth
//!
//! When the free-stack is empty the pool grows one block whose size depends
//! on [`Growth`] and on the caller's current live count:
//!
//! ```text
//! Proportional   max(baseline, live)               (default)
//! Capped         min(max(baseline, live), max_slots)
//! Fixed          baseline
//! ```

mod backend;
mod error;
mod meta;

pub use backend::{AllocStats, Backend, Counting, System};
#[cfg(unix)]
pub use backend::Pages;
pub use error::{AllocError, BuildError};
pub use meta::{MAX_BLOCK_SLOTS, Node, NodeId};

use meta::{BLOCK_NONE, Block};

use std::alloc::Layout;

/// Default baseline block size in slots.
pub const DEFAULT_BASELINE: u32 = 16 * 1024;

// =============================================================================
// Growth
// =============================================================================

/// Block sizing policy used when the free-stack runs dry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Growth {
    /// `max(baseline, live)` slots. Large lists amortize growth in
    /// proportion to their own size.
    #[default]
    Proportional,
    /// Like `Proportional`, but never more than `max_slots` per block.
    Capped {
        /// Upper bound on slots per block.
        max_slots: u32,
    },
    /// Always `baseline` slots.
    Fixed,
}

impl Growth {
    /// Slots in the next block for a pool with `baseline` and `live` nodes
    /// currently in use.
    ///
    /// Always in `1..=MAX_BLOCK_SLOTS`.
    pub fn block_slots(self, baseline: u32, live: usize) -> u32 {
        let live = u32::try_from(live).unwrap_or(MAX_BLOCK_SLOTS);
        let slots = match self {
            Growth::Proportional => baseline.max(live),
            Growth::Capped { max_slots } => baseline.max(live).min(max_slots),
            Growth::Fixed => baseline,
        };
        slots.clamp(1, MAX_BLOCK_SLOTS)
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`Pool`].
///
/// ```
/// use chain_pool::{Counting, Growth, PoolBuilder};
///
/// let pool = PoolBuilder::default()
///     .baseline(4096)
///     .growth(Growth::Capped { max_slots: 1 << 20 })
///     .backend(Counting::default())
///     .capacity(10_000)
///     .build()
///     .unwrap();
///
/// assert!(pool.capacity() >= 10_000);
/// ```
#[derive(Clone, Debug)]
pub struct PoolBuilder<B = System> {
    baseline: u32,
    growth: Growth,
    capacity: usize,
    backend: B,
}

impl Default for PoolBuilder<System> {
    fn default() -> Self {
        Self {
            baseline: DEFAULT_BASELINE,
            growth: Growth::default(),
            capacity: 0,
            backend: System,
        }
    }
}

impl<B: Backend> PoolBuilder<B> {
    /// Minimum slots per grown block. Default: 16384.
    pub fn baseline(mut self, slots: u32) -> Self {
        self.baseline = slots;
        self
    }

    /// Block sizing policy. Default: [`Growth::Proportional`].
    pub fn growth(mut self, growth: Growth) -> Self {
        self.growth = growth;
        self
    }

    /// Pre-allocate at least this many free slots at build time.
    /// Default: 0 (nothing is allocated until the first `get_node`).
    pub fn capacity(mut self, slots: usize) -> Self {
        self.capacity = slots;
        self
    }

    /// Allocation backend. Default: [`System`].
    pub fn backend<B2: Backend>(self, backend: B2) -> PoolBuilder<B2> {
        PoolBuilder {
            baseline: self.baseline,
            growth: self.growth,
            capacity: self.capacity,
            backend,
        }
    }

    /// Build the pool.
    pub fn build(self) -> Result<Pool<B>, BuildError> {
        if self.baseline == 0 {
            return Err(BuildError::ZeroBaseline);
        }

        let mut pool = Pool {
            blocks: Vec::new(),
            free_head: NodeId::NONE,
            free_len: 0,
            capacity: 0,
            baseline: self.baseline,
            growth: self.growth,
            backend: self.backend,
        };
        pool.reserve(self.capacity)?;
        Ok(pool)
    }
}

// =============================================================================
// Pool
// =============================================================================

/// Node pool: blocks from a [`Backend`], recycled through a free-stack.
///
/// The pool does not know which nodes are live; callers thread live nodes
/// through [`Node::next`] themselves and hand them back with
/// [`put_node`](Pool::put_node).
pub struct Pool<B: Backend = System> {
    // Block table, indexed by NodeId::block()
    blocks: Vec<Block>,

    // Free-stack, threaded through Node::next
    free_head: NodeId,
    free_len: usize,

    // Total slots across all blocks
    capacity: usize,

    // Config
    baseline: u32,
    growth: Growth,
    backend: B,
}

impl Pool<System> {
    /// Creates an empty pool using the global allocator and default config.
    ///
    /// Allocates nothing until the first [`get_node`](Pool::get_node).
    pub fn new() -> Self {
        Self::with_backend(System)
    }
}

impl Default for Pool<System> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> Pool<B> {
    /// Creates an empty pool over `backend` with default config.
    pub fn with_backend(backend: B) -> Self {
        Self {
            blocks: Vec::new(),
            free_head: NodeId::NONE,
            free_len: 0,
            capacity: 0,
            baseline: DEFAULT_BASELINE,
            growth: Growth::default(),
            backend,
        }
    }

    /// Obtain a slot.
    ///
    /// Pops the most recently freed slot if there is one. Otherwise grows a
    /// block sized by the growth policy for `live` nodes in use, returns its
    /// block head and pushes the remaining slots onto the free-stack.
    ///
    /// The returned node's contents are unspecified; the caller overwrites
    /// both fields.
    ///
    /// # Errors
    ///
    /// Returns `Err(AllocError)` if the backend fails. The pool is unchanged.
    #[inline]
    pub fn get_node(&mut self, live: usize) -> Result<NodeId, AllocError> {
        if self.free_head.is_some() {
            let id = self.free_head;
            self.free_head = self.get(id).next;
            self.free_len -= 1;
            return Ok(id);
        }

        let slots = self.growth.block_slots(self.baseline, live);
        self.grow(slots)
    }

    /// Return a slot to the free-stack.
    ///
    /// The slot must not be reachable from any live chain afterwards.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this pool.
    #[inline]
    pub fn put_node(&mut self, id: NodeId) {
        let head = self.free_head;
        self.get_mut(id).next = head;
        self.free_head = id;
        self.free_len += 1;
    }

    /// Ensure at least `additional` slots are on the free-stack.
    ///
    /// Grows at most one block.
    ///
    /// # Errors
    ///
    /// Returns `Err(AllocError)` if the backend fails, or if the shortfall
    /// exceeds [`MAX_BLOCK_SLOTS`] and so cannot fit in one block. The pool
    /// is unchanged.
    pub fn reserve(&mut self, additional: usize) -> Result<(), AllocError> {
        if self.free_len >= additional {
            return Ok(());
        }

        let live = self.capacity - self.free_len;
        let missing = u32::try_from(additional - self.free_len)
            .ok()
            .filter(|&m| m <= MAX_BLOCK_SLOTS)
            .ok_or(AllocError::overflow())?;
        let slots = self.growth.block_slots(self.baseline, live).max(missing);

        let head = self.grow(slots)?;
        self.put_node(head);
        Ok(())
    }

    /// Release every block back to the backend.
    ///
    /// Walks the free-stack collecting block heads, then releases each block
    /// once through its head. Every slot must already be on the free-stack;
    /// callers push their live chain back with [`put_node`](Pool::put_node)
    /// first. Returns the number of blocks released. Calling it on an empty
    /// pool releases nothing.
    ///
    /// # Panics
    ///
    /// Panics if any slot is still live.
    pub fn release_blocks(&mut self) -> usize {
        assert_eq!(
            self.free_len, self.capacity,
            "cannot release blocks while nodes are live"
        );

        let mut heads = Vec::with_capacity(self.blocks.len());
        let mut id = self.free_head;
        while id.is_some() {
            if id.is_block_head() {
                heads.push(id);
            }
            id = self.get(id).next;
        }
        assert_eq!(
            heads.len(),
            self.blocks.len(),
            "free-stack is missing a block head"
        );

        for head in &heads {
            let block = &self.blocks[head.block() as usize];
            tracing::debug!(
                block = head.block(),
                slots = block.slots,
                bytes = block.layout.size(),
                "releasing node block"
            );
            // Safety: each block has exactly one head, so it is released once
            unsafe { self.backend.release(block.ptr.cast(), block.layout) };
        }

        self.blocks.clear();
        self.free_head = NodeId::NONE;
        self.free_len = 0;
        self.capacity = 0;

        heads.len()
    }

    /// Returns a reference to the node at `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this pool.
    #[inline]
    pub fn get(&self, id: NodeId) -> &Node {
        let block = self.block(id);
        // Safety: slot bounds checked in block()
        unsafe { &*block.ptr.as_ptr().add(id.slot() as usize) }
    }

    /// Returns a mutable reference to the node at `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this pool.
    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        let block = self.block(id);
        let ptr = block.ptr;
        // Safety: slot bounds checked in block()
        unsafe { &mut *ptr.as_ptr().add(id.slot() as usize) }
    }

    /// Returns a reference without bounds checking.
    ///
    /// # Safety
    ///
    /// `id` must have been produced by this pool since its last
    /// [`release_blocks`](Pool::release_blocks).
    #[inline]
    pub unsafe fn get_unchecked(&self, id: NodeId) -> &Node {
        unsafe {
            let block = self.blocks.get_unchecked(id.block() as usize);
            &*block.ptr.as_ptr().add(id.slot() as usize)
        }
    }

    /// Returns a mutable reference without bounds checking.
    ///
    /// # Safety
    ///
    /// `id` must have been produced by this pool since its last
    /// [`release_blocks`](Pool::release_blocks).
    #[inline]
    pub unsafe fn get_unchecked_mut(&mut self, id: NodeId) -> &mut Node {
        unsafe {
            let ptr = self.blocks.get_unchecked(id.block() as usize).ptr;
            &mut *ptr.as_ptr().add(id.slot() as usize)
        }
    }

    /// Total slots across all blocks.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently on the free-stack.
    #[inline]
    pub fn free_len(&self) -> usize {
        self.free_len
    }

    /// Number of blocks currently held.
    #[inline]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Baseline block size in slots.
    #[inline]
    pub fn baseline(&self) -> u32 {
        self.baseline
    }

    /// Block sizing policy.
    #[inline]
    pub fn growth(&self) -> Growth {
        self.growth
    }

    /// The allocation backend.
    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

// =============================================================================
// Internal
// =============================================================================

impl<B: Backend> Pool<B> {
    #[inline]
    fn block(&self, id: NodeId) -> &Block {
        assert!(
            (id.block() as usize) < self.blocks.len(),
            "invalid node id: block index out of bounds"
        );
        let block = &self.blocks[id.block() as usize];
        assert!(
            id.slot() < block.slots,
            "invalid node id: slot index out of bounds"
        );
        block
    }

    /// Allocate a block of `slots` nodes and return its head.
    ///
    /// Slots `1..slots` are pushed so that slot 1 is on top of the free-stack.
    #[cold]
    fn grow(&mut self, slots: u32) -> Result<NodeId, AllocError> {
        debug_assert!(slots >= 1);

        let block = u32::try_from(self.blocks.len())
            .ok()
            .filter(|&b| b != BLOCK_NONE)
            .ok_or(AllocError::overflow())?;
        let layout = Layout::array::<Node>(slots as usize).map_err(|_| AllocError::overflow())?;

        self.blocks.reserve(1);
        let ptr = self.backend.allocate(layout)?.cast::<Node>();

        // Thread 1..slots onto the free-stack below the current top
        let below = self.free_head;
        unsafe {
            ptr.as_ptr().write(Node::vacant(NodeId::NONE));
            for slot in 1..slots {
                let next = if slot + 1 < slots {
                    NodeId::new(block, slot + 1)
                } else {
                    below
                };
                ptr.as_ptr().add(slot as usize).write(Node::vacant(next));
            }
        }
        if slots > 1 {
            self.free_head = NodeId::new(block, 1);
            self.free_len += slots as usize - 1;
        }

        self.blocks.push(Block { ptr, slots, layout });
        self.capacity += slots as usize;

        tracing::debug!(block, slots, bytes = layout.size(), "grew node block");

        Ok(NodeId::new(block, 0))
    }
}

impl<B: Backend> Drop for Pool<B> {
    fn drop(&mut self) {
        for block in self.blocks.drain(..) {
            // Safety: blocks are removed from the table as they are released
            unsafe { self.backend.release(block.ptr.cast(), block.layout) };
        }
    }
}

impl<B: Backend> std::fmt::Debug for Pool<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("blocks", &self.blocks.len())
            .field("capacity", &self.capacity)
            .field("free_len", &self.free_len)
            .field("baseline", &self.baseline)
            .field("growth", &self.growth)
            .finish()
    }
}

// Safety: Pool owns its blocks exclusively; sending it moves that ownership
unsafe impl<B: Backend + Send> Send for Pool<B> {}
