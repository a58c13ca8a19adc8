//! Node and block bookkeeping for the pool.
//!
//! Slots live in backend-provided memory and are addressed by [`NodeId`],
//! never by raw pointer. This module only describes the layout; allocation
//! and the free-stack are handled in lib.rs.

use std::alloc::Layout;
use std::ptr::NonNull;

/// Sentinel block index. Never handed out, so `NodeId::NONE` cannot collide
/// with a real slot.
pub(crate) const BLOCK_NONE: u32 = u32::MAX;

/// Largest number of slots a single block may hold.
pub const MAX_BLOCK_SLOTS: u32 = u32::MAX - 1;

/// Handle to a node slot. Encodes block index and slot index.
///
/// Slot 0 of every block is its *block head*: the slot through which the
/// whole block is released.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// The empty link.
    pub const NONE: Self = Self(u64::MAX);

    #[inline]
    pub(crate) const fn new(block: u32, slot: u32) -> Self {
        Self(((block as u64) << 32) | (slot as u64))
    }

    /// Index of the block this slot was carved from.
    #[inline]
    pub const fn block(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Slot index within its block.
    #[inline]
    pub const fn slot(self) -> u32 {
        self.0 as u32
    }

    /// Returns `true` if this is the empty link.
    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == u64::MAX
    }

    /// Returns `true` if this refers to a slot.
    #[inline]
    pub const fn is_some(self) -> bool {
        !self.is_none()
    }

    /// Returns `true` if this slot is the head of its block.
    #[inline]
    pub const fn is_block_head(self) -> bool {
        self.is_some() && self.slot() == 0
    }
}

/// A single pool slot: one `u32` payload and a forward link.
///
/// The link threads either a live chain owned by a list or the pool's
/// free-stack, never both at once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Node {
    /// Payload.
    pub value: u32,
    /// Next node in whichever chain currently threads this slot.
    pub next: NodeId,
}

impl Node {
    #[inline]
    pub(crate) const fn vacant(next: NodeId) -> Self {
        Self { value: 0, next }
    }
}

/// One backend allocation carved into `slots` nodes.
#[derive(Debug)]
pub(crate) struct Block {
    /// Address of slot 0 (the block head).
    pub ptr: NonNull<Node>,
    /// Number of slots in this block.
    pub slots: u32,
    /// Layout the block was allocated with; release must use the same one.
    pub layout: Layout,
}
