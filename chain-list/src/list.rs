//! Singly-linked list over a node pool.
//!
//! The list owns its [`Pool`]. Every node it links comes from
//! [`Pool::get_node`]; every node it unlinks goes back with
//! [`Pool::put_node`], so removal never calls the backend. Blocks are only
//! released by [`List::remove_all`] and on drop.
//!
//! # Example
//!
//! ```
//! use chain_list::List;
//!
//! let mut list = List::new();
//! list.push_back(5).unwrap();
//! list.push_back(7).unwrap();
//! list.push_front(3).unwrap();
//! assert_eq!(list.iter().collect::<Vec<_>>(), [3, 5, 7]);
//!
//! assert_eq!(list.remove(1), Ok(5));
//! assert_eq!(list.iter().collect::<Vec<_>>(), [3, 7]);
//! assert_eq!(list.find(7), Some(1));
//! ```

use std::iter::FusedIterator;
use std::sync::atomic::{AtomicU64, Ordering};

use chain_pool::{AllocError, Backend, Node, NodeId, Pool, System};

use crate::{Cursor, ListError};

static NEXT_LIST_ID: AtomicU64 = AtomicU64::new(0);

#[inline]
fn next_list_id() -> u64 {
    NEXT_LIST_ID.fetch_add(1, Ordering::Relaxed)
}

/// Singly-linked list of `u32` with head and tail links.
///
/// `push_back`, `push_front`, `remove(0)` and `insert` at either end are
/// O(1). Positional operations elsewhere walk from the head.
pub struct List<B: Backend = System> {
    pool: Pool<B>,
    head: NodeId,
    tail: NodeId,
    len: usize,
    id: u64,
    generation: u64,
}

impl List<System> {
    /// Creates an empty list over the global allocator.
    ///
    /// Allocates nothing until the first insert.
    pub fn new() -> Self {
        Self::with_pool(Pool::new())
    }

    /// Creates an empty list with room for at least `capacity` nodes.
    ///
    /// # Errors
    ///
    /// Returns `Err(AllocError)` if the initial block cannot be allocated.
    pub fn with_capacity(capacity: usize) -> Result<Self, AllocError> {
        let mut pool = Pool::new();
        pool.reserve(capacity)?;
        Ok(Self::with_pool(pool))
    }
}

impl Default for List<System> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Construction and accessors
// =============================================================================

impl<B: Backend> List<B> {
    /// Creates an empty list that takes ownership of `pool`.
    ///
    /// Use [`PoolBuilder`](chain_pool::PoolBuilder) to pick the backend,
    /// baseline and growth policy.
    ///
    /// # Panics
    ///
    /// Panics if `pool` has nodes checked out.
    pub fn with_pool(pool: Pool<B>) -> Self {
        assert_eq!(
            pool.free_len(),
            pool.capacity(),
            "pool handed to a list must have no live nodes"
        );
        Self {
            pool,
            head: NodeId::NONE,
            tail: NodeId::NONE,
            len: 0,
            id: next_list_id(),
            generation: 0,
        }
    }

    /// Number of live nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the list holds no values.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Mutation counter. Bumped by every call that changes the list.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The node pool backing this list.
    #[inline]
    pub fn pool(&self) -> &Pool<B> {
        &self.pool
    }

    /// First value, if any.
    #[inline]
    pub fn front(&self) -> Option<u32> {
        self.value_of(self.head)
    }

    /// Last value, if any.
    #[inline]
    pub fn back(&self) -> Option<u32> {
        self.value_of(self.tail)
    }

    /// Value at `index`, if in bounds. O(index).
    pub fn get(&self, index: usize) -> Option<u32> {
        if index >= self.len {
            return None;
        }
        Some(self.pool.get(self.node_at(index)).value)
    }

    /// Position of the first node holding `value`, if any.
    pub fn find(&self, value: u32) -> Option<usize> {
        self.iter().position(|v| v == value)
    }

    /// Borrowing iterator from head to tail.
    pub fn iter(&self) -> Iter<'_, B> {
        Iter {
            pool: &self.pool,
            next: self.head,
            remaining: self.len,
        }
    }

    /// Forward cursor positioned at `index`.
    ///
    /// # Errors
    ///
    /// Returns `ListError::OutOfBounds` unless `index < len`.
    pub fn cursor(&self, index: usize) -> Result<Cursor, ListError> {
        if index >= self.len {
            return Err(ListError::OutOfBounds {
                index,
                len: self.len,
            });
        }
        let node = self.node_at(index);
        Ok(Cursor::new(
            self.id,
            self.generation,
            node,
            index,
            self.pool.get(node).value,
        ))
    }
}

// =============================================================================
// Mutation
// =============================================================================

impl<B: Backend> List<B> {
    /// Append `value` at the tail.
    ///
    /// # Errors
    ///
    /// Returns `Err(AllocError)` if the pool must grow and cannot. The list
    /// is unchanged.
    pub fn push_back(&mut self, value: u32) -> Result<(), AllocError> {
        let id = self.alloc(value, NodeId::NONE)?;
        if self.tail.is_some() {
            self.pool.get_mut(self.tail).next = id;
        } else {
            self.head = id;
        }
        self.tail = id;
        self.linked();
        Ok(())
    }

    /// Prepend `value` at the head.
    ///
    /// # Errors
    ///
    /// Returns `Err(AllocError)` if the pool must grow and cannot. The list
    /// is unchanged.
    pub fn push_front(&mut self, value: u32) -> Result<(), AllocError> {
        let id = self.alloc(value, self.head)?;
        if self.tail.is_none() {
            self.tail = id;
        }
        self.head = id;
        self.linked();
        Ok(())
    }

    /// Insert `value` so that it ends up at `index`.
    ///
    /// `index == len` appends.
    ///
    /// # Errors
    ///
    /// `ListError::OutOfBounds` if `index > len`, `ListError::Alloc` if the
    /// pool cannot grow. The list is unchanged on error.
    pub fn insert(&mut self, index: usize, value: u32) -> Result<(), ListError> {
        if index > self.len {
            return Err(ListError::OutOfBounds {
                index,
                len: self.len,
            });
        }
        if index == 0 {
            return self.push_front(value).map_err(ListError::from);
        }
        if index == self.len {
            return self.push_back(value).map_err(ListError::from);
        }

        let prev = self.node_at(index - 1);
        let after = self.pool.get(prev).next;
        let id = self.alloc(value, after)?;
        self.pool.get_mut(prev).next = id;
        self.linked();
        Ok(())
    }

    /// Remove and return the value at `index`.
    ///
    /// The node goes back onto the free-stack.
    ///
    /// # Errors
    ///
    /// `ListError::OutOfBounds` unless `index < len`. The list is unchanged.
    pub fn remove(&mut self, index: usize) -> Result<u32, ListError> {
        if index >= self.len {
            return Err(ListError::OutOfBounds {
                index,
                len: self.len,
            });
        }

        let target = if index == 0 {
            let target = self.head;
            self.head = self.pool.get(target).next;
            if self.head.is_none() {
                self.tail = NodeId::NONE;
            }
            target
        } else {
            let prev = self.node_at(index - 1);
            let target = self.pool.get(prev).next;
            let after = self.pool.get(target).next;
            self.pool.get_mut(prev).next = after;
            if target == self.tail {
                self.tail = prev;
            }
            target
        };

        let value = self.pool.get(target).value;
        self.pool.put_node(target);
        self.len -= 1;
        self.generation += 1;
        Ok(value)
    }

    /// Empty the list and release every pool block.
    ///
    /// Live nodes are pushed onto the free-stack first, then each block is
    /// released once through its head. The list stays usable; the next
    /// insert grows a fresh block.
    pub fn remove_all(&mut self) {
        let nodes = self.len;
        let mut id = self.head;
        while id.is_some() {
            let next = self.pool.get(id).next;
            self.pool.put_node(id);
            id = next;
        }

        self.head = NodeId::NONE;
        self.tail = NodeId::NONE;
        self.len = 0;
        self.generation += 1;

        let blocks = self.pool.release_blocks();
        tracing::debug!(list = self.id, nodes, blocks, "removed all nodes");
    }
}

// =============================================================================
// Internal
// =============================================================================

impl<B: Backend> List<B> {
    #[inline]
    fn value_of(&self, id: NodeId) -> Option<u32> {
        if id.is_none() {
            return None;
        }
        Some(self.pool.get(id).value)
    }

    /// Walk `index` links from head. Caller guarantees `index < len`.
    #[inline]
    fn node_at(&self, index: usize) -> NodeId {
        debug_assert!(index < self.len);
        let mut id = self.head;
        for _ in 0..index {
            id = self.pool.get(id).next;
        }
        id
    }

    #[inline]
    fn alloc(&mut self, value: u32, next: NodeId) -> Result<NodeId, AllocError> {
        let id = self.pool.get_node(self.len)?;
        *self.pool.get_mut(id) = Node { value, next };
        Ok(id)
    }

    #[inline]
    fn linked(&mut self) {
        self.len += 1;
        self.generation += 1;
    }

    #[inline]
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub(crate) fn next_of(&self, id: NodeId) -> NodeId {
        self.pool.get(id).next
    }

    #[inline]
    pub(crate) fn value_at(&self, id: NodeId) -> u32 {
        self.pool.get(id).value
    }
}

impl<B: Backend> std::fmt::Debug for List<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a, B: Backend> IntoIterator for &'a List<B> {
    type Item = u32;
    type IntoIter = Iter<'a, B>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// =============================================================================
// Iterator
// =============================================================================

/// Iterator over list values, head to tail.
pub struct Iter<'a, B: Backend = System> {
    pool: &'a Pool<B>,
    next: NodeId,
    remaining: usize,
}

impl<B: Backend> Iterator for Iter<'_, B> {
    type Item = u32;

    #[inline]
    fn next(&mut self) -> Option<u32> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.pool.get(self.next);
        self.next = node.next;
        self.remaining -= 1;
        Some(node.value)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<B: Backend> ExactSizeIterator for Iter<'_, B> {}

impl<B: Backend> FusedIterator for Iter<'_, B> {}

#[cfg(test)]
mod tests {
    use super::*;
    use chain_pool::{Counting, Growth, PoolBuilder};

    fn collect<B: Backend>(list: &List<B>) -> Vec<u32> {
        list.iter().collect()
    }

    fn list_of(values: &[u32]) -> List {
        let mut list = List::new();
        for &v in values {
            list.push_back(v).unwrap();
        }
        list
    }

    fn small_list(baseline: u32) -> List<Counting> {
        let pool = PoolBuilder::default()
            .baseline(baseline)
            .backend(Counting::default())
            .build()
            .unwrap();
        List::with_pool(pool)
    }

    #[test]
    fn new_list_is_empty() {
        let list = List::new();
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
        assert_eq!(list.front(), None);
        assert_eq!(list.back(), None);
        assert_eq!(list.pool().block_count(), 0);
    }

    #[test]
    fn with_capacity_preallocates() {
        let list = List::with_capacity(100).unwrap();
        assert!(list.is_empty());
        assert!(list.pool().free_len() >= 100);
    }

    #[test]
    fn with_capacity_beyond_one_block_fails() {
        assert!(List::with_capacity(usize::MAX).is_err());
    }

    #[test]
    fn push_back_single() {
        let mut list = List::new();
        list.push_back(1).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.front(), Some(1));
        assert_eq!(list.back(), Some(1));
        assert_eq!(list.head, list.tail);
    }

    #[test]
    fn push_front_multiple() {
        let mut list = List::new();
        list.push_front(1).unwrap();
        list.push_front(2).unwrap();
        list.push_front(3).unwrap();
        assert_eq!(collect(&list), vec![3, 2, 1]);
        assert_eq!(list.back(), Some(1));
    }

    #[test]
    fn mixed_push_scenario() {
        let mut list = List::new();
        list.push_back(5).unwrap();
        list.push_back(7).unwrap();
        list.push_front(3).unwrap();
        assert_eq!(collect(&list), vec![3, 5, 7]);
        assert_eq!(list.len(), 3);

        assert_eq!(list.remove(1), Ok(5));
        assert_eq!(collect(&list), vec![3, 7]);
        assert_eq!(list.len(), 2);
        assert_eq!(list.find(7), Some(1));
    }

    #[test]
    fn insert_middle() {
        let mut list = list_of(&[1, 2, 4]);
        list.insert(2, 3).unwrap();
        assert_eq!(collect(&list), vec![1, 2, 3, 4]);
        assert_eq!(list.back(), Some(4));
    }

    #[test]
    fn insert_at_len_appends() {
        let mut list = list_of(&[1, 2]);
        list.insert(2, 3).unwrap();
        assert_eq!(collect(&list), vec![1, 2, 3]);
        assert_eq!(list.back(), Some(3));
    }

    #[test]
    fn insert_at_zero_prepends() {
        let mut list = list_of(&[2]);
        list.insert(0, 1).unwrap();
        assert_eq!(collect(&list), vec![1, 2]);
    }

    #[test]
    fn insert_into_empty() {
        let mut list = List::new();
        list.insert(0, 9).unwrap();
        assert_eq!(list.front(), Some(9));
        assert_eq!(list.back(), Some(9));
    }

    #[test]
    fn insert_past_len_fails_unchanged() {
        let mut list = list_of(&[1, 2]);
        let generation = list.generation();
        assert_eq!(
            list.insert(3, 9),
            Err(ListError::OutOfBounds { index: 3, len: 2 })
        );
        assert_eq!(collect(&list), vec![1, 2]);
        assert_eq!(list.generation(), generation);
    }

    #[test]
    fn remove_at_len_fails() {
        let mut list = list_of(&[1, 2]);
        assert_eq!(
            list.remove(2),
            Err(ListError::OutOfBounds { index: 2, len: 2 })
        );
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn remove_from_empty_fails() {
        let mut list = List::new();
        assert!(list.remove(0).is_err());
    }

    #[test]
    fn remove_head_keeps_tail() {
        let mut list = list_of(&[1, 2, 3, 4]);
        assert_eq!(list.remove(0), Ok(1));
        assert_eq!(list.back(), Some(4));
        list.push_back(5).unwrap();
        assert_eq!(collect(&list), vec![2, 3, 4, 5]);
    }

    #[test]
    fn remove_head_down_to_one() {
        let mut list = list_of(&[1, 2]);
        assert_eq!(list.remove(0), Ok(1));
        assert_eq!(list.head, list.tail);
        assert_eq!(list.back(), Some(2));
        assert_eq!(list.remove(0), Ok(2));
        assert!(list.head.is_none());
        assert!(list.tail.is_none());
    }

    #[test]
    fn remove_last_moves_tail() {
        let mut list = list_of(&[1, 2, 3]);
        assert_eq!(list.remove(2), Ok(3));
        assert_eq!(list.back(), Some(2));
        list.push_back(4).unwrap();
        assert_eq!(collect(&list), vec![1, 2, 4]);
    }

    #[test]
    fn removed_node_is_reused_first() {
        let mut list = list_of(&[1, 2, 3]);
        let removed = list.node_at(1);
        list.remove(1).unwrap();
        list.push_back(4).unwrap();
        assert_eq!(list.tail, removed);
    }

    #[test]
    fn find_first_match() {
        let list = list_of(&[4, 5, 4]);
        assert_eq!(list.find(4), Some(0));
        assert_eq!(list.find(5), Some(1));
        assert_eq!(list.find(6), None);
    }

    #[test]
    fn get_by_index() {
        let list = list_of(&[10, 20, 30]);
        assert_eq!(list.get(0), Some(10));
        assert_eq!(list.get(2), Some(30));
        assert_eq!(list.get(3), None);
    }

    #[test]
    fn iter_is_exact_size() {
        let list = list_of(&[1, 2, 3]);
        let mut iter = list.iter();
        assert_eq!(iter.len(), 3);
        iter.next();
        assert_eq!(iter.len(), 2);
        assert_eq!((&list).into_iter().sum::<u32>(), 6);
    }

    #[test]
    fn generation_bumps_on_mutation() {
        let mut list = List::new();
        let g0 = list.generation();
        list.push_back(1).unwrap();
        let g1 = list.generation();
        assert!(g1 > g0);
        let _ = list.find(1);
        let _ = list.get(0);
        assert_eq!(list.generation(), g1);
        list.remove(0).unwrap();
        assert!(list.generation() > g1);
    }

    #[test]
    fn remove_all_resets_and_releases() {
        let mut list = small_list(4);
        let stats = list.pool().backend().stats();
        for i in 0..10 {
            list.push_back(i).unwrap();
        }
        let allocated = stats.allocations();
        assert!(allocated >= 2);

        list.remove_all();
        assert!(list.is_empty());
        assert_eq!(list.front(), None);
        assert_eq!(list.pool().block_count(), 0);
        assert_eq!(stats.releases(), allocated);

        list.push_back(42).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.head, list.tail);
        assert_eq!(list.front(), Some(42));
    }

    #[test]
    fn remove_all_on_empty_list() {
        let mut list = small_list(4);
        list.remove_all();
        list.remove_all();
        assert!(list.is_empty());
        assert_eq!(list.pool().backend().stats().releases(), 0);
    }

    #[test]
    fn remove_all_after_interleaved_removes() {
        let mut list = small_list(2);
        let stats = list.pool().backend().stats();
        for i in 0..8 {
            list.push_back(i).unwrap();
        }
        list.remove(3).unwrap();
        list.remove(0).unwrap();
        list.remove(5).unwrap();
        list.remove_all();
        assert_eq!(stats.outstanding(), 0);
    }

    #[test]
    fn drop_releases_every_block() {
        let stats = {
            let mut list = small_list(2);
            for i in 0..9 {
                list.push_front(i).unwrap();
            }
            list.remove(4).unwrap();
            list.pool().backend().stats()
        };
        assert_eq!(stats.releases(), stats.allocations());
    }

    #[test]
    fn fixed_growth_blocks() {
        let pool = PoolBuilder::default()
            .baseline(3)
            .growth(Growth::Fixed)
            .build()
            .unwrap();
        let mut list = List::with_pool(pool);
        for i in 0..10 {
            list.push_back(i).unwrap();
        }
        assert_eq!(list.pool().block_count(), 4);
        assert_eq!(list.pool().capacity(), 12);
    }

    #[test]
    #[should_panic(expected = "no live nodes")]
    fn with_pool_rejects_live_nodes() {
        let mut pool = chain_pool::Pool::new();
        pool.get_node(0).unwrap();
        let _ = List::with_pool(pool);
    }

    #[test]
    fn debug_formats_values() {
        let list = list_of(&[1, 2, 3]);
        assert_eq!(format!("{list:?}"), "[1, 2, 3]");
    }
}
