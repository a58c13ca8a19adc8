//! Detached forward cursor.
//!
//! A [`Cursor`] does not borrow its list. It records the list's identity
//! and mutation generation at creation and checks both on every
//! [`advance`](Cursor::advance), so any insert or remove in between turns it
//! stale instead of letting it read through a recycled node.

use chain_pool::{Backend, NodeId};

use crate::{List, StaleCursor};

/// Restartable single-direction cursor over a [`List`].
///
/// Created with [`List::cursor`]. Dropping it never touches the list.
///
/// ```
/// use chain_list::List;
///
/// let mut list = List::new();
/// for v in [10, 20, 30] {
///     list.push_back(v).unwrap();
/// }
///
/// let mut cursor = list.cursor(1).unwrap();
/// assert_eq!(cursor.value(), 20);
/// assert_eq!(cursor.advance(&list), Ok(true));
/// assert_eq!(cursor.value(), 30);
/// assert_eq!(cursor.advance(&list), Ok(false)); // last index
///
/// list.push_back(40).unwrap();
/// assert!(cursor.advance(&list).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct Cursor {
    list: u64,
    generation: u64,
    node: NodeId,
    index: usize,
    value: u32,
}

impl Cursor {
    #[inline]
    pub(crate) fn new(list: u64, generation: u64, node: NodeId, index: usize, value: u32) -> Self {
        Self {
            list,
            generation,
            node,
            index,
            value,
        }
    }

    /// Payload at the current position, cached when the cursor moved there.
    #[inline]
    pub fn value(&self) -> u32 {
        self.value
    }

    /// Current position.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns `true` if `list` is the list this cursor came from and it has
    /// not changed since.
    #[inline]
    pub fn is_valid<B: Backend>(&self, list: &List<B>) -> bool {
        self.list == list.id() && self.generation == list.generation()
    }

    /// Move to the next node.
    ///
    /// Returns `Ok(false)` at the last index and leaves the cursor where it
    /// is.
    ///
    /// # Errors
    ///
    /// Returns `Err(StaleCursor)` if the list mutated since the cursor was
    /// created, or `list` is a different list.
    pub fn advance<B: Backend>(&mut self, list: &List<B>) -> Result<bool, StaleCursor> {
        if !self.is_valid(list) {
            return Err(StaleCursor);
        }
        if self.index + 1 >= list.len() {
            return Ok(false);
        }

        self.node = list.next_of(self.node);
        self.index += 1;
        self.value = list.value_at(self.node);
        Ok(true)
    }
}
