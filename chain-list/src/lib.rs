//! Pooled singly-linked list and FIFO queue of `u32`.
//!
//! Built for pointer-chasing workloads (graph traversal frontiers, work
//! lists) where per-node allocation is the dominant cost. Every list owns a
//! [`chain_pool::Pool`]: nodes come from large blocks, removed nodes are
//! recycled through a LIFO free-stack, and blocks go back to the backend
//! only on [`List::remove_all`] or drop.
//!
//! # Quick Start
//!
//! ```
//! use chain_list::{List, Queue};
//!
//! let mut list = List::new();
//! list.push_back(5).unwrap();
//! list.insert(0, 3).unwrap();
//! assert_eq!(list.find(5), Some(1));
//!
//! let mut frontier = Queue::new();
//! frontier.push(0).unwrap();
//! while let Some(vertex) = frontier.pop() {
//!     if vertex < 3 {
//!         frontier.push(vertex + 1).unwrap();
//!     }
//! }
//! ```
//!
//! # Custom pools
//!
//! Backend, baseline block size and growth policy are chosen per list:
//!
//! ```
//! use chain_list::{Counting, Growth, List, PoolBuilder};
//!
//! let backend = Counting::default();
//! let stats = backend.stats();
//!
//! let pool = PoolBuilder::default()
//!     .baseline(1024)
//!     .growth(Growth::Fixed)
//!     .backend(backend)
//!     .build()
//!     .unwrap();
//! let mut list = List::with_pool(pool);
//!
//! for i in 0..2048 {
//!     list.push_back(i).unwrap();
//! }
//! assert_eq!(stats.allocations(), 2);
//! ```
//!
//! # Cursors
//!
//! [`Cursor`] is a detached position. It does not borrow the list, and any
//! mutation of the list makes it stale:
//!
//! ```
//! use chain_list::{List, StaleCursor};
//!
//! let mut list = List::new();
//! list.push_back(1).unwrap();
//! list.push_back(2).unwrap();
//!
//! let mut cursor = list.cursor(0).unwrap();
//! list.remove(1).unwrap();
//! assert_eq!(cursor.advance(&list), Err(StaleCursor));
//! ```

mod cursor;
mod error;
mod list;
mod queue;

pub use cursor::Cursor;
pub use error::{ListError, StaleCursor};
pub use list::{Iter, List};
pub use queue::Queue;

pub use chain_pool::{AllocError, AllocStats, Backend, Counting, Growth, Pool, PoolBuilder, System};
#[cfg(unix)]
pub use chain_pool::Pages;
