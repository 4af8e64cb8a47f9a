//! An sbrk-backed, power-of-two, free-list memory allocator.
//!
//! Every block is `2^k` bytes, header included, for the smallest covering
//! `k`; released blocks park on one intrusive free list per class and are
//! reused LIFO. The heap only ever grows: blocks are never merged or split,
//! and memory is never returned to the operating system, so a long-lived
//! process settles at the high-water mark of each size class. Growth is
//! serialized behind one global lock; each class's list is locked
//! independently.
//!
//! The backing region is pluggable through [`HeapSource`]: [`Sbrk`] grows
//! the process data segment, [`ArenaSource`] serves a fixed region for
//! tests and embedding.
//!
//! ```
//! use cresco::{Allocator, ArenaSource};
//!
//! let heap = Allocator::with_source(ArenaSource::with_capacity(64 * 1024));
//! let payload = heap.allocate(100)?;
//! unsafe {
//!   payload.as_ptr().write_bytes(0x2a, 100);
//!   heap.release(payload);
//! }
//! # Ok::<(), cresco::AllocError>(())
//! ```
//!
//! Construction is `const`, so a process-wide instance is one `static`
//! away; the [`GlobalAlloc`](core::alloc::GlobalAlloc) impl serves layouts
//! aligned up to [`BLOCK_ALIGN`]:
//!
//! ```
//! static HEAP: cresco::Allocator = cresco::Allocator::new();
//! assert_eq!(HEAP.stats().live_blocks, 0);
//! ```

mod allocator;
mod error;
mod free_list;
mod header;
mod heap;
mod size_class;

pub use allocator::{Allocator, Stats};
pub use error::AllocError;
pub use header::{BLOCK_ALIGN, HEADER_SIZE};
pub use heap::{ArenaSource, HeapSource, Sbrk};
pub use size_class::{
  CLASS_COUNT, MAX_BLOCK_SIZE, MAX_CLASS, MAX_PAYLOAD, block_size, size_class_for,
};
