//! The allocator context: class lookup, reuse, growth, release.

use core::alloc::{GlobalAlloc, Layout};
use core::ptr::{NonNull, null_mut};
use core::sync::atomic::{AtomicUsize, Ordering};

use crate::error::AllocError;
use crate::free_list::FreeListRegistry;
use crate::header::{BLOCK_ALIGN, BlockHeader};
use crate::heap::{GrowthManager, HeapSource, Sbrk};
use crate::size_class::size_class_for;

/// A self-contained allocator over a heap source `S`.
///
/// Each instance owns its free lists and its growth serialization, so any
/// number of instances coexist in one process (the test suite runs many,
/// each over its own [`ArenaSource`](crate::ArenaSource)). Blocks must be
/// released to the instance that allocated them.
pub struct Allocator<S: HeapSource = Sbrk> {
  registry: FreeListRegistry,
  growth: GrowthManager<S>,
  live_blocks: AtomicUsize,
}

impl Allocator {
  /// An allocator over the process data segment.
  pub const fn new() -> Self {
    Self::with_source(Sbrk)
  }
}

impl Default for Allocator {
  fn default() -> Self {
    Self::new()
  }
}

impl<S: HeapSource> Allocator<S> {
  /// An allocator over any heap source.
  pub const fn with_source(source: S) -> Self {
    Self {
      registry: FreeListRegistry::new(),
      growth: GrowthManager::new(source),
      live_blocks: AtomicUsize::new(0),
    }
  }

  /// Hands out a block able to hold `size` bytes.
  ///
  /// The returned pointer fronts a payload of `2^k - HEADER_SIZE` bytes
  /// (`k` per [`size_class_for`](crate::size_class_for)), aligned to
  /// [`BLOCK_ALIGN`](crate::BLOCK_ALIGN). The most recently released block
  /// of the class is reused when one is parked; the heap grows by exactly
  /// one block otherwise. On `Err` the allocator is untouched: no list
  /// changed, no counter moved, no block came to exist.
  pub fn allocate(&self, size: usize) -> Result<NonNull<u8>, AllocError> {
    let class = size_class_for(size)?;
    let block = match self.registry.try_pop(class) {
      Some(block) => block,
      None => self.growth.grow(class)?,
    };
    self.live_blocks.fetch_add(1, Ordering::Relaxed);
    Ok(unsafe { BlockHeader::payload(block) })
  }

  /// Parks a block for reuse by its own size class.
  ///
  /// Blocks keep their class forever: they are never merged, split, or
  /// returned to the operating system, so a long-lived process settles at
  /// the high-water mark of each class.
  ///
  /// # Safety
  ///
  /// `payload` must come from [`allocate`](Allocator::allocate) on this
  /// same allocator and must not have been released since. Neither
  /// condition is checked; violating either is undefined behavior.
  pub unsafe fn release(&self, payload: NonNull<u8>) {
    let block = unsafe { BlockHeader::from_payload(payload) };
    self.live_blocks.fetch_sub(1, Ordering::Relaxed);
    unsafe { self.registry.push(block) };
  }

  /// A snapshot of the allocator's bookkeeping.
  ///
  /// Counters are relaxed atomics, so a snapshot taken under concurrent
  /// traffic is approximate. At quiescence every block ever grown is
  /// either live or parked: `grow_calls == live_blocks + free_blocks`.
  pub fn stats(&self) -> Stats {
    Stats {
      grow_calls: self.growth.grow_calls(),
      grown_bytes: self.growth.grown_bytes(),
      live_blocks: self.live_blocks.load(Ordering::Relaxed),
      free_blocks: self.registry.free_blocks(),
    }
  }
}

/// Point-in-time counters from [`Allocator::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
  /// Blocks ever carved out of fresh heap (one growth per block).
  pub grow_calls: u64,
  /// Bytes consumed from the heap source, alignment pads included.
  pub grown_bytes: u64,
  /// Blocks handed out and not yet released.
  pub live_blocks: usize,
  /// Blocks parked on free lists.
  pub free_blocks: usize,
}

/// Payloads are naturally aligned to [`BLOCK_ALIGN`] and no stricter, so
/// layouts up to that alignment are served off the class path and anything
/// wider is refused with null. `realloc` keeps its default alloc-copy-free
/// behavior: blocks cannot resize in place.
unsafe impl<S: HeapSource> GlobalAlloc for Allocator<S> {
  unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
    if layout.align() > BLOCK_ALIGN {
      return null_mut();
    }
    match self.allocate(layout.size()) {
      Ok(payload) => payload.as_ptr(),
      Err(_) => null_mut(),
    }
  }

  unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
    if let Some(payload) = NonNull::new(ptr) {
      unsafe { self.release(payload) };
    }
  }
}
