//! Heap sources and the serialized growth path.

use core::ptr::NonNull;
use core::sync::atomic::{AtomicU64, Ordering};

use log::{debug, trace, warn};
use parking_lot::Mutex;

use crate::error::AllocError;
use crate::header::{BLOCK_ALIGN, BlockHeader};
use crate::size_class::block_size;

// =============================================================================
// Sources
// =============================================================================

/// A growable region of address space that blocks are carved from.
///
/// # Safety
///
/// Implementors must guarantee, for every `Some(start)` returned:
///
/// - `[start, start + bytes)` is valid for reads and writes and stays so
///   for the life of the source (memory is never handed back);
/// - the region is exclusively the caller's (no two calls overlap);
/// - the region begins where the previous successful `extend` ended, so
///   the source grows one contiguous span; `extend(0)` therefore reads the
///   current end without growing.
///
/// `None` means the source cannot grow, now or ever.
pub unsafe trait HeapSource {
  /// Extends the region by exactly `bytes` and returns the previous end.
  fn extend(&mut self, bytes: usize) -> Option<NonNull<u8>>;
}

/// The production source: the process data segment, grown with `sbrk`.
///
/// The program break is per process, so other break users (a second
/// instance of this allocator, or a libc that still grows its heap with
/// `brk`) interleave with this one. Each grown block stays sound, since
/// starts are re-aligned per growth, but interleaving fragments the
/// segment and carries the usual hazards of mixing `sbrk` callers.
pub struct Sbrk;

unsafe impl HeapSource for Sbrk {
  fn extend(&mut self, bytes: usize) -> Option<NonNull<u8>> {
    let old_break = unsafe { libc::sbrk(bytes as libc::intptr_t) };
    if old_break == usize::MAX as *mut libc::c_void {
      return None; // (void*)-1: the kernel refused
    }
    NonNull::new(old_break.cast::<u8>())
  }
}

/// A fixed-capacity source over one owned buffer.
///
/// Gives tests a heap they fully control (deterministic exhaustion, any
/// number of independent allocators per process) and embedders a way to
/// run the allocator over a pre-reserved region. The first block starts
/// aligned regardless of where the buffer lands.
pub struct ArenaSource {
  raw: *mut u8,
  raw_len: usize,
  capacity: usize,
  used: usize,
}

// Sole owner of the buffer; `Drop` reconstitutes the box it was made from.
unsafe impl Send for ArenaSource {}

impl ArenaSource {
  /// A source able to hand out `capacity` bytes in total.
  pub fn with_capacity(capacity: usize) -> Self {
    // Slack so the base can be block-aligned wherever the buffer lands.
    let raw_len = capacity + BLOCK_ALIGN;
    let raw = Box::into_raw(vec![0u8; raw_len].into_boxed_slice());
    Self {
      raw: raw.cast::<u8>(),
      raw_len,
      capacity,
      used: 0,
    }
  }

  /// Bytes handed out so far.
  pub fn used(&self) -> usize {
    self.used
  }

  /// Bytes still available.
  pub fn remaining(&self) -> usize {
    self.capacity - self.used
  }

  fn base_offset(&self) -> usize {
    align_up(self.raw as usize, BLOCK_ALIGN) - self.raw as usize
  }
}

unsafe impl HeapSource for ArenaSource {
  fn extend(&mut self, bytes: usize) -> Option<NonNull<u8>> {
    if bytes > self.remaining() {
      return None;
    }
    let end = unsafe { self.raw.add(self.base_offset() + self.used) };
    self.used += bytes;
    NonNull::new(end)
  }
}

impl Drop for ArenaSource {
  fn drop(&mut self) {
    unsafe {
      drop(Box::from_raw(core::ptr::slice_from_raw_parts_mut(
        self.raw,
        self.raw_len,
      )));
    }
  }
}

// =============================================================================
// Growth manager
// =============================================================================

/// Serializes heap extension and stamps fresh blocks.
///
/// One global lock: no matter the class, only one thread grows the heap at
/// a time. Free-list traffic never takes this lock.
pub(crate) struct GrowthManager<S> {
  source: Mutex<S>,
  grow_calls: AtomicU64,
  grown_bytes: AtomicU64,
}

impl<S: HeapSource> GrowthManager<S> {
  pub const fn new(source: S) -> Self {
    Self {
      source: Mutex::new(source),
      grow_calls: AtomicU64::new(0),
      grown_bytes: AtomicU64::new(0),
    }
  }

  /// Carves one fresh block of `class` out of the source.
  pub fn grow(&self, class: u32) -> Result<NonNull<BlockHeader>, AllocError> {
    let size = block_size(class);

    let grown = {
      let mut source = self.source.lock();
      Self::extend_aligned(&mut *source, size)
    };
    let Some((start, consumed)) = grown else {
      warn!("heap exhausted growing a {size} byte block for class {class}");
      return Err(AllocError::HeapExhausted { requested: size });
    };

    self.grow_calls.fetch_add(1, Ordering::Relaxed);
    self.grown_bytes.fetch_add(consumed as u64, Ordering::Relaxed);
    trace!("grew the heap by {consumed} bytes for a class {class} block at {start:p}");

    // The span is exclusively ours once extended; stamping needs no lock.
    Ok(unsafe { BlockHeader::stamp(start, class) })
  }

  /// Extends by `size`, first padding the source when its end has drifted
  /// off block alignment (a foreign break user can do that to `sbrk`).
  /// Returns the aligned block start and the bytes consumed. Block sizes
  /// are multiples of `BLOCK_ALIGN`, so one pad re-aligns the source until
  /// the next drift.
  fn extend_aligned(source: &mut S, size: usize) -> Option<(NonNull<u8>, usize)> {
    let end = source.extend(0)?;
    let misalign = end.as_ptr() as usize & (BLOCK_ALIGN - 1);
    let pad = if misalign == 0 {
      0
    } else {
      let pad = BLOCK_ALIGN - misalign;
      source.extend(pad)?;
      debug!("padded the heap by {pad} bytes to realign the next block start");
      pad
    };
    let start = source.extend(size)?;
    Some((start, size + pad))
  }

  pub fn grow_calls(&self) -> u64 {
    self.grow_calls.load(Ordering::Relaxed)
  }

  pub fn grown_bytes(&self) -> u64 {
    self.grown_bytes.load(Ordering::Relaxed)
  }
}

/// Rounds `x` up to the next multiple of alignment `align`, a power of 2.
#[inline(always)]
const fn align_up(x: usize, align: usize) -> usize {
  let mask = align - 1;
  (x + mask) & !mask
}
