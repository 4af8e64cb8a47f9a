//! Block metadata embedded at the start of every block.

use core::mem::{align_of, size_of};
use core::ptr::{NonNull, null_mut};

/// Bytes of metadata at the start of every block. The payload handed to
/// callers begins immediately after.
pub const HEADER_SIZE: usize = size_of::<BlockHeader>();

/// Alignment of every block start, and therefore of every payload.
///
/// Block sizes are powers of two no smaller than `HEADER_SIZE`, so once a
/// block starts this aligned, the next block start is aligned too.
pub const BLOCK_ALIGN: usize = HEADER_SIZE;

const _: () = assert!(HEADER_SIZE == 16); // u32 class + padding + 8-byte link
const _: () = assert!(BLOCK_ALIGN.is_power_of_two());
const _: () = assert!(align_of::<BlockHeader>() <= BLOCK_ALIGN);

/// Metadata overlaid on the first `HEADER_SIZE` bytes of a block.
#[repr(C)]
pub(crate) struct BlockHeader {
  /// Exponent `k`: the block spans `2^k` bytes, header included. Written
  /// once when the block is stamped and never mutated for the lifetime of
  /// the underlying memory, so it is readable without synchronization.
  pub size_class: u32,
  /// Link used only while the block sits on a free list, owned by that
  /// list's mutex; meaningless while the block is live.
  pub next_free: *mut BlockHeader,
}

impl BlockHeader {
  /// Overlays a header on freshly grown memory.
  ///
  /// One of the two places in the crate that reinterprets raw memory; the
  /// other is [`BlockHeader::from_payload`].
  ///
  /// # Safety
  ///
  /// `start` must be aligned to `BLOCK_ALIGN`, valid for writes of
  /// `2^class` bytes, and exclusively owned by the caller.
  #[inline]
  pub unsafe fn stamp(start: NonNull<u8>, class: u32) -> NonNull<BlockHeader> {
    let header = start.cast::<BlockHeader>();
    unsafe {
      header.as_ptr().write(BlockHeader {
        size_class: class,
        next_free: null_mut(),
      });
    }
    header
  }

  /// Recovers the header sitting `HEADER_SIZE` bytes before a payload.
  ///
  /// The other memory-reinterpretation point.
  ///
  /// # Safety
  ///
  /// `payload` must have been produced by [`BlockHeader::payload`] on a
  /// stamped block whose memory is still owned by the same allocator.
  #[inline]
  pub unsafe fn from_payload(payload: NonNull<u8>) -> NonNull<BlockHeader> {
    unsafe { NonNull::new_unchecked(payload.as_ptr().sub(HEADER_SIZE)).cast() }
  }

  /// The address handed to callers: the first byte past the header.
  ///
  /// # Safety
  ///
  /// `header` must point at a stamped block header.
  #[inline]
  pub unsafe fn payload(header: NonNull<BlockHeader>) -> NonNull<u8> {
    unsafe { NonNull::new_unchecked(header.as_ptr().cast::<u8>().add(HEADER_SIZE)) }
  }
}
