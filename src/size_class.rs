//! Payload sizes to power-of-two size classes and back.

use crate::error::AllocError;
use crate::header::HEADER_SIZE;

/// Largest size-class exponent the registry tracks.
pub const MAX_CLASS: u32 = 30;

/// Number of registry entries, one per class in `0..=MAX_CLASS`.
pub const CLASS_COUNT: usize = MAX_CLASS as usize + 1;

/// Largest block, header included: `2^MAX_CLASS` bytes.
pub const MAX_BLOCK_SIZE: usize = 1 << MAX_CLASS;

/// Largest payload a single `allocate` call can serve.
pub const MAX_PAYLOAD: usize = MAX_BLOCK_SIZE - HEADER_SIZE;

const _: () = assert!(MAX_BLOCK_SIZE.is_power_of_two());
const _: () = assert!(HEADER_SIZE < MAX_BLOCK_SIZE);
const _: () = assert!(MAX_PAYLOAD + HEADER_SIZE == MAX_BLOCK_SIZE);
const _: () = assert!(CLASS_COUNT == MAX_CLASS as usize + 1);

/// Smallest class whose block covers a header plus `payload` bytes.
///
/// Exact fits stay exact: a total that is already a power of two maps to
/// its own exponent. Anything past [`MAX_PAYLOAD`] is rejected here,
/// before any allocator state is touched.
#[inline]
pub fn size_class_for(payload: usize) -> Result<u32, AllocError> {
  let total = payload
    .checked_add(HEADER_SIZE)
    .filter(|&total| total <= MAX_BLOCK_SIZE)
    .ok_or(AllocError::OversizedRequest { requested: payload })?;
  Ok(total.next_power_of_two().trailing_zeros())
}

/// Bytes spanned by a block of `class`, header included.
#[inline(always)]
pub const fn block_size(class: u32) -> usize {
  1 << class
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rounds_up_to_the_smallest_covering_class() {
    assert_eq!(size_class_for(10), Ok(5)); // 26 -> 32
    assert_eq!(size_class_for(100), Ok(7)); // 116 -> 128
    assert_eq!(size_class_for(8192), Ok(14)); // 8208 -> 16384
  }

  #[test]
  fn exact_powers_do_not_over_round() {
    assert_eq!(size_class_for(48), Ok(6)); // 64 on the nose
    assert_eq!(size_class_for(112), Ok(7)); // 128 on the nose
    assert_eq!(size_class_for((1 << 20) - HEADER_SIZE), Ok(20));
  }

  #[test]
  fn zero_payload_is_a_header_only_block() {
    assert_eq!(size_class_for(0), Ok(4));
    assert_eq!(block_size(4), HEADER_SIZE);
  }

  #[test]
  fn classes_never_shrink_as_payloads_grow() {
    let mut last = 0;
    for payload in 0..4096 {
      let class = size_class_for(payload).unwrap();
      assert!(class >= last);
      assert!(block_size(class) >= payload + HEADER_SIZE);
      last = class;
    }
  }

  #[test]
  fn max_payload_is_the_boundary() {
    assert_eq!(size_class_for(MAX_PAYLOAD), Ok(MAX_CLASS));
    assert_eq!(
      size_class_for(MAX_PAYLOAD + 1),
      Err(AllocError::OversizedRequest {
        requested: MAX_PAYLOAD + 1
      })
    );
    // A payload of exactly 2^30 would need a class past the registry.
    assert!(size_class_for(MAX_BLOCK_SIZE).is_err());
    // And the size math itself must not wrap.
    assert!(size_class_for(usize::MAX).is_err());
  }
}
