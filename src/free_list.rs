//! Per-class intrusive stacks of released blocks.

use core::ptr::{NonNull, null_mut};

use parking_lot::Mutex;

use crate::header::BlockHeader;
use crate::size_class::CLASS_COUNT;

/// Intrusive LIFO stack threaded through [`BlockHeader::next_free`].
struct FreeList {
  head: *mut BlockHeader,
  len: usize,
}

// The links are raw pointers into heap memory that lives for the whole
// process; they are only dereferenced by whoever holds the owning mutex.
unsafe impl Send for FreeList {}

impl FreeList {
  const fn new() -> Self {
    Self {
      head: null_mut(),
      len: 0,
    }
  }
}

/// One mutex-guarded free list per size class.
///
/// A block's class never changes after it is stamped, so a block can only
/// ever appear on the list matching its own class, and the lists never
/// coordinate with each other. Critical sections are link manipulation
/// only.
pub(crate) struct FreeListRegistry {
  classes: [Mutex<FreeList>; CLASS_COUNT],
}

impl FreeListRegistry {
  pub const fn new() -> Self {
    Self {
      classes: [const { Mutex::new(FreeList::new()) }; CLASS_COUNT],
    }
  }

  /// Detaches the most recently pushed block of `class`, clearing its link
  /// before it leaves the list.
  #[inline]
  pub fn try_pop(&self, class: u32) -> Option<NonNull<BlockHeader>> {
    let mut list = self.classes[class as usize].lock();
    let head = NonNull::new(list.head)?;
    unsafe {
      list.head = (*head.as_ptr()).next_free;
      (*head.as_ptr()).next_free = null_mut();
    }
    list.len -= 1;
    Some(head)
  }

  /// Parks a released block on the list of its own class.
  ///
  /// # Safety
  ///
  /// `block` must point at a stamped header that is not currently live and
  /// not already on any list.
  #[inline]
  pub unsafe fn push(&self, block: NonNull<BlockHeader>) {
    // size_class is write-once, so reading it outside the lock is sound.
    let class = unsafe { (*block.as_ptr()).size_class };
    let mut list = self.classes[class as usize].lock();
    unsafe { (*block.as_ptr()).next_free = list.head };
    list.head = block.as_ptr();
    list.len += 1;
  }

  /// Blocks currently parked, summed across all classes.
  pub fn free_blocks(&self) -> usize {
    self.classes.iter().map(|list| list.lock().len).sum()
  }

  #[cfg(test)]
  fn len_of(&self, class: u32) -> usize {
    self.classes[class as usize].lock().len
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  // A 16-aligned chunk big enough to stamp a class-6 header into.
  #[repr(align(16))]
  struct Slot([u8; 64]);

  impl Slot {
    fn new() -> Self {
      Slot([0; 64])
    }

    fn stamp(&mut self, class: u32) -> NonNull<BlockHeader> {
      let start = NonNull::new(self.0.as_mut_ptr()).unwrap();
      unsafe { BlockHeader::stamp(start, class) }
    }
  }

  #[test]
  fn pop_on_an_empty_class_is_none() {
    let registry = FreeListRegistry::new();
    for class in 0..CLASS_COUNT as u32 {
      assert_eq!(registry.try_pop(class), None);
    }
  }

  #[test]
  fn pops_in_lifo_order() {
    let registry = FreeListRegistry::new();
    let (mut a, mut b, mut c) = (Slot::new(), Slot::new(), Slot::new());
    let (a, b, c) = (a.stamp(6), b.stamp(6), c.stamp(6));

    unsafe {
      registry.push(a);
      registry.push(b);
      registry.push(c);
    }
    assert_eq!(registry.len_of(6), 3);

    assert_eq!(registry.try_pop(6), Some(c));
    assert_eq!(registry.try_pop(6), Some(b));
    assert_eq!(registry.try_pop(6), Some(a));
    assert_eq!(registry.try_pop(6), None);
    assert_eq!(registry.len_of(6), 0);
  }

  #[test]
  fn detaching_clears_the_link() {
    let registry = FreeListRegistry::new();
    let (mut a, mut b) = (Slot::new(), Slot::new());
    let (a, b) = (a.stamp(5), b.stamp(5));

    unsafe {
      registry.push(a);
      registry.push(b); // b now links to a
    }
    let popped = registry.try_pop(5).unwrap();
    assert_eq!(popped, b);
    unsafe { assert!((*popped.as_ptr()).next_free.is_null()) };
  }

  #[test]
  fn classes_are_isolated() {
    let registry = FreeListRegistry::new();
    let mut slot = Slot::new();
    let block = slot.stamp(6);

    unsafe { registry.push(block) };
    assert_eq!(registry.try_pop(5), None);
    assert_eq!(registry.try_pop(7), None);
    assert_eq!(registry.try_pop(6), Some(block));
  }
}
