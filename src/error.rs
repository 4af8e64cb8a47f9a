//! Allocation failure taxonomy.

use thiserror::Error;

use crate::size_class::MAX_PAYLOAD;

/// Failures surfaced by [`Allocator::allocate`](crate::Allocator::allocate).
///
/// Both variants are detected before any allocator state is touched: an
/// `Err` never leaves a free list, a counter, or a half-built block behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
  /// The request, once header overhead is added, rounds past the largest
  /// block the registry tracks.
  #[error("requested {requested} bytes, the largest servable payload is {max} bytes", max = MAX_PAYLOAD)]
  OversizedRequest {
    /// Payload size passed to `allocate`.
    requested: usize,
  },

  /// The heap source refused to extend. There is no retry and no fallback
  /// region; the source is not expected to recover.
  #[error("heap exhausted: the source refused to extend by {requested} bytes")]
  HeapExhausted {
    /// Bytes the growth manager asked the source for.
    requested: usize,
  },
}
