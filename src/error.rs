use std::{error, fmt};

/// Invariant violations reported by the heap checker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Corruption {
  /// The prologue no longer has its initial size or status.
  Prologue,
  /// A block offset or size is not a multiple of the alignment.
  Misaligned,
  /// A block is smaller than the minimum block size.
  Undersized,
  /// A block runs past the end of the heap.
  Overrun,
  /// A free block's footer disagrees with its header.
  Footer,
  /// A header's `prev_free` flag disagrees with its neighbour's status.
  NeighbourFlag,
  /// Two physically adjacent blocks are both free.
  Uncoalesced,
  /// `next.prev` or `prev.next` does not point back at the block.
  BrokenLink,
  /// The free list reaches something that is not a free block.
  NotFree,
  /// A free block is missing from the free list.
  Unlisted,
  /// The free list does not return to the prologue.
  Cycle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AllocError {
  /// The backing store could not provide `requested` more bytes.
  OutOfMemory { requested: usize },
  /// `count * size` does not fit in a `usize`.
  Overflow { count: usize, size: usize },
  /// The backing store returned memory that does not continue the heap.
  NonContiguous { expected: usize, actual: usize },
  /// The backing store returned an unaligned first region.
  Misaligned { address: usize },
  /// The heap checker found a violated invariant at `offset`.
  Corrupted { offset: usize, corruption: Corruption },
}

impl fmt::Display for Corruption {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    let reason = match self {
      Corruption::Prologue => "prologue overwritten",
      Corruption::Misaligned => "block is not aligned",
      Corruption::Undersized => "block smaller than minimum size",
      Corruption::Overrun => "block runs past the heap end",
      Corruption::Footer => "footer does not match header",
      Corruption::NeighbourFlag => "stale prev_free flag",
      Corruption::Uncoalesced => "adjacent free blocks",
      Corruption::BrokenLink => "free list links do not agree",
      Corruption::NotFree => "free list holds a non-free block",
      Corruption::Unlisted => "free block missing from free list",
      Corruption::Cycle => "free list does not return to the prologue",
    };

    f.write_str(reason)
  }
}

impl fmt::Display for AllocError {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      AllocError::OutOfMemory { requested } => {
        write!(f, "out of memory: cannot grow heap by {requested} bytes")
      }
      AllocError::Overflow { count, size } => {
        write!(f, "allocation size overflows: {count} * {size}")
      }
      AllocError::NonContiguous { expected, actual } => write!(
        f,
        "heap growth is not contiguous: expected {expected:#x}, got {actual:#x}"
      ),
      AllocError::Misaligned { address } => {
        write!(f, "backing store returned unaligned address {address:#x}")
      }
      AllocError::Corrupted { offset, corruption } => {
        write!(f, "heap corrupted at offset {offset:#x}: {corruption}")
      }
    }
  }
}

impl error::Error for AllocError {}
