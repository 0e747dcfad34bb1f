use std::collections::BTreeSet;

use log::error;

use crate::{
  allocator::FreeListAllocator,
  align,
  block::{BlockInfo, HEADER_SIZE, MIN_BLOCK_SIZE, Status},
  error::{AllocError, Corruption},
  freelist::PROLOGUE,
  heap::Heap,
};

/// Totals gathered by a physical walk of the heap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeapStats {
  /// Bytes handed out by the backing store, prologue included.
  pub heap_size: usize,
  pub free_blocks: usize,
  pub free_bytes: usize,
  pub allocated_blocks: usize,
  pub allocated_bytes: usize,
  pub largest_free: usize,
}

fn corrupted(
  offset: usize,
  corruption: Corruption,
) -> AllocError {
  AllocError::Corrupted { offset, corruption }
}

impl<H: Heap> FreeListAllocator<H> {
  /// Every block after the prologue, in address order.
  pub fn blocks(&self) -> impl Iterator<Item = BlockInfo> + '_ {
    self.arena.blocks()
  }

  /// Free blocks in list order, most recently freed first.
  pub fn free_blocks(&self) -> impl Iterator<Item = BlockInfo> + '_ {
    self.arena.free_blocks().map(|offset| BlockInfo {
      offset,
      size: unsafe { self.arena.size(offset) },
      status: Status::Free,
    })
  }

  pub fn stats(&self) -> HeapStats {
    let mut stats = HeapStats {
      heap_size: self.arena.end(),
      ..HeapStats::default()
    };

    for block in self.blocks() {
      match block.status {
        Status::Free => {
          stats.free_blocks += 1;
          stats.free_bytes += block.size;
          stats.largest_free = stats.largest_free.max(block.size);
        }
        Status::Allocated => {
          stats.allocated_blocks += 1;
          stats.allocated_bytes += block.size;
        }
      }
    }

    stats
  }

  /// Walks the heap end to end and then the free list, returning the first
  /// violated invariant found.
  pub fn check_heap(&self) -> Result<(), AllocError> {
    let arena = &self.arena;
    let end = arena.end();

    unsafe {
      let prologue = &*arena.header(PROLOGUE);
      if prologue.size != HEADER_SIZE || !prologue.is_free() || prologue.prev_free {
        return Err(corrupted(PROLOGUE, Corruption::Prologue));
      }

      let mut free = BTreeSet::new();
      let mut prev_free = false;
      let mut offset = HEADER_SIZE;

      while offset < end {
        let header = &*arena.header(offset);

        if !align::is_aligned(header.size) {
          return Err(corrupted(offset, Corruption::Misaligned));
        }
        if header.size < MIN_BLOCK_SIZE {
          return Err(corrupted(offset, Corruption::Undersized));
        }
        if header.size > end - offset {
          return Err(corrupted(offset, Corruption::Overrun));
        }
        if header.prev_free != prev_free {
          return Err(corrupted(offset, Corruption::NeighbourFlag));
        }

        if header.is_free() {
          if prev_free {
            return Err(corrupted(offset, Corruption::Uncoalesced));
          }
          if arena.footer(offset, header.size).read() != header.size {
            return Err(corrupted(offset, Corruption::Footer));
          }
          free.insert(offset);
        }

        prev_free = header.is_free();
        offset += header.size;
      }

      if arena.tail_free() != prev_free {
        return Err(corrupted(end, Corruption::NeighbourFlag));
      }

      let mut listed = BTreeSet::new();
      let mut current = PROLOGUE;

      loop {
        let next = (*arena.header(current)).next;

        if next != PROLOGUE && !free.contains(&next) {
          return Err(corrupted(next, Corruption::NotFree));
        }
        if (*arena.header(next)).prev != current {
          return Err(corrupted(next, Corruption::BrokenLink));
        }
        if next == PROLOGUE {
          break;
        }
        if !listed.insert(next) {
          return Err(corrupted(next, Corruption::Cycle));
        }

        current = next;
      }

      if let Some(&offset) = free.difference(&listed).next() {
        return Err(corrupted(offset, Corruption::Unlisted));
      }
    }

    Ok(())
  }

  /// [`Self::check_heap`] reduced to pass/fail, logging the failure.
  pub fn is_consistent(&self) -> bool {
    match self.check_heap() {
      Ok(()) => true,
      Err(err) => {
        error!("{err}");
        false
      }
    }
  }
}
