use log::trace;

use crate::{
  arena::Arena,
  block::{HEADER_SIZE, Header, Status},
};

/// Offset of the sentinel that anchors the free list. It is marked free so
/// the list is never empty, but it is never handed out nor coalesced.
pub(crate) const PROLOGUE: usize = 0;

impl Arena {
  /// Writes the prologue at the start of the region, linked to itself.
  pub unsafe fn init_prologue(&mut self) {
    let mut prologue = Header::new(HEADER_SIZE, Status::Free, false);
    prologue.next = PROLOGUE;
    prologue.prev = PROLOGUE;

    unsafe { self.header(PROLOGUE).write(prologue) }
  }

  /// Most recently freed block, or the prologue if there are none.
  pub fn head(&self) -> usize {
    unsafe { (*self.header(PROLOGUE)).next }
  }

  /// Inserts the block right after the prologue.
  ///
  /// ```text
  ///   before:  prologue <-> head <-> ... <-> tail <-> (prologue)
  ///   after:   prologue <-> block <-> head <-> ... <-> tail <-> (prologue)
  /// ```
  pub unsafe fn push_front(
    &mut self,
    offset: usize,
  ) {
    unsafe {
      let head = self.head();

      let block = self.header(offset);
      (*block).next = head;
      (*block).prev = PROLOGUE;

      (*self.header(head)).prev = offset;
      (*self.header(PROLOGUE)).next = offset;
    }
  }

  pub unsafe fn unlink(
    &mut self,
    offset: usize,
  ) {
    unsafe {
      let block = self.header(offset);
      let (next, prev) = ((*block).next, (*block).prev);

      (*self.header(prev)).next = next;
      (*self.header(next)).prev = prev;
    }
  }

  /// First-fit: the first free block, in list order, whose size is at least
  /// `asize`. Visits each member once and stops back at the prologue.
  pub unsafe fn find_fit(
    &self,
    asize: usize,
  ) -> Option<usize> {
    let fit = self
      .free_blocks()
      .find(|&offset| unsafe { self.size(offset) >= asize });

    trace!("find_fit({asize}) -> {fit:?}");

    fit
  }

  pub fn free_blocks(&self) -> FreeBlocks<'_> {
    FreeBlocks {
      arena: self,
      current: PROLOGUE,
    }
  }
}

/// Walks `next` links from the prologue until it comes back around.
pub(crate) struct FreeBlocks<'a> {
  arena: &'a Arena,
  current: usize,
}

impl Iterator for FreeBlocks<'_> {
  type Item = usize;

  fn next(&mut self) -> Option<usize> {
    let next = unsafe { (*self.arena.header(self.current)).next };

    if next == PROLOGUE {
      return None;
    }

    self.current = next;

    Some(next)
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::heap::{ArenaHeap, Heap};

  /// Lays out a prologue followed by allocated blocks of the given sizes.
  pub(crate) fn arena(
    heap: &mut ArenaHeap,
    sizes: &[usize],
  ) -> (Arena, Vec<usize>) {
    let total = HEADER_SIZE + sizes.iter().sum::<usize>();
    let base = heap.grow(total).unwrap();

    let mut arena = Arena::new(base);
    arena.extend(total);

    let mut offsets = Vec::new();
    let mut offset = HEADER_SIZE;

    unsafe {
      arena.init_prologue();
      for &size in sizes {
        arena.format(offset, size, false);
        arena.set_block(offset, size, Status::Allocated);
        offsets.push(offset);
        offset += size;
      }
    }

    (arena, offsets)
  }

  fn listed(arena: &Arena) -> Vec<usize> {
    arena.free_blocks().collect()
  }

  fn release(
    arena: &mut Arena,
    offset: usize,
  ) {
    unsafe {
      let size = arena.size(offset);
      arena.set_block(offset, size, Status::Free);
      arena.push_front(offset);
    }
  }

  #[test]
  fn test_empty_list_is_self_linked() {
    let mut heap = ArenaHeap::with_capacity(256);
    let (arena, _) = arena(&mut heap, &[]);

    assert_eq!(arena.head(), PROLOGUE);
    assert!(listed(&arena).is_empty());
    // The prologue is big enough but is never a fit.
    assert_eq!(unsafe { arena.find_fit(16) }, None);
  }

  #[test]
  fn test_push_front_is_lifo() {
    let mut heap = ArenaHeap::with_capacity(1024);
    let (mut arena, offsets) = arena(&mut heap, &[48, 64, 96, 48]);

    release(&mut arena, offsets[0]);
    release(&mut arena, offsets[2]);
    release(&mut arena, offsets[1]);

    assert_eq!(listed(&arena), vec![offsets[1], offsets[2], offsets[0]]);
    assert_eq!(arena.head(), offsets[1]);

    unsafe {
      assert_eq!((*arena.header(PROLOGUE)).prev, offsets[0]);
      assert_eq!((*arena.header(offsets[0])).next, PROLOGUE);
      assert_eq!((*arena.header(offsets[1])).prev, PROLOGUE);
    }
  }

  #[test]
  fn test_unlink_keeps_ring_closed() {
    let mut heap = ArenaHeap::with_capacity(1024);
    let (mut arena, offsets) = arena(&mut heap, &[48, 64, 96, 48]);

    for &offset in &offsets[..3] {
      release(&mut arena, offset);
    }

    unsafe {
      arena.unlink(offsets[1]);
      assert_eq!(listed(&arena), vec![offsets[2], offsets[0]]);

      arena.unlink(offsets[2]);
      assert_eq!(listed(&arena), vec![offsets[0]]);

      arena.unlink(offsets[0]);
      assert!(listed(&arena).is_empty());
      assert_eq!((*arena.header(PROLOGUE)).next, PROLOGUE);
      assert_eq!((*arena.header(PROLOGUE)).prev, PROLOGUE);
    }
  }

  #[test]
  fn test_find_fit_takes_first_large_enough() {
    let mut heap = ArenaHeap::with_capacity(1024);
    let (mut arena, offsets) = arena(&mut heap, &[48, 64, 96, 48]);

    release(&mut arena, offsets[0]);
    release(&mut arena, offsets[1]);
    release(&mut arena, offsets[2]);

    unsafe {
      // 96 comes first in list order even though 64 fits tighter.
      assert_eq!(arena.find_fit(64), Some(offsets[2]));
      assert_eq!(arena.find_fit(96), Some(offsets[2]));
      assert_eq!(arena.find_fit(112), None);

      arena.unlink(offsets[2]);
      assert_eq!(arena.find_fit(64), Some(offsets[1]));
      assert_eq!(arena.find_fit(48), Some(offsets[1]));
    }
  }
}
