use std::ptr::NonNull;

use crate::block::{BlockInfo, FOOTER_SIZE, HEADER_SIZE, Header, Status};

/// Offset-addressed view over the managed region. Every raw pointer the
/// allocator touches is derived here from `base` plus an offset below `end`.
///
/// ```text
///   base                                                          end
///    ▼                                                             ▼
///    ┌──────────┬─────────────┬──────────┬──────────────┬──────────┐
///    │ prologue │ block       │ block    │ block        │ block    │
///    └──────────┴─────────────┴──────────┴──────────────┴──────────┘
///    0          HEADER_SIZE
/// ```
///
/// The epilogue is virtual: `tail_free` plays the role of the `prev_free`
/// flag a header placed at `end` would have.
pub(crate) struct Arena {
  base: NonNull<u8>,
  end: usize,
  tail_free: bool,
}

impl Arena {
  pub fn new(base: NonNull<u8>) -> Self {
    Self {
      base,
      end: 0,
      tail_free: false,
    }
  }

  /// Size of the managed region in bytes.
  pub fn end(&self) -> usize {
    self.end
  }

  pub fn tail_free(&self) -> bool {
    self.tail_free
  }

  pub fn extend(
    &mut self,
    increment: usize,
  ) {
    self.end += increment;
  }

  /// Address one past the current end, where the next growth must land.
  pub fn end_address(&self) -> usize {
    self.base.as_ptr() as usize + self.end
  }

  /// # Safety
  ///
  /// `offset` must be the start of a header inside the region.
  #[inline]
  pub unsafe fn header(
    &self,
    offset: usize,
  ) -> *mut Header {
    unsafe { self.base.as_ptr().add(offset).cast::<Header>() }
  }

  #[inline]
  pub unsafe fn size(
    &self,
    offset: usize,
  ) -> usize {
    unsafe { (*self.header(offset)).size }
  }

  #[inline]
  pub unsafe fn is_free(
    &self,
    offset: usize,
  ) -> bool {
    unsafe { (*self.header(offset)).is_free() }
  }

  /// Writes a fresh header over uninitialised or subsumed memory. The block
  /// starts out allocated; [`Self::set_block`] gives it its final status.
  pub unsafe fn format(
    &mut self,
    offset: usize,
    size: usize,
    prev_free: bool,
  ) {
    unsafe {
      self
        .header(offset)
        .write(Header::new(size, Status::Allocated, prev_free));
    }
  }

  /// Sets size and status of the block at `offset`, keeps its footer in sync
  /// and tells the physically next block (or the epilogue) about the status.
  pub unsafe fn set_block(
    &mut self,
    offset: usize,
    size: usize,
    status: Status,
  ) {
    unsafe {
      let header = self.header(offset);
      (*header).size = size;
      (*header).status = status;

      let free = status == Status::Free;
      if free {
        self.footer(offset, size).write(size);
      }

      match self.next_block(offset) {
        Some(next) => (*self.header(next)).prev_free = free,
        None => self.tail_free = free,
      }
    }
  }

  #[inline]
  pub unsafe fn footer(
    &self,
    offset: usize,
    size: usize,
  ) -> *mut usize {
    unsafe {
      self
        .base
        .as_ptr()
        .add(offset + size - FOOTER_SIZE)
        .cast::<usize>()
    }
  }

  /// Physically following block, `None` for the last one.
  pub unsafe fn next_block(
    &self,
    offset: usize,
  ) -> Option<usize> {
    let next = offset + unsafe { self.size(offset) };
    (next < self.end).then_some(next)
  }

  /// Physically preceding block, only if it is free. Found through the
  /// footer of that block, so no walk is needed.
  pub unsafe fn prev_free_block(
    &self,
    offset: usize,
  ) -> Option<usize> {
    unsafe {
      if !(*self.header(offset)).prev_free {
        return None;
      }

      let size = self.base.as_ptr().add(offset - FOOTER_SIZE).cast::<usize>().read();
      Some(offset - size)
    }
  }

  /// Last block of the heap, only if it is free.
  pub unsafe fn last_free_block(&self) -> Option<usize> {
    if !self.tail_free {
      return None;
    }

    unsafe {
      let size = self.base.as_ptr().add(self.end - FOOTER_SIZE).cast::<usize>().read();
      Some(self.end - size)
    }
  }

  /// Address handed to callers for the block at `offset`.
  pub fn payload(
    &self,
    offset: usize,
  ) -> NonNull<u8> {
    unsafe { self.base.add(offset + HEADER_SIZE) }
  }

  /// Inverse of [`Self::payload`].
  pub fn offset_of(
    &self,
    payload: NonNull<u8>,
  ) -> usize {
    payload.as_ptr() as usize - self.base.as_ptr() as usize - HEADER_SIZE
  }

  pub fn contains(
    &self,
    address: usize,
  ) -> bool {
    let low = self.base.as_ptr() as usize;
    address >= low && address < low + self.end
  }

  /// Physical walk over every block after the prologue.
  pub fn blocks(&self) -> Blocks<'_> {
    Blocks {
      arena: self,
      offset: HEADER_SIZE,
    }
  }
}

pub(crate) struct Blocks<'a> {
  arena: &'a Arena,
  offset: usize,
}

impl Iterator for Blocks<'_> {
  type Item = BlockInfo;

  fn next(&mut self) -> Option<BlockInfo> {
    let end = self.arena.end;
    if self.offset >= end {
      return None;
    }

    let header = unsafe { &*self.arena.header(self.offset) };

    // A damaged size would send the walk out of the region.
    if header.size < HEADER_SIZE || header.size > end - self.offset {
      self.offset = end;
      return None;
    }

    let info = BlockInfo {
      offset: self.offset,
      size: header.size,
      status: header.status,
    };
    self.offset += header.size;

    Some(info)
  }
}
