use std::mem;

use crate::{align, align::ALIGNMENT};

/// Whether a block is threaded into the free list or handed out to a caller.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
  Free,
  Allocated,
}

/// Metadata that prefixes every block in the heap, the prologue included.
///
/// ```text
///   ┌──────────────────────┬───────────────────────────────┬────────┐
///   │ Header               │ Payload                       │ Footer │
///   │  size                │                               │ (free  │
///   │  next / prev  ───────┼─> offsets of free-list peers  │  only) │
///   │  status              │                               │  size  │
///   │  prev_free           │                               │        │
///   └──────────────────────┴───────────────────────────────┴────────┘
///   ◄─────────────────────────────── size ──────────────────────────►
/// ```
///
/// `next` and `prev` are offsets from the start of the heap and only mean
/// something while the block is free. `prev_free` mirrors the status of the
/// physically preceding block so that coalescing never has to walk the heap.
#[repr(C)]
pub(crate) struct Header {
  pub size: usize,
  pub next: usize,
  pub prev: usize,
  pub status: Status,
  pub prev_free: bool,
}

impl Header {
  pub fn new(
    size: usize,
    status: Status,
    prev_free: bool,
  ) -> Self {
    Self {
      size,
      next: 0,
      prev: 0,
      status,
      prev_free,
    }
  }

  pub fn is_free(&self) -> bool {
    self.status == Status::Free
  }
}

/// Header size rounded up so that payloads stay aligned.
pub const HEADER_SIZE: usize = align!(mem::size_of::<Header>());

/// Free blocks repeat their size in their last word.
pub const FOOTER_SIZE: usize = mem::size_of::<usize>();

/// Smallest block the allocator ever creates: a header plus one alignment
/// unit of payload, which is also enough room for a footer.
pub const MIN_BLOCK_SIZE: usize = HEADER_SIZE + ALIGNMENT;

/// Total block size needed to serve `payload` bytes, or `None` if the
/// computation overflows.
pub fn block_size_for(payload: usize) -> Option<usize> {
  HEADER_SIZE.checked_add(payload).and_then(align::checked_align)
}

/// A block as seen by a physical heap walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
  /// Offset of the header from the start of the heap.
  pub offset: usize,
  /// Total size including the header.
  pub size: usize,
  pub status: Status,
}

impl BlockInfo {
  /// Bytes usable by a caller.
  pub fn payload_size(&self) -> usize {
    self.size - HEADER_SIZE
  }
}
