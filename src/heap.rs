use std::{
  alloc::{self, Layout},
  ptr::NonNull,
};

use crate::align::ALIGNMENT;

/// The backing store the allocator carves blocks out of. It only ever grows.
///
/// # Safety
///
/// Implementors must hand out each byte at most once, return regions that
/// stay valid and writable for the lifetime of the implementor, and return
/// an [`ALIGNMENT`] aligned address from the first call to [`Heap::grow`].
pub unsafe trait Heap {
  /// Extends the managed region by `increment` bytes and returns the start
  /// of the new bytes, or `None` when the backing store is exhausted.
  fn grow(
    &mut self,
    increment: usize,
  ) -> Option<NonNull<u8>>;

  /// Current extent of the managed region as `(low, high)`, `high` exclusive.
  fn bounds(&self) -> (*const u8, *const u8);
}

/// Fixed-capacity backing store. Reserves its whole capacity up front and
/// hands it out front to back, failing once the ceiling is reached.
///
/// ```text
///   start                   brk                        start + capacity
///     ▼                      ▼                                 ▼
///     ┌──────────────────────┬─────────────────────────────────┐
///     │   handed out         │          still available        │
///     └──────────────────────┴─────────────────────────────────┘
/// ```
pub struct ArenaHeap {
  start: NonNull<u8>,
  brk: usize,
  capacity: usize,
}

impl ArenaHeap {
  /// 20 MiB.
  pub const DEFAULT_CAPACITY: usize = 20 * (1 << 20);

  pub fn new() -> Self {
    Self::with_capacity(Self::DEFAULT_CAPACITY)
  }

  pub fn with_capacity(capacity: usize) -> Self {
    let layout = Self::layout(capacity);
    let address = unsafe { alloc::alloc_zeroed(layout) };

    let Some(start) = NonNull::new(address) else {
      alloc::handle_alloc_error(layout);
    };

    Self {
      start,
      brk: 0,
      capacity,
    }
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  /// Bytes handed out so far.
  pub fn used(&self) -> usize {
    self.brk
  }

  fn layout(capacity: usize) -> Layout {
    match Layout::from_size_align(capacity.max(1), ALIGNMENT) {
      Ok(layout) => layout,
      Err(_) => panic!("arena capacity overflow: {capacity} bytes"),
    }
  }
}

impl Default for ArenaHeap {
  fn default() -> Self {
    Self::new()
  }
}

impl Drop for ArenaHeap {
  fn drop(&mut self) {
    unsafe { alloc::dealloc(self.start.as_ptr(), Self::layout(self.capacity)) }
  }
}

unsafe impl Heap for ArenaHeap {
  fn grow(
    &mut self,
    increment: usize,
  ) -> Option<NonNull<u8>> {
    if increment > self.capacity - self.brk {
      return None;
    }

    let address = unsafe { self.start.add(self.brk) };
    self.brk += increment;

    Some(address)
  }

  fn bounds(&self) -> (*const u8, *const u8) {
    let low = self.start.as_ptr() as *const u8;
    (low, low.wrapping_add(self.brk))
  }
}
