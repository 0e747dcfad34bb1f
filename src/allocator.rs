use std::ptr::{self, NonNull};

use log::{debug, error, trace, warn};

use crate::{
  AllocResult, Pointer, align,
  arena::Arena,
  block::{self, HEADER_SIZE, Status},
  config::Config,
  error::AllocError,
  heap::Heap,
};

/// Explicit free-list allocator over a single growable region.
///
/// Blocks are found first-fit along a circular free list anchored at the
/// prologue, split when the leftover is worth keeping, and merged with free
/// physical neighbours as soon as they are released, so no two free blocks
/// are ever adjacent. Freed blocks go to the front of the list.
pub struct FreeListAllocator<H: Heap> {
  heap: H,
  pub(crate) arena: Arena,
  config: Config,
}

impl<H: Heap> FreeListAllocator<H> {
  pub fn new(heap: H) -> Result<Self, AllocError> {
    Self::with_config(heap, Config::default())
  }

  /// Writes the prologue at the start of `heap`. Fails only if the heap
  /// cannot provide the prologue or provides it unaligned.
  pub fn with_config(
    mut heap: H,
    config: Config,
  ) -> Result<Self, AllocError> {
    let config = config.split_threshold(config.split_threshold);

    let base = heap
      .grow(HEADER_SIZE)
      .ok_or(AllocError::OutOfMemory { requested: HEADER_SIZE })?;

    let address = base.as_ptr() as usize;
    if !align::is_aligned(address) {
      return Err(AllocError::Misaligned { address });
    }

    let mut arena = Arena::new(base);
    arena.extend(HEADER_SIZE);
    unsafe { arena.init_prologue() };

    debug!("heap initialised at {base:?} with {config:?}");

    Ok(Self { heap, arena, config })
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn heap(&self) -> &H {
    &self.heap
  }

  pub fn heap_bounds(&self) -> (*const u8, *const u8) {
    self.heap.bounds()
  }

  /// Whether `address` lies inside the managed region and is aligned like
  /// every payload this allocator hands out.
  pub fn owns(
    &self,
    address: NonNull<u8>,
  ) -> bool {
    let address = address.as_ptr() as usize;
    self.arena.contains(address) && align::is_aligned(address)
  }

  /// Returns a pointer to at least `size` bytes, or `None` for `size == 0`.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> AllocResult {
    if size == 0 {
      return Ok(None);
    }

    let asize = block::block_size_for(size).ok_or(AllocError::OutOfMemory { requested: size })?;

    let offset = unsafe {
      match self.arena.find_fit(asize) {
        Some(offset) => {
          self.arena.unlink(offset);
          self.place(offset, asize);
          offset
        }
        None => self.extend(asize)?,
      }
    };

    self.verify();

    Ok(Some(self.arena.payload(offset)))
  }

  /// Like [`Self::allocate`] for `count * size` bytes, all zero.
  pub fn allocate_zeroed(
    &mut self,
    count: usize,
    size: usize,
  ) -> AllocResult {
    let total = count
      .checked_mul(size)
      .ok_or(AllocError::Overflow { count, size })?;

    let address = self.allocate(total)?;

    if let Some(address) = address {
      unsafe { ptr::write_bytes(address.as_ptr(), 0, total) };
    }

    Ok(address)
  }

  /// Makes the block behind `address` reusable. `None` is a no-op.
  ///
  /// # Safety
  ///
  /// `address` must have been returned by this allocator and not released
  /// since.
  pub unsafe fn release(
    &mut self,
    address: Pointer<u8>,
  ) {
    let Some(address) = address else {
      return;
    };

    let offset = self.arena.offset_of(address);
    unsafe { self.free_block(offset) };

    self.verify();
  }

  /// Resizes the allocation behind `address` to `size` bytes, keeping the
  /// first `min(old, size)` bytes. Works in place when the block, its free
  /// successor or the end of the heap allows it, otherwise moves. On error
  /// the original allocation is left untouched.
  ///
  /// # Safety
  ///
  /// Same as [`Self::release`].
  pub unsafe fn resize(
    &mut self,
    address: Pointer<u8>,
    size: usize,
  ) -> AllocResult {
    let Some(address) = address else {
      return self.allocate(size);
    };

    if size == 0 {
      unsafe { self.release(Some(address)) };
      return Ok(None);
    }

    let asize = block::block_size_for(size).ok_or(AllocError::OutOfMemory { requested: size })?;
    let offset = self.arena.offset_of(address);

    unsafe {
      if self.resize_in_place(offset, asize) {
        self.verify();
        return Ok(Some(address));
      }

      let old_size = self.arena.size(offset) - HEADER_SIZE;
      let new_address = self.allocate(size)?;

      if let Some(new_address) = new_address {
        ptr::copy_nonoverlapping(address.as_ptr(), new_address.as_ptr(), old_size.min(size));
        self.release(Some(address));
      }

      Ok(new_address)
    }
  }

  /// Bytes usable behind `address`, which may exceed what was requested.
  ///
  /// # Safety
  ///
  /// Same as [`Self::release`].
  pub unsafe fn usable_size(
    &self,
    address: NonNull<u8>,
  ) -> usize {
    unsafe { self.arena.size(self.arena.offset_of(address)) - HEADER_SIZE }
  }

  unsafe fn resize_in_place(
    &mut self,
    offset: usize,
    asize: usize,
  ) -> bool {
    unsafe {
      let size = self.arena.size(offset);

      if size >= asize {
        self.place(offset, asize);
        return true;
      }

      let Some(next) = self.arena.next_block(offset) else {
        // Last block, so the heap can grow right behind it.
        if self.grow(asize - size).is_err() {
          return false;
        }
        self.arena.set_block(offset, asize, Status::Allocated);
        return true;
      };

      let next_size = self.arena.size(next);
      if !self.arena.is_free(next) || size + next_size < asize {
        return false;
      }

      trace!("resize {offset:#x} absorbs free successor {next:#x}");

      self.arena.unlink(next);
      self.arena.set_block(offset, size + next_size, Status::Allocated);
      self.place(offset, asize);

      true
    }
  }

  /// Marks the block at `offset` allocated with `asize` bytes and hands the
  /// rest back to the free list when it is at least the split threshold.
  unsafe fn place(
    &mut self,
    offset: usize,
    asize: usize,
  ) {
    unsafe {
      let size = self.arena.size(offset);

      if size - asize < self.config.split_threshold {
        self.arena.set_block(offset, size, Status::Allocated);
        return;
      }

      trace!("split {offset:#x}: {asize} + {}", size - asize);

      let rest = offset + asize;
      self.arena.format(rest, size - asize, false);
      self.arena.set_block(offset, asize, Status::Allocated);
      self.free_block(rest);
    }
  }

  unsafe fn free_block(
    &mut self,
    offset: usize,
  ) {
    unsafe {
      let size = self.arena.size(offset);
      self.arena.set_block(offset, size, Status::Free);

      let merged = self.coalesce(offset);
      self.arena.push_front(merged);
    }
  }

  /// Merges the free block at `offset` with free physical neighbours and
  /// returns the offset of the result. Neighbours leave the free list; the
  /// result is not in it.
  unsafe fn coalesce(
    &mut self,
    offset: usize,
  ) -> usize {
    unsafe {
      let mut offset = offset;

      if let Some(next) = self.arena.next_block(offset) {
        if self.arena.is_free(next) {
          trace!("coalesce {offset:#x} with next {next:#x}");

          self.arena.unlink(next);
          let size = self.arena.size(offset) + self.arena.size(next);
          self.arena.set_block(offset, size, Status::Free);
        }
      }

      if let Some(prev) = self.arena.prev_free_block(offset) {
        trace!("coalesce {offset:#x} with prev {prev:#x}");

        self.arena.unlink(prev);
        let size = self.arena.size(prev) + self.arena.size(offset);
        self.arena.set_block(prev, size, Status::Free);
        offset = prev;
      }

      offset
    }
  }

  /// Grows the heap to serve a block of `asize` bytes. A free block at the
  /// end of the heap is extended instead of leaving it behind.
  unsafe fn extend(
    &mut self,
    asize: usize,
  ) -> Result<usize, AllocError> {
    unsafe {
      if let Some(last) = self.arena.last_free_block() {
        let size = self.arena.size(last);
        self.grow(asize - size)?;

        self.arena.unlink(last);
        self.arena.set_block(last, asize, Status::Allocated);

        return Ok(last);
      }

      let offset = self.arena.end();
      self.grow(asize)?;

      self.arena.format(offset, asize, false);
      self.arena.set_block(offset, asize, Status::Allocated);

      Ok(offset)
    }
  }

  fn grow(
    &mut self,
    increment: usize,
  ) -> Result<(), AllocError> {
    let expected = self.arena.end_address();

    let Some(region) = self.heap.grow(increment) else {
      warn!("backing store refused {increment} more bytes");
      return Err(AllocError::OutOfMemory { requested: increment });
    };

    let actual = region.as_ptr() as usize;
    if actual != expected {
      warn!("backing store returned {actual:#x}, heap ends at {expected:#x}");
      return Err(AllocError::NonContiguous { expected, actual });
    }

    self.arena.extend(increment);
    debug!("heap grew by {increment} bytes to {} bytes", self.arena.end());

    Ok(())
  }

  fn verify(&self) {
    if !self.config.verify {
      return;
    }

    if let Err(err) = self.check_heap() {
      error!("{err}");
      panic!("{err}");
    }
  }
}
