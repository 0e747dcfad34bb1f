use std::ptr::NonNull;

use libc::{c_void, intptr_t, sbrk};
use log::warn;

use crate::{align, heap::Heap};

/// [`Heap`] over the program break. The break is first padded up to the
/// allocator's alignment so that the first block lands on a boundary.
///
/// Anything else in the process that moves the break (the system allocator
/// usually does) breaks contiguity; the allocator notices and refuses to
/// use such regions.
pub struct SbrkHeap {
  start: *mut u8,
  brk: *mut u8,
}

fn failed(address: *mut c_void) -> bool {
  address == usize::MAX as *mut c_void
}

impl SbrkHeap {
  /// Returns `None` if the break cannot be read or padded.
  pub fn new() -> Option<Self> {
    unsafe {
      let current = sbrk(0);
      if failed(current) {
        return None;
      }

      let padding = align!(current as usize) - current as usize;
      if padding > 0 && failed(sbrk(padding as intptr_t)) {
        return None;
      }

      let start = sbrk(0) as *mut u8;

      Some(Self { start, brk: start })
    }
  }

  /// Current program break as reported by `sbrk(0)`.
  pub fn program_break() -> *const u8 {
    unsafe { sbrk(0) as *const u8 }
  }
}

unsafe impl Heap for SbrkHeap {
  fn grow(
    &mut self,
    increment: usize,
  ) -> Option<NonNull<u8>> {
    let increment_signed = intptr_t::try_from(increment).ok()?;

    let address = unsafe { sbrk(increment_signed) };

    if failed(address) {
      warn!("sbrk({increment}) failed");
      return None;
    }

    let address = address as *mut u8;
    self.brk = address.wrapping_add(increment);

    NonNull::new(address)
  }

  fn bounds(&self) -> (*const u8, *const u8) {
    (self.start as *const u8, self.brk as *const u8)
  }
}
