//! # flalloc - An Explicit Free-List Allocator
//!
//! This crate provides a **first-fit, explicit free-list allocator** over a
//! single contiguous region that only ever grows. The region comes from a
//! [`Heap`]: either the program break (`sbrk`) or a fixed-capacity arena.
//!
//! ## Overview
//!
//! Every block, free or allocated, starts with a header. Headers are laid
//! out back to back, so the heap can be walked from the prologue to the end.
//! Free blocks are additionally threaded into a circular, doubly linked list
//! anchored at the prologue:
//!
//! ```text
//!   Heap Layout:
//!
//!   ┌──────────┬──────────┬───────────────┬──────────┬─────────────────┐
//!   │ Prologue │  Alloc   │     Free      │  Alloc   │      Free       │
//!   └────┬─────┴──────────┴───────▲───────┴──────────┴────────▲────────┘
//!        │                        │                           │
//!        └────── next ────────────┘                           │
//!                                 └──────── next ─────────────┘
//!                  (the last free block links back to the prologue)
//! ```
//!
//! - **Allocation** walks the free list from the head and takes the first
//!   block that is big enough. If the leftover can hold a block of its own
//!   the block is split. Without a fit, the heap grows.
//! - **Release** merges the block with free physical neighbours, so no two
//!   free blocks are ever adjacent, and pushes the result to the front of
//!   the free list.
//! - **Resize** works in place whenever it can and moves otherwise.
//!
//! ## Crate Structure
//!
//! ```text
//!   flalloc
//!   ├── align      - ALIGNMENT and the align! macro
//!   ├── allocator  - FreeListAllocator: allocate, release, resize
//!   ├── arena      - offset-addressed access to headers (internal)
//!   ├── block      - block header layout
//!   ├── check      - heap checker and statistics
//!   ├── config     - allocator tunables
//!   ├── error      - AllocError
//!   ├── freelist   - free list maintenance and fit search (internal)
//!   ├── heap       - Heap trait and ArenaHeap
//!   └── sbrk       - SbrkHeap
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use flalloc::{ArenaHeap, FreeListAllocator};
//!
//! let mut allocator = FreeListAllocator::new(ArenaHeap::with_capacity(1 << 16)).unwrap();
//!
//! let address = allocator.allocate(100).unwrap().unwrap();
//! unsafe { address.as_ptr().write_bytes(0xAB, 100) };
//!
//! let address = unsafe { allocator.resize(Some(address), 200) }.unwrap();
//! unsafe { allocator.release(address) };
//!
//! assert!(allocator.is_consistent());
//! ```
//!
//! ## Limitations
//!
//! - **Single-threaded only**: no synchronization primitives
//! - **Grow-only**: memory is never handed back to the backing store
//! - **No misuse detection**: releasing foreign or already released
//!   pointers is undefined behaviour; the heap checker may catch the damage

pub mod align;
mod allocator;
mod arena;
mod block;
mod check;
mod config;
mod error;
mod freelist;
mod heap;
mod sbrk;

use std::ptr::NonNull;

/// Nullable payload pointer. `None` is what a zero-sized request gets and
/// what [`FreeListAllocator::release`] accepts as a no-op.
pub type Pointer<T> = Option<NonNull<T>>;

/// Return type of every operation that may hand out memory.
pub type AllocResult = Result<Pointer<u8>, AllocError>;

pub use allocator::FreeListAllocator;
pub use block::{BlockInfo, HEADER_SIZE, MIN_BLOCK_SIZE, Status};
pub use check::HeapStats;
pub use config::Config;
pub use error::{AllocError, Corruption};
pub use heap::{ArenaHeap, Heap};
pub use sbrk::SbrkHeap;
