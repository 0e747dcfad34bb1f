use std::{io::Read, process::ExitCode, ptr::NonNull};

use flalloc::{FreeListAllocator, SbrkHeap};

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`, `gdb`,
/// or just visually track how allocations move the program break.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break (sbrk(0)) = {:?}",
    label,
    std::process::id(),
    SbrkHeap::program_break(),
  );
}

fn print_heap(allocator: &FreeListAllocator<SbrkHeap>) {
  for block in allocator.blocks() {
    println!("    {:>6} +{:<6} {:?}", block.offset, block.size, block.status);
  }
  println!("    {:?}", allocator.stats());
}

fn print_alloc(
  label: &str,
  size: usize,
  address: NonNull<u8>,
) {
  println!("\n[{label}] Allocated {size} bytes at {address:?}");
}

fn main() -> ExitCode {
  env_logger::init();

  let Some(heap) = SbrkHeap::new() else {
    eprintln!("cannot read the program break");
    return ExitCode::FAILURE;
  };

  let mut allocator = match FreeListAllocator::new(heap) {
    Ok(allocator) => allocator,
    Err(err) => {
      eprintln!("cannot initialise heap: {err}");
      return ExitCode::FAILURE;
    }
  };

  if let Err(err) = run(&mut allocator) {
    eprintln!("demo failed: {err}");
    return ExitCode::FAILURE;
  }

  println!("\nEnd of example. Process will exit and the OS will reclaim all memory.");
  ExitCode::SUCCESS
}

fn run(allocator: &mut FreeListAllocator<SbrkHeap>) -> Result<(), Box<dyn std::error::Error>> {
  print_program_break("start");
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 1) Three allocations grow the heap one block at a time.
  // --------------------------------------------------------------------
  let first = allocator.allocate(100)?.ok_or("empty allocation")?;
  print_alloc("1", 100, first);
  unsafe { first.as_ptr().write_bytes(0xAB, 100) };

  let second = allocator.allocate(100)?.ok_or("empty allocation")?;
  print_alloc("1", 100, second);

  let third = allocator.allocate(16)?.ok_or("empty allocation")?;
  print_alloc("1", 16, third);

  print_heap(allocator);
  print_program_break("after growth");
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 2) Releasing two neighbours leaves a single free block behind.
  // --------------------------------------------------------------------
  unsafe {
    allocator.release(Some(first));
    allocator.release(Some(second));
  }
  println!("\n[2] Released the first two blocks");
  print_heap(allocator);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 3) A small request reuses the front of the merged block and splits it.
  // --------------------------------------------------------------------
  let reused = allocator.allocate(16)?.ok_or("empty allocation")?;
  print_alloc("3", 16, reused);
  println!(
    "[3] reused == first? {}",
    if reused == first {
      "Yes, it reused the freed block"
    } else {
      "No, it allocated somewhere else"
    }
  );
  print_heap(allocator);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 4) Resizing the last block grows the heap behind it in place.
  // --------------------------------------------------------------------
  let grown = unsafe { allocator.resize(Some(third), 64 * 1024) }?.ok_or("empty allocation")?;
  println!("\n[4] Resized last block to 64 KiB, moved: {}", grown != third);
  print_heap(allocator);
  print_program_break("after resize");
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 5) Zeroed array.
  // --------------------------------------------------------------------
  let zeroed = allocator.allocate_zeroed(32, 8)?.ok_or("empty allocation")?;
  let all_zero = unsafe { std::slice::from_raw_parts(zeroed.as_ptr(), 256) }
    .iter()
    .all(|&byte| byte == 0);
  println!("\n[5] allocate_zeroed(32, 8) at {zeroed:?}, all zero: {all_zero}");

  println!("\n[6] Heap consistent: {}", allocator.is_consistent());

  Ok(())
}
