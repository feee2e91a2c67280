//! Example that demonstrates basic `FixedPool` usage over a stack arena.
//!
//! This shows building a pool, allocating slots, and the prediction hint
//! returning a freed slot on the next allocation.

use fixed_pool::FixedPool;
use new_zealand::nz;

fn main() {
    println!("=== Fixed Pool Example ===");

    // The pool borrows its storage; nothing is heap-allocated.
    let mut arena = [0_u8; 1024];

    let mut pool = FixedPool::builder()
        .step(nz!(16))
        .alignment(nz!(8))
        .build(&mut arena)
        .expect("1024 bytes fit many 16-byte slots");

    println!(
        "Pool hosts {} slots of {} bytes each",
        pool.capacity(),
        pool.step()
    );

    let first = pool.alloc().expect("freshly built pool has free slots");
    let second = pool.alloc().expect("pool is not yet full");

    // SAFETY: Each slot is an exclusive 16-byte region until freed.
    unsafe {
        first.cast::<u64>().write(42);
        second.cast::<u64>().write(123);
    }

    // SAFETY: We wrote these values above and have not freed the slots.
    let value1 = unsafe { first.cast::<u64>().read() };
    let value2 = unsafe { second.cast::<u64>().read() };

    println!("First slot holds: {value1}");
    println!("Second slot holds: {value2}");

    // A freed slot is predicted as the next allocation, so the same
    // address comes straight back without a scan.
    pool.free(first).expect("slot came from this pool");
    let reused = pool.alloc().expect("a slot was just freed");
    assert_eq!(reused, first);

    println!("Freed slot was reused at the same address");

    // Consuming the pool zeroes the arena and hands it back.
    let recovered = pool.into_arena();
    assert!(recovered.iter().all(|&byte| byte == 0));

    println!("Example completed successfully!");
}
