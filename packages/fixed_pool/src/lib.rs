#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A fixed-capacity block pool that subdivides a caller-provided byte buffer
//! into equal-size slots with deterministic allocation latency.
//!
//! This crate provides [`FixedPool`], which plans its entire layout once at
//! construction and never allocates afterwards: a packed free-list bitmap and
//! the slot array both live inside the arena you hand it. Every operation
//! completes synchronously in bounded time, making the pool suitable for
//! latency-sensitive code that cannot tolerate a general-purpose allocator.
//!
//! # Key Features
//!
//! - **Caller-owned storage**: The pool borrows a `&mut [u8]` arena; no heap use
//! - **Maximal capacity**: Layout planning fits as many slots as the arena can hold
//! - **Bounded latency**: Worst case is one word-at-a-time pass over the bitmap
//! - **Prediction hint**: Alternating and sequential alloc/free patterns are O(1)
//! - **Lowest-index preference**: Scans always pick the lowest free slot
//! - **Alignment control**: Per-slot alignment up to [`MAX_ALIGNMENT`], slot size
//!   rounded up to match
//! - **Thread mobility**: The pool can move between threads but is not `Sync`
//!
//! # Example
//!
//! ```rust
//! use fixed_pool::FixedPool;
//! use new_zealand::nz;
//!
//! let mut arena = [0_u8; 512];
//!
//! let mut pool = FixedPool::builder()
//!     .step(nz!(32))
//!     .build(&mut arena)
//!     .expect("arena is large enough for at least one 32-byte slot");
//!
//! let slot = pool.alloc().expect("freshly built pool has free slots");
//!
//! // SAFETY: The slot is an exclusive 32-byte region, aligned for u64.
//! unsafe { slot.cast::<u64>().write(0x5EED) };
//!
//! pool.free(slot).expect("slot came from this pool");
//!
//! // Consuming the pool zeroes and returns the arena.
//! let recovered = pool.into_arena();
//! assert!(recovered.iter().all(|&byte| byte == 0));
//! ```
//!
//! Debug builds additionally expose allocation counters through
//! [`FixedPool::diagnostics()`]; release builds compile the counters out.
//!
//! More details in the [package documentation](https://docs.rs/fixed_pool/).
//!
//! This is part of the [Folo project](https://github.com/folo-rs/folo) that
//! provides mechanisms for high-performance hardware-aware programming in Rust.

mod bitmap;
mod builder;
#[cfg(debug_assertions)]
mod diagnostics;
mod error;
mod layout;
mod pool;

pub(crate) use bitmap::*;
pub use builder::*;
#[cfg(debug_assertions)]
pub use diagnostics::*;
pub use error::*;
pub use layout::MAX_ALIGNMENT;
pub(crate) use layout::{PoolLayout, WORD_BITS};
pub use pool::FixedPool;
