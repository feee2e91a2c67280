use std::cell::Cell;
use std::marker::PhantomData;
use std::num::NonZero;

use crate::{FixedPool, Result};

/// Builder for creating an instance of [`FixedPool`] over a caller-provided
/// arena.
///
/// The slot size is mandatory: set it with either `.step()` or
/// `.layout_of::<T>()`. The slot alignment is optional and defaults to the
/// machine word size.
///
/// # Examples
///
/// Using an explicit slot size:
///
/// ```
/// use fixed_pool::FixedPool;
/// use new_zealand::nz;
///
/// let mut arena = [0_u8; 256];
/// let pool = FixedPool::builder().step(nz!(16)).build(&mut arena).unwrap();
/// ```
///
/// Using a type to derive size and alignment:
///
/// ```
/// use fixed_pool::FixedPool;
///
/// let mut arena = [0_u8; 256];
/// let pool = FixedPool::builder()
///     .layout_of::<[u64; 4]>()
///     .build(&mut arena)
///     .unwrap();
/// ```
///
/// # Thread safety
///
/// The builder is thread-mobile ([`Send`]) and can be safely transferred between threads,
/// allowing pool configuration to happen on different threads than where the pool is used.
/// However, it is not thread-safe ([`Sync`]) as it contains mutable configuration state.
#[derive(Debug)]
#[must_use]
pub struct FixedPoolBuilder {
    step: Option<NonZero<usize>>,
    alignment: Option<NonZero<usize>>,

    // Prevents Sync while allowing Send - builders are thread-mobile but not thread-safe
    _not_sync: PhantomData<Cell<()>>,
}

impl FixedPoolBuilder {
    #[inline]
    pub(crate) fn new() -> Self {
        Self {
            step: None,
            alignment: None,
            _not_sync: PhantomData,
        }
    }

    /// Sets the per-slot size in bytes.
    ///
    /// The value is rounded up to the resolved alignment when the pool is
    /// built, so the effective slot size may be larger than requested; query
    /// it via [`FixedPool::step()`].
    #[inline]
    pub fn step(mut self, step: NonZero<usize>) -> Self {
        self.step = Some(step);
        self
    }

    /// Sets the slot alignment in bytes.
    ///
    /// The value is rounded up to the next power of two and floored at the
    /// machine word size. When not set, the machine word size is used.
    ///
    /// # Examples
    ///
    /// ```
    /// use fixed_pool::FixedPool;
    /// use new_zealand::nz;
    ///
    /// let mut arena = [0_u8; 1024];
    /// let pool = FixedPool::builder()
    ///     .step(nz!(48))
    ///     .alignment(nz!(64))
    ///     .build(&mut arena)
    ///     .unwrap();
    ///
    /// // The step was rounded up to the alignment.
    /// assert_eq!(pool.step(), 64);
    /// assert_eq!(pool.alignment(), 64);
    /// ```
    #[inline]
    pub fn alignment(mut self, alignment: NonZero<usize>) -> Self {
        self.alignment = Some(alignment);
        self
    }

    /// Sets the slot size and alignment from a type.
    ///
    /// This is a convenience method for pools whose slots each hold one `T`.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized.
    ///
    /// # Examples
    ///
    /// ```
    /// use fixed_pool::FixedPool;
    ///
    /// let mut arena = [0_u8; 256];
    /// let pool = FixedPool::builder()
    ///     .layout_of::<u128>()
    ///     .build(&mut arena)
    ///     .unwrap();
    ///
    /// assert!(pool.step() >= size_of::<u128>());
    /// ```
    #[inline]
    pub fn layout_of<T>(mut self) -> Self {
        self.step =
            Some(NonZero::new(size_of::<T>()).expect("FixedPool slots must have non-zero size"));
        self.alignment = Some(
            NonZero::new(align_of::<T>()).expect("alignment of a type is always at least one"),
        );
        self
    }

    /// Builds the pool over the provided arena.
    ///
    /// The arena is borrowed for the lifetime of the pool; the pool never
    /// allocates or frees memory of its own.
    ///
    /// # Errors
    ///
    /// Returns an error if the alignment exceeds
    /// [`MAX_ALIGNMENT`](crate::MAX_ALIGNMENT) or if the arena is too small
    /// to host even a single slot.
    ///
    /// # Panics
    ///
    /// Panics if no slot size has been set using either [`step`](Self::step)
    /// or [`layout_of`](Self::layout_of).
    ///
    /// # Examples
    ///
    /// ```
    /// use fixed_pool::FixedPool;
    /// use new_zealand::nz;
    ///
    /// let mut arena = [0_u8; 64];
    ///
    /// // 16 KiB of slots cannot come out of a 64-byte arena.
    /// let result = FixedPool::builder().step(nz!(16384)).build(&mut arena);
    /// assert!(result.is_err());
    /// ```
    pub fn build(self, arena: &mut [u8]) -> Result<FixedPool<'_>> {
        let step = self
            .step
            .expect("step must be set using .step() or .layout_of::<T>() before calling .build()");

        FixedPool::new_inner(arena, step, self.alignment)
    }
}

#[cfg(test)]
mod tests {
    use std::fmt::Debug;
    use std::thread;

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;

    // Test trait implementations.
    assert_impl_all!(FixedPoolBuilder: Send, Debug);
    assert_not_impl_any!(FixedPoolBuilder: Sync);

    #[test]
    fn builder_new_creates_default_state() {
        let builder = FixedPoolBuilder::new();
        assert!(builder.step.is_none());
        assert!(builder.alignment.is_none());
    }

    #[test]
    fn step_and_alignment_are_recorded() {
        let builder = FixedPoolBuilder::new()
            .step(NonZero::new(24).unwrap())
            .alignment(NonZero::new(16).unwrap());

        assert_eq!(builder.step, NonZero::new(24));
        assert_eq!(builder.alignment, NonZero::new(16));
    }

    #[test]
    fn layout_of_sets_both_fields() {
        let builder = FixedPoolBuilder::new().layout_of::<u64>();

        assert_eq!(builder.step, NonZero::new(size_of::<u64>()));
        assert_eq!(builder.alignment, NonZero::new(align_of::<u64>()));
    }

    #[test]
    fn later_settings_override_earlier_ones() {
        let builder = FixedPoolBuilder::new()
            .step(NonZero::new(8).unwrap())
            .layout_of::<[u8; 40]>();
        assert_eq!(builder.step, NonZero::new(40));

        let builder = FixedPoolBuilder::new()
            .layout_of::<u64>()
            .step(NonZero::new(100).unwrap());
        assert_eq!(builder.step, NonZero::new(100));
    }

    #[test]
    #[should_panic]
    fn layout_of_zero_sized_type_panics() {
        _ = FixedPoolBuilder::new().layout_of::<()>();
    }

    #[test]
    #[should_panic]
    fn build_without_step_panics() {
        let mut arena = [0_u8; 64];
        _ = FixedPoolBuilder::new().build(&mut arena);
    }

    #[test]
    fn build_over_empty_arena_is_an_error() {
        let mut arena = [0_u8; 0];
        let result = FixedPoolBuilder::new()
            .step(NonZero::new(8).unwrap())
            .build(&mut arena);

        assert!(result.is_err());
    }

    #[test]
    fn builder_send_trait() {
        // Verify the builder can be moved between threads; the pool itself
        // cannot follow because it borrows the arena.
        let builder = FixedPoolBuilder::new().layout_of::<u64>();
        let handle = thread::spawn(move || builder.step(NonZero::new(32).unwrap()));
        _ = handle.join().expect("thread completed successfully");
    }
}
