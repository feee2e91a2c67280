use std::fmt;
use std::marker::PhantomData;
use std::num::NonZero;
use std::ptr::NonNull;
use std::slice;

#[cfg(debug_assertions)]
use crate::Diagnostics;
use crate::{Bitmap, Error, FixedPoolBuilder, PoolLayout, Result};

/// A fixed-capacity block pool over a caller-provided byte arena.
///
/// The pool carves the arena into a packed free-list bitmap followed by an
/// array of equal-size slots, both regions aligned to the resolved slot
/// alignment. Layout planning happens once at construction; after that every
/// operation completes synchronously in bounded time, with no heap use and no
/// system calls. The worst case for [`alloc()`](Self::alloc) is one pass over
/// the bitmap, one machine word at a time; a single-slot prediction hint makes
/// the common sequential and alternating alloc/free patterns O(1).
///
/// # Out-of-band access
///
/// [`alloc()`](Self::alloc) returns a raw [`NonNull<u8>`] rather than a
/// reference. The pool never creates references to slot memory, so you may
/// read and write the slot through the pointer from unsafe code while the
/// pool is alive, as long as the slot has not been freed, cleared or the pool
/// consumed.
///
/// # Double free
///
/// Freeing a slot that is already free is a caller bug, but it is deliberately
/// resolved as a success that mutates nothing, so one erroneous call cannot
/// corrupt the free-list. Debug builds count such calls in
/// [`diagnostics()`](Self::diagnostics).
///
/// # Thread safety
///
/// The pool is thread-mobile ([`Send`]) but not thread-safe ([`Sync`]);
/// concurrent use requires external synchronization.
///
/// # Example
///
/// ```
/// use fixed_pool::FixedPool;
/// use new_zealand::nz;
///
/// let mut arena = [0_u8; 1024];
/// let mut pool = FixedPool::builder()
///     .step(nz!(16))
///     .alignment(nz!(8))
///     .build(&mut arena)
///     .unwrap();
///
/// let slot = pool.alloc().expect("freshly built pool has free slots");
///
/// // SAFETY: The slot is an exclusive 16-byte region until freed.
/// unsafe { slot.cast::<u64>().write(42) };
///
/// pool.free(slot).expect("slot came from this pool");
/// ```
pub struct FixedPool<'arena> {
    /// The carve-up computed by the layout planner at construction time.
    /// Immutable for the life of the pool.
    plan: PoolLayout,

    /// Number of currently allocated slots. Always equals the number of set
    /// bits in the bitmap and never exceeds `plan.capacity`.
    count: usize,

    /// One bit per slot, within the arena, ahead of the data region.
    bitmap: Bitmap,

    /// First byte of the slot array.
    data: NonNull<u8>,

    /// Prediction hint: a slot believed to be free. Either `None` or a
    /// slot-boundary address inside the data region. It may be stale (the
    /// slot was since allocated) but never out of range; correctness does not
    /// depend on it, only the fast path does.
    hint: Option<NonNull<u8>>,

    /// Start and length of the original arena borrow, kept to give the slice
    /// back from `into_arena()`.
    arena: NonNull<u8>,
    arena_len: usize,

    #[cfg(debug_assertions)]
    diagnostics: Diagnostics,

    _arena: PhantomData<&'arena mut [u8]>,
}

impl<'arena> FixedPool<'arena> {
    /// Creates a builder for configuring and constructing a [`FixedPool`].
    ///
    /// You must specify a slot size using either `.step()` or
    /// `.layout_of::<T>()` before calling `.build()`.
    ///
    /// # Example
    ///
    /// ```
    /// use fixed_pool::FixedPool;
    /// use new_zealand::nz;
    ///
    /// let mut arena = [0_u8; 256];
    /// let pool = FixedPool::builder().step(nz!(32)).build(&mut arena).unwrap();
    ///
    /// assert_eq!(pool.len(), 0);
    /// assert!(pool.capacity() > 0);
    /// ```
    #[inline]
    pub fn builder() -> FixedPoolBuilder {
        FixedPoolBuilder::new()
    }

    /// Creates a new [`FixedPool`] with the specified configuration.
    ///
    /// This method is used internally by the builder to construct the actual pool.
    pub(crate) fn new_inner(
        arena: &'arena mut [u8],
        step: NonZero<usize>,
        alignment: Option<NonZero<usize>>,
    ) -> Result<Self> {
        let arena_len = arena.len();
        let arena_ptr =
            NonNull::new(arena.as_mut_ptr()).expect("slice pointers are never null");

        let plan = PoolLayout::plan(arena_ptr.addr().get(), arena_len, step, alignment)?;

        // SAFETY: The plan guarantees `prefix < arena_len`, so the aligned
        // start stays inside the arena.
        let aligned = unsafe { arena_ptr.add(plan.prefix) };

        // SAFETY: The bitmap words span `bitmap_words * WORD_BYTES` bytes
        // from the aligned start, which the plan keeps short of `data_offset`;
        // the address is word-aligned because the resolved alignment is at
        // least the word size. Nothing else touches this region: the data
        // region starts at `data_offset` and the arena borrow is consumed
        // here.
        let bitmap = unsafe { Bitmap::new(aligned.cast::<usize>(), plan.bitmap_words) };

        // SAFETY: The plan guarantees `data_offset + capacity * step` bytes
        // fit between the aligned start and the end of the arena.
        let data = unsafe { aligned.add(plan.data_offset) };

        let mut pool = Self {
            plan,
            count: 0,
            bitmap,
            data,
            hint: None,
            arena: arena_ptr,
            arena_len,
            #[cfg(debug_assertions)]
            diagnostics: Diagnostics::default(),
            _arena: PhantomData,
        };

        // Zero the regions and arm the hint at the first slot.
        pool.clear();

        Ok(pool)
    }

    /// The number of currently allocated slots.
    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Can be mutated to infinitely growing memory use.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether no slot is currently allocated.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Whether every slot is currently allocated.
    #[must_use]
    #[inline]
    pub fn is_full(&self) -> bool {
        self.count == self.plan.capacity
    }

    /// The total number of slots the arena hosts, fixed at construction.
    #[must_use]
    #[inline]
    pub fn capacity(&self) -> usize {
        self.plan.capacity
    }

    /// The per-slot size in bytes, after rounding up to the alignment.
    #[must_use]
    #[inline]
    pub fn step(&self) -> usize {
        self.plan.step
    }

    /// The resolved slot alignment in bytes.
    #[must_use]
    #[inline]
    pub fn alignment(&self) -> usize {
        self.plan.alignment
    }

    /// Allocates one slot and returns a pointer to its first byte, or `None`
    /// if every slot is taken.
    ///
    /// The slot contents are unspecified; use
    /// [`alloc_zeroed()`](Self::alloc_zeroed) for a zero-filled slot. The
    /// returned pointer is `step` bytes of exclusive storage, aligned to the
    /// pool alignment, valid until it is freed, the pool is cleared, or the
    /// pool is consumed.
    ///
    /// Allocation always prefers the lowest-indexed free slot, except that a
    /// slot predicted by the hint (the most recently freed slot, or the
    /// sequential neighbor of the previous allocation) is taken without a
    /// scan.
    ///
    /// # Example
    ///
    /// ```
    /// use fixed_pool::FixedPool;
    /// use new_zealand::nz;
    ///
    /// let mut arena = [0_u8; 256];
    /// let mut pool = FixedPool::builder().step(nz!(64)).build(&mut arena).unwrap();
    ///
    /// while pool.alloc().is_some() {}
    ///
    /// assert!(pool.is_full());
    /// assert_eq!(pool.alloc(), None);
    /// ```
    #[must_use]
    pub fn alloc(&mut self) -> Option<NonNull<u8>> {
        #[cfg(debug_assertions)]
        {
            self.diagnostics.allocations = self.diagnostics.allocations.saturating_add(1);
        }

        if self.count == self.plan.capacity {
            #[cfg(debug_assertions)]
            {
                self.diagnostics.failed = self.diagnostics.failed.saturating_add(1);
            }

            return None;
        }

        let slot = self.alloc_predicted().or_else(|| self.alloc_scan());

        if slot.is_some() {
            self.count = self
                .count
                .checked_add(1)
                .expect("count is bounded by capacity");

            #[cfg(debug_assertions)]
            {
                self.diagnostics.peak = self.diagnostics.peak.max(self.count);
            }
        } else {
            // The counter says a slot is free but the scan found none; the
            // bitmap and the counter have diverged.
            debug_assert!(false, "free-list scan found no slot in a non-full pool");
        }

        slot
    }

    /// Allocates one slot and zero-fills it.
    ///
    /// Behaves exactly like [`alloc()`](Self::alloc) otherwise.
    #[must_use]
    pub fn alloc_zeroed(&mut self) -> Option<NonNull<u8>> {
        let slot = self.alloc()?;

        // SAFETY: The slot is a `step`-sized region inside the data region,
        // exclusively owned by the caller as of the alloc above.
        unsafe {
            slot.write_bytes(0, self.plan.step);
        }

        Some(slot)
    }

    /// Takes the hinted slot if the hint is armed and still accurate.
    fn alloc_predicted(&mut self) -> Option<NonNull<u8>> {
        let hint = self.hint?;

        let Ok(index) = self.slot_index(hint) else {
            // The hint is maintained to always name a slot boundary inside
            // the data region; anything else means the pool descriptor was
            // corrupted.
            debug_assert!(false, "prediction hint does not name a valid slot");
            self.hint = None;
            return None;
        };

        if self.bitmap.is_set(index) {
            // Stale prediction. Not an error; the scan path takes over.
            return None;
        }

        self.bitmap.set(index);
        self.hint = self.next_free_neighbor(index);

        #[cfg(debug_assertions)]
        {
            self.diagnostics.predicted = self.diagnostics.predicted.saturating_add(1);
        }

        Some(hint)
    }

    /// Scans the bitmap for the lowest free slot.
    fn alloc_scan(&mut self) -> Option<NonNull<u8>> {
        let index = self.bitmap.find_first_zero(self.plan.capacity)?;

        self.bitmap.set(index);

        // Bet on sequential allocation: the neighbor is the best next guess.
        if let Some(next) = self.next_free_neighbor(index) {
            self.hint = Some(next);
        }

        Some(self.slot_ptr(index))
    }

    /// Releases a slot previously returned by [`alloc()`](Self::alloc) or
    /// [`alloc_zeroed()`](Self::alloc_zeroed).
    ///
    /// The slot must not be read or written after this call. The freed slot
    /// becomes the prediction hint, so an immediately following allocation
    /// returns the same address without a scan.
    ///
    /// Freeing a slot that is already free returns `Ok` and changes nothing;
    /// see the [double free](Self#double-free) contract.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PointerOutOfBounds`] or [`Error::PointerMisaligned`]
    /// if the pointer was not produced by this pool; no state changes in
    /// either case.
    ///
    /// # Example
    ///
    /// ```
    /// use fixed_pool::FixedPool;
    /// use new_zealand::nz;
    ///
    /// let mut arena = [0_u8; 256];
    /// let mut pool = FixedPool::builder().step(nz!(16)).build(&mut arena).unwrap();
    ///
    /// let slot = pool.alloc().unwrap();
    /// pool.free(slot).unwrap();
    ///
    /// // The freed slot is predicted as the next allocation.
    /// assert_eq!(pool.alloc(), Some(slot));
    /// ```
    pub fn free(&mut self, slot: NonNull<u8>) -> Result<()> {
        let index = self.slot_index(slot)?;

        if !self.bitmap.is_set(index) {
            // Double free. Resolved as a success that mutates nothing so one
            // erroneous call cannot corrupt the free-list.
            #[cfg(debug_assertions)]
            {
                self.diagnostics.double_frees = self.diagnostics.double_frees.saturating_add(1);
            }

            return Ok(());
        }

        self.bitmap.clear(index);
        self.count = self
            .count
            .checked_sub(1)
            .expect("a set bit implies a non-zero count");

        // A just-freed slot is the best possible guess for the next
        // allocation.
        self.hint = Some(slot);

        Ok(())
    }

    /// Releases every slot and zero-fills the bitmap and data regions.
    ///
    /// Afterwards the pool is observationally indistinguishable from a
    /// freshly built one. Every previously returned slot pointer is invalid
    /// and must not be used.
    pub fn clear(&mut self) {
        self.bitmap.zero();

        // SAFETY: The data region is `capacity * step` writable bytes carved
        // out of the arena borrow at construction.
        unsafe {
            self.data.write_bytes(0, self.data_len());
        }

        self.count = 0;

        // Capacity is at least one, so the first slot always exists.
        self.hint = Some(self.data);

        #[cfg(debug_assertions)]
        {
            self.diagnostics = Diagnostics::default();
        }
    }

    /// Consumes the pool and hands the arena back, zeroed.
    ///
    /// Runs [`clear()`](Self::clear) first, so no allocation survives in the
    /// returned bytes. Further use of the pool (or of any slot pointer it
    /// produced) is rejected at compile time because the handle is gone.
    ///
    /// # Example
    ///
    /// ```
    /// use fixed_pool::FixedPool;
    /// use new_zealand::nz;
    ///
    /// let mut arena = [0_u8; 256];
    ///
    /// let mut pool = FixedPool::builder().step(nz!(16)).build(&mut arena).unwrap();
    /// _ = pool.alloc().unwrap();
    ///
    /// let recovered = pool.into_arena();
    /// assert_eq!(recovered.len(), 256);
    /// ```
    #[must_use]
    pub fn into_arena(mut self) -> &'arena mut [u8] {
        self.clear();

        let Self {
            arena, arena_len, ..
        } = self;

        // SAFETY: This reconstitutes exactly the borrow the pool was built
        // over; the pool and every region view derived from it are gone as of
        // the destructuring above.
        unsafe { slice::from_raw_parts_mut(arena.as_ptr(), arena_len) }
    }

    /// A snapshot of the debug-build allocation counters.
    ///
    /// Only present when `debug_assertions` are enabled; release builds carry
    /// no counters.
    #[cfg(debug_assertions)]
    #[must_use]
    pub fn diagnostics(&self) -> Diagnostics {
        self.diagnostics
    }

    /// Maps a slot pointer back to its index, validating that it names a slot
    /// boundary inside the data region.
    #[allow(
        clippy::arithmetic_side_effects,
        clippy::integer_division,
        reason = "the step is at least the machine word size by construction"
    )]
    fn slot_index(&self, ptr: NonNull<u8>) -> Result<usize> {
        let addr = ptr.addr().get();

        let offset = addr
            .checked_sub(self.data.addr().get())
            .ok_or(Error::PointerOutOfBounds { addr })?;

        if offset >= self.data_len() {
            return Err(Error::PointerOutOfBounds { addr });
        }

        if offset % self.plan.step != 0 {
            return Err(Error::PointerMisaligned { addr });
        }

        Ok(offset / self.plan.step)
    }

    /// Address of slot `index + 1` if that slot exists and is free.
    fn next_free_neighbor(&self, index: usize) -> Option<NonNull<u8>> {
        let next = index.checked_add(1)?;

        (next < self.plan.capacity && !self.bitmap.is_set(next)).then(|| self.slot_ptr(next))
    }

    fn slot_ptr(&self, index: usize) -> NonNull<u8> {
        debug_assert!(index < self.plan.capacity, "slot index out of range");

        let offset = index
            .checked_mul(self.plan.step)
            .expect("slot offsets were validated during layout planning");

        // SAFETY: `index < capacity`, so the offset stays inside the data
        // region the pool carved out of the arena at construction.
        unsafe { self.data.add(offset) }
    }

    fn data_len(&self) -> usize {
        self.plan
            .capacity
            .checked_mul(self.plan.step)
            .expect("validated during layout planning")
    }
}

impl fmt::Debug for FixedPool<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("FixedPool");

        s.field("step", &self.plan.step)
            .field("alignment", &self.plan.alignment)
            .field("capacity", &self.plan.capacity)
            .field("count", &self.count)
            .field(
                "hint",
                &self.hint.and_then(|hint| self.slot_index(hint).ok()),
            )
            .field("bitmap", &self.bitmap);

        #[cfg(debug_assertions)]
        s.field("diagnostics", &self.diagnostics);

        s.finish_non_exhaustive()
    }
}

// SAFETY: The raw pointers all target the arena borrow the pool exclusively
// holds; a `&mut [u8]` is thread-mobile, so the pool is too.
unsafe impl Send for FixedPool<'_> {}

#[cfg(test)]
#[allow(
    clippy::arithmetic_side_effects,
    clippy::indexing_slicing,
    reason = "tests focus on succinct code and do not need to tick all the boxes"
)]
mod tests {
    use std::fmt::Debug;

    use new_zealand::nz;
    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;

    assert_impl_all!(FixedPool<'static>: Send, Debug);
    assert_not_impl_any!(FixedPool<'static>: Sync);

    /// A stack arena whose start address is aligned hard enough that layout
    /// planning consumes no prefix, keeping test arithmetic exact.
    #[repr(align(128))]
    struct Arena<const N: usize>([u8; N]);

    impl<const N: usize> Arena<N> {
        fn new() -> Self {
            Self([0; N])
        }

        fn as_mut_slice(&mut self) -> &mut [u8] {
            &mut self.0
        }
    }

    fn pool_16x8(arena: &mut [u8]) -> FixedPool<'_> {
        FixedPool::builder()
            .step(nz!(16))
            .alignment(nz!(8))
            .build(arena)
            .unwrap()
    }

    #[test]
    fn reference_scenario() {
        let mut arena = Arena::<1024>::new();
        let mut pool = pool_16x8(arena.as_mut_slice());

        // The largest n with ceil(n / 8) + 16 * n <= 1024 is 63.
        assert_eq!(pool.capacity(), 63);
        assert_eq!(pool.step(), 16);

        let slots: Vec<_> = (0..63).map(|_| pool.alloc().unwrap()).collect();
        assert!(pool.is_full());

        // Distinct addresses, exactly one step apart, in slot order.
        for pair in slots.windows(2) {
            assert_eq!(
                pair[1].addr().get() - pair[0].addr().get(),
                16,
                "slots must be 16 bytes apart"
            );
        }

        // Free slot 3, then allocate: the freed address comes right back.
        let third = slots[3];
        pool.free(third).unwrap();
        assert_eq!(pool.len(), 62);

        assert_eq!(pool.alloc(), Some(third));
        assert!(pool.is_full());

        // Every other slot is still allocated: freeing each succeeds and
        // drains the pool completely.
        for slot in slots {
            pool.free(slot).unwrap();
        }
        assert!(pool.is_empty());
    }

    #[test]
    fn exhaustion_returns_none_without_mutation() {
        let mut arena = Arena::<256>::new();
        let mut pool = pool_16x8(arena.as_mut_slice());

        let capacity = pool.capacity();
        for _ in 0..capacity {
            _ = pool.alloc().unwrap();
        }

        assert_eq!(pool.alloc(), None);
        assert_eq!(pool.len(), capacity);

        // Still rejecting, still unchanged.
        assert_eq!(pool.alloc(), None);
        assert_eq!(pool.len(), capacity);
    }

    #[test]
    fn addresses_are_in_range_and_step_spaced() {
        let mut arena = Arena::<512>::new();
        let mut pool = pool_16x8(arena.as_mut_slice());

        let first = pool.alloc().unwrap();
        let base = first.addr().get();

        let mut seen = vec![first];
        while let Some(slot) = pool.alloc() {
            let offset = slot.addr().get() - base;
            assert_eq!(offset % 16, 0);
            assert!(offset < pool.capacity() * 16);
            assert!(!seen.contains(&slot), "addresses must be distinct");
            seen.push(slot);
        }

        assert_eq!(seen.len(), pool.capacity());
    }

    #[test]
    fn alternating_free_alloc_reuses_the_slot() {
        let mut arena = Arena::<1024>::new();
        let mut pool = pool_16x8(arena.as_mut_slice());

        let slots: Vec<_> = (0..8).map(|_| pool.alloc().unwrap()).collect();
        let target = slots[5];

        #[cfg(debug_assertions)]
        let predicted_before = pool.diagnostics().predicted;

        for _ in 0..100 {
            pool.free(target).unwrap();
            assert_eq!(pool.alloc(), Some(target));
        }

        // Every one of those allocations was a prediction hit.
        #[cfg(debug_assertions)]
        assert_eq!(pool.diagnostics().predicted - predicted_before, 100);
    }

    #[test]
    fn sequential_fill_walks_the_hint() {
        let mut arena = Arena::<1024>::new();
        let mut pool = pool_16x8(arena.as_mut_slice());

        let capacity = pool.capacity();
        for _ in 0..capacity {
            _ = pool.alloc().unwrap();
        }

        // The hint starts at slot 0 and is re-armed to the next neighbor on
        // every allocation, so filling an empty pool never scans.
        #[cfg(debug_assertions)]
        assert_eq!(pool.diagnostics().predicted, capacity);
    }

    #[test]
    fn scan_finds_lowest_free_slot_when_hint_is_stale() {
        let mut arena = Arena::<1024>::new();
        let mut pool = pool_16x8(arena.as_mut_slice());

        let slots: Vec<_> = (0..pool.capacity()).map(|_| pool.alloc().unwrap()).collect();

        // Free two distant slots; the hint points at the second one.
        pool.free(slots[40]).unwrap();
        pool.free(slots[2]).unwrap();

        // Hint hit on slot 2, then a scan that must pick slot 40, the lowest
        // free index remaining.
        assert_eq!(pool.alloc(), Some(slots[2]));
        assert_eq!(pool.alloc(), Some(slots[40]));
    }

    #[test]
    fn invalid_frees_fail_without_state_change() {
        let mut arena = Arena::<512>::new();
        let mut pool = pool_16x8(arena.as_mut_slice());

        let slot = pool.alloc().unwrap();
        let len_before = pool.len();

        // Below the data region.
        let before = NonNull::<u8>::dangling();
        assert!(matches!(
            pool.free(before),
            Err(Error::PointerOutOfBounds { .. })
        ));

        // One past the end of the data region.
        // SAFETY: Only the address is used; the pointer is never dereferenced.
        let past_end = unsafe { slot.add(pool.capacity() * pool.step()) };
        assert!(matches!(
            pool.free(past_end),
            Err(Error::PointerOutOfBounds { .. })
        ));

        // Inside the region but not on a slot boundary.
        // SAFETY: Only the address is used; the pointer is never dereferenced.
        let interior = unsafe { slot.add(1) };
        assert!(matches!(
            pool.free(interior),
            Err(Error::PointerMisaligned { .. })
        ));

        assert_eq!(pool.len(), len_before);
        pool.free(slot).unwrap();
        assert!(pool.is_empty());
    }

    #[test]
    fn double_free_is_a_safe_no_op() {
        let mut arena = Arena::<512>::new();
        let mut pool = pool_16x8(arena.as_mut_slice());

        let keep = pool.alloc().unwrap();
        let slot = pool.alloc().unwrap();

        pool.free(slot).unwrap();
        assert_eq!(pool.len(), 1);

        // The second free reports success but changes nothing.
        pool.free(slot).unwrap();
        assert_eq!(pool.len(), 1);

        #[cfg(debug_assertions)]
        assert_eq!(pool.diagnostics().double_frees, 1);

        // The surviving allocation is unaffected.
        pool.free(keep).unwrap();
        assert!(pool.is_empty());
    }

    #[test]
    fn alloc_zeroed_wipes_previous_contents() {
        let mut arena = Arena::<512>::new();
        let mut pool = pool_16x8(arena.as_mut_slice());

        let slot = pool.alloc().unwrap();

        // SAFETY: The slot is an exclusive step-sized region until freed.
        unsafe {
            slot.write_bytes(0xAB, pool.step());
        }

        pool.free(slot).unwrap();

        // The freed slot is predicted, so the same address comes back.
        let reused = pool.alloc_zeroed().unwrap();
        assert_eq!(reused, slot);

        for i in 0..pool.step() {
            // SAFETY: Reading the step-sized region we exclusively own.
            let byte = unsafe { reused.add(i).read() };
            assert_eq!(byte, 0, "byte {i} must be zeroed");
        }
    }

    #[test]
    fn clear_restores_the_freshly_built_state() {
        let mut arena = Arena::<1024>::new();
        let mut pool = pool_16x8(arena.as_mut_slice());

        let fresh_sequence: Vec<_> = (0..5).map(|_| pool.alloc().unwrap()).collect();

        // Disturb the pool, then clear it.
        pool.free(fresh_sequence[1]).unwrap();
        pool.free(fresh_sequence[3]).unwrap();
        _ = pool.alloc().unwrap();
        pool.clear();

        assert!(pool.is_empty());

        // The allocation sequence replays exactly as on a fresh pool.
        let replayed: Vec<_> = (0..5).map(|_| pool.alloc().unwrap()).collect();
        assert_eq!(replayed, fresh_sequence);

        #[cfg(debug_assertions)]
        assert_eq!(pool.diagnostics().allocations, 5);
    }

    #[test]
    fn into_arena_returns_the_zeroed_buffer() {
        let mut arena = Arena::<512>::new();
        let mut pool = pool_16x8(arena.as_mut_slice());

        let slot = pool.alloc().unwrap();

        // SAFETY: The slot is an exclusive step-sized region until freed.
        unsafe {
            slot.write_bytes(0xFF, pool.step());
        }

        let recovered = pool.into_arena();
        assert_eq!(recovered.len(), 512);
        assert!(recovered.iter().all(|&byte| byte == 0));
    }

    #[test]
    fn slot_pointers_are_aligned() {
        let mut arena = Arena::<1024>::new();
        let mut pool = FixedPool::builder()
            .step(nz!(24))
            .alignment(nz!(64))
            .build(arena.as_mut_slice())
            .unwrap();

        // Step rounds up to the alignment.
        assert_eq!(pool.step(), 64);

        while let Some(slot) = pool.alloc() {
            assert_eq!(slot.addr().get() % 64, 0);
        }
    }

    #[test]
    fn debug_output_names_the_descriptor_fields() {
        let mut arena = Arena::<512>::new();
        let mut pool = pool_16x8(arena.as_mut_slice());

        _ = pool.alloc().unwrap();

        let rendered = format!("{pool:?}");
        assert!(rendered.contains("FixedPool"));
        assert!(rendered.contains("capacity"));
        assert!(rendered.contains("count: 1"));
    }

    #[test]
    fn peak_tracks_the_high_water_mark() {
        #[cfg(debug_assertions)]
        {
            let mut arena = Arena::<1024>::new();
            let mut pool = pool_16x8(arena.as_mut_slice());

            let slots: Vec<_> = (0..10).map(|_| pool.alloc().unwrap()).collect();
            for slot in &slots {
                pool.free(*slot).unwrap();
            }

            assert_eq!(pool.diagnostics().peak, 10);
            assert_eq!(pool.diagnostics().failed, 0);
        }
    }
}
