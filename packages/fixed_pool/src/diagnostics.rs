/// Allocation counters a [`FixedPool`](crate::FixedPool) maintains in debug
/// builds.
///
/// The counters (and this type) exist only when `debug_assertions` are
/// enabled, so release builds carry no bookkeeping overhead and the pool's
/// memory layout is unaffected. Obtain a snapshot via
/// [`FixedPool::diagnostics()`](crate::FixedPool::diagnostics).
///
/// # Example
///
/// ```
/// use fixed_pool::FixedPool;
/// use new_zealand::nz;
///
/// let mut arena = [0_u8; 512];
/// let mut pool = FixedPool::builder()
///     .step(nz!(32))
///     .build(&mut arena)
///     .unwrap();
///
/// let slot = pool.alloc().unwrap();
/// pool.free(slot).unwrap();
///
/// // A freed slot primes the prediction hint, so this one is a cache hit.
/// let _slot = pool.alloc().unwrap();
///
/// let stats = pool.diagnostics();
/// assert_eq!(stats.allocations, 2);
/// assert!(stats.predicted >= 1);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub struct Diagnostics {
    /// Highest number of concurrently allocated slots observed since the
    /// pool was built or last cleared.
    pub peak: usize,

    /// Allocation attempts that returned no slot because the pool was full.
    pub failed: usize,

    /// Allocations satisfied by the prediction hint, without a bitmap scan.
    pub predicted: usize,

    /// Total allocation attempts, successful or not.
    pub allocations: usize,

    /// Frees of slots that were already free. Always zero for a correct
    /// caller; see the double-free contract on
    /// [`FixedPool::free()`](crate::FixedPool::free).
    pub double_frees: usize,
}
