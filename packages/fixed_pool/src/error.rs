use thiserror::Error;

/// Errors that can occur when constructing or operating a [`FixedPool`](crate::FixedPool).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The requested slot alignment exceeds [`MAX_ALIGNMENT`](crate::MAX_ALIGNMENT).
    #[error("requested alignment of {requested} bytes exceeds the supported maximum of {max}")]
    AlignmentTooLarge {
        /// The alignment the caller asked for, before any rounding.
        requested: usize,

        /// The largest alignment the pool supports.
        max: usize,
    },

    /// The arena cannot host even a single slot once the alignment prefix and
    /// the free-list bitmap have taken their share.
    #[error("arena of {arena_len} bytes cannot host a single slot of {step} bytes")]
    ArenaTooSmall {
        /// The length of the arena the caller provided.
        arena_len: usize,

        /// The per-slot size after rounding up to the resolved alignment.
        step: usize,
    },

    /// A pointer passed to `free` does not lie inside the pool's data region.
    #[error("pointer {addr:#x} is outside the pool's data region")]
    PointerOutOfBounds {
        /// The address of the offending pointer.
        addr: usize,
    },

    /// A pointer passed to `free` lies inside the data region but is not
    /// offset from its start by a whole number of slots.
    #[error("pointer {addr:#x} does not sit on a slot boundary")]
    PointerMisaligned {
        /// The address of the offending pointer.
        addr: usize,
    },
}

/// A specialized `Result` type for fixed pool operations, returning the
/// crate's [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug);

    #[test]
    fn display_names_the_offender() {
        let error = Error::PointerOutOfBounds { addr: 0x1000 };
        assert!(error.to_string().contains("0x1000"));

        let error = Error::AlignmentTooLarge {
            requested: 512,
            max: 128,
        };
        assert!(error.to_string().contains("512"));
        assert!(error.to_string().contains("128"));
    }
}
