use std::num::NonZero;

use new_zealand::nz;

use crate::{Error, Result};

/// The largest slot alignment a [`FixedPool`](crate::FixedPool) accepts, in bytes.
pub const MAX_ALIGNMENT: NonZero<usize> = nz!(128);

/// Machine word size in bytes. Doubles as the alignment floor and as the unit
/// the free-list bitmap is scanned in.
pub(crate) const WORD_BYTES: usize = size_of::<usize>();

/// Machine word size in bits.
pub(crate) const WORD_BITS: usize = WORD_BYTES * 8;

/// How a caller-provided arena is carved into a free-list bitmap region and a
/// slot data region, in that order.
///
/// `data_offset` and the bitmap (which always starts at offset zero) are
/// relative to the aligned arena start, which sits `prefix` bytes into the
/// caller's buffer. Both region starts are multiples of `alignment`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct PoolLayout {
    /// Resolved slot alignment: a power of two between the machine word size
    /// and [`MAX_ALIGNMENT`].
    pub(crate) alignment: usize,

    /// Per-slot size in bytes, a multiple of `alignment`.
    pub(crate) step: usize,

    /// Bytes consumed rounding the arena start address up to `alignment`.
    pub(crate) prefix: usize,

    /// Number of machine words the free-list bitmap occupies.
    pub(crate) bitmap_words: usize,

    /// Offset of the slot array from the aligned arena start.
    pub(crate) data_offset: usize,

    /// Number of slots the arena hosts. Always at least one.
    pub(crate) capacity: usize,
}

/// Rounds `value` up to the next multiple of `alignment`, which must be a
/// power of two.
#[allow(
    clippy::arithmetic_side_effects,
    reason = "a power-of-two alignment is at least 1, so the decrement cannot underflow"
)]
pub(crate) fn align_up(value: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two());

    value
        .checked_add(alignment - 1)
        .expect("aligned value must still fit in usize")
        & !(alignment - 1)
}

impl PoolLayout {
    /// Plans the carve-up of an arena of `arena_len` bytes starting at address
    /// `arena_addr` into the largest possible number of `step`-byte slots.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlignmentTooLarge`] if the requested alignment rounds
    /// up beyond [`MAX_ALIGNMENT`], and [`Error::ArenaTooSmall`] if the arena
    /// cannot host even one slot after the alignment prefix and the bitmap
    /// have taken their share.
    #[allow(
        clippy::arithmetic_side_effects,
        clippy::integer_division,
        reason = "the capacity arithmetic is widened to u128, where usize-sized inputs cannot \
                  overflow, and the divisor is at least 1"
    )]
    pub(crate) fn plan(
        arena_addr: usize,
        arena_len: usize,
        step: NonZero<usize>,
        alignment: Option<NonZero<usize>>,
    ) -> Result<Self> {
        let requested = alignment.map_or(WORD_BYTES, NonZero::get);
        let alignment = requested.next_power_of_two().max(WORD_BYTES);

        if alignment > MAX_ALIGNMENT.get() {
            return Err(Error::AlignmentTooLarge {
                requested,
                max: MAX_ALIGNMENT.get(),
            });
        }

        let step = align_up(step.get(), alignment);

        let prefix = align_up(arena_addr, alignment) - arena_addr;
        let remaining = arena_len.saturating_sub(prefix);
        if remaining == 0 {
            return Err(Error::ArenaTooSmall { arena_len, step });
        }

        // The largest n with ceil(n / 8) + n * step <= remaining. The seed
        // treats the bitmap as a fractional (n + 7) / 8 bytes:
        //
        //   (n + 7) / 8 + n * step <= remaining
        //   n * (1 + 8 * step)     <= remaining * 8 - 7
        //
        // That overshoots ceil(n / 8) by up to seven bits, so the next slot
        // count may still fit and is probed explicitly.
        let capacity = {
            let bits = remaining as u128 * 8;
            let per_slot = 1 + step as u128 * 8;

            let seed = usize::try_from((bits - 7) / per_slot)
                .expect("slot count never exceeds the arena length in bytes");

            seed.checked_add(1)
                .filter(|&n| Self::regions_fit(n, step, alignment, remaining))
                .unwrap_or(seed)
        };

        if capacity == 0 {
            return Err(Error::ArenaTooSmall { arena_len, step });
        }

        // Alignment padding between the bitmap and the data region is not
        // part of the inequality above, so the padded layout gets a final
        // check. Refusing the arena beats silently truncating it.
        if !Self::regions_fit(capacity, step, alignment, remaining) {
            return Err(Error::ArenaTooSmall { arena_len, step });
        }

        let data_offset = align_up(capacity.div_ceil(8), alignment);
        let bitmap_words = capacity.div_ceil(WORD_BITS);

        // The alignment floor at the word size guarantees the word-granular
        // bitmap never reaches into the data region.
        debug_assert!(bitmap_words * WORD_BYTES <= data_offset);

        Ok(Self {
            alignment,
            step,
            prefix,
            bitmap_words,
            data_offset,
            capacity,
        })
    }

    /// Whether `capacity` slots of `step` bytes, plus the aligned bitmap
    /// ahead of them, fit into `remaining` bytes.
    #[allow(
        clippy::arithmetic_side_effects,
        reason = "u128 intermediates cannot overflow for usize-sized inputs"
    )]
    fn regions_fit(capacity: usize, step: usize, alignment: usize, remaining: usize) -> bool {
        let bitmap_bytes = capacity.div_ceil(8) as u128;
        let data_offset = bitmap_bytes.next_multiple_of(alignment as u128);
        let data_len = capacity as u128 * step as u128;

        data_offset + data_len <= remaining as u128
    }
}

#[cfg(test)]
#[allow(
    clippy::arithmetic_side_effects,
    clippy::integer_division,
    reason = "tests focus on succinct code and do not need to tick all the boxes"
)]
mod tests {
    use super::*;

    fn plan(arena_addr: usize, arena_len: usize, step: usize, alignment: usize) -> Result<PoolLayout> {
        PoolLayout::plan(
            arena_addr,
            arena_len,
            NonZero::new(step).unwrap(),
            NonZero::new(alignment),
        )
    }

    #[test]
    fn capacity_is_maximal() {
        for arena_len in [24_usize, 64, 100, 256, 731, 1024, 4096] {
            for step in [1_usize, 3, 8, 16, 40, 128] {
                for alignment in [0_usize, 8, 16, 64, 128] {
                    let Ok(layout) = plan(0, arena_len, step, alignment) else {
                        continue;
                    };

                    // Arena address 0 means no prefix, so the whole length is
                    // available to the bitmap and data regions.
                    assert_eq!(layout.prefix, 0);

                    let brute_force_max = (1..=arena_len)
                        .take_while(|&n| {
                            PoolLayout::regions_fit(
                                n,
                                layout.step,
                                layout.alignment,
                                arena_len,
                            )
                        })
                        .last()
                        .unwrap();

                    assert_eq!(
                        layout.capacity, brute_force_max,
                        "arena_len={arena_len} step={step} alignment={alignment}"
                    );
                }
            }
        }
    }

    #[test]
    fn reference_scenario_arithmetic() {
        // 1024 bytes, 16-byte slots, 8-byte alignment: 63 slots fit because
        // ceil(63 / 8) + 63 * 16 = 8 + 1008 = 1016, while 64 slots would need
        // 8 + 1024 = 1032 bytes.
        let layout = plan(0, 1024, 16, 8).unwrap();

        assert_eq!(layout.capacity, 63);
        assert_eq!(layout.data_offset, 8);
        assert_eq!(layout.step, 16);
    }

    #[test]
    fn seed_undershoot_is_corrected() {
        // 520 bytes of 8-byte slots: the fractional seed claims 63 slots, but
        // ceil(64 / 8) + 64 * 8 = 8 + 512 = 520 bytes fit exactly.
        let layout = plan(0, 520, 8, 8).unwrap();
        assert_eq!(layout.capacity, 64);
    }

    #[test]
    fn unaligned_arena_start_consumes_prefix() {
        let layout = plan(5, 1024, 16, 8).unwrap();

        assert_eq!(layout.prefix, 3);

        // The three prefix bytes are no longer available for slots.
        let aligned = plan(8, 1024, 16, 8).unwrap();
        assert!(layout.capacity <= aligned.capacity);
    }

    #[test]
    fn step_rounds_up_to_alignment() {
        let layout = plan(0, 1024, 10, 16).unwrap();
        assert_eq!(layout.step, 16);

        let layout = plan(0, 1024, 17, 16).unwrap();
        assert_eq!(layout.step, 32);
    }

    #[test]
    fn alignment_rounds_to_power_of_two_with_word_floor() {
        let layout = plan(0, 1024, 16, 3).unwrap();
        assert_eq!(layout.alignment, 4_usize.max(WORD_BYTES));

        let layout = plan(0, 1024, 16, 0).unwrap();
        assert_eq!(layout.alignment, WORD_BYTES);

        let layout = plan(0, 1024, 16, 128).unwrap();
        assert_eq!(layout.alignment, 128);
    }

    #[test]
    fn oversized_alignment_is_rejected() {
        assert!(matches!(
            plan(0, 1024, 16, 256),
            Err(Error::AlignmentTooLarge {
                requested: 256,
                max: 128
            })
        ));

        // 129 rounds up to 256 before the cap is applied.
        assert!(matches!(
            plan(0, 1024, 16, 129),
            Err(Error::AlignmentTooLarge { .. })
        ));
    }

    #[test]
    fn degenerate_arenas_are_rejected() {
        assert!(matches!(
            plan(0, 0, 16, 8),
            Err(Error::ArenaTooSmall { .. })
        ));

        // Too small for one slot plus its bitmap byte.
        assert!(matches!(
            plan(0, 16, 16, 8),
            Err(Error::ArenaTooSmall { .. })
        ));

        // The alignment prefix swallows the whole arena.
        assert!(matches!(
            plan(1, 7, 16, 8),
            Err(Error::ArenaTooSmall { .. })
        ));
    }

    #[test]
    fn bitmap_words_stay_clear_of_data_region() {
        for capacity_target in 1..200_usize {
            // Pick an arena just big enough for the target slot count.
            let arena_len = capacity_target * 9 + 16;
            let Ok(layout) = plan(0, arena_len, 8, 8) else {
                continue;
            };

            assert!(layout.bitmap_words * WORD_BYTES <= layout.data_offset);
            assert_eq!(layout.data_offset % layout.alignment, 0);
        }
    }
}
