use std::fmt;
use std::ptr::NonNull;

use crate::WORD_BITS;

/// How many words the free-slot scan strides over per unrolled iteration
/// while skipping fully occupied words.
const SCAN_STRIDE: usize = 8;

/// The packed free-list of a pool: one bit per slot, stored in machine words
/// carved out of the caller's arena.
///
/// Bit `i` lives in word `i / WORD_BITS` at position `i % WORD_BITS`, least
/// significant bit first. A set bit marks the slot as allocated. Bits past
/// the pool capacity in the final word are never set, so a scan that lands on
/// one of them means every real slot is occupied.
///
/// The view does not own the words. The pool guarantees they stay valid, stay
/// word-aligned and are reached through no other path for as long as the view
/// exists.
pub(crate) struct Bitmap {
    words: NonNull<usize>,
    word_count: usize,
}

impl Bitmap {
    /// Creates a view over `word_count` words starting at `words`.
    ///
    /// # Safety
    ///
    /// `words` must point to `word_count` consecutive machine words that
    /// remain valid for reads and writes, and are not accessed through any
    /// other pointer, for the lifetime of the view.
    pub(crate) unsafe fn new(words: NonNull<usize>, word_count: usize) -> Self {
        Self { words, word_count }
    }

    fn word(&self, index: usize) -> usize {
        assert!(index < self.word_count, "bitmap word {index} out of range");

        // SAFETY: Bounds asserted above; validity per the construction contract.
        unsafe { self.words.add(index).read() }
    }

    fn update_word(&mut self, index: usize, value: usize) {
        assert!(index < self.word_count, "bitmap word {index} out of range");

        // SAFETY: Bounds asserted above; validity per the construction contract.
        unsafe {
            self.words.add(index).write(value);
        }
    }

    #[must_use]
    #[allow(
        clippy::arithmetic_side_effects,
        clippy::integer_division,
        reason = "the word size is a nonzero constant"
    )]
    pub(crate) fn is_set(&self, bit: usize) -> bool {
        self.word(bit / WORD_BITS) & (1 << (bit % WORD_BITS)) != 0
    }

    #[allow(
        clippy::arithmetic_side_effects,
        clippy::integer_division,
        reason = "the word size is a nonzero constant"
    )]
    pub(crate) fn set(&mut self, bit: usize) {
        let value = self.word(bit / WORD_BITS) | (1 << (bit % WORD_BITS));
        self.update_word(bit / WORD_BITS, value);
    }

    #[allow(
        clippy::arithmetic_side_effects,
        clippy::integer_division,
        reason = "the word size is a nonzero constant"
    )]
    pub(crate) fn clear(&mut self, bit: usize) {
        let value = self.word(bit / WORD_BITS) & !(1 << (bit % WORD_BITS));
        self.update_word(bit / WORD_BITS, value);
    }

    /// Marks every slot free.
    pub(crate) fn zero(&mut self) {
        // SAFETY: The view spans `word_count` writable words per the
        // construction contract.
        unsafe {
            self.words.write_bytes(0, self.word_count);
        }
    }

    /// Index of the lowest free slot, or `None` if all `capacity` slots are
    /// occupied.
    ///
    /// Words with no free bit are skipped [`SCAN_STRIDE`] at a time before
    /// the per-word check, so a long occupied prefix costs one comparison per
    /// word with few branch decisions.
    #[must_use]
    #[allow(
        clippy::arithmetic_side_effects,
        reason = "word indexes are bounded by the word count, which the loop guards check"
    )]
    pub(crate) fn find_first_zero(&self, capacity: usize) -> Option<usize> {
        let mut word_index = 0;

        while word_index + SCAN_STRIDE <= self.word_count {
            if (word_index..word_index + SCAN_STRIDE).any(|i| self.word(i) != usize::MAX) {
                break;
            }

            word_index += SCAN_STRIDE;
        }

        while word_index < self.word_count {
            let word = self.word(word_index);

            if word != usize::MAX {
                // The lowest zero bit wins: allocation always prefers the
                // lowest-indexed free slot.
                let in_word = usize::try_from((!word).trailing_zeros())
                    .expect("bit position within a word always fits in usize");
                let bit = word_index * WORD_BITS + in_word;

                return (bit < capacity).then_some(bit);
            }

            word_index += 1;
        }

        None
    }
}

/// Formats a bitmap word as hex; the bit pattern is what matters, not the
/// numeric value.
struct HexWord(usize);

impl fmt::Debug for HexWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::Debug for Bitmap {
    /// Renders only the words that have at least one slot allocated, as the
    /// full bitmap is mostly noise for any sizable pool.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let occupied = (0..self.word_count)
            .map(|i| (i, self.word(i)))
            .filter(|&(_, word)| word != 0);

        f.debug_map()
            .entries(occupied.map(|(i, word)| (i, HexWord(word))))
            .finish()
    }
}

#[cfg(test)]
#[allow(
    clippy::arithmetic_side_effects,
    reason = "tests focus on succinct code and do not need to tick all the boxes"
)]
mod tests {
    use super::*;

    /// Words backing a bitmap under test. Keeps the storage alive for as
    /// long as the view needs it.
    struct Backing {
        words: Vec<usize>,
    }

    impl Backing {
        fn new(word_count: usize) -> Self {
            Self {
                words: vec![0; word_count],
            }
        }

        fn bitmap(&mut self) -> Bitmap {
            // SAFETY: The Vec outlives the view in every test and is not
            // accessed while the view is alive.
            unsafe {
                Bitmap::new(
                    NonNull::new(self.words.as_mut_ptr()).unwrap(),
                    self.words.len(),
                )
            }
        }
    }

    #[test]
    fn set_clear_roundtrip() {
        let mut backing = Backing::new(2);
        let mut bitmap = backing.bitmap();

        assert!(!bitmap.is_set(5));

        bitmap.set(5);
        assert!(bitmap.is_set(5));

        // Neighbors are untouched.
        assert!(!bitmap.is_set(4));
        assert!(!bitmap.is_set(6));

        bitmap.clear(5);
        assert!(!bitmap.is_set(5));
    }

    #[test]
    fn bits_straddle_word_boundaries() {
        let mut backing = Backing::new(3);
        let mut bitmap = backing.bitmap();

        bitmap.set(WORD_BITS - 1);
        bitmap.set(WORD_BITS);
        bitmap.set(2 * WORD_BITS + 1);

        assert!(bitmap.is_set(WORD_BITS - 1));
        assert!(bitmap.is_set(WORD_BITS));
        assert!(bitmap.is_set(2 * WORD_BITS + 1));
        assert!(!bitmap.is_set(0));
    }

    #[test]
    fn lowest_free_index_wins() {
        let mut backing = Backing::new(1);
        let mut bitmap = backing.bitmap();

        assert_eq!(bitmap.find_first_zero(WORD_BITS), Some(0));

        bitmap.set(0);
        bitmap.set(1);
        bitmap.set(3);

        // 2 is free and lower than every other free bit.
        assert_eq!(bitmap.find_first_zero(WORD_BITS), Some(2));
    }

    #[test]
    fn scan_skips_occupied_strides() {
        let word_count = 20;
        let capacity = word_count * WORD_BITS;

        let mut backing = Backing::new(word_count);
        let mut bitmap = backing.bitmap();

        for bit in 0..capacity {
            bitmap.set(bit);
        }

        let target = 17 * WORD_BITS + 5;
        bitmap.clear(target);

        assert_eq!(bitmap.find_first_zero(capacity), Some(target));
    }

    #[test]
    fn free_bits_past_capacity_do_not_count() {
        let mut backing = Backing::new(1);
        let mut bitmap = backing.bitmap();

        let capacity = 10;
        for bit in 0..capacity {
            bitmap.set(bit);
        }

        // Bits 10.. of the word are zero but name no real slot.
        assert_eq!(bitmap.find_first_zero(capacity), None);
    }

    #[test]
    fn full_bitmap_yields_none() {
        let word_count = 9;
        let capacity = word_count * WORD_BITS;

        let mut backing = Backing::new(word_count);
        let mut bitmap = backing.bitmap();

        for bit in 0..capacity {
            bitmap.set(bit);
        }

        assert_eq!(bitmap.find_first_zero(capacity), None);
    }

    #[test]
    fn zero_frees_everything() {
        let mut backing = Backing::new(2);
        let mut bitmap = backing.bitmap();

        for bit in 0..(2 * WORD_BITS) {
            bitmap.set(bit);
        }
        assert_eq!(bitmap.find_first_zero(2 * WORD_BITS), None);

        bitmap.zero();

        assert_eq!(bitmap.find_first_zero(2 * WORD_BITS), Some(0));
        assert!(!bitmap.is_set(WORD_BITS + 3));
    }

    #[test]
    fn debug_output_lists_only_occupied_words() {
        let mut backing = Backing::new(4);
        let mut bitmap = backing.bitmap();

        bitmap.set(2 * WORD_BITS);

        let rendered = format!("{bitmap:?}");
        assert!(rendered.contains("2:"));
        assert!(!rendered.contains("0:"));
    }

    #[test]
    #[should_panic]
    fn out_of_range_bit_panics() {
        let mut backing = Backing::new(1);
        let bitmap = backing.bitmap();

        _ = bitmap.is_set(WORD_BITS);
    }
}
