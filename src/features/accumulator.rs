use super::layout::{bigram_code, BigramTable, NUM_BIGRAMS, NUM_UNIGRAMS};
use super::ngram_mode::NgramMode;

/// Upper bound (exclusive) of the low ASCII band
pub const ASCII_LOW_LIMIT: u8 = 0x20;

/// Lower bound (inclusive) of the high ASCII band
pub const ASCII_HIGH_START: u8 = 0x80;

/// Running byte and bigram totals for one logical stream
///
/// `update` may be called any number of times with arbitrarily sized slices;
/// the totals only depend on the concatenation of everything fed in. The
/// three bigram tables are allocated once and zeroed in place on reset, so
/// repeated classification does not touch the allocator.
///
/// # Example
/// ```
/// use bytesift::features::{ByteStatistics, NgramMode};
///
/// let mut split = ByteStatistics::new(NgramMode::DEFAULT);
/// split.update(b"AB");
/// split.update(b"CD");
///
/// let mut whole = ByteStatistics::new(NgramMode::DEFAULT);
/// whole.update(b"ABCD");
///
/// assert_eq!(split, whole);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct ByteStatistics {
    mode: NgramMode,
    unigrams: [u64; NUM_UNIGRAMS],
    bigrams_all: Box<[u64]>,
    bigrams_even: Box<[u64]>,
    bigrams_odd: Box<[u64]>,
    total: u64,
    hamming_total: u64,
    byte_sum: u64,
    byte_square_sum: u64,
    product_sum: u64,
    contiguity_total: u64,
    low_ascii: u64,
    med_ascii: u64,
    high_ascii: u64,
    first: u8,
    prev: u8,
    run_length: u64,
    max_run: u64,
}

impl ByteStatistics {
    /// Create zeroed statistics that populate the tables `mode` enables
    pub fn new(mode: NgramMode) -> Self {
        Self {
            mode,
            unigrams: [0; NUM_UNIGRAMS],
            bigrams_all: vec![0; NUM_BIGRAMS].into_boxed_slice(),
            bigrams_even: vec![0; NUM_BIGRAMS].into_boxed_slice(),
            bigrams_odd: vec![0; NUM_BIGRAMS].into_boxed_slice(),
            total: 0,
            hamming_total: 0,
            byte_sum: 0,
            byte_square_sum: 0,
            product_sum: 0,
            contiguity_total: 0,
            low_ascii: 0,
            med_ascii: 0,
            high_ascii: 0,
            first: 0,
            prev: 0,
            run_length: 0,
            max_run: 0,
        }
    }

    /// Fold `buf` into the running totals
    pub fn update(&mut self, buf: &[u8]) {
        let count_all = self.mode.bigram_enabled(BigramTable::All);
        let count_even = self.mode.bigram_enabled(BigramTable::Even);
        let count_odd = self.mode.bigram_enabled(BigramTable::Odd);

        for &byte in buf {
            self.unigrams[byte as usize] += 1;

            if byte < ASCII_LOW_LIMIT {
                self.low_ascii += 1;
            } else if byte < ASCII_HIGH_START {
                self.med_ascii += 1;
            } else {
                self.high_ascii += 1;
            }

            let value = u64::from(byte);
            self.hamming_total += u64::from(byte.count_ones());
            self.byte_sum += value;
            self.byte_square_sum += value * value;

            if self.total == 0 {
                self.first = byte;
                self.run_length = 1;
            } else {
                let prev = self.prev;
                let code = bigram_code(prev, byte);

                if count_all {
                    self.bigrams_all[code] += 1;
                }
                // The pair starts at the previous byte's stream offset
                if (self.total - 1) % 2 == 0 {
                    if count_even {
                        self.bigrams_even[code] += 1;
                    }
                } else if count_odd {
                    self.bigrams_odd[code] += 1;
                }

                self.contiguity_total += u64::from(prev.abs_diff(byte));
                self.product_sum += u64::from(prev) * value;

                if prev == byte {
                    self.run_length += 1;
                    self.max_run = self.max_run.max(self.run_length);
                } else {
                    self.run_length = 1;
                }
            }

            self.prev = byte;
            self.total += 1;
        }
    }

    /// Zero every total, keeping the table allocations
    pub fn reset(&mut self) {
        self.unigrams = [0; NUM_UNIGRAMS];
        self.bigrams_all.fill(0);
        self.bigrams_even.fill(0);
        self.bigrams_odd.fill(0);
        self.total = 0;
        self.hamming_total = 0;
        self.byte_sum = 0;
        self.byte_square_sum = 0;
        self.product_sum = 0;
        self.contiguity_total = 0;
        self.low_ascii = 0;
        self.med_ascii = 0;
        self.high_ascii = 0;
        self.first = 0;
        self.prev = 0;
        self.run_length = 0;
        self.max_run = 0;
    }

    /// Switch ngram mode; discards anything accumulated so far
    pub fn set_mode(&mut self, mode: NgramMode) {
        self.mode = mode;
        self.reset();
    }

    pub fn mode(&self) -> NgramMode {
        self.mode
    }

    /// Number of bytes seen since the last reset
    pub fn total_bytes(&self) -> u64 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn unigram_count(&self, byte: u8) -> u64 {
        self.unigrams[byte as usize]
    }

    pub fn unigram_counts(&self) -> &[u64; NUM_UNIGRAMS] {
        &self.unigrams
    }

    /// Raw pair counts of one table, indexed by `(first << 8) | second`
    pub fn bigram_counts(&self, table: BigramTable) -> &[u64] {
        match table {
            BigramTable::All => &self.bigrams_all,
            BigramTable::Even => &self.bigrams_even,
            BigramTable::Odd => &self.bigrams_odd,
        }
    }

    /// Longest run of one repeated byte value (0 if no byte ever repeated)
    pub fn max_run(&self) -> u64 {
        self.max_run
    }

    pub(crate) fn hamming_total(&self) -> u64 {
        self.hamming_total
    }

    pub(crate) fn byte_sum(&self) -> u64 {
        self.byte_sum
    }

    pub(crate) fn byte_square_sum(&self) -> u64 {
        self.byte_square_sum
    }

    pub(crate) fn product_sum(&self) -> u64 {
        self.product_sum
    }

    pub(crate) fn contiguity_total(&self) -> u64 {
        self.contiguity_total
    }

    pub(crate) fn ascii_bands(&self) -> (u64, u64, u64) {
        (self.low_ascii, self.med_ascii, self.high_ascii)
    }

    pub(crate) fn first_byte(&self) -> u8 {
        self.first
    }

    pub(crate) fn last_byte(&self) -> u8 {
        self.prev
    }
}

impl std::fmt::Debug for ByteStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteStatistics")
            .field("mode", &self.mode)
            .field("total", &self.total)
            .field("max_run", &self.max_run)
            .field("run_length", &self.run_length)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unigram_counts_sum_to_total() {
        let mut stats = ByteStatistics::new(NgramMode::DEFAULT);
        stats.update(b"hello, world");
        let sum: u64 = stats.unigram_counts().iter().sum();
        assert_eq!(sum, 12);
        assert_eq!(stats.total_bytes(), 12);
        assert_eq!(stats.unigram_count(b'l'), 3);
    }

    #[test]
    fn test_all_bigrams_count_every_pair() {
        let mut stats = ByteStatistics::new(NgramMode::BIGRAMS_ALL);
        stats.update(b"ABAB");
        let all = stats.bigram_counts(BigramTable::All);
        assert_eq!(all[bigram_code(b'A', b'B')], 2);
        assert_eq!(all[bigram_code(b'B', b'A')], 1);
    }

    #[test]
    fn test_even_odd_split_by_pair_start() {
        let mode = NgramMode::BIGRAMS_EVEN | NgramMode::BIGRAMS_ODD;
        let mut stats = ByteStatistics::new(mode);
        // pairs: (A,B)@0 (B,C)@1 (C,D)@2
        stats.update(b"ABCD");
        let even = stats.bigram_counts(BigramTable::Even);
        let odd = stats.bigram_counts(BigramTable::Odd);
        assert_eq!(even[bigram_code(b'A', b'B')], 1);
        assert_eq!(even[bigram_code(b'C', b'D')], 1);
        assert_eq!(odd[bigram_code(b'B', b'C')], 1);
        assert_eq!(even.iter().sum::<u64>(), 2);
        assert_eq!(odd.iter().sum::<u64>(), 1);
        // all table disabled
        assert_eq!(stats.bigram_counts(BigramTable::All).iter().sum::<u64>(), 0);
    }

    #[test]
    fn test_parity_persists_across_calls() {
        let mode = NgramMode::BIGRAMS_EVEN | NgramMode::BIGRAMS_ODD;
        let mut split = ByteStatistics::new(mode);
        split.update(b"A");
        split.update(b"BC");
        split.update(b"D");
        let mut whole = ByteStatistics::new(mode);
        whole.update(b"ABCD");
        assert_eq!(split, whole);
    }

    #[test]
    fn test_ascii_bands() {
        let mut stats = ByteStatistics::new(NgramMode::UNIGRAMS_ONLY);
        stats.update(&[0x00, 0x1f, 0x20, 0x7f, 0x80, 0xff, 0x41]);
        assert_eq!(stats.ascii_bands(), (2, 3, 2));
    }

    #[test]
    fn test_run_tracking() {
        let mut stats = ByteStatistics::new(NgramMode::UNIGRAMS_ONLY);
        stats.update(b"ABCD");
        assert_eq!(stats.max_run(), 0);

        stats.reset();
        stats.update(b"AAB");
        stats.update(b"BBBA");
        assert_eq!(stats.max_run(), 4);
    }

    #[test]
    fn test_contiguity_and_sums() {
        let mut stats = ByteStatistics::new(NgramMode::UNIGRAMS_ONLY);
        stats.update(&[10, 20, 5]);
        assert_eq!(stats.contiguity_total(), 10 + 15);
        assert_eq!(stats.byte_sum(), 35);
        assert_eq!(stats.byte_square_sum(), 100 + 400 + 25);
        assert_eq!(stats.product_sum(), 200 + 100);
        assert_eq!(stats.first_byte(), 10);
        assert_eq!(stats.last_byte(), 5);
    }

    #[test]
    fn test_hamming_total() {
        let mut stats = ByteStatistics::new(NgramMode::UNIGRAMS_ONLY);
        stats.update(&[0xff, 0x01, 0x00]);
        assert_eq!(stats.hamming_total(), 9);
    }

    #[test]
    fn test_reset_zeroes_everything() {
        let mut stats = ByteStatistics::new(NgramMode::DEFAULT);
        stats.update(b"some bytes to forget");
        stats.reset();
        assert_eq!(stats, ByteStatistics::new(NgramMode::DEFAULT));
        assert!(stats.is_empty());
    }

    #[test]
    fn test_empty_update_is_noop() {
        let mut stats = ByteStatistics::new(NgramMode::DEFAULT);
        stats.update(&[]);
        assert!(stats.is_empty());
    }
}
