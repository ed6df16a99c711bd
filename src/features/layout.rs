//! Sparse feature index space
//!
//! Slot 0 is unused because the classifier's indices are 1-based. The bigram
//! tables are laid out in the order the vector builder emits them, so emission
//! order and index order agree.

/// Number of distinct unigrams (byte values)
pub const NUM_UNIGRAMS: usize = 256;

/// Number of distinct ordered byte pairs
pub const NUM_BIGRAMS: usize = NUM_UNIGRAMS * NUM_UNIGRAMS;

/// Number of scalar-statistic slots
pub const NUM_STATS: usize = 16;

pub const START_UNIGRAMS: usize = 1;
pub const START_BIGRAMS_ALL: usize = START_UNIGRAMS + NUM_UNIGRAMS;
pub const START_BIGRAMS_EVEN: usize = START_BIGRAMS_ALL + NUM_BIGRAMS;
pub const START_BIGRAMS_ODD: usize = START_BIGRAMS_EVEN + NUM_BIGRAMS;
pub const START_STATS: usize = START_BIGRAMS_ODD + NUM_BIGRAMS;

/// One past the last valid slot; also the length of a feature mask
pub const MAX_FEATURE_INDEX: usize = START_STATS + NUM_STATS;

/// Flat table offset for the ordered pair `(first, second)`
#[inline]
pub const fn bigram_code(first: u8, second: u8) -> usize {
    ((first as usize) << 8) | second as usize
}

/// The three bigram tables, in emission order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BigramTable {
    /// Every adjacent pair
    All,
    /// Pairs whose first byte sits at an even stream offset
    Even,
    /// Pairs whose first byte sits at an odd stream offset
    Odd,
}

impl BigramTable {
    pub const ALL: [BigramTable; 3] = [BigramTable::All, BigramTable::Even, BigramTable::Odd];

    /// First sparse slot of this table
    pub const fn start(self) -> usize {
        match self {
            BigramTable::All => START_BIGRAMS_ALL,
            BigramTable::Even => START_BIGRAMS_EVEN,
            BigramTable::Odd => START_BIGRAMS_ODD,
        }
    }

    /// Integer divisor applied to the stream length when normalizing counts
    pub const fn length_divisor(self) -> u64 {
        match self {
            BigramTable::All => 2,
            BigramTable::Even | BigramTable::Odd => 4,
        }
    }
}

/// Scalar statistics in slot order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statistic {
    BigramEntropy,
    ItemEntropy,
    HammingWeight,
    MeanByteValue,
    StddevByteValue,
    AbsoluteDeviation,
    Skewness,
    Kurtosis,
    Contiguity,
    MaxByteStreak,
    LowAsciiFreq,
    MedAsciiFreq,
    HighAsciiFreq,
    ByteValueCorrelation,
    ByteFrequencyCorrelation,
    UnigramChiSquare,
}

impl Statistic {
    pub const ALL: [Statistic; NUM_STATS] = [
        Statistic::BigramEntropy,
        Statistic::ItemEntropy,
        Statistic::HammingWeight,
        Statistic::MeanByteValue,
        Statistic::StddevByteValue,
        Statistic::AbsoluteDeviation,
        Statistic::Skewness,
        Statistic::Kurtosis,
        Statistic::Contiguity,
        Statistic::MaxByteStreak,
        Statistic::LowAsciiFreq,
        Statistic::MedAsciiFreq,
        Statistic::HighAsciiFreq,
        Statistic::ByteValueCorrelation,
        Statistic::ByteFrequencyCorrelation,
        Statistic::UnigramChiSquare,
    ];

    /// Position of this statistic within the stat block
    pub const fn ordinal(self) -> usize {
        self as usize
    }

    /// Sparse slot of this statistic
    pub const fn slot(self) -> usize {
        START_STATS + self.ordinal()
    }

    /// Ngram-mode bit that enables this statistic
    pub const fn mode_bit(self) -> u32 {
        0x8 << self.ordinal()
    }

    /// Key used in JSON feature dumps
    pub const fn name(self) -> &'static str {
        match self {
            Statistic::BigramEntropy => "bigram_entropy",
            Statistic::ItemEntropy => "item_entropy",
            Statistic::HammingWeight => "hamming_weight",
            Statistic::MeanByteValue => "mean_byte_value",
            Statistic::StddevByteValue => "stddev_byte_value",
            Statistic::AbsoluteDeviation => "abs_dev",
            Statistic::Skewness => "skewness",
            Statistic::Kurtosis => "kurtosis",
            Statistic::Contiguity => "contiguity",
            Statistic::MaxByteStreak => "max_byte_streak",
            Statistic::LowAsciiFreq => "lo_ascii_freq",
            Statistic::MedAsciiFreq => "med_ascii_freq",
            Statistic::HighAsciiFreq => "hi_ascii_freq",
            Statistic::ByteValueCorrelation => "byte_val_correlation",
            Statistic::ByteFrequencyCorrelation => "byte_val_freq_correlation",
            Statistic::UnigramChiSquare => "uni_chi_sq",
        }
    }
}
