use crate::error::{ClassifierError, Result};

use super::accumulator::ByteStatistics;
use super::layout::{BigramTable, Statistic, NUM_BIGRAMS, NUM_STATS, NUM_UNIGRAMS};
use super::ngram_mode::NgramMode;

/// Bits per unigram, used to normalize entropy and hamming weight
const UNIGRAM_BITS: f64 = 8.0;

/// Bits per bigram, used to normalize bigram entropy
const BIGRAM_BITS: f64 = 16.0;

/// Divisor applied to hamming weight, stddev, kurtosis and contiguity after
/// they are computed.
///
/// Trained models depend on this extra scaling even though hamming weight is
/// already in [0, 1]. It looks like a defect upstream of the models; it must
/// not change without retraining.
const LEGACY_SCALE: f64 = 256.0;

/// Normalized statistics for one unit of work
///
/// Produced by [`ByteStatistics::finalize`] or, without reallocating the
/// bigram tables, by [`ByteStatistics::finalize_into`].
#[derive(Clone, PartialEq)]
pub struct FinalizedStatistics {
    mode: NgramMode,
    total: u64,
    unigrams: [f64; NUM_UNIGRAMS],
    bigrams_all: Box<[f64]>,
    bigrams_even: Box<[f64]>,
    bigrams_odd: Box<[f64]>,
    stats: [f64; NUM_STATS],
}

impl FinalizedStatistics {
    /// An all-zero buffer suitable for `finalize_into`
    pub fn zeroed() -> Self {
        Self {
            mode: NgramMode::UNIGRAMS_ONLY,
            total: 0,
            unigrams: [0.0; NUM_UNIGRAMS],
            bigrams_all: vec![0.0; NUM_BIGRAMS].into_boxed_slice(),
            bigrams_even: vec![0.0; NUM_BIGRAMS].into_boxed_slice(),
            bigrams_odd: vec![0.0; NUM_BIGRAMS].into_boxed_slice(),
            stats: [0.0; NUM_STATS],
        }
    }

    /// Mode the source statistics were accumulated under
    pub fn mode(&self) -> NgramMode {
        self.mode
    }

    /// Stream length the statistics were computed over
    pub fn total_bytes(&self) -> u64 {
        self.total
    }

    pub fn unigram(&self, byte: u8) -> f64 {
        self.unigrams[byte as usize]
    }

    pub fn unigram_frequencies(&self) -> &[f64; NUM_UNIGRAMS] {
        &self.unigrams
    }

    /// Normalized pair frequencies of one table, indexed by `(first << 8) | second`
    pub fn bigram_frequencies(&self, table: BigramTable) -> &[f64] {
        match table {
            BigramTable::All => &self.bigrams_all,
            BigramTable::Even => &self.bigrams_even,
            BigramTable::Odd => &self.bigrams_odd,
        }
    }

    pub fn statistic(&self, stat: Statistic) -> f64 {
        self.stats[stat.ordinal()]
    }

    /// Normalized unigram entropy in [0, 1]
    pub fn item_entropy(&self) -> f64 {
        self.statistic(Statistic::ItemEntropy)
    }

    fn table_mut(&mut self, table: BigramTable) -> &mut [f64] {
        match table {
            BigramTable::All => &mut self.bigrams_all,
            BigramTable::Even => &mut self.bigrams_even,
            BigramTable::Odd => &mut self.bigrams_odd,
        }
    }

    fn set(&mut self, stat: Statistic, value: f64) {
        self.stats[stat.ordinal()] = value;
    }
}

impl std::fmt::Debug for FinalizedStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("FinalizedStatistics");
        s.field("mode", &self.mode).field("total", &self.total);
        for stat in Statistic::ALL {
            s.field(stat.name(), &self.statistic(stat));
        }
        s.finish_non_exhaustive()
    }
}

impl ByteStatistics {
    /// Convert the running totals into normalized statistics
    ///
    /// Fails with [`ClassifierError::EmptyInput`] when no bytes were seen.
    pub fn finalize(&self) -> Result<FinalizedStatistics> {
        let mut out = FinalizedStatistics::zeroed();
        self.finalize_into(&mut out)?;
        Ok(out)
    }

    /// Like [`finalize`](Self::finalize) but overwrites an existing buffer
    pub fn finalize_into(&self, out: &mut FinalizedStatistics) -> Result<()> {
        let total = self.total_bytes();
        if total == 0 {
            return Err(ClassifierError::EmptyInput);
        }
        let n = total as f64;

        out.mode = self.mode();
        out.total = total;
        out.stats = [0.0; NUM_STATS];

        // Unigram frequencies and entropy
        let mut item_entropy = 0.0;
        for (freq, &count) in out.unigrams.iter_mut().zip(self.unigram_counts()) {
            *freq = count as f64 / n;
            if *freq > 0.0 {
                item_entropy += *freq * (1.0 / *freq).log2() / UNIGRAM_BITS;
            }
        }
        out.set(Statistic::ItemEntropy, item_entropy);

        // Bigram frequencies; denominators are integer-divided stream lengths
        for table in BigramTable::ALL {
            let counts = self.bigram_counts(table);
            let denominator = total / table.length_divisor();
            let freqs = out.table_mut(table);
            if denominator == 0 || !self.mode().bigram_enabled(table) {
                freqs.fill(0.0);
                continue;
            }
            let denominator = denominator as f64;
            for (freq, &count) in freqs.iter_mut().zip(counts) {
                *freq = count as f64 / denominator;
            }
        }

        let bigram_entropy: f64 = out
            .bigrams_all
            .iter()
            .filter(|p| **p > 0.0)
            .map(|p| p * (1.0 / p).log2() / BIGRAM_BITS)
            .sum();
        out.set(Statistic::BigramEntropy, bigram_entropy);

        // Moments of the byte-value distribution
        let mean = self.byte_sum() as f64 / n;
        let variance = (self.byte_square_sum() as f64 / n - mean * mean).max(0.0);
        let stddev = variance.sqrt();

        let mut abs_dev = 0.0;
        let mut third = 0.0;
        let mut fourth = 0.0;
        for (value, &count) in self.unigram_counts().iter().enumerate() {
            if count == 0 {
                continue;
            }
            let deviation = value as f64 - mean;
            let p = count as f64 / n;
            abs_dev += count as f64 * deviation.abs();
            third += p * deviation.powi(3);
            fourth += p * deviation.powi(4);
        }
        let (skewness, kurtosis) = if variance > 0.0 {
            (third / (variance * stddev), fourth / (variance * variance))
        } else {
            (0.0, 0.0)
        };

        out.set(
            Statistic::HammingWeight,
            self.hamming_total() as f64 / (n * UNIGRAM_BITS) / LEGACY_SCALE,
        );
        out.set(Statistic::MeanByteValue, mean);
        out.set(Statistic::StddevByteValue, stddev / LEGACY_SCALE);
        out.set(
            Statistic::AbsoluteDeviation,
            abs_dev / n / NUM_UNIGRAMS as f64,
        );
        out.set(Statistic::Skewness, skewness);
        out.set(Statistic::Kurtosis, kurtosis / LEGACY_SCALE);
        out.set(
            Statistic::Contiguity,
            self.contiguity_total() as f64 / n / LEGACY_SCALE,
        );
        out.set(Statistic::MaxByteStreak, self.max_run() as f64 / n);

        let (low, med, high) = self.ascii_bands();
        out.set(Statistic::LowAsciiFreq, low as f64 / n);
        out.set(Statistic::MedAsciiFreq, med as f64 / n);
        out.set(Statistic::HighAsciiFreq, high as f64 / n);

        out.set(Statistic::ByteValueCorrelation, self.adjacent_correlation());
        out.set(
            Statistic::ByteFrequencyCorrelation,
            frequency_correlation(&out.unigrams),
        );
        out.set(Statistic::UnigramChiSquare, self.chi_square());

        Ok(())
    }

    /// Pearson correlation between each byte and its successor
    fn adjacent_correlation(&self) -> f64 {
        let pairs = self.total_bytes().saturating_sub(1);
        if pairs < 2 {
            return 0.0;
        }
        let first = f64::from(self.first_byte());
        let last = f64::from(self.last_byte());
        let m = pairs as f64;

        let sum = self.byte_sum() as f64;
        let squares = self.byte_square_sum() as f64;
        let sum_x = sum - last;
        let sum_y = sum - first;
        let sum_xx = squares - last * last;
        let sum_yy = squares - first * first;
        let sum_xy = self.product_sum() as f64;

        pearson(m, sum_x, sum_y, sum_xx, sum_yy, sum_xy)
    }

    /// Goodness of fit of the unigram histogram against a uniform distribution
    fn chi_square(&self) -> f64 {
        let expected = self.total_bytes() as f64 / NUM_UNIGRAMS as f64;
        self.unigram_counts()
            .iter()
            .map(|&count| {
                let diff = count as f64 - expected;
                diff * diff / expected
            })
            .sum()
    }
}

/// Pearson correlation between the frequency of byte m and byte m+1
fn frequency_correlation(freqs: &[f64; NUM_UNIGRAMS]) -> f64 {
    let m = (NUM_UNIGRAMS - 1) as f64;
    let (mut sum_x, mut sum_y, mut sum_xx, mut sum_yy, mut sum_xy) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for pair in freqs.windows(2) {
        let (x, y) = (pair[0], pair[1]);
        sum_x += x;
        sum_y += y;
        sum_xx += x * x;
        sum_yy += y * y;
        sum_xy += x * y;
    }
    pearson(m, sum_x, sum_y, sum_xx, sum_yy, sum_xy)
}

fn pearson(m: f64, sum_x: f64, sum_y: f64, sum_xx: f64, sum_yy: f64, sum_xy: f64) -> f64 {
    let numerator = m * sum_xy - sum_x * sum_y;
    let spread = (m * sum_xx - sum_x * sum_x) * (m * sum_yy - sum_y * sum_y);
    if spread > 0.0 {
        numerator / spread.sqrt()
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finalize(mode: NgramMode, data: &[u8]) -> FinalizedStatistics {
        let mut stats = ByteStatistics::new(mode);
        stats.update(data);
        stats.finalize().unwrap()
    }

    #[test]
    fn test_empty_input_rejected() {
        let stats = ByteStatistics::new(NgramMode::DEFAULT);
        assert!(matches!(stats.finalize(), Err(ClassifierError::EmptyInput)));
    }

    #[test]
    fn test_unigram_frequencies_sum_to_one() {
        let fin = finalize(NgramMode::DEFAULT, b"the quick brown fox jumps");
        let sum: f64 = fin.unigram_frequencies().iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_input() {
        let fin = finalize(NgramMode::DEFAULT, &[0x41; 1000]);
        assert_eq!(fin.unigram(0x41), 1.0);
        assert_eq!(fin.item_entropy(), 0.0);
        assert_eq!(fin.statistic(Statistic::StddevByteValue), 0.0);
        assert_eq!(fin.statistic(Statistic::Skewness), 0.0);
        assert_eq!(fin.statistic(Statistic::Kurtosis), 0.0);
        assert_eq!(fin.statistic(Statistic::MeanByteValue), 65.0);
        assert_eq!(fin.statistic(Statistic::MaxByteStreak), 1.0);
        // 999 pairs over a denominator of 500
        let all = fin.bigram_frequencies(BigramTable::All);
        assert!((all[0x4141] - 999.0 / 500.0).abs() < 1e-12);
    }

    #[test]
    fn test_uniform_bytes_have_full_entropy() {
        let data: Vec<u8> = (0..=255u8).cycle().take(1024).collect();
        let fin = finalize(NgramMode::DEFAULT, &data);
        assert!((fin.item_entropy() - 1.0).abs() < 1e-12);
        assert!(fin.statistic(Statistic::UnigramChiSquare).abs() < 1e-9);
    }

    #[test]
    fn test_hamming_weight_scaled() {
        let fin = finalize(NgramMode::DEFAULT, &[0xff; 16]);
        assert!((fin.statistic(Statistic::HammingWeight) - 1.0 / 256.0).abs() < 1e-15);
    }

    #[test]
    fn test_two_values_moments() {
        // 0 and 2 in equal measure: mean 1, variance 1, symmetric
        let fin = finalize(NgramMode::UNIGRAMS_ONLY, &[0, 2, 0, 2]);
        assert_eq!(fin.statistic(Statistic::MeanByteValue), 1.0);
        assert!((fin.statistic(Statistic::StddevByteValue) - 1.0 / 256.0).abs() < 1e-15);
        assert!(fin.statistic(Statistic::Skewness).abs() < 1e-12);
        assert!((fin.statistic(Statistic::Kurtosis) - 1.0 / 256.0).abs() < 1e-15);
        assert!((fin.statistic(Statistic::AbsoluteDeviation) - 1.0 / 256.0).abs() < 1e-15);
        assert!((fin.statistic(Statistic::Contiguity) - 6.0 / 4.0 / 256.0).abs() < 1e-15);
    }

    #[test]
    fn test_alternating_bytes_anticorrelated() {
        let fin = finalize(NgramMode::UNIGRAMS_ONLY, &[0, 200, 0, 200, 0, 200]);
        assert!((fin.statistic(Statistic::ByteValueCorrelation) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_small_inputs_leave_bigrams_zero() {
        let mode = NgramMode::BIGRAMS_ALL | NgramMode::BIGRAMS_EVEN | NgramMode::BIGRAMS_ODD;
        let fin = finalize(mode, b"AB");
        // total/4 == 0 for the even and odd tables
        assert!(fin
            .bigram_frequencies(BigramTable::Even)
            .iter()
            .all(|p| *p == 0.0));
        assert_eq!(fin.bigram_frequencies(BigramTable::All)[0x4142], 1.0);
        assert!(fin.statistic(Statistic::BigramEntropy).is_finite());
    }

    #[test]
    fn test_ascii_band_frequencies() {
        let fin = finalize(NgramMode::UNIGRAMS_ONLY, &[0x01, 0x41, 0x41, 0xf0]);
        assert_eq!(fin.statistic(Statistic::LowAsciiFreq), 0.25);
        assert_eq!(fin.statistic(Statistic::MedAsciiFreq), 0.5);
        assert_eq!(fin.statistic(Statistic::HighAsciiFreq), 0.25);
    }

    #[test]
    fn test_finalize_into_overwrites_previous_unit() {
        let mut buf = FinalizedStatistics::zeroed();
        let mut stats = ByteStatistics::new(NgramMode::DEFAULT);
        stats.update(b"first unit with some text");
        stats.finalize_into(&mut buf).unwrap();

        stats.reset();
        stats.update(b"zz");
        stats.finalize_into(&mut buf).unwrap();

        assert_eq!(buf, finalize(NgramMode::DEFAULT, b"zz"));
    }
}
