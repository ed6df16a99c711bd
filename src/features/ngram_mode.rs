use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::layout::{BigramTable, Statistic, NUM_BIGRAMS, NUM_UNIGRAMS};

/// Bitmask selecting the active bigram tables and scalar statistics
///
/// Bits 0-2 enable the all/even/odd bigram tables, bits 3-18 enable the
/// statistics in slot order. Unigrams are always on.
///
/// # Example
/// ```
/// use bytesift::features::NgramMode;
///
/// let mode: NgramMode = "0x3".parse().unwrap();
/// assert!(mode.contains(NgramMode::BIGRAMS_ALL));
/// assert!(mode.contains(NgramMode::BIGRAMS_EVEN));
/// assert!(!mode.contains(NgramMode::BIGRAMS_ODD));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub struct NgramMode(u32);

impl NgramMode {
    /// Unigrams only
    pub const UNIGRAMS_ONLY: NgramMode = NgramMode(0);
    pub const BIGRAMS_ALL: NgramMode = NgramMode(0x1);
    pub const BIGRAMS_EVEN: NgramMode = NgramMode(0x2);
    pub const BIGRAMS_ODD: NgramMode = NgramMode(0x4);

    /// All-adjacent bigrams plus bigram entropy through high-ASCII frequency
    pub const DEFAULT: NgramMode = NgramMode(0x0FFF9);

    pub const fn from_bits(bits: u32) -> Self {
        NgramMode(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: NgramMode) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn bigram_enabled(self, table: BigramTable) -> bool {
        let bit = match table {
            BigramTable::All => 0x1,
            BigramTable::Even => 0x2,
            BigramTable::Odd => 0x4,
        };
        self.0 & bit != 0
    }

    pub const fn statistic_enabled(self, stat: Statistic) -> bool {
        self.0 & stat.mode_bit() != 0
    }

    /// Number of sparse slots a freshly initialized mask enables for this mode
    pub fn enabled_feature_count(self) -> usize {
        let bigrams = BigramTable::ALL
            .iter()
            .filter(|t| self.bigram_enabled(**t))
            .count();
        let stats = Statistic::ALL
            .iter()
            .filter(|s| self.statistic_enabled(**s))
            .count();
        NUM_UNIGRAMS + bigrams * NUM_BIGRAMS + stats
    }
}

impl Default for NgramMode {
    fn default() -> Self {
        NgramMode::DEFAULT
    }
}

impl BitOr for NgramMode {
    type Output = NgramMode;

    fn bitor(self, rhs: NgramMode) -> NgramMode {
        NgramMode(self.0 | rhs.0)
    }
}

impl fmt::Display for NgramMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#07x}", self.0)
    }
}

impl FromStr for NgramMode {
    type Err = String;

    /// Accepts decimal (`65529`) or hexadecimal (`0xfff9`) notation
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => s.parse::<u32>(),
        };
        parsed
            .map(NgramMode)
            .map_err(|e| format!("invalid ngram mode '{}': {}", s, e))
    }
}
