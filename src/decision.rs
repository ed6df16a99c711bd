//! Short-circuit rules for degenerate inputs
//!
//! Random and near-constant data are recognized from the statistics alone;
//! the model is only consulted when none of the rules fire.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::features::{BigramTable, FinalizedStatistics};
use crate::types::{BCV_CONST, RANDOM, UCV_CONST, UNCLASSIFIED};

/// Thresholds for the override rules, each compared with `>`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionThresholds {
    /// Normalized unigram entropy above which data is called random
    pub randomness: f64,
    /// Single-byte frequency above which data is called constant
    pub unigram_constant: f64,
    /// Adjacent-pair frequency above which data is called a repeated pair
    pub bigram_constant: f64,
}

impl Default for DecisionThresholds {
    fn default() -> Self {
        Self {
            randomness: 0.995,
            unigram_constant: 0.5,
            bigram_constant: 0.5,
        }
    }
}

impl DecisionThresholds {
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("randomness", self.randomness),
            ("unigram_constant", self.unigram_constant),
            ("bigram_constant", self.bigram_constant),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{} threshold must be in [0, 1], got {}", name, value));
            }
        }
        Ok(())
    }
}

/// How one unit of input was classified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Entropy above the randomness threshold
    Random,
    /// One byte value dominates
    UnigramConstant { byte: u8 },
    /// One ordered byte pair dominates
    BigramConstant { first: u8, second: u8 },
    /// Label returned by the model
    Predicted(i32),
    /// Features went to a dump sink instead of the model
    Dumped,
}

impl Decision {
    /// Class code reported to callers
    pub fn code(&self) -> i32 {
        match self {
            Decision::Random => RANDOM,
            Decision::UnigramConstant { .. } => UCV_CONST,
            Decision::BigramConstant { .. } => BCV_CONST,
            Decision::Predicted(code) => *code,
            Decision::Dumped => UNCLASSIFIED,
        }
    }

    /// True when the decision was made without the model
    pub fn is_override(&self) -> bool {
        matches!(
            self,
            Decision::Random | Decision::UnigramConstant { .. } | Decision::BigramConstant { .. }
        )
    }
}

/// Applies the override rules in their fixed order
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DecisionOverride {
    thresholds: DecisionThresholds,
}

impl DecisionOverride {
    pub fn new(thresholds: DecisionThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &DecisionThresholds {
        &self.thresholds
    }

    /// The override that applies to `stats`, if any
    ///
    /// Rules run in order: randomness, then the first byte value (ascending)
    /// over the unigram threshold, then the first pair (row-major) over the
    /// bigram threshold in the all-pairs table.
    pub fn check(&self, stats: &FinalizedStatistics) -> Option<Decision> {
        if stats.item_entropy() > self.thresholds.randomness {
            return Some(Decision::Random);
        }

        if let Some(byte) = stats
            .unigram_frequencies()
            .iter()
            .position(|&p| p > self.thresholds.unigram_constant)
        {
            return Some(Decision::UnigramConstant { byte: byte as u8 });
        }

        stats
            .bigram_frequencies(BigramTable::All)
            .iter()
            .position(|&p| p > self.thresholds.bigram_constant)
            .map(|code| Decision::BigramConstant {
                first: (code >> 8) as u8,
                second: (code & 0xff) as u8,
            })
    }

    /// Apply the overrides, calling `predict` only when none fires
    pub fn decide<F>(&self, stats: &FinalizedStatistics, predict: F) -> Decision
    where
        F: FnOnce() -> i32,
    {
        match self.check(stats) {
            Some(decision) => {
                trace!(?decision, "override rule fired");
                decision
            }
            None => Decision::Predicted(predict()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{ByteStatistics, NgramMode};

    fn finalized(data: &[u8]) -> FinalizedStatistics {
        let mut stats = ByteStatistics::new(NgramMode::DEFAULT);
        stats.update(data);
        stats.finalize().unwrap()
    }

    fn never_called() -> i32 {
        panic!("model must not be consulted")
    }

    #[test]
    fn test_constant_input_is_unigram_constant() {
        let rules = DecisionOverride::default();
        let decision = rules.decide(&finalized(&[0x41; 1000]), never_called);
        assert_eq!(decision, Decision::UnigramConstant { byte: 0x41 });
        assert_eq!(decision.code(), UCV_CONST);
    }

    #[test]
    fn test_near_uniform_input_is_random() {
        let data: Vec<u8> = (0..1000usize).map(|i| ((i * 167) % 256) as u8).collect();
        let fin = finalized(&data);
        assert!(fin.item_entropy() > 0.995);
        let decision = DecisionOverride::default().decide(&fin, never_called);
        assert_eq!(decision, Decision::Random);
        assert_eq!(decision.code(), RANDOM);
    }

    #[test]
    fn test_alternating_pair_is_bigram_constant() {
        let data: Vec<u8> = b"AB".iter().copied().cycle().take(1000).collect();
        let decision = DecisionOverride::default().decide(&finalized(&data), never_called);
        assert_eq!(
            decision,
            Decision::BigramConstant {
                first: b'A',
                second: b'B'
            }
        );
        assert_eq!(decision.code(), BCV_CONST);
    }

    #[test]
    fn test_first_byte_wins_unigram_ties() {
        // Both bytes sit above a lowered threshold; the lower value wins
        let rules = DecisionOverride::new(DecisionThresholds {
            unigram_constant: 0.3,
            ..DecisionThresholds::default()
        });
        let decision = rules.decide(&finalized(b"zzzzaaaa"), never_called);
        assert_eq!(decision, Decision::UnigramConstant { byte: b'a' });
    }

    #[test]
    fn test_ordinary_text_reaches_the_model() {
        let text = b"It was the best of times, it was the worst of times.";
        let decision = DecisionOverride::default().decide(&finalized(text), || 1);
        assert_eq!(decision, Decision::Predicted(1));
        assert!(!decision.is_override());
    }

    #[test]
    fn test_threshold_validation() {
        assert!(DecisionThresholds::default().validate().is_ok());
        let bad = DecisionThresholds {
            randomness: 1.5,
            ..DecisionThresholds::default()
        };
        assert!(bad.validate().is_err());
    }
}
