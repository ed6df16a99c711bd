//! Feature masks: which sparse slots the classifier sees
//!
//! A mask is one flag per slot of the sparse index space. On disk it is a flat
//! run of ASCII `'0'`/`'1'` characters, one per slot in ascending order, so a
//! mask produced by one tool can be inspected or edited with anything that
//! handles text.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{ClassifierError, Result};
use crate::features::layout::{BigramTable, Statistic, NUM_BIGRAMS, NUM_UNIGRAMS, START_UNIGRAMS};
use crate::features::{NgramMode, MAX_FEATURE_INDEX};
use crate::model::LinearClassifier;

/// Boolean selector over every sparse feature slot
#[derive(Clone, PartialEq, Eq)]
pub struct FeatureMask {
    slots: Box<[bool]>,
}

/// Outcome of a successful feature reduction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReductionSummary {
    /// Features kept per class before the union
    pub top_n: usize,
    /// Enabled features before reduction (the model's feature count)
    pub before: usize,
    /// Enabled features after reduction
    pub after: usize,
}

impl ReductionSummary {
    pub fn rate(&self) -> f64 {
        self.after as f64 / self.before as f64
    }
}

impl FeatureMask {
    /// A mask with every slot disabled
    pub fn empty() -> Self {
        Self {
            slots: vec![false; MAX_FEATURE_INDEX].into_boxed_slice(),
        }
    }

    /// Default mask for an ngram mode
    pub fn for_mode(mode: NgramMode) -> Self {
        let mut mask = Self::empty();
        mask.initialize(mode);
        mask
    }

    /// Reset to the default slots for `mode`: all unigrams, every enabled
    /// bigram table and every enabled statistic
    pub fn initialize(&mut self, mode: NgramMode) {
        self.slots.fill(false);
        self.slots[START_UNIGRAMS..START_UNIGRAMS + NUM_UNIGRAMS].fill(true);
        for table in BigramTable::ALL {
            if mode.bigram_enabled(table) {
                self.slots[table.start()..table.start() + NUM_BIGRAMS].fill(true);
            }
        }
        for stat in Statistic::ALL {
            if mode.statistic_enabled(stat) {
                self.slots[stat.slot()] = true;
            }
        }
    }

    #[inline]
    pub fn is_enabled(&self, slot: usize) -> bool {
        self.slots.get(slot).copied().unwrap_or(false)
    }

    /// Enable or disable one slot; slot 0 and out-of-range slots are ignored
    pub fn set(&mut self, slot: usize, enabled: bool) {
        if slot > 0 && slot < MAX_FEATURE_INDEX {
            self.slots[slot] = enabled;
        }
    }

    pub fn enabled_count(&self) -> usize {
        self.slots.iter().filter(|s| **s).count()
    }

    /// Enabled slots in ascending order
    pub fn enabled_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, enabled)| enabled.then_some(slot))
    }

    /// Parse the on-disk representation
    ///
    /// Only the first `MAX_FEATURE_INDEX` bytes are significant; anything
    /// after them (a trailing newline, say) is ignored.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MAX_FEATURE_INDEX {
            return Err(ClassifierError::InvalidMask(format!(
                "expected {} slots, found {}",
                MAX_FEATURE_INDEX,
                bytes.len()
            )));
        }
        let mut mask = Self::empty();
        for (slot, byte) in bytes[..MAX_FEATURE_INDEX].iter().enumerate() {
            match byte {
                b'0' => {}
                b'1' if slot == 0 => {
                    return Err(ClassifierError::InvalidMask(
                        "slot 0 is reserved and must be '0'".to_string(),
                    ))
                }
                b'1' => mask.slots[slot] = true,
                other => {
                    return Err(ClassifierError::InvalidMask(format!(
                        "unexpected byte {:#04x} at slot {}",
                        other, slot
                    )))
                }
            }
        }
        Ok(mask)
    }

    /// On-disk representation
    pub fn to_bytes(&self) -> Vec<u8> {
        self.slots
            .iter()
            .map(|enabled| if *enabled { b'1' } else { b'0' })
            .collect()
    }

    /// Read a mask file without checking it against a model
    pub fn read_from(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = fs::read(path.as_ref())?;
        Self::parse(&bytes)
    }

    /// Read a mask file whose enabled count must equal `expected_features`
    pub fn load(path: impl AsRef<Path>, expected_features: usize) -> Result<Self> {
        let mask = Self::read_from(path.as_ref())?;
        let enabled = mask.enabled_count();
        if enabled != expected_features {
            return Err(ClassifierError::MaskMismatch {
                enabled,
                expected: expected_features,
            });
        }
        debug!(
            path = %path.as_ref().display(),
            enabled,
            "loaded feature mask"
        );
        Ok(mask)
    }

    /// Write the mask to `path`
    pub fn dump(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path.as_ref(), self.to_bytes())?;
        debug!(path = %path.as_ref().display(), "wrote feature mask");
        Ok(())
    }

    /// Keep, for every weight column, the `top_n` features with the largest
    /// absolute weight, and return the union as a new mask
    ///
    /// The k-th enabled slot of `self` is the model's feature k, so the mask
    /// must enable exactly `model.feature_count()` slots. Weights are laid out
    /// `w[feature * columns + column]`. Ties keep the lower feature first.
    pub fn reduce(
        &self,
        model: &dyn LinearClassifier,
        top_n: usize,
    ) -> Result<(FeatureMask, ReductionSummary)> {
        let n_feature = model.feature_count();
        if top_n == 0 || top_n >= n_feature {
            return Err(ClassifierError::InvalidReduction(format!(
                "top_n must be in 1..{}, got {}",
                n_feature, top_n
            )));
        }
        let enabled = self.enabled_count();
        if enabled != n_feature {
            return Err(ClassifierError::MaskMismatch {
                enabled,
                expected: n_feature,
            });
        }

        let columns = model.weight_columns();
        let weights = model.weights();
        if weights.len() < n_feature * columns {
            return Err(ClassifierError::InvalidReduction(format!(
                "model has {} weights, expected at least {}",
                weights.len(),
                n_feature * columns
            )));
        }

        let mut selected = vec![false; n_feature];
        let mut ranked: Vec<(usize, f64)> = Vec::with_capacity(n_feature);
        for column in 0..columns {
            ranked.clear();
            ranked.extend((0..n_feature).map(|f| (f, weights[f * columns + column].abs())));
            ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
            for (feature, _) in ranked.iter().take(top_n) {
                selected[*feature] = true;
            }
        }

        let mut reduced = FeatureMask::empty();
        for (local, slot) in self.enabled_slots().enumerate() {
            if selected[local] {
                reduced.slots[slot] = true;
            }
        }

        let summary = ReductionSummary {
            top_n,
            before: n_feature,
            after: reduced.enabled_count(),
        };
        if summary.after == n_feature {
            return Err(ClassifierError::FeatureReductionNoop { requested: top_n });
        }
        info!(
            top_n,
            before = summary.before,
            after = summary.after,
            rate = summary.rate(),
            "feature reduction"
        );
        Ok((reduced, summary))
    }
}

impl Default for FeatureMask {
    fn default() -> Self {
        Self::for_mode(NgramMode::default())
    }
}

impl std::fmt::Debug for FeatureMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureMask")
            .field("enabled", &self.enabled_count())
            .finish()
    }
}
