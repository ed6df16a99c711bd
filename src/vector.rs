//! Sparse feature vectors in the classifier's input format
//!
//! A vector is a run of `(index, value)` nodes with strictly ascending
//! 1-based indices, terminated by a node whose index is -1.

use std::fmt::Write as _;

use crate::features::layout::START_UNIGRAMS;
use crate::features::{BigramTable, FinalizedStatistics, Statistic, MAX_FEATURE_INDEX};
use crate::mask::FeatureMask;
use crate::model::LinearClassifier;

/// Index of the terminating node
pub const SENTINEL_INDEX: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureNode {
    pub index: i32,
    pub value: f64,
}

impl FeatureNode {
    pub const SENTINEL: FeatureNode = FeatureNode {
        index: SENTINEL_INDEX,
        value: 0.0,
    };

    pub fn is_sentinel(&self) -> bool {
        self.index == SENTINEL_INDEX
    }
}

/// Sentinel-terminated list of feature nodes
#[derive(Debug, Clone, PartialEq)]
pub struct SparseVector {
    nodes: Vec<FeatureNode>,
}

impl SparseVector {
    pub fn new() -> Self {
        Self {
            nodes: vec![FeatureNode::SENTINEL],
        }
    }

    /// Build from feature nodes; the sentinel is appended
    pub fn from_nodes(nodes: impl IntoIterator<Item = FeatureNode>) -> Self {
        let mut nodes: Vec<FeatureNode> = nodes.into_iter().collect();
        nodes.push(FeatureNode::SENTINEL);
        Self { nodes }
    }

    /// All nodes including the trailing sentinel
    pub fn nodes(&self) -> &[FeatureNode] {
        &self.nodes
    }

    /// Feature nodes without the sentinel
    pub fn features(&self) -> &[FeatureNode] {
        &self.nodes[..self.nodes.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Format as one line of liblinear training data: `label idx:value ...`
    pub fn to_training_line(&self, label: i32) -> String {
        let mut line = label.to_string();
        for node in self.features() {
            let _ = write!(line, " {}:{}", node.index, node.value);
        }
        line
    }
}

impl Default for SparseVector {
    fn default() -> Self {
        Self::new()
    }
}

/// Trailing constant feature some models are trained with
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiasTerm {
    /// Slot of the bias node (`feature_count + 1`)
    pub index: usize,
    pub value: f64,
}

impl BiasTerm {
    /// The model's bias term, if it has one
    pub fn for_model(model: &dyn LinearClassifier) -> Option<Self> {
        let bias = model.bias();
        (bias >= 0.0).then(|| BiasTerm {
            index: model.feature_count() + 1,
            value: bias,
        })
    }
}

/// Build a fresh vector for `model`
pub fn build_sparse_vector(
    stats: &FinalizedStatistics,
    mask: &FeatureMask,
    model: &dyn LinearClassifier,
) -> SparseVector {
    let mut out = SparseVector::new();
    build_into(&mut out, stats, mask, BiasTerm::for_model(model));
    out
}

/// Rebuild `out` in place from finalized statistics
///
/// Emits, in ascending slot order, every non-zero value whose slot the mask
/// enables: unigrams, then each bigram table the statistics' ngram mode
/// populated, then the enabled scalar statistics. With a bias term, slots at
/// or above the bias index are left out and the bias node goes last.
pub fn build_into(
    out: &mut SparseVector,
    stats: &FinalizedStatistics,
    mask: &FeatureMask,
    bias: Option<BiasTerm>,
) {
    let nodes = &mut out.nodes;
    nodes.clear();

    let limit = bias.map_or(MAX_FEATURE_INDEX, |b| b.index.min(MAX_FEATURE_INDEX));
    let mut emit = |slot: usize, value: f64| {
        if value != 0.0 && slot < limit && mask.is_enabled(slot) {
            nodes.push(FeatureNode {
                index: slot as i32,
                value,
            });
        }
    };

    for (byte, &freq) in stats.unigram_frequencies().iter().enumerate() {
        emit(START_UNIGRAMS + byte, freq);
    }

    let mode = stats.mode();
    for table in BigramTable::ALL {
        if !mode.bigram_enabled(table) {
            continue;
        }
        let start = table.start();
        for (code, &freq) in stats.bigram_frequencies(table).iter().enumerate() {
            emit(start + code, freq);
        }
    }

    for stat in Statistic::ALL {
        if mode.statistic_enabled(stat) {
            emit(stat.slot(), stats.statistic(stat));
        }
    }

    if let Some(bias) = bias {
        nodes.push(FeatureNode {
            index: bias.index as i32,
            value: bias.value,
        });
    }
    nodes.push(FeatureNode::SENTINEL);
}
