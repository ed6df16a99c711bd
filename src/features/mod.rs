// Byte and bigram feature extraction
//
// A stream is folded into `ByteStatistics` one slice at a time, then
// finalized once into `FinalizedStatistics`. Everything downstream (override
// rules, sparse vectors, dumps) reads the finalized form.
//
// Key invariant: the finalized numbers depend only on the concatenated
// stream, never on how it was split across `update` calls.

mod accumulator;
mod finalize;
pub mod layout;
mod ngram_mode;

pub use accumulator::{ByteStatistics, ASCII_HIGH_START, ASCII_LOW_LIMIT};
pub use finalize::FinalizedStatistics;
pub use layout::{BigramTable, Statistic, MAX_FEATURE_INDEX};
pub use ngram_mode::NgramMode;

#[cfg(test)]
mod tests;
