// Cross-cutting tests for accumulation + finalization
//
// The per-file unit tests cover individual totals; these exercise the
// properties the classifier relies on end to end.

use super::*;
use proptest::prelude::*;

fn every_table() -> NgramMode {
    NgramMode::from_bits(0x7FFFF)
}

fn finalize_chunks(mode: NgramMode, chunks: &[&[u8]]) -> FinalizedStatistics {
    let mut stats = ByteStatistics::new(mode);
    for chunk in chunks {
        stats.update(chunk);
    }
    stats.finalize().unwrap()
}

#[test]
fn test_split_stream_matches_whole_stream() {
    let split = finalize_chunks(every_table(), &[&b"AB"[..], &b"CD"[..]]);
    let whole = finalize_chunks(every_table(), &[&b"ABCD"[..]]);
    assert_eq!(split, whole);
}

#[test]
fn test_single_byte_chunks_match_whole_stream() {
    let text = b"Lorem ipsum dolor sit amet, consectetur adipiscing elit.";
    let chunks: Vec<&[u8]> = text.chunks(1).collect();
    assert_eq!(
        finalize_chunks(every_table(), &chunks),
        finalize_chunks(every_table(), &[&text[..]])
    );
}

#[test]
fn test_empty_chunks_are_ignored() {
    let chunks: [&[u8]; 5] = [b"", b"xy", b"", b"z", b""];
    let split = finalize_chunks(every_table(), &chunks);
    let whole = finalize_chunks(every_table(), &[&b"xyz"[..]]);
    assert_eq!(split, whole);
}

#[test]
fn test_disabled_tables_stay_empty() {
    let fin = finalize_chunks(NgramMode::BIGRAMS_EVEN, &[&b"abcdefgh"[..]]);
    assert!(fin
        .bigram_frequencies(BigramTable::All)
        .iter()
        .all(|p| *p == 0.0));
    assert!(fin
        .bigram_frequencies(BigramTable::Odd)
        .iter()
        .all(|p| *p == 0.0));
    assert!(fin
        .bigram_frequencies(BigramTable::Even)
        .iter()
        .any(|p| *p > 0.0));
}

#[test]
fn test_statistics_are_finite_for_tiny_inputs() {
    for len in 1..8usize {
        let data: Vec<u8> = (0..len as u8).collect();
        let fin = finalize_chunks(every_table(), &[data.as_slice()]);
        for stat in Statistic::ALL {
            assert!(
                fin.statistic(stat).is_finite(),
                "{} not finite for len {}",
                stat.name(),
                len
            );
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_chunking_never_changes_statistics(
        data in prop::collection::vec(any::<u8>(), 1..512),
        cut_a in 0usize..512,
        cut_b in 0usize..512,
    ) {
        let mut cuts = [cut_a.min(data.len()), cut_b.min(data.len())];
        cuts.sort_unstable();
        let (head, rest) = data.split_at(cuts[0]);
        let (mid, tail) = rest.split_at(cuts[1] - cuts[0]);

        let split = finalize_chunks(every_table(), &[head, mid, tail]);
        let whole = finalize_chunks(every_table(), &[data.as_slice()]);
        prop_assert_eq!(split, whole);
    }

    #[test]
    fn prop_unigram_frequencies_sum_to_one(
        data in prop::collection::vec(any::<u8>(), 1..2048),
    ) {
        let fin = finalize_chunks(NgramMode::DEFAULT, &[data.as_slice()]);
        let sum: f64 = fin.unigram_frequencies().iter().sum();
        prop_assert!((sum - 1.0).abs() < 1e-9);
        prop_assert!(fin.item_entropy() >= 0.0 && fin.item_entropy() <= 1.0 + 1e-12);
    }
}
