#![no_main]

use arbitrary::Arbitrary;
use bytesift::features::{ByteStatistics, NgramMode};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input {
    mode: NgramMode,
    split: usize,
    data: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let mut whole = ByteStatistics::new(input.mode);
    whole.update(&input.data);

    let cut = if input.data.is_empty() {
        0
    } else {
        input.split % (input.data.len() + 1)
    };
    let (head, tail) = input.data.split_at(cut);
    let mut split = ByteStatistics::new(input.mode);
    split.update(head);
    split.update(tail);

    assert_eq!(whole, split);
    match (whole.finalize(), split.finalize()) {
        (Ok(a), Ok(b)) => assert_eq!(a, b),
        (Err(_), Err(_)) => assert!(input.data.is_empty()),
        _ => panic!("finalize disagreed between chunkings"),
    }
});
