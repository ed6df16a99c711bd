// Shared fixtures for integration tests
//
// The fixture model is a two-class unigram model: printable ASCII pushes
// towards TEXT, every other byte towards EXE.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use bytesift::model::LiblinearModel;
use rand::{Rng, SeedableRng};

pub const TEXT_CODE: i32 = 1;
pub const EXE_CODE: i32 = 49;

pub fn unigram_model() -> LiblinearModel {
    let w: Vec<f64> = (0..=255u8)
        .map(|b| if (0x20..0x7f).contains(&b) || b == b'\n' { 1.0 } else { -1.0 })
        .collect();
    LiblinearModel::new("L2R_LR", vec![TEXT_CODE, EXE_CODE], 256, -1.0, w)
        .expect("fixture model is well formed")
}

/// Write the fixture model to `dir/model` and return its path
pub fn write_unigram_model(dir: &Path) -> PathBuf {
    let path = dir.join("model");
    let file = std::fs::File::create(&path).unwrap();
    unigram_model().write_to(std::io::BufWriter::new(file)).unwrap();
    path
}

pub fn prose(len: usize) -> Vec<u8> {
    b"The quick brown fox jumps over the lazy dog while the cat watches.\n"
        .iter()
        .copied()
        .cycle()
        .take(len)
        .collect()
}

/// High-bit bytes with moderate entropy, so no override rule fires
pub fn binary(len: usize) -> Vec<u8> {
    (0..len).map(|i| 0x80 + (i % 32) as u8).collect()
}

pub fn seeded_random(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen()).collect()
}
