//! Driving a session over a whole input
//!
//! Container mode classifies the input as one unit. Block mode classifies
//! each full `block_size` block separately; a trailing partial block is
//! dropped.

use std::io::Read;

use tracing::{debug, trace};

use crate::config::{ClassifierConfig, DEFAULT_BLOCK_SIZE};
use crate::error::{ClassifierError, Result};
use crate::input::{read_full, read_retrying};
use crate::session::ClassificationSession;

/// How an input is split into units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Bytes per unit in block mode; also the size of an omitted first block
    pub block_size: usize,
    /// Classify every block instead of the whole input
    pub per_block: bool,
    /// Skip the first `block_size` bytes
    pub omit_first_block: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            per_block: false,
            omit_first_block: false,
        }
    }
}

impl ScanOptions {
    pub fn container() -> Self {
        Self::default()
    }

    pub fn blocks(block_size: usize) -> Self {
        Self {
            block_size,
            per_block: true,
            omit_first_block: false,
        }
    }

    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self {
            block_size: config.block_size,
            ..Self::default()
        }
    }
}

/// One classified unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanRecord {
    /// Byte offset of the unit within the input
    pub offset: u64,
    pub length: u64,
    pub code: i32,
}

/// Classify `reader` and collect the records
pub fn scan<R: Read>(
    session: &mut ClassificationSession,
    reader: R,
    options: ScanOptions,
) -> Result<Vec<ScanRecord>> {
    let mut records = Vec::new();
    scan_with(session, reader, options, |record| {
        records.push(*record);
        Ok(())
    })?;
    Ok(records)
}

/// Classify `reader`, handing each record to `on_record` as soon as it exists
///
/// Anything the session had accumulated before the call is discarded.
pub fn scan_with<R, F>(
    session: &mut ClassificationSession,
    mut reader: R,
    options: ScanOptions,
    mut on_record: F,
) -> Result<()>
where
    R: Read,
    F: FnMut(&ScanRecord) -> Result<()>,
{
    if options.block_size == 0 {
        return Err(ClassifierError::Config("block_size must be > 0".to_string()));
    }
    session.clear();

    let mut block = vec![0u8; options.block_size];
    let mut offset = 0u64;

    if options.omit_first_block {
        let skipped = read_full(&mut reader, &mut block)?;
        offset += skipped as u64;
        trace!(skipped, "omitted first block");
        if skipped < options.block_size {
            return Ok(());
        }
    }

    if options.per_block {
        loop {
            let n = read_full(&mut reader, &mut block)?;
            if n < options.block_size {
                if n > 0 {
                    trace!(offset, n, "dropping partial trailing block");
                }
                break;
            }
            session.update(&block);
            let code = session.classify()?;
            on_record(&ScanRecord {
                offset,
                length: n as u64,
                code,
            })?;
            offset += n as u64;
        }
        session.clear();
        return Ok(());
    }

    let start = offset;
    loop {
        let n = match read_retrying(&mut reader, &mut block) {
            Ok(n) => n,
            Err(e) => {
                session.clear();
                return Err(e.into());
            }
        };
        if n == 0 {
            break;
        }
        session.update(&block[..n]);
        offset += n as u64;
    }

    let length = offset - start;
    if length == 0 {
        debug!("empty input, nothing to classify");
        return Ok(());
    }
    let code = session.classify()?;
    on_record(&ScanRecord {
        offset: start,
        length,
        code,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::NgramMode;
    use crate::model::{LinearClassifier, ModelSource};
    use crate::session::SessionOptions;
    use crate::types::{BCV_CONST, RANDOM, UCV_CONST};
    use crate::vector::SparseVector;
    use std::sync::Arc;

    struct AlwaysText;

    impl LinearClassifier for AlwaysText {
        fn feature_count(&self) -> usize {
            256
        }
        fn bias(&self) -> f64 {
            -1.0
        }
        fn class_labels(&self) -> &[i32] {
            &[1]
        }
        fn weight_columns(&self) -> usize {
            1
        }
        fn weights(&self) -> &[f64] {
            &[]
        }
        fn predict(&self, _vector: &SparseVector) -> i32 {
            1
        }
    }

    fn session() -> ClassificationSession {
        ClassificationSession::open(
            ModelSource::Loaded(Arc::new(AlwaysText)),
            SessionOptions::default().with_ngram_mode(NgramMode::DEFAULT),
        )
        .unwrap()
    }

    fn mixed_input() -> Vec<u8> {
        let mut data = vec![0x00u8; 512];
        data.extend(b"AB".iter().copied().cycle().take(512));
        data.extend((0..512usize).map(|i| ((i * 167) % 256) as u8));
        data
    }

    #[test]
    fn test_block_mode_one_record_per_block() {
        let records = scan(&mut session(), mixed_input().as_slice(), ScanOptions::blocks(512)).unwrap();
        assert_eq!(
            records.iter().map(|r| r.offset).collect::<Vec<_>>(),
            vec![0, 512, 1024]
        );
        assert_eq!(records[0].code, UCV_CONST);
        assert_eq!(records[1].code, BCV_CONST);
        assert!(records.iter().all(|r| r.length == 512));
    }

    #[test]
    fn test_partial_trailing_block_dropped() {
        let mut data = mixed_input();
        data.extend_from_slice(&[0x41; 100]);
        let records = scan(&mut session(), data.as_slice(), ScanOptions::blocks(512)).unwrap();
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn test_omit_first_block_shifts_offsets() {
        let options = ScanOptions {
            omit_first_block: true,
            ..ScanOptions::blocks(512)
        };
        let records = scan(&mut session(), mixed_input().as_slice(), options).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].offset, 512);
        assert_eq!(records[0].code, BCV_CONST);
    }

    #[test]
    fn test_container_mode_single_record() {
        let data = vec![0x7fu8; 3000];
        let records = scan(&mut session(), data.as_slice(), ScanOptions::container()).unwrap();
        assert_eq!(
            records,
            vec![ScanRecord {
                offset: 0,
                length: 3000,
                code: UCV_CONST
            }]
        );
    }

    #[test]
    fn test_container_mode_omit_first_block() {
        let mut data = vec![0x00u8; 512];
        data.extend((0..4096usize).map(|i| ((i * 167) % 256) as u8));
        let options = ScanOptions {
            omit_first_block: true,
            ..ScanOptions::container()
        };
        let records = scan(&mut session(), data.as_slice(), options).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].offset, 512);
        assert_eq!(records[0].length, 4096);
        assert_eq!(records[0].code, RANDOM);
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        let empty: &[u8] = &[];
        assert!(scan(&mut session(), empty, ScanOptions::container())
            .unwrap()
            .is_empty());
        assert!(scan(&mut session(), empty, ScanOptions::blocks(512))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_zero_block_size_rejected() {
        let options = ScanOptions {
            block_size: 0,
            ..ScanOptions::default()
        };
        assert!(scan(&mut session(), &b"abc"[..], options).is_err());
    }
}
