//! Feature dumps for building training sets
//!
//! In dump mode a session writes each unit's features to a sink instead of
//! asking the model, either as one JSON object per line or as one line of
//! liblinear sparse training data.

use std::collections::BTreeMap;
use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::features::{BigramTable, FinalizedStatistics, Statistic};
use crate::mask::FeatureMask;
use crate::vector::{build_into, SparseVector};

/// Version tag carried by every JSON dump
pub const DUMP_VERSION: f64 = 1.0;

/// One classified unit as JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonFeatureDump {
    /// Class code the unit is labelled with
    pub file_type: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Non-zero unigram frequencies keyed by byte value
    pub unigrams: BTreeMap<u32, f64>,
    /// Non-zero all-pairs bigram frequencies keyed by `(first << 8) | second`
    pub bigrams: BTreeMap<u32, f64>,
    pub bigram_entropy: f64,
    pub item_entropy: f64,
    pub hamming_weight: f64,
    pub mean_byte_value: f64,
    pub stddev_byte_value: f64,
    pub abs_dev: f64,
    pub skewness: f64,
    pub kurtosis: f64,
    pub contiguity: f64,
    pub max_byte_streak: f64,
    pub lo_ascii_freq: f64,
    pub med_ascii_freq: f64,
    pub hi_ascii_freq: f64,
    pub byte_val_correlation: f64,
    pub byte_val_freq_correlation: f64,
    pub uni_chi_sq: f64,
    pub version: f64,
}

fn nonzero(freqs: &[f64]) -> BTreeMap<u32, f64> {
    freqs
        .iter()
        .enumerate()
        .filter(|(_, p)| **p != 0.0)
        .map(|(key, p)| (key as u32, *p))
        .collect()
}

impl JsonFeatureDump {
    pub fn new(stats: &FinalizedStatistics, file_type: i32, file_name: Option<&str>) -> Self {
        let stat = |s: Statistic| stats.statistic(s);
        Self {
            file_type,
            file_name: file_name.map(str::to_string),
            unigrams: nonzero(stats.unigram_frequencies()),
            bigrams: nonzero(stats.bigram_frequencies(BigramTable::All)),
            bigram_entropy: stat(Statistic::BigramEntropy),
            item_entropy: stat(Statistic::ItemEntropy),
            hamming_weight: stat(Statistic::HammingWeight),
            mean_byte_value: stat(Statistic::MeanByteValue),
            stddev_byte_value: stat(Statistic::StddevByteValue),
            abs_dev: stat(Statistic::AbsoluteDeviation),
            skewness: stat(Statistic::Skewness),
            kurtosis: stat(Statistic::Kurtosis),
            contiguity: stat(Statistic::Contiguity),
            max_byte_streak: stat(Statistic::MaxByteStreak),
            lo_ascii_freq: stat(Statistic::LowAsciiFreq),
            med_ascii_freq: stat(Statistic::MedAsciiFreq),
            hi_ascii_freq: stat(Statistic::HighAsciiFreq),
            byte_val_correlation: stat(Statistic::ByteValueCorrelation),
            byte_val_freq_correlation: stat(Statistic::ByteFrequencyCorrelation),
            uni_chi_sq: stat(Statistic::UnigramChiSquare),
            version: DUMP_VERSION,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpFormat {
    /// One JSON object per line
    Json,
    /// One liblinear training line per unit
    Nodes,
}

/// Destination for feature dumps
pub struct DumpSink {
    format: DumpFormat,
    label: i32,
    writer: Box<dyn Write + Send>,
}

impl DumpSink {
    pub fn new(format: DumpFormat, label: i32, writer: Box<dyn Write + Send>) -> Self {
        Self {
            format,
            label,
            writer,
        }
    }

    /// Write one unit
    ///
    /// Node dumps go through the mask and never carry a bias node. `scratch`
    /// is reused for the sparse vector.
    pub fn write_unit(
        &mut self,
        stats: &FinalizedStatistics,
        mask: &FeatureMask,
        scratch: &mut SparseVector,
        file_name: Option<&str>,
    ) -> Result<()> {
        match self.format {
            DumpFormat::Json => {
                let dump = JsonFeatureDump::new(stats, self.label, file_name);
                serde_json::to_writer(&mut self.writer, &dump)?;
                writeln!(self.writer)?;
            }
            DumpFormat::Nodes => {
                build_into(scratch, stats, mask, None);
                writeln!(self.writer, "{}", scratch.to_training_line(self.label))?;
            }
        }
        self.writer.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for DumpSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DumpSink")
            .field("format", &self.format)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{ByteStatistics, NgramMode};
    use std::sync::{Arc, Mutex};

    /// Writer that keeps its bytes reachable after being boxed
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn finalized(data: &[u8]) -> FinalizedStatistics {
        let mut stats = ByteStatistics::new(NgramMode::DEFAULT);
        stats.update(data);
        stats.finalize().unwrap()
    }

    #[test]
    fn test_json_dump_fields() {
        let dump = JsonFeatureDump::new(&finalized(b"AAB"), 3, Some("sample.txt"));
        let value = serde_json::to_value(&dump).unwrap();

        assert_eq!(value["file_type"], 3);
        assert_eq!(value["file_name"], "sample.txt");
        assert_eq!(value["version"], 1.0);
        assert_eq!(value["unigrams"].as_object().unwrap().len(), 2);
        assert!(value["unigrams"]["65"].as_f64().is_some());
        // AA and AB
        assert!(value["bigrams"]["16705"].as_f64().is_some());
        assert!(value["bigrams"]["16706"].as_f64().is_some());
        assert!(value["uni_chi_sq"].as_f64().is_some());
    }

    #[test]
    fn test_json_dump_omits_missing_name() {
        let dump = JsonFeatureDump::new(&finalized(b"x"), 0, None);
        let text = serde_json::to_string(&dump).unwrap();
        assert!(!text.contains("file_name"));
    }

    #[test]
    fn test_sink_writes_one_line_per_unit() {
        let buf = SharedBuf::default();
        let mut sink = DumpSink::new(DumpFormat::Json, 1, Box::new(buf.clone()));
        let mask = FeatureMask::for_mode(NgramMode::DEFAULT);
        let mut scratch = SparseVector::new();

        sink.write_unit(&finalized(b"one"), &mask, &mut scratch, None)
            .unwrap();
        sink.write_unit(&finalized(b"two"), &mask, &mut scratch, None)
            .unwrap();

        let text = buf.text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let parsed: JsonFeatureDump = serde_json::from_str(line).unwrap();
            assert_eq!(parsed.file_type, 1);
        }
    }

    #[test]
    fn test_node_dump_line() {
        let buf = SharedBuf::default();
        let mut sink = DumpSink::new(DumpFormat::Nodes, 12, Box::new(buf.clone()));
        let mask = FeatureMask::for_mode(NgramMode::UNIGRAMS_ONLY);
        let mut scratch = SparseVector::new();
        let mut stats = ByteStatistics::new(NgramMode::UNIGRAMS_ONLY);
        stats.update(b"AB");

        sink.write_unit(&stats.finalize().unwrap(), &mask, &mut scratch, None)
            .unwrap();
        assert_eq!(buf.text(), "12 66:0.5 67:0.5\n");
    }
}
