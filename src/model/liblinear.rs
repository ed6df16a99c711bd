//! liblinear plain-text model files
//!
//! ```text
//! solver_type L2R_LR
//! nr_class 3
//! label 1 2 3
//! nr_feature 256
//! bias -1
//! w
//! 0.12 -0.5 0.03
//! ...
//! ```
//!
//! After the `w` line come `nr_feature` rows (one more when `bias >= 0`),
//! each holding one weight per column.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use tracing::debug;

use super::LinearClassifier;
use crate::error::{ClassifierError, Result};
use crate::vector::SparseVector;

/// The one multi-class solver that keeps a weight column per class even
/// with two classes
const CRAMMER_SINGER: &str = "MCSVM_CS";

/// Upper bound on weights reserved before any weight line is read
const MAX_WEIGHT_PREALLOC: usize = 1 << 20;

/// A linear model read from a liblinear model file
#[derive(Debug, Clone, PartialEq)]
pub struct LiblinearModel {
    solver_type: String,
    labels: Vec<i32>,
    nr_feature: usize,
    bias: f64,
    columns: usize,
    w: Vec<f64>,
}

fn weight_columns_for(solver_type: &str, nr_class: usize) -> usize {
    if nr_class == 2 && solver_type != CRAMMER_SINGER {
        1
    } else {
        nr_class
    }
}

/// Weight rows and the total weight count, or `ModelLoad` when the header
/// describes a model too large to address
fn weight_shape(nr_feature: usize, bias: f64, columns: usize) -> Result<(usize, usize)> {
    let too_large = || {
        ClassifierError::ModelLoad(format!(
            "nr_feature {} with {} weight columns is too large",
            nr_feature, columns
        ))
    };
    let rows = nr_feature
        .checked_add(usize::from(bias >= 0.0))
        .ok_or_else(too_large)?;
    let total = rows.checked_mul(columns).ok_or_else(too_large)?;
    Ok((rows, total))
}

fn read_error(e: std::io::Error) -> ClassifierError {
    ClassifierError::ModelLoad(format!("cannot read model: {}", e))
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ClassifierError::ModelLoad(format!("invalid {} value '{}'", key, value.trim())))
}

impl LiblinearModel {
    /// Build a model from its parts, checking the weight count
    pub fn new(
        solver_type: impl Into<String>,
        labels: Vec<i32>,
        nr_feature: usize,
        bias: f64,
        w: Vec<f64>,
    ) -> Result<Self> {
        let solver_type = solver_type.into();
        if labels.is_empty() {
            return Err(ClassifierError::ModelLoad("model has no class labels".to_string()));
        }
        let columns = weight_columns_for(&solver_type, labels.len());
        let (rows, expected) = weight_shape(nr_feature, bias, columns)?;
        if w.len() != expected {
            return Err(ClassifierError::ModelLoad(format!(
                "expected {} weights ({} rows x {} columns), found {}",
                expected,
                rows,
                columns,
                w.len()
            )));
        }
        Ok(Self {
            solver_type,
            labels,
            nr_feature,
            bias,
            columns,
            w,
        })
    }

    /// Load a model file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            ClassifierError::ModelLoad(format!("cannot open {}: {}", path.display(), e))
        })?;
        let model = Self::from_reader(BufReader::new(file))?;
        debug!(
            path = %path.display(),
            solver = %model.solver_type,
            classes = model.labels.len(),
            features = model.nr_feature,
            "loaded liblinear model"
        );
        Ok(model)
    }

    /// Parse a model from any buffered reader
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut lines = reader.lines();

        let mut solver_type: Option<String> = None;
        let mut nr_class: Option<usize> = None;
        let mut labels: Option<Vec<i32>> = None;
        let mut nr_feature: Option<usize> = None;
        let mut bias: Option<f64> = None;
        let mut saw_weights = false;

        for line in lines.by_ref() {
            let line = line.map_err(read_error)?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line == "w" {
                saw_weights = true;
                break;
            }
            let (key, value) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
            match key {
                "solver_type" => solver_type = Some(value.trim().to_string()),
                "nr_class" => nr_class = Some(parse_value(key, value)?),
                "label" => {
                    let parsed = value
                        .split_whitespace()
                        .map(|v| parse_value(key, v))
                        .collect::<Result<Vec<i32>>>()?;
                    labels = Some(parsed);
                }
                "nr_feature" => nr_feature = Some(parse_value(key, value)?),
                "bias" => bias = Some(parse_value(key, value)?),
                other => {
                    return Err(ClassifierError::ModelLoad(format!(
                        "unknown header key '{}'",
                        other
                    )))
                }
            }
        }

        let missing = |key: &str| ClassifierError::ModelLoad(format!("missing '{}' header", key));
        if !saw_weights {
            return Err(missing("w"));
        }
        let solver_type = solver_type.ok_or_else(|| missing("solver_type"))?;
        let nr_class = nr_class.ok_or_else(|| missing("nr_class"))?;
        let labels = labels.ok_or_else(|| missing("label"))?;
        let nr_feature = nr_feature.ok_or_else(|| missing("nr_feature"))?;
        let bias = bias.ok_or_else(|| missing("bias"))?;

        if labels.len() != nr_class {
            return Err(ClassifierError::ModelLoad(format!(
                "nr_class is {} but {} labels are listed",
                nr_class,
                labels.len()
            )));
        }

        let columns = weight_columns_for(&solver_type, nr_class);
        let (_, expected) = weight_shape(nr_feature, bias, columns)?;
        let mut w = Vec::with_capacity(expected.min(MAX_WEIGHT_PREALLOC));
        for line in lines {
            let line = line.map_err(read_error)?;
            for token in line.split_whitespace() {
                if w.len() == expected {
                    return Err(ClassifierError::ModelLoad(format!(
                        "more than the expected {} weights",
                        expected
                    )));
                }
                w.push(parse_value::<f64>("weight", token)?);
            }
        }

        Self::new(solver_type, labels, nr_feature, bias, w)
    }

    /// Write the model in liblinear's text format
    pub fn write_to<W: Write>(&self, mut out: W) -> Result<()> {
        writeln!(out, "solver_type {}", self.solver_type)?;
        writeln!(out, "nr_class {}", self.labels.len())?;
        let labels: Vec<String> = self.labels.iter().map(|l| l.to_string()).collect();
        writeln!(out, "label {}", labels.join(" "))?;
        writeln!(out, "nr_feature {}", self.nr_feature)?;
        writeln!(out, "bias {}", self.bias)?;
        writeln!(out, "w")?;
        for row in self.w.chunks(self.columns) {
            let row: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            writeln!(out, "{}", row.join(" "))?;
        }
        Ok(())
    }

    pub fn solver_type(&self) -> &str {
        &self.solver_type
    }

    /// Per-column decision values for a vector
    pub fn decision_values(&self, vector: &SparseVector) -> Vec<f64> {
        let limit = self.nr_feature + usize::from(self.bias >= 0.0);
        let mut dec = vec![0.0; self.columns];
        for node in vector.features() {
            let index = node.index as usize;
            if node.index <= 0 || index > limit {
                continue;
            }
            let row = &self.w[(index - 1) * self.columns..index * self.columns];
            for (d, weight) in dec.iter_mut().zip(row) {
                *d += weight * node.value;
            }
        }
        dec
    }
}

impl LinearClassifier for LiblinearModel {
    fn feature_count(&self) -> usize {
        self.nr_feature
    }

    fn bias(&self) -> f64 {
        self.bias
    }

    fn class_labels(&self) -> &[i32] {
        &self.labels
    }

    fn weight_columns(&self) -> usize {
        self.columns
    }

    fn weights(&self) -> &[f64] {
        &self.w
    }

    fn predict(&self, vector: &SparseVector) -> i32 {
        let dec = self.decision_values(vector);
        if self.labels.len() == 2 && self.columns == 1 {
            return if dec[0] > 0.0 {
                self.labels[0]
            } else {
                self.labels[1]
            };
        }
        let mut best = 0;
        for (i, value) in dec.iter().enumerate().skip(1) {
            if *value > dec[best] {
                best = i;
            }
        }
        self.labels[best]
    }
}
