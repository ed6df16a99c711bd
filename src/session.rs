//! Classification sessions
//!
//! A session owns everything one caller needs to classify a sequence of
//! inputs: the model handle, the feature mask, the type table and the running
//! byte statistics. Feed bytes with [`ClassificationSession::update`], then
//! call [`ClassificationSession::classify`] once per unit; classification
//! resets the statistics so the session is immediately ready for the next
//! unit.
//!
//! # Example
//! ```no_run
//! use bytesift::model::ModelSource;
//! use bytesift::session::{ClassificationSession, SessionOptions};
//!
//! let mut session =
//!     ClassificationSession::open(ModelSource::Default, SessionOptions::default())?;
//! session.update(b"hello ");
//! session.update(b"world");
//! let code = session.classify()?;
//! println!("{}", session.types().display_name(code));
//! # Ok::<(), bytesift::error::ClassifierError>(())
//! ```

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::{ClassifierConfig, DEFAULT_READ_BUFFER_SIZE};
use crate::decision::{Decision, DecisionOverride, DecisionThresholds};
use crate::dump::{DumpFormat, DumpSink};
use crate::error::{ClassifierError, Result};
use crate::features::{ByteStatistics, FinalizedStatistics, NgramMode};
use crate::input::read_retrying;
use crate::mask::{FeatureMask, ReductionSummary};
use crate::model::{LinearClassifier, ModelHandle, ModelSource};
use crate::types::TypeNameTable;
use crate::vector::{build_into, BiasTerm, SparseVector};

/// Lifecycle of a session between units
///
/// A closed session is one that has been consumed by
/// [`ClassificationSession::close`] or dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No bytes accumulated for the current unit
    Open,
    /// Bytes accumulated, waiting for `classify`
    Updating,
}

/// Everything besides the model that `open` needs
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    /// Class file adding names after the built-in types
    pub class_file: Option<PathBuf>,
    /// Mask file replacing the mode's default mask
    pub mask_file: Option<PathBuf>,
    pub ngram_mode: NgramMode,
    pub thresholds: DecisionThresholds,
    pub read_buffer_size: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            class_file: None,
            mask_file: None,
            ngram_mode: NgramMode::DEFAULT,
            thresholds: DecisionThresholds::default(),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

impl SessionOptions {
    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self {
            ngram_mode: config.ngram_mode,
            thresholds: config.thresholds,
            read_buffer_size: config.read_buffer_size,
            ..Self::default()
        }
    }

    pub fn with_class_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.class_file = Some(path.into());
        self
    }

    pub fn with_mask_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.mask_file = Some(path.into());
        self
    }

    pub fn with_ngram_mode(mut self, mode: NgramMode) -> Self {
        self.ngram_mode = mode;
        self
    }
}

/// Classifies byte streams with one model, one mask and one type table
pub struct ClassificationSession {
    model: ModelHandle,
    model_origin: String,
    types: TypeNameTable,
    mask: FeatureMask,
    mask_from_file: bool,
    statistics: ByteStatistics,
    finalized: FinalizedStatistics,
    vector: SparseVector,
    overrides: DecisionOverride,
    dump: Option<DumpSink>,
    input_name: Option<String>,
    read_buffer: Vec<u8>,
    state: SessionState,
}

impl ClassificationSession {
    /// Load the model, type table and mask
    ///
    /// Fails with `ModelLoad` when the model cannot be read and with
    /// `MaskMismatch` when a mask file disagrees with the model.
    pub fn open(source: ModelSource<'_>, options: SessionOptions) -> Result<Self> {
        options.thresholds.validate().map_err(ClassifierError::Config)?;
        if options.read_buffer_size == 0 {
            return Err(ClassifierError::Config(
                "read_buffer_size must be > 0".to_string(),
            ));
        }

        let (model, model_origin) = source.resolve()?;

        let types = match &options.class_file {
            Some(path) => TypeNameTable::with_class_file(path)?,
            None => TypeNameTable::builtin(),
        };

        let (mask, mask_from_file) = match &options.mask_file {
            Some(path) => (FeatureMask::load(path, model.feature_count())?, true),
            None => {
                let mask = FeatureMask::for_mode(options.ngram_mode);
                let enabled = mask.enabled_count();
                if enabled != model.feature_count() {
                    warn!(
                        enabled,
                        model_features = model.feature_count(),
                        ngram_mode = %options.ngram_mode,
                        "default mask does not match the model's feature count"
                    );
                }
                (mask, false)
            }
        };

        info!(
            model = %model_origin,
            features = model.feature_count(),
            classes = model.class_labels().len(),
            ngram_mode = %options.ngram_mode,
            mask_enabled = mask.enabled_count(),
            "session opened"
        );

        Ok(Self {
            model,
            model_origin,
            types,
            mask,
            mask_from_file,
            statistics: ByteStatistics::new(options.ngram_mode),
            finalized: FinalizedStatistics::zeroed(),
            vector: SparseVector::new(),
            overrides: DecisionOverride::new(options.thresholds),
            dump: None,
            input_name: None,
            read_buffer: vec![0; options.read_buffer_size],
            state: SessionState::Open,
        })
    }

    /// Fold more bytes of the current unit into the statistics
    pub fn update(&mut self, buf: &[u8]) {
        if buf.is_empty() {
            return;
        }
        self.statistics.update(buf);
        self.state = SessionState::Updating;
    }

    /// Classify the bytes seen since the last classify or clear
    ///
    /// The statistics are reset whether or not classification succeeds.
    pub fn classify(&mut self) -> Result<i32> {
        self.classify_decision().map(|decision| decision.code())
    }

    /// Like [`classify`](Self::classify) but reports which rule decided
    pub fn classify_decision(&mut self) -> Result<Decision> {
        let result = self.decide_current_unit();
        self.statistics.reset();
        self.state = SessionState::Open;
        result
    }

    fn decide_current_unit(&mut self) -> Result<Decision> {
        self.statistics.finalize_into(&mut self.finalized)?;

        if let Some(sink) = self.dump.as_mut() {
            sink.write_unit(
                &self.finalized,
                &self.mask,
                &mut self.vector,
                self.input_name.as_deref(),
            )?;
            return Ok(Decision::Dumped);
        }

        let model = &self.model;
        let mask = &self.mask;
        let finalized = &self.finalized;
        let vector = &mut self.vector;
        let decision = self.overrides.decide(finalized, || {
            build_into(vector, finalized, mask, BiasTerm::for_model(model.as_ref()));
            model.predict(vector)
        });

        debug!(
            bytes = finalized.total_bytes(),
            entropy = finalized.item_entropy(),
            ?decision,
            "classified unit"
        );
        Ok(decision)
    }

    /// Stream `reader` to EOF as one unit and classify it
    ///
    /// On a read error the partial unit is discarded and the error returned.
    pub fn classify_whole_input<R: Read>(&mut self, mut reader: R) -> Result<i32> {
        loop {
            match read_retrying(&mut reader, &mut self.read_buffer) {
                Ok(0) => break,
                Ok(n) => {
                    self.statistics.update(&self.read_buffer[..n]);
                    self.state = SessionState::Updating;
                }
                Err(e) => {
                    self.clear();
                    return Err(e.into());
                }
            }
        }
        self.classify()
    }

    /// Classify one in-memory buffer, discarding anything accumulated before
    pub fn classify_buffer(&mut self, buf: &[u8]) -> Result<i32> {
        self.clear();
        self.update(buf);
        self.classify()
    }

    /// Classify a whole file, discarding anything accumulated before
    pub fn classify_path(&mut self, path: impl AsRef<Path>) -> Result<i32> {
        self.clear();
        let path = path.as_ref();
        let file = File::open(path)?;
        let previous = self.input_name.replace(path.display().to_string());
        let result = self.classify_whole_input(file);
        self.input_name = previous;
        result
    }

    /// Drop anything accumulated for the current unit
    pub fn clear(&mut self) {
        self.statistics.reset();
        self.state = SessionState::Open;
    }

    /// Release the session; a shared model stays loaded for other sessions
    pub fn close(self) {
        debug!(model = %self.model_origin, "session closed");
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Bytes accumulated for the current unit
    pub fn accumulated_bytes(&self) -> u64 {
        self.statistics.total_bytes()
    }

    pub fn ngram_mode(&self) -> NgramMode {
        self.statistics.mode()
    }

    /// Switch ngram mode
    ///
    /// Resets the statistics, and the mask too unless it came from a file.
    pub fn set_ngram_mode(&mut self, mode: NgramMode) {
        self.statistics.set_mode(mode);
        self.state = SessionState::Open;
        if !self.mask_from_file {
            self.mask.initialize(mode);
        }
        debug!(ngram_mode = %mode, mask_enabled = self.mask.enabled_count(), "ngram mode changed");
    }

    pub fn model(&self) -> &dyn LinearClassifier {
        self.model.as_ref()
    }

    pub fn mask(&self) -> &FeatureMask {
        &self.mask
    }

    pub fn types(&self) -> &TypeNameTable {
        &self.types
    }

    pub fn thresholds(&self) -> &DecisionThresholds {
        self.overrides.thresholds()
    }

    /// Write the active mask to `path`
    pub fn dump_mask(&self, path: impl AsRef<Path>) -> Result<()> {
        self.mask.dump(path)
    }

    /// Replace the active mask with one read from `path`
    ///
    /// The mask must enable exactly as many slots as the model has features.
    pub fn load_mask(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.mask = FeatureMask::load(path, self.model.feature_count())?;
        self.mask_from_file = true;
        Ok(())
    }

    /// Reduce the mask to the `top_n` heaviest features per class, write the
    /// result to `output` and make it the session's mask
    pub fn reduce_features(
        &mut self,
        output: impl AsRef<Path>,
        top_n: usize,
    ) -> Result<ReductionSummary> {
        let (reduced, summary) = self.mask.reduce(self.model.as_ref(), top_n)?;
        reduced.dump(output)?;
        self.mask = reduced;
        self.mask_from_file = true;
        Ok(summary)
    }

    pub fn name_for_type(&self, code: i32) -> Option<&str> {
        self.types.name_for_type(code)
    }

    pub fn type_for_name(&self, name: &str) -> Result<i32> {
        self.types.type_for_name(name)
    }

    /// Name recorded in JSON dumps for the current input
    pub fn set_input_name(&mut self, name: Option<String>) {
        self.input_name = name;
    }

    /// Send every classified unit to `writer` as JSON, labelled `file_type`
    pub fn dump_json_on_classify(&mut self, file_type: i32, writer: Box<dyn Write + Send>) {
        self.dump = Some(DumpSink::new(DumpFormat::Json, file_type, writer));
    }

    /// Send every classified unit to `writer` as liblinear training lines
    pub fn dump_nodes_on_classify(&mut self, file_type: i32, writer: Box<dyn Write + Send>) {
        self.dump = Some(DumpSink::new(DumpFormat::Nodes, file_type, writer));
    }

    /// Go back to predicting
    pub fn stop_dumping(&mut self) {
        self.dump = None;
    }

    pub fn is_dumping(&self) -> bool {
        self.dump.is_some()
    }
}

impl std::fmt::Debug for ClassificationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassificationSession")
            .field("model", &self.model_origin)
            .field("state", &self.state)
            .field("ngram_mode", &self.statistics.mode())
            .field("mask", &self.mask)
            .field("dump", &self.dump)
            .finish_non_exhaustive()
    }
}
