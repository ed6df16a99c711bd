//! Lazily loaded models shared between sessions

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use tracing::info;

use super::{LiblinearModel, ModelHandle};
use crate::error::Result;

/// Environment variable naming the default model file
pub const MODEL_ENV_VAR: &str = "BYTESIFT_MODEL";

/// Model path used when neither configuration nor environment names one
const FALLBACK_MODEL_PATH: &str = "model";

static GLOBAL: OnceLock<SharedModel> = OnceLock::new();

/// A model loaded on first use and then shared read-only
///
/// Concurrent first calls to [`get`](Self::get) may each parse the file, but
/// exactly one result is kept and every caller sees that one. A failed load
/// is not remembered, so a later call retries.
pub struct SharedModel {
    path: PathBuf,
    cell: OnceLock<ModelHandle>,
}

impl SharedModel {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cell: OnceLock::new(),
        }
    }

    /// A shared model that is already loaded
    pub fn preloaded(path: impl Into<PathBuf>, model: ModelHandle) -> Self {
        let shared = Self::new(path);
        let _ = shared.cell.set(model);
        shared
    }

    /// The process-wide default model
    ///
    /// Its path comes from [`configure_global`](Self::configure_global) if
    /// that ran first, otherwise from `$BYTESIFT_MODEL`, otherwise `model`.
    pub fn global() -> &'static SharedModel {
        GLOBAL.get_or_init(|| SharedModel::new(default_model_path()))
    }

    /// Set the default model's path before anything used it
    ///
    /// Returns false when the default model was already initialized.
    pub fn configure_global(path: impl Into<PathBuf>) -> bool {
        GLOBAL.set(SharedModel::new(path)).is_ok()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }

    /// The loaded model, loading it now if needed
    pub fn get(&self) -> Result<ModelHandle> {
        if let Some(model) = self.cell.get() {
            return Ok(Arc::clone(model));
        }
        let loaded: ModelHandle = Arc::new(LiblinearModel::load(&self.path)?);
        info!(
            path = %self.path.display(),
            features = loaded.feature_count(),
            classes = loaded.class_labels().len(),
            "loaded shared model"
        );
        Ok(Arc::clone(self.cell.get_or_init(|| loaded)))
    }
}

impl fmt::Debug for SharedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedModel")
            .field("path", &self.path)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

/// `$BYTESIFT_MODEL`, or `model` in the working directory
pub fn default_model_path() -> PathBuf {
    std::env::var_os(MODEL_ENV_VAR)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(FALLBACK_MODEL_PATH))
}
