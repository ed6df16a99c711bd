// Linear classifier models
//
// Sessions talk to a model only through `LinearClassifier`. The shipped
// implementation reads liblinear's plain-text model format; tests plug in
// their own implementations.

mod liblinear;
mod shared;

pub use liblinear::LiblinearModel;
pub use shared::{default_model_path, SharedModel, MODEL_ENV_VAR};

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::Result;
use crate::vector::SparseVector;

/// A trained multi-class linear classifier over the sparse feature space
///
/// Implementations must be safe to share between sessions on different
/// threads; prediction takes `&self` and must not mutate the model.
pub trait LinearClassifier: Send + Sync {
    /// Number of features the model was trained on (excluding the bias term)
    fn feature_count(&self) -> usize;

    /// Bias value; negative means the model has no bias term
    fn bias(&self) -> f64;

    /// Class label per weight column, in model order
    fn class_labels(&self) -> &[i32];

    /// Columns per feature row in [`weights`](Self::weights)
    fn weight_columns(&self) -> usize;

    /// Row-major weights, `w[feature * weight_columns() + column]`
    fn weights(&self) -> &[f64];

    /// Predict a class label for a sentinel-terminated sparse vector
    fn predict(&self, vector: &SparseVector) -> i32;
}

/// Shared handle to a loaded model
pub type ModelHandle = Arc<dyn LinearClassifier>;

/// Where a session gets its model from
pub enum ModelSource<'a> {
    /// The process-wide default model ([`SharedModel::global`])
    Default,
    /// A caller-owned lazily loaded model
    Shared(&'a SharedModel),
    /// A model file loaded for this session alone
    File(PathBuf),
    /// An already loaded model
    Loaded(ModelHandle),
}

impl ModelSource<'_> {
    /// Resolve to a model handle and a human-readable origin
    pub(crate) fn resolve(self) -> Result<(ModelHandle, String)> {
        match self {
            ModelSource::Default => {
                let shared = SharedModel::global();
                Ok((shared.get()?, shared.path().display().to_string()))
            }
            ModelSource::Shared(shared) => {
                Ok((shared.get()?, shared.path().display().to_string()))
            }
            ModelSource::File(path) => {
                let model = LiblinearModel::load(&path)?;
                Ok((Arc::new(model), path.display().to_string()))
            }
            ModelSource::Loaded(model) => Ok((model, "<in-memory>".to_string())),
        }
    }
}

impl std::fmt::Debug for ModelSource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelSource::Default => write!(f, "Default"),
            ModelSource::Shared(shared) => write!(f, "Shared({})", shared.path().display()),
            ModelSource::File(path) => write!(f, "File({})", path.display()),
            ModelSource::Loaded(model) => {
                write!(f, "Loaded({} features)", model.feature_count())
            }
        }
    }
}
