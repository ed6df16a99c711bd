//! bytesift - statistical content-type classification of byte streams
//!
//! This library classifies files, disk images and raw byte fragments by
//! content type without relying on headers or file extensions. It folds a
//! stream into unigram, bigram and scalar byte statistics, assembles a masked
//! sparse feature vector and hands it to a trained linear classifier, with
//! override rules that recognize random and constant data up front.
//!
//! # Example
//! ```
//! use std::sync::Arc;
//! use bytesift::model::{LiblinearModel, ModelSource};
//! use bytesift::session::{ClassificationSession, SessionOptions};
//! use bytesift::features::NgramMode;
//! use bytesift::types::UCV_CONST;
//!
//! // A 256-feature unigram model with two classes and zero weights
//! let model = LiblinearModel::new("L2R_LR", vec![1, 2], 256, -1.0, vec![0.0; 256]).unwrap();
//! let mut session = ClassificationSession::open(
//!     ModelSource::Loaded(Arc::new(model)),
//!     SessionOptions::default().with_ngram_mode(NgramMode::UNIGRAMS_ONLY),
//! )
//! .unwrap();
//!
//! assert_eq!(session.classify_buffer(&[0u8; 4096]).unwrap(), UCV_CONST);
//! ```

pub mod cli;
pub mod config;
pub mod decision;
pub mod dump;
pub mod error;
pub mod features;
pub mod input;
pub mod mask;
pub mod model;
pub mod scan;
pub mod session;
pub mod types;
pub mod vector;
