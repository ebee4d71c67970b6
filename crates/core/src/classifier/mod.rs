//! Facial emotion classification, treated as a black box.
//!
//! The service never runs a model in-process. An [`EmotionClassifier`] receives a decoded frame
//! and answers with the first detected face's dominant label and per-label scores.

mod sidecar;

use crate::decode::VideoFrame;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use sidecar::SidecarEmotionClassifier;

/// Classification of the first face found in a frame.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FaceEmotion {
    pub dominant_emotion: String,
    /// Label -> score in `0..=100`.
    pub emotion: BTreeMap<String, f64>,
}

/// Options forwarded with every classification request.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClassifierOptions {
    pub detector_backend: String,
    /// When false the classifier analyzes the whole frame even if no face is found.
    pub enforce_detection: bool,
    /// Suppress the classifier's own logging.
    pub silent: bool,
}

impl ClassifierOptions {
    pub fn lenient(detector_backend: impl Into<String>) -> Self {
        Self {
            detector_backend: detector_backend.into(),
            enforce_detection: false,
            silent: true,
        }
    }
}

impl Default for ClassifierOptions {
    fn default() -> Self {
        Self::lenient(crate::config::DEFAULT_DETECTOR_BACKEND)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ClassifierError {
    #[error("no face detected")]
    NoFace,

    #[error("classifier rejected frame: {0}")]
    Rejected(String),

    #[error("classifier sidecar unavailable: {0}")]
    Unavailable(String),

    #[error("classifier protocol error: {0}")]
    Protocol(String),
}

pub trait EmotionClassifier: Send + Sync {
    fn classify<'a>(
        &'a self,
        frame: &'a VideoFrame,
    ) -> BoxFuture<'a, Result<FaceEmotion, ClassifierError>>;
}
