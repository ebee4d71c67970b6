//! Frame-wise acoustic descriptors.
//!
//! The analysis only needs summary statistics over these streams, so the toolkit is kept behind
//! [`FeatureExtractor`]; [`StftFeatureExtractor`] is the built-in implementation.

mod stft;
mod tempo;

use crate::decode::Waveform;
use serde::{Deserialize, Serialize};

pub use stft::StftFeatureExtractor;
pub use tempo::estimate_tempo;

/// Per-frame descriptor streams plus a whole-clip tempo.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct FrameFeatures {
    /// Fundamental frequency per frame; `0.0` marks an unvoiced frame.
    pub pitch_hz: Vec<f64>,
    pub rms: Vec<f64>,
    pub zero_crossing_rate: Vec<f64>,
    pub spectral_centroid_hz: Vec<f64>,
    pub tempo_bpm: f64,
}

pub trait FeatureExtractor: Send + Sync {
    fn extract(&self, waveform: &Waveform) -> FrameFeatures;
}
