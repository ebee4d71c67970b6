pub mod rules;

use crate::decode::{
    read_wav, DecodeError, MediaBackend, Result as DecodeResult, VideoInfo, Waveform,
};
use crate::dsp::FrameFeatures;
use crate::util::{mean, population_std, round_to, scratch_file};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use rules::{interpret, AcousticStats, Interpretation};

pub const NO_AUDIO_ERROR: &str = "No audio track found in video";

const LOG_TARGET: &str = "voice";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VariedFeature {
    pub average: f64,
    pub variation: f64,
    pub interpretation: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RateFeature {
    pub value: f64,
    pub interpretation: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SpectralFeature {
    pub average: f64,
    pub interpretation: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AcousticSummary {
    pub duration: f64,
    pub pitch: VariedFeature,
    pub energy: VariedFeature,
    pub speaking_rate: RateFeature,
    pub spectral_centroid: SpectralFeature,
    pub tempo: f64,
    pub overall_tone: String,
    pub has_audio: bool,
}

/// Vocal result for one video: a summary, or the reason there is none.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum VoiceAnalysis {
    Analyzed(AcousticSummary),
    NoAudio { error: String, has_audio: bool },
}

impl VoiceAnalysis {
    pub fn no_audio() -> Self {
        VoiceAnalysis::NoAudio {
            error: NO_AUDIO_ERROR.to_owned(),
            has_audio: false,
        }
    }

    pub fn summary(&self) -> Option<&AcousticSummary> {
        match self {
            VoiceAnalysis::Analyzed(s) => Some(s),
            VoiceAnalysis::NoAudio { .. } => None,
        }
    }
}

/// Mean and standard deviation of each frame-wise stream.
///
/// Unvoiced (non-positive) pitch frames are dropped first; with none left pitch is zero.
pub fn reduce(features: &FrameFeatures) -> AcousticStats {
    let voiced: Vec<f64> = features
        .pitch_hz
        .iter()
        .copied()
        .filter(|p| *p > 0.0)
        .collect();

    AcousticStats {
        pitch_mean: mean(&voiced),
        pitch_std: population_std(&voiced),
        energy_mean: mean(&features.rms),
        energy_std: population_std(&features.rms),
        zcr_mean: mean(&features.zero_crossing_rate),
        spectral_centroid_mean: mean(&features.spectral_centroid_hz),
        tempo_bpm: features.tempo_bpm,
    }
}

/// Interpret `stats` and round everything for presentation.
pub fn summarize(stats: &AcousticStats, duration_secs: f64) -> AcousticSummary {
    let interpretation = interpret(stats);
    AcousticSummary {
        duration: round_to(duration_secs, 2),
        pitch: VariedFeature {
            average: round_to(stats.pitch_mean, 2),
            variation: round_to(stats.pitch_std, 2),
            interpretation: interpretation.pitch,
        },
        energy: VariedFeature {
            average: round_to(stats.energy_mean, 4),
            variation: round_to(stats.energy_std, 4),
            interpretation: interpretation.energy,
        },
        speaking_rate: RateFeature {
            value: round_to(stats.zcr_mean, 4),
            interpretation: interpretation.speaking_rate,
        },
        spectral_centroid: SpectralFeature {
            average: round_to(stats.spectral_centroid_mean, 2),
            interpretation: interpretation.spectral,
        },
        tempo: round_to(stats.tempo_bpm, 2),
        overall_tone: interpretation.overall,
        has_audio: true,
    }
}

/// Pull the audio track of `video` into memory via a scratch WAV in `scratch_dir`.
///
/// Returns `Ok(None)` without touching the filesystem when the video has no audio stream.
/// The scratch file is removed on every path.
pub async fn extract_waveform(
    backend: &dyn MediaBackend,
    video: &Path,
    info: &VideoInfo,
    scratch_dir: &Path,
    sample_rate_hz: u32,
) -> DecodeResult<Option<Waveform>> {
    if !info.has_audio {
        tracing::info!(target: LOG_TARGET, path = %video.display(), "video has no audio track");
        return Ok(None);
    }

    let scratch = scratch_file(scratch_dir, "audio", "wav")
        .map_err(|source| DecodeError::Io {
            path: scratch_dir.display().to_string(),
            source,
        })?
        .into_temp_path();
    backend.extract_audio(video, &scratch, sample_rate_hz).await?;
    let waveform = read_wav(&scratch)?;

    tracing::debug!(
        target: LOG_TARGET,
        samples = waveform.samples.len(),
        sample_rate_hz = waveform.sample_rate_hz,
        "extracted audio"
    );
    Ok(Some(waveform))
}
