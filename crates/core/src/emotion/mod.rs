mod aggregate;
mod sampler;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use aggregate::{aggregate, build_timeline, mode_label, NEUTRAL_LABEL, NO_FACE_ERROR};
pub use sampler::sample_frames;

/// Classification of one sampled frame.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FrameEmotion {
    #[serde(rename = "frame")]
    pub frame_index: u64,
    #[serde(rename = "timestamp")]
    pub timestamp_seconds: f64,
    #[serde(rename = "emotion")]
    pub dominant_label: String,
    #[serde(rename = "scores")]
    pub per_label_score: BTreeMap<String, f64>,
}

/// What happened to a sampled frame.
#[derive(Clone, Debug, PartialEq)]
pub enum FrameOutcome {
    Classified(FrameEmotion),
    Skipped { frame_index: u64, reason: String },
}

impl FrameOutcome {
    pub fn classified(&self) -> Option<&FrameEmotion> {
        match self {
            FrameOutcome::Classified(f) => Some(f),
            FrameOutcome::Skipped { .. } => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TimelineSegment {
    /// One-based position in the timeline.
    #[serde(rename = "segment")]
    pub segment_index: usize,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(rename = "emotion")]
    pub dominant_label: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FacialSummary {
    pub duration: f64,
    pub frames_analyzed: usize,
    pub total_frames: u64,
    #[serde(rename = "dominant_emotion")]
    pub dominant_label: String,
    #[serde(rename = "emotion_percentages")]
    pub label_percentages: BTreeMap<String, f64>,
    pub average_scores: BTreeMap<String, f64>,
    pub timeline: Vec<TimelineSegment>,
    #[serde(rename = "emotions_detected")]
    pub frames: Vec<FrameEmotion>,
}

impl FacialSummary {
    pub fn percentage_of(&self, label: &str) -> f64 {
        self.label_percentages.get(label).copied().unwrap_or(0.0)
    }
}

/// Facial result for one video: a summary, or the reason there is none.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FacialAnalysis {
    Detected(FacialSummary),
    NoFace {
        error: String,
        duration: f64,
        frames_analyzed: usize,
    },
}

impl FacialAnalysis {
    pub fn summary(&self) -> Option<&FacialSummary> {
        match self {
            FacialAnalysis::Detected(s) => Some(s),
            FacialAnalysis::NoFace { .. } => None,
        }
    }
}
