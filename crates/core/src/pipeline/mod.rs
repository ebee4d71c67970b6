//! One video in, one report out.
//!
//! The facial pass runs first and the voice pass second. Both read the same file, and nothing
//! from one pass feeds the other.

use crate::{
    classifier::{ClassifierError, EmotionClassifier},
    config::AnalysisConfig,
    decode::{DecodeError, MediaBackend, VideoInfo},
    dsp::{FeatureExtractor, StftFeatureExtractor},
    emotion::{aggregate, sample_frames, FacialAnalysis},
    feedback::{compose, FeedbackReport},
    voice::{extract_waveform, reduce, summarize, VoiceAnalysis},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const LOG_TARGET: &str = "pipeline";

#[derive(thiserror::Error, Debug)]
pub enum AnalysisError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    #[error("feature extraction worker failed: {0}")]
    Worker(String),
}

/// Everything produced for one uploaded video.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AnalysisReport {
    pub facial_analysis: FacialAnalysis,
    pub voice_analysis: VoiceAnalysis,
    pub feedback: FeedbackReport,
}

#[derive(Clone)]
pub struct Analyzer {
    backend: Arc<dyn MediaBackend>,
    classifier: Arc<dyn EmotionClassifier>,
    features: Arc<dyn FeatureExtractor>,
    config: AnalysisConfig,
    scratch_dir: PathBuf,
}

impl Analyzer {
    pub fn new(
        backend: Arc<dyn MediaBackend>,
        classifier: Arc<dyn EmotionClassifier>,
        config: AnalysisConfig,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            backend,
            classifier,
            features: Arc::new(StftFeatureExtractor::default()),
            config,
            scratch_dir: scratch_dir.into(),
        }
    }

    pub fn with_feature_extractor(mut self, features: Arc<dyn FeatureExtractor>) -> Self {
        self.features = features;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub async fn analyze(&self, video: &Path) -> Result<AnalysisReport, AnalysisError> {
        let info = self.backend.probe(video).await?;
        tracing::info!(
            target: LOG_TARGET,
            path = %video.display(),
            width = info.width,
            height = info.height,
            fps = info.fps,
            total_frames = info.total_frames,
            has_audio = info.has_audio,
            "analyzing video"
        );

        let facial_analysis = self.analyze_facial(video, &info).await?;
        let voice_analysis = self.analyze_voice(video, &info).await?;
        let feedback = compose(&facial_analysis, &voice_analysis);

        tracing::info!(
            target: LOG_TARGET,
            faces = facial_analysis.summary().is_some(),
            audio = voice_analysis.summary().is_some(),
            recommendations = feedback.recommendations.len(),
            "analysis complete"
        );

        Ok(AnalysisReport {
            facial_analysis,
            voice_analysis,
            feedback,
        })
    }

    pub async fn analyze_facial(
        &self,
        video: &Path,
        info: &VideoInfo,
    ) -> Result<FacialAnalysis, AnalysisError> {
        let mut source = self.backend.open_frames(video, info).await?;
        let outcomes = sample_frames(
            source.as_mut(),
            self.classifier.as_ref(),
            info,
            self.config.frame_stride,
        )
        .await?;
        drop(source);

        Ok(aggregate(
            outcomes,
            info.duration_secs(),
            info.total_frames,
            self.config.timeline_segments,
        ))
    }

    pub async fn analyze_voice(
        &self,
        video: &Path,
        info: &VideoInfo,
    ) -> Result<VoiceAnalysis, AnalysisError> {
        let waveform = match extract_waveform(
            self.backend.as_ref(),
            video,
            info,
            &self.scratch_dir,
            self.config.sample_rate_hz,
        )
        .await?
        {
            Some(waveform) => waveform,
            None => return Ok(VoiceAnalysis::no_audio()),
        };

        let extractor = Arc::clone(&self.features);
        let (features, duration) = tokio::task::spawn_blocking(move || {
            (extractor.extract(&waveform), waveform.duration_secs())
        })
        .await
        .map_err(|e| AnalysisError::Worker(e.to_string()))?;

        let stats = reduce(&features);
        tracing::debug!(target: LOG_TARGET, ?stats, "acoustic statistics");
        Ok(VoiceAnalysis::Analyzed(summarize(&stats, duration)))
    }
}
