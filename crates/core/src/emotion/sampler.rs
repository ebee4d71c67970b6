use crate::classifier::{ClassifierError, EmotionClassifier};
use crate::decode::{FrameSource, VideoInfo};
use crate::emotion::{FrameEmotion, FrameOutcome};

const LOG_TARGET: &str = "emotion::sampler";
const PROGRESS_EVERY: u64 = 30;

/// Classify every `stride`-th frame of `source`.
///
/// A frame the classifier could not read a face from becomes [`FrameOutcome::Skipped`]; a read
/// error ends the stream early the same way end-of-file does. Only sampled frames produce an
/// outcome.
///
/// A classifier that is unreachable or answers garbage fails the whole pass.
pub async fn sample_frames(
    source: &mut dyn FrameSource,
    classifier: &dyn EmotionClassifier,
    info: &VideoInfo,
    stride: u64,
) -> Result<Vec<FrameOutcome>, ClassifierError> {
    let stride = stride.max(1);
    let mut outcomes = Vec::new();

    tracing::info!(
        target: LOG_TARGET,
        total_frames = info.total_frames,
        fps = info.fps,
        stride,
        "processing video frames"
    );

    loop {
        let frame = match source.next_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(target: LOG_TARGET, error = %e, "frame read failed, stopping");
                break;
            }
        };

        if frame.index % stride != 0 {
            continue;
        }

        match classifier.classify(&frame).await {
            Ok(face) => {
                if frame.index % PROGRESS_EVERY == 0 {
                    tracing::debug!(
                        target: LOG_TARGET,
                        frame = frame.index,
                        total_frames = info.total_frames,
                        "processed frame"
                    );
                }
                outcomes.push(FrameOutcome::Classified(FrameEmotion {
                    frame_index: frame.index,
                    timestamp_seconds: info.timestamp_of(frame.index),
                    dominant_label: face.dominant_emotion,
                    per_label_score: face.emotion,
                }));
            }
            Err(e @ (ClassifierError::Unavailable(_) | ClassifierError::Protocol(_))) => {
                tracing::error!(
                    target: LOG_TARGET,
                    frame = frame.index,
                    error = %e,
                    "classifier failed"
                );
                return Err(e);
            }
            Err(e) => {
                tracing::debug!(target: LOG_TARGET, frame = frame.index, error = %e, "skipping frame");
                outcomes.push(FrameOutcome::Skipped {
                    frame_index: frame.index,
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(outcomes)
}
