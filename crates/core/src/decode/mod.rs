mod probe;
mod wav;

#[cfg(feature = "ffmpeg-sidecar")]
mod ffmpeg;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[cfg(feature = "ffmpeg-sidecar")]
pub use ffmpeg::{FfmpegBackend, FfmpegFrameSource};
pub use probe::{parse_frame_rate, parse_probe_json};
pub use wav::{downmix_interleaved, read_wav, Waveform};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub total_frames: u64,
    pub has_audio: bool,
}

impl VideoInfo {
    /// `total_frames / fps`, or zero when the container reports no frame rate.
    pub fn duration_secs(&self) -> f64 {
        if self.fps > 0.0 {
            self.total_frames as f64 / self.fps
        } else {
            0.0
        }
    }

    /// Seconds since the start of the video for a zero-based frame index.
    pub fn timestamp_of(&self, frame_index: u64) -> f64 {
        if self.fps > 0.0 {
            frame_index as f64 / self.fps
        } else {
            0.0
        }
    }
}

/// One decoded frame, packed `rgb24`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoFrame {
    pub index: u64,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("ffmpeg unavailable: {0}")]
    FfmpegUnavailable(String),

    #[error("ffmpeg failed: {0}")]
    FfmpegFailed(String),

    #[error("could not open the video file: {0}")]
    OpenFailed(String),

    #[error("video has no video stream")]
    NoVideoStream,

    #[error("invalid probe output: {0}")]
    InvalidProbe(String),

    #[error("invalid pcm output: {0}")]
    InvalidPcm(String),

    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, DecodeError>;

/// Sequential access to decoded frames of one opened video.
///
/// Dropping the source releases the underlying decoder.
pub trait FrameSource: Send {
    /// `Ok(None)` marks the end of the stream.
    fn next_frame(&mut self) -> BoxFuture<'_, Result<Option<VideoFrame>>>;
}

/// Everything the analysis needs from a demuxer.
pub trait MediaBackend: Send + Sync {
    fn probe<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<VideoInfo>>;

    fn open_frames<'a>(
        &'a self,
        path: &'a Path,
        info: &'a VideoInfo,
    ) -> BoxFuture<'a, Result<Box<dyn FrameSource>>>;

    /// Write the audio track of `path` to `dest` as mono `pcm_s16le` WAV at `sample_rate_hz`.
    fn extract_audio<'a>(
        &'a self,
        path: &'a Path,
        dest: &'a Path,
        sample_rate_hz: u32,
    ) -> BoxFuture<'a, Result<()>>;
}

/// In-memory [`FrameSource`], used by tests and by callers that already hold frames.
#[derive(Clone, Debug, Default)]
pub struct VecFrameSource {
    frames: std::collections::VecDeque<VideoFrame>,
}

impl VecFrameSource {
    pub fn new(frames: Vec<VideoFrame>) -> Self {
        Self {
            frames: frames.into(),
        }
    }
}

impl FrameSource for VecFrameSource {
    fn next_frame(&mut self) -> BoxFuture<'_, Result<Option<VideoFrame>>> {
        let next = self.frames.pop_front();
        Box::pin(async move { Ok(next) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_and_timestamps_follow_fps() {
        let info = VideoInfo {
            width: 4,
            height: 4,
            fps: 25.0,
            total_frames: 250,
            has_audio: true,
        };
        assert!((info.duration_secs() - 10.0).abs() < 1e-12);
        assert!((info.timestamp_of(50) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn zero_fps_yields_zero_duration() {
        let info = VideoInfo {
            width: 4,
            height: 4,
            fps: 0.0,
            total_frames: 250,
            has_audio: false,
        };
        assert_eq!(info.duration_secs(), 0.0);
        assert_eq!(info.timestamp_of(10), 0.0);
    }

    #[test]
    fn vec_source_drains_in_order() {
        let frame = |index| VideoFrame {
            index,
            width: 1,
            height: 1,
            data: vec![0, 0, 0],
        };
        let mut src = VecFrameSource::new(vec![frame(0), frame(1)]);
        let a = futures::executor::block_on(src.next_frame()).unwrap();
        let b = futures::executor::block_on(src.next_frame()).unwrap();
        let c = futures::executor::block_on(src.next_frame()).unwrap();
        assert_eq!(a.map(|f| f.index), Some(0));
        assert_eq!(b.map(|f| f.index), Some(1));
        assert!(c.is_none());
    }
}
