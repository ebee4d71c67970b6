use crate::decode::{
    parse_probe_json, DecodeError, FrameSource, MediaBackend, Result, VideoFrame, VideoInfo,
};
use ffmpeg_sidecar::{download, ffprobe::ffprobe_path, paths::ffmpeg_path};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout};

const LOG_TARGET: &str = "decode::ffmpeg";

/// Demuxer backed by the `ffmpeg` and `ffprobe` binaries.
#[derive(Clone, Debug)]
pub struct FfmpegBackend {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self {
            ffmpeg: ffmpeg_path(),
            ffprobe: ffprobe_path(),
        }
    }
}

impl FfmpegBackend {
    /// Locate ffmpeg/ffprobe, downloading a static build next to the executable if missing.
    ///
    /// Blocks while downloading; call it at startup, not per request.
    pub fn ensure_available() -> Result<Self> {
        download::auto_download().map_err(|e| DecodeError::FfmpegUnavailable(e.to_string()))?;
        Ok(Self::default())
    }

    async fn probe_video(&self, path: &Path) -> Result<VideoInfo> {
        let output = tokio::process::Command::new(&self.ffprobe)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| DecodeError::FfmpegFailed(format!("ffprobe spawn: {e}")))?;

        if !output.status.success() {
            return Err(DecodeError::OpenFailed(format!(
                "ffprobe exit_code={:?} path={}",
                output.status.code(),
                path.display()
            )));
        }

        let info = parse_probe_json(&output.stdout)?;
        tracing::debug!(
            target: LOG_TARGET,
            path = %path.display(),
            width = info.width,
            height = info.height,
            fps = info.fps,
            total_frames = info.total_frames,
            has_audio = info.has_audio,
            "probed video"
        );
        Ok(info)
    }

    fn spawn_frames(&self, path: &Path, info: &VideoInfo) -> Result<FfmpegFrameSource> {
        let mut child = tokio::process::Command::new(&self.ffmpeg)
            .args(["-hide_banner", "-nostdin", "-loglevel", "error", "-noautorotate", "-i"])
            .arg(path)
            .args([
                "-an",
                "-sn",
                "-dn",
                "-fps_mode",
                "passthrough",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgb24",
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DecodeError::OpenFailed(e.to_string()))?;

        let stdout = child.stdout.take().ok_or_else(|| {
            DecodeError::FfmpegFailed("ffmpeg stdout unavailable (pipe not created)".to_owned())
        })?;

        Ok(FfmpegFrameSource {
            child,
            stdout,
            width: info.width,
            height: info.height,
            next_index: 0,
            finished: false,
        })
    }

    async fn extract_wav(&self, path: &Path, dest: &Path, sample_rate_hz: u32) -> Result<()> {
        let rate = sample_rate_hz.to_string();
        let output = tokio::process::Command::new(&self.ffmpeg)
            .args(["-hide_banner", "-nostdin", "-loglevel", "error", "-y", "-i"])
            .arg(path)
            .args([
                "-vn", "-sn", "-dn", "-ac", "1", "-ar", &rate, "-acodec", "pcm_s16le", "-f", "wav",
            ])
            .arg(dest)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| DecodeError::FfmpegFailed(e.to_string()))?;

        if !output.status.success() {
            let stderr_s = String::from_utf8_lossy(&output.stderr).trim().to_owned();
            return Err(DecodeError::FfmpegFailed(format!(
                "exit_code={:?} stderr={stderr_s}",
                output.status.code()
            )));
        }
        Ok(())
    }
}

impl MediaBackend for FfmpegBackend {
    fn probe<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<VideoInfo>> {
        self.probe_video(path).boxed()
    }

    fn open_frames<'a>(
        &'a self,
        path: &'a Path,
        info: &'a VideoInfo,
    ) -> BoxFuture<'a, Result<Box<dyn FrameSource>>> {
        async move {
            let source = self.spawn_frames(path, info)?;
            Ok(Box::new(source) as Box<dyn FrameSource>)
        }
        .boxed()
    }

    fn extract_audio<'a>(
        &'a self,
        path: &'a Path,
        dest: &'a Path,
        sample_rate_hz: u32,
    ) -> BoxFuture<'a, Result<()>> {
        self.extract_wav(path, dest, sample_rate_hz).boxed()
    }
}

/// Raw `rgb24` frames read from an ffmpeg child process; the child is killed on drop.
pub struct FfmpegFrameSource {
    child: Child,
    stdout: ChildStdout,
    width: u32,
    height: u32,
    next_index: u64,
    finished: bool,
}

impl FfmpegFrameSource {
    fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    async fn read_frame(&mut self) -> Result<Option<VideoFrame>> {
        if self.finished {
            return Ok(None);
        }

        let mut data = vec![0u8; self.frame_len()];
        match self.stdout.read_exact(&mut data).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                self.finished = true;
                self.reap().await;
                return Ok(None);
            }
            Err(e) => {
                self.finished = true;
                return Err(DecodeError::FfmpegFailed(e.to_string()));
            }
        }

        let frame = VideoFrame {
            index: self.next_index,
            width: self.width,
            height: self.height,
            data,
        };
        self.next_index += 1;
        Ok(Some(frame))
    }

    async fn reap(&mut self) {
        match self.child.wait().await {
            Ok(status) if !status.success() => {
                tracing::warn!(
                    target: LOG_TARGET,
                    exit_code = ?status.code(),
                    frames = self.next_index,
                    "ffmpeg frame decoder exited with failure"
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(target: LOG_TARGET, error = %e, "failed to wait for ffmpeg");
            }
        }
    }
}

impl FrameSource for FfmpegFrameSource {
    fn next_frame(&mut self) -> BoxFuture<'_, Result<Option<VideoFrame>>> {
        self.read_frame().boxed()
    }
}

