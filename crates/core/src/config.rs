use serde::{Deserialize, Serialize};
use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
};

pub const SERVICE_NAME: &str = "EmotiSense";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &["mp4"];
pub const DEFAULT_FRAME_STRIDE: u64 = 5;
pub const DEFAULT_TIMELINE_SEGMENTS: usize = 10;
pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 22_050;
pub const DEFAULT_DETECTOR_BACKEND: &str = "opencv";
pub const DEFAULT_CLASSIFIER_COMMAND: &str = "python3";
pub const DEFAULT_CLASSIFIER_SCRIPT: &str = "sidecar/emotion_classifier.py";
pub const ENV_BIND_ADDR: &str = "EMOTISENSE_BIND";
pub const ENV_MAX_UPLOAD_BYTES: &str = "EMOTISENSE_MAX_UPLOAD_BYTES";
pub const ENV_SCRATCH_DIR: &str = "EMOTISENSE_SCRATCH_DIR";
pub const ENV_FRAME_STRIDE: &str = "EMOTISENSE_FRAME_STRIDE";
pub const ENV_CLASSIFIER_COMMAND: &str = "EMOTISENSE_CLASSIFIER_CMD";
pub const ENV_CLASSIFIER_SCRIPT: &str = "EMOTISENSE_CLASSIFIER_SCRIPT";
pub const ENV_DETECTOR_BACKEND: &str = "EMOTISENSE_DETECTOR_BACKEND";

/// Knobs of the analysis itself, independent of how the video arrived.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Only frames whose zero-based index is divisible by this are classified.
    pub frame_stride: u64,
    pub timeline_segments: usize,
    pub sample_rate_hz: u32,
}

impl AnalysisConfig {
    pub fn new(
        frame_stride: u64,
        timeline_segments: usize,
        sample_rate_hz: u32,
    ) -> Result<Self, ConfigError> {
        if frame_stride == 0 {
            return Err(ConfigError::ZeroFrameStride);
        }
        if timeline_segments == 0 {
            return Err(ConfigError::ZeroTimelineSegments);
        }
        if sample_rate_hz == 0 {
            return Err(ConfigError::ZeroSampleRate);
        }
        Ok(Self {
            frame_stride,
            timeline_segments,
            sample_rate_hz,
        })
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            frame_stride: DEFAULT_FRAME_STRIDE,
            timeline_segments: DEFAULT_TIMELINE_SEGMENTS,
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClassifierConfig {
    pub command: String,
    pub args: Vec<String>,
    pub detector_backend: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_CLASSIFIER_COMMAND.to_owned(),
            args: vec![DEFAULT_CLASSIFIER_SCRIPT.to_owned()],
            detector_backend: DEFAULT_DETECTOR_BACKEND.to_owned(),
        }
    }
}

/// Upload acceptance rules for the `/analyze` endpoint.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_bytes: usize,
    allowed_extensions: Vec<String>,
}

impl UploadPolicy {
    pub fn new<I, S>(max_bytes: usize, allowed_extensions: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if max_bytes == 0 {
            return Err(ConfigError::ZeroUploadLimit);
        }
        let allowed_extensions: Vec<String> = allowed_extensions
            .into_iter()
            .map(|e| e.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        if allowed_extensions.is_empty() {
            return Err(ConfigError::NoAllowedExtensions);
        }
        Ok(Self {
            max_bytes,
            allowed_extensions,
        })
    }

    /// Matches on the text after the last dot: `clip.MP4` and the bare `.mp4` are accepted,
    /// `clip` and `clip.avi` are not.
    pub fn allows(&self, filename: &str) -> bool {
        match filename.rsplit_once('.') {
            Some((_, ext)) => {
                let ext = ext.to_ascii_lowercase();
                self.allowed_extensions.iter().any(|a| *a == ext)
            }
            None => false,
        }
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.allowed_extensions
    }
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|e| (*e).to_owned())
                .collect(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub upload: UploadPolicy,
    pub scratch_dir: PathBuf,
    pub analysis: AnalysisConfig,
    pub classifier: ClassifierConfig,
}

impl AppConfig {
    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("frame stride must be > 0")]
    ZeroFrameStride,
    #[error("timeline must have at least one segment")]
    ZeroTimelineSegments,
    #[error("sample rate must be > 0 Hz")]
    ZeroSampleRate,
    #[error("upload limit must be > 0 bytes")]
    ZeroUploadLimit,
    #[error("at least one upload extension must be allowed")]
    NoAllowedExtensions,
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

pub trait Env {
    fn var(&self, key: &str) -> Option<String>;
}

#[derive(Clone, Debug, Default)]
pub struct StdEnv;

impl Env for StdEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Clone, Debug, Default)]
pub struct MapEnv {
    vars: std::collections::BTreeMap<String, String>,
}

impl MapEnv {
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl Env for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn resolve_string_with_default(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
    default: &str,
) -> String {
    match cli_value {
        Some(v) => v,
        None => env.var(env_key).unwrap_or_else(|| default.to_owned()),
    }
}

pub fn resolve_optional_string(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
) -> Option<String> {
    match cli_value {
        Some(v) => Some(v),
        None => env.var(env_key),
    }
}

/// CLI value, then `env_key` parsed as `T`, then `default`.
pub fn resolve_parsed<T>(
    cli_value: Option<T>,
    env_key: &str,
    env: &impl Env,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    if let Some(v) = cli_value {
        return Ok(v);
    }
    match env.var(env_key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue {
                key: env_key.to_owned(),
                value: raw,
            }),
        None => Ok(default),
    }
}
