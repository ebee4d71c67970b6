use crate::decode::{DecodeError, Result, VideoInfo};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Build [`VideoInfo`] from `ffprobe -print_format json -show_format -show_streams` output.
pub fn parse_probe_json(raw: &[u8]) -> Result<VideoInfo> {
    let probe: ProbeOutput =
        serde_json::from_slice(raw).map_err(|e| DecodeError::InvalidProbe(e.to_string()))?;

    let has_audio = probe
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or(DecodeError::NoVideoStream)?;

    let width = video.width.unwrap_or(0);
    let height = video.height.unwrap_or(0);
    if width == 0 || height == 0 {
        return Err(DecodeError::InvalidProbe(format!(
            "video stream has no usable dimensions ({width}x{height})"
        )));
    }

    let fps = [video.r_frame_rate.as_deref(), video.avg_frame_rate.as_deref()]
        .into_iter()
        .flatten()
        .map(parse_frame_rate)
        .find(|fps| *fps > 0.0)
        .unwrap_or(0.0);

    let duration = video
        .duration
        .as_deref()
        .or_else(|| probe.format.as_ref().and_then(|f| f.duration.as_deref()))
        .and_then(|d| d.trim().parse::<f64>().ok())
        .unwrap_or(0.0);

    let total_frames = video
        .nb_frames
        .as_deref()
        .and_then(|n| n.trim().parse::<u64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or_else(|| (duration * fps).round().max(0.0) as u64);

    Ok(VideoInfo {
        width,
        height,
        fps,
        total_frames,
        has_audio,
    })
}

/// Parse `30000/1001` or `25` into frames per second; malformed or `0/0` rates are `0.0`.
pub fn parse_frame_rate(raw: &str) -> f64 {
    let raw = raw.trim();
    if let Some((num, den)) = raw.split_once('/') {
        let num: f64 = num.trim().parse().unwrap_or(0.0);
        let den: f64 = den.trim().parse().unwrap_or(0.0);
        if den == 0.0 {
            return 0.0;
        }
        return num / den;
    }
    raw.parse().unwrap_or(0.0)
}
