use crate::decode::Waveform;
use crate::dsp::{estimate_tempo, FeatureExtractor, FrameFeatures};
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

/// Centered, Hann-windowed short-time analysis.
///
/// The signal is zero-padded by half a frame on both sides, giving `1 + len / hop` frames.
#[derive(Clone, Debug)]
pub struct StftFeatureExtractor {
    frame_len: usize,
    hop_len: usize,
    fmin_hz: f64,
    fmax_hz: f64,
    /// Pitch peaks must exceed this fraction of the frame's strongest bin.
    peak_threshold: f64,
}

impl Default for StftFeatureExtractor {
    fn default() -> Self {
        Self {
            frame_len: 2048,
            hop_len: 512,
            fmin_hz: 150.0,
            fmax_hz: 4000.0,
            peak_threshold: 0.1,
        }
    }
}

impl StftFeatureExtractor {
    pub fn new(frame_len: usize, hop_len: usize) -> Self {
        Self {
            frame_len: frame_len.max(4),
            hop_len: hop_len.max(1),
            ..Self::default()
        }
    }

    pub fn with_pitch_range(mut self, fmin_hz: f64, fmax_hz: f64) -> Self {
        self.fmin_hz = fmin_hz;
        self.fmax_hz = fmax_hz;
        self
    }

    fn frame_count(&self, n_samples: usize) -> usize {
        if n_samples == 0 {
            0
        } else {
            1 + n_samples / self.hop_len
        }
    }

    fn padded(&self, samples: &[f32]) -> Vec<f64> {
        let pad = self.frame_len / 2;
        let mut out = vec![0.0; samples.len() + 2 * pad];
        for (dst, src) in out[pad..].iter_mut().zip(samples) {
            *dst = f64::from(*src);
        }
        out
    }

    fn hann(&self) -> Vec<f64> {
        let n = self.frame_len as f64;
        (0..self.frame_len)
            .map(|i| 0.5 - 0.5 * (2.0 * std::f64::consts::PI * i as f64 / n).cos())
            .collect()
    }

    /// Strongest in-range spectral peak, refined by parabolic interpolation; `0.0` if unvoiced.
    fn pick_pitch(&self, mags: &[f64], sample_rate: f64) -> f64 {
        let max = mags.iter().copied().fold(0.0, f64::max);
        if max <= 0.0 || mags.len() < 3 {
            return 0.0;
        }
        let n_fft = self.frame_len as f64;
        let threshold = self.peak_threshold * max;
        let lo = ((self.fmin_hz * n_fft / sample_rate).ceil() as usize).max(1);
        let hi = ((self.fmax_hz * n_fft / sample_rate).floor() as usize).min(mags.len() - 2);

        let mut best: Option<(usize, f64)> = None;
        for k in lo..=hi {
            let m = mags[k];
            if m > threshold
                && m > mags[k - 1]
                && m >= mags[k + 1]
                && best.is_none_or(|(_, b)| m > b)
            {
                best = Some((k, m));
            }
        }

        match best {
            Some((k, _)) => {
                let (a, b, c) = (mags[k - 1], mags[k], mags[k + 1]);
                let denom = a - 2.0 * b + c;
                let shift = if denom.abs() > f64::EPSILON {
                    0.5 * (a - c) / denom
                } else {
                    0.0
                };
                (k as f64 + shift) * sample_rate / n_fft
            }
            None => 0.0,
        }
    }
}

fn zero_crossing_rate(frame: &[f64]) -> f64 {
    if frame.len() < 2 {
        return 0.0;
    }
    let crossings = frame
        .windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count();
    crossings as f64 / frame.len() as f64
}

fn spectral_centroid(mags: &[f64], bin_hz: f64) -> f64 {
    let total: f64 = mags.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    mags.iter()
        .enumerate()
        .map(|(k, m)| k as f64 * bin_hz * m)
        .sum::<f64>()
        / total
}

impl FeatureExtractor for StftFeatureExtractor {
    fn extract(&self, waveform: &Waveform) -> FrameFeatures {
        let n_frames = self.frame_count(waveform.samples.len());
        if n_frames == 0 || waveform.sample_rate_hz == 0 {
            return FrameFeatures::default();
        }

        let sample_rate = f64::from(waveform.sample_rate_hz);
        let bin_hz = sample_rate / self.frame_len as f64;
        let padded = self.padded(&waveform.samples);
        let window = self.hann();
        let fft = FftPlanner::<f64>::new().plan_fft_forward(self.frame_len);
        let n_bins = self.frame_len / 2 + 1;

        let mut features = FrameFeatures {
            pitch_hz: Vec::with_capacity(n_frames),
            rms: Vec::with_capacity(n_frames),
            zero_crossing_rate: Vec::with_capacity(n_frames),
            spectral_centroid_hz: Vec::with_capacity(n_frames),
            tempo_bpm: 0.0,
        };
        let mut onset_envelope = Vec::with_capacity(n_frames);
        let mut prev_log_mags: Option<Vec<f64>> = None;
        let mut buf = vec![Complex::new(0.0, 0.0); self.frame_len];

        for t in 0..n_frames {
            let start = t * self.hop_len;
            let frame = &padded[start..start + self.frame_len];

            let energy = frame.iter().map(|x| x * x).sum::<f64>() / self.frame_len as f64;
            features.rms.push(energy.sqrt());
            features.zero_crossing_rate.push(zero_crossing_rate(frame));

            for ((slot, x), w) in buf.iter_mut().zip(frame).zip(&window) {
                *slot = Complex::new(x * w, 0.0);
            }
            fft.process(&mut buf);
            let mags: Vec<f64> = buf[..n_bins].iter().map(|c| c.norm()).collect();

            features
                .spectral_centroid_hz
                .push(spectral_centroid(&mags, bin_hz));
            features.pitch_hz.push(self.pick_pitch(&mags, sample_rate));

            let log_mags: Vec<f64> = mags.iter().map(|m| m.ln_1p()).collect();
            let flux = match &prev_log_mags {
                Some(prev) => log_mags
                    .iter()
                    .zip(prev)
                    .map(|(cur, p)| (cur - p).max(0.0))
                    .sum(),
                None => 0.0,
            };
            onset_envelope.push(flux);
            prev_log_mags = Some(log_mags);
        }

        features.tempo_bpm = estimate_tempo(&onset_envelope, sample_rate / self.hop_len as f64);
        features
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, amplitude: f64, secs: f64, sample_rate: u32) -> Waveform {
        let n = (secs * f64::from(sample_rate)) as usize;
        let samples = (0..n)
            .map(|i| {
                let t = i as f64 / f64::from(sample_rate);
                (amplitude * (2.0 * std::f64::consts::PI * freq * t).sin()) as f32
            })
            .collect();
        Waveform {
            samples,
            sample_rate_hz: sample_rate,
        }
    }

    #[test]
    fn frame_count_matches_centered_framing() {
        let ex = StftFeatureExtractor::default();
        let wave = sine(220.0, 0.5, 1.0, 22_050);
        let f = ex.extract(&wave);
        assert_eq!(f.rms.len(), 1 + 22_050 / 512);
        assert_eq!(f.pitch_hz.len(), f.rms.len());
        assert_eq!(f.zero_crossing_rate.len(), f.rms.len());
        assert_eq!(f.spectral_centroid_hz.len(), f.rms.len());
    }

    #[test]
    fn sine_descriptors_are_plausible() {
        let ex = StftFeatureExtractor::default();
        let f = ex.extract(&sine(440.0, 0.5, 1.0, 22_050));
        let mid = f.rms.len() / 2;

        assert!((f.rms[mid] - 0.5 / 2f64.sqrt()).abs() < 0.01, "rms {}", f.rms[mid]);
        assert!(
            (f.zero_crossing_rate[mid] - 880.0 / 22_050.0).abs() < 0.003,
            "zcr {}",
            f.zero_crossing_rate[mid]
        );
        assert!((f.pitch_hz[mid] - 440.0).abs() < 5.0, "pitch {}", f.pitch_hz[mid]);
        assert!(
            (f.spectral_centroid_hz[mid] - 440.0).abs() < 60.0,
            "centroid {}",
            f.spectral_centroid_hz[mid]
        );
    }

    #[test]
    fn pitch_below_range_is_unvoiced() {
        let ex = StftFeatureExtractor::default();
        let f = ex.extract(&sine(60.0, 0.5, 0.5, 22_050));
        let mid = f.pitch_hz.len() / 2;
        assert_eq!(f.pitch_hz[mid], 0.0);
    }

    #[test]
    fn silence_is_all_zero() {
        let ex = StftFeatureExtractor::default();
        let wave = Waveform {
            samples: vec![0.0; 4096],
            sample_rate_hz: 22_050,
        };
        let f = ex.extract(&wave);
        assert!(f.rms.iter().all(|v| *v == 0.0));
        assert!(f.pitch_hz.iter().all(|v| *v == 0.0));
        assert!(f.spectral_centroid_hz.iter().all(|v| *v == 0.0));
        assert_eq!(f.tempo_bpm, 0.0);
    }

    #[test]
    fn empty_waveform_has_no_frames() {
        let ex = StftFeatureExtractor::default();
        let f = ex.extract(&Waveform {
            samples: Vec::new(),
            sample_rate_hz: 22_050,
        });
        assert_eq!(f, FrameFeatures::default());
    }
}
