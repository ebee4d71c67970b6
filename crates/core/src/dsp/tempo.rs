const MIN_BPM: f64 = 30.0;
const MAX_BPM: f64 = 300.0;
const PRIOR_CENTER_BPM: f64 = 120.0;
/// Width of the log-normal tempo prior, in octaves.
const PRIOR_OCTAVES: f64 = 1.0;

/// Global tempo from an onset-strength envelope sampled at `frame_rate` frames per second.
///
/// Picks the autocorrelation lag in `[30, 300]` BPM with the highest score after weighting by a
/// log-normal prior centred on 120 BPM. Returns `0.0` when the envelope carries no onsets.
pub fn estimate_tempo(envelope: &[f64], frame_rate: f64) -> f64 {
    if envelope.len() < 2 || frame_rate <= 0.0 {
        return 0.0;
    }

    let min_lag = ((60.0 * frame_rate / MAX_BPM).ceil() as usize).max(1);
    let max_lag = ((60.0 * frame_rate / MIN_BPM).floor() as usize).min(envelope.len() - 1);
    if min_lag > max_lag {
        return 0.0;
    }

    let mut best: Option<(f64, f64)> = None;
    for lag in min_lag..=max_lag {
        let ac: f64 = envelope
            .iter()
            .zip(&envelope[lag..])
            .map(|(a, b)| a * b)
            .sum();
        let bpm = 60.0 * frame_rate / lag as f64;
        let octaves = (bpm / PRIOR_CENTER_BPM).log2() / PRIOR_OCTAVES;
        let score = ac * (-0.5 * octaves * octaves).exp();
        if score > 0.0 && best.is_none_or(|(_, s)| score > s) {
            best = Some((bpm, score));
        }
    }

    best.map(|(bpm, _)| bpm).unwrap_or(0.0)
}
