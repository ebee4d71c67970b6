//! Fixed-threshold interpretation of acoustic statistics.
//!
//! Every comparison is strict, so a value sitting exactly on a threshold falls into the lower
//! bracket (pitch 180.0 is "moderate", not "high").

use serde::{Deserialize, Serialize};

/// Summary statistics the rules are evaluated on.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct AcousticStats {
    pub pitch_mean: f64,
    pub pitch_std: f64,
    pub energy_mean: f64,
    /// Reported, not interpreted.
    pub energy_std: f64,
    pub zcr_mean: f64,
    pub spectral_centroid_mean: f64,
    /// Reported, not interpreted.
    pub tempo_bpm: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Interpretation {
    pub pitch: String,
    pub energy: String,
    pub speaking_rate: String,
    pub spectral: String,
    pub overall: String,
    /// 0..=4 tally behind `overall`.
    pub confidence_score: u8,
}

pub const OVERALL_CONFIDENT: &str = "confident and engaging";
pub const OVERALL_MODERATE: &str = "moderate confidence";
pub const OVERALL_WEAK: &str = "room for improvement in vocal presence";

pub fn interpret(stats: &AcousticStats) -> Interpretation {
    let confidence_score = confidence_score(stats);
    Interpretation {
        pitch: describe_pitch(stats.pitch_mean, stats.pitch_std),
        energy: describe_energy(stats.energy_mean).to_owned(),
        speaking_rate: describe_rate(stats.zcr_mean).to_owned(),
        spectral: describe_spectral(stats.spectral_centroid_mean).to_owned(),
        overall: describe_overall(confidence_score).to_owned(),
        confidence_score,
    }
}

pub fn describe_pitch(mean_hz: f64, std_hz: f64) -> String {
    let band = if mean_hz > 180.0 {
        "high (possible excitement or stress)"
    } else if mean_hz > 120.0 {
        "moderate (neutral to confident)"
    } else {
        "low (calm or possibly monotone)"
    };

    let variation = if std_hz > 30.0 {
        " with high variation (expressive)"
    } else if std_hz < 15.0 {
        " with low variation (monotone)"
    } else {
        ""
    };

    format!("{band}{variation}")
}

pub fn describe_energy(mean_rms: f64) -> &'static str {
    if mean_rms > 0.05 {
        "high (confident and clear)"
    } else if mean_rms > 0.02 {
        "moderate (balanced)"
    } else {
        "low (soft or hesitant)"
    }
}

pub fn describe_rate(mean_zcr: f64) -> &'static str {
    if mean_zcr > 0.1 {
        "fast (energetic or nervous)"
    } else if mean_zcr > 0.05 {
        "moderate (comfortable pace)"
    } else {
        "slow (deliberate or uncertain)"
    }
}

pub fn describe_spectral(mean_centroid_hz: f64) -> &'static str {
    if mean_centroid_hz > 3000.0 {
        "bright (clear articulation)"
    } else if mean_centroid_hz > 2000.0 {
        "balanced"
    } else {
        "dark (muffled or low resonance)"
    }
}

pub fn confidence_score(stats: &AcousticStats) -> u8 {
    let checks = [
        120.0 < stats.pitch_mean && stats.pitch_mean < 200.0,
        stats.energy_mean > 0.03,
        0.05 < stats.zcr_mean && stats.zcr_mean < 0.1,
        stats.pitch_std > 15.0,
    ];
    checks.iter().filter(|passed| **passed).count() as u8
}

pub fn describe_overall(score: u8) -> &'static str {
    match score {
        3.. => OVERALL_CONFIDENT,
        2 => OVERALL_MODERATE,
        _ => OVERALL_WEAK,
    }
}
