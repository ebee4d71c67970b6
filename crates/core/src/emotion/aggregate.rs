use crate::emotion::{FacialAnalysis, FacialSummary, FrameEmotion, FrameOutcome, TimelineSegment};
use crate::util::round_to;
use std::collections::BTreeMap;

pub const NEUTRAL_LABEL: &str = "neutral";
pub const NO_FACE_ERROR: &str = "No faces detected in video";

/// Reduce sampled outcomes for one video into a [`FacialAnalysis`].
///
/// Only [`FrameOutcome::Classified`] frames count. Without any, the result is
/// [`FacialAnalysis::NoFace`].
pub fn aggregate(
    outcomes: Vec<FrameOutcome>,
    duration_secs: f64,
    total_frames: u64,
    segments: usize,
) -> FacialAnalysis {
    let frames: Vec<FrameEmotion> = outcomes
        .into_iter()
        .filter_map(|o| match o {
            FrameOutcome::Classified(f) => Some(f),
            FrameOutcome::Skipped { .. } => None,
        })
        .collect();

    if frames.is_empty() {
        return FacialAnalysis::NoFace {
            error: NO_FACE_ERROR.to_owned(),
            duration: round_to(duration_secs, 2),
            frames_analyzed: 0,
        };
    }

    let counts = count_in_order(frames.iter().map(|f| f.dominant_label.as_str()));
    let total = frames.len() as f64;
    let label_percentages = counts
        .iter()
        .map(|(label, n)| ((*label).to_owned(), *n as f64 / total * 100.0))
        .collect();
    let dominant_label = pick_mode(&counts)
        .unwrap_or(NEUTRAL_LABEL)
        .to_owned();

    let average_scores = average_scores(&frames);
    let timeline = build_timeline(&frames, duration_secs, segments);

    FacialAnalysis::Detected(FacialSummary {
        duration: round_to(duration_secs, 2),
        frames_analyzed: frames.len(),
        total_frames,
        dominant_label,
        label_percentages,
        average_scores,
        timeline,
        frames,
    })
}

/// Most frequent label; ties go to the label seen first.
pub fn mode_label<'a>(labels: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    let counts = count_in_order(labels);
    pick_mode(&counts)
}

fn count_in_order<'a>(labels: impl IntoIterator<Item = &'a str>) -> Vec<(&'a str, usize)> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for label in labels {
        match counts.iter_mut().find(|(l, _)| *l == label) {
            Some((_, n)) => *n += 1,
            None => counts.push((label, 1)),
        }
    }
    counts
}

fn pick_mode<'a>(counts: &[(&'a str, usize)]) -> Option<&'a str> {
    let mut best: Option<(&str, usize)> = None;
    for &(label, n) in counts {
        if best.is_none_or(|(_, b)| n > b) {
            best = Some((label, n));
        }
    }
    best.map(|(label, _)| label)
}

/// Mean score per label over every frame reporting that label, rounded to 2 decimals.
fn average_scores(frames: &[FrameEmotion]) -> BTreeMap<String, f64> {
    let mut sums: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for frame in frames {
        for (label, score) in &frame.per_label_score {
            let entry = sums.entry(label.as_str()).or_insert((0.0, 0));
            entry.0 += score;
            entry.1 += 1;
        }
    }
    sums.into_iter()
        .map(|(label, (sum, n))| (label.to_owned(), round_to(sum / n as f64, 2)))
        .collect()
}

/// Split `[0, duration)` into `segments` equal half-open buckets labelled by their mode.
pub fn build_timeline(
    frames: &[FrameEmotion],
    duration_secs: f64,
    segments: usize,
) -> Vec<TimelineSegment> {
    if segments == 0 {
        return Vec::new();
    }
    let segment_len = duration_secs / segments as f64;

    (0..segments)
        .map(|i| {
            let start = i as f64 * segment_len;
            let end = (i + 1) as f64 * segment_len;
            let label = mode_label(
                frames
                    .iter()
                    .filter(|f| start <= f.timestamp_seconds && f.timestamp_seconds < end)
                    .map(|f| f.dominant_label.as_str()),
            )
            .unwrap_or(NEUTRAL_LABEL);

            TimelineSegment {
                segment_index: i + 1,
                start_time: round_to(start, 2),
                end_time: round_to(end, 2),
                dominant_label: label.to_owned(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(index: u64, t: f64, label: &str, scores: &[(&str, f64)]) -> FrameOutcome {
        FrameOutcome::Classified(FrameEmotion {
            frame_index: index,
            timestamp_seconds: t,
            dominant_label: label.to_owned(),
            per_label_score: scores.iter().map(|(l, s)| ((*l).to_owned(), *s)).collect(),
        })
    }

    fn uniform_scores() -> Vec<(&'static str, f64)> {
        vec![
            ("angry", 1.0),
            ("disgust", 1.0),
            ("fear", 1.0),
            ("happy", 40.0),
            ("neutral", 40.0),
            ("sad", 16.0),
            ("surprise", 1.0),
        ]
    }

    #[test]
    fn empty_input_is_no_face() {
        let result = aggregate(Vec::new(), 12.345, 370, 10);
        assert_eq!(
            result,
            FacialAnalysis::NoFace {
                error: NO_FACE_ERROR.to_owned(),
                duration: 12.35,
                frames_analyzed: 0,
            }
        );
    }

    #[test]
    fn only_skipped_frames_is_no_face() {
        let outcomes = vec![FrameOutcome::Skipped {
            frame_index: 0,
            reason: "no face detected".to_owned(),
        }];
        assert!(aggregate(outcomes, 1.0, 30, 10).summary().is_none());
    }

    #[test]
    fn percentages_sum_to_one_hundred() {
        let s = uniform_scores();
        let outcomes = vec![
            frame(0, 0.0, "happy", &s),
            frame(5, 0.5, "sad", &s),
            frame(10, 1.0, "happy", &s),
            frame(15, 1.5, "neutral", &s),
            frame(20, 2.0, "fear", &s),
            frame(25, 2.5, "happy", &s),
        ];
        let result = aggregate(outcomes, 3.0, 90, 10);
        let summary = result.summary().expect("detected");

        let total: f64 = summary.label_percentages.values().sum();
        assert!((total - 100.0).abs() < 1e-9);
        assert!((summary.percentage_of("happy") - 50.0).abs() < 1e-9);
        assert_eq!(summary.dominant_label, "happy");
        assert_eq!(summary.frames_analyzed, 6);
        assert_eq!(summary.total_frames, 90);
    }

    #[test]
    fn mode_ties_go_to_first_seen() {
        assert_eq!(mode_label(["sad", "happy", "happy", "sad"]), Some("sad"));
        assert_eq!(mode_label(["happy", "sad", "sad"]), Some("sad"));
        assert_eq!(mode_label(Vec::<&str>::new()), None);
    }

    #[test]
    fn averages_cover_every_reported_label() {
        let outcomes = vec![
            frame(0, 0.0, "happy", &[("happy", 90.0), ("sad", 10.0), ("fear", 0.0)]),
            frame(5, 0.5, "happy", &[("happy", 80.0), ("sad", 15.0), ("fear", 5.0)]),
            frame(10, 1.0, "happy", &[("happy", 70.0), ("sad", 20.0), ("fear", 10.333)]),
        ];
        let summary = aggregate(outcomes, 2.0, 60, 10)
            .summary()
            .cloned()
            .expect("detected");

        assert_eq!(
            summary.average_scores.keys().collect::<Vec<_>>(),
            vec!["fear", "happy", "sad"]
        );
        assert_eq!(summary.average_scores["happy"], 80.0);
        assert_eq!(summary.average_scores["sad"], 15.0);
        assert_eq!(summary.average_scores["fear"], 5.11);
        assert_eq!(summary.label_percentages.len(), 1);
    }

    #[test]
    fn timeline_has_contiguous_fixed_segments() {
        let s = uniform_scores();
        let outcomes = vec![frame(0, 0.1, "happy", &s), frame(90, 9.0, "sad", &s)];
        let summary = aggregate(outcomes, 10.0, 100, 10)
            .summary()
            .cloned()
            .expect("detected");

        assert_eq!(summary.timeline.len(), 10);
        for (i, seg) in summary.timeline.iter().enumerate() {
            assert_eq!(seg.segment_index, i + 1);
            assert!((seg.start_time - i as f64).abs() < 1e-9);
            if let Some(next) = summary.timeline.get(i + 1) {
                assert_eq!(seg.end_time, next.start_time);
            }
        }
        assert_eq!(summary.timeline[0].start_time, 0.0);
        assert_eq!(summary.timeline[9].end_time, 10.0);
        assert_eq!(summary.timeline[0].dominant_label, "happy");
        assert_eq!(summary.timeline[9].dominant_label, "sad");
        assert!(summary.timeline[1..9]
            .iter()
            .all(|seg| seg.dominant_label == NEUTRAL_LABEL));
    }

    #[test]
    fn segment_boundaries_are_half_open() {
        let s = uniform_scores();
        let frames: Vec<FrameEmotion> = [frame(0, 1.0, "angry", &s), frame(1, 10.0, "fear", &s)]
            .into_iter()
            .filter_map(|o| o.classified().cloned())
            .collect();
        let timeline = build_timeline(&frames, 10.0, 10);

        assert_eq!(timeline[0].dominant_label, NEUTRAL_LABEL);
        assert_eq!(timeline[1].dominant_label, "angry");
        // t == duration lies outside [0, duration).
        assert!(timeline.iter().all(|seg| seg.dominant_label != "fear"));
    }

    #[test]
    fn odd_durations_stay_contiguous_after_rounding() {
        let timeline = build_timeline(&[], 7.777, 10);
        for pair in timeline.windows(2) {
            assert_eq!(pair[0].end_time, pair[1].start_time);
        }
        assert_eq!(timeline[9].end_time, 7.78);
    }

    #[test]
    fn serializes_with_wire_names() {
        let s = uniform_scores();
        let result = aggregate(vec![frame(0, 0.0, "happy", &s)], 1.0, 30, 10);
        let json = serde_json::to_value(&result).expect("serializes");
        assert_eq!(json["dominant_emotion"], "happy");
        assert_eq!(json["emotion_percentages"]["happy"], 100.0);
        assert_eq!(json["timeline"][0]["segment"], 1);
        assert_eq!(json["timeline"][0]["emotion"], "happy");
        assert_eq!(json["emotions_detected"][0]["frame"], 0);
        assert!(json.get("error").is_none());

        let none = serde_json::to_value(aggregate(Vec::new(), 1.0, 30, 10)).expect("serializes");
        assert_eq!(none["error"], NO_FACE_ERROR);
        assert_eq!(none["frames_analyzed"], 0);
    }
}
