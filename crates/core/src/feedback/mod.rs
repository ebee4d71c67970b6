//! Coaching feedback composed from the facial and vocal results.
//!
//! [`compose`] is pure: the same pair of analyses always yields the same report, and
//! recommendations are appended in a fixed order without deduplication.

mod insights;

use crate::emotion::{FacialAnalysis, FacialSummary};
use crate::voice::{AcousticSummary, VoiceAnalysis};
use serde::{Deserialize, Serialize};

pub use insights::{insight_for, EmotionInsight};

pub const UNANALYZABLE_SUMMARY: &str =
    "Unable to analyze video. Please ensure the video contains visible faces and clear audio.";

const CONCLUSION_STRONG: &str =
    "Overall, you demonstrated strong communication skills with a few areas for refinement.";
const CONCLUSION_WEAK: &str =
    "There are several areas where you can improve your nonverbal communication for greater impact.";
const CONCLUSION_BALANCED: &str =
    "You showed balanced nonverbal communication with both strengths and opportunities for growth.";

/// Distinct observed labels above which expression counts as inconsistent.
const CONSISTENT_LABEL_LIMIT: usize = 5;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedbackItem {
    pub category: String,
    pub observation: String,
    pub insight: String,
    pub tip: String,
}

impl FeedbackItem {
    fn new(category: &str, observation: impl Into<String>, insight: &str, tip: &str) -> Self {
        Self {
            category: category.to_owned(),
            observation: observation.into(),
            insight: insight.to_owned(),
            tip: tip.to_owned(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recommendation {
    pub title: String,
    pub description: String,
}

impl Recommendation {
    fn new(title: &str, description: &str) -> Self {
        Self {
            title: title.to_owned(),
            description: description.to_owned(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedbackReport {
    pub summary: String,
    pub facial_feedback: Vec<FeedbackItem>,
    pub voice_feedback: Vec<FeedbackItem>,
    pub recommendations: Vec<Recommendation>,
    pub strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
}

/// Items plus the strengths and improvements one modality contributes.
#[derive(Default)]
struct Branch {
    items: Vec<FeedbackItem>,
    strengths: Vec<String>,
    improvements: Vec<String>,
}

pub fn compose(facial: &FacialAnalysis, voice: &VoiceAnalysis) -> FeedbackReport {
    let (face, tone) = match (facial.summary(), voice.summary()) {
        (None, None) => {
            return FeedbackReport {
                summary: UNANALYZABLE_SUMMARY.to_owned(),
                ..FeedbackReport::default()
            }
        }
        pair => pair,
    };

    let mut report = FeedbackReport::default();

    if let Some(face) = face {
        let branch = facial_branch(face);
        report.facial_feedback = branch.items;
        report.strengths.extend(branch.strengths);
        report.areas_for_improvement.extend(branch.improvements);
    }
    if let Some(tone) = tone {
        let branch = voice_branch(tone);
        report.voice_feedback = branch.items;
        report.strengths.extend(branch.strengths);
        report.areas_for_improvement.extend(branch.improvements);
    }

    report.summary = summarize(
        face,
        tone,
        report.strengths.len(),
        report.areas_for_improvement.len(),
    );
    report.recommendations = recommend(face, tone);
    report
}

fn facial_branch(face: &FacialSummary) -> Branch {
    let mut branch = Branch::default();
    let label = face.dominant_label.as_str();

    if let Some(insight) = insight_for(label) {
        branch.items.push(FeedbackItem::new(
            "Dominant Emotion",
            format!(
                "Your dominant emotion was '{label}' ({:.1}% of the time).",
                face.percentage_of(label)
            ),
            insight.insight,
            insight.tip,
        ));
        if insights::is_favourable(label) {
            branch.strengths.push(format!("Maintained {label} expression"));
        } else {
            branch
                .improvements
                .push(format!("Work on managing {label} expressions"));
        }
    }

    if face.label_percentages.len() > CONSISTENT_LABEL_LIMIT {
        branch.items.push(FeedbackItem::new(
            "Emotional Consistency",
            "Your emotions varied significantly throughout the video.",
            "This could indicate natural expressiveness or lack of emotional control.",
            "For professional settings, aim for more consistent emotional expression.",
        ));
        branch
            .improvements
            .push("Practice emotional consistency".to_owned());
    } else {
        branch
            .strengths
            .push("Consistent emotional expression".to_owned());
    }

    let happy = face.percentage_of("happy");
    if happy > 40.0 {
        branch
            .strengths
            .push("Strong positive emotional presence".to_owned());
    } else if happy < 10.0 {
        branch
            .improvements
            .push("Consider showing more positive engagement".to_owned());
    }

    branch
}

fn voice_branch(tone: &AcousticSummary) -> Branch {
    let mut branch = Branch::default();

    branch.items.push(FeedbackItem::new(
        "Overall Vocal Tone",
        format!("Your vocal tone was {}.", tone.overall_tone),
        "Vocal tone significantly impacts how your message is received.",
        "Continue developing vocal confidence through practice and preparation.",
    ));
    if tone.overall_tone.contains("confident") {
        branch.strengths.push("Confident vocal tone".to_owned());
    } else {
        branch
            .improvements
            .push("Build more vocal confidence".to_owned());
    }

    let pitch = tone.pitch.interpretation.to_lowercase();
    if pitch.contains("monotone") {
        branch.items.push(FeedbackItem::new(
            "Pitch Variation",
            "Your pitch variation was limited.",
            "Monotone delivery can make content less engaging.",
            "Practice emphasizing key words and varying your pitch to maintain interest.",
        ));
        branch.improvements.push("Increase pitch variation".to_owned());
    } else if pitch.contains("expressive") {
        branch.strengths.push("Good pitch variation".to_owned());
    }

    let energy = tone.energy.interpretation.to_lowercase();
    if energy.contains("confident") {
        branch
            .strengths
            .push("Clear and confident vocal energy".to_owned());
    } else if energy.contains("soft") || energy.contains("hesitant") {
        branch
            .improvements
            .push("Project voice with more energy".to_owned());
    }

    let rate = tone.speaking_rate.interpretation.to_lowercase();
    if rate.contains("fast") {
        branch.items.push(FeedbackItem::new(
            "Speaking Rate",
            "You spoke at a fast pace.",
            "Fast speaking can indicate nervousness or enthusiasm.",
            "Slow down and add strategic pauses for emphasis and clarity.",
        ));
        branch.improvements.push("Moderate speaking pace".to_owned());
    } else if rate.contains("slow") {
        branch.items.push(FeedbackItem::new(
            "Speaking Rate",
            "You spoke at a slower pace.",
            "Slow speaking can be deliberate or indicate uncertainty.",
            "Ensure your pace matches your message and maintains engagement.",
        ));
    } else {
        branch
            .strengths
            .push("Comfortable speaking pace".to_owned());
    }

    branch
}

fn summarize(
    face: Option<&FacialSummary>,
    tone: Option<&AcousticSummary>,
    strengths: usize,
    improvements: usize,
) -> String {
    let mut clauses = Vec::with_capacity(2);
    if let Some(face) = face {
        clauses.push(format!(
            "You appeared {} throughout most of the video",
            face.dominant_label
        ));
    }
    if let Some(tone) = tone {
        clauses.push(format!("your vocal tone was {}", tone.overall_tone));
    }

    let conclusion = match strengths.cmp(&improvements) {
        std::cmp::Ordering::Greater => CONCLUSION_STRONG,
        std::cmp::Ordering::Less => CONCLUSION_WEAK,
        std::cmp::Ordering::Equal => CONCLUSION_BALANCED,
    };

    if clauses.is_empty() {
        conclusion.to_owned()
    } else {
        format!("{}. {conclusion}", capitalize(&clauses.join(". ")))
    }
}

fn recommend(face: Option<&FacialSummary>, tone: Option<&AcousticSummary>) -> Vec<Recommendation> {
    let mut out = Vec::new();

    if let Some(face) = face {
        if insights::is_tense(&face.dominant_label) {
            out.push(Recommendation::new(
                "Practice Relaxation Techniques",
                "Before important conversations, take deep breaths and practice positive visualization to appear more calm and confident.",
            ));
        }
        if face.percentage_of("happy") < 20.0 {
            out.push(Recommendation::new(
                "Increase Positive Expressions",
                "Smile more naturally and show genuine interest. This makes you more approachable and engaging.",
            ));
        }
    }

    if let Some(tone) = tone {
        if tone.pitch.interpretation.to_lowercase().contains("monotone") {
            out.push(Recommendation::new(
                "Vary Your Pitch",
                "Practice reading aloud with exaggerated emphasis. Gradually incorporate natural variation into your speaking.",
            ));
        }
        if tone.energy.interpretation.to_lowercase().contains("soft") {
            out.push(Recommendation::new(
                "Project Your Voice",
                "Speak from your diaphragm, not your throat. Practice projecting your voice to fill the room confidently.",
            ));
        }
    }

    out.push(Recommendation::new(
        "Record and Review",
        "Regularly record yourself in practice sessions and review your nonverbal communication. Self-awareness is key to improvement.",
    ));
    out.push(Recommendation::new(
        "Practice with Feedback",
        "Present to friends or colleagues and ask for honest feedback about your body language and tone.",
    ));
    out
}

/// Upper-case the first character and lower-case the rest.
fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::NO_FACE_ERROR;
    use crate::voice::{summarize as summarize_voice, AcousticStats};
    use std::collections::BTreeMap;

    fn face(dominant: &str, percentages: &[(&str, f64)]) -> FacialAnalysis {
        FacialAnalysis::Detected(FacialSummary {
            duration: 10.0,
            frames_analyzed: 20,
            total_frames: 100,
            dominant_label: dominant.to_owned(),
            label_percentages: percentages
                .iter()
                .map(|(l, p)| ((*l).to_owned(), *p))
                .collect(),
            average_scores: BTreeMap::new(),
            timeline: Vec::new(),
            frames: Vec::new(),
        })
    }

    fn no_face() -> FacialAnalysis {
        FacialAnalysis::NoFace {
            error: NO_FACE_ERROR.to_owned(),
            duration: 3.0,
            frames_analyzed: 0,
        }
    }

    fn voice(stats: AcousticStats) -> VoiceAnalysis {
        VoiceAnalysis::Analyzed(summarize_voice(&stats, 10.0))
    }

    fn confident_voice() -> VoiceAnalysis {
        voice(AcousticStats {
            pitch_mean: 150.0,
            pitch_std: 35.0,
            energy_mean: 0.06,
            zcr_mean: 0.07,
            spectral_centroid_mean: 2500.0,
            ..Default::default()
        })
    }

    fn titles(report: &FeedbackReport) -> Vec<&str> {
        report
            .recommendations
            .iter()
            .map(|r| r.title.as_str())
            .collect()
    }

    #[test]
    fn both_missing_gives_only_the_unanalyzable_summary() {
        let report = compose(&no_face(), &VoiceAnalysis::no_audio());
        assert_eq!(report.summary, UNANALYZABLE_SUMMARY);
        assert!(report.facial_feedback.is_empty());
        assert!(report.voice_feedback.is_empty());
        assert!(report.recommendations.is_empty());
        assert!(report.strengths.is_empty());
        assert!(report.areas_for_improvement.is_empty());
    }

    #[test]
    fn happy_face_and_confident_voice() {
        let report = compose(
            &face("happy", &[("happy", 60.0), ("neutral", 40.0)]),
            &confident_voice(),
        );

        assert_eq!(report.facial_feedback.len(), 1);
        assert_eq!(
            report.facial_feedback[0].observation,
            "Your dominant emotion was 'happy' (60.0% of the time)."
        );
        assert_eq!(
            report.strengths,
            vec![
                "Maintained happy expression",
                "Consistent emotional expression",
                "Strong positive emotional presence",
                "Confident vocal tone",
                "Good pitch variation",
                "Clear and confident vocal energy",
                "Comfortable speaking pace",
            ]
        );
        assert!(report.areas_for_improvement.is_empty());
        assert_eq!(
            report.summary,
            format!(
                "You appeared happy throughout most of the video. your vocal tone was confident and engaging. {CONCLUSION_STRONG}"
            )
        );
        assert_eq!(titles(&report), vec!["Record and Review", "Practice with Feedback"]);
    }

    #[test]
    fn tense_face_with_quiet_monotone_voice() {
        let report = compose(
            &face("fear", &[("fear", 70.0), ("sad", 25.0), ("happy", 5.0)]),
            &voice(AcousticStats {
                pitch_mean: 100.0,
                pitch_std: 5.0,
                energy_mean: 0.01,
                zcr_mean: 0.12,
                spectral_centroid_mean: 1500.0,
                ..Default::default()
            }),
        );

        assert_eq!(
            report.areas_for_improvement,
            vec![
                "Work on managing fear expressions",
                "Consider showing more positive engagement",
                "Build more vocal confidence",
                "Increase pitch variation",
                "Project voice with more energy",
                "Moderate speaking pace",
            ]
        );
        assert_eq!(report.strengths, vec!["Consistent emotional expression"]);
        let categories: Vec<&str> = report
            .voice_feedback
            .iter()
            .map(|i| i.category.as_str())
            .collect();
        assert_eq!(
            categories,
            vec!["Overall Vocal Tone", "Pitch Variation", "Speaking Rate"]
        );
        assert_eq!(
            titles(&report),
            vec![
                "Practice Relaxation Techniques",
                "Increase Positive Expressions",
                "Vary Your Pitch",
                "Project Your Voice",
                "Record and Review",
                "Practice with Feedback",
            ]
        );
        assert!(report.summary.ends_with(CONCLUSION_WEAK));
    }

    #[test]
    fn many_labels_flag_inconsistency() {
        let spread = [
            ("happy", 20.0),
            ("neutral", 20.0),
            ("sad", 15.0),
            ("angry", 15.0),
            ("surprise", 15.0),
            ("fear", 15.0),
        ];
        let report = compose(&face("happy", &spread), &VoiceAnalysis::no_audio());
        assert_eq!(report.facial_feedback[1].category, "Emotional Consistency");
        assert!(report
            .areas_for_improvement
            .contains(&"Practice emotional consistency".to_owned()));
        assert!(report.voice_feedback.is_empty());
        assert_eq!(
            report.summary,
            format!("You appeared happy throughout most of the video. {CONCLUSION_BALANCED}")
        );
    }

    #[test]
    fn unknown_label_produces_no_dominant_item() {
        let report = compose(
            &face("contempt", &[("contempt", 100.0)]),
            &VoiceAnalysis::no_audio(),
        );
        assert!(report
            .facial_feedback
            .iter()
            .all(|i| i.category != "Dominant Emotion"));
        assert!(!report.strengths.iter().any(|s| s.contains("contempt")));
        assert!(!report
            .areas_for_improvement
            .iter()
            .any(|s| s.contains("contempt")));
    }

    #[test]
    fn voice_only_summary_is_capitalized() {
        let report = compose(&no_face(), &confident_voice());
        assert!(report.facial_feedback.is_empty());
        assert!(report
            .summary
            .starts_with("Your vocal tone was confident and engaging. "));
        assert_eq!(report.recommendations.len(), 2);
    }

    #[test]
    fn capitalize_lowercases_the_tail() {
        assert_eq!(capitalize("you appeared Happy. Your"), "You appeared happy. your");
        assert_eq!(capitalize(""), "");
    }
}
