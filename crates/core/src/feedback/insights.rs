/// Observation text and coaching tip for a dominant facial label.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EmotionInsight {
    pub insight: &'static str,
    pub tip: &'static str,
}

const INSIGHTS: &[(&str, EmotionInsight)] = &[
    (
        "happy",
        EmotionInsight {
            insight: "Great! You appeared happy and positive.",
            tip: "Maintain this positive energy throughout your communication.",
        },
    ),
    (
        "neutral",
        EmotionInsight {
            insight: "You maintained a neutral expression.",
            tip: "Consider showing more emotional engagement to connect better with your audience.",
        },
    ),
    (
        "sad",
        EmotionInsight {
            insight: "You showed some sadness or concern.",
            tip: "If this is unintentional, practice maintaining a more neutral or positive expression.",
        },
    ),
    (
        "angry",
        EmotionInsight {
            insight: "You appeared frustrated or intense.",
            tip: "Try to relax your facial muscles and maintain a calmer demeanor.",
        },
    ),
    (
        "surprise",
        EmotionInsight {
            insight: "You showed surprise or interest.",
            tip: "This can be engaging, but use it purposefully to emphasize key points.",
        },
    ),
    (
        "fear",
        EmotionInsight {
            insight: "You appeared nervous or anxious.",
            tip: "Practice relaxation techniques before important conversations to appear more confident.",
        },
    ),
    (
        "disgust",
        EmotionInsight {
            insight: "You showed some negative reaction.",
            tip: "Be mindful of facial expressions that might convey unintended negativity.",
        },
    ),
];

pub fn insight_for(label: &str) -> Option<EmotionInsight> {
    INSIGHTS
        .iter()
        .find(|(known, _)| *known == label)
        .map(|(_, insight)| *insight)
}

/// Labels whose dominance counts as a strength rather than something to work on.
pub fn is_favourable(label: &str) -> bool {
    matches!(label, "happy" | "neutral")
}

/// Labels that trigger the relaxation recommendation.
pub fn is_tense(label: &str) -> bool {
    matches!(label, "fear" | "sad" | "angry")
}
