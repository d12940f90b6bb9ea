//! Explanation builder.
//!
//! Turns already-computed sub-scores into positive and negative factors.
//! A sub-score above 60 is reported as a strength; a complement
//! (100 - score) above 40 is reported as a concern.

use crate::models::{CancerTypeMatch, ExplanationFactor, ExplanationFactors, ScoreBreakdown};

/// A sub-score must exceed this to appear as a positive factor.
pub const POSITIVE_THRESHOLD: u32 = 60;
/// A complement must exceed this to appear as a negative factor.
pub const NEGATIVE_THRESHOLD: u32 = 40;

struct FactorText {
    positive: &'static str,
    positive_description: &'static str,
    negative: &'static str,
    negative_description: &'static str,
}

const CANCER_TYPE_TEXT: FactorText = FactorText {
    positive: "Cancer Type Match",
    positive_description: "",
    negative: "Cancer Type Mismatch",
    negative_description: "Limited cancer type compatibility",
};

const BIOMARKER_TEXT: FactorText = FactorText {
    positive: "Biomarker Compatibility",
    positive_description: "Patient biomarkers align with trial requirements",
    negative: "Biomarker Mismatch",
    negative_description: "Limited biomarker compatibility",
};

const LOCATION_TEXT: FactorText = FactorText {
    positive: "Geographic Accessibility",
    positive_description: "Trial location is accessible to patient",
    negative: "Distance Concerns",
    negative_description: "Trial location may be challenging to access",
};

const BURDEN_TEXT: FactorText = FactorText {
    positive: "Treatment Burden",
    positive_description: "Treatment complexity matches patient capability",
    negative: "Treatment Complexity",
    negative_description: "Treatment may be demanding for patient",
};

/// Build the explanation lists for a scored match.
///
/// The cancer-type strength reuses the gate's own explanation text.
pub fn build_explanation(gate: &CancerTypeMatch, scores: &ScoreBreakdown) -> ExplanationFactors {
    let factors = [
        (&CANCER_TYPE_TEXT, scores.cancer_type_score, Some(gate.explanation.as_str())),
        (&BIOMARKER_TEXT, scores.biomarker_score, None),
        (&LOCATION_TEXT, scores.location_score, None),
        (&BURDEN_TEXT, scores.burden_score, None),
    ];

    let mut explanation = ExplanationFactors::default();

    for (text, score, description_override) in factors {
        let score = score.min(100);

        if score > POSITIVE_THRESHOLD {
            explanation.positive.push(ExplanationFactor {
                factor: text.positive.to_string(),
                impact: score,
                description: description_override
                    .unwrap_or(text.positive_description)
                    .to_string(),
            });
        }

        let complement = 100 - score;
        if complement > NEGATIVE_THRESHOLD {
            explanation.negative.push(ExplanationFactor {
                factor: text.negative.to_string(),
                impact: complement,
                description: text.negative_description.to_string(),
            });
        }
    }

    explanation
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(score: u32) -> CancerTypeMatch {
        CancerTypeMatch {
            is_compatible: true,
            score,
            cancer_type: Some("breast".into()),
            explanation: "Perfect match: Trial specifically targets breast cancer".into(),
        }
    }

    #[test]
    fn test_all_strong_scores() {
        let scores = ScoreBreakdown {
            cancer_type_score: 95,
            biomarker_score: 95,
            location_score: 95,
            burden_score: 70,
        };
        let explanation = build_explanation(&gate(95), &scores);

        let names: Vec<&str> = explanation.positive.iter().map(|f| f.factor.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Cancer Type Match",
                "Biomarker Compatibility",
                "Geographic Accessibility",
                "Treatment Burden"
            ]
        );
        assert!(explanation.negative.is_empty());
        assert_eq!(
            explanation.positive[0].description,
            "Perfect match: Trial specifically targets breast cancer"
        );
        assert_eq!(explanation.positive[3].impact, 70);
    }

    #[test]
    fn test_weak_scores_become_negatives() {
        let scores = ScoreBreakdown {
            cancer_type_score: 80,
            biomarker_score: 40,
            location_score: 30,
            burden_score: 55,
        };
        let explanation = build_explanation(&gate(80), &scores);

        assert_eq!(explanation.positive.len(), 1);
        let negatives: Vec<(&str, u32)> = explanation
            .negative
            .iter()
            .map(|f| (f.factor.as_str(), f.impact))
            .collect();
        assert_eq!(
            negatives,
            vec![("Biomarker Mismatch", 60), ("Distance Concerns", 70), ("Treatment Complexity", 45)]
        );
    }

    #[test]
    fn test_thresholds_are_strict() {
        // 60 is neither a strength (needs > 60) nor a concern (complement 40 needs > 40)
        let scores = ScoreBreakdown {
            cancer_type_score: 60,
            biomarker_score: 60,
            location_score: 60,
            burden_score: 60,
        };
        let explanation = build_explanation(&gate(60), &scores);
        assert!(explanation.positive.is_empty());
        assert!(explanation.negative.is_empty());
    }
}
