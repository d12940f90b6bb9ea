//! Explainability report over a patient's matches.
//!
//! Summarises which factors drove the scores, how much the inputs can be
//! trusted, and a one-paragraph narrative for clinicians.

use serde::{Deserialize, Serialize};

use crate::models::{
    Patient, TrialMatch, BIOMARKER_WEIGHT, BURDEN_WEIGHT, CANCER_TYPE_WEIGHT, LOCATION_WEIGHT,
};

/// Best score at or above which the summary recommends the top trial.
pub const PRIORITIZE_THRESHOLD: u32 = 80;

/// Prediction stability never drops below this.
const MIN_STABILITY: f64 = 0.5;
/// Variance that would wipe out stability entirely.
const VARIANCE_SCALE: f64 = 1000.0;
/// Weight of each present field in the data-quality metric.
const FIELD_QUALITY: f64 = 0.2;

/// Average weighted contribution of each factor across matches.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeatureImportance {
    pub cancer_type: f64,
    pub biomarkers: f64,
    pub location: f64,
    pub burden: f64,
}

/// Confidence in the match results, each in [0, 1].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceMetrics {
    pub overall_confidence: f64,
    pub data_quality: f64,
    pub prediction_stability: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExplainabilityReport {
    /// `None` when the patient has no matches
    pub feature_importance: Option<FeatureImportance>,
    pub confidence_metrics: ConfidenceMetrics,
    pub model_summary: String,
}

/// Build the explainability report for a patient's matches.
pub fn analyze_matches(patient: &Patient, matches: &[TrialMatch]) -> ExplainabilityReport {
    ExplainabilityReport {
        feature_importance: feature_importance(matches),
        confidence_metrics: confidence_metrics(patient, matches),
        model_summary: model_summary(patient, matches),
    }
}

/// Mean of `score / 100 * weight` per factor, rounded to 3 decimals.
pub fn feature_importance(matches: &[TrialMatch]) -> Option<FeatureImportance> {
    if matches.is_empty() {
        return None;
    }

    // Scores and weights are both percents, so sum in integers and divide once
    let denominator = 10_000.0 * matches.len() as f64;
    let mean_impact = |score: fn(&TrialMatch) -> u32, weight: u32| {
        let total: u64 = matches
            .iter()
            .map(|m| u64::from(score(m).min(100)) * u64::from(weight))
            .sum();
        round3(total as f64 / denominator)
    };

    Some(FeatureImportance {
        cancer_type: mean_impact(|m| m.cancer_type_score, CANCER_TYPE_WEIGHT),
        biomarkers: mean_impact(|m| m.biomarker_score, BIOMARKER_WEIGHT),
        location: mean_impact(|m| m.location_score, LOCATION_WEIGHT),
        burden: mean_impact(|m| m.burden_score, BURDEN_WEIGHT),
    })
}

/// Confidence metrics; all zero when there are no matches.
pub fn confidence_metrics(patient: &Patient, matches: &[TrialMatch]) -> ConfidenceMetrics {
    if matches.is_empty() {
        return ConfidenceMetrics::default();
    }

    let scores: Vec<f64> = matches.iter().map(|m| f64::from(m.match_score)).collect();
    let n = scores.len() as f64;
    let mean = scores.iter().sum::<f64>() / n;
    let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;

    // Stage is a required field, so it always counts
    let present_fields = [
        patient.age > 0,
        !patient.primary_diagnosis.trim().is_empty(),
        true,
        !patient.location.trim().is_empty(),
        patient.has_biomarkers(),
    ]
    .iter()
    .filter(|present| **present)
    .count();

    ConfidenceMetrics {
        overall_confidence: round3((mean / 100.0).min(1.0)),
        data_quality: round3(present_fields as f64 * FIELD_QUALITY),
        prediction_stability: round3((1.0 - variance / VARIANCE_SCALE).max(MIN_STABILITY)),
    }
}

/// Narrative summary keyed off the best match score.
pub fn model_summary(patient: &Patient, matches: &[TrialMatch]) -> String {
    let Some(best) = matches.iter().map(|m| m.match_score).max() else {
        return "No suitable trials found for this patient profile.".to_string();
    };

    let candidate = match best {
        85.. => "an excellent candidate for clinical trials",
        70..=84 => "a good candidate for clinical trials",
        50..=69 => "a moderate candidate for clinical trials",
        _ => "having limited trial options",
    };

    let diagnosis = match patient.primary_diagnosis.trim() {
        "" => "cancer",
        d => d,
    };

    let mut summary = format!("The matching algorithm identified this patient as {candidate}");

    if patient.has_biomarkers() {
        let profile: Vec<&str> = patient.biomarkers.values().map(String::as_str).collect();
        summary.push_str(&format!(
            " based on {diagnosis} diagnosis and {} biomarker profile.",
            profile.join(", ")
        ));
    } else {
        summary.push_str(&format!(" based on {diagnosis} diagnosis."));
    }

    if best >= PRIORITIZE_THRESHOLD {
        summary.push_str(
            " The model recommends prioritizing the top-ranked trial due to high compatibility scores.",
        );
    }

    summary
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
