//! Factor scorers for biomarker, location and treatment-burden compatibility.
//!
//! Every scorer returns an integer in [0, 100] and falls back to a fixed
//! default instead of failing on missing data.

use std::collections::BTreeMap;

use crate::models::{BurdenLevel, CancerStage, TravelWillingness};

/// Trial lists no required biomarkers.
pub const BIOMARKER_NEUTRAL_SCORE: u32 = 60;
/// Patient has no recorded biomarkers.
pub const BIOMARKER_UNKNOWN_SCORE: u32 = 40;
const BIOMARKER_MIN: f64 = 20.0;
const BIOMARKER_MAX: f64 = 95.0;

/// One of the two locations is blank.
pub const LOCATION_UNKNOWN_SCORE: u32 = 50;
/// Patient and trial are in the same place.
pub const LOCATION_COLOCATED_SCORE: u32 = 95;
/// Unrecognised travel answer.
pub const LOCATION_DEFAULT_SCORE: u32 = 30;

const BURDEN_BASE: i32 = 70;
const BURDEN_MIN: i32 = 20;
const BURDEN_MAX: i32 = 95;

/// Score biomarker compatibility (0 - 100).
///
/// A required marker counts as matched when it and any patient marker name
/// contain one another, case-insensitively ("HER2+" matches "HER2").
pub fn score_biomarkers(
    patient_biomarkers: &BTreeMap<String, String>,
    required_biomarkers: &[String],
) -> u32 {
    let required: Vec<String> = required_biomarkers
        .iter()
        .map(|m| m.trim().to_lowercase())
        .filter(|m| !m.is_empty())
        .collect();

    if required.is_empty() {
        return BIOMARKER_NEUTRAL_SCORE;
    }

    let patient_markers: Vec<String> = patient_biomarkers
        .keys()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();

    if patient_markers.is_empty() {
        return BIOMARKER_UNKNOWN_SCORE;
    }

    let mut distinct_required = required;
    distinct_required.sort();
    distinct_required.dedup();

    let hits = distinct_required
        .iter()
        .filter(|marker| {
            patient_markers
                .iter()
                .any(|p| p.contains(marker.as_str()) || marker.contains(p.as_str()))
        })
        .count();

    let ratio = hits as f64 / distinct_required.len() as f64 * 100.0;
    ratio.clamp(BIOMARKER_MIN, BIOMARKER_MAX).round() as u32
}

/// Score geographic accessibility (0 - 100).
pub fn score_location(
    patient_location: &str,
    trial_location: &str,
    travel: Option<TravelWillingness>,
) -> u32 {
    let patient_loc = patient_location.trim().to_lowercase();
    let trial_loc = trial_location.trim().to_lowercase();

    if patient_loc.is_empty() || trial_loc.is_empty() {
        return LOCATION_UNKNOWN_SCORE;
    }

    if patient_loc.contains(&trial_loc) || trial_loc.contains(&patient_loc) {
        return LOCATION_COLOCATED_SCORE;
    }

    match travel {
        Some(TravelWillingness::Anywhere) => 85,
        Some(TravelWillingness::Within100Miles) => 70,
        Some(TravelWillingness::Within50Miles) => 55,
        Some(TravelWillingness::Within25Miles) => 40,
        None => LOCATION_DEFAULT_SCORE,
    }
}

/// Score how well the trial's treatment burden suits the patient (0 - 100).
pub fn score_burden(age: u32, stage: CancerStage, treatment_burden: BurdenLevel) -> u32 {
    let mut score = BURDEN_BASE;

    if age > 75 && treatment_burden == BurdenLevel::High {
        score -= 25;
    } else if age < 50 && treatment_burden == BurdenLevel::High {
        score += 15;
    }

    // Undertreatment risk for late stage, overtreatment risk for early stage
    if stage == CancerStage::StageIV && treatment_burden == BurdenLevel::Low {
        score -= 15;
    } else if stage == CancerStage::StageI && treatment_burden == BurdenLevel::High {
        score -= 10;
    }

    score.clamp(BURDEN_MIN, BURDEN_MAX) as u32
}
