//! Heuristic engagement score.
//!
//! Estimates how responsive and available a patient is likely to be. Used
//! only for patient-list ranking, never for trial-match scoring. Computed
//! from raw patient fields so it cannot drift from a stale digital twin.

use crate::models::{CancerStage, Patient, TravelWillingness};

const ENGAGEMENT_BASE: i32 = 50;

/// Score a patient's likely engagement (0 - 100).
pub fn engagement_score(patient: &Patient) -> u32 {
    let mut score = ENGAGEMENT_BASE;

    if patient.age < 65 {
        score += 10;
    } else if patient.age > 75 {
        score -= 10;
    }

    score += match patient.cancer_stage {
        CancerStage::StageI | CancerStage::StageII => 15,
        CancerStage::StageIV => 20,
        CancerStage::StageIII => 0,
    };

    match patient.performance_status.trim().to_lowercase().as_str() {
        "excellent" => score += 10,
        "poor" => score -= 15,
        _ => {}
    }

    match patient.travel() {
        Some(TravelWillingness::Anywhere) => score += 15,
        Some(TravelWillingness::Within25Miles) => score -= 5,
        _ => {}
    }

    if !patient.previous_treatments.is_empty() {
        score += 5;
    }

    score.clamp(0, 100) as u32
}
