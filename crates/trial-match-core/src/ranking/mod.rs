//! Patient-list ranking.
//!
//! A looser, secondary scoring pass over already-computed trial matches.
//! Each patient gets a blended AI score:
//! - Average match score: 50%
//! - Engagement score: 30%
//! - Eligibility (share of the catalog matched): 20%

mod engagement;

pub use engagement::*;

use std::collections::HashMap;

use tracing::debug;

use crate::models::{Patient, RankedPatient, TrialMatch};

/// Weight (tenths) of the average match score in the AI score.
pub const MATCH_SCORE_WEIGHT: u32 = 5;
/// Weight (tenths) of the engagement score.
pub const ENGAGEMENT_WEIGHT: u32 = 3;
/// Weight (tenths) of the eligibility score.
pub const ELIGIBILITY_WEIGHT: u32 = 2;

/// Unrounded per-patient inputs to the AI score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatientScores {
    pub avg_match_score: f64,
    pub engagement_score: u32,
    pub eligibility_score: f64,
}

impl PatientScores {
    /// Aggregate a patient's matches against the catalog size.
    pub fn compute(patient: &Patient, matches: &[TrialMatch], total_trial_count: usize) -> Self {
        let avg_match_score = if matches.is_empty() {
            0.0
        } else {
            matches.iter().map(|m| f64::from(m.match_score)).sum::<f64>() / matches.len() as f64
        };

        // Capped at 100 when matches outnumber the counted catalog
        let eligibility_score =
            (matches.len() as f64 / total_trial_count.max(1) as f64 * 100.0).min(100.0);

        Self {
            avg_match_score,
            engagement_score: engagement_score(patient),
            eligibility_score,
        }
    }

    /// Blend into a single rounded score.
    pub fn ai_score(&self) -> u32 {
        let blended = self.avg_match_score * f64::from(MATCH_SCORE_WEIGHT)
            + f64::from(self.engagement_score * ENGAGEMENT_WEIGHT)
            + self.eligibility_score * f64::from(ELIGIBILITY_WEIGHT);
        (blended / 10.0).round().max(0.0) as u32
    }
}

/// First match holding the highest score.
pub fn best_match(matches: &[TrialMatch]) -> Option<&TrialMatch> {
    matches.iter().fold(None, |best, m| match best {
        Some(b) if b.match_score >= m.match_score => Some(b),
        _ => Some(m),
    })
}

/// Rank patients by AI score, highest first.
///
/// Patients missing from `matches_by_patient` are ranked with no matches.
/// Ties keep input order. Ranks are 1-based.
pub fn rank_patients_by_ai_score(
    patients: &[Patient],
    matches_by_patient: &HashMap<String, Vec<TrialMatch>>,
    total_trial_count: usize,
) -> Vec<RankedPatient> {
    let mut ranked: Vec<RankedPatient> = patients
        .iter()
        .map(|patient| {
            let matches = matches_by_patient
                .get(&patient.id)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let scores = PatientScores::compute(patient, matches, total_trial_count);

            RankedPatient {
                patient: patient.clone(),
                ai_score: scores.ai_score(),
                match_score: scores.avg_match_score.round() as u32,
                engagement_score: scores.engagement_score,
                eligibility_score: scores.eligibility_score.round() as u32,
                eligible_trials: matches.len() as u32,
                best_match: best_match(matches).cloned(),
                rank: 0,
            }
        })
        .collect();

    ranked.sort_by(|a, b| b.ai_score.cmp(&a.ai_score));
    for (i, entry) in ranked.iter_mut().enumerate() {
        entry.rank = i as u32 + 1;
    }

    debug!(
        patients = ranked.len(),
        total_trial_count,
        top_score = ranked.first().map(|r| r.ai_score),
        "ranked patients"
    );

    ranked
}
