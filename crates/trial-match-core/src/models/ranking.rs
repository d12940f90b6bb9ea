//! Patient-list ranking models.

use serde::{Deserialize, Serialize};

use super::{Patient, TrialMatch};

/// A patient augmented with patient-list scores and a 1-based rank.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RankedPatient {
    #[serde(flatten)]
    pub patient: Patient,
    /// Weighted blend of match, engagement and eligibility scores
    pub ai_score: u32,
    /// Rounded mean match score across the patient's matches
    pub match_score: u32,
    pub engagement_score: u32,
    /// Rounded share of the catalog the patient matched, as a percentage
    pub eligibility_score: u32,
    pub eligible_trials: u32,
    pub best_match: Option<TrialMatch>,
    /// 1-based position, highest `ai_score` first
    pub rank: u32,
}
