//! Digital twin models.

use serde::{Deserialize, Serialize};

/// Clinical summary of a patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalProfile {
    /// "Low", "Moderate" or "High"
    pub risk_score: String,
    /// Biomarker values joined for display, "Unknown" when none
    pub biomarkers: String,
    pub performance: String,
}

/// Lifestyle descriptors derived from intake data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LifestyleFactors {
    pub mobility: String,
    pub support: String,
    /// Expected adherence as a percentage label
    pub compliance: String,
}

/// Signals used by recruiters to gauge responsiveness.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EngagementSignals {
    pub motivation: String,
    pub availability: String,
    pub tech_comfort: String,
}

/// Synthetic profile derived from a patient's raw attributes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DigitalTwin {
    pub patient_id: String,
    pub clinical_profile: ClinicalProfile,
    pub lifestyle_factors: LifestyleFactors,
    pub engagement_signals: EngagementSignals,
    pub created_at: String,
}
