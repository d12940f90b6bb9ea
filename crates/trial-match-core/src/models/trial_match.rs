//! Trial match models produced by the matcher.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Weight (percent) of the cancer-type gate score in the overall match score.
pub const CANCER_TYPE_WEIGHT: u32 = 50;
/// Weight (percent) of the biomarker score.
pub const BIOMARKER_WEIGHT: u32 = 25;
/// Weight (percent) of the location score.
pub const LOCATION_WEIGHT: u32 = 15;
/// Weight (percent) of the treatment-burden score.
pub const BURDEN_WEIGHT: u32 = 10;

/// Predicted likelihood that the patient completes the trial.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CompletionLikelihood {
    Low,
    Medium,
    High,
}

impl CompletionLikelihood {
    /// Bucket a match score: above 75 is High, above 55 is Medium.
    pub fn from_score(match_score: u32) -> Self {
        if match_score > 75 {
            CompletionLikelihood::High
        } else if match_score > 55 {
            CompletionLikelihood::Medium
        } else {
            CompletionLikelihood::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CompletionLikelihood::Low => "Low",
            CompletionLikelihood::Medium => "Medium",
            CompletionLikelihood::High => "High",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "low" => Some(CompletionLikelihood::Low),
            "medium" => Some(CompletionLikelihood::Medium),
            "high" => Some(CompletionLikelihood::High),
            _ => None,
        }
    }
}

impl fmt::Display for CompletionLikelihood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of the cancer-type compatibility gate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CancerTypeMatch {
    /// False means the trial must not be offered to the patient
    pub is_compatible: bool,
    /// Gate confidence (0 - 100)
    pub score: u32,
    /// Canonical cancer type recognised in the diagnosis
    pub cancer_type: Option<String>,
    pub explanation: String,
}

/// Component scores for a single patient/trial pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    /// Cancer-type gate score (0 - 100) - weight: 50%
    pub cancer_type_score: u32,
    /// Biomarker compatibility (0 - 100) - weight: 25%
    pub biomarker_score: u32,
    /// Geographic/travel compatibility (0 - 100) - weight: 15%
    pub location_score: u32,
    /// Treatment-burden compatibility (0 - 100) - weight: 10%
    pub burden_score: u32,
}

impl ScoreBreakdown {
    /// Calculate the weighted match score, rounding halves up.
    pub fn weighted_score(&self) -> u32 {
        // Integer percent arithmetic keeps .5 ties exact.
        let weighted = self.cancer_type_score.min(100) * CANCER_TYPE_WEIGHT
            + self.biomarker_score.min(100) * BIOMARKER_WEIGHT
            + self.location_score.min(100) * LOCATION_WEIGHT
            + self.burden_score.min(100) * BURDEN_WEIGHT;
        (weighted + 50) / 100
    }
}

/// A single human-readable factor behind a match score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExplanationFactor {
    pub factor: String,
    pub impact: u32,
    pub description: String,
}

/// Factors that raised and lowered a match score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ExplanationFactors {
    pub positive: Vec<ExplanationFactor>,
    pub negative: Vec<ExplanationFactor>,
}

/// A scored, explained match between one patient and one trial.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrialMatch {
    pub patient_id: String,
    pub trial_id: String,
    /// Overall compatibility (0 - 100)
    pub match_score: u32,
    pub cancer_type_score: u32,
    pub biomarker_score: u32,
    pub location_score: u32,
    pub burden_score: u32,
    pub completion_likelihood: CompletionLikelihood,
    pub explanation_factors: ExplanationFactors,
}

impl TrialMatch {
    /// Component scores of this match.
    pub fn breakdown(&self) -> ScoreBreakdown {
        ScoreBreakdown {
            cancer_type_score: self.cancer_type_score,
            biomarker_score: self.biomarker_score,
            location_score: self.location_score,
            burden_score: self.burden_score,
        }
    }

    /// Check that the overall score and likelihood agree with the components.
    pub fn is_consistent(&self) -> bool {
        self.breakdown().weighted_score() == self.match_score
            && CompletionLikelihood::from_score(self.match_score) == self.completion_likelihood
    }
}
