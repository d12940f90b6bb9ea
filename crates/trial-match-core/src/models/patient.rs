//! Patient models.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Disease stage recorded at intake.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CancerStage {
    #[serde(rename = "Stage I")]
    StageI,
    #[serde(rename = "Stage II")]
    StageII,
    #[serde(rename = "Stage III")]
    StageIII,
    #[serde(rename = "Stage IV")]
    StageIV,
}

impl CancerStage {
    /// Label as captured by the intake form.
    pub fn label(&self) -> &'static str {
        match self {
            CancerStage::StageI => "Stage I",
            CancerStage::StageII => "Stage II",
            CancerStage::StageIII => "Stage III",
            CancerStage::StageIV => "Stage IV",
        }
    }

    /// Parse an intake label (case-insensitive, surrounding whitespace ignored).
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "stage i" => Some(CancerStage::StageI),
            "stage ii" => Some(CancerStage::StageII),
            "stage iii" => Some(CancerStage::StageIII),
            "stage iv" => Some(CancerStage::StageIV),
            _ => None,
        }
    }

    /// Stage I or Stage II.
    pub fn is_early(&self) -> bool {
        matches!(self, CancerStage::StageI | CancerStage::StageII)
    }
}

impl fmt::Display for CancerStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Recognised travel-willingness answers.
///
/// The patient record keeps the raw answer; scorers resolve it through
/// [`TravelWillingness::from_label`] and fall back to their own defaults
/// when the answer is outside this vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TravelWillingness {
    Within25Miles,
    Within50Miles,
    Within100Miles,
    Anywhere,
}

impl TravelWillingness {
    pub fn label(&self) -> &'static str {
        match self {
            TravelWillingness::Within25Miles => "Within 25 miles",
            TravelWillingness::Within50Miles => "Within 50 miles",
            TravelWillingness::Within100Miles => "Within 100 miles",
            TravelWillingness::Anywhere => "Willing to travel anywhere",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "within 25 miles" => Some(TravelWillingness::Within25Miles),
            "within 50 miles" => Some(TravelWillingness::Within50Miles),
            "within 100 miles" => Some(TravelWillingness::Within100Miles),
            "willing to travel anywhere" => Some(TravelWillingness::Anywhere),
            _ => None,
        }
    }
}

/// A patient record as captured by intake.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    /// Opaque identifier (UUID when created locally)
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    /// Age in years; the caller validates the [18, 100] range
    pub age: u32,
    #[serde(default)]
    pub gender: String,
    /// Free-text disease label (e.g., "Breast Cancer")
    pub primary_diagnosis: String,
    pub cancer_stage: CancerStage,
    /// Treatment history; only the count is used for scoring
    #[serde(default)]
    pub previous_treatments: Vec<String>,
    /// Free-text "City, State"
    #[serde(default)]
    pub location: String,
    /// Raw travel answer, see [`TravelWillingness`]
    #[serde(default)]
    pub travel_willingness: String,
    /// Marker name → qualitative value (e.g., "HER2" → "Positive")
    #[serde(default)]
    pub biomarkers: BTreeMap<String, String>,
    /// Free-text functional status (e.g., "Excellent", "Poor", "ECOG 1")
    #[serde(default)]
    pub performance_status: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// Creation timestamp
    #[serde(default)]
    pub created_at: String,
}

impl Patient {
    /// Create a new patient with the fields needed for matching.
    pub fn new(
        first_name: String,
        last_name: String,
        age: u32,
        primary_diagnosis: String,
        cancer_stage: CancerStage,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            first_name,
            last_name,
            age,
            gender: String::new(),
            primary_diagnosis,
            cancer_stage,
            previous_treatments: Vec::new(),
            location: String::new(),
            travel_willingness: String::new(),
            biomarkers: BTreeMap::new(),
            performance_status: String::new(),
            email: None,
            phone: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Resolved travel answer, `None` when outside the known vocabulary.
    pub fn travel(&self) -> Option<TravelWillingness> {
        TravelWillingness::from_label(&self.travel_willingness)
    }

    pub fn has_biomarkers(&self) -> bool {
        !self.biomarkers.is_empty()
    }
}
