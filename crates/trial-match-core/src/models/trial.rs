//! Clinical trial catalog models.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Burden rating used for both treatment and travel burden.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum BurdenLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl BurdenLevel {
    pub fn label(&self) -> &'static str {
        match self {
            BurdenLevel::Low => "Low",
            BurdenLevel::Medium => "Medium",
            BurdenLevel::High => "High",
        }
    }

    /// Parse a catalog label; unknown labels fall back to `Medium`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "low" => BurdenLevel::Low,
            "high" => BurdenLevel::High,
            _ => BurdenLevel::Medium,
        }
    }
}

impl fmt::Display for BurdenLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Inclusive age window from a trial's inclusion criteria.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgeRange {
    pub min: u32,
    pub max: u32,
}

impl AgeRange {
    pub fn contains(&self, age: u32) -> bool {
        age >= self.min && age <= self.max
    }
}

/// Inclusion criteria attached to a trial.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct InclusionCriteria {
    /// Required/relevant biomarker labels (e.g., "HER2+", "EGFR")
    #[serde(default)]
    pub biomarkers: Vec<String>,
    #[serde(default)]
    pub cancer_types: Vec<String>,
    #[serde(default)]
    pub stages: Vec<String>,
    #[serde(default)]
    pub age_range: Option<AgeRange>,
}

/// A clinical trial catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalTrial {
    /// Opaque identifier
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sponsor: String,
    #[serde(default)]
    pub phase: String,
    /// Free-text site location
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
    /// Target indication, searched together with name and description
    #[serde(default)]
    pub indication: Option<String>,
    #[serde(default)]
    pub current_enrollment: u32,
    #[serde(default)]
    pub max_enrollment: u32,
    #[serde(default)]
    pub inclusion_criteria: InclusionCriteria,
    #[serde(default)]
    pub exclusion_criteria: Vec<String>,
    #[serde(default)]
    pub treatment_burden: BurdenLevel,
    #[serde(default)]
    pub travel_burden: BurdenLevel,
    /// Only active trials are offered to the matcher
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl ClinicalTrial {
    /// Create a new active trial with required fields.
    pub fn new(id: String, name: String) -> Self {
        Self {
            id,
            name,
            sponsor: String::new(),
            phase: String::new(),
            location: String::new(),
            description: String::new(),
            indication: None,
            current_enrollment: 0,
            max_enrollment: 0,
            inclusion_criteria: InclusionCriteria::default(),
            exclusion_criteria: Vec::new(),
            treatment_burden: BurdenLevel::Medium,
            travel_burden: BurdenLevel::Medium,
            is_active: true,
        }
    }

    /// Required biomarker labels.
    pub fn required_biomarkers(&self) -> &[String] {
        &self.inclusion_criteria.biomarkers
    }

    /// Lowercased name, description and indication joined for text search.
    pub fn search_text(&self) -> String {
        format!(
            "{} {} {}",
            self.name,
            self.description,
            self.indication.as_deref().unwrap_or("")
        )
        .to_lowercase()
    }

    /// Whether another patient can still be enrolled.
    pub fn has_capacity(&self) -> bool {
        self.current_enrollment < self.max_enrollment
    }

    /// Remaining enrollment slots (zero when over-enrolled).
    pub fn open_slots(&self) -> u32 {
        self.max_enrollment.saturating_sub(self.current_enrollment)
    }
}
