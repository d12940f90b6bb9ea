//! Digital twin derivation.
//!
//! A digital twin is a descriptive profile derived field-by-field from the
//! patient record. It is display data for recruiters; nothing in matching or
//! ranking reads it back.

use crate::models::{
    CancerStage, ClinicalProfile, DigitalTwin, EngagementSignals, LifestyleFactors, Patient,
    TravelWillingness,
};

/// Performance label used when the patient record has none.
pub const DEFAULT_PERFORMANCE: &str = "ECOG 1";

/// Derive a digital twin from a patient record.
pub fn generate_digital_twin(patient: &Patient) -> DigitalTwin {
    DigitalTwin {
        patient_id: patient.id.clone(),
        clinical_profile: ClinicalProfile {
            risk_score: risk_score(patient).to_string(),
            biomarkers: biomarker_summary(patient),
            performance: performance(patient),
        },
        lifestyle_factors: LifestyleFactors {
            mobility: if patient.age < 65 { "High" } else { "Medium" }.to_string(),
            support: if patient.location.contains("City") {
                "Strong"
            } else {
                "Moderate"
            }
            .to_string(),
            compliance: compliance(patient).to_string(),
        },
        engagement_signals: EngagementSignals {
            motivation: if patient.cancer_stage == CancerStage::StageIV {
                "High"
            } else {
                "Medium"
            }
            .to_string(),
            availability: if patient.travel() == Some(TravelWillingness::Anywhere) {
                "Flexible"
            } else {
                "Limited"
            }
            .to_string(),
            tech_comfort: if patient.age < 50 { "High" } else { "Medium" }.to_string(),
        },
        created_at: chrono::Utc::now().to_rfc3339(),
    }
}

fn risk_score(patient: &Patient) -> &'static str {
    if patient.cancer_stage == CancerStage::StageIV || patient.age > 75 {
        "High"
    } else if patient.cancer_stage == CancerStage::StageIII || patient.age > 65 {
        "Moderate"
    } else {
        "Low"
    }
}

fn biomarker_summary(patient: &Patient) -> String {
    let values: Vec<&str> = patient
        .biomarkers
        .values()
        .map(String::as_str)
        .filter(|v| !v.trim().is_empty())
        .collect();

    if values.is_empty() {
        "Unknown".to_string()
    } else {
        values.join(", ")
    }
}

fn performance(patient: &Patient) -> String {
    let status = patient.performance_status.trim();
    if status.is_empty() {
        DEFAULT_PERFORMANCE.to_string()
    } else {
        status.to_string()
    }
}

fn compliance(patient: &Patient) -> &'static str {
    match patient.previous_treatments.len() {
        0 => "90%",
        1..=2 => "85%",
        _ => "80%",
    }
}
