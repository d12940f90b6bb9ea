//! Cancer-type compatibility gate.
//!
//! Runs before any factor scoring. A trial that fails the gate is dropped
//! from the patient's candidates regardless of its other scores.

use crate::models::{CancerTypeMatch, ClinicalTrial};

use super::CancerVocabulary;

/// Trial explicitly targets the patient's cancer type.
pub const EXACT_MATCH_SCORE: u32 = 95;
/// Trial targets a broader category covering the patient's cancer type.
pub const RELATED_MATCH_SCORE: u32 = 80;
/// Diagnosis could not be mapped to a known cancer type.
pub const UNRECOGNIZED_SCORE: u32 = 20;
/// Diagnosis recognised but the trial targets something else.
pub const MISMATCH_SCORE: u32 = 10;

/// Decide whether a trial is a legitimate candidate for a diagnosis.
pub fn check_cancer_type<V: CancerVocabulary + ?Sized>(
    vocabulary: &V,
    diagnosis: &str,
    trial: &ClinicalTrial,
) -> CancerTypeMatch {
    if diagnosis.trim().is_empty() {
        return CancerTypeMatch {
            is_compatible: false,
            score: 0,
            cancer_type: None,
            explanation: "Missing diagnosis information".into(),
        };
    }

    let Some(cancer_type) = vocabulary.classify(diagnosis) else {
        return CancerTypeMatch {
            is_compatible: false,
            score: UNRECOGNIZED_SCORE,
            cancer_type: None,
            explanation: "Patient cancer type not recognized".into(),
        };
    };

    let trial_text = trial.search_text();

    if vocabulary
        .aliases(cancer_type)
        .iter()
        .any(|alias| trial_text.contains(alias.as_str()))
    {
        return CancerTypeMatch {
            is_compatible: true,
            score: EXACT_MATCH_SCORE,
            cancer_type: Some(cancer_type.to_string()),
            explanation: format!("Perfect match: Trial specifically targets {cancer_type} cancer"),
        };
    }

    if vocabulary
        .related_terms(cancer_type)
        .iter()
        .any(|term| trial_text.contains(term.as_str()))
    {
        return CancerTypeMatch {
            is_compatible: true,
            score: RELATED_MATCH_SCORE,
            cancer_type: Some(cancer_type.to_string()),
            explanation: format!(
                "Good match: Trial targets related cancer category for {cancer_type} cancer"
            ),
        };
    }

    CancerTypeMatch {
        is_compatible: false,
        score: MISMATCH_SCORE,
        cancer_type: Some(cancer_type.to_string()),
        explanation: format!("No match: Trial does not target {cancer_type} cancer"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::CancerTypeTable;

    fn trial(name: &str, description: &str) -> ClinicalTrial {
        let mut t = ClinicalTrial::new("T1".into(), name.into());
        t.description = description.into();
        t
    }

    #[test]
    fn test_exact_match() {
        let table = CancerTypeTable::new();
        let t = trial("HER2+ Breast Cancer Immunotherapy Trial", "");
        let result = check_cancer_type(&table, "Breast Cancer", &t);

        assert!(result.is_compatible);
        assert_eq!(result.score, 95);
        assert_eq!(result.cancer_type.as_deref(), Some("breast"));
        assert!(result.explanation.starts_with("Perfect match"));
    }

    #[test]
    fn test_alias_in_description() {
        let table = CancerTypeTable::new();
        let t = trial("Targeted Therapy Study", "For patients with advanced NSCLC");
        let result = check_cancer_type(&table, "Lung Cancer", &t);
        assert!(result.is_compatible);
        assert_eq!(result.score, 95);
    }

    #[test]
    fn test_alias_in_indication() {
        let table = CancerTypeTable::new();
        let mut t = trial("PROSPER-2", "Novel androgen receptor inhibitor");
        t.indication = Some("Metastatic prostate adenocarcinoma".into());
        let result = check_cancer_type(&table, "Prostate Cancer", &t);
        assert!(result.is_compatible);
        assert_eq!(result.score, 95);
    }

    #[test]
    fn test_related_match() {
        let table = CancerTypeTable::new();
        let t = trial("Genitourinary Oncology Basket Study", "Solid tumors of the GU tract");
        let result = check_cancer_type(&table, "Prostate Cancer", &t);

        assert!(result.is_compatible);
        assert_eq!(result.score, 80);
        assert!(result.explanation.starts_with("Good match"));
    }

    #[test]
    fn test_mismatch() {
        let table = CancerTypeTable::new();
        let t = trial("HER2+ Breast Cancer Immunotherapy Trial", "Targets HER2 positive breast tumors");
        let result = check_cancer_type(&table, "Prostate Cancer", &t);

        assert!(!result.is_compatible);
        assert_eq!(result.score, 10);
        assert_eq!(result.cancer_type.as_deref(), Some("prostate"));
    }

    #[test]
    fn test_unrecognized_diagnosis() {
        let table = CancerTypeTable::new();
        let t = trial("Breast Cancer Study", "");
        let result = check_cancer_type(&table, "Mesothelioma", &t);

        assert!(!result.is_compatible);
        assert_eq!(result.score, 20);
        assert!(result.cancer_type.is_none());
    }

    #[test]
    fn test_missing_diagnosis() {
        let table = CancerTypeTable::new();
        let t = trial("Breast Cancer Study", "");
        let result = check_cancer_type(&table, "   ", &t);

        assert!(!result.is_compatible);
        assert_eq!(result.score, 0);
    }

    #[test]
    fn test_case_insensitive() {
        let table = CancerTypeTable::new();
        let t = trial("COLORECTAL CANCER FOLFOX STUDY", "");
        let result = check_cancer_type(&table, "colon cancer", &t);
        assert!(result.is_compatible);
        assert_eq!(result.score, 95);
    }
}
