//! Trial-side eligibility: how many patients qualify for a trial, and
//! whether a given patient may enroll.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{ClinicalTrial, Patient, TrialMatch};

/// Minimum match score for a patient to count as eligible for a trial.
pub const ELIGIBLE_MATCH_SCORE: u32 = 50;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnrollmentError {
    #[error("patient {patient_id} has no match for trial {trial_id}")]
    NoMatch { patient_id: String, trial_id: String },

    #[error("match score {score} is below the enrollment threshold of {threshold}")]
    BelowThreshold { score: u32, threshold: u32 },

    #[error("trial {trial_id} is at capacity ({current}/{max})")]
    TrialFull {
        trial_id: String,
        current: u32,
        max: u32,
    },
}

pub type EnrollmentResult<T> = Result<T, EnrollmentError>;

/// Confirmation that a patient qualifies for enrollment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub patient_id: String,
    pub trial_id: String,
    pub enrolled_at: String,
    pub match_score: u32,
}

/// Count patients whose stored match for `trial_id` clears the eligibility threshold.
pub fn count_eligible_patients(
    trial_id: &str,
    matches_by_patient: &HashMap<String, Vec<TrialMatch>>,
) -> usize {
    matches_by_patient
        .values()
        .filter(|matches| {
            matches
                .iter()
                .any(|m| m.trial_id == trial_id && m.match_score >= ELIGIBLE_MATCH_SCORE)
        })
        .count()
}

/// Check whether a patient may enroll in a trial given their stored matches.
pub fn check_enrollment(
    patient: &Patient,
    trial: &ClinicalTrial,
    matches: &[TrialMatch],
) -> EnrollmentResult<Enrollment> {
    let trial_match = matches
        .iter()
        .find(|m| m.patient_id == patient.id && m.trial_id == trial.id)
        .ok_or_else(|| EnrollmentError::NoMatch {
            patient_id: patient.id.clone(),
            trial_id: trial.id.clone(),
        })?;

    if trial_match.match_score < ELIGIBLE_MATCH_SCORE {
        return Err(EnrollmentError::BelowThreshold {
            score: trial_match.match_score,
            threshold: ELIGIBLE_MATCH_SCORE,
        });
    }

    if !trial.has_capacity() {
        return Err(EnrollmentError::TrialFull {
            trial_id: trial.id.clone(),
            current: trial.current_enrollment,
            max: trial.max_enrollment,
        });
    }

    Ok(Enrollment {
        patient_id: patient.id.clone(),
        trial_id: trial.id.clone(),
        enrolled_at: chrono::Utc::now().to_rfc3339(),
        match_score: trial_match.match_score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CancerStage, CompletionLikelihood, ExplanationFactors};

    fn trial_match(patient_id: &str, trial_id: &str, score: u32) -> TrialMatch {
        TrialMatch {
            patient_id: patient_id.into(),
            trial_id: trial_id.into(),
            match_score: score,
            cancer_type_score: 95,
            biomarker_score: 60,
            location_score: 55,
            burden_score: 70,
            completion_likelihood: CompletionLikelihood::from_score(score),
            explanation_factors: ExplanationFactors::default(),
        }
    }

    fn setup() -> (Patient, ClinicalTrial) {
        let mut patient = Patient::new(
            "John".into(),
            "Smith".into(),
            61,
            "Prostate Cancer".into(),
            CancerStage::StageIII,
        );
        patient.id = "p1".into();

        let mut trial = ClinicalTrial::new("t1".into(), "Prostate Cancer Study".into());
        trial.max_enrollment = 100;
        trial.current_enrollment = 40;
        (patient, trial)
    }

    #[test]
    fn test_count_eligible_patients() {
        let mut by_patient = HashMap::new();
        by_patient.insert("p1".to_string(), vec![trial_match("p1", "t1", 50)]);
        by_patient.insert("p2".to_string(), vec![trial_match("p2", "t1", 49)]);
        by_patient.insert(
            "p3".to_string(),
            vec![trial_match("p3", "t2", 90), trial_match("p3", "t1", 88)],
        );
        by_patient.insert("p4".to_string(), vec![trial_match("p4", "t2", 90)]);

        assert_eq!(count_eligible_patients("t1", &by_patient), 2);
        assert_eq!(count_eligible_patients("t2", &by_patient), 2);
        assert_eq!(count_eligible_patients("t3", &by_patient), 0);
    }

    #[test]
    fn test_enrollment_succeeds() {
        let (patient, trial) = setup();
        let enrollment = check_enrollment(&patient, &trial, &[trial_match("p1", "t1", 72)]).unwrap();
        assert_eq!(enrollment.trial_id, "t1");
        assert_eq!(enrollment.match_score, 72);
    }

    #[test]
    fn test_enrollment_requires_match() {
        let (patient, trial) = setup();
        let err = check_enrollment(&patient, &trial, &[trial_match("p1", "t2", 90)]).unwrap_err();
        assert!(matches!(err, EnrollmentError::NoMatch { .. }));
    }

    #[test]
    fn test_enrollment_below_threshold() {
        let (patient, trial) = setup();
        let err = check_enrollment(&patient, &trial, &[trial_match("p1", "t1", 49)]).unwrap_err();
        assert_eq!(
            err,
            EnrollmentError::BelowThreshold {
                score: 49,
                threshold: 50
            }
        );
    }

    #[test]
    fn test_enrollment_trial_full() {
        let (patient, mut trial) = setup();
        trial.current_enrollment = 100;
        let err = check_enrollment(&patient, &trial, &[trial_match("p1", "t1", 90)]).unwrap_err();
        assert!(matches!(err, EnrollmentError::TrialFull { current: 100, .. }));
        assert_eq!(err.to_string(), "trial t1 is at capacity (100/100)");
    }
}
